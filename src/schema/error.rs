/// Errors raised while validating an edit of the project state
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("model `{0}` does not exist")]
    ModelNotFound(String),
    #[error("model `{0}` already exists")]
    ModelExists(String),
    #[error("table `{table}` is already bound to model `{model}`")]
    TableTaken { table: String, model: String },
    #[error("model `{model}` has no field `{field}`")]
    FieldNotFound { model: String, field: String },
    #[error("model `{model}` already has a field `{field}`")]
    FieldExists { model: String, field: String },
    #[error("model `{0}` must have exactly one primary key field")]
    PrimaryKey(String),
    #[error("field `{model}.{field}` references missing model `{target}`")]
    RelationTargetMissing {
        model: String,
        field: String,
        target: String,
    },
    #[error("field `{model}.{field}` sets null on delete but is not nullable")]
    SetNullNotNullable { model: String, field: String },
    #[error("model `{model}` is still referenced by `{by}`")]
    StillReferenced { model: String, by: String },
    #[error("model `{model}` still holds relation field `{field}`")]
    HoldsRelation { model: String, field: String },
    #[error("primary key `{model}.{field}` cannot be removed")]
    PrimaryKeyRemoval { model: String, field: String },
    #[error("field `{model}.{field}` is part of a unique constraint")]
    FieldInConstraint { model: String, field: String },
}
