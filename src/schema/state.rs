//! In-memory model of the schema that operations are validated against
use super::error::SchemaError;
use super::field::{Field, FieldKind, OnDelete};
use super::model::ModelState;
use std::collections::BTreeMap;

type Result<T> = std::result::Result<T, SchemaError>;

/// All models of one app at a point of the transition history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectState {
    app_label: String,
    models: BTreeMap<String, ModelState>,
}

impl ProjectState {
    pub fn new(app_label: &str) -> Self {
        Self {
            app_label: app_label.to_owned(),
            models: BTreeMap::new(),
        }
    }

    pub fn app_label(&self) -> &str {
        &self.app_label
    }

    /// Looks up a model by name, case-insensitively
    pub fn model(&self, name: &str) -> Result<&ModelState> {
        self.models
            .get(&name.to_lowercase())
            .ok_or_else(|| SchemaError::ModelNotFound(name.to_owned()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(&name.to_lowercase())
    }

    pub fn models(&self) -> impl Iterator<Item = &ModelState> {
        self.models.values()
    }

    pub fn db_table(&self, name: &str) -> Result<String> {
        Ok(self.model(name)?.db_table(&self.app_label))
    }

    /// Resolves the target of a relation to its storage table and key column
    pub fn relation_target(&self, to: &str) -> Result<(String, &Field)> {
        let model = self.model(to)?;
        let pk = model
            .primary_key()
            .ok_or_else(|| SchemaError::PrimaryKey(model.name.clone()))?;

        Ok((model.db_table(&self.app_label), pk))
    }

    /// Every relation field of another model pointing at `name`, as `(model, field)`
    pub fn referrers(&self, name: &str) -> Vec<(&ModelState, &Field)> {
        let key = name.to_lowercase();

        self.models
            .values()
            .filter(|m| m.key() != key)
            .flat_map(|m| m.fields.iter().map(move |f| (m, f)))
            .filter(|(_, f)| matches!(f.relation(), Some(r) if r.to.to_lowercase() == key))
            .collect()
    }

    pub fn add_model(&mut self, model: ModelState) -> Result<()> {
        if self.contains(&model.name) {
            return Err(SchemaError::ModelExists(model.name));
        }

        self.check_table_free(&model.db_table(&self.app_label), &model.key())?;

        if model.fields.iter().filter(|f| f.primary_key).count() != 1 {
            return Err(SchemaError::PrimaryKey(model.name));
        }

        for (index, field) in model.fields.iter().enumerate() {
            if model.fields[..index].iter().any(|f| f.name == field.name) {
                return Err(SchemaError::FieldExists {
                    model: model.name.clone(),
                    field: field.name.clone(),
                });
            }

            self.check_field(&model, field)?;
        }

        for set in &model.options.unique_together {
            check_fields_exist(&model, set)?;
        }

        self.models.insert(model.key(), model);

        Ok(())
    }

    /// Removes a model that is no longer part of the reference graph
    pub fn remove_model(&mut self, name: &str) -> Result<ModelState> {
        let model = self.model(name)?;

        if let Some((other, field)) = self.referrers(name).first() {
            return Err(SchemaError::StillReferenced {
                model: model.name.clone(),
                by: format!("{}.{}", other.name, field.name),
            });
        }

        if let Some(field) = model.fields.iter().find(|f| f.relation().is_some()) {
            return Err(SchemaError::HoldsRelation {
                model: model.name.clone(),
                field: field.name.clone(),
            });
        }

        self.models
            .remove(&name.to_lowercase())
            .ok_or_else(|| SchemaError::ModelNotFound(name.to_owned()))
    }

    /// Renames a model and rewrites every relation pointing at it
    pub fn rename_model(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        let old_key = old_name.to_lowercase();
        let new_key = new_name.to_lowercase();

        if old_key != new_key && self.contains(new_name) {
            return Err(SchemaError::ModelExists(new_name.to_owned()));
        }

        let mut model = self
            .models
            .remove(&old_key)
            .ok_or_else(|| SchemaError::ModelNotFound(old_name.to_owned()))?;

        if model.options.db_table.is_none() {
            let table = model.db_table(&self.app_label);
            let renamed = super::model::default_db_table(&self.app_label, new_name);

            if table != renamed {
                if let Err(e) = self.check_table_free(&renamed, &new_key) {
                    self.models.insert(old_key, model);
                    return Err(e);
                }
            }
        }

        model.name = new_name.to_owned();
        self.models.insert(new_key, model);

        for model in self.models.values_mut() {
            for field in &mut model.fields {
                if let Some(relation) = field.relation_mut() {
                    if relation.to.to_lowercase() == old_key {
                        relation.to = new_name.to_owned();
                    }
                }
            }
        }

        Ok(())
    }

    pub fn alter_model_table(&mut self, name: &str, table: &str) -> Result<()> {
        let key = self.model(name)?.key();
        self.check_table_free(table, &key)?;

        if let Some(model) = self.models.get_mut(&key) {
            model.options.db_table = Some(table.to_owned());
        }

        Ok(())
    }

    pub fn alter_unique_together(&mut self, name: &str, sets: Vec<Vec<String>>) -> Result<()> {
        let model = self.model(name)?;

        for set in &sets {
            check_fields_exist(model, set)?;
        }

        let key = model.key();
        if let Some(model) = self.models.get_mut(&key) {
            model.options.unique_together = sets;
        }

        Ok(())
    }

    pub fn add_field(&mut self, model_name: &str, field: Field) -> Result<()> {
        let model = self.model(model_name)?;

        if model.field(&field.name).is_some() {
            return Err(SchemaError::FieldExists {
                model: model.name.clone(),
                field: field.name,
            });
        }

        if field.primary_key {
            return Err(SchemaError::PrimaryKey(model.name.clone()));
        }

        self.check_field(model, &field)?;

        let key = model.key();
        if let Some(model) = self.models.get_mut(&key) {
            model.fields.push(field);
        }

        Ok(())
    }

    pub fn remove_field(&mut self, model_name: &str, field_name: &str) -> Result<Field> {
        let model = self.model(model_name)?;
        let field = model.field(field_name).ok_or_else(|| SchemaError::FieldNotFound {
            model: model.name.clone(),
            field: field_name.to_owned(),
        })?;

        if field.primary_key {
            return Err(SchemaError::PrimaryKeyRemoval {
                model: model.name.clone(),
                field: field.name.clone(),
            });
        }

        if model
            .options
            .unique_together
            .iter()
            .any(|set| set.iter().any(|f| f == field_name))
        {
            return Err(SchemaError::FieldInConstraint {
                model: model.name.clone(),
                field: field.name.clone(),
            });
        }

        let key = model.key();
        let model = self
            .models
            .get_mut(&key)
            .ok_or_else(|| SchemaError::ModelNotFound(model_name.to_owned()))?;
        let index = model
            .fields
            .iter()
            .position(|f| f.name == field_name)
            .ok_or_else(|| SchemaError::FieldNotFound {
                model: model_name.to_owned(),
                field: field_name.to_owned(),
            })?;

        Ok(model.fields.remove(index))
    }

    pub fn rename_field(&mut self, model_name: &str, old_name: &str, new_name: &str) -> Result<()> {
        let model = self.model(model_name)?;

        if model.field(old_name).is_none() {
            return Err(SchemaError::FieldNotFound {
                model: model.name.clone(),
                field: old_name.to_owned(),
            });
        }

        if model.field(new_name).is_some() {
            return Err(SchemaError::FieldExists {
                model: model.name.clone(),
                field: new_name.to_owned(),
            });
        }

        let key = model.key();
        if let Some(model) = self.models.get_mut(&key) {
            for field in &mut model.fields {
                if field.name == old_name {
                    field.name = new_name.to_owned();
                }
            }

            for set in &mut model.options.unique_together {
                for field in set.iter_mut() {
                    if field.as_str() == old_name {
                        *field = new_name.to_owned();
                    }
                }
            }
        }

        Ok(())
    }

    fn check_table_free(&self, table: &str, own_key: &str) -> Result<()> {
        match self
            .models
            .values()
            .find(|m| m.key() != own_key && m.db_table(&self.app_label) == table)
        {
            Some(other) => Err(SchemaError::TableTaken {
                table: table.to_owned(),
                model: other.name.clone(),
            }),
            None => Ok(()),
        }
    }

    fn check_field(&self, model: &ModelState, field: &Field) -> Result<()> {
        let relation = match &field.kind {
            FieldKind::ForeignKey(relation) | FieldKind::OneToOne(relation) => relation,
            _ => return Ok(()),
        };

        let self_reference = relation.to.to_lowercase() == model.key();
        if !self_reference && !self.contains(&relation.to) {
            return Err(SchemaError::RelationTargetMissing {
                model: model.name.clone(),
                field: field.name.clone(),
                target: relation.to.clone(),
            });
        }

        if relation.on_delete == OnDelete::SetNull && !field.null {
            return Err(SchemaError::SetNullNotNullable {
                model: model.name.clone(),
                field: field.name.clone(),
            });
        }

        Ok(())
    }
}

fn check_fields_exist(model: &ModelState, fields: &[String]) -> Result<()> {
    match fields.iter().find(|f| model.field(f).is_none()) {
        Some(missing) => Err(SchemaError::FieldNotFound {
            model: model.name.clone(),
            field: missing.clone(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ModelOptions;

    fn model(name: &str, fields: Vec<Field>) -> ModelState {
        ModelState {
            name: name.into(),
            fields,
            options: ModelOptions::default(),
        }
    }

    fn state() -> ProjectState {
        let mut state = ProjectState::new("adminapi");
        state
            .add_model(model("Room", vec![Field::auto("room_id")]))
            .unwrap();
        state
            .add_model(model(
                "Policy",
                vec![
                    Field::auto("id"),
                    Field::foreign_key("room", "Room", OnDelete::Cascade),
                ],
            ))
            .unwrap();
        state
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let state = state();

        assert_eq!(state.model("room").unwrap().name, "Room");
        assert_eq!(state.db_table("ROOM").unwrap(), "adminapi_room");
    }

    #[test]
    fn relation_target_must_exist() {
        let mut state = state();
        let err = state
            .add_model(model(
                "Rent",
                vec![
                    Field::auto("id"),
                    Field::foreign_key("payment", "Payment", OnDelete::Cascade),
                ],
            ))
            .unwrap_err();

        assert_eq!(
            err,
            SchemaError::RelationTargetMissing {
                model: "Rent".into(),
                field: "payment".into(),
                target: "Payment".into()
            }
        );
    }

    #[test]
    fn set_null_requires_nullable() {
        let mut state = state();
        let err = state
            .add_field(
                "Policy",
                Field::foreign_key("author", "Room", OnDelete::SetNull),
            )
            .unwrap_err();

        assert!(matches!(err, SchemaError::SetNullNotNullable { .. }));
    }

    #[test]
    fn exactly_one_primary_key() {
        let mut state = state();
        let err = state
            .add_model(model("Loose", vec![Field::text("body")]))
            .unwrap_err();

        assert_eq!(err, SchemaError::PrimaryKey("Loose".into()));
    }

    #[test]
    fn referenced_model_cannot_be_removed() {
        let mut state = state();

        assert_eq!(
            state.remove_model("Room").unwrap_err(),
            SchemaError::StillReferenced {
                model: "Room".into(),
                by: "Policy.room".into()
            }
        );
    }

    #[test]
    fn model_holding_relations_cannot_be_removed() {
        let mut state = state();

        assert!(matches!(
            state.remove_model("Policy").unwrap_err(),
            SchemaError::HoldsRelation { .. }
        ));

        state.remove_field("Policy", "room").unwrap();
        state.remove_model("Policy").unwrap();
        state.remove_model("Room").unwrap();
        assert_eq!(state.models().count(), 0);
    }

    #[test]
    fn rename_rewrites_relations() {
        let mut state = state();
        state.rename_model("Room", "Rooms").unwrap();

        let policy = state.model("Policy").unwrap();
        assert_eq!(policy.field("room").unwrap().relation().unwrap().to, "Rooms");
        assert_eq!(state.db_table("Rooms").unwrap(), "adminapi_rooms");
        assert!(!state.contains("Room"));
    }

    #[test]
    fn rename_keeps_explicit_table() {
        let mut state = state();
        state.alter_model_table("Room", "room").unwrap();
        state.rename_model("Room", "Rooms").unwrap();

        assert_eq!(state.db_table("Rooms").unwrap(), "room");
    }

    #[test]
    fn table_names_are_unique() {
        let mut state = state();

        assert_eq!(
            state
                .alter_model_table("Policy", "adminapi_room")
                .unwrap_err(),
            SchemaError::TableTaken {
                table: "adminapi_room".into(),
                model: "Room".into()
            }
        );
    }

    #[test]
    fn unique_together_fields_are_protected() {
        let mut state = state();
        state.add_field("Policy", Field::text("body")).unwrap();
        state
            .alter_unique_together("Policy", vec![vec!["room".into(), "body".into()]])
            .unwrap();

        assert!(matches!(
            state.remove_field("Policy", "body").unwrap_err(),
            SchemaError::FieldInConstraint { .. }
        ));

        state.rename_field("Policy", "body", "text").unwrap();
        assert_eq!(
            state.model("Policy").unwrap().options.unique_together,
            vec![vec!["room".to_string(), "text".to_string()]]
        );
    }

    #[test]
    fn primary_key_cannot_be_removed() {
        let mut state = state();

        assert!(matches!(
            state.remove_field("Room", "room_id").unwrap_err(),
            SchemaError::PrimaryKeyRemoval { .. }
        ));
    }
}
