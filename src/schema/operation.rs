//! The atomic schema edits a transition is made of
use super::field::Field;
use super::model::{ModelOptions, ModelState};
use super::state::ProjectState;
use crate::editor::{ApplyError, SchemaEditor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single schema edit
///
/// Model names are resolved case-insensitively against the project state at the time the
/// operation is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Operation {
    CreateModel {
        name: String,
        fields: Vec<Field>,
        #[serde(default)]
        options: ModelOptions,
    },
    DeleteModel {
        name: String,
    },
    RenameModel {
        old_name: String,
        new_name: String,
    },
    /// Binds the model to another storage table
    AlterModelTable {
        name: String,
        table: String,
    },
    AlterUniqueTogether {
        name: String,
        unique_together: Vec<Vec<String>>,
    },
    AddField {
        model_name: String,
        field: Field,
    },
    RemoveField {
        model_name: String,
        name: String,
    },
    RenameField {
        model_name: String,
        old_name: String,
        new_name: String,
    },
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::CreateModel { name, .. } => write!(f, "Create model {}", name),
            Operation::DeleteModel { name } => write!(f, "Delete model {}", name),
            Operation::RenameModel { old_name, new_name } => {
                write!(f, "Rename model {} to {}", old_name, new_name)
            }
            Operation::AlterModelTable { name, table } => {
                write!(f, "Rename table for {} to {}", name, table)
            }
            Operation::AlterUniqueTogether {
                name,
                unique_together,
            } => write!(
                f,
                "Alter unique_together for {} ({} constraint(s))",
                name,
                unique_together.len()
            ),
            Operation::AddField { model_name, field } => {
                write!(f, "Add field {} to {}", field.name, model_name)
            }
            Operation::RemoveField { model_name, name } => {
                write!(f, "Remove field {} from {}", name, model_name)
            }
            Operation::RenameField {
                model_name,
                old_name,
                new_name,
            } => write!(
                f,
                "Rename field {} on {} to {}",
                old_name, model_name, new_name
            ),
        }
    }
}

/// Maps a model name used by an operation onto the name the model currently has
pub type Resolve<'a> = &'a dyn Fn(&ProjectState, &str) -> String;

impl Operation {
    pub fn create_model(name: &str, fields: Vec<Field>, options: ModelOptions) -> Self {
        Operation::CreateModel {
            name: name.to_owned(),
            fields,
            options,
        }
    }

    pub fn delete_model(name: &str) -> Self {
        Operation::DeleteModel {
            name: name.to_owned(),
        }
    }

    pub fn rename_model(old_name: &str, new_name: &str) -> Self {
        Operation::RenameModel {
            old_name: old_name.to_owned(),
            new_name: new_name.to_owned(),
        }
    }

    pub fn alter_model_table(name: &str, table: &str) -> Self {
        Operation::AlterModelTable {
            name: name.to_owned(),
            table: table.to_owned(),
        }
    }

    pub fn add_field(model_name: &str, field: Field) -> Self {
        Operation::AddField {
            model_name: model_name.to_owned(),
            field,
        }
    }

    pub fn remove_field(model_name: &str, name: &str) -> Self {
        Operation::RemoveField {
            model_name: model_name.to_owned(),
            name: name.to_owned(),
        }
    }

    /// Applies the edit to the state and carries out the structural change through `editor`
    ///
    /// On error the state may be partially modified, callers apply operations to a copy.
    pub fn apply(
        &self,
        state: &mut ProjectState,
        editor: &mut dyn SchemaEditor,
        resolve: Resolve<'_>,
    ) -> Result<(), ApplyError> {
        match self {
            Operation::CreateModel {
                name,
                fields,
                options,
            } => {
                let mut fields = fields.clone();
                for field in &mut fields {
                    if let Some(relation) = field.relation_mut() {
                        relation.to = canonical(state, resolve, &relation.to);
                    }
                }

                let model = ModelState {
                    name: name.clone(),
                    fields,
                    options: options.clone(),
                };
                let table = model.db_table(state.app_label());

                state.add_model(model.clone())?;
                editor.create_table(&table, &model, state)
            }
            Operation::DeleteModel { name } => {
                let name = resolve(state, name);
                let table = state.db_table(&name)?;

                state.remove_model(&name)?;
                editor.delete_table(&table)
            }
            Operation::RenameModel { old_name, new_name } => {
                let old_table = state.db_table(old_name)?;
                state.rename_model(old_name, new_name)?;
                let new_table = state.db_table(new_name)?;

                if old_table != new_table {
                    editor.rename_table(&old_table, &new_table)?;
                }

                Ok(())
            }
            Operation::AlterModelTable { name, table } => {
                let name = resolve(state, name);
                let old_table = state.db_table(&name)?;
                state.alter_model_table(&name, table)?;

                if &old_table != table {
                    editor.rename_table(&old_table, table)?;
                }

                Ok(())
            }
            Operation::AlterUniqueTogether {
                name,
                unique_together,
            } => {
                let name = resolve(state, name);
                let table = state.db_table(&name)?;
                let old = unique_columns(state.model(&name)?);

                state.alter_unique_together(&name, unique_together.clone())?;
                let new = unique_columns(state.model(&name)?);

                editor.alter_unique_together(&table, &old, &new)
            }
            Operation::AddField { model_name, field } => {
                let model_name = resolve(state, model_name);
                let table = state.db_table(&model_name)?;

                let mut field = field.clone();
                if let Some(relation) = field.relation_mut() {
                    relation.to = canonical(state, resolve, &relation.to);
                }

                state.add_field(&model_name, field.clone())?;
                editor.add_column(&table, &field, state)
            }
            Operation::RemoveField { model_name, name } => {
                let model_name = resolve(state, model_name);
                let table = state.db_table(&model_name)?;

                let field = state.remove_field(&model_name, name)?;
                editor.remove_column(&table, &field)
            }
            Operation::RenameField {
                model_name,
                old_name,
                new_name,
            } => {
                let model_name = resolve(state, model_name);
                let table = state.db_table(&model_name)?;

                state.rename_field(&model_name, old_name, new_name)?;

                let model = state.model(&model_name)?;
                let new = match model.field(new_name) {
                    Some(field) => field.clone(),
                    None => {
                        return Err(crate::schema::SchemaError::FieldNotFound {
                            model: model.name.clone(),
                            field: new_name.clone(),
                        }
                        .into())
                    }
                };
                let old = Field {
                    name: old_name.clone(),
                    ..new.clone()
                };

                editor.rename_column(&table, &old, &new)
            }
        }
    }

    /// Names of every model this operation needs to exist before it is applied
    pub fn requires(&self) -> Vec<&str> {
        match self {
            Operation::CreateModel { fields, .. } => fields
                .iter()
                .filter_map(|f| f.relation())
                .map(|r| r.to.as_str())
                .collect(),
            Operation::DeleteModel { name }
            | Operation::AlterModelTable { name, .. }
            | Operation::AlterUniqueTogether { name, .. } => vec![name.as_str()],
            Operation::RenameModel { old_name, .. } => vec![old_name.as_str()],
            Operation::AddField { model_name, field } => {
                let mut names = vec![model_name.as_str()];
                names.extend(field.relation().map(|r| r.to.as_str()));
                names
            }
            Operation::RemoveField { model_name, .. }
            | Operation::RenameField { model_name, .. } => vec![model_name.as_str()],
        }
    }
}

fn canonical(state: &ProjectState, resolve: Resolve<'_>, name: &str) -> String {
    let resolved = resolve(state, name);

    match state.model(&resolved) {
        Ok(model) => model.name.clone(),
        Err(_) => resolved,
    }
}

fn unique_columns(model: &ModelState) -> Vec<Vec<String>> {
    model
        .options
        .unique_together
        .iter()
        .map(|set| model.columns_of(set))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::MemoryDatabase;
    use crate::schema::OnDelete;

    fn identity(_: &ProjectState, name: &str) -> String {
        name.to_owned()
    }

    fn apply_all(ops: &[Operation]) -> Result<(ProjectState, MemoryDatabase), ApplyError> {
        let mut state = ProjectState::new("adminapi");
        let mut db = MemoryDatabase::default();

        for op in ops {
            op.apply(&mut state, &mut db, &identity)?;
        }

        Ok((state, db))
    }

    fn room() -> Operation {
        Operation::create_model(
            "Room",
            vec![Field::auto("room_id"), Field::char("room_name", 255)],
            ModelOptions::default(),
        )
    }

    #[test]
    fn descriptions() {
        assert_eq!(room().to_string(), "Create model Room");
        assert_eq!(
            Operation::remove_field("Hardware", "resource").to_string(),
            "Remove field resource from Hardware"
        );
        assert_eq!(
            Operation::alter_model_table("resources", "resources").to_string(),
            "Rename table for resources to resources"
        );
    }

    #[test]
    fn create_then_rename_field() {
        let (state, db) = apply_all(&[
            room(),
            Operation::RenameField {
                model_name: "Room".into(),
                old_name: "room_name".into(),
                new_name: "name".into(),
            },
        ])
        .unwrap();

        assert!(state.model("Room").unwrap().field("name").is_some());
        assert!(db.table("adminapi_room").unwrap().column("name").is_some());
        assert!(db.table("adminapi_room").unwrap().column("room_name").is_none());
    }

    #[test]
    fn alter_table_renames_storage() {
        let (state, db) =
            apply_all(&[room(), Operation::alter_model_table("Room", "room")]).unwrap();

        assert_eq!(state.db_table("Room").unwrap(), "room");
        assert!(db.table("room").is_some());
        assert!(db.table("adminapi_room").is_none());
    }

    #[test]
    fn alter_table_to_same_name_is_storage_noop() {
        let (_, db) = apply_all(&[
            room(),
            Operation::alter_model_table("Room", "room"),
            Operation::alter_model_table("Room", "room"),
        ])
        .unwrap();

        assert!(db.table("room").is_some());
    }

    #[test]
    fn requires_lists_relation_targets() {
        let op = Operation::create_model(
            "Rents",
            vec![
                Field::big_auto("id"),
                Field::foreign_key("payment", "Payment", OnDelete::Cascade),
                Field::foreign_key("user", "UserRoomBooking", OnDelete::Cascade),
            ],
            ModelOptions::default(),
        );

        assert_eq!(op.requires(), vec!["Payment", "UserRoomBooking"]);
    }

    #[test]
    fn serde_tags_operations() {
        let value = serde_json::to_value(Operation::delete_model("Book")).unwrap();

        assert_eq!(
            value,
            serde_json::json!({ "operation": "delete_model", "name": "Book" })
        );
    }
}
