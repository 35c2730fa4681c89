//! Renders schema edits as PostgreSQL DDL
use super::{unique_constraint_name, ApplyError, SchemaEditor};
use crate::schema::{Field, FieldDefault, FieldKind, ModelState, ProjectState, SchemaError};
use barrel::backend::Pg;
use barrel::{types, Migration};

/// Collects the DDL of a sequence of operations
///
/// Plain columns are described with barrel types, relation columns and constraints are injected as
/// custom SQL since they carry referential actions.
pub struct SqlEditor {
    migration: Migration,
}

impl Default for SqlEditor {
    fn default() -> Self {
        Self {
            migration: Migration::new(),
        }
    }
}

impl SqlEditor {
    /// Returns the collected SQL
    pub fn make(&self) -> String {
        self.migration.make::<Pg>()
    }
}

#[derive(Clone)]
enum ColumnSpec {
    Typed(String, Field),
    Raw(String),
}

/// True if the field can be expressed with a barrel type
fn is_plain(field: &Field) -> bool {
    field.relation().is_none() && matches!(field.default, None | Some(FieldDefault::Bool(_)))
}

fn barrel_type(field: &Field) -> types::Type {
    let base = match &field.kind {
        FieldKind::Auto => types::custom("SERIAL"),
        FieldKind::BigAuto => types::custom("BIGSERIAL"),
        FieldKind::Char { max_length } => types::varchar(*max_length as usize),
        FieldKind::Text => types::text(),
        FieldKind::Boolean => types::boolean(),
        FieldKind::Date => types::date(),
        FieldKind::Integer | FieldKind::ForeignKey(_) | FieldKind::OneToOne(_) => types::integer(),
    };

    let ty = base
        .nullable(field.null)
        .unique(field.unique && !field.primary_key)
        .primary(field.primary_key);

    match field.default {
        Some(FieldDefault::Bool(value)) => ty.default(value),
        _ => ty,
    }
}

/// SQL type of a column holding `field` or a reference to it
fn sql_type(field: &Field, state: &ProjectState) -> Result<String, SchemaError> {
    Ok(match &field.kind {
        FieldKind::Auto | FieldKind::Integer => "INTEGER".to_owned(),
        FieldKind::BigAuto => "BIGINT".to_owned(),
        FieldKind::Char { max_length } => format!("VARCHAR({})", max_length),
        FieldKind::Text => "TEXT".to_owned(),
        FieldKind::Boolean => "BOOLEAN".to_owned(),
        FieldKind::Date => "DATE".to_owned(),
        FieldKind::ForeignKey(relation) | FieldKind::OneToOne(relation) => {
            let (_, pk) = state.relation_target(&relation.to)?;
            if pk == field {
                return Err(SchemaError::PrimaryKey(relation.to.clone()));
            }
            sql_type(pk, state)?
        }
    })
}

/// Full column definition for fields barrel cannot express
fn column_definition(field: &Field, state: &ProjectState) -> Result<String, SchemaError> {
    let mut sql = format!("\"{}\" {}", field.column(), sql_type(field, state)?);

    if field.primary_key {
        sql.push_str(" PRIMARY KEY");
    } else {
        if field.unique {
            sql.push_str(" UNIQUE");
        }
        if !field.null {
            sql.push_str(" NOT NULL");
        }
    }

    if let Some(default) = &field.default {
        sql.push_str(&format!(" DEFAULT {}", default));
    }

    if let Some(relation) = field.relation() {
        let (table, pk) = state.relation_target(&relation.to)?;
        sql.push_str(&format!(
            " REFERENCES \"{}\" (\"{}\") ON DELETE {}",
            table,
            pk.column(),
            relation.on_delete.as_sql()
        ));
    }

    Ok(sql)
}

fn unique_definition(table: &str, columns: &[String]) -> String {
    let quoted: Vec<String> = columns.iter().map(|c| format!("\"{}\"", c)).collect();

    format!(
        "CONSTRAINT \"{}\" UNIQUE ({})",
        unique_constraint_name(table, columns),
        quoted.join(", ")
    )
}

impl SchemaEditor for SqlEditor {
    fn create_table(
        &mut self,
        table: &str,
        model: &ModelState,
        state: &ProjectState,
    ) -> Result<(), ApplyError> {
        let mut specs = Vec::with_capacity(model.fields.len());

        for field in &model.fields {
            if is_plain(field) {
                specs.push(ColumnSpec::Typed(field.column(), field.clone()));
            } else {
                specs.push(ColumnSpec::Raw(column_definition(field, state)?));
            }
        }

        for set in &model.options.unique_together {
            specs.push(ColumnSpec::Raw(unique_definition(
                table,
                &model.columns_of(set),
            )));
        }

        self.migration.create_table(table.to_owned(), move |t| {
            for spec in &specs {
                match spec {
                    ColumnSpec::Typed(name, field) => {
                        t.add_column(name.clone(), barrel_type(field));
                    }
                    ColumnSpec::Raw(sql) => {
                        t.inject_custom(sql.clone());
                    }
                }
            }
        });

        Ok(())
    }

    fn delete_table(&mut self, table: &str) -> Result<(), ApplyError> {
        self.migration.drop_table(table.to_owned());
        Ok(())
    }

    fn rename_table(&mut self, old: &str, new: &str) -> Result<(), ApplyError> {
        self.migration.rename_table(old.to_owned(), new.to_owned());
        Ok(())
    }

    fn add_column(
        &mut self,
        table: &str,
        field: &Field,
        state: &ProjectState,
    ) -> Result<(), ApplyError> {
        if is_plain(field) {
            let name = field.column();
            let field = field.clone();

            self.migration.change_table(table.to_owned(), move |t| {
                t.add_column(name.clone(), barrel_type(&field));
            });
        } else {
            let definition = column_definition(field, state)?;

            self.migration.inject_custom(format!(
                "ALTER TABLE \"{}\" ADD COLUMN {}",
                table, definition
            ));
        }

        Ok(())
    }

    fn remove_column(&mut self, table: &str, field: &Field) -> Result<(), ApplyError> {
        let column = field.column();

        self.migration.change_table(table.to_owned(), move |t| {
            t.drop_column(column.clone());
        });

        Ok(())
    }

    fn rename_column(&mut self, table: &str, old: &Field, new: &Field) -> Result<(), ApplyError> {
        let (old, new) = (old.column(), new.column());

        self.migration.change_table(table.to_owned(), move |t| {
            t.rename_column(old.clone(), new.clone());
        });

        Ok(())
    }

    fn alter_unique_together(
        &mut self,
        table: &str,
        old: &[Vec<String>],
        new: &[Vec<String>],
    ) -> Result<(), ApplyError> {
        for columns in old.iter().filter(|set| !new.contains(*set)) {
            self.migration.inject_custom(format!(
                "ALTER TABLE \"{}\" DROP CONSTRAINT \"{}\"",
                table,
                unique_constraint_name(table, columns)
            ));
        }

        for columns in new.iter().filter(|set| !old.contains(*set)) {
            self.migration.inject_custom(format!(
                "ALTER TABLE \"{}\" ADD {}",
                table,
                unique_definition(table, columns)
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ModelOptions, OnDelete};

    fn state() -> ProjectState {
        let mut state = ProjectState::new("adminapi");
        state
            .add_model(ModelState {
                name: "Room".into(),
                fields: vec![Field::auto("room_id")],
                options: ModelOptions::default().db_table("room"),
            })
            .unwrap();
        state
    }

    #[test]
    fn relation_columns_carry_referential_action() {
        let state = state();
        let field = Field::foreign_key("room", "Room", OnDelete::Cascade);

        assert_eq!(
            column_definition(&field, &state).unwrap(),
            "\"room_id\" INTEGER NOT NULL REFERENCES \"room\" (\"room_id\") ON DELETE CASCADE"
        );

        let field = Field::foreign_key("room", "Room", OnDelete::SetNull).null();
        assert!(column_definition(&field, &state)
            .unwrap()
            .ends_with("ON DELETE SET NULL"));
    }

    #[test]
    fn owning_key_is_primary() {
        let state = state();
        let field = Field::one_to_one("room", "Room", OnDelete::Cascade).primary_key();

        assert_eq!(
            column_definition(&field, &state).unwrap(),
            "\"room_id\" INTEGER PRIMARY KEY REFERENCES \"room\" (\"room_id\") ON DELETE CASCADE"
        );
    }

    #[test]
    fn text_defaults_are_rendered_raw() {
        let field = Field::char("user_role", 50).default("user");

        assert!(!is_plain(&field));
        assert_eq!(
            column_definition(&field, &state()).unwrap(),
            "\"user_role\" VARCHAR(50) NOT NULL DEFAULT 'user'"
        );
        assert!(is_plain(&Field::boolean("books_flag").default(false)));
    }

    #[test]
    fn unique_together_is_named() {
        let mut editor = SqlEditor::default();
        editor
            .alter_unique_together(
                "rents",
                &[],
                &[vec!["resource_id".into(), "payment_id".into()]],
            )
            .unwrap();

        assert!(editor.make().contains(
            "ALTER TABLE \"rents\" ADD CONSTRAINT \"rents_resource_id_payment_id_uniq\" UNIQUE (\"resource_id\", \"payment_id\")"
        ));
    }
}
