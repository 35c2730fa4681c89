//! Store-agnostic seam through which operations change a schema
//!
//! Every [`Operation`](crate::schema::Operation) first validates and updates the
//! [`ProjectState`], then asks a [`SchemaEditor`] to carry out the structural change. The
//! [`MemoryDatabase`] applies the change to in-memory tables holding rows, the [`SqlEditor`]
//! renders PostgreSQL DDL.
use crate::schema::{Field, ModelState, ProjectState, SchemaError};

pub mod memory;
pub mod sql;

pub use memory::{row, MemoryDatabase, Row, StoreError, Value};
pub use sql::SqlEditor;

#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Carries out structural changes on some store
///
/// Table and column names are already resolved by the caller. The project state passed to
/// [`create_table`](SchemaEditor::create_table) and [`add_column`](SchemaEditor::add_column)
/// contains the targets of the new relations.
pub trait SchemaEditor {
    fn create_table(
        &mut self,
        table: &str,
        model: &ModelState,
        state: &ProjectState,
    ) -> Result<(), ApplyError>;

    fn delete_table(&mut self, table: &str) -> Result<(), ApplyError>;

    fn rename_table(&mut self, old: &str, new: &str) -> Result<(), ApplyError>;

    fn add_column(
        &mut self,
        table: &str,
        field: &Field,
        state: &ProjectState,
    ) -> Result<(), ApplyError>;

    /// Drops the column of `field`, discarding its stored values
    fn remove_column(&mut self, table: &str, field: &Field) -> Result<(), ApplyError>;

    fn rename_column(&mut self, table: &str, old: &Field, new: &Field) -> Result<(), ApplyError>;

    /// Replaces the unique column sets of a table
    fn alter_unique_together(
        &mut self,
        table: &str,
        old: &[Vec<String>],
        new: &[Vec<String>],
    ) -> Result<(), ApplyError>;
}

/// Name of the constraint enforcing a unique column set
pub fn unique_constraint_name(table: &str, columns: &[String]) -> String {
    format!("{}_{}_uniq", table, columns.join("_"))
}
