//! Schema model: fields, models, the project state and the transitions editing it
mod error;
mod field;
mod model;
mod operation;
mod state;
mod transition;

pub use error::SchemaError;
pub use field::{Field, FieldDefault, FieldKind, OnDelete, Relation};
pub use model::{default_db_table, ModelOptions, ModelState};
pub use operation::{Operation, Resolve};
pub use state::ProjectState;
pub use transition::{Transition, TransitionKey};
