//! Dependency resolution and all-or-nothing application of transitions
use crate::editor::ApplyError;
use crate::schema::TransitionKey;

mod executor;
mod graph;
mod ledger;

pub use executor::Executor;
pub use graph::TransitionGraph;
pub use ledger::Ledger;

#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    #[error("transition `{0}` is already applied")]
    AlreadyApplied(TransitionKey),
    #[error("transition `{transition}` depends on `{dependency}` which is not applied")]
    DependencyNotApplied {
        transition: TransitionKey,
        dependency: TransitionKey,
    },
    #[error("transition `{transition}` depends on unknown transition `{dependency}`")]
    UnknownDependency {
        transition: TransitionKey,
        dependency: TransitionKey,
    },
    #[error("no transition matches `{0}`")]
    UnknownTransition(String),
    #[error("transition `{0}` is registered twice")]
    Duplicate(TransitionKey),
    #[error("transition dependencies form a cycle through `{0}`")]
    Cycle(TransitionKey),
    #[error("transition `{0}` has no numeric prefix")]
    Unnumbered(TransitionKey),
    #[error("transition `{transition}` failed at operation {index} ({operation}): {source}")]
    Operation {
        transition: TransitionKey,
        index: usize,
        operation: String,
        source: ApplyError,
    },
}
