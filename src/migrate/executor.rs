use super::{Ledger, MigrateError, TransitionGraph};
use crate::editor::SchemaEditor;
use crate::schema::{ProjectState, Transition, TransitionKey};

/// Applies transitions to a store, tracking what has been applied
///
/// A transition either applies completely or not at all: operations run against copies of the
/// project state and the store, which replace the originals only once every operation
/// succeeded.
#[derive(Debug)]
pub struct Executor<E> {
    state: ProjectState,
    editor: E,
    ledger: Ledger,
}

impl<E: SchemaEditor + Clone> Executor<E> {
    pub fn new(app_label: &str, editor: E) -> Self {
        Self {
            state: ProjectState::new(app_label),
            editor,
            ledger: Ledger::default(),
        }
    }

    pub fn state(&self) -> &ProjectState {
        &self.state
    }

    pub fn editor(&self) -> &E {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut E {
        &mut self.editor
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Applies a single transition
    ///
    /// Refuses transitions that are already applied or whose dependencies are not.
    pub fn apply(&mut self, transition: &Transition) -> Result<(), MigrateError> {
        if self.ledger.contains(&transition.key) {
            return Err(MigrateError::AlreadyApplied(transition.key.clone()));
        }

        if let Some(dependency) = transition
            .dependencies
            .iter()
            .find(|dependency| !self.ledger.contains(dependency))
        {
            return Err(MigrateError::DependencyNotApplied {
                transition: transition.key.clone(),
                dependency: dependency.clone(),
            });
        }

        let mut state = self.state.clone();
        let mut editor = self.editor.clone();

        if let Err(e) = transition.apply_to(&mut state, &mut editor) {
            log::error!("{}, nothing was changed", e);
            return Err(e);
        }

        self.state = state;
        self.editor = editor;
        self.ledger.record(transition.key.clone());

        log::info!(
            "Applied {} ({} operations)",
            transition.key,
            transition.operations.len()
        );

        Ok(())
    }

    /// Applies every pending transition of `graph` up to `target`
    ///
    /// Stops at the first failing transition. Transitions applied before it stay applied.
    pub fn migrate(
        &mut self,
        graph: &TransitionGraph,
        target: Option<&TransitionKey>,
    ) -> Result<Vec<TransitionKey>, MigrateError> {
        let plan = graph.plan(&self.ledger, target)?;

        if plan.is_empty() {
            log::info!("No transitions to apply");
        }

        let mut applied = Vec::with_capacity(plan.len());
        for transition in plan {
            self.apply(transition)?;
            applied.push(transition.key.clone());
        }

        Ok(applied)
    }
}
