//! A versioned, ordered set of schema edits
use super::operation::Operation;
use super::state::ProjectState;
use crate::editor::SchemaEditor;
use crate::migrate::MigrateError;
use displaydoc::Display;
use serde::{Deserialize, Serialize};

/// {app}.{name}
#[derive(Debug, Display, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransitionKey {
    pub app: String,
    pub name: String,
}

impl TransitionKey {
    pub fn new(app: &str, name: &str) -> Self {
        Self {
            app: app.to_owned(),
            name: name.to_owned(),
        }
    }

    /// The numeric prefix of the name, e.g. `3` for `0003_rents`
    pub fn number(&self) -> Option<u32> {
        let digits: String = self.name.chars().take_while(char::is_ascii_digit).collect();
        digits.parse().ok()
    }

    /// Matches `app.name`, `name` or the numeric prefix of the name
    pub fn matches(&self, query: &str) -> bool {
        if let Some((app, name)) = query.split_once('.') {
            return self.app == app && self.name == name;
        }

        self.name == query
            || (!query.is_empty()
                && query.chars().all(|c| c.is_ascii_digit())
                && query.parse::<u32>().ok() == self.number())
    }
}

/// A transition from schema state N-1 to state N
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub key: TransitionKey,
    /// Transitions that must be applied before this one
    pub dependencies: Vec<TransitionKey>,
    pub operations: Vec<Operation>,
}

impl Transition {
    pub fn new(app: &str, name: &str) -> Self {
        Self {
            key: TransitionKey::new(app, name),
            dependencies: Vec::new(),
            operations: Vec::new(),
        }
    }

    pub fn depends_on(mut self, app: &str, name: &str) -> Self {
        self.dependencies.push(TransitionKey::new(app, name));
        self
    }

    pub fn operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    /// Resolves a model name used by the operation at `index`
    ///
    /// Names present in the state resolve to themselves. A name that only exists because a later
    /// `RenameModel` of this transition introduces it resolves to the model's current name.
    pub fn resolve(&self, index: usize, state: &ProjectState, name: &str) -> String {
        if state.contains(name) {
            return name.to_owned();
        }

        self.operations
            .iter()
            .skip(index + 1)
            .find_map(|op| match op {
                Operation::RenameModel { old_name, new_name }
                    if new_name.eq_ignore_ascii_case(name) && state.contains(old_name) =>
                {
                    Some(old_name.clone())
                }
                _ => None,
            })
            .unwrap_or_else(|| name.to_owned())
    }

    /// Applies every operation in order without consulting a ledger
    ///
    /// Stops at the first failing operation, leaving `state` and `editor` partially modified.
    /// Use [`Executor`](crate::migrate::Executor) for all-or-nothing application.
    pub fn apply_to(
        &self,
        state: &mut ProjectState,
        editor: &mut dyn SchemaEditor,
    ) -> Result<(), MigrateError> {
        for (index, operation) in self.operations.iter().enumerate() {
            log::debug!("{} [{}] {}", self.key, index + 1, operation);

            let resolve = |state: &ProjectState, name: &str| self.resolve(index, state, name);

            operation
                .apply(state, editor, &resolve)
                .map_err(|source| MigrateError::Operation {
                    transition: self.key.clone(),
                    index: index + 1,
                    operation: operation.to_string(),
                    source,
                })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::MemoryDatabase;
    use crate::schema::{Field, ModelOptions, OnDelete};

    #[test]
    fn key_display_and_number() {
        let key = TransitionKey::new("adminapi", "0003_resourcesdetails");

        assert_eq!(key.to_string(), "adminapi.0003_resourcesdetails");
        assert_eq!(key.number(), Some(3));
        assert!(key.matches("3"));
        assert!(key.matches("0003"));
        assert!(key.matches("adminapi.0003_resourcesdetails"));
        assert!(!key.matches("other.0003_resourcesdetails"));
        assert!(!key.matches("4"));
    }

    fn base() -> (ProjectState, MemoryDatabase) {
        let mut state = ProjectState::new("adminapi");
        let mut db = MemoryDatabase::default();

        Transition::new("adminapi", "0001_initial")
            .operation(Operation::create_model(
                "Resource",
                vec![Field::auto("resource_id")],
                ModelOptions::default(),
            ))
            .apply_to(&mut state, &mut db)
            .unwrap();

        (state, db)
    }

    #[test]
    fn later_rename_resolves_new_name() {
        let (mut state, mut db) = base();

        let transition = Transition::new("adminapi", "0002_rename")
            .depends_on("adminapi", "0001_initial")
            .operation(Operation::create_model(
                "Details",
                vec![Field::one_to_one("resource", "Resources", OnDelete::Cascade).primary_key()],
                ModelOptions::default(),
            ))
            .operation(Operation::alter_model_table("resources", "resources"))
            .operation(Operation::rename_model("Resource", "Resources"));

        assert_eq!(transition.resolve(0, &state, "Resources"), "Resource");
        assert_eq!(transition.resolve(2, &state, "Resources"), "Resources");

        transition.apply_to(&mut state, &mut db).unwrap();

        let details = state.model("Details").unwrap();
        assert_eq!(
            details.field("resource").unwrap().relation().unwrap().to,
            "Resources"
        );
        assert_eq!(state.db_table("Resources").unwrap(), "resources");
        assert!(db.table("resources").is_some());
        assert!(db.table("adminapi_resource").is_none());
    }

    #[test]
    fn failing_operation_is_reported_with_position() {
        let (mut state, mut db) = base();

        let err = Transition::new("adminapi", "0002_broken")
            .operation(Operation::delete_model("Book"))
            .apply_to(&mut state, &mut db)
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "transition `adminapi.0002_broken` failed at operation 1 (Delete model Book): model `Book` does not exist"
        );
    }
}
