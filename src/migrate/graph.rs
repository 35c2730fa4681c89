use super::{Ledger, MigrateError};
use crate::schema::{Transition, TransitionKey};
use std::collections::BTreeMap;

type Result<T> = std::result::Result<T, MigrateError>;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Directed acyclic graph of transitions, each naming the transitions it depends on
#[derive(Debug, Clone, Default)]
pub struct TransitionGraph {
    transitions: Vec<Transition>,
}

impl TransitionGraph {
    /// Builds a graph and validates its dependencies
    pub fn from_transitions(transitions: impl IntoIterator<Item = Transition>) -> Result<Self> {
        let mut graph = Self::default();
        for transition in transitions {
            graph.add(transition)?;
        }

        graph.validate()?;

        Ok(graph)
    }

    pub fn add(&mut self, transition: Transition) -> Result<()> {
        if self.get(&transition.key).is_some() {
            return Err(MigrateError::Duplicate(transition.key));
        }

        self.transitions.push(transition);

        Ok(())
    }

    pub fn get(&self, key: &TransitionKey) -> Option<&Transition> {
        self.transitions.iter().find(|t| &t.key == key)
    }

    /// Finds a transition by `app.name`, name or numeric prefix
    pub fn find(&self, query: &str) -> Result<&Transition> {
        self.transitions
            .iter()
            .find(|t| t.key.matches(query))
            .ok_or_else(|| MigrateError::UnknownTransition(query.to_owned()))
    }

    /// Checks that every dependency is known and that there are no cycles
    pub fn validate(&self) -> Result<()> {
        self.ordered().map(|_| ())
    }

    /// All transitions, each one preceded by its dependencies
    pub fn ordered(&self) -> Result<Vec<&Transition>> {
        let mut marks = BTreeMap::new();
        let mut out = Vec::with_capacity(self.transitions.len());

        for transition in &self.transitions {
            self.visit(&transition.key, &mut marks, &mut out)?;
        }

        Ok(out)
    }

    /// Transitions not yet in `ledger`, in application order
    ///
    /// With a target only the target and its dependencies are considered.
    pub fn plan(
        &self,
        ledger: &Ledger,
        target: Option<&TransitionKey>,
    ) -> Result<Vec<&Transition>> {
        let ordered = match target {
            Some(key) => {
                let mut marks = BTreeMap::new();
                let mut out = Vec::new();
                self.visit(key, &mut marks, &mut out)?;
                out
            }
            None => self.ordered()?,
        };

        Ok(ordered
            .into_iter()
            .filter(|t| !ledger.contains(&t.key))
            .collect())
    }

    fn visit<'a>(
        &'a self,
        key: &TransitionKey,
        marks: &mut BTreeMap<TransitionKey, Mark>,
        out: &mut Vec<&'a Transition>,
    ) -> Result<()> {
        match marks.get(key) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => return Err(MigrateError::Cycle(key.clone())),
            None => {}
        }

        let transition = self
            .get(key)
            .ok_or_else(|| MigrateError::UnknownTransition(key.to_string()))?;

        marks.insert(key.clone(), Mark::Visiting);

        for dependency in &transition.dependencies {
            if self.get(dependency).is_none() {
                return Err(MigrateError::UnknownDependency {
                    transition: key.clone(),
                    dependency: dependency.clone(),
                });
            }

            self.visit(dependency, marks, out)?;
        }

        marks.insert(key.clone(), Mark::Done);
        out.push(transition);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> TransitionGraph {
        TransitionGraph::from_transitions(vec![
            Transition::new("app", "0002_second").depends_on("app", "0001_initial"),
            Transition::new("app", "0001_initial"),
            Transition::new("app", "0003_third").depends_on("app", "0002_second"),
        ])
        .unwrap()
    }

    fn names(transitions: Vec<&Transition>) -> Vec<&str> {
        transitions.into_iter().map(|t| t.key.name.as_str()).collect()
    }

    #[test]
    fn dependencies_come_first() {
        let graph = graph();

        assert_eq!(
            names(graph.ordered().unwrap()),
            vec!["0001_initial", "0002_second", "0003_third"]
        );
    }

    #[test]
    fn plan_skips_applied() {
        let graph = graph();
        let ledger: Ledger = vec![TransitionKey::new("app", "0001_initial")]
            .into_iter()
            .collect();

        assert_eq!(
            names(graph.plan(&ledger, None).unwrap()),
            vec!["0002_second", "0003_third"]
        );

        let target = TransitionKey::new("app", "0002_second");
        assert_eq!(
            names(graph.plan(&ledger, Some(&target)).unwrap()),
            vec!["0002_second"]
        );
    }

    #[test]
    fn unknown_dependency_is_rejected() {
        let err = TransitionGraph::from_transitions(vec![
            Transition::new("app", "0002_second").depends_on("app", "0001_initial")
        ])
        .unwrap_err();

        assert!(matches!(err, MigrateError::UnknownDependency { .. }));
    }

    #[test]
    fn cycles_are_rejected() {
        let err = TransitionGraph::from_transitions(vec![
            Transition::new("app", "a").depends_on("app", "b"),
            Transition::new("app", "b").depends_on("app", "a"),
        ])
        .unwrap_err();

        assert!(matches!(err, MigrateError::Cycle(_)));
    }

    #[test]
    fn duplicates_are_rejected() {
        let err = TransitionGraph::from_transitions(vec![
            Transition::new("app", "a"),
            Transition::new("app", "a"),
        ])
        .unwrap_err();

        assert!(matches!(err, MigrateError::Duplicate(_)));
    }

    #[test]
    fn find_by_number() {
        assert_eq!(graph().find("2").unwrap().key.name, "0002_second");
        assert!(graph().find("9").is_err());
    }
}
