//! Schema history of the `adminapi` app
//!
//! Every transition lives in its own module, named after the transition. New transitions have to
//! be added to [`transitions`].
use crate::migrate::{MigrateError, TransitionGraph};
use crate::schema::Transition;

mod m0001_initial;
mod m0002_userroombooking_user_role;
mod m0003_resourcesdetails_remove_hardware_resource_and_more;

pub const APP_LABEL: &str = "adminapi";

/// All transitions of the app in declaration order
pub fn transitions() -> Vec<Transition> {
    vec![
        m0001_initial::transition(),
        m0002_userroombooking_user_role::transition(),
        m0003_resourcesdetails_remove_hardware_resource_and_more::transition(),
    ]
}

pub fn graph() -> Result<TransitionGraph, MigrateError> {
    TransitionGraph::from_transitions(transitions())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_is_a_chain() {
        let transitions = transitions();

        assert!(transitions[0].dependencies.is_empty());
        for pair in transitions.windows(2) {
            assert_eq!(pair[1].dependencies, vec![pair[0].key.clone()]);
        }

        assert!(graph().is_ok());
    }

    #[test]
    fn names_carry_their_number() {
        for (i, transition) in transitions().iter().enumerate() {
            assert_eq!(transition.key.app, APP_LABEL);
            assert_eq!(transition.key.number(), Some(i as u32 + 1));
        }
    }
}
