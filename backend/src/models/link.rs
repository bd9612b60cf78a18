//! Explicit state machine for the external device-link flow.
//!
//! The authorization hop leaves the application's origin and comes back via
//! the provider's redirect, so the flow is modeled as explicit states with a
//! transition table instead of ad hoc control flow spread across handlers.
//! Only the session bridge drives `AwaitingExternalRedirect` through to
//! `Linked`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    Idle,
    AwaitingExternalRedirect,
    AwaitingCallback,
    Linked,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// A redirect-based authorization was initiated and state was stashed.
    AuthorizationStarted,
    /// The provider redirected the browser back to the callback endpoint.
    CallbackReceived,
    /// The stashed session was consumed and adopted by the caller.
    SessionRestored,
    /// Code exchange or state consumption failed.
    LinkFailed,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("no transition from {state:?} on {event:?}")]
pub struct InvalidTransition {
    pub state: LinkState,
    pub event: LinkEvent,
}

/// Transition table keyed by (current state, event).
pub fn transition(state: LinkState, event: LinkEvent) -> Result<LinkState, InvalidTransition> {
    use LinkEvent::*;
    use LinkState::*;

    match (state, event) {
        (Idle, AuthorizationStarted) => Ok(AwaitingExternalRedirect),
        (AwaitingExternalRedirect, CallbackReceived) => Ok(AwaitingCallback),
        (AwaitingCallback, SessionRestored) => Ok(Linked),
        (AwaitingExternalRedirect, LinkFailed)
        | (AwaitingCallback, LinkFailed)
        | (Idle, LinkFailed) => Ok(Failed),
        _ => Err(InvalidTransition { state, event }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_reaches_linked() {
        let s = transition(LinkState::Idle, LinkEvent::AuthorizationStarted).unwrap();
        let s = transition(s, LinkEvent::CallbackReceived).unwrap();
        let s = transition(s, LinkEvent::SessionRestored).unwrap();
        assert_eq!(s, LinkState::Linked);
    }

    #[test]
    fn failure_is_reachable_from_pending_states() {
        assert_eq!(
            transition(LinkState::AwaitingExternalRedirect, LinkEvent::LinkFailed).unwrap(),
            LinkState::Failed
        );
        assert_eq!(
            transition(LinkState::AwaitingCallback, LinkEvent::LinkFailed).unwrap(),
            LinkState::Failed
        );
    }

    #[test]
    fn transitions_outside_the_table_are_rejected() {
        // A consumed (Linked) flow cannot be restored again; replay is not a
        // valid transition.
        assert!(transition(LinkState::Linked, LinkEvent::SessionRestored).is_err());
        assert!(transition(LinkState::Idle, LinkEvent::SessionRestored).is_err());
        assert!(transition(LinkState::Failed, LinkEvent::CallbackReceived).is_err());
        assert!(transition(
            LinkState::AwaitingExternalRedirect,
            LinkEvent::AuthorizationStarted
        )
        .is_err());
    }
}
