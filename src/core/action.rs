//! # Actions
//!
//! The only two things that may move the session flag: a completed sign-in
//! (or sign-up) and an explicit sign-out. Both go through `update()`, which
//! flips the flag and reports where navigation should go next.
//!
//! ```text
//! SessionState + Action  →  update()  →  Effect
//! ```

use log::debug;

use crate::core::navigation::Flow;
use crate::core::session::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// A sign-in or sign-up round trip finished and the token is stored.
    SignedIn,
    /// The user asked to sign out.
    SignedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    Navigate(Flow),
}

pub fn update(session: &SessionState, action: Action) -> Effect {
    debug!("Action: {action:?}");
    let (target, flow) = match action {
        Action::SignedIn => (true, Flow::Home),
        Action::SignedOut => (false, Flow::Welcome),
    };
    if session.get() == target {
        return Effect::None;
    }
    session.set(target);
    Effect::Navigate(flow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_in_then_out() {
        let session = SessionState::new();
        assert_eq!(
            update(&session, Action::SignedIn),
            Effect::Navigate(Flow::Home)
        );
        assert!(session.get());
        assert_eq!(
            update(&session, Action::SignedOut),
            Effect::Navigate(Flow::Welcome)
        );
        assert!(!session.get());
    }

    #[test]
    fn test_repeated_action_is_noop() {
        let session = SessionState::new();
        assert_eq!(update(&session, Action::SignedOut), Effect::None);
        update(&session, Action::SignedIn);
        assert_eq!(update(&session, Action::SignedIn), Effect::None);
    }
}
