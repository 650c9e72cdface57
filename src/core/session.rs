//! # Session State
//!
//! The "is signed in" flag. One `SessionState` is created per app and
//! handed to whoever needs it; there is no global. Changes are published on
//! a watch channel so the navigation layer can follow them.

use log::info;
use tokio::sync::watch;

pub struct SessionState {
    signed_in: watch::Sender<bool>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    /// Starts signed out.
    pub fn new() -> Self {
        let (signed_in, _) = watch::channel(false);
        Self { signed_in }
    }

    pub fn get(&self) -> bool {
        *self.signed_in.borrow()
    }

    pub fn set(&self, value: bool) {
        let previous = self.signed_in.send_replace(value);
        if previous != value {
            info!("Session flag changed: signed_in={value}");
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.signed_in.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_signed_out() {
        assert!(!SessionState::new().get());
    }

    #[test]
    fn test_set_and_get() {
        let session = SessionState::new();
        session.set(true);
        assert!(session.get());
        session.set(false);
        assert!(!session.get());
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let session = SessionState::new();
        let mut rx = session.subscribe();
        session.set(true);
        rx.changed().await.unwrap();
        assert!(*rx.borrow());
    }
}
