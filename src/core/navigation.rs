//! # Navigation Gate
//!
//! Which screens can be reached is a pure function of the session flag:
//!
//! ```text
//! signed out ──► Welcome flow: Welcome, SignIn, SignUp
//! signed in  ──► Home flow:    Home, Books
//! ```
//!
//! `Navigator` tracks the current screen on top of that. It watches the
//! session channel and snaps back to a flow's first screen whenever the flow
//! changes underneath it.

use std::fmt;
use std::str::FromStr;

use log::debug;
use tokio::sync::watch;

use crate::core::session::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    Welcome,
    SignIn,
    SignUp,
    Home,
    Books,
}

impl Screen {
    pub fn title(self) -> &'static str {
        match self {
            Screen::Welcome => "Welcome",
            Screen::SignIn => "Sign In",
            Screen::SignUp => "Sign Up",
            Screen::Home => "Home",
            Screen::Books => "Books",
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

impl FromStr for Screen {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', ' ', '_'], "").as_str() {
            "welcome" => Ok(Screen::Welcome),
            "signin" => Ok(Screen::SignIn),
            "signup" => Ok(Screen::SignUp),
            "home" => Ok(Screen::Home),
            "books" => Ok(Screen::Books),
            _ => Err(format!("unknown screen '{s}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Welcome,
    Home,
}

impl Flow {
    pub fn screens(self) -> &'static [Screen] {
        match self {
            Flow::Welcome => &[Screen::Welcome, Screen::SignIn, Screen::SignUp],
            Flow::Home => &[Screen::Home, Screen::Books],
        }
    }

    pub fn initial_screen(self) -> Screen {
        self.screens()[0]
    }

    pub fn contains(self, screen: Screen) -> bool {
        self.screens().contains(&screen)
    }

    pub fn for_session(signed_in: bool) -> Self {
        if signed_in { Flow::Home } else { Flow::Welcome }
    }
}

/// The gate itself.
pub fn reachable_flow(session: &SessionState) -> Flow {
    Flow::for_session(session.get())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    Unreachable { screen: Screen, flow: Flow },
}

impl fmt::Display for NavigationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavigationError::Unreachable { screen, flow } => {
                write!(f, "{screen} is not reachable from the {flow:?} flow")
            }
        }
    }
}

impl std::error::Error for NavigationError {}

/// Follows the session through its watch channel.
pub struct Navigator {
    signed_in: watch::Receiver<bool>,
    flow: Flow,
    current: Screen,
}

impl Navigator {
    pub fn new(session: &SessionState) -> Self {
        let mut signed_in = session.subscribe();
        let flow = Flow::for_session(*signed_in.borrow_and_update());
        Self {
            signed_in,
            flow,
            current: flow.initial_screen(),
        }
    }

    pub fn flow(&self) -> Flow {
        self.flow
    }

    pub fn current(&self) -> Screen {
        self.current
    }

    /// Applies any session change published since the last sync. Returns
    /// true if the flow changed.
    pub fn sync(&mut self) -> bool {
        if !self.signed_in.has_changed().unwrap_or(false) {
            return false;
        }
        let flow = Flow::for_session(*self.signed_in.borrow_and_update());
        if flow == self.flow {
            return false;
        }
        debug!("Flow {:?} -> {:?}", self.flow, flow);
        self.flow = flow;
        self.current = flow.initial_screen();
        true
    }

    pub fn navigate(&mut self, screen: Screen) -> Result<(), NavigationError> {
        self.sync();
        if !self.flow.contains(screen) {
            return Err(NavigationError::Unreachable {
                screen,
                flow: self.flow,
            });
        }
        self.current = screen;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_follows_session() {
        let session = SessionState::new();
        assert_eq!(reachable_flow(&session), Flow::Welcome);
        session.set(true);
        assert_eq!(reachable_flow(&session), Flow::Home);
    }

    #[test]
    fn test_flow_screens() {
        assert_eq!(
            Flow::Welcome.screens(),
            &[Screen::Welcome, Screen::SignIn, Screen::SignUp]
        );
        assert_eq!(Flow::Home.screens(), &[Screen::Home, Screen::Books]);
        assert!(!Flow::Welcome.contains(Screen::Books));
    }

    #[test]
    fn test_navigator_blocks_unreachable_screens() {
        let session = SessionState::new();
        let mut nav = Navigator::new(&session);
        assert_eq!(nav.current(), Screen::Welcome);

        nav.navigate(Screen::SignUp).unwrap();
        assert_eq!(nav.current(), Screen::SignUp);

        let err = nav.navigate(Screen::Books).unwrap_err();
        assert_eq!(
            err,
            NavigationError::Unreachable {
                screen: Screen::Books,
                flow: Flow::Welcome
            }
        );
        assert_eq!(nav.current(), Screen::SignUp);
    }

    #[test]
    fn test_navigator_resets_on_flow_change() {
        let session = SessionState::new();
        let mut nav = Navigator::new(&session);
        nav.navigate(Screen::SignIn).unwrap();

        session.set(true);
        assert_eq!(nav.flow(), Flow::Welcome, "nothing moves until sync");
        assert!(nav.sync());
        assert_eq!(nav.flow(), Flow::Home);
        assert_eq!(nav.current(), Screen::Home);
        assert!(!nav.sync());

        nav.navigate(Screen::Books).unwrap();
        session.set(false);
        assert!(nav.navigate(Screen::Books).is_err());
        assert_eq!(nav.current(), Screen::Welcome);
    }

    #[test]
    fn test_navigator_ignores_round_trip_between_syncs() {
        let session = SessionState::new();
        let mut nav = Navigator::new(&session);
        nav.navigate(Screen::SignUp).unwrap();

        session.set(true);
        session.set(false);
        assert!(!nav.sync());
        assert_eq!(nav.current(), Screen::SignUp);
    }

    #[test]
    fn test_navigator_starts_in_home_flow_when_signed_in() {
        let session = SessionState::new();
        session.set(true);
        let nav = Navigator::new(&session);
        assert_eq!(nav.flow(), Flow::Home);
        assert_eq!(nav.current(), Screen::Home);
    }

    #[test]
    fn test_screen_parsing() {
        assert_eq!("sign-in".parse::<Screen>().unwrap(), Screen::SignIn);
        assert_eq!("SignUp".parse::<Screen>().unwrap(), Screen::SignUp);
        assert_eq!("books".parse::<Screen>().unwrap(), Screen::Books);
        assert!("settings".parse::<Screen>().is_err());
    }
}
