//! Parses one shell line into a `Command`.

use std::fmt;

use crate::core::navigation::Screen;
use crate::core::validation::{BookForm, SignInForm, SignUpForm};

#[derive(Debug, Clone)]
pub enum Command {
    SignIn(SignInForm),
    SignUp(SignUpForm),
    Go(Screen),
    Books,
    Refresh,
    Book(u64),
    Add(BookForm),
    Update { id: u64, form: BookForm },
    Delete(u64),
    SignOut,
    Screens,
    Help,
    Quit,
}

impl Command {
    /// The screen a command runs on. The shell navigates there first, so the
    /// gate decides whether the command is allowed at all.
    pub fn screen(&self) -> Option<Screen> {
        match self {
            Command::SignIn(_) => Some(Screen::SignIn),
            Command::SignUp(_) => Some(Screen::SignUp),
            Command::Go(screen) => Some(*screen),
            Command::Books
            | Command::Refresh
            | Command::Book(_)
            | Command::Add(_)
            | Command::Update { .. }
            | Command::Delete(_) => Some(Screen::Books),
            Command::SignOut => Some(Screen::Home),
            Command::Screens | Command::Help | Command::Quit => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Empty,
    Unknown(String),
    Usage(&'static str),
    NotANumber(String),
    BadScreen(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Empty => write!(f, "empty command"),
            ParseError::Unknown(name) => write!(f, "unknown command '{name}', try 'help'"),
            ParseError::Usage(usage) => write!(f, "usage: {usage}"),
            ParseError::NotANumber(s) => write!(f, "'{s}' is not a number"),
            ParseError::BadScreen(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ParseError {}

pub const SIGNIN_USAGE: &str = "signin <user> <email> <password>";
pub const SIGNUP_USAGE: &str = "signup <user> <email> <password> <confirm>";
pub const GO_USAGE: &str = "go <screen>";
pub const BOOK_USAGE: &str = "book <id>";
pub const ADD_USAGE: &str = "add <author> <title…>";
pub const UPDATE_USAGE: &str = "update <id> <author> <title…>";
pub const DELETE_USAGE: &str = "delete <id>";

fn number(s: &str) -> Result<u64, ParseError> {
    s.parse().map_err(|_| ParseError::NotANumber(s.to_string()))
}

pub fn parse(line: &str) -> Result<Command, ParseError> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&name, args)) = words.split_first() else {
        return Err(ParseError::Empty);
    };

    match (name.to_ascii_lowercase().as_str(), args) {
        ("signin", [username, email, password]) => Ok(Command::SignIn(SignInForm {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        })),
        ("signin", _) => Err(ParseError::Usage(SIGNIN_USAGE)),

        ("signup", [username, email, password, confirm]) => Ok(Command::SignUp(SignUpForm {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            confirm: confirm.to_string(),
        })),
        ("signup", _) => Err(ParseError::Usage(SIGNUP_USAGE)),

        ("go", [_, ..]) => args
            .join(" ")
            .parse()
            .map(Command::Go)
            .map_err(ParseError::BadScreen),
        ("go", []) => Err(ParseError::Usage(GO_USAGE)),

        ("books", []) => Ok(Command::Books),
        ("refresh", []) => Ok(Command::Refresh),
        ("book", [id]) => Ok(Command::Book(number(id)?)),
        ("book", _) => Err(ParseError::Usage(BOOK_USAGE)),

        ("add", [author, title @ ..]) if !title.is_empty() => Ok(Command::Add(BookForm {
            title: title.join(" "),
            author: number(author)?,
        })),
        ("add", _) => Err(ParseError::Usage(ADD_USAGE)),

        ("update", [id, author, title @ ..]) if !title.is_empty() => Ok(Command::Update {
            id: number(id)?,
            form: BookForm {
                title: title.join(" "),
                author: number(author)?,
            },
        }),
        ("update", _) => Err(ParseError::Usage(UPDATE_USAGE)),

        ("delete", [id]) => Ok(Command::Delete(number(id)?)),
        ("delete", _) => Err(ParseError::Usage(DELETE_USAGE)),

        ("signout", []) => Ok(Command::SignOut),
        ("screens", []) => Ok(Command::Screens),
        ("help", _) => Ok(Command::Help),
        ("quit" | "exit", []) => Ok(Command::Quit),
        _ => Err(ParseError::Unknown(name.to_string())),
    }
}
