//! Text rendering for the shell. Pure functions from state to strings.

use log::warn;
use serde_json::Value;

use crate::api::client::HttpError;
use crate::api::error::ClientError;
use crate::api::types::Book;
use crate::cache::{QuerySnapshot, QueryStatus};
use crate::core::navigation::{Flow, Navigator};

pub const QUERY_FAILED: &str = "Query doesn't work!";

pub fn book_line(book: &Book) -> String {
    format!("#{:<4} {}  (author {})", book.id, book.title, book.author)
}

fn book_list(data: Vec<Book>) -> String {
    if data.is_empty() {
        return String::from("No books yet.");
    }
    data.iter().map(book_line).collect::<Vec<_>>().join("\n")
}

/// A failed refetch keeps the last list on screen, with the failure below it.
pub fn books(snapshot: &QuerySnapshot) -> String {
    match snapshot.status {
        QueryStatus::Loading => String::from("Loading..."),
        QueryStatus::Error => match snapshot.decode::<Vec<Book>>() {
            Some(Ok(list)) => format!("{}\n{QUERY_FAILED}", book_list(list)),
            _ => QUERY_FAILED.to_string(),
        },
        QueryStatus::Success => match snapshot.decode::<Vec<Book>>() {
            Some(Ok(list)) => book_list(list),
            Some(Err(e)) => {
                warn!("Book list did not decode: {e}");
                QUERY_FAILED.to_string()
            }
            None => QUERY_FAILED.to_string(),
        },
    }
}

pub fn book(snapshot: &QuerySnapshot) -> String {
    match snapshot.status {
        QueryStatus::Loading => String::from("Loading..."),
        QueryStatus::Error => match &snapshot.error {
            Some(HttpError::Status { status: 404, .. }) => String::from("No such book."),
            _ => QUERY_FAILED.to_string(),
        },
        QueryStatus::Success => match snapshot.decode::<Book>() {
            Some(Ok(book)) => book_line(&book),
            _ => QUERY_FAILED.to_string(),
        },
    }
}

/// Server-side field errors come back as `{"field": ["message", ...]}`.
fn field_errors(data: &Value) -> Option<String> {
    let fields = data.as_object()?;
    let lines: Vec<String> = fields
        .iter()
        .map(|(field, messages)| {
            let text = match messages {
                Value::Array(items) => items
                    .iter()
                    .map(|m| m.as_str().map_or_else(|| m.to_string(), str::to_string))
                    .collect::<Vec<_>>()
                    .join(" "),
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("  {field}: {text}")
        })
        .collect();
    (!lines.is_empty()).then(|| lines.join("\n"))
}

pub fn error(err: &ClientError) -> String {
    match err {
        ClientError::Http(HttpError::Status { status, data, message }) => {
            match field_errors(data) {
                Some(details) => format!("Error {status} {message}\n{details}"),
                None => format!("Error {status} {message}"),
            }
        }
        ClientError::Http(HttpError::Network { message }) => {
            format!("Could not reach the server: {message}")
        }
        ClientError::Validation(e) => format!("Invalid {}: {}", e.field, e.message),
        other => format!("Error: {other}"),
    }
}

pub fn screens(navigator: &Navigator) -> String {
    navigator
        .flow()
        .screens()
        .iter()
        .map(|screen| {
            let marker = if *screen == navigator.current() { "*" } else { " " };
            format!("{marker} {screen}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn help(flow: Flow) -> String {
    let commands: &[&str] = match flow {
        Flow::Welcome => &[
            "signin <user> <email> <password>",
            "signup <user> <email> <password> <confirm>",
            "go <screen>",
        ],
        Flow::Home => &[
            "books",
            "refresh",
            "book <id>",
            "add <author> <title…>",
            "update <id> <author> <title…>",
            "delete <id>",
            "signout",
            "go <screen>",
        ],
    };
    commands
        .iter()
        .chain(["screens", "help", "quit"].iter())
        .map(|c| format!("  {c}"))
        .collect::<Vec<_>>()
        .join("\n")
}
