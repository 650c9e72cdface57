//! # Shell Adapter
//!
//! A line-oriented front end. Reads commands from stdin, runs them against
//! `core::App`, and prints the result. This is the only module that talks
//! to the terminal.
//!
//! Every command belongs to a screen. Before running it the shell navigates
//! to that screen, so a command from the wrong flow is refused by the gate
//! rather than by the shell.
//!
//! While the Books screen is open the shell holds a subscription to the book
//! list. Mutations made meanwhile refresh it in the background and the next
//! `books` shows the new list. `refresh` refetches it on demand, which is
//! the way back after a failed load.

pub mod command;
pub mod render;

use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::cache::Subscription;
use crate::core::action::Effect;
use crate::core::config::ResolvedConfig;
use crate::core::navigation::Screen;
use crate::core::state::App;
use command::{Command, parse};

/// Presentation state that is not part of the core app.
#[derive(Default)]
pub struct ShellState {
    book_list: Option<Subscription>,
}

impl ShellState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_watching_books(&self) -> bool {
        self.book_list.is_some()
    }

    /// Lets go of screen-bound subscriptions when their screen is left.
    fn leave_books(&mut self, app: &App) {
        if app.navigator.current() != Screen::Books {
            if let Some(mut subscription) = self.book_list.take() {
                subscription.unsubscribe();
            }
        }
    }
}

pub struct Reply {
    pub output: String,
    pub quit: bool,
}

impl Reply {
    fn text(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            quit: false,
        }
    }
}

pub fn prompt(app: &App) -> String {
    format!("[{}] > ", app.navigator.current())
}

/// Runs one already-parsed command.
pub async fn execute(app: &mut App, shell: &mut ShellState, command: Command) -> Reply {
    debug!("Command: {command:?}");

    if let Some(screen) = command.screen() {
        if let Err(e) = app.navigator.navigate(screen) {
            shell.leave_books(app);
            return Reply::text(e.to_string());
        }
    }

    let reply = match command {
        Command::Quit => Reply {
            output: String::from("Bye."),
            quit: true,
        },
        Command::Help => Reply::text(render::help(app.navigator.flow())),
        Command::Screens => Reply::text(render::screens(&app.navigator)),
        Command::Go(screen) => Reply::text(format!("Now on {screen}.")),

        Command::SignIn(form) => match app.sign_in(&form).await {
            Ok(effect) => Reply::text(describe(app, effect)),
            Err(e) => Reply::text(render::error(&e)),
        },
        Command::SignUp(form) => match app.sign_up(&form).await {
            Ok(effect) => Reply::text(describe(app, effect)),
            Err(e) => Reply::text(render::error(&e)),
        },
        Command::SignOut => {
            shell.book_list = None;
            match app.sign_out().await {
                Ok(effect) => Reply::text(describe(app, effect)),
                Err(e) => Reply::text(format!(
                    "Signed out, but the stored token could not be removed.\n{}",
                    render::error(&e)
                )),
            }
        }

        Command::Books => {
            let subscription = shell.book_list.get_or_insert_with(|| app.books());
            let snapshot = subscription.settled().await;
            Reply::text(render::books(&snapshot))
        }
        Command::Refresh => {
            if let Some(subscription) = &shell.book_list {
                if !subscription.refetch() {
                    debug!("Book list already fetching, waiting for it");
                }
            }
            let subscription = shell.book_list.get_or_insert_with(|| app.books());
            let snapshot = subscription.settled().await;
            Reply::text(render::books(&snapshot))
        }
        Command::Book(id) => {
            let mut subscription = app.book(id);
            let snapshot = subscription.settled().await;
            Reply::text(render::book(&snapshot))
        }
        Command::Add(form) => match app.add_book(&form).await {
            Ok(_) => Reply::text(app.status_message.clone()),
            Err(e) => Reply::text(render::error(&e)),
        },
        Command::Update { id, form } => match app.update_book(id, &form).await {
            Ok(_) => Reply::text(app.status_message.clone()),
            Err(e) => Reply::text(render::error(&e)),
        },
        Command::Delete(id) => match app.delete_book(id).await {
            Ok(()) => Reply::text(app.status_message.clone()),
            Err(e) => Reply::text(render::error(&e)),
        },
    };

    shell.leave_books(app);
    reply
}

fn describe(app: &App, effect: Effect) -> String {
    match effect {
        Effect::Navigate(flow) => format!(
            "{}. Now on {} ({:?} flow).",
            app.status_message,
            app.navigator.current(),
            flow
        ),
        Effect::None => app.status_message.clone(),
    }
}

pub async fn run(config: ResolvedConfig) -> std::io::Result<()> {
    let mut app = App::from_config(&config);
    let mut shell = ShellState::new();

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout
        .write_all(format!("{}\nType 'help' for commands.\n", app.status_message).as_bytes())
        .await?;

    loop {
        stdout.write_all(prompt(&app).as_bytes()).await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            info!("stdin closed, exiting");
            break;
        };

        let command = match parse(&line) {
            Ok(command) => command,
            Err(command::ParseError::Empty) => continue,
            Err(e) => {
                warn!("Rejected input: {e}");
                stdout.write_all(format!("{e}\n").as_bytes()).await?;
                continue;
            }
        };

        let reply = execute(&mut app, &mut shell, command).await;
        stdout
            .write_all(format!("{}\n", reply.output).as_bytes())
            .await?;
        if reply.quit {
            break;
        }
    }

    info!("Bookshelf shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::navigation::Flow;
    use crate::test_support::{ScriptedTransport, status_error, test_app};
    use reqwest::Method;
    use serde_json::json;
    use std::sync::Arc;

    async fn run_line(app: &mut App, shell: &mut ShellState, line: &str) -> String {
        execute(app, shell, parse(line).unwrap()).await.output
    }

    fn signed_in_transport() -> Arc<ScriptedTransport> {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(Method::POST, "dj-rest-auth/login/", Ok(json!({"key": "abc"})));
        transport.respond(Method::POST, "dj-rest-auth/logout/", Ok(json!({})));
        transport
    }

    #[tokio::test]
    async fn test_home_commands_refused_when_signed_out() {
        let transport = Arc::new(ScriptedTransport::new());
        let mut app = test_app(Arc::clone(&transport));
        let mut shell = ShellState::new();

        let out = run_line(&mut app, &mut shell, "books").await;
        assert!(out.contains("not reachable"));
        assert!(transport.requests().is_empty());
        assert_eq!(prompt(&app), "[Welcome] > ");
    }

    #[tokio::test]
    async fn test_sign_in_then_list_books() {
        let transport = signed_in_transport();
        transport.respond(
            Method::GET,
            "books/",
            Ok(json!([{"id": 1, "title": "X", "author": 1}])),
        );
        let mut app = test_app(Arc::clone(&transport));
        let mut shell = ShellState::new();

        let out = run_line(&mut app, &mut shell, "signin Pierre pierre@email.com password").await;
        assert!(out.contains("Home"));
        assert_eq!(app.navigator.flow(), Flow::Home);

        let out = run_line(&mut app, &mut shell, "books").await;
        assert!(out.contains("#1"));
        assert!(shell.is_watching_books());
        assert_eq!(prompt(&app), "[Books] > ");

        // Welcome screens are now out of reach
        let out = run_line(&mut app, &mut shell, "go sign-in").await;
        assert!(out.contains("not reachable"));
    }

    #[tokio::test]
    async fn test_add_refreshes_watched_list() {
        let transport = signed_in_transport();
        transport.respond(
            Method::GET,
            "books/",
            Ok(json!([{"id": 1, "title": "X", "author": 1}])),
        );
        transport.respond(
            Method::GET,
            "books/",
            Ok(json!([
                {"id": 1, "title": "X", "author": 1},
                {"id": 2, "title": "Yes", "author": 2}
            ])),
        );
        transport.respond(
            Method::POST,
            "books/",
            Ok(json!({"id": 2, "title": "Yes", "author": 2})),
        );
        let mut app = test_app(Arc::clone(&transport));
        let mut shell = ShellState::new();

        run_line(&mut app, &mut shell, "signin Pierre pierre@email.com password").await;
        run_line(&mut app, &mut shell, "books").await;
        let out = run_line(&mut app, &mut shell, "add 2 Yes").await;
        assert!(out.contains("Added"));

        let out = run_line(&mut app, &mut shell, "books").await;
        assert!(out.contains("Yes"));
        assert_eq!(transport.count(&Method::GET, "books/"), 2);
    }

    #[tokio::test]
    async fn test_failed_listing_renders_message() {
        let transport = signed_in_transport();
        transport.respond(Method::GET, "books/", Err(status_error(500)));
        let mut app = test_app(Arc::clone(&transport));
        let mut shell = ShellState::new();

        run_line(&mut app, &mut shell, "signin Pierre pierre@email.com password").await;
        let out = run_line(&mut app, &mut shell, "books").await;
        assert_eq!(out, render::QUERY_FAILED);
    }

    #[tokio::test]
    async fn test_refresh_recovers_from_failed_listing() {
        let transport = signed_in_transport();
        transport.respond(Method::GET, "books/", Err(status_error(500)));
        transport.respond(
            Method::GET,
            "books/",
            Ok(json!([{"id": 1, "title": "X", "author": 1}])),
        );
        let mut app = test_app(Arc::clone(&transport));
        let mut shell = ShellState::new();

        run_line(&mut app, &mut shell, "signin Pierre pierre@email.com password").await;
        let out = run_line(&mut app, &mut shell, "books").await;
        assert_eq!(out, render::QUERY_FAILED);

        // books alone reuses the failed entry
        let out = run_line(&mut app, &mut shell, "books").await;
        assert_eq!(out, render::QUERY_FAILED);
        assert_eq!(transport.count(&Method::GET, "books/"), 1);

        let out = run_line(&mut app, &mut shell, "refresh").await;
        assert!(out.contains("#1"));
        assert_eq!(transport.count(&Method::GET, "books/"), 2);
    }

    #[tokio::test]
    async fn test_refresh_without_listing_subscribes() {
        let transport = signed_in_transport();
        transport.respond(Method::GET, "books/", Ok(json!([])));
        let mut app = test_app(Arc::clone(&transport));
        let mut shell = ShellState::new();

        run_line(&mut app, &mut shell, "signin Pierre pierre@email.com password").await;
        let out = run_line(&mut app, &mut shell, "refresh").await;
        assert_eq!(out, "No books yet.");
        assert!(shell.is_watching_books());
        assert_eq!(transport.count(&Method::GET, "books/"), 1);
    }

    #[tokio::test]
    async fn test_leaving_books_drops_subscription() {
        let transport = signed_in_transport();
        transport.respond(Method::GET, "books/", Ok(json!([])));
        let mut app = test_app(Arc::clone(&transport));
        let mut shell = ShellState::new();

        run_line(&mut app, &mut shell, "signin Pierre pierre@email.com password").await;
        run_line(&mut app, &mut shell, "books").await;
        assert!(shell.is_watching_books());

        run_line(&mut app, &mut shell, "go home").await;
        assert!(!shell.is_watching_books());

        let out = run_line(&mut app, &mut shell, "signout").await;
        assert!(out.contains("Welcome"));
        assert!(!app.is_signed_in());
    }

    #[tokio::test]
    async fn test_validation_error_is_shown() {
        let transport = Arc::new(ScriptedTransport::new());
        let mut app = test_app(Arc::clone(&transport));
        let mut shell = ShellState::new();

        let out = run_line(&mut app, &mut shell, "signin Pi pierre@email.com password").await;
        assert!(out.starts_with("Invalid username"));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_quit() {
        let mut app = test_app(Arc::new(ScriptedTransport::new()));
        let mut shell = ShellState::new();
        assert!(execute(&mut app, &mut shell, Command::Quit).await.quit);
    }
}
