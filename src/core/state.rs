//! # Application State
//!
//! Core business state for Bookshelf. This module contains domain logic
//! only; presentation lives in the `shell` module.
//!
//! ```text
//! App
//! ├── api: BookApi                  // cache + token store
//! ├── session: Arc<SessionState>    // the signed-in flag
//! ├── navigator: Navigator          // current screen, gated by session
//! └── status_message: String        // last thing worth telling the user
//! ```
//!
//! The session flag only moves through `update(state, action)` in action.rs,
//! and only once the round trip that justifies it has finished.

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};

use crate::api::client::{HttpClient, Transport};
use crate::api::endpoints::BookApi;
use crate::api::error::ClientError;
use crate::api::types::Book;
use crate::cache::{ResourceCache, Subscription};
use crate::core::action::{Action, Effect, update};
use crate::core::config::ResolvedConfig;
use crate::core::navigation::Navigator;
use crate::core::session::SessionState;
use crate::core::token_store::{FileTokenStore, MemoryTokenStore, TokenStore};
use crate::core::validation::{BookForm, SignInForm, SignUpForm};

pub struct App {
    pub api: BookApi,
    pub session: Arc<SessionState>,
    pub navigator: Navigator,
    pub status_message: String,
}

impl App {
    pub fn new(
        transport: Arc<dyn Transport>,
        tokens: Arc<dyn TokenStore>,
        keep_unused_for: Duration,
    ) -> Self {
        let cache = ResourceCache::with_keep_unused_for(transport, keep_unused_for);
        let session = Arc::new(SessionState::new());
        Self {
            api: BookApi::new(cache, tokens),
            navigator: Navigator::new(&session),
            session,
            status_message: String::from("Welcome to Bookshelf!"),
        }
    }

    /// Wires the real HTTP client and file token store from resolved config.
    pub fn from_config(config: &ResolvedConfig) -> Self {
        let tokens: Arc<dyn TokenStore> = match &config.token_path {
            Some(path) => Arc::new(FileTokenStore::new(path.clone())),
            None => {
                warn!("No token path available, keeping the token in memory only");
                Arc::new(MemoryTokenStore::new())
            }
        };
        let client = HttpClient::with_timeout(
            config.base_url.clone(),
            Arc::clone(&tokens),
            config.timeout,
        );
        info!("API base URL: {}", client.base_url());
        Self::new(Arc::new(client), tokens, config.keep_unused_for)
    }

    pub fn is_signed_in(&self) -> bool {
        self.session.get()
    }

    /// Validates, logs in, and flips the session once the token is stored.
    pub async fn sign_in(&mut self, form: &SignInForm) -> Result<Effect, ClientError> {
        let credentials = form.validate()?;
        self.api.log_in(&credentials).await?;
        Ok(self.apply(Action::SignedIn, format!("Signed in as {}", credentials.username)))
    }

    pub async fn sign_up(&mut self, form: &SignUpForm) -> Result<Effect, ClientError> {
        let registration = form.validate()?;
        self.api.registration(&registration).await?;
        Ok(self.apply(
            Action::SignedIn,
            format!("Registered as {}", registration.username),
        ))
    }

    /// Logs out on the server, then forgets everything local.
    ///
    /// A failed logout call does not keep the user signed in. The session
    /// flips back even when the token cannot be removed; that failure is
    /// still returned so it can be shown.
    pub async fn sign_out(&mut self) -> Result<Effect, ClientError> {
        if let Err(e) = self.api.log_out().await {
            warn!("Server logout failed ({e}), signing out locally anyway");
        }
        self.api.cache().reset();
        let cleared = self.api.tokens().clear();
        let effect = self.apply(Action::SignedOut, String::from("Signed out"));
        cleared?;
        Ok(effect)
    }

    pub fn books(&self) -> Subscription {
        self.api.books()
    }

    pub fn book(&self, id: u64) -> Subscription {
        self.api.book(id)
    }

    pub async fn add_book(&mut self, form: &BookForm) -> Result<Book, ClientError> {
        let book = self.api.add_new_book(&form.validate()?).await?;
        self.status_message = format!("Added \"{}\" (#{})", book.title, book.id);
        Ok(book)
    }

    pub async fn update_book(&mut self, id: u64, form: &BookForm) -> Result<Book, ClientError> {
        let book = self.api.update_book(&form.validate_update(id)?).await?;
        self.status_message = format!("Updated #{}", book.id);
        Ok(book)
    }

    pub async fn delete_book(&mut self, id: u64) -> Result<(), ClientError> {
        self.api.delete_book(id).await?;
        self.status_message = format!("Deleted #{id}");
        Ok(())
    }

    fn apply(&mut self, action: Action, message: String) -> Effect {
        let effect = update(&self.session, action);
        self.navigator.sync();
        self.status_message = message;
        effect
    }
}
