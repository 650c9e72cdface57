//! # Endpoint Catalogue
//!
//! The book API as the resource cache sees it, plus `BookApi`, the typed
//! front door the rest of the crate uses.
//!
//! | endpoint       | request                         | tags                      |
//! |----------------|---------------------------------|---------------------------|
//! | getListOfBooks | GET books/                      | provides Book, Book:<id>… |
//! | getBook        | GET books/{id}/                 | provides Book:<id>        |
//! | addNewBook     | POST books/                     | invalidates Book          |
//! | updateBook     | PUT books/{id}/                 | invalidates Book:<id>     |
//! | deleteBook     | DELETE books/{id}/              | invalidates Book          |
//! | logIn          | POST dj-rest-auth/login/        | stores the token          |
//! | registration   | POST dj-rest-auth/registration/ | stores the token          |
//! | logOut         | POST dj-rest-auth/logout/       | none                      |

use std::sync::Arc;

use log::info;
use serde_json::{Value, json};

use crate::api::client::ApiRequest;
use crate::api::error::ClientError;
use crate::api::types::{Book, Credentials, NewBook, Registration, TokenResponse};
use crate::cache::endpoint::no_tags;
use crate::cache::{MutationEndpoint, QueryEndpoint, ResourceCache, Subscription, Tag};
use crate::core::token_store::TokenStore;

pub const BOOK_TAG: &str = "Book";

pub static GET_LIST_OF_BOOKS: QueryEndpoint = QueryEndpoint {
    name: "getListOfBooks",
    request: |_| ApiRequest::get("books/"),
    provides: provides_book_list,
};

pub static GET_BOOK: QueryEndpoint = QueryEndpoint {
    name: "getBook",
    request: |args| ApiRequest::get(format!("books/{}/", id_of(args))),
    provides: |args, _| vec![Tag::id(BOOK_TAG, id_of(args))],
};

pub static ADD_NEW_BOOK: MutationEndpoint = MutationEndpoint {
    name: "addNewBook",
    request: |args| ApiRequest::post("books/", args.clone()),
    invalidates: |_, _| vec![Tag::kind(BOOK_TAG)],
};

pub static UPDATE_BOOK: MutationEndpoint = MutationEndpoint {
    name: "updateBook",
    request: |args| ApiRequest::put(format!("books/{}/", id_of(args)), args.clone()),
    invalidates: |args, _| vec![Tag::id(BOOK_TAG, id_of(args))],
};

pub static DELETE_BOOK: MutationEndpoint = MutationEndpoint {
    name: "deleteBook",
    request: |args| ApiRequest::delete(format!("books/{}/", id_of(args))),
    invalidates: |_, _| vec![Tag::kind(BOOK_TAG)],
};

pub static LOG_IN: MutationEndpoint = MutationEndpoint {
    name: "logIn",
    request: |args| ApiRequest::post("dj-rest-auth/login/", args.clone()),
    invalidates: no_tags,
};

pub static REGISTRATION: MutationEndpoint = MutationEndpoint {
    name: "registration",
    request: |args| ApiRequest::post("dj-rest-auth/registration/", args.clone()),
    invalidates: no_tags,
};

pub static LOG_OUT: MutationEndpoint = MutationEndpoint {
    name: "logOut",
    request: |_| ApiRequest::post("dj-rest-auth/logout/", json!({})),
    invalidates: no_tags,
};

/// Accepts either a bare id or an object with an `id` field.
fn id_of(args: &Value) -> String {
    id_label(args.get("id").unwrap_or(args))
}

fn id_label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn provides_book_list(_args: &Value, result: &Value) -> Vec<Tag> {
    let mut tags = vec![Tag::kind(BOOK_TAG)];
    if let Some(rows) = result.as_array() {
        tags.extend(
            rows.iter()
                .filter_map(|row| row.get("id"))
                .map(|id| Tag::id(BOOK_TAG, id_label(id))),
        );
    }
    tags
}

/// Typed operations over the cache. Sign-in and sign-up persist the
/// returned token before resolving; nothing here touches the session flag.
#[derive(Clone)]
pub struct BookApi {
    cache: ResourceCache,
    tokens: Arc<dyn TokenStore>,
}

impl BookApi {
    pub fn new(cache: ResourceCache, tokens: Arc<dyn TokenStore>) -> Self {
        Self { cache, tokens }
    }

    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    pub fn books(&self) -> Subscription {
        self.cache.query(&GET_LIST_OF_BOOKS, Value::Null)
    }

    pub fn book(&self, id: u64) -> Subscription {
        self.cache.query(&GET_BOOK, json!({ "id": id }))
    }

    pub async fn add_new_book(&self, book: &NewBook) -> Result<Book, ClientError> {
        let data = self
            .cache
            .mutate(&ADD_NEW_BOOK, &serde_json::to_value(book)?)
            .await?;
        Ok(serde_json::from_value(data)?)
    }

    pub async fn update_book(&self, book: &Book) -> Result<Book, ClientError> {
        let data = self
            .cache
            .mutate(&UPDATE_BOOK, &serde_json::to_value(book)?)
            .await?;
        Ok(serde_json::from_value(data)?)
    }

    pub async fn delete_book(&self, id: u64) -> Result<(), ClientError> {
        self.cache.mutate(&DELETE_BOOK, &json!({ "id": id })).await?;
        Ok(())
    }

    pub async fn log_in(&self, credentials: &Credentials) -> Result<String, ClientError> {
        self.authenticate(&LOG_IN, serde_json::to_value(credentials)?)
            .await
    }

    pub async fn registration(&self, registration: &Registration) -> Result<String, ClientError> {
        self.authenticate(&REGISTRATION, serde_json::to_value(registration)?)
            .await
    }

    /// Tells the server to drop the token. The stored token is left alone;
    /// clearing it is the caller's decision.
    pub async fn log_out(&self) -> Result<(), ClientError> {
        self.cache.mutate(&LOG_OUT, &Value::Null).await?;
        Ok(())
    }

    async fn authenticate(
        &self,
        endpoint: &MutationEndpoint,
        args: Value,
    ) -> Result<String, ClientError> {
        let data = self.cache.mutate(endpoint, &args).await?;
        let TokenResponse { key } = serde_json::from_value(data)?;
        self.tokens.set(&key)?;
        info!("{} succeeded, token stored", endpoint.name);
        Ok(key)
    }
}
