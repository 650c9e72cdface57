//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::api::client::{ApiRequest, HttpError, Transport};
use crate::core::state::App;
use crate::core::token_store::{MemoryTokenStore, StorageError, TokenStore};

type Route = (Method, String);

/// In-process transport with canned responses per route.
///
/// Responses queue up per route; the last one repeats. Unknown routes answer
/// 404. A route can be held so its requests wait for semaphore permits.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<Route, VecDeque<Result<Value, HttpError>>>>,
    gates: Mutex<HashMap<Route, Arc<Semaphore>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, method: Method, path: &str, result: Result<Value, HttpError>) {
        self.routes
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(result);
    }

    /// Requests to this route block until a permit is added to the returned semaphore.
    pub fn hold(&self, method: Method, path: &str) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.gates
            .lock()
            .unwrap()
            .insert((method, path.to_string()), Arc::clone(&gate));
        gate
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: &Method, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| &r.method == method && r.path == path)
            .count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: ApiRequest) -> Result<Value, HttpError> {
        let route = (request.method.clone(), request.path.clone());
        self.requests.lock().unwrap().push(request);

        let gate = self.gates.lock().unwrap().get(&route).cloned();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }

        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(&route) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => Err(status_error(404)),
        }
    }
}

/// A token store whose every operation fails.
pub struct FailingTokenStore;

impl TokenStore for FailingTokenStore {
    fn get(&self) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable("keychain locked".into()))
    }

    fn set(&self, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("keychain locked".into()))
    }

    fn clear(&self) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("keychain locked".into()))
    }
}

pub fn status_error(status: u16) -> HttpError {
    HttpError::Status {
        status,
        data: Value::Null,
        message: format!("status {status}"),
    }
}

/// Creates a test App over the given transport with an empty in-memory token store.
pub fn test_app(transport: Arc<ScriptedTransport>) -> App {
    test_app_with_tokens(transport, Arc::new(MemoryTokenStore::new()))
}

pub fn test_app_with_tokens(transport: Arc<ScriptedTransport>, tokens: Arc<dyn TokenStore>) -> App {
    App::new(transport, tokens, Duration::from_secs(60))
}
