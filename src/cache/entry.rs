use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::api::client::HttpError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// No result yet; the first request is outstanding.
    Loading,
    Success,
    Error,
}

/// What a subscriber sees of a cache entry at one point in time.
///
/// `data` is the last successful result. It survives a failed refetch, so
/// an `Error` snapshot may still carry the data it had before. `error` is
/// present iff `status` is `Error`. `is_fetching` is true while a request for the entry is outstanding,
/// including background refetches of stale data that stays visible.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySnapshot {
    pub status: QueryStatus,
    pub data: Option<Value>,
    pub error: Option<HttpError>,
    pub is_fetching: bool,
    pub request_id: Option<Uuid>,
    pub fulfilled_at: Option<DateTime<Utc>>,
}

impl QuerySnapshot {
    pub(crate) fn loading() -> Self {
        Self {
            status: QueryStatus::Loading,
            data: None,
            error: None,
            is_fetching: false,
            request_id: None,
            fulfilled_at: None,
        }
    }

    pub(crate) fn fulfil(&mut self, data: Value) {
        self.status = QueryStatus::Success;
        self.data = Some(data);
        self.error = None;
        self.is_fetching = false;
        self.fulfilled_at = Some(Utc::now());
    }

    pub(crate) fn reject(&mut self, error: HttpError) {
        self.status = QueryStatus::Error;
        self.error = Some(error);
        self.is_fetching = false;
    }

    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    /// Deserializes the data, if there is any.
    pub fn decode<T: DeserializeOwned>(&self) -> Option<Result<T, serde_json::Error>> {
        self.data
            .as_ref()
            .map(|data| serde_json::from_value(data.clone()))
    }
}
