use serde_json::Value;

use crate::api::client::ApiRequest;
use crate::cache::tags::Tag;

/// A cacheable read. `provides` sees the arguments and the decoded result.
pub struct QueryEndpoint {
    pub name: &'static str,
    pub request: fn(&Value) -> ApiRequest,
    pub provides: fn(&Value, &Value) -> Vec<Tag>,
}

/// A write. `invalidates` sees the arguments and the server's answer and is
/// only consulted after a successful response.
pub struct MutationEndpoint {
    pub name: &'static str,
    pub request: fn(&Value) -> ApiRequest,
    pub invalidates: fn(&Value, &Value) -> Vec<Tag>,
}

/// For endpoints that provide or invalidate nothing.
pub fn no_tags(_args: &Value, _result: &Value) -> Vec<Tag> {
    Vec::new()
}
