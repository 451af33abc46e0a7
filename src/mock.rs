//! In-memory [`Transport`] for tests.
//!
//! Routes are matched on the exact request path; the handler sees the
//! JSON-RPC `params` exactly as the HTTP transport would send them and
//! returns the `result`. Every call is recorded.
//!
//! ```ignore
//! let mock = MockTransport::new()
//!     .route("/web/dataset/search_read", |params| {
//!         Ok(json!({"length": 1, "records": [{"id": 1, "name": "item 1"}]}))
//!     });
//! ```

use std::sync::{Mutex, PoisonError};

use serde_json::Value;

use crate::error::PagerError;
use crate::transport::Transport;

type Handler = Box<dyn Fn(&Value) -> Result<Value, PagerError> + Send + Sync>;

/// A call seen by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub path: String,
    pub params: Value,
}

#[derive(Default)]
pub struct MockTransport {
    routes: Vec<(String, Handler)>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer calls to `path` with `handler`. Later routes for the same
    /// path shadow earlier ones.
    pub fn route<F>(mut self, path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, PagerError> + Send + Sync + 'static,
    {
        self.routes.insert(0, (path.into(), Box::new(handler)));
        self
    }

    /// Calls received so far, oldest first.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Calls received on `path`.
    pub fn calls_to(&self, path: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.path == path)
            .collect()
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn call(&self, path: &str, params: Value) -> Result<Value, PagerError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                path: path.to_string(),
                params: params.clone(),
            });

        let handler = self
            .routes
            .iter()
            .find(|(route, _)| route == path)
            .map(|(_, handler)| handler)
            .ok_or_else(|| PagerError::Transport(format!("no route for {}", path)))?;
        handler(&params)
    }
}
