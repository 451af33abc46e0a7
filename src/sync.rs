//! Collection verbs -> backend calls.
//!
//! [`SyncAdapter::sync`] is the one entry point collections go through. It
//! opens a [`Connection`] scoped to `(model, context, domain)` for the call,
//! hands the verb to it, and maps the reply. Every call is independent; the
//! adapter keeps no state besides the transport.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::collection::ModelQuery;
use crate::config::ModelConfig;
use crate::domain::Domain;
use crate::error::PagerError;
use crate::group::GroupScope;
use crate::mapper::{Mapped, ResultMapper};
use crate::options::FetchOptions;
use crate::query::{PagedQueryBuilder, RpcRequest};
use crate::record::RecordId;
use crate::transport::Transport;

/// A collection verb.
#[derive(Debug, Clone)]
pub enum SyncMethod {
    Read,
    Create(Map<String, Value>),
    Update { id: RecordId, values: Map<String, Value> },
    Delete(RecordId),
}

impl fmt::Display for SyncMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMethod::Read => f.write_str("read"),
            SyncMethod::Create(_) => f.write_str("create"),
            SyncMethod::Update { id, .. } => write!(f, "update({})", id),
            SyncMethod::Delete(id) => write!(f, "delete({})", id),
        }
    }
}

/// Result of a verb.
pub enum SyncOutcome {
    Fetched(Mapped),
    Created(RecordId),
    Updated,
    Deleted,
}

#[derive(Clone)]
pub struct SyncAdapter {
    transport: Arc<dyn Transport>,
}

impl SyncAdapter {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Run `method` against `model`.
    ///
    /// `options.context` and `options.domain` scope the connection
    /// (defaults `{}` and `[]`); the rest of `options` only matters for
    /// `Read`. Transport and mapping failures come back as `Err` and the
    /// caller's state is left alone.
    pub async fn sync(
        &self,
        method: SyncMethod,
        model: &ModelConfig,
        options: FetchOptions,
    ) -> Result<SyncOutcome, PagerError> {
        debug!("sync {} on {}", method, model.model_name());
        let connection = Connection::new(
            model.clone(),
            options.context.clone().unwrap_or_default(),
            options.domain.clone().unwrap_or_default(),
            self.transport.clone(),
        );

        match method {
            SyncMethod::Read => {
                let scope = GroupScope {
                    query: ModelQuery::new(model.clone(), self.clone()),
                    parent: options.clone(),
                };
                let mapped = connection.read(&options, scope).await?;
                Ok(SyncOutcome::Fetched(mapped))
            }
            SyncMethod::Create(values) => connection.create(values).await.map(SyncOutcome::Created),
            SyncMethod::Update { id, values } => {
                connection.write(&[id], values).await?;
                Ok(SyncOutcome::Updated)
            }
            SyncMethod::Delete(id) => {
                connection.unlink(&[id]).await?;
                Ok(SyncOutcome::Deleted)
            }
        }
    }
}

/// Backend handle for one model, with a fixed context and base domain.
pub struct Connection {
    model: ModelConfig,
    context: Map<String, Value>,
    domain: Domain,
    transport: Arc<dyn Transport>,
}

impl Connection {
    pub fn new(
        model: ModelConfig,
        context: Map<String, Value>,
        domain: Domain,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            model,
            context,
            domain,
            transport,
        }
    }

    pub fn model(&self) -> &ModelConfig {
        &self.model
    }

    pub fn context(&self) -> &Map<String, Value> {
        &self.context
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Request a fetch of `options` would issue on this connection.
    pub fn request(&self, options: &FetchOptions) -> Result<RpcRequest, PagerError> {
        let mut scoped = options.clone();
        scoped.context = Some(self.context.clone());
        scoped.domain = Some(self.domain.clone());
        PagedQueryBuilder::new(&self.model).build(&scoped)
    }

    /// Raw `search_read` reply.
    pub async fn search_read(&self, options: &FetchOptions) -> Result<Value, PagerError> {
        let mut flat = options.clone();
        flat.group_by.clear();
        let request = self.request(&flat)?;
        self.execute(&request).await
    }

    /// Raw `read_group` reply.
    pub async fn read_group(&self, options: &FetchOptions) -> Result<Value, PagerError> {
        if !options.is_grouped() {
            return Err(PagerError::InvalidQuery("read_group without group_by".into()));
        }
        let request = self.request(options)?;
        self.execute(&request).await
    }

    pub(crate) async fn read(
        &self,
        options: &FetchOptions,
        scope: GroupScope,
    ) -> Result<Mapped, PagerError> {
        let request = self.request(options)?;
        let response = self.execute(&request).await?;
        ResultMapper::map(response, options, scope)
    }

    pub async fn create(&self, values: Map<String, Value>) -> Result<RecordId, PagerError> {
        let request = PagedQueryBuilder::new(&self.model).create(values, self.context.clone());
        let response = self.execute(&request).await?;
        RecordId::from_value(&response).ok_or_else(|| {
            PagerError::Mapping(format!("create: expected a record id, got {}", response))
        })
    }

    pub async fn write(&self, ids: &[RecordId], values: Map<String, Value>) -> Result<(), PagerError> {
        let ids = ids.iter().map(RecordId::to_value).collect();
        let request = PagedQueryBuilder::new(&self.model).write(ids, values, self.context.clone());
        let response = self.execute(&request).await?;
        expect_true("write", &response)
    }

    pub async fn unlink(&self, ids: &[RecordId]) -> Result<(), PagerError> {
        let ids = ids.iter().map(RecordId::to_value).collect();
        let request = PagedQueryBuilder::new(&self.model).unlink(ids, self.context.clone());
        let response = self.execute(&request).await?;
        expect_true("unlink", &response)
    }

    async fn execute(&self, request: &RpcRequest) -> Result<Value, PagerError> {
        let path = request.path();
        debug!("{} {} -> {}", request.model(), request.method(), path);
        self.transport.call(&path, request.params()?).await
    }
}

fn expect_true(method: &str, response: &Value) -> Result<(), PagerError> {
    match response {
        Value::Bool(true) => Ok(()),
        other => Err(PagerError::Mapping(format!(
            "{}: expected true, got {}",
            method, other
        ))),
    }
}
