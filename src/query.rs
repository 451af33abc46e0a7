//! Fetch options -> Odoo RPC request.
//!
//! Flat fetches become `search_read` on `/web/dataset/search_read`. Grouped
//! fetches become `read_group` through `call_kw`; the backend groups by the
//! first field (`lazy`), returns one aggregate row per group, and paging
//! applies to the members of a group, never to the group list itself.

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::config::ModelConfig;
use crate::domain::Domain;
use crate::error::PagerError;
use crate::options::FetchOptions;

pub const SEARCH_READ_PATH: &str = "/web/dataset/search_read";

/// Params of `/web/dataset/search_read`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRead {
    pub model: String,
    pub fields: Vec<String>,
    pub domain: Domain,
    pub context: Map<String, Value>,
    pub offset: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Odoo order clause, e.g. `"id DESC, name ASC"`.
    pub sort: String,
}

/// Keyword arguments of `read_group`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadGroup {
    #[serde(skip)]
    pub model: String,
    pub domain: Domain,
    pub fields: Vec<String>,
    pub groupby: Vec<String>,
    pub lazy: bool,
    pub context: Map<String, Value>,
}

/// Generic model method call (`/web/dataset/call_kw/{model}/{method}`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallKw {
    pub model: String,
    pub method: String,
    pub args: Vec<Value>,
    pub kwargs: Map<String, Value>,
}

/// Descriptor of one backend call, independent of the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcRequest {
    SearchRead(SearchRead),
    ReadGroup(ReadGroup),
    CallKw(CallKw),
}

impl RpcRequest {
    pub fn model(&self) -> &str {
        match self {
            RpcRequest::SearchRead(r) => &r.model,
            RpcRequest::ReadGroup(r) => &r.model,
            RpcRequest::CallKw(r) => &r.model,
        }
    }

    /// Backend method name.
    pub fn method(&self) -> &str {
        match self {
            RpcRequest::SearchRead(_) => "search_read",
            RpcRequest::ReadGroup(_) => "read_group",
            RpcRequest::CallKw(r) => &r.method,
        }
    }

    /// HTTP path the JSON-RPC envelope is posted to.
    pub fn path(&self) -> String {
        match self {
            RpcRequest::SearchRead(_) => SEARCH_READ_PATH.to_string(),
            _ => format!("/web/dataset/call_kw/{}/{}", self.model(), self.method()),
        }
    }

    /// JSON-RPC `params` member.
    pub fn params(&self) -> Result<Value, PagerError> {
        let value = match self {
            RpcRequest::SearchRead(r) => serde_json::to_value(r),
            RpcRequest::ReadGroup(r) => {
                let kwargs = serde_json::to_value(r)
                    .map_err(|e| PagerError::InvalidQuery(format!("encode read_group: {}", e)))?;
                Ok(json!({
                    "model": r.model,
                    "method": "read_group",
                    "args": [],
                    "kwargs": kwargs,
                }))
            }
            RpcRequest::CallKw(r) => serde_json::to_value(r),
        };
        value.map_err(|e| PagerError::InvalidQuery(format!("encode {}: {}", self.method(), e)))
    }
}

/// Translates [`FetchOptions`] and write verbs into [`RpcRequest`]s for one
/// model.
///
/// Holding a [`ModelConfig`] means the backend model name has already been
/// checked; no request can be built for a collection without one.
pub struct PagedQueryBuilder<'a> {
    model: &'a ModelConfig,
}

impl<'a> PagedQueryBuilder<'a> {
    pub fn new(model: &'a ModelConfig) -> Self {
        Self { model }
    }

    pub fn build(&self, options: &FetchOptions) -> Result<RpcRequest, PagerError> {
        let domain = options.effective_domain();
        let context = self.context(options);

        if options.is_grouped() {
            for field in &options.group_by {
                validate_field(field, "group_by")?;
            }
            return Ok(RpcRequest::ReadGroup(ReadGroup {
                model: self.model.model_name().to_string(),
                domain,
                fields: group_fields(options),
                groupby: options.group_by.clone(),
                lazy: true,
                context,
            }));
        }

        Ok(RpcRequest::SearchRead(SearchRead {
            model: self.model.model_name().to_string(),
            fields: options.fields.clone(),
            domain,
            context,
            offset: options.offset.unwrap_or(0),
            // Odoo reads `limit or False`: zero is no limit, so it is not sent.
            limit: options.limit.filter(|&limit| limit > 0),
            sort: sort_clause(&options.order)?,
        }))
    }

    /// `create(values)`; the backend answers with the new id.
    pub fn create(&self, values: Map<String, Value>, context: Map<String, Value>) -> RpcRequest {
        self.call_kw("create", vec![Value::Object(values)], context)
    }

    /// `write(ids, values)`; the backend answers `true`.
    pub fn write(&self, ids: Vec<Value>, values: Map<String, Value>, context: Map<String, Value>) -> RpcRequest {
        self.call_kw("write", vec![Value::Array(ids), Value::Object(values)], context)
    }

    /// `unlink(ids)`; the backend answers `true`.
    pub fn unlink(&self, ids: Vec<Value>, context: Map<String, Value>) -> RpcRequest {
        self.call_kw("unlink", vec![Value::Array(ids)], context)
    }

    fn call_kw(&self, method: &str, args: Vec<Value>, context: Map<String, Value>) -> RpcRequest {
        let mut merged = self.model.context().clone();
        merged.extend(context);
        let mut kwargs = Map::new();
        kwargs.insert("context".into(), Value::Object(merged));
        RpcRequest::CallKw(CallKw {
            model: self.model.model_name().to_string(),
            method: method.to_string(),
            args,
            kwargs,
        })
    }

    /// Model context overlaid with the call context.
    pub fn context(&self, options: &FetchOptions) -> Map<String, Value> {
        let mut context = self.model.context().clone();
        if let Some(extra) = &options.context {
            for (key, value) in extra {
                context.insert(key.clone(), value.clone());
            }
        }
        context
    }
}

/// `read_group` needs the grouped fields in its field list; extra fields
/// asked for by the caller are aggregated as well.
fn group_fields(options: &FetchOptions) -> Vec<String> {
    let mut fields = options.group_by.clone();
    for field in &options.fields {
        if !fields.contains(field) {
            fields.push(field.clone());
        }
    }
    fields
}

/// Map sort keys to an Odoo order clause: `["-id", "name"]` ->
/// `"id DESC, name ASC"`.
pub fn sort_clause(order: &[String]) -> Result<String, PagerError> {
    let mut parts = Vec::with_capacity(order.len());
    for key in order {
        let key = key.trim();
        let (field, direction) = match key.strip_prefix('-') {
            Some(field) => (field, "DESC"),
            None => (key.strip_prefix('+').unwrap_or(key), "ASC"),
        };
        validate_field(field, "order")?;
        parts.push(format!("{} {}", field, direction));
    }
    Ok(parts.join(", "))
}

fn validate_field(field: &str, what: &str) -> Result<(), PagerError> {
    let valid = !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':'));
    if !valid {
        return Err(PagerError::InvalidQuery(format!(
            "invalid {} field '{}'",
            what, field
        )));
    }
    Ok(())
}
