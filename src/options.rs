use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::domain::Domain;
use crate::group::{GroupModel, GroupRow};

/// Builds the item that stands for one group row of a grouped fetch.
pub type GroupFactory = Arc<dyn Fn(GroupRow) -> Box<dyn GroupModel> + Send + Sync>;

/// Per-call fetch options, the Rust shape of a collection `fetch(options)`.
///
/// An empty `group_by` means a flat `search_read`; anything else turns the
/// call into a `read_group` and ignores `limit`/`offset`.
#[derive(Clone, Default)]
pub struct FetchOptions {
    /// Query filter, ANDed after the connection `domain`.
    pub filter: Domain,
    /// Sort keys, `-` prefix for descending (`["-date", "name"]`).
    pub order: Vec<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub group_by: Vec<String>,
    /// Replaces the default [`GroupQuery`](crate::GroupQuery) items.
    pub group_model: Option<GroupFactory>,
    /// Fields to read; empty reads the backend's default set.
    pub fields: Vec<String>,
    /// Call context, defaults to `{}`.
    pub context: Option<Map<String, Value>>,
    /// Connection-level domain, defaults to `[]`.
    pub domain: Option<Domain>,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Domain) -> Self {
        self.filter = filter;
        self
    }

    pub fn order<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Page size of a flat fetch. `0` reads everything, as in Odoo.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn group_by<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Use `G` for the items of a grouped fetch.
    pub fn group_model<G: GroupModel>(mut self) -> Self {
        let factory: GroupFactory =
            Arc::new(|row: GroupRow| Box::new(G::from_row(row)) as Box<dyn GroupModel>);
        self.group_model = Some(factory);
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn context(mut self, context: Map<String, Value>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn domain(mut self, domain: Domain) -> Self {
        self.domain = Some(domain);
        self
    }

    pub fn is_grouped(&self) -> bool {
        !self.group_by.is_empty()
    }

    /// Connection domain followed by the filter.
    pub fn effective_domain(&self) -> Domain {
        match &self.domain {
            Some(domain) => domain.and(&self.filter),
            None => self.filter.clone(),
        }
    }
}

impl fmt::Debug for FetchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchOptions")
            .field("filter", &self.filter)
            .field("order", &self.order)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .field("group_by", &self.group_by)
            .field("group_model", &self.group_model.as_ref().map(|_| "<factory>"))
            .field("fields", &self.fields)
            .field("context", &self.context)
            .field("domain", &self.domain)
            .finish()
    }
}
