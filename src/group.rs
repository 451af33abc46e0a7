//! Group rows of a `read_group` fetch.
//!
//! Each aggregate row becomes a [`GroupRow`]: the grouped value, the member
//! count, and the narrowing `__domain` the backend computed for it. Members
//! are not loaded with the groups; [`GroupRow::fetch`] issues a flat
//! `search_read` for them on first use and keeps the resulting
//! [`Collection`] on the row.
//!
//! Collections hold their groups as `Box<dyn GroupModel>`. The default item
//! is [`GroupQuery`]; [`FetchOptions::group_model`] swaps in any type that
//! wraps a `GroupRow`, and [`downcast_ref`](trait.GroupModel.html#method.downcast_ref)
//! gets it back.

use std::any::Any;

use serde_json::{Map, Value};
use tracing::debug;

use crate::collection::{Collection, ModelQuery};
use crate::domain::Domain;
use crate::error::PagerError;
use crate::options::FetchOptions;

/// An item of a grouped collection.
pub trait GroupModel: Any + Send + Sync {
    fn from_row(row: GroupRow) -> Self
    where
        Self: Sized;

    fn row(&self) -> &GroupRow;

    fn row_mut(&mut self) -> &mut GroupRow;

    fn as_any(&self) -> &dyn Any;

    fn value(&self) -> &Value {
        self.row().value()
    }

    fn count(&self) -> u64 {
        self.row().count()
    }
}

impl dyn GroupModel {
    pub fn is<T: GroupModel>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: GroupModel>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Load (once) and return the members of this group.
    pub async fn fetch(&mut self) -> Result<&Collection, PagerError> {
        self.row_mut().fetch().await
    }

    pub fn group(&self) -> Option<&Collection> {
        self.row().group()
    }
}

/// What a group row needs to load its members later.
#[derive(Clone)]
pub(crate) struct GroupScope {
    pub(crate) query: ModelQuery,
    pub(crate) parent: FetchOptions,
}

/// One aggregate row of a grouped fetch.
pub struct GroupRow {
    value: Value,
    count: u64,
    domain: Domain,
    fields: Map<String, Value>,
    scope: GroupScope,
    group: Option<Collection>,
}

impl GroupRow {
    pub(crate) fn new(
        value: Value,
        count: u64,
        domain: Domain,
        fields: Map<String, Value>,
        scope: GroupScope,
    ) -> Self {
        Self {
            value,
            count,
            domain,
            fields,
            scope,
            group: None,
        }
    }

    /// Value of the grouped field. Many2one groups carry `[id, name]`.
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Domain selecting exactly this group's members.
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// The raw aggregate row (other aggregated columns included).
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Members, once fetched.
    pub fn group(&self) -> Option<&Collection> {
        self.group.as_ref()
    }

    pub fn is_expanded(&self) -> bool {
        self.group.is_some()
    }

    /// Load the members with the parent's order and fields, all of them.
    /// Later calls return the memoized collection without a request.
    pub async fn fetch(&mut self) -> Result<&Collection, PagerError> {
        let members = match self.group.take() {
            Some(members) => members,
            None => self.load(FetchOptions::default()).await?,
        };
        Ok(self.group.insert(members))
    }

    /// Load one page of members, replacing whatever was memoized.
    ///
    /// `page` supplies limit/offset and may override order, fields, context,
    /// and narrow further through its filter.
    pub async fn fetch_page(&mut self, page: FetchOptions) -> Result<&Collection, PagerError> {
        let members = self.load(page).await?;
        Ok(self.group.insert(members))
    }

    /// Options of the member `search_read`: this row's domain, then the
    /// parent conditions it does not already contain.
    pub fn member_options(&self, page: FetchOptions) -> FetchOptions {
        let parent = &self.scope.parent;
        let filter = self
            .domain
            .narrowed_by(&parent.effective_domain())
            .and(&page.filter);
        FetchOptions {
            filter,
            order: if page.order.is_empty() { parent.order.clone() } else { page.order },
            limit: page.limit,
            offset: page.offset,
            group_by: Vec::new(),
            group_model: None,
            fields: if page.fields.is_empty() { parent.fields.clone() } else { page.fields },
            context: page.context.or_else(|| parent.context.clone()),
            domain: None,
        }
    }

    async fn load(&self, page: FetchOptions) -> Result<Collection, PagerError> {
        let options = self.member_options(page);
        debug!(
            "expanding group {} of {} ({} members)",
            self.value,
            self.scope.query.model().model_name(),
            self.count
        );
        let mut members = Collection::new(self.scope.query.clone());
        members.fetch(options).await?;
        Ok(members)
    }
}

/// Default group item: the row itself, nothing more.
pub struct GroupQuery {
    row: GroupRow,
}

impl GroupModel for GroupQuery {
    fn from_row(row: GroupRow) -> Self {
        Self { row }
    }

    fn row(&self) -> &GroupRow {
        &self.row
    }

    fn row_mut(&mut self) -> &mut GroupRow {
        &mut self.row
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl std::ops::Deref for GroupQuery {
    type Target = GroupRow;

    fn deref(&self) -> &GroupRow {
        &self.row
    }
}

impl std::ops::DerefMut for GroupQuery {
    fn deref_mut(&mut self) -> &mut GroupRow {
        &mut self.row
    }
}
