//! Record collections.
//!
//! A [`Collection`] is built from two capabilities held side by side: a
//! [`ModelQuery`] that knows which model to call and how (the sync adapter),
//! and a [`Pager`] that knows which page is current. Fetching replaces the
//! items wholesale on success and leaves them untouched on failure.

use serde_json::{Map, Value};
use tracing::debug;

use crate::config::ModelConfig;
use crate::error::PagerError;
use crate::group::GroupModel;
use crate::mapper::{Items, Mapped};
use crate::options::FetchOptions;
use crate::record::{Record, RecordId};
use crate::sync::{SyncAdapter, SyncMethod, SyncOutcome};

pub const DEFAULT_PAGE_SIZE: usize = 80;

// ── ModelQuery ──────────────────────────────────────────────────────

/// Query capability: a model bound to a sync adapter.
#[derive(Clone)]
pub struct ModelQuery {
    model: ModelConfig,
    adapter: SyncAdapter,
}

impl ModelQuery {
    pub fn new(model: ModelConfig, adapter: SyncAdapter) -> Self {
        Self { model, adapter }
    }

    pub fn model(&self) -> &ModelConfig {
        &self.model
    }

    pub fn adapter(&self) -> &SyncAdapter {
        &self.adapter
    }

    pub async fn read(&self, options: FetchOptions) -> Result<Mapped, PagerError> {
        match self.adapter.sync(SyncMethod::Read, &self.model, options).await? {
            SyncOutcome::Fetched(mapped) => Ok(mapped),
            _ => Err(PagerError::Mapping("read: unexpected outcome".into())),
        }
    }

    pub async fn create(&self, values: Map<String, Value>, options: FetchOptions) -> Result<RecordId, PagerError> {
        match self.adapter.sync(SyncMethod::Create(values), &self.model, options).await? {
            SyncOutcome::Created(id) => Ok(id),
            _ => Err(PagerError::Mapping("create: unexpected outcome".into())),
        }
    }

    pub async fn update(
        &self,
        id: RecordId,
        values: Map<String, Value>,
        options: FetchOptions,
    ) -> Result<(), PagerError> {
        self.adapter
            .sync(SyncMethod::Update { id, values }, &self.model, options)
            .await
            .map(|_| ())
    }

    pub async fn delete(&self, id: RecordId, options: FetchOptions) -> Result<(), PagerError> {
        self.adapter
            .sync(SyncMethod::Delete(id), &self.model, options)
            .await
            .map(|_| ())
    }
}

// ── Pager ───────────────────────────────────────────────────────────

/// Pagination capability: search criteria plus the current page.
#[derive(Debug, Clone)]
pub struct Pager {
    page_size: usize,
    page: usize,
    total: Option<u64>,
    last_len: usize,
    criteria: FetchOptions,
}

impl Default for Pager {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Pager {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            page: 0,
            total: None,
            last_len: 0,
            criteria: FetchOptions::default(),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Zero-based current page.
    pub fn page(&self) -> usize {
        self.page
    }

    /// Matching records on the backend, once a page has been loaded.
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    pub fn criteria(&self) -> &FetchOptions {
        &self.criteria
    }

    pub fn page_count(&self) -> Option<usize> {
        self.total
            .map(|total| (total as usize).div_ceil(self.page_size))
    }

    pub fn has_previous(&self) -> bool {
        self.page > 0
    }

    /// Without a backend total, a full last page means there may be more.
    pub fn has_next(&self) -> bool {
        match self.page_count() {
            Some(count) => self.page + 1 < count,
            None => self.last_len == self.page_size,
        }
    }

    /// Criteria for the current page.
    pub fn search(&self) -> FetchOptions {
        self.search_page(self.page)
    }

    /// Criteria for `page`: `limit = page_size`, `offset = page * page_size`.
    pub fn search_page(&self, page: usize) -> FetchOptions {
        self.criteria
            .clone()
            .limit(self.page_size)
            .offset(page * self.page_size)
    }

    fn check(&self, page: usize) -> Result<(), PagerError> {
        if let Some(count) = self.page_count() {
            if page > 0 && page >= count {
                return Err(PagerError::InvalidQuery(format!(
                    "page {} out of range ({} pages)",
                    page, count
                )));
            }
        }
        Ok(())
    }

    fn reset(&mut self, criteria: FetchOptions) {
        self.criteria = criteria;
        self.page = 0;
        self.total = None;
        self.last_len = 0;
    }

    fn settle(&mut self, page: usize, total: Option<u64>, len: usize) {
        self.page = page;
        self.total = total;
        self.last_len = len;
    }
}

// ── Collection ──────────────────────────────────────────────────────

/// Records of one model, flat or grouped.
pub struct Collection {
    query: ModelQuery,
    pager: Pager,
    items: Items,
    total: Option<u64>,
    /// Options of the last successful load; `refresh` and the write verbs
    /// reuse them.
    last: FetchOptions,
}

impl Collection {
    pub fn new(query: ModelQuery) -> Self {
        Self {
            query,
            pager: Pager::default(),
            items: Items::default(),
            total: None,
            last: FetchOptions::default(),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.pager = Pager::new(page_size);
        self
    }

    pub fn query(&self) -> &ModelQuery {
        &self.query
    }

    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    /// Fetch with `options` and replace the items.
    ///
    /// A flat fetch also becomes the pager's criteria (without its
    /// limit/offset), so `next_page` continues from it at page 0.
    pub async fn fetch(&mut self, options: FetchOptions) -> Result<(), PagerError> {
        let mapped = self.query.read(options.clone()).await?;
        let mut pager = Pager::new(self.pager.page_size());
        if !options.is_grouped() {
            let mut criteria = options.clone();
            criteria.limit = None;
            criteria.offset = None;
            pager.reset(criteria);
            pager.settle(0, mapped.total, mapped.items.len());
        }
        self.pager = pager;
        self.last = options;
        self.reset(mapped);
        Ok(())
    }

    fn reset(&mut self, mapped: Mapped) {
        debug!(
            "{}: {} items (total {:?})",
            self.query.model().model_name(),
            mapped.items.len(),
            mapped.total
        );
        self.items = mapped.items;
        self.total = mapped.total;
    }

    // ── paging ──────────────────────────────────────────────────────

    /// Start paging through `criteria` and load the first page.
    pub async fn paginate(&mut self, criteria: FetchOptions) -> Result<(), PagerError> {
        if criteria.is_grouped() {
            return Err(PagerError::InvalidQuery("group-by results are not paged".into()));
        }
        let mut pager = Pager::new(self.pager.page_size());
        pager.reset(criteria);
        self.load_into(pager, 0).await
    }

    pub async fn go_to_page(&mut self, page: usize) -> Result<(), PagerError> {
        self.pager.check(page)?;
        self.load_page(page).await
    }

    /// Load the next page; `Ok(false)` when already on the last one.
    pub async fn next_page(&mut self) -> Result<bool, PagerError> {
        if !self.pager.has_next() {
            return Ok(false);
        }
        self.load_page(self.pager.page() + 1).await?;
        Ok(true)
    }

    /// Load the previous page; `Ok(false)` when already on the first one.
    pub async fn previous_page(&mut self) -> Result<bool, PagerError> {
        if !self.pager.has_previous() {
            return Ok(false);
        }
        self.load_page(self.pager.page() - 1).await?;
        Ok(true)
    }

    /// Re-run the last successful fetch or page load.
    pub async fn refresh(&mut self) -> Result<(), PagerError> {
        let mapped = self.query.read(self.last.clone()).await?;
        if !self.last.is_grouped() {
            self.pager
                .settle(self.pager.page(), mapped.total, mapped.items.len());
        }
        self.reset(mapped);
        Ok(())
    }

    async fn load_page(&mut self, page: usize) -> Result<(), PagerError> {
        self.load_into(self.pager.clone(), page).await
    }

    /// Load `page` of `pager`; the pager is committed only on success.
    async fn load_into(&mut self, mut pager: Pager, page: usize) -> Result<(), PagerError> {
        let options = pager.search_page(page);
        let mapped = self.query.read(options.clone()).await?;
        pager.settle(page, mapped.total, mapped.items.len());
        self.pager = pager;
        self.last = options;
        self.reset(mapped);
        Ok(())
    }

    // ── groups ──────────────────────────────────────────────────────

    /// Fetch the members of every group concurrently. Stops at the first
    /// failure; groups already loaded keep their members.
    pub async fn expand_groups(&mut self) -> Result<(), PagerError> {
        let Items::Grouped(groups) = &mut self.items else {
            return Ok(());
        };
        let pending = groups.iter_mut().map(|group| group.row_mut().fetch());
        futures::future::try_join_all(pending).await?;
        Ok(())
    }

    // ── write verbs ─────────────────────────────────────────────────

    /// Create a record on the backend and add it to a flat collection.
    pub async fn create(&mut self, values: Map<String, Value>) -> Result<RecordId, PagerError> {
        let id = self.query.create(values.clone(), self.scope_options()).await?;
        if let Items::Flat(records) = &mut self.items {
            let mut record = Record::new(values);
            record.set("id", id.to_value());
            records.push(record);
            self.total = self.total.map(|t| t + 1);
        }
        Ok(id)
    }

    /// Write `values` on the backend, then onto the local copy if present.
    pub async fn update(&mut self, id: &RecordId, values: Map<String, Value>) -> Result<(), PagerError> {
        self.query
            .update(id.clone(), values.clone(), self.scope_options())
            .await?;
        if let Some(record) = self.get_mut(id) {
            record.merge(&values);
        }
        Ok(())
    }

    /// Delete on the backend, then drop the local copy.
    pub async fn destroy(&mut self, id: &RecordId) -> Result<(), PagerError> {
        self.query.delete(id.clone(), self.scope_options()).await?;
        if let Items::Flat(records) = &mut self.items {
            let before = records.len();
            records.retain(|r| r.id().as_ref() != Some(id));
            if records.len() < before {
                self.total = self.total.map(|t| t.saturating_sub(1));
            }
        }
        Ok(())
    }

    /// Context and domain of the last load, for write verbs.
    fn scope_options(&self) -> FetchOptions {
        FetchOptions {
            context: self.last.context.clone(),
            domain: self.last.domain.clone(),
            ..FetchOptions::default()
        }
    }

    // ── access ──────────────────────────────────────────────────────

    pub fn items(&self) -> &Items {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_grouped(&self) -> bool {
        matches!(self.items, Items::Grouped(_))
    }

    /// Backend total of the last fetch.
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Records of a flat collection; empty when grouped.
    pub fn records(&self) -> &[Record] {
        match &self.items {
            Items::Flat(records) => records,
            Items::Grouped(_) => &[],
        }
    }

    /// Group items of a grouped collection; empty when flat.
    pub fn groups(&self) -> &[Box<dyn GroupModel>] {
        match &self.items {
            Items::Grouped(groups) => groups,
            Items::Flat(_) => &[],
        }
    }

    pub fn groups_mut(&mut self) -> &mut [Box<dyn GroupModel>] {
        match &mut self.items {
            Items::Grouped(groups) => groups,
            Items::Flat(_) => &mut [],
        }
    }

    pub fn at(&self, index: usize) -> Option<&Record> {
        self.records().get(index)
    }

    pub fn group_at(&self, index: usize) -> Option<&(dyn GroupModel + 'static)> {
        self.groups().get(index).map(|g| &**g)
    }

    pub fn group_at_mut(&mut self, index: usize) -> Option<&mut Box<dyn GroupModel>> {
        self.groups_mut().get_mut(index)
    }

    pub fn get(&self, id: impl Into<RecordId>) -> Option<&Record> {
        let id = id.into();
        self.records().iter().find(|r| r.id().as_ref() == Some(&id))
    }

    fn get_mut(&mut self, id: &RecordId) -> Option<&mut Record> {
        match &mut self.items {
            Items::Flat(records) => records.iter_mut().find(|r| r.id().as_ref() == Some(id)),
            Items::Grouped(_) => None,
        }
    }
}
