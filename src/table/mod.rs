//! Filter/paginate controller behind every task table.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;
use url::form_urlencoded;

use crate::client::{ApiError, Backend};
use crate::debounce::{Debouncer, SEARCH_DEBOUNCE};
use crate::models::{Status, Task, tasks_from_response};
use crate::store::{ResourceStore, Snapshot, TASKS_PREFIX};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const DELETE_PROMPT: &str = "Delete this task?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(Status),
}

impl StatusFilter {
    /// Empty or `all` means no filter.
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.trim() {
            "" => Ok(StatusFilter::All),
            t if t.eq_ignore_ascii_case("all") => Ok(StatusFilter::All),
            t => Status::from_str(t).map(StatusFilter::Only),
        }
    }

    pub fn as_param(&self) -> Option<&'static str> {
        match self {
            StatusFilter::All => None,
            StatusFilter::Only(s) => Some(s.as_str()),
        }
    }
}

/// Capped tables show a fixed number of the newest rows and no pager;
/// paginated tables page through everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableMode {
    Capped { limit: u32 },
    Paginated { page_size: u32 },
}

impl TableMode {
    pub fn capped(limit: u32) -> Self {
        TableMode::Capped {
            limit: limit.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn paginated(page_size: u32) -> Self {
        TableMode::Paginated {
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn page_size(&self) -> u32 {
        match self {
            TableMode::Capped { limit } => *limit,
            TableMode::Paginated { page_size } => *page_size,
        }
    }

    pub fn is_paginated(&self) -> bool {
        matches!(self, TableMode::Paginated { .. })
    }
}

/// Deterministic cache key (and request path) for one table state.
pub fn request_key(mode: TableMode, status: StatusFilter, search: &str, page: u32) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    if let Some(status) = status.as_param() {
        query.append_pair("status", status);
    }
    let search = search.trim();
    if !search.is_empty() {
        query.append_pair("q", search);
    }
    match mode {
        TableMode::Capped { limit } => {
            query.append_pair("limit", &limit.to_string());
            query.append_pair("order", "desc");
        }
        TableMode::Paginated { page_size } => {
            query.append_pair("page", &page.max(1).to_string());
            query.append_pair("size", &page_size.to_string());
        }
    }
    format!("{TASKS_PREFIX}?{}", query.finish())
}

/// Explicit table state, e.g. decoded from a page's query string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableQuery {
    pub status: StatusFilter,
    pub search: String,
    pub page: u32,
}

pub struct TaskTable<B: Backend> {
    store: Arc<ResourceStore<B>>,
    mode: TableMode,
    status: StatusFilter,
    search_text: String,
    debounced_search: String,
    page: u32,
    debouncer: Debouncer<String>,
    debounced_rx: mpsc::UnboundedReceiver<String>,
    rows: Snapshot<Vec<Task>>,
}

impl<B: Backend> TaskTable<B> {
    pub fn new(store: Arc<ResourceStore<B>>, mode: TableMode) -> Self {
        let (debouncer, debounced_rx) = Debouncer::new(SEARCH_DEBOUNCE);
        TaskTable {
            store,
            mode,
            status: StatusFilter::All,
            search_text: String::new(),
            debounced_search: String::new(),
            page: 1,
            debouncer,
            debounced_rx,
            rows: Snapshot {
                data: None,
                error: None,
                is_loading: true,
            },
        }
    }

    /// Start from a known state; the search is taken as already debounced.
    pub fn with_query(store: Arc<ResourceStore<B>>, mode: TableMode, query: TableQuery) -> Self {
        let mut table = TaskTable::new(store, mode);
        table.status = query.status;
        table.search_text = query.search.clone();
        table.debounced_search = query.search;
        if mode.is_paginated() {
            table.page = query.page.max(1);
        }
        table
    }

    pub fn mode(&self) -> TableMode {
        self.mode
    }

    pub fn status_filter(&self) -> StatusFilter {
        self.status
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn debounced_search(&self) -> &str {
        &self.debounced_search
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.mode.page_size()
    }

    pub fn request_key(&self) -> String {
        request_key(self.mode, self.status, &self.debounced_search, self.page)
    }

    pub fn rows(&self) -> &[Task] {
        self.rows.data.as_deref().unwrap_or(&[])
    }

    pub fn snapshot(&self) -> &Snapshot<Vec<Task>> {
        &self.rows
    }

    /// Returns whether the filter changed. A new filter starts at page 1.
    pub fn set_status_filter(&mut self, status: StatusFilter) -> bool {
        if self.status == status {
            return false;
        }
        self.status = status;
        self.reset_page();
        true
    }

    /// Record a keystroke; the query only changes after the quiet period.
    pub fn type_search(&mut self, text: &str) {
        self.search_text = text.to_string();
        self.debouncer.schedule(text.to_string());
    }

    /// Wait for the next debounced search value and apply it.
    pub async fn next_debounced_search(&mut self) -> Option<String> {
        let text = self.debounced_rx.recv().await?;
        self.apply_search(&text);
        Some(text)
    }

    /// Use `text` as the query right away. Returns whether it changed.
    /// Surrounding whitespace is not part of the query.
    pub fn apply_search(&mut self, text: &str) -> bool {
        let text = text.trim();
        if self.debounced_search == text {
            return false;
        }
        self.debounced_search = text.to_string();
        self.reset_page();
        true
    }

    fn reset_page(&mut self) {
        if self.mode.is_paginated() {
            self.page = 1;
        }
    }

    /// Only the pager moves the page; capped tables stay on page 1.
    pub fn next_page(&mut self) -> bool {
        if !self.has_next() {
            return false;
        }
        self.page += 1;
        true
    }

    pub fn prev_page(&mut self) -> bool {
        if !self.has_prev() {
            return false;
        }
        self.page -= 1;
        true
    }

    /// A full page suggests more rows may follow.
    pub fn has_next(&self) -> bool {
        self.mode.is_paginated() && self.rows().len() == self.page_size() as usize
    }

    pub fn has_prev(&self) -> bool {
        self.mode.is_paginated() && self.page > 1
    }

    pub async fn load(&mut self) -> &Snapshot<Vec<Task>> {
        self.settle(false).await;
        &self.rows
    }

    pub async fn refresh(&mut self) -> &Snapshot<Vec<Task>> {
        self.settle(true).await;
        &self.rows
    }

    /// Fetch the current key, stepping back a page while a page past the
    /// first comes back empty.
    async fn settle(&mut self, force: bool) {
        loop {
            let key = self.request_key();
            let state = if force {
                self.store.refresh(&key).await
            } else {
                self.store.load(&key).await
            };
            self.rows = Snapshot::from_state(state, tasks_from_response);
            let emptied = self.rows.error.is_none()
                && self.rows.data.as_ref().is_some_and(|rows| rows.is_empty());
            if !(emptied && self.mode.is_paginated() && self.page > 1) {
                break;
            }
            debug!(page = self.page, "page came back empty, stepping back");
            self.page -= 1;
        }
    }

    /// Delete a row after `confirm` agrees, then refresh the current key.
    /// Returns `Ok(false)` when the user declined.
    pub async fn delete<C>(&mut self, id: &str, confirm: C) -> Result<bool, ApiError>
    where
        C: FnOnce(&str) -> bool,
    {
        if !confirm(DELETE_PROMPT) {
            return Ok(false);
        }
        self.store.delete_task(id).await?;
        self.settle(true).await;
        Ok(true)
    }
}
