use std::collections::BTreeMap;

use serde::Serialize;

pub const ROLE: &str = "role";
pub const STATUS: &str = "status";
pub const MONTH: &str = "month";
pub const SEARCH: &str = "search";

/// What a table currently wants from the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListQuery {
    pub page: u32,
    pub page_size: u32,
    pub filters: BTreeMap<String, String>,
}

impl ListQuery {
    pub fn new(page_size: u32) -> Self {
        ListQuery {
            page: 1,
            page_size: page_size.max(1),
            filters: BTreeMap::new(),
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    /// Returns a copy with the filter applied. Any filter change lands on page 1.
    pub fn with_filter(mut self, key: &str, value: &str) -> Self {
        if apply_filter(&mut self.filters, key, value) {
            self.page = 1;
        }
        self
    }

    pub fn filter(&self, key: &str) -> Option<&str> {
        self.filters.get(key).map(String::as_str)
    }

    /// Query-string pairs in a stable order: page, page_size, then filters by key
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.filters.len() + 2);
        pairs.push(("page".to_owned(), self.page.to_string()));
        pairs.push(("page_size".to_owned(), self.page_size.to_string()));
        pairs.extend(self.filters.iter().map(|(k, v)| (k.clone(), v.clone())));
        pairs
    }
}

/// Sets or clears a filter value. Blank values remove the filter.
/// Returns true if the stored filters changed.
pub(crate) fn apply_filter(filters: &mut BTreeMap<String, String>, key: &str, value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() {
        filters.remove(key).is_some()
    } else if filters.get(key).map(String::as_str) == Some(value) {
        false
    } else {
        filters.insert(key.to_owned(), value.to_owned());
        true
    }
}
