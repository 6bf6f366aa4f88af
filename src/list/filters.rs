use std::collections::BTreeMap;

use super::query::{apply_filter, SEARCH};

/// Current filter values of one table.
///
/// Every mutator reports whether anything changed; the owner resets the
/// pager to page 1 whenever it did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    filters: BTreeMap<String, String>,
}

impl FilterState {
    pub fn new() -> Self {
        FilterState::default()
    }

    /// Starts from existing values, dropping blank ones
    pub fn from_values(values: &BTreeMap<String, String>) -> Self {
        let mut state = FilterState::new();
        for (key, value) in values {
            state.set_filter(key, value);
        }
        state
    }

    pub fn set_filter(&mut self, key: &str, value: &str) -> bool {
        apply_filter(&mut self.filters, key, value)
    }

    pub fn set_search(&mut self, text: &str) -> bool {
        self.set_filter(SEARCH, text)
    }

    pub fn clear(&mut self) -> bool {
        let had_filters = !self.filters.is_empty();
        self.filters.clear();
        had_filters
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.filters.get(key).map(String::as_str)
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.filters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list::query::ROLE;

    #[test]
    fn test_set_filter_reports_changes() {
        let mut state = FilterState::new();
        assert!(state.set_filter(ROLE, "faculty"));
        assert!(!state.set_filter(ROLE, "faculty"));
        assert!(state.set_filter(ROLE, "student"));
        assert!(state.set_filter(ROLE, ""));
        assert!(!state.set_filter(ROLE, ""));
        assert_eq!(state.get(ROLE), None);
    }

    #[test]
    fn test_search_uses_search_key() {
        let mut state = FilterState::new();
        assert!(state.set_search(" cse "));
        assert_eq!(state.get(SEARCH), Some("cse"));
    }

    #[test]
    fn test_clear() {
        let mut state = FilterState::new();
        assert!(!state.clear());
        state.set_filter(ROLE, "admin");
        assert!(state.clear());
        assert!(state.values().is_empty());
    }
}
