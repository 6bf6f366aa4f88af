use std::collections::BTreeMap;

use serde::Serialize;

use super::pager;

/// One normalized page of items, whatever envelope the backend used
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListResult<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
    pub next: Option<String>,
    pub previous: Option<String>,
}

impl<T> ListResult<T> {
    pub fn empty(page: u32, page_size: u32) -> Self {
        ListResult {
            items: Vec::new(),
            total_count: 0,
            page,
            page_size,
            next: None,
            previous: None,
        }
    }

    pub fn total_pages(&self) -> u32 {
        pager::total_pages(self.total_count, self.page_size)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Result of a create, update or delete
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MutationOutcome {
    pub success: bool,
    pub message: Option<String>,
    /// Validation messages keyed by field, shown next to the field
    pub field_errors: BTreeMap<String, Vec<String>>,
}

impl MutationOutcome {
    pub fn succeeded(message: Option<String>) -> Self {
        MutationOutcome {
            success: true,
            message,
            field_errors: BTreeMap::new(),
        }
    }

    pub fn failed(message: Option<String>, field_errors: BTreeMap<String, Vec<String>>) -> Self {
        MutationOutcome {
            success: false,
            message,
            field_errors,
        }
    }

    pub fn has_field_errors(&self) -> bool {
        !self.field_errors.is_empty()
    }
}

/// What kind of change a mutation made to the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Create,
    Update,
    /// Carries how many rows of the current page were removed
    Delete { removed: usize },
}

impl MutationKind {
    pub fn verb(&self) -> &'static str {
        match self {
            MutationKind::Create => "created",
            MutationKind::Update => "updated",
            MutationKind::Delete { .. } => "deleted",
        }
    }
}
