//! Paginated, filtered list views over the REST backend.

pub mod envelope;
pub mod fetcher;
pub mod filters;
pub mod pager;
pub mod query;
pub mod result;
pub mod view;

#[cfg(test)]
pub(crate) mod test_backend;

pub use fetcher::{build_http_client, ListFetcher, RestResource};
pub use filters::FilterState;
pub use pager::Pager;
pub use query::ListQuery;
pub use result::{ListResult, MutationKind, MutationOutcome};
pub use view::{ListDisplay, ListView, RefreshOutcome, ViewStatus};
