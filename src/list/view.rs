use std::future::Future;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, error, info, warn};
use tokio_util::sync::CancellationToken;

use super::fetcher::ListFetcher;
use super::filters::FilterState;
use super::pager::Pager;
use super::query::ListQuery;
use super::result::{ListResult, MutationKind, MutationOutcome};
use crate::entities::Entity;
use crate::error::FetchError;
use crate::notify::Notifier;

/// Where the view is in its fetch cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewStatus {
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

/// What the table area should show right now
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListDisplay<T> {
    Idle,
    Loading,
    Error(String),
    Table(Vec<T>),
    Empty,
}

/// How a call that may fetch ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A response (or error) was committed to the view
    Committed,
    /// A newer fetch was issued first; this one changed nothing
    Superseded,
    /// The query did not change, nothing was fetched
    Skipped,
}

struct ViewState<T> {
    filters: FilterState,
    pager: Pager,
    status: ViewStatus,
    result: Option<ListResult<T>>,
    seq: u64,
    in_flight: Option<CancellationToken>,
}

impl<T> ViewState<T> {
    fn query(&self) -> ListQuery {
        ListQuery {
            page: self.pager.page(),
            page_size: self.pager.page_size(),
            filters: self.filters.values().clone(),
        }
    }
}

struct Ticket {
    seq: u64,
    query: ListQuery,
    token: CancellationToken,
}

enum Commit {
    Done(Option<String>),
    Stale,
    Refetch(Ticket),
}

/// A paginated, filtered table kept in sync with the backend.
///
/// Every fetch is numbered. Issuing a fetch cancels the one in flight, and a
/// response is only committed while its number is still the latest, so the
/// table always reflects the most recent query.
pub struct ListView<T, F> {
    fetcher: F,
    notifier: Arc<dyn Notifier>,
    state: Mutex<ViewState<T>>,
    _entity: PhantomData<fn() -> T>,
}

impl<T, F> ListView<T, F>
where
    F: ListFetcher<T>,
{
    pub fn new(fetcher: F, notifier: Arc<dyn Notifier>, page_size: u32) -> Self {
        Self::with_query(fetcher, notifier, ListQuery::new(page_size))
    }

    /// A view that opens on a given page and filter set, e.g. restored from a URL
    pub fn with_query(fetcher: F, notifier: Arc<dyn Notifier>, query: ListQuery) -> Self {
        ListView {
            fetcher,
            notifier,
            state: Mutex::new(ViewState {
                filters: FilterState::from_values(&query.filters),
                pager: Pager::starting_at(query.page_size, query.page),
                status: ViewStatus::Idle,
                result: None,
                seq: 0,
                in_flight: None,
            }),
            _entity: PhantomData,
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    fn lock(&self) -> MutexGuard<'_, ViewState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn query(&self) -> ListQuery {
        self.lock().query()
    }

    pub fn status(&self) -> ViewStatus {
        self.lock().status.clone()
    }

    pub fn page(&self) -> u32 {
        self.lock().pager.page()
    }

    pub fn total_pages(&self) -> u32 {
        self.lock().pager.total_pages()
    }

    pub fn total_count(&self) -> u64 {
        self.lock().pager.total_count()
    }

    /// Initial fetch, same as `refresh`
    pub async fn load(&self) -> RefreshOutcome {
        self.refresh().await
    }

    /// Re-fetches the current page with the current filters
    pub async fn refresh(&self) -> RefreshOutcome {
        let ticket = self.begin();
        self.run(ticket).await
    }

    async fn run(&self, mut ticket: Ticket) -> RefreshOutcome {
        let mut allow_refetch = true;
        loop {
            let fetched = tokio::select! {
                _ = ticket.token.cancelled() => {
                    debug!("Fetch #{} superseded while in flight", ticket.seq);
                    return RefreshOutcome::Superseded;
                }
                fetched = self.fetcher.fetch(&ticket.query) => fetched,
            };

            match self.commit(&ticket, fetched, allow_refetch) {
                Commit::Done(toast) => {
                    if let Some(message) = toast {
                        self.notifier.error(&message);
                    }
                    return RefreshOutcome::Committed;
                }
                Commit::Stale => return RefreshOutcome::Superseded,
                Commit::Refetch(next) => {
                    allow_refetch = false;
                    ticket = next;
                }
            }
        }
    }

    pub async fn set_filter(&self, key: &str, value: &str) -> RefreshOutcome {
        let ticket = self.change(|state| {
            let changed = state.filters.set_filter(key, value);
            if changed {
                state.pager.reset();
            }
            changed
        });
        self.run_if(ticket).await
    }

    pub async fn set_search(&self, text: &str) -> RefreshOutcome {
        self.set_filter(super::query::SEARCH, text).await
    }

    pub async fn clear_filters(&self) -> RefreshOutcome {
        let ticket = self.change(|state| {
            let changed = state.filters.clear();
            if changed {
                state.pager.reset();
            }
            changed
        });
        self.run_if(ticket).await
    }

    pub async fn go_to_page(&self, n: u32) -> RefreshOutcome {
        let ticket = self.change(|state| state.pager.go_to_page(n));
        self.run_if(ticket).await
    }

    pub async fn next_page(&self) -> RefreshOutcome {
        let ticket = self.change(|state| state.pager.next_page());
        self.run_if(ticket).await
    }

    pub async fn previous_page(&self) -> RefreshOutcome {
        let ticket = self.change(|state| state.pager.previous_page());
        self.run_if(ticket).await
    }

    /// Runs a create, update or delete and keeps the table consistent with the
    /// server. Nothing local changes unless the server confirms success.
    pub async fn apply_mutation<Fut>(
        &self,
        kind: MutationKind,
        mutation: Fut,
    ) -> Result<MutationOutcome, FetchError>
    where
        Fut: Future<Output = Result<MutationOutcome, FetchError>>,
    {
        let outcome = match mutation.await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!("Mutation failed: {}", err);
                self.notifier.error(&err.user_message());
                return Err(err);
            }
        };

        if !outcome.success {
            // Field errors are shown next to their fields, not as a toast
            if !outcome.has_field_errors() {
                let message = outcome
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("Record could not be {}", kind.verb()));
                self.notifier.error(&message);
            }
            return Ok(outcome);
        }

        let message = outcome
            .message
            .clone()
            .unwrap_or_else(|| format!("Record {}", kind.verb()));
        self.notifier.success(&message);

        let ticket = {
            let mut state = self.lock();
            if let MutationKind::Delete { removed } = kind {
                let emptied = removed > 0
                    && state
                        .result
                        .as_ref()
                        .is_some_and(|r| removed >= r.items.len());
                if emptied && state.pager.step_back() {
                    info!(
                        "Delete emptied the page, moving back to page {}",
                        state.pager.page()
                    );
                }
            }
            Self::issue(&mut state)
        };

        self.run(ticket).await;
        Ok(outcome)
    }

    /// Applies a change to the query and, if anything moved, issues the fetch
    /// for it under the same lock so no older response can commit in between
    fn change<C>(&self, change: C) -> Option<Ticket>
    where
        C: FnOnce(&mut ViewState<T>) -> bool,
    {
        let mut state = self.lock();
        if change(&mut *state) {
            Some(Self::issue(&mut state))
        } else {
            None
        }
    }

    async fn run_if(&self, ticket: Option<Ticket>) -> RefreshOutcome {
        match ticket {
            Some(ticket) => self.run(ticket).await,
            None => RefreshOutcome::Skipped,
        }
    }

    fn begin(&self) -> Ticket {
        Self::issue(&mut self.lock())
    }

    fn issue(state: &mut ViewState<T>) -> Ticket {
        state.seq += 1;
        if let Some(previous) = state.in_flight.take() {
            previous.cancel();
        }
        let token = CancellationToken::new();
        state.in_flight = Some(token.clone());
        state.status = ViewStatus::Loading;

        let query = state.query();
        debug!("Fetch #{} for {:?}", state.seq, query);
        Ticket {
            seq: state.seq,
            query,
            token,
        }
    }

    fn commit(
        &self,
        ticket: &Ticket,
        fetched: Result<ListResult<T>, FetchError>,
        allow_refetch: bool,
    ) -> Commit {
        let mut state = self.lock();
        if ticket.seq != state.seq {
            debug!(
                "Discarding response of fetch #{}, latest is #{}",
                ticket.seq, state.seq
            );
            return Commit::Stale;
        }
        state.in_flight = None;

        match fetched {
            Ok(result) => {
                if allow_refetch && state.pager.update_total(result.total_count) {
                    info!(
                        "Page {} no longer exists ({} items), returning to page 1",
                        ticket.query.page, result.total_count
                    );
                    return Commit::Refetch(Self::issue(&mut state));
                }
                state.pager.set_total(result.total_count);
                state.result = Some(result);
                state.status = ViewStatus::Loaded;
                Commit::Done(None)
            }
            Err(FetchError::InvalidPage) if allow_refetch && state.pager.page() > 1 => {
                info!(
                    "Server rejected page {}, returning to page 1",
                    ticket.query.page
                );
                state.pager.reset();
                Commit::Refetch(Self::issue(&mut state))
            }
            Err(FetchError::MalformedResponse(detail)) => {
                warn!("Treating malformed response as an empty list: {}", detail);
                state.pager.set_total(0);
                state.result = Some(ListResult::empty(
                    ticket.query.page,
                    ticket.query.page_size,
                ));
                state.status = ViewStatus::Loaded;
                Commit::Done(None)
            }
            Err(err) => {
                error!("Fetch #{} failed: {}", ticket.seq, err);
                let message = err.user_message();
                state.status = ViewStatus::Failed(message.clone());
                Commit::Done(Some(message))
            }
        }
    }
}

impl<T, F> ListView<T, F>
where
    T: Clone,
    F: ListFetcher<T>,
{
    pub fn result(&self) -> Option<ListResult<T>> {
        self.lock().result.clone()
    }

    pub fn display(&self) -> ListDisplay<T> {
        let state = self.lock();
        match &state.status {
            ViewStatus::Idle => ListDisplay::Idle,
            ViewStatus::Loading => ListDisplay::Loading,
            ViewStatus::Failed(message) => ListDisplay::Error(message.clone()),
            ViewStatus::Loaded => match &state.result {
                Some(result) if !result.is_empty() => ListDisplay::Table(result.items.clone()),
                _ => ListDisplay::Empty,
            },
        }
    }
}

impl<T, F> ListView<T, F>
where
    T: Entity,
    F: ListFetcher<T>,
{
    /// How many displayed rows carry `id`. A delete only empties the page
    /// when it removes rows that are actually on it.
    pub fn displayed_with_id(&self, id: i64) -> usize {
        self.lock()
            .result
            .as_ref()
            .map_or(0, |r| r.items.iter().filter(|item| item.id() == id).count())
    }

    /// The delete mutation kind for removing record `id` from the collection
    pub fn delete_kind(&self, id: i64) -> MutationKind {
        MutationKind::Delete {
            removed: self.displayed_with_id(id),
        }
    }
}
