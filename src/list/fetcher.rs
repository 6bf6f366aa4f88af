use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn, Level};
use logging_timer::timer;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde_json::Value;

use super::envelope::{extract_message, mutation_outcome, normalize_list};
use super::query::ListQuery;
use super::result::{ListResult, MutationOutcome};
use crate::config::BackendConfig;
use crate::entities::Entity;
use crate::error::{CampusError, FetchError};
use crate::session::SessionProvider;

/// Produces one page of `T` for a query. The list view is generic over this.
pub trait ListFetcher<T>: Send + Sync {
    fn fetch(
        &self,
        query: &ListQuery,
    ) -> impl Future<Output = Result<ListResult<T>, FetchError>> + Send;
}

/// Builds the HTTP client shared by every resource
pub fn build_http_client(backend: &BackendConfig) -> Result<Client, CampusError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(backend.timeout_secs))
        .build()?;
    Ok(client)
}

/// A REST collection: paginated list plus create/update/delete
pub struct RestResource<T> {
    client: Client,
    base_url: String,
    session: Arc<dyn SessionProvider>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for RestResource<T> {
    fn clone(&self) -> Self {
        RestResource {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            session: Arc::clone(&self.session),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> RestResource<T> {
    pub fn new(client: Client, base_url: &str, session: Arc<dyn SessionProvider>) -> Self {
        RestResource {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            session,
            _entity: PhantomData,
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/{}/", self.base_url, T::ENDPOINT)
    }

    fn item_url(&self, id: i64) -> String {
        format!("{}/{}/{}/", self.base_url, T::ENDPOINT, id)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.bearer_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    pub async fn list(&self, query: &ListQuery) -> Result<ListResult<T>, FetchError> {
        let _tmr = timer!(Level::Trace; "RestResource::list", "{} page {}", T::ENDPOINT, query.page);

        let url = self.collection_url();
        debug!("GET {} {:?}", url, query.query_pairs());

        let request = self.client.get(&url).query(&query.query_pairs());
        let response = self.authorize(request).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(rejection(response).await);
        }

        let text = response.text().await?;
        let body: Value = serde_json::from_str(&text).map_err(|e| {
            warn!("Response from {} is not JSON: {}", url, e);
            FetchError::MalformedResponse(e.to_string())
        })?;

        normalize_list(body, T::ITEMS_KEY, query)
    }

    pub async fn create<P: Serialize + ?Sized>(
        &self,
        payload: &P,
    ) -> Result<MutationOutcome, FetchError> {
        let request = self.client.post(self.collection_url()).json(payload);
        self.mutate(request).await
    }

    pub async fn update<P: Serialize + ?Sized>(
        &self,
        id: i64,
        payload: &P,
    ) -> Result<MutationOutcome, FetchError> {
        let request = self.client.put(self.item_url(id)).json(payload);
        self.mutate(request).await
    }

    pub async fn delete(&self, id: i64) -> Result<MutationOutcome, FetchError> {
        let request = self.client.delete(self.item_url(id));
        self.mutate(request).await
    }

    async fn mutate(&self, request: RequestBuilder) -> Result<MutationOutcome, FetchError> {
        let response = self.authorize(request).send().await?;
        let status = response.status();

        if status.is_success() || is_validation_status(status.as_u16()) {
            let text = response.text().await?;
            // 204 and friends carry no body
            let body = if text.trim().is_empty() {
                Value::Null
            } else {
                serde_json::from_str(&text).unwrap_or(Value::String(text))
            };
            return Ok(mutation_outcome(status.is_success(), &body));
        }

        Err(rejection(response).await)
    }
}

impl<T: Entity> ListFetcher<T> for RestResource<T> {
    fn fetch(
        &self,
        query: &ListQuery,
    ) -> impl Future<Output = Result<ListResult<T>, FetchError>> + Send {
        self.list(query)
    }
}

fn is_validation_status(status: u16) -> bool {
    status == 400 || status == 422
}

/// Reads a non-2xx response into an error, preferring the JSON message
async fn rejection(response: Response) -> FetchError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|body| extract_message(&body))
        .unwrap_or_else(|| {
            if text.trim().is_empty() {
                format!("Request failed with status {}", status)
            } else {
                text.trim().to_owned()
            }
        });
    debug!("Request rejected with {}: {}", status, message);
    FetchError::from_rejection(status, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Role, User};
    use crate::list::query::{ROLE, SEARCH};
    use crate::list::test_backend::TestBackend;
    use crate::session::Session;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn users(backend: &TestBackend, token: &str) -> RestResource<User> {
        RestResource::new(
            Client::new(),
            &backend.base_url(),
            Arc::new(Session::new(token)),
        )
    }

    #[tokio::test]
    async fn test_list_students_first_page() {
        let backend = TestBackend::start().await;
        let resource = users(&backend, "t0ken");

        let query = ListQuery::new(10).with_filter(ROLE, "student");
        let result = resource.list(&query).await.unwrap();

        assert_eq!(result.items.len(), 10);
        assert_eq!(result.total_count, 25);
        assert_eq!(result.total_pages(), 3);
        assert!(result.items.iter().all(|u| u.role == Role::Student));
        assert!(result.next.is_some());
        assert_eq!(backend.last_token().as_deref(), Some("t0ken"));
    }

    #[tokio::test]
    async fn test_nested_envelope_matches_flat() {
        let backend = TestBackend::start().await;
        let resource = users(&backend, "t");
        let query = ListQuery::new(10).with_filter(ROLE, "hod");

        let flat = resource.list(&query).await.unwrap();
        backend.set_nested(true);
        let nested = resource.list(&query).await.unwrap();

        assert_eq!(flat, nested);
        assert_eq!(nested.total_count, 5);
    }

    #[tokio::test]
    async fn test_repeat_fetch_is_idempotent() {
        let backend = TestBackend::start().await;
        let resource = users(&backend, "t");
        let query = ListQuery::new(10).with_filter(SEARCH, "student1").with_page(1);

        let first = resource.list(&query).await.unwrap();
        let second = resource.list(&query).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_out_of_range_page_is_invalid_page() {
        let backend = TestBackend::start().await;
        let resource = users(&backend, "t");
        let query = ListQuery::new(10).with_filter(ROLE, "student").with_page(9);

        let err = resource.list(&query).await.unwrap_err();
        assert_eq!(err, FetchError::InvalidPage);
    }

    #[tokio::test]
    async fn test_http_error_carries_server_message() {
        let backend = TestBackend::start().await;
        let resource = users(&backend, "");

        let err = resource.list(&ListQuery::new(10)).await.unwrap_err();
        assert_eq!(
            err,
            FetchError::Http {
                status: 401,
                message: "Authentication credentials were not provided.".into()
            }
        );
    }

    #[tokio::test]
    async fn test_non_json_body_is_malformed() {
        let backend = TestBackend::start().await;
        backend.set_garbage(true);
        let resource = users(&backend, "t");

        let err = resource.list(&ListQuery::new(10)).await.unwrap_err();
        assert!(matches!(err, FetchError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_network_error() {
        let backend = TestBackend::start().await;
        let base_url = backend.base_url();
        drop(backend);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let resource: RestResource<User> =
            RestResource::new(Client::new(), &base_url, Arc::new(Session::new("t")));
        let err = resource.list(&ListQuery::new(10)).await.unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
        assert_eq!(err.user_message(), "Network error");
    }

    #[tokio::test]
    async fn test_create_validation_errors() {
        let backend = TestBackend::start().await;
        let resource = users(&backend, "t");

        let outcome = resource
            .create(&json!({"username": "", "role": "student"}))
            .await
            .unwrap();
        assert!(!outcome.success);
        assert_eq!(
            outcome.field_errors.get("username"),
            Some(&vec!["This field is required.".to_string()])
        );
        assert_eq!(backend.user_count(), 31);
    }

    #[tokio::test]
    async fn test_create_update_delete() {
        let backend = TestBackend::start().await;
        let resource = users(&backend, "t");

        let created = resource
            .create(&json!({"username": "newbie", "role": "faculty"}))
            .await
            .unwrap();
        assert!(created.success);
        assert_eq!(created.message.as_deref(), Some("User created"));
        assert_eq!(backend.user_count(), 32);

        let updated = resource
            .update(1, &json!({"username": "renamed", "role": "admin"}))
            .await
            .unwrap();
        assert!(updated.success);

        let deleted = resource.delete(1).await.unwrap();
        assert!(deleted.success);
        assert_eq!(backend.user_count(), 31);

        let err = resource.delete(999).await.unwrap_err();
        assert_eq!(
            err,
            FetchError::Http {
                status: 404,
                message: "Not found.".into()
            }
        );
    }
}
