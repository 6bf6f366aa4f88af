//! In-process backend serving the users collection the way the college API
//! does, for exercising the fetcher and the list view end to end.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::entities::{Role, User};

type Shared = Arc<Mutex<BackendState>>;

struct BackendState {
    users: Vec<User>,
    next_id: i64,
    nested: bool,
    garbage: bool,
    requested_pages: Vec<u32>,
    last_token: Option<String>,
}

impl BackendState {
    /// 25 students, 5 HODs and one admin
    fn seeded() -> Self {
        let mut users = Vec::new();
        for id in 1..=31 {
            let (role, username) = match id {
                1..=25 => (Role::Student, format!("student{id}")),
                26..=30 => (Role::Hod, format!("hod{}", id - 25)),
                _ => (Role::Admin, "admin".to_owned()),
            };
            users.push(User {
                id,
                email: format!("{username}@college.edu"),
                username,
                first_name: String::new(),
                last_name: String::new(),
                role,
                is_active: true,
            });
        }
        BackendState {
            users,
            next_id: 32,
            nested: false,
            garbage: false,
            requested_pages: Vec::new(),
            last_token: None,
        }
    }
}

pub struct TestBackend {
    addr: SocketAddr,
    state: Shared,
    handle: JoinHandle<()>,
}

impl TestBackend {
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(BackendState::seeded()));
        let app = Router::new()
            .route("/api/users/", get(list_users).post(create_user))
            .route("/api/users/{id}/", put(update_user).delete(delete_user))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        TestBackend {
            addr,
            state,
            handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn set_nested(&self, nested: bool) {
        self.state.lock().unwrap().nested = nested;
    }

    pub fn set_garbage(&self, garbage: bool) {
        self.state.lock().unwrap().garbage = garbage;
    }

    pub fn last_token(&self) -> Option<String> {
        self.state.lock().unwrap().last_token.clone()
    }

    pub fn user_count(&self) -> usize {
        self.state.lock().unwrap().users.len()
    }

    /// Pages requested from the list endpoint, oldest first
    pub fn requested_pages(&self) -> Vec<u32> {
        self.state.lock().unwrap().requested_pages.clone()
    }

    pub fn clear_requests(&self) {
        self.state.lock().unwrap().requested_pages.clear();
    }

    /// Removes the `n` highest-numbered students behind the client's back
    pub fn remove_students(&self, n: usize) {
        let mut state = self.state.lock().unwrap();
        for _ in 0..n {
            if let Some(pos) = state.users.iter().rposition(|u| u.role == Role::Student) {
                state.users.remove(pos);
            }
        }
    }
}

impl Drop for TestBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_owned)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Authentication credentials were not provided."})),
    )
        .into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response()
}

async fn list_users(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let mut state = state.lock().unwrap();

    let page: usize = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let page_size: usize = params
        .get("page_size")
        .and_then(|p| p.parse().ok())
        .unwrap_or(10);
    state.requested_pages.push(page as u32);

    state.last_token = bearer(&headers);
    if state.last_token.is_none() {
        return unauthorized();
    }
    if state.garbage {
        return (StatusCode::OK, "<html>Bad gateway</html>").into_response();
    }

    let matching: Vec<&User> = state
        .users
        .iter()
        .filter(|u| params.get("role").map_or(true, |r| u.role.to_string() == *r))
        .filter(|u| params.get("search").map_or(true, |s| u.username.contains(s.as_str())))
        .collect();

    let total = matching.len();
    let pages = total.div_ceil(page_size).max(1);
    if page == 0 || page > pages {
        return (StatusCode::NOT_FOUND, Json(json!({"detail": "Invalid page."}))).into_response();
    }

    let start = (page - 1) * page_size;
    let end = (start + page_size).min(total);
    let items: Vec<Value> = matching[start..end]
        .iter()
        .map(|u| serde_json::to_value(u).unwrap())
        .collect();

    let next = (page < pages).then(|| format!("/api/users/?page={}", page + 1));
    let previous = (page > 1).then(|| format!("/api/users/?page={}", page - 1));

    let body = if state.nested {
        json!({
            "results": {"success": true, "users": items},
            "count": total,
            "next": next,
            "previous": previous,
        })
    } else {
        json!({
            "success": true,
            "users": items,
            "count": total,
            "next": next,
            "previous": previous,
        })
    };

    Json(body).into_response()
}

async fn create_user(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Response {
    if bearer(&headers).is_none() {
        return unauthorized();
    }
    let mut state = state.lock().unwrap();

    let username = payload["username"].as_str().unwrap_or_default().to_owned();
    if username.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"username": ["This field is required."]})),
        )
            .into_response();
    }
    let role: Role = serde_json::from_value(payload["role"].clone()).unwrap_or(Role::Student);

    let id = state.next_id;
    state.next_id += 1;
    state.users.push(User {
        id,
        email: format!("{username}@college.edu"),
        username,
        first_name: String::new(),
        last_name: String::new(),
        role,
        is_active: true,
    });

    (
        StatusCode::CREATED,
        Json(json!({"success": true, "message": "User created", "id": id})),
    )
        .into_response()
}

async fn update_user(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(payload): Json<Value>,
) -> Response {
    if bearer(&headers).is_none() {
        return unauthorized();
    }
    let mut state = state.lock().unwrap();
    let Some(user) = state.users.iter_mut().find(|u| u.id == id) else {
        return not_found();
    };
    if let Some(username) = payload["username"].as_str() {
        user.username = username.to_owned();
    }
    Json(json!({"success": true, "message": "User updated"})).into_response()
}

async fn delete_user(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if bearer(&headers).is_none() {
        return unauthorized();
    }
    let mut state = state.lock().unwrap();
    let before = state.users.len();
    state.users.retain(|u| u.id != id);
    if state.users.len() == before {
        return not_found();
    }
    Json(json!({"success": true, "message": "User deleted"})).into_response()
}
