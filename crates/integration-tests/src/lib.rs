//! Integration tests for PedeAí.
//!
//! The tests in `tests/` drive the real client services against
//! [`FakeBackend`], an in-process HTTP server that speaks the subset of the
//! hosted backend's protocol the client uses:
//!
//! - `/auth/v1/signup`, `/auth/v1/token` (password and refresh grants),
//!   `/auth/v1/user`, `/auth/v1/logout`
//! - `/rest/v1/<table>` with `eq`, `neq`, `is.null` and `in` filters,
//!   `order`, `limit` and the single-object `Accept` header
//! - `/storage/v1/object/<bucket>/<path>` uploads
//!
//! Every table request runs under one lock, so a conditional `PATCH` is
//! atomic the way a single-row update is in the real database. Realtime
//! feeds are not served.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p pedeai-integration-tests
//! ```

pub mod fixtures;

use std::cmp::Ordering;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use pedeai_client::Backend;
use pedeai_client::config::BackendConfig;
use pedeai_core::{Email, Role, UserId};
use secrecy::SecretString;
use serde_json::{Map, Value, json};
use tokio::task::JoinHandle;
use url::Url;

pub const ANON_KEY: &str = "test-anon-key";
pub const PASSWORD: &str = "correct-horse-battery";

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Columns with a unique constraint, per table.
const UNIQUE: &[(&str, &str)] = &[("profiles", "id"), ("coupons", "code")];

#[derive(Debug, Clone)]
struct FakeUser {
    id: UserId,
    email: String,
    password: String,
    metadata: Value,
}

impl FakeUser {
    fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "email": self.email,
            "user_metadata": self.metadata,
        })
    }
}

#[derive(Debug, Default)]
struct FakeState {
    users: Vec<FakeUser>,
    tokens: HashMap<String, UserId>,
    refresh_tokens: HashMap<String, UserId>,
    tables: HashMap<String, Vec<Value>>,
    objects: HashMap<String, Vec<u8>>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl FakeState {
    /// Strictly increasing timestamps so ordering by `created_at` is stable.
    fn next_timestamp(&mut self) -> String {
        let now = Utc::now();
        let at = match self.last_timestamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(at);
        at.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn issue_token(&mut self, user_id: UserId) -> Value {
        let access_token = format!("access-{}", uuid::Uuid::new_v4());
        self.tokens.insert(access_token.clone(), user_id);
        let refresh_token = format!("refresh-{}", uuid::Uuid::new_v4());
        self.refresh_tokens.insert(refresh_token.clone(), user_id);
        let user = self
            .users
            .iter()
            .find(|u| u.id == user_id)
            .map_or(Value::Null, FakeUser::to_json);
        json!({
            "access_token": access_token,
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": refresh_token,
            "user": user,
        })
    }

    /// Mirror of the database trigger that creates a profile per account.
    fn create_profile(&mut self, user: &FakeUser) {
        let meta = &user.metadata;
        let role = meta.get("role").cloned().unwrap_or_else(|| json!("client"));
        let status = if role == json!("store") {
            json!("pending")
        } else {
            Value::Null
        };
        let created_at = self.next_timestamp();
        self.table("profiles").push(json!({
            "id": user.id,
            "email": user.email,
            "role": role,
            "full_name": meta.get("full_name").cloned().unwrap_or(Value::Null),
            "cnpj": meta.get("cnpj").cloned().unwrap_or(Value::Null),
            "cnh": meta.get("cnh").cloned().unwrap_or(Value::Null),
            "status": status,
            "is_online": false,
            "created_at": created_at,
        }));
    }

    fn table(&mut self, name: &str) -> &mut Vec<Value> {
        self.tables.entry(name.to_string()).or_default()
    }

    fn user_for(&self, headers: &HeaderMap) -> Option<UserId> {
        let token = headers
            .get(header::AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")?;
        self.tokens.get(token).copied()
    }
}

type SharedState = Arc<Mutex<FakeState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, FakeState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An in-process stand-in for the hosted backend.
///
/// The server task is aborted when the value is dropped.
pub struct FakeBackend {
    addr: SocketAddr,
    state: SharedState,
    server: JoinHandle<()>,
}

impl FakeBackend {
    /// Bind to an ephemeral port and start serving.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start() -> Self {
        let state = SharedState::default();
        let router = Router::new()
            .route("/auth/v1/signup", post(sign_up))
            .route("/auth/v1/token", post(token))
            .route("/auth/v1/user", get(user))
            .route("/auth/v1/logout", post(logout))
            .route(
                "/rest/v1/{table}",
                get(rest_select)
                    .post(rest_insert)
                    .patch(rest_update)
                    .delete(rest_delete),
            )
            .route("/storage/v1/object/{bucket}/{*path}", post(upload))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake backend");
        let addr = listener.local_addr().expect("local addr");
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                panic!("fake backend stopped: {e}");
            }
        });

        Self {
            addr,
            state,
            server,
        }
    }

    /// Project URL of the fake.
    ///
    /// # Panics
    ///
    /// Never in practice; the address always forms a valid URL.
    #[must_use]
    pub fn url(&self) -> Url {
        Url::parse(&format!("http://{}/", self.addr)).expect("fake backend url")
    }

    #[must_use]
    pub fn config(&self) -> BackendConfig {
        BackendConfig::new(self.url(), SecretString::from(ANON_KEY))
    }

    /// A fresh, signed-out client.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be built.
    #[must_use]
    pub fn client(&self) -> Backend {
        Backend::new(&self.config()).expect("backend client")
    }

    /// Create an account directly (with its profile) and return a client
    /// signed in as it.
    ///
    /// # Panics
    ///
    /// Panics if the email is invalid or sign-in fails.
    pub async fn signed_in(&self, email: &str, role: Role, full_name: &str) -> (Backend, UserId) {
        let user = FakeUser {
            id: UserId::random(),
            email: email.to_string(),
            password: PASSWORD.to_string(),
            metadata: json!({"role": role, "full_name": full_name}),
        };
        {
            let mut state = lock(&self.state);
            state.create_profile(&user);
            state.users.push(user.clone());
        }

        let backend = self.client();
        backend
            .sign_in_with_password(
                &Email::parse(email).expect("email"),
                &SecretString::from(PASSWORD),
            )
            .await
            .expect("sign in");
        (backend, user.id)
    }

    /// Insert a row as-is, filling `id` and `created_at` when absent.
    pub fn seed(&self, table: &str, row: Value) -> Value {
        let mut state = lock(&self.state);
        let row = with_defaults(&mut state, row);
        state.table(table).push(row.clone());
        row
    }

    /// Snapshot of a table.
    #[must_use]
    pub fn rows(&self, table: &str) -> Vec<Value> {
        lock(&self.state)
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Stored object bytes at `bucket/path`.
    #[must_use]
    pub fn object(&self, bucket: &str, path: &str) -> Option<Vec<u8>> {
        lock(&self.state)
            .objects
            .get(&format!("{bucket}/{path}"))
            .cloned()
    }

    /// Number of stored objects.
    #[must_use]
    pub fn object_count(&self) -> usize {
        lock(&self.state).objects.len()
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"message": message}))).into_response()
}

fn with_defaults(state: &mut FakeState, row: Value) -> Value {
    let Value::Object(mut map) = row else {
        return row;
    };
    map.entry("id")
        .or_insert_with(|| json!(uuid::Uuid::new_v4()));
    if !map.contains_key("created_at") {
        let at = state.next_timestamp();
        map.insert("created_at".to_string(), json!(at));
    }
    Value::Object(map)
}

// =============================================================================
// Auth
// =============================================================================

async fn sign_up(State(state): State<SharedState>, Json(body): Json<Value>) -> Response {
    let (Some(email), Some(password)) = (
        body.get("email").and_then(Value::as_str),
        body.get("password").and_then(Value::as_str),
    ) else {
        return error(StatusCode::BAD_REQUEST, "email and password required");
    };

    let mut state = lock(&state);
    if state.users.iter().any(|u| u.email == email) {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "User already registered");
    }
    let user = FakeUser {
        id: UserId::random(),
        email: email.to_string(),
        password: password.to_string(),
        metadata: body.get("data").cloned().unwrap_or_else(|| json!({})),
    };
    state.create_profile(&user);
    state.users.push(user.clone());
    Json(state.issue_token(user.id)).into_response()
}

async fn token(
    State(state): State<SharedState>,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = lock(&state);
    let found = match params.get("grant_type").map(String::as_str) {
        Some("password") => {
            let email = body.get("email").and_then(Value::as_str);
            let password = body.get("password").and_then(Value::as_str);
            state
                .users
                .iter()
                .find(|u| Some(u.email.as_str()) == email && Some(u.password.as_str()) == password)
                .map(|u| u.id)
        }
        // Refresh tokens are single use.
        Some("refresh_token") => body
            .get("refresh_token")
            .and_then(Value::as_str)
            .and_then(|token| state.refresh_tokens.remove(token)),
        _ => return error(StatusCode::BAD_REQUEST, "unsupported grant_type"),
    };
    match found {
        Some(user_id) => Json(state.issue_token(user_id)).into_response(),
        None => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            })),
        )
            .into_response(),
    }
}

async fn user(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let state = lock(&state);
    let Some(user_id) = state.user_for(&headers) else {
        return error(StatusCode::UNAUTHORIZED, "invalid JWT");
    };
    state
        .users
        .iter()
        .find(|u| u.id == user_id)
        .map_or_else(
            || error(StatusCode::NOT_FOUND, "user not found"),
            |u| Json(u.to_json()).into_response(),
        )
}

async fn logout(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);
    if let Some(token) = token {
        let mut state = lock(&state);
        if let Some(user_id) = state.tokens.remove(&token) {
            state.refresh_tokens.retain(|_, owner| *owner != user_id);
        }
    }
    StatusCode::NO_CONTENT.into_response()
}

// =============================================================================
// Tables
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Condition {
    Eq(String),
    Neq(String),
    IsNull,
    In(Vec<String>),
}

#[derive(Debug, Default)]
struct TableQuery {
    conditions: Vec<(String, Condition)>,
    order: Vec<(String, bool)>,
    limit: Option<usize>,
}

impl TableQuery {
    fn parse(params: Vec<(String, String)>) -> Result<Self, String> {
        let mut query = Self::default();
        for (key, value) in params {
            match key.as_str() {
                "select" => {}
                "order" => {
                    for part in value.split(',') {
                        let (column, direction) = part.rsplit_once('.').unwrap_or((part, "asc"));
                        query.order.push((column.to_string(), direction == "desc"));
                    }
                }
                "limit" => {
                    query.limit = Some(value.parse().map_err(|_| format!("bad limit {value}"))?);
                }
                _ => query.conditions.push((key, parse_condition(&value)?)),
            }
        }
        Ok(query)
    }

    fn matches(&self, row: &Value) -> bool {
        self.conditions.iter().all(|(column, condition)| {
            let cell = row.get(column).unwrap_or(&Value::Null);
            match condition {
                Condition::Eq(v) => !cell.is_null() && cell_text(cell) == *v,
                Condition::Neq(v) => !cell.is_null() && cell_text(cell) != *v,
                Condition::IsNull => cell.is_null(),
                Condition::In(values) => !cell.is_null() && values.contains(&cell_text(cell)),
            }
        })
    }

    fn sort(&self, rows: &mut [Value]) {
        rows.sort_by(|a, b| {
            for (column, desc) in &self.order {
                let ordering = compare_cells(
                    a.get(column).unwrap_or(&Value::Null),
                    b.get(column).unwrap_or(&Value::Null),
                );
                let ordering = if *desc { ordering.reverse() } else { ordering };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }
}

fn parse_condition(value: &str) -> Result<Condition, String> {
    if let Some(v) = value.strip_prefix("eq.") {
        Ok(Condition::Eq(v.to_string()))
    } else if let Some(v) = value.strip_prefix("neq.") {
        Ok(Condition::Neq(v.to_string()))
    } else if value == "is.null" {
        Ok(Condition::IsNull)
    } else if let Some(list) = value.strip_prefix("in.(").and_then(|v| v.strip_suffix(')')) {
        Ok(Condition::In(
            list.split(',')
                .map(|v| v.trim_matches('"').to_string())
                .collect(),
        ))
    } else {
        Err(format!("unsupported filter {value}"))
    }
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn compare_cells(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        _ => cell_text(a).cmp(&cell_text(b)),
    }
}

fn wants_single(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains(SINGLE_OBJECT))
}

fn rows_response(headers: &HeaderMap, rows: Vec<Value>) -> Response {
    if !wants_single(headers) {
        return Json(Value::Array(rows)).into_response();
    }
    let mut rows = rows.into_iter();
    match (rows.next(), rows.next()) {
        (Some(row), None) => Json(row).into_response(),
        _ => error(
            StatusCode::NOT_ACCEPTABLE,
            "JSON object requested, multiple (or no) rows returned",
        ),
    }
}

async fn rest_select(
    State(state): State<SharedState>,
    Path(table): Path<String>,
    headers: HeaderMap,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let query = match TableQuery::parse(params) {
        Ok(query) => query,
        Err(e) => return error(StatusCode::BAD_REQUEST, &e),
    };
    let mut rows: Vec<Value> = lock(&state)
        .table(&table)
        .iter()
        .filter(|row| query.matches(row))
        .cloned()
        .collect();
    query.sort(&mut rows);
    if let Some(limit) = query.limit {
        rows.truncate(limit);
    }
    rows_response(&headers, rows)
}

async fn rest_insert(
    State(state): State<SharedState>,
    Path(table): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let incoming = match body {
        Value::Array(rows) => rows,
        row @ Value::Object(_) => vec![row],
        _ => return error(StatusCode::BAD_REQUEST, "expected an object"),
    };

    let mut state = lock(&state);
    let mut inserted = Vec::with_capacity(incoming.len());
    for row in incoming {
        let row = with_defaults(&mut state, row);
        let existing = state.table(&table);
        for (unique_table, column) in UNIQUE {
            if *unique_table == table
                && let Some(value) = row.get(*column)
                && existing.iter().any(|r| r.get(*column) == Some(value))
            {
                return error(
                    StatusCode::CONFLICT,
                    &format!("duplicate key value violates unique constraint on {column}"),
                );
            }
        }
        existing.push(row.clone());
        inserted.push(row);
    }
    let mut response = rows_response(&headers, inserted);
    if response.status() == StatusCode::OK {
        *response.status_mut() = StatusCode::CREATED;
    }
    response
}

async fn rest_update(
    State(state): State<SharedState>,
    Path(table): Path<String>,
    headers: HeaderMap,
    Query(params): Query<Vec<(String, String)>>,
    Json(patch): Json<Value>,
) -> Response {
    let query = match TableQuery::parse(params) {
        Ok(query) => query,
        Err(e) => return error(StatusCode::BAD_REQUEST, &e),
    };
    let Value::Object(patch) = patch else {
        return error(StatusCode::BAD_REQUEST, "expected an object");
    };

    let mut state = lock(&state);
    let mut updated = Vec::new();
    for row in state.table(&table).iter_mut() {
        if !query.matches(row) {
            continue;
        }
        if let Value::Object(columns) = &mut *row {
            apply_patch(columns, &patch);
        }
        updated.push(row.clone());
    }
    rows_response(&headers, updated)
}

fn apply_patch(columns: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (column, value) in patch {
        columns.insert(column.clone(), value.clone());
    }
}

async fn rest_delete(
    State(state): State<SharedState>,
    Path(table): Path<String>,
    headers: HeaderMap,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let query = match TableQuery::parse(params) {
        Ok(query) => query,
        Err(e) => return error(StatusCode::BAD_REQUEST, &e),
    };
    let mut state = lock(&state);
    let rows = state.table(&table);
    let (removed, kept): (Vec<Value>, Vec<Value>) =
        rows.drain(..).partition(|row| query.matches(row));
    *rows = kept;
    rows_response(&headers, removed)
}

// =============================================================================
// Storage
// =============================================================================

async fn upload(
    State(state): State<SharedState>,
    Path((bucket, path)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let upsert = headers
        .get("x-upsert")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "true");
    let key = format!("{bucket}/{path}");

    let mut state = lock(&state);
    if state.user_for(&headers).is_none() {
        return error(StatusCode::UNAUTHORIZED, "invalid JWT");
    }
    if !upsert && state.objects.contains_key(&key) {
        return error(StatusCode::CONFLICT, "The resource already exists");
    }
    state.objects.insert(key.clone(), body.to_vec());
    Json(json!({"Key": key})).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_conditions_match_rows() {
        let query = TableQuery::parse(pairs(&[
            ("select", "*"),
            ("status", "eq.ready"),
            ("courier_id", "is.null"),
        ]))
        .expect("parse");

        assert!(query.matches(&json!({"status": "ready", "courier_id": null})));
        assert!(query.matches(&json!({"status": "ready"})));
        assert!(!query.matches(&json!({"status": "ready", "courier_id": "abc"})));
        assert!(!query.matches(&json!({"status": "pending", "courier_id": null})));
    }

    #[test]
    fn test_in_and_bool_conditions() {
        let query = TableQuery::parse(pairs(&[
            ("status", "in.(accepted,shipping)"),
            ("active", "eq.true"),
        ]))
        .expect("parse");
        assert!(query.matches(&json!({"status": "shipping", "active": true})));
        assert!(!query.matches(&json!({"status": "shipping", "active": false})));
        assert!(!query.matches(&json!({"status": "delivered", "active": true})));
    }

    #[test]
    fn test_sort_desc_then_limit() {
        let query = TableQuery::parse(pairs(&[("order", "created_at.desc"), ("limit", "2")]))
            .expect("parse");
        let mut rows = vec![
            json!({"created_at": "2025-01-01T00:00:00.000001Z"}),
            json!({"created_at": "2025-01-01T00:00:00.000003Z"}),
            json!({"created_at": "2025-01-01T00:00:00.000002Z"}),
        ];
        query.sort(&mut rows);
        assert_eq!(
            rows.first().and_then(|r| r.get("created_at")),
            Some(&json!("2025-01-01T00:00:00.000003Z"))
        );
        assert_eq!(query.limit, Some(2));
    }

    #[test]
    fn test_unsupported_filter_is_rejected() {
        assert!(TableQuery::parse(pairs(&[("total", "gt.10")])).is_err());
    }
}
