//! In-process stand-in for the remote asset API, served over real HTTP.

#![allow(dead_code)]

use axum::extract::{Multipart, Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

pub const TOKEN: &str = "tok-abc";
pub const PASSWORD: &str = "secret123";

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
}

#[derive(Default)]
pub struct Stub {
    pub requests: Mutex<Vec<Recorded>>,
    pub projects: Mutex<Vec<Value>>,
    pub assets: Mutex<Vec<Value>>,
    pub uploads: Mutex<Vec<(String, usize)>>,
    pub patches: Mutex<Vec<Value>>,
    pub fail_stats: AtomicBool,
    pub fail_asset_listing: AtomicBool,
    next_id: AtomicI64,
}

impl Stub {
    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 100
    }

    pub fn seed_project(&self, id: i64, name: &str, url: &str) {
        self.projects.lock().push(json!({
            "id": id,
            "name": name,
            "website_url": url,
            "extra_data": null,
            "created_by_user_id": 1,
            "creator_name": "Ada",
            "assets_count": 0,
            "created_at": "2025-01-05T10:00:00.000000Z",
            "updated_at": null
        }));
    }

    pub fn seed_asset(&self, id: i64, project_id: i64, filename: &str) {
        self.assets.lock().push(asset_json(id, project_id, filename, 2048));
    }

    pub fn requests_to(&self, method: &str, path: &str) -> Vec<Recorded> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .cloned()
            .collect()
    }
}

fn asset_json(id: i64, project_id: i64, filename: &str, bytes: usize) -> Value {
    let format = filename.rsplit('.').next().unwrap_or_default();
    json!({
        "id": id,
        "project_id": project_id,
        "uploaded_by_user_id": 1,
        "public_id": format!("assets/{}", id),
        "url": format!("https://cdn.example.com/{}", filename),
        "thumbnail_url": null,
        "folder": "assets",
        "resource_type": "image",
        "bytes": bytes,
        "format": format,
        "width": 640,
        "height": 480,
        "duration": null,
        "original_filename": filename,
        "created_at": "2025-01-06T09:30:00Z"
    })
}

fn user_json() -> Value {
    json!({"id": 1, "name": "Ada", "email": "ada@example.com", "created_at": "2025-01-01T00:00:00Z"})
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", TOKEN))
}

fn unauthenticated() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({"message": "Unauthenticated."}))).into_response()
}

fn data(value: Value) -> Response {
    Json(json!({ "data": value })).into_response()
}

async fn record(State(stub): State<Arc<Stub>>, request: Request, next: Next) -> Response {
    let uri = request.uri();
    stub.requests.lock().push(Recorded {
        method: request.method().to_string(),
        path: uri.path().trim_start_matches("/api/v1").to_string(),
        query: uri.query().map(str::to_string),
        authorization: request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    });
    next.run(request).await
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["password"] == PASSWORD {
        Json(json!({"token": TOKEN, "data": user_json()})).into_response()
    } else {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "message": "The given data was invalid.",
                "errors": {"email": ["These credentials do not match our records."]}
            })),
        )
            .into_response()
    }
}

async fn register(Json(body): Json<Value>) -> Response {
    if body["email"] == "taken@example.com" {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "message": "The given data was invalid.",
                "errors": {
                    "email": ["The email has already been taken."],
                    "password": ["The password must be at least 8 characters."]
                }
            })),
        )
            .into_response();
    }
    (StatusCode::CREATED, Json(json!({"token": TOKEN, "data": user_json()}))).into_response()
}

async fn logout(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthenticated();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn me(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthenticated();
    }
    data(user_json())
}

async fn list_projects(State(stub): State<Arc<Stub>>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthenticated();
    }
    let projects = stub.projects.lock().clone();
    data(Value::Array(projects))
}

async fn create_project(State(stub): State<Arc<Stub>>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !authorized(&headers) {
        return unauthenticated();
    }
    if body["name"] == "Taken" {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"message": "Invalid.", "errors": {"name": ["The name has already been taken."]}})),
        )
            .into_response();
    }
    let id = stub.next_id();
    let name = body["name"].as_str().unwrap_or_default().to_string();
    let url = body["website_url"].as_str().unwrap_or_default().to_string();
    stub.seed_project(id, &name, &url);
    (StatusCode::CREATED, Json(json!({"data": {"id": id}}))).into_response()
}

fn find_project(stub: &Stub, id: i64) -> Option<Value> {
    stub.projects.lock().iter().find(|p| p["id"] == id).cloned()
}

async fn show_project(State(stub): State<Arc<Stub>>, Path(id): Path<i64>) -> Response {
    match find_project(&stub, id) {
        Some(project) => data(project),
        None => (StatusCode::NOT_FOUND, Json(json!({"message": "Project not found."}))).into_response(),
    }
}

async fn update_project(
    State(stub): State<Arc<Stub>>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    stub.patches.lock().push(body);
    match find_project(&stub, id) {
        Some(project) => data(project),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn delete_project(State(stub): State<Arc<Stub>>, Path(id): Path<i64>) -> Response {
    stub.projects.lock().retain(|p| p["id"] != id);
    StatusCode::NO_CONTENT.into_response()
}

async fn project_assets(State(stub): State<Arc<Stub>>, Path(id): Path<i64>) -> Response {
    if stub.fail_asset_listing.load(Ordering::SeqCst) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    let assets: Vec<Value> = stub
        .assets
        .lock()
        .iter()
        .filter(|a| a["project_id"] == id)
        .cloned()
        .collect();
    data(Value::Array(assets))
}

async fn upload_asset(
    State(stub): State<Arc<Stub>>,
    Path(project_id): Path<i64>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    if !authorized(&headers) {
        return unauthenticated();
    }
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let Ok(bytes) = field.bytes().await else {
            return StatusCode::BAD_REQUEST.into_response();
        };
        stub.uploads.lock().push((filename.clone(), bytes.len()));
        if filename.starts_with("fail") {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({"message": "Upload failed.", "errors": {"file": ["The file failed to upload."]}})),
            )
                .into_response();
        }
        let id = stub.next_id();
        stub.assets
            .lock()
            .push(asset_json(id, project_id, &filename, bytes.len()));
        return (StatusCode::CREATED, Json(json!({"data": {"id": id}}))).into_response();
    }
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({"errors": {"file": ["The file field is required."]}})),
    )
        .into_response()
}

async fn delete_asset(State(stub): State<Arc<Stub>>, Path(id): Path<i64>) -> Response {
    stub.assets.lock().retain(|a| a["id"] != id);
    StatusCode::NO_CONTENT.into_response()
}

async fn user_assets(State(stub): State<Arc<Stub>>) -> Response {
    let projects = stub.projects.lock().clone();
    let assets: Vec<Value> = stub
        .assets
        .lock()
        .iter()
        .map(|a| {
            let mut a = a.clone();
            if let Some(project) = projects.iter().find(|p| p["id"] == a["project_id"]) {
                a["project"] = project.clone();
            }
            a
        })
        .collect();
    data(Value::Array(assets))
}

async fn search_users(Query(params): Query<HashMap<String, String>>) -> Response {
    let email = params.get("email").cloned().unwrap_or_default();
    let users = if "ada@example.com".contains(email.as_str()) {
        vec![user_json()]
    } else {
        Vec::new()
    };
    data(Value::Array(users))
}

async fn user_stats(State(stub): State<Arc<Stub>>) -> Response {
    if stub.fail_stats.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "<html>Server Error</html>").into_response();
    }
    Json(json!({"projects_count": 2, "assets_count": 5, "member_projects_count": 1})).into_response()
}

/// Binds `127.0.0.1:0` and returns the origin to hand to the client.
pub async fn spawn() -> (String, Arc<Stub>) {
    let stub = Arc::new(Stub::default());

    let api = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/logout", post(logout))
        .route("/me", get(me))
        .route("/projects", get(list_projects).post(create_project))
        .route(
            "/projects/:id",
            get(show_project).patch(update_project).delete(delete_project),
        )
        .route("/projects/:id/assets", get(project_assets).post(upload_asset))
        .route("/assets/:id", delete(delete_asset))
        .route("/users", get(search_users))
        .route("/users/assets", get(user_assets))
        .route("/users/stats", get(user_stats));

    let app = Router::new()
        .nest("/api/v1", api)
        .layer(middleware::from_fn_with_state(stub.clone(), record))
        .with_state(stub.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), stub)
}
