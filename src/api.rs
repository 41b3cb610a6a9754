use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        DefaultBodyLimit, Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::consts::{DEFAULT_RECENT_COUNT, MAX_BODY_BYTES};
use crate::extract::FieldExtractor;
use crate::model::{EntryPatch, VocabularyEntry};
use crate::store::{AppendOutcome, StoreError, VocabularyStore};

/// Literal segment of the search route, which is also a loggable word
const SEARCH_SEGMENT: &str = "search";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<VocabularyStore>,
    pub extractor: Arc<FieldExtractor>,
}

impl AppState {
    pub fn new(store: VocabularyStore, extractor: FieldExtractor) -> Self {
        Self {
            store: Arc::new(store),
            extractor: Arc::new(extractor),
        }
    }
}

#[derive(Deserialize)]
struct SaveRequest {
    text: Option<String>,
}

#[derive(Deserialize)]
struct RecentParams {
    count: Option<String>,
}

#[derive(Deserialize)]
struct SearchParams {
    q: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveResponse {
    success: bool,
    data: VocabularyEntry,
    recent_vocabulary: Vec<VocabularyEntry>,
}

#[derive(Serialize)]
struct EntriesResponse {
    success: bool,
    data: Vec<VocabularyEntry>,
}

#[derive(Serialize)]
struct AllResponse {
    success: bool,
    data: Vec<VocabularyEntry>,
    total: usize,
}

#[derive(Serialize)]
struct SearchResponse {
    success: bool,
    data: Vec<VocabularyEntry>,
    count: usize,
}

#[derive(Serialize)]
struct EntryResponse {
    success: bool,
    data: VocabularyEntry,
}

#[derive(Serialize)]
struct DeleteResponse {
    success: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_duplicate: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    existing_word: Option<VocabularyEntry>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            success: false,
            error: message.into(),
            is_duplicate: None,
            existing_word: None,
        }),
    )
}

fn duplicate_response(existing: VocabularyEntry) -> ApiError {
    (
        StatusCode::CONFLICT,
        Json(ErrorResponse {
            success: false,
            error: "This word already exists.".to_string(),
            is_duplicate: Some(true),
            existing_word: Some(existing),
        }),
    )
}

fn store_error(e: StoreError) -> ApiError {
    match e {
        StoreError::NotFound(word) => {
            tracing::warn!(%word, "word not found");
            error_response(StatusCode::NOT_FOUND, "Word not found.")
        }
        StoreError::EmptyQuery => error_response(StatusCode::BAD_REQUEST, e.to_string()),
        StoreError::Unsupported(_) => error_response(StatusCode::METHOD_NOT_ALLOWED, e.to_string()),
        StoreError::WordTaken(existing) => duplicate_response(*existing),
        other => {
            tracing::error!("store operation failed: {}", other);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    }
}

fn bad_body(rejection: JsonRejection) -> ApiError {
    error_response(StatusCode::BAD_REQUEST, rejection.body_text())
}

fn bad_query(rejection: QueryRejection) -> ApiError {
    error_response(StatusCode::BAD_REQUEST, rejection.body_text())
}

/// Run a store operation on the blocking pool. The store does synchronous file I/O.
async fn with_store<T, F>(state: &AppState, op: F) -> Result<T, ApiError>
where
    F: FnOnce(&VocabularyStore) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(&state.store);
    tokio::task::spawn_blocking(move || op(&store))
        .await
        .map_err(|e| {
            tracing::error!("store task failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?
        .map_err(store_error)
}

pub fn create_router(state: AppState, static_dir: Option<&std::path::Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/api/health", get(health_check))
        .route("/api/save-vocabulary", post(save_vocabulary))
        .route("/api/recent-vocabulary", get(recent_vocabulary))
        .route("/api/all-vocabulary", get(all_vocabulary))
        .route(
            "/api/vocabulary/search",
            get(search_vocabulary)
                .put(update_search_word)
                .delete(delete_search_word),
        )
        .route(
            "/api/vocabulary/{word}",
            put(update_vocabulary).delete(delete_vocabulary),
        )
        .with_state(state);

    if let Some(dir) = static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// GET /api/health - Health check endpoint
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "success": true,
        "status": "OK",
        "message": "Server is running.",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// POST /api/save-vocabulary - Extract fields from `text` and append them
async fn save_vocabulary(
    State(state): State<AppState>,
    payload: Result<Json<SaveRequest>, JsonRejection>,
) -> ApiResult<SaveResponse> {
    let Json(request) = payload.map_err(bad_body)?;
    let text = request.text.unwrap_or_default();
    if text.is_empty() {
        return Err(error_response(StatusCode::BAD_REQUEST, "Text is empty."));
    }

    let entry = state.extractor.extract(&text).map_err(|e| {
        tracing::error!("failed to save vocabulary: {}", e);
        error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    let (outcome, recent_vocabulary) = with_store(&state, move |store| {
        store.append_with_recent(entry, DEFAULT_RECENT_COUNT)
    })
    .await?;

    match outcome {
        AppendOutcome::Inserted(data) => Ok(Json(SaveResponse {
            success: true,
            data,
            recent_vocabulary,
        })),
        AppendOutcome::Duplicate(existing) => Err(duplicate_response(existing)),
    }
}

/// GET /api/recent-vocabulary?count=N - Newest entries first
async fn recent_vocabulary(
    State(state): State<AppState>,
    params: Result<Query<RecentParams>, QueryRejection>,
) -> ApiResult<EntriesResponse> {
    let Query(params) = params.map_err(bad_query)?;
    let count = params
        .count
        .and_then(|c| c.trim().parse::<usize>().ok())
        .filter(|c| *c > 0)
        .unwrap_or(DEFAULT_RECENT_COUNT);

    let data = with_store(&state, move |store| store.list_recent(count)).await?;
    Ok(Json(EntriesResponse {
        success: true,
        data,
    }))
}

/// GET /api/all-vocabulary - Every entry in table order
async fn all_vocabulary(State(state): State<AppState>) -> ApiResult<AllResponse> {
    let data = with_store(&state, |store| store.list_all()).await?;
    Ok(Json(AllResponse {
        success: true,
        total: data.len(),
        data,
    }))
}

/// GET /api/vocabulary/search?q= - Substring match on word or meaning
async fn search_vocabulary(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> ApiResult<SearchResponse> {
    let Query(params) = params.map_err(bad_query)?;
    let query = match params.q {
        Some(q) if !q.is_empty() => q,
        _ => {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                "Please enter a search term.",
            ))
        }
    };

    let results = with_store(&state, move |store| store.search(&query)).await?;
    Ok(Json(SearchResponse {
        success: true,
        data: results.entries,
        count: results.count,
    }))
}

/// PUT /api/vocabulary/:word - Partial update of one entry
async fn update_vocabulary(
    State(state): State<AppState>,
    Path(word): Path<String>,
    payload: Result<Json<EntryPatch>, JsonRejection>,
) -> ApiResult<EntryResponse> {
    update_word(state, word, payload).await
}

/// PUT /api/vocabulary/search - The word "search" shares its path with the search route
async fn update_search_word(
    State(state): State<AppState>,
    payload: Result<Json<EntryPatch>, JsonRejection>,
) -> ApiResult<EntryResponse> {
    update_word(state, SEARCH_SEGMENT.to_string(), payload).await
}

async fn update_word(
    state: AppState,
    word: String,
    payload: Result<Json<EntryPatch>, JsonRejection>,
) -> ApiResult<EntryResponse> {
    let Json(patch) = payload.map_err(bad_body)?;

    let data = with_store(&state, move |store| store.update(&word, &patch)).await?;
    Ok(Json(EntryResponse {
        success: true,
        data,
    }))
}

/// DELETE /api/vocabulary/:word - Remove one entry
async fn delete_vocabulary(
    State(state): State<AppState>,
    Path(word): Path<String>,
) -> ApiResult<DeleteResponse> {
    delete_word(state, word).await
}

/// DELETE /api/vocabulary/search
async fn delete_search_word(State(state): State<AppState>) -> ApiResult<DeleteResponse> {
    delete_word(state, SEARCH_SEGMENT.to_string()).await
}

async fn delete_word(state: AppState, word: String) -> ApiResult<DeleteResponse> {
    with_store(&state, move |store| store.delete(&word)).await?;
    Ok(Json(DeleteResponse { success: true }))
}

/// Serve the router until Ctrl+C
pub async fn serve(listener: tokio::net::TcpListener, app: Router) -> anyhow::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl+c: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use serde_json::{json, Value};
    use tempfile::{tempdir, TempDir};
    use tower::ServiceExt;

    use crate::schema::Schema;

    fn card(word: &str, meaning: &str) -> String {
        format!(
            "WORD: {word}\nMEANING: {meaning}\nMETHOD: picture it\nvividly\nEXAMPLE: I saw a {word}.\nTRANSLATION: 나는 {word}를 보았다."
        )
    }

    fn test_app(schema: Schema) -> (TempDir, Router) {
        let dir = tempdir().unwrap();
        let store = VocabularyStore::open_workbook(dir.path().join("vocabulary.xlsx"), schema).unwrap();
        let extractor = FieldExtractor::for_schema(schema).unwrap();
        let app = create_router(AppState::new(store, extractor), None);
        (dir, app)
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                request = request.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn save(app: &Router, word: &str, meaning: &str) -> (StatusCode, Value) {
        send(
            app,
            Method::POST,
            "/api/save-vocabulary",
            Some(json!({ "text": card(word, meaning) })),
        )
        .await
    }

    fn words(body: &Value) -> Vec<String> {
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["word"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_health() {
        let (_dir, app) = test_app(Schema::Extended);
        let (status, body) = send(&app, Method::GET, "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "OK");
    }

    #[tokio::test]
    async fn test_save_requires_text() {
        let (_dir, app) = test_app(Schema::Extended);

        let (status, body) = send(&app, Method::POST, "/api/save-vocabulary", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/save-vocabulary",
            Some(json!({ "text": "" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_save_rejects_malformed_json() {
        let (_dir, app) = test_app(Schema::Extended);
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/save-vocabulary")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_save_returns_entry_and_recent() {
        let (_dir, app) = test_app(Schema::Extended);
        save(&app, "first", "one").await;

        let (status, body) = save(&app, "second", "two").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["word"], "second");
        assert_eq!(body["data"]["method"], "picture it\nvividly");
        assert_eq!(body["data"]["date"], crate::store::today());
        assert_eq!(body["data"]["confusingWordsExcel"], "");

        let recent: Vec<&str> = body["recentVocabulary"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["word"].as_str().unwrap())
            .collect();
        assert_eq!(recent, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn test_save_duplicate_conflicts() {
        let (_dir, app) = test_app(Schema::Extended);
        save(&app, "Apple", "a fruit").await;

        let (status, body) = save(&app, "apple", "something else").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["isDuplicate"], true);
        assert_eq!(body["existingWord"]["word"], "Apple");
        assert_eq!(body["existingWord"]["meaning"], "a fruit");

        let (_, all) = send(&app, Method::GET, "/api/all-vocabulary", None).await;
        assert_eq!(all["total"], 1);
    }

    #[tokio::test]
    async fn test_save_reports_missing_fields() {
        let (_dir, app) = test_app(Schema::Extended);
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/save-vocabulary",
            Some(json!({ "text": "WORD: lonely\nEXAMPLE: so lonely" })),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let error = body["error"].as_str().unwrap();
        assert!(error.contains("MEANING, METHOD, TRANSLATION"));
    }

    #[tokio::test]
    async fn test_recent_count_handling() {
        let (_dir, app) = test_app(Schema::Extended);
        for word in ["a", "b", "c", "d", "e"] {
            save(&app, word, "m").await;
        }

        let (_, body) = send(&app, Method::GET, "/api/recent-vocabulary", None).await;
        assert_eq!(words(&body), vec!["e", "d", "c"]);

        let (_, body) = send(&app, Method::GET, "/api/recent-vocabulary?count=2", None).await;
        assert_eq!(words(&body), vec!["e", "d"]);

        let (_, body) = send(&app, Method::GET, "/api/recent-vocabulary?count=50", None).await;
        assert_eq!(words(&body).len(), 5);

        let (_, body) = send(&app, Method::GET, "/api/recent-vocabulary?count=abc", None).await;
        assert_eq!(words(&body).len(), 3);
    }

    #[tokio::test]
    async fn test_all_vocabulary_in_table_order() {
        let (_dir, app) = test_app(Schema::Extended);
        let (_, empty) = send(&app, Method::GET, "/api/all-vocabulary", None).await;
        assert_eq!(empty["total"], 0);

        save(&app, "x", "m").await;
        save(&app, "y", "m").await;
        let (status, body) = send(&app, Method::GET, "/api/all-vocabulary", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        assert_eq!(words(&body), vec!["x", "y"]);
    }

    #[tokio::test]
    async fn test_search() {
        let (_dir, app) = test_app(Schema::Extended);
        save(&app, "Category", "a group").await;
        save(&app, "feline", "like a cat").await;
        save(&app, "dog", "a canine").await;

        let (status, _) = send(&app, Method::GET, "/api/vocabulary/search", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, Method::GET, "/api/vocabulary/search?q=CAT", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
        assert_eq!(words(&body), vec!["Category", "feline"]);
    }

    #[tokio::test]
    async fn test_update_decodes_word_and_patches() {
        let (_dir, app) = test_app(Schema::Extended);
        save(&app, "ice cream", "frozen dessert").await;

        let (status, body) = send(
            &app,
            Method::PUT,
            "/api/vocabulary/ICE%20CREAM",
            Some(json!({ "meaning": "a cold treat", "example": "" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["word"], "ice cream");
        assert_eq!(body["data"]["meaning"], "a cold treat");
        assert_eq!(body["data"]["example"], "I saw a ice cream.");

        let (status, body) = send(
            &app,
            Method::PUT,
            "/api/vocabulary/missing",
            Some(json!({ "meaning": "x" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_delete() {
        let (_dir, app) = test_app(Schema::Extended);
        save(&app, "keep", "m").await;
        save(&app, "drop me", "m").await;

        let (status, body) = send(&app, Method::DELETE, "/api/vocabulary/Drop%20Me", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let (status, _) = send(&app, Method::DELETE, "/api/vocabulary/drop%20me", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, all) = send(&app, Method::GET, "/api/all-vocabulary", None).await;
        assert_eq!(words(&all), vec!["keep"]);
    }

    #[tokio::test]
    async fn test_word_search_can_be_edited_and_deleted() {
        let (_dir, app) = test_app(Schema::Extended);
        let (status, _) = save(&app, "search", "to look for").await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            &app,
            Method::PUT,
            "/api/vocabulary/search",
            Some(json!({ "meaning": "to look carefully" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["word"], "search");
        assert_eq!(body["data"]["meaning"], "to look carefully");

        let (status, body) = send(&app, Method::DELETE, "/api/vocabulary/search", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let (_, all) = send(&app, Method::GET, "/api/all-vocabulary", None).await;
        assert_eq!(all["total"], 0);

        let (status, body) = send(&app, Method::DELETE, "/api/vocabulary/search", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_malformed_query_gets_json_error() {
        let (_dir, app) = test_app(Schema::Extended);
        save(&app, "alpha", "m").await;

        let (status, body) = send(&app, Method::GET, "/api/vocabulary/search?q=a&q=b", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());

        let (status, body) =
            send(&app, Method::GET, "/api/recent-vocabulary?count=1&count=2", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_basic_schema_behaviour() {
        let (_dir, app) = test_app(Schema::Basic);
        save(&app, "echo", "m").await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/save-vocabulary",
            Some(json!({ "text": card("echo", "a **reflected** sound") })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["data"]["meaning"],
            r#"a <span class="highlight">reflected</span> sound"#
        );
        assert!(body["data"].get("confusingWordsExcel").is_none());

        let (status, _) = send(
            &app,
            Method::PUT,
            "/api/vocabulary/echo",
            Some(json!({ "meaning": "x" })),
        )
        .await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

        let (_, all) = send(&app, Method::GET, "/api/all-vocabulary", None).await;
        assert_eq!(all["total"], 2);
    }

    #[tokio::test]
    async fn test_static_files_served_at_root() {
        let dir = tempdir().unwrap();
        let public = dir.path().join("public");
        std::fs::create_dir_all(&public).unwrap();
        std::fs::write(public.join("index.html"), "<h1>vocabulary</h1>").unwrap();

        let store =
            VocabularyStore::open_workbook(dir.path().join("vocabulary.xlsx"), Schema::Basic).unwrap();
        let extractor = FieldExtractor::for_schema(Schema::Basic).unwrap();
        let app = create_router(AppState::new(store, extractor), Some(public.as_path()));

        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"<h1>vocabulary</h1>");

        let (status, _) = send(&app, Method::GET, "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
    }
}
