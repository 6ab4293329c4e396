//! HTTP surface of the habit store.
//!
//! Thin layer: requests are decoded, validated by the core, and answered
//! with the store's records verbatim. Streaks are derived server-side only.

use axum::{
    extract::{DefaultBodyLimit, FromRequest, Multipart, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use keepgoing_core::models::{CreateHabitInput, Habit, UpdateHabitInput};
use keepgoing_core::{Database, Error};

/// Uploaded snapshots are whole database files, so allow more than the
/// default body size.
const MAX_IMPORT_BYTES: usize = 64 * 1024 * 1024;

pub fn create_router(db: Database) -> Router {
    Router::new()
        .route("/habits", get(list_habits).post(create_habit))
        .route("/habits/update", put(update_habit))
        .route("/habits/delete", delete(delete_habit))
        .route("/habits/export", get(export_snapshot))
        .route("/habits/import", post(import_snapshot))
        .layer(DefaultBodyLimit::max(MAX_IMPORT_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(db)
}

/// Error envelope: `{"error": message}` with a status per the core taxonomy.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::Validation(_) | Error::BadSnapshot(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %err, "store failure");
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// `Json` that reports malformed bodies in the same `{"error": ...}` envelope
/// the validation layer uses.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        Ok(Self(value))
    }
}

async fn list_habits(State(db): State<Database>) -> Result<Json<Vec<Habit>>, ApiError> {
    Ok(Json(db.all_habits()?))
}

async fn create_habit(
    State(db): State<Database>,
    ApiJson(input): ApiJson<CreateHabitInput>,
) -> Result<Json<Habit>, ApiError> {
    Ok(Json(db.create_habit(&input)?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateHabitRequest {
    id: i64,
    days_checked: Vec<bool>,
    name: Option<String>,
}

async fn update_habit(
    State(db): State<Database>,
    ApiJson(req): ApiJson<UpdateHabitRequest>,
) -> Result<Json<Habit>, ApiError> {
    let input = UpdateHabitInput {
        days_checked: req.days_checked,
        name: req.name,
    };
    Ok(Json(db.update_habit(req.id, &input)?))
}

#[derive(Debug, Deserialize)]
struct DeleteHabitRequest {
    id: i64,
}

async fn delete_habit(
    State(db): State<Database>,
    ApiJson(req): ApiJson<DeleteHabitRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    db.delete_habit(req.id)?;
    Ok(Json(json!({ "success": true })))
}

async fn export_snapshot(State(db): State<Database>) -> Result<Response, ApiError> {
    let bytes = db.export_snapshot()?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"habits.sqlite\"",
            ),
        ],
        bytes,
    )
        .into_response())
}

async fn import_snapshot(State(db): State<Database>, multipart: Multipart) -> Response {
    match read_snapshot_upload(&db, multipart).await {
        Ok(()) => Json(json!({ "success": true })).into_response(),
        Err(err) => (
            err.status,
            Json(json!({ "success": false, "error": err.message })),
        )
            .into_response(),
    }
}

async fn read_snapshot_upload(db: &Database, mut multipart: Multipart) -> Result<(), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::bad_request(err.to_string()))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|err| ApiError::bad_request(err.to_string()))?;
            db.import_snapshot(&bytes)?;
            return Ok(());
        }
    }
    Err(ApiError::bad_request("No file uploaded"))
}
