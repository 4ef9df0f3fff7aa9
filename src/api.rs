use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::conversion::{ConversionError, Converter, FormatKind, UnknownFormat};
use crate::report::ReportMetadata;
use crate::session::{ReportSession, SessionId, SessionStore};
use crate::source::{load_workbook_bytes, SourceError};

#[derive(Clone)]
pub struct AppState {
    pub converter: Converter,
    pub sessions: SessionStore,
    pub items_per_page: usize,
    pub max_upload_bytes: usize,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Query parameters of an upload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversionParams {
    /// Reading mode; absent or "auto" detects the layout
    pub mode: Option<String>,
    /// Original file name, used for the reader choice and echoed back
    pub filename: Option<String>,
}

impl ConversionParams {
    pub fn format(&self) -> Result<Option<FormatKind>, UnknownFormat> {
        match self.mode.as_deref().map(str::trim) {
            None | Some("") | Some("auto") => Ok(None),
            Some(mode) => mode.parse().map(Some),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Mode(#[from] UnknownFormat),

    #[error("Session {0} not found")]
    SessionNotFound(SessionId),

    #[error("Conversion task failed: {0}")]
    Task(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Source(SourceError::Io(_)) | ApiError::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Source(_) | ApiError::Conversion(_) | ApiError::Mode(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{}", self);
        } else {
            warn!("{}", self);
        }
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn create_router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;
    let api_routes = Router::new()
        .route("/health", get(health))
        .route("/conversions", post(create_conversion))
        .route("/conversions/{id}", get(get_conversion))
        .route("/conversions/{id}/table", get(get_conversion_table))
        .route("/conversions/{id}/report", get(get_conversion_report))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state);

    Router::new().nest("/api/v1", api_routes)
}

#[instrument(skip(_state))]
async fn health(State(_state): State<AppState>) -> impl IntoResponse {
    debug!("Health check requested");
    let response = HealthResponse {
        status: "healthy".to_string(),
    };
    (StatusCode::OK, Json(response))
}

#[instrument(skip(state, body), fields(bytes = body.len()))]
async fn create_conversion(
    State(state): State<AppState>,
    Query(params): Query<ConversionParams>,
    body: Bytes,
) -> Result<(StatusCode, Json<ReportSession>), ApiError> {
    let format = params.format()?;
    debug!("Upload received, requested mode: {:?}", format);

    let converter = state.converter.clone();
    let file_name = params.filename.clone();

    // Workbook parsing is synchronous
    let table = tokio::task::spawn_blocking(move || -> Result<_, ApiError> {
        let source = load_workbook_bytes(&body, file_name.as_deref())?;
        let table = match format {
            Some(format) => converter.convert_as(&source, format)?,
            None => converter.convert(&source)?,
        };
        Ok(table)
    })
    .await
    .map_err(|e| ApiError::Task(e.to_string()))??;

    let session = state.sessions.insert(params.filename, table).await;
    info!(
        "Session {} created: {} days from {} ({})",
        session.id,
        session.table.len(),
        session.source_name.as_deref().unwrap_or("upload"),
        session.table.format
    );

    Ok((StatusCode::CREATED, Json(session)))
}

async fn find_session(state: &AppState, id: SessionId) -> Result<ReportSession, ApiError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or(ApiError::SessionNotFound(id))
}

#[instrument(skip(state))]
async fn get_conversion(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<Json<ReportSession>, ApiError> {
    let session = find_session(&state, id).await?;
    debug!("Returning session {} ({} days)", id, session.table.len());
    Ok(Json(session))
}

#[instrument(skip(state))]
async fn get_conversion_table(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<Html<String>, ApiError> {
    let session = find_session(&state, id).await?;
    Ok(Html(session.table.to_html()))
}

#[instrument(skip(state))]
async fn get_conversion_report(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
    Query(metadata): Query<ReportMetadata>,
) -> Result<Html<String>, ApiError> {
    let session = find_session(&state, id).await?;
    let report = session.table.printable(&metadata, state.items_per_page);
    info!(
        "Rendering report for session {}: {} pages",
        id,
        report.total_pages()
    );
    Ok(Html(report.to_html()))
}
