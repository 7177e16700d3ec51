//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::middleware::AuthUser;
use crate::web::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use eduverse_core::domain::{CareerRequest, ChatRequest, DailyHistory, JobsRequest};
use eduverse_core::gateway::GatewayError;
use eduverse_core::prompt::format_date_hindi;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        chat_handler,
        career_guidance_handler,
        government_jobs_handler,
        todays_history_handler,
        recent_histories_handler,
        history_status_handler,
        regenerate_history_handler,
    ),
    components(
        schemas(
            ChatPayload,
            CareerGuidancePayload,
            GovernmentJobsPayload,
            TodayHistoryResponse,
            RecentHistoriesResponse,
            HistoryEntry,
            HistoryStatusResponse,
            ErrorBody,
        )
    ),
    tags(
        (name = "EduVerse API", description = "AI-backed chat, career guidance, job search, and daily history.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Request Payloads
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatPayload {
    pub message: String,
    pub language: Option<String>,
    /// Target language code to translate the reply into.
    pub translate_to: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CareerGuidancePayload {
    pub qualification: String,
    pub language: Option<String>,
    pub interests: Option<String>,
    pub preferred_field: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GovernmentJobsPayload {
    pub qualification: String,
    pub field_of_study: String,
    pub age: i32,
    pub location: String,
    pub job_type: String,
}

//=========================================================================================
// API Response Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TodayHistoryResponse {
    status: String,
    date: String,
    content: String,
    view_count: i64,
    is_new: bool,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    id: i64,
    date: String,
    content: String,
    view_count: i64,
    created_at: String,
}

#[derive(Serialize, ToSchema)]
pub struct RecentHistoriesResponse {
    status: String,
    histories: Vec<HistoryEntry>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStatusResponse {
    status: String,
    todays_history_exists: bool,
    date: String,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    status: String,
    message: String,
}

impl ErrorBody {
    fn new(message: &str) -> Json<Self> {
        Json(Self {
            status: "error".to_string(),
            message: message.to_string(),
        })
    }
}

fn history_entry(history: DailyHistory) -> HistoryEntry {
    HistoryEntry {
        id: history.id,
        date: format_date_hindi(history.history_date),
        content: history.content,
        view_count: history.view_count,
        created_at: history.created_at.format("%d %b %Y, %H:%M").to_string(),
    }
}

/// Maps gateway rejections onto the status codes and messages the product
/// has always used.
fn map_gateway_error(e: GatewayError) -> (StatusCode, String) {
    match e {
        GatewayError::Unauthenticated => (
            StatusCode::UNAUTHORIZED,
            "Please login to continue".to_string(),
        ),
        GatewayError::QuotaExhausted => (
            StatusCode::TOO_MANY_REQUESTS,
            "Your daily usage limit is exhausted. Please try again tomorrow.".to_string(),
        ),
        GatewayError::Storage(e) => {
            error!("Storage failure serving gateway request: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong. Please try again.".to_string(),
            )
        }
    }
}

//=========================================================================================
// Gateway Handlers (chat, career, jobs)
//=========================================================================================

/// Ask the AI a free-form question.
#[utoipa::path(
    post,
    path = "/api/chat",
    request_body = ChatPayload,
    responses(
        (status = 200, description = "The model's reply as plain text", body = String),
        (status = 401, description = "Not logged in"),
        (status = 429, description = "Daily usage limit exhausted"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("x-user-id" = i64, Header, description = "The authenticated user's ID.")
    )
)]
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(payload): Json<ChatPayload>,
) -> Result<String, (StatusCode, String)> {
    let request = ChatRequest {
        message: payload.message,
        language: payload.language,
        translate_to: payload.translate_to,
    };
    let reply = state
        .gateway
        .chat(Some(user_id), request)
        .await
        .map_err(map_gateway_error)?;
    Ok(reply.text)
}

/// Personalized career guidance for a qualification.
#[utoipa::path(
    post,
    path = "/api/career/guidance",
    request_body = CareerGuidancePayload,
    responses(
        (status = 200, description = "Career guidance as plain text", body = String),
        (status = 401, description = "Not logged in"),
        (status = 429, description = "Daily usage limit exhausted"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("x-user-id" = i64, Header, description = "The authenticated user's ID.")
    )
)]
pub async fn career_guidance_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(payload): Json<CareerGuidancePayload>,
) -> Result<String, (StatusCode, String)> {
    let request = CareerRequest {
        qualification: payload.qualification,
        language: payload.language,
        interests: payload.interests,
        preferred_field: payload.preferred_field,
    };
    let reply = state
        .gateway
        .career_guidance(Some(user_id), request)
        .await
        .map_err(map_gateway_error)?;
    Ok(reply.text)
}

/// Current government job openings matching a profile.
///
/// The reply is model-emitted JSON passed through verbatim; this service
/// does not validate it.
#[utoipa::path(
    post,
    path = "/api/government-jobs",
    request_body = GovernmentJobsPayload,
    responses(
        (status = 200, description = "Job listings as JSON text", body = String),
        (status = 401, description = "Not logged in"),
        (status = 429, description = "Daily usage limit exhausted"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("x-user-id" = i64, Header, description = "The authenticated user's ID.")
    )
)]
pub async fn government_jobs_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(payload): Json<GovernmentJobsPayload>,
) -> Result<String, (StatusCode, String)> {
    let request = JobsRequest {
        qualification: payload.qualification,
        field_of_study: payload.field_of_study,
        age: payload.age,
        location: payload.location,
        job_type: payload.job_type,
    };
    let reply = state
        .gateway
        .government_jobs(Some(user_id), request)
        .await
        .map_err(map_gateway_error)?;
    Ok(reply.text)
}

//=========================================================================================
// Daily History Handlers
//=========================================================================================

/// Today's historical story, generated once per day and shared by everyone.
#[utoipa::path(
    get,
    path = "/api/daily-history/today",
    responses(
        (status = 200, description = "Today's story", body = TodayHistoryResponse),
        (status = 401, description = "Not logged in"),
        (status = 500, description = "Failed to fetch today's history", body = ErrorBody)
    ),
    params(
        ("x-user-id" = i64, Header, description = "The authenticated user's ID.")
    )
)]
pub async fn todays_history_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorBody>)> {
    let history = state.history.todays_history().await.map_err(|e| {
        error!("Error fetching today's history: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorBody::new("Failed to fetch today's history"),
        )
    })?;

    Ok(Json(TodayHistoryResponse {
        status: "success".to_string(),
        date: format_date_hindi(history.history_date),
        content: history.content,
        is_new: history.view_count == 1,
        view_count: history.view_count,
    }))
}

/// Stories from the last 30 days, newest first.
#[utoipa::path(
    get,
    path = "/api/daily-history/recent",
    responses(
        (status = 200, description = "Recent stories", body = RecentHistoriesResponse),
        (status = 401, description = "Not logged in"),
        (status = 500, description = "Failed to fetch recent histories", body = ErrorBody)
    ),
    params(
        ("x-user-id" = i64, Header, description = "The authenticated user's ID.")
    )
)]
pub async fn recent_histories_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorBody>)> {
    let histories = state.history.recent().await.map_err(|e| {
        error!("Error fetching recent histories: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorBody::new("Failed to fetch recent histories"),
        )
    })?;

    Ok(Json(RecentHistoriesResponse {
        status: "success".to_string(),
        histories: histories.into_iter().map(history_entry).collect(),
    }))
}

/// Whether today's story has been generated yet.
#[utoipa::path(
    get,
    path = "/api/daily-history/status",
    responses(
        (status = 200, description = "Availability of today's story", body = HistoryStatusResponse),
        (status = 401, description = "Not logged in"),
        (status = 500, description = "Failed to check status", body = ErrorBody)
    ),
    params(
        ("x-user-id" = i64, Header, description = "The authenticated user's ID.")
    )
)]
pub async fn history_status_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorBody>)> {
    let exists = state.history.exists_today().await.map_err(|e| {
        error!("Error checking today's history status: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorBody::new("Failed to check status"),
        )
    })?;

    Ok(Json(HistoryStatusResponse {
        status: "success".to_string(),
        todays_history_exists: exists,
        date: format_date_hindi(chrono::Utc::now().date_naive()),
    }))
}

/// Force today's story to be regenerated (administrative).
#[utoipa::path(
    post,
    path = "/api/daily-history/regenerate",
    responses(
        (status = 200, description = "The freshly generated story", body = TodayHistoryResponse),
        (status = 401, description = "Not logged in"),
        (status = 500, description = "Failed to regenerate today's history", body = ErrorBody)
    ),
    params(
        ("x-user-id" = i64, Header, description = "The authenticated user's ID.")
    )
)]
pub async fn regenerate_history_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorBody>)> {
    let history = state.history.regenerate_today().await.map_err(|e| {
        error!("Error regenerating today's history: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorBody::new("Failed to regenerate today's history"),
        )
    })?;

    Ok(Json(TodayHistoryResponse {
        status: "success".to_string(),
        date: format_date_hindi(history.history_date),
        content: history.content,
        is_new: history.view_count == 1,
        view_count: history.view_count,
    }))
}
