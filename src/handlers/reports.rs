//! Report filing, the representative staff-gated resource. Staff see their
//! own reports; admins see everyone's.

use axum::{extract::State, Extension, Json};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::middleware::CurrentUser;
use crate::store::{Report, Role};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct NewReport {
    pub title: String,
    #[serde(default)]
    pub body: String,
}

/// GET /api/reports
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Vec<Report>> {
    let author = match user.role {
        Role::Admin => None,
        Role::User => Some(user.id),
    };
    let reports = state.reports.list(author).await?;
    Ok(ApiResponse::success(reports))
}

/// POST /api/reports
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<NewReport>,
) -> ApiResult<Report> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::bad_request("Report title must not be empty"));
    }

    let report = state
        .reports
        .create(Report {
            id: Uuid::new_v4(),
            author_id: user.id,
            title: payload.title,
            body: payload.body,
            created_at: Utc::now(),
        })
        .await?;

    tracing::info!("report '{}' filed by '{}'", report.title, user.username);
    Ok(ApiResponse::created(report))
}
