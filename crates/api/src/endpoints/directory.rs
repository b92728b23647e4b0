//! Directory listing endpoints.

use axum::{Json, Router, extract::Query, extract::State, routing::get};
use fedidex_common::AppResult;
use fedidex_core::{ExportedInstance, LegacyListResponse, ListCriteria, ListResponse};
use serde::Deserialize;

use crate::middleware::AppState;

/// Raw discovery query parameters. List-valued criteria arrive
/// comma-separated; numeric bounds that fail to parse are dropped.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub languages: Option<String>,
    pub prohibited: Option<String>,
    pub allowed: Option<String>,
    pub min_users: Option<String>,
    pub max_users: Option<String>,
    pub search: Option<String>,
    pub strict: Option<String>,
}

impl ListQuery {
    fn into_criteria(self) -> ListCriteria {
        ListCriteria {
            languages: split_csv(self.languages.as_deref()),
            prohibited: split_csv(self.prohibited.as_deref()),
            allowed: split_csv(self.allowed.as_deref()),
            min_users: self.min_users.as_deref().and_then(|s| s.parse().ok()),
            max_users: self.max_users.as_deref().and_then(|s| s.parse().ok()),
            search: self.search.filter(|s| !s.is_empty()),
            strict: self.strict.as_deref() == Some("true"),
        }
    }
}

fn split_csv(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(ToString::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Run a discovery query.
async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ListResponse>> {
    let criteria = query.into_criteria();
    let response = state.directory_service.list(&criteria).await?;
    Ok(Json(response))
}

/// The legacy uptime-weighted ranking.
async fn legacy_list(State(state): State<AppState>) -> AppResult<Json<LegacyListResponse>> {
    let response = state.directory_service.legacy_list().await?;
    Ok(Json(response))
}

/// The machine-readable export feed.
async fn export(State(state): State<AppState>) -> AppResult<Json<Vec<ExportedInstance>>> {
    let instances = state.directory_service.export().await?;
    Ok(Json(instances))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/list.json", get(list))
        .route("/list/old.json", get(legacy_list))
        .route("/instances.json", get(export))
}
