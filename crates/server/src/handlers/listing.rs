//! Bucket and domain listing endpoints.

use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;

/// Listing response body.
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub data: Vec<String>,
    pub message: String,
    pub status: &'static str,
}

impl ListResponse {
    fn found(data: Vec<String>, noun: &str) -> (StatusCode, Json<Self>) {
        let message = if data.is_empty() {
            format!("No {noun} found")
        } else {
            format!("Found {} {noun}", data.len())
        };
        (
            StatusCode::OK,
            Json(Self {
                data,
                message,
                status: "success",
            }),
        )
    }

    fn failed(message: String) -> (StatusCode, Json<Self>) {
        (
            StatusCode::BAD_GATEWAY,
            Json(Self {
                data: Vec::new(),
                message,
                status: "error",
            }),
        )
    }
}

/// GET /buckets - List buckets visible to the object store.
pub async fn list_buckets(State(state): State<AppState>) -> (StatusCode, Json<ListResponse>) {
    let listed = tokio::time::timeout(state.backend_timeout(), state.storage.list_buckets()).await;
    match listed {
        Ok(Ok(buckets)) => ListResponse::found(buckets, "buckets"),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Failed to list buckets");
            ListResponse::failed(format!("failed to list buckets: {e}"))
        }
        Err(_) => {
            tracing::warn!("Timed out listing buckets");
            ListResponse::failed("timed out listing buckets".to_string())
        }
    }
}

/// GET /domains - List every alias domain of every CDN distribution.
pub async fn list_domains(State(state): State<AppState>) -> (StatusCode, Json<ListResponse>) {
    match state.deployer.resolver().list_alias_domains().await {
        Ok(domains) => ListResponse::found(domains, "domains"),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to list CDN domains");
            ListResponse::failed(format!("failed to list domains: {e}"))
        }
    }
}
