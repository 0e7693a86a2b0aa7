//! # API Route Handlers
//!
//! `GET /chat-query/{query}` runs the text-to-SQL path and `GET /rag-query/{query}`
//! the retrieval path. Both answer `{"answer": "..."}`; with `?debug=true` the
//! intermediate results are added under `debug`.

use super::{
    errors::AppError,
    state::AppState,
    types::{AnswerResponse, ApiResponse, DebugParams, MessageResponse, RagQueryParams},
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use tracing::info;

/// Wraps a successful result in the standard `ApiResponse`, keeping the debug
/// information only when it was asked for.
pub(crate) fn wrap_response<T>(
    result: T,
    debug_requested: bool,
    debug_info: Option<Value>,
) -> Json<ApiResponse<T>> {
    let debug = if debug_requested { debug_info } else { None };
    Json(ApiResponse { debug, result })
}

/// The handler for the root (`/`) endpoint.
pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "ARGO RAG server is running.".to_string(),
    })
}

/// The handler for the health check (`/health`) endpoint.
pub async fn health_check() -> &'static str {
    "OK"
}

pub async fn chat_query_handler(
    State(app_state): State<AppState>,
    Path(query): Path<String>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<AnswerResponse>>, AppError> {
    info!("Received chat query: '{query}'");
    let result = app_state.prompt_client.answer(&query).await?;

    let debug_info = json!({
        "generated_sql": result.generated_sql,
        "database_result": result.database_result,
    });
    Ok(wrap_response(
        AnswerResponse {
            answer: result.text,
        },
        debug_params.debug.unwrap_or(false),
        Some(debug_info),
    ))
}

pub async fn rag_query_handler(
    State(app_state): State<AppState>,
    Path(query): Path<String>,
    Query(params): Query<RagQueryParams>,
) -> Result<Json<ApiResponse<AnswerResponse>>, AppError> {
    let top_k = params
        .top_k
        .filter(|k| *k > 0)
        .unwrap_or(app_state.config.top_k);
    info!("Received RAG query (top_k = {top_k}): '{query}'");

    let answer = app_state.rag_engine.answer(&query, top_k).await?;

    let debug_info = json!({
        "top_k": top_k,
        "sources": answer.sources(),
    });
    Ok(wrap_response(
        AnswerResponse {
            answer: answer.text(),
        },
        params.debug.unwrap_or(false),
        Some(debug_info),
    ))
}
