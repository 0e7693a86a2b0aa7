use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize, Default)]
pub struct DebugParams {
    pub debug: Option<bool>,
}

/// Query parameters of `/rag-query/{query}`.
#[derive(Debug, Deserialize, Default)]
pub struct RagQueryParams {
    pub top_k: Option<usize>,
    pub debug: Option<bool>,
}

/// The response body. The result's fields sit at the top level so that clients
/// read `answer` directly; `debug` is added beside them on request.
#[derive(Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<Value>,
    #[serde(flatten)]
    pub result: T,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub answer: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
