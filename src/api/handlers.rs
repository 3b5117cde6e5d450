use axum::{Json, extract::State, extract::rejection::JsonRejection};
use nanoid::nanoid;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, info, info_span};

use super::AppState;
use super::error::ApiError;
use super::models::{AskResponse, Question};

/// POST /perguntar
///
/// ```bash
/// curl -X POST http://127.0.0.1:5000/perguntar \
///   -H 'content-type: application/json' \
///   -d '{"pergunta":"Como solicito acesso à VPN?"}'
/// ```
pub async fn ask_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<AskResponse>, ApiError> {
    let request_id = nanoid!(10);
    let span = info_span!("perguntar", %request_id);

    async move {
        let start = Instant::now();
        let Json(payload) = payload?;
        let question = Question::from_payload(&payload)?;

        let context = state.retriever.retrieve(question.as_str()).await?;
        let resposta = state
            .generator
            .generate(question.as_str(), &context)
            .await?;

        info!(
            context_len = context.len(),
            processing_time_ms = start.elapsed().as_millis(),
            "question answered"
        );
        Ok(Json(AskResponse { resposta }))
    }
    .instrument(span)
    .await
}

pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
