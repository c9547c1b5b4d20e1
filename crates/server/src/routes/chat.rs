//! Trip planner relay and the chat server's health check.
use explore_domain::{ChatCompletion, ChatRequest, Transcript};
use salvo::prelude::*;
use serde::Deserialize;
use serde_json::{Value, json};

use super::read_json;
use crate::error::{AppError, AppResult};
use crate::state::StateDepotExt;

/// `POST /api/chat`: one user message in, the provider's completion out, unchanged.
#[handler]
pub(crate) async fn chat(req: &mut Request, depot: &mut Depot) -> AppResult<Json<Value>> {
    let request: ChatRequest = read_json(req).await?;
    request.validate()?;
    let state = depot.chat_state()?.clone();
    let mut transcript = Transcript::new();
    transcript.push_user(request.message);
    let completion = state
        .completion
        .complete(transcript.messages())
        .await
        .map_err(|e| AppError::Completion(e.to_string()))?;
    if let Ok(parsed) = ChatCompletion::deserialize(&completion) {
        tracing::info!(
            reply_chars = parsed.first_reply().map_or(0, |reply| reply.chars().count()),
            "completion relayed"
        );
    }
    Ok(Json(completion))
}

#[handler]
pub(crate) async fn homepage() -> Json<Value> {
    Json(json!({"test": "successful"}))
}
