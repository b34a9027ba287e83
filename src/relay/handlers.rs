use std::sync::Arc;

use axum::{
    Json,
    extract::{
        State,
        rejection::{JsonDataError, JsonRejection},
    },
    response::{IntoResponse, Response},
};

use super::{
    AppState,
    dto::{ChatReply, ChatRequest, HealthStatus, assemble_messages},
    openai::OpenAIRequest,
};
use crate::{service, service::CoercibleResult};

pub async fn health_check() -> Json<HealthStatus> {
    Json(HealthStatus { ok: true })
}

pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    // Unreadable or oversized bodies never reach the relay. A body that isn't
    // declared as JSON is read as an empty request, and a well-formed body of
    // the wrong shape is a relay failure reported after the key check.
    let request = match payload {
        Ok(Json(request)) => Ok(request),
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(ChatRequest::default()),
        Err(JsonRejection::JsonDataError(error)) => Err(error),
        Err(rejection) => return rejection.into_response(),
    };

    relay_chat(&state, request).await.into_response()
}

async fn relay_chat(
    state: &AppState,
    request: Result<ChatRequest, JsonDataError>,
) -> service::Result<Json<ChatReply>> {
    let api_key = state.api_key.as_deref().ok_or(service::Error::MissingApiKey)?;

    let mut request = request.into_service_result()?;
    let messages = assemble_messages(request.system.take(), request.messages.take());

    let reply = state
        .openai
        .chat_completion(
            api_key,
            &OpenAIRequest {
                model: request.model(),
                temperature: request.temperature(),
                messages: &messages,
            },
        )
        .await?;

    Ok(Json(ChatReply { reply }))
}
