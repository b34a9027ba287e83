use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderValue, Method, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};

use super::AppState;
use crate::service;

/// Requests that name a foreign `Origin` are refused outright; requests with
/// no `Origin` at all (health probes, curl) go through.
pub async fn reject_foreign_origin(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(origin) = request.headers().get(header::ORIGIN)
        && !state.allowed_origins.contains(origin)
    {
        tracing::warn!(
            "Rejected {} {} from origin {:?}",
            request.method(),
            request.uri().path(),
            origin
        );
        return service::Error::OriginNotAllowed.into_response();
    }

    next.run(request).await
}

pub fn parse_allowed_origins(origins: &[Box<str>]) -> Vec<HeaderValue> {
    origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid allowed origin {:?}", origin);
                None
            }
        })
        .collect()
}

pub fn cors_layer(allowed_origins: &[HeaderValue]) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins.iter().cloned()))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(AllowHeaders::mirror_request())
}
