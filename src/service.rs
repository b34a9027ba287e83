use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

pub const MISSING_API_KEY_MESSAGE: &str = "Missing OPENAI_API_KEY";
pub const PROXY_ERROR_MESSAGE: &str = "Proxy error";
pub const ORIGIN_NOT_ALLOWED_MESSAGE: &str = "Origin not allowed";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Missing OPENAI_API_KEY")]
    MissingApiKey,
    #[error("Origin not allowed")]
    OriginNotAllowed,
    /// Non-success reply from the provider, relayed as-is.
    #[error("Upstream responded with {status}")]
    Upstream { status: StatusCode, body: Box<str> },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

pub trait CoercibleResult<T> {
    fn into_service_result(self) -> Result<T>;
}

impl<T, E> CoercibleResult<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn into_service_result(self) -> Result<T> {
        self.map_err(|e| anyhow::Error::from(e).into())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub error: Box<str>,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error): (StatusCode, Box<str>) = match self {
            Error::MissingApiKey => (
                StatusCode::INTERNAL_SERVER_ERROR,
                MISSING_API_KEY_MESSAGE.into(),
            ),
            Error::OriginNotAllowed => (StatusCode::FORBIDDEN, ORIGIN_NOT_ALLOWED_MESSAGE.into()),
            Error::Upstream { status, body } => (status, body),
            Error::Internal(error) => {
                tracing::error!("Proxy error: {:?}", error);
                (StatusCode::INTERNAL_SERVER_ERROR, PROXY_ERROR_MESSAGE.into())
            }
        };

        (status, Json(ErrorBody { error })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn render(error: Error) -> (StatusCode, ErrorBody) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn missing_key_is_a_server_error() {
        let (status, body) = render(Error::MissingApiKey).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(&*body.error, "Missing OPENAI_API_KEY");
    }

    #[tokio::test]
    async fn upstream_status_and_text_pass_through() {
        let (status, body) = render(Error::Upstream {
            status: StatusCode::TOO_MANY_REQUESTS,
            body: "{\"error\":{\"message\":\"Rate limit\"}}".into(),
        })
        .await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(&*body.error, "{\"error\":{\"message\":\"Rate limit\"}}");
    }

    #[tokio::test]
    async fn internal_detail_is_withheld() {
        let (status, body) = render(anyhow::anyhow!("connection reset by peer").into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(&*body.error, "Proxy error");
    }

    #[test]
    fn foreign_errors_become_internal() {
        let result: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::other("boom"));
        assert!(matches!(
            result.into_service_result(),
            Err(Error::Internal(_))
        ));
    }
}
