// src/server/handler.rs
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Body, Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::sync::Arc;
use tower::Service;
use tracing::Instrument;
use uuid::Uuid;

use crate::health::{HealthCheckService, HealthReport};

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
pub struct RequestHandler {
    health: Arc<HealthCheckService>,
    path: Arc<str>,
}

impl RequestHandler {
    pub fn new(health: Arc<HealthCheckService>, path: impl Into<String>) -> Self {
        Self {
            health,
            path: Arc::from(path.into()),
        }
    }

    pub async fn handle(&self, req: Request<Body>) -> Result<Response<Body>, HandlerError> {
        if req.uri().path() != &*self.path {
            return Ok(plain(StatusCode::NOT_FOUND, "Not Found"));
        }
        if req.method() != Method::GET {
            return Ok(plain(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed"));
        }

        match self.health.check().await {
            Ok(report) => json(StatusCode::OK, &report),
            Err(failure) => {
                tracing::warn!("{}", failure);
                json(StatusCode::SERVICE_UNAVAILABLE, &failure.report)
            }
        }
    }
}

impl Service<Request<Body>> for RequestHandler {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = futures::future::BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let handler = self.clone();
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "request",
            %request_id,
            method = %req.method(),
            path = %req.uri().path(),
        );

        Box::pin(
            async move {
                let mut response = handler.handle(req).await.unwrap_or_else(|e| {
                    tracing::error!(%e, "health check handler error");
                    Response::from(e)
                });
                tracing::debug!(status = %response.status(), "request complete");

                if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
                    response.headers_mut().insert(REQUEST_ID_HEADER, value);
                }
                Ok(response)
            }
            .instrument(span),
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("Failed to encode health report: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<HandlerError> for Response<Body> {
    fn from(err: HandlerError) -> Self {
        let message = match err {
            HandlerError::Encode(_) => "Internal Server Error",
        };
        plain(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

fn plain(status: StatusCode, message: &'static str) -> Response<Body> {
    let mut response = Response::new(Body::from(message));
    *response.status_mut() = status;
    response
}

fn json(status: StatusCode, report: &HealthReport) -> Result<Response<Body>, HandlerError> {
    let body = serde_json::to_vec(report)?;
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(response)
}
