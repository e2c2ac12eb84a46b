use http::Extensions;
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next, Result};
use std::time::Instant;

pub struct TraceMiddleware;

impl TraceMiddleware {
    pub fn new() -> Self {
        Self {}
    }
}

#[async_trait::async_trait]
impl Middleware for TraceMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        let method = req.method().clone();
        let url = req.url().clone();
        let started = Instant::now();

        let response = next.run(req, extensions).await;

        match response.as_ref() {
            Ok(response) => {
                tracing::debug!(
                    %method,
                    %url,
                    status = %response.status(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "http request"
                );
            }
            Err(error) => {
                tracing::debug!(%method, %url, %error, "http request failed");
            }
        }
        response
    }
}
