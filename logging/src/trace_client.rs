use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};

use crate::trace_middleware::TraceMiddleware;

pub fn new_client() -> ClientWithMiddleware {
    ClientBuilder::new(reqwest::Client::new())
        .with(TraceMiddleware::new())
        .build()
}
