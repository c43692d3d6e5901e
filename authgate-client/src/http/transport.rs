use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;

use rst_common::standard::async_trait::async_trait;
use rst_common::with_logging::log::debug;

use authgate_core::authorization::types::{AuthorizationError, HttpResponse, TransportBuilder};
use authgate_core::request::types::RequestDescriptor;

use crate::common::types::CommonError;

const CONTENT_TYPE_JSON: &str = "application/json";

/// `Transport` executes signed request descriptors over HTTPS
///
/// Only failures to complete the round trip are errors. Every received
/// response is handed back untouched, whatever its status code.
#[derive(Clone)]
pub struct Transport {
    client: Client,
}

impl Transport {
    pub fn new(timeout: Duration) -> Result<Self, CommonError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|err| CommonError::TransportError(err.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl TransportBuilder for Transport {
    async fn execute(&self, request: RequestDescriptor) -> Result<HttpResponse, AuthorizationError> {
        debug!(
            "[transport:execute] {} {}",
            request.method(),
            request.url()
        );

        let mut builder = self
            .client
            .request(request.method().clone(), request.url());

        for (name, value) in request.headers().iter() {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(body) = request.body() {
            builder = builder
                .header(CONTENT_TYPE, CONTENT_TYPE_JSON)
                .body(body.to_string());
        }

        let response = builder
            .send()
            .await
            .map_err(|err| AuthorizationError::NetworkError(err.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| AuthorizationError::NetworkError(err.to_string()))?;

        debug!("[transport:execute] response status: {}", status);
        Ok(HttpResponse::new(status, body))
    }
}
