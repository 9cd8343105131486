//! Reqwest-backed [`HttpDispatcher`].

use flowmill_core::outbound::http::{
    HttpDispatcher, HttpError, OutboundRequest, OutboundResponse,
};

/// Dispatches [`OutboundRequest`]s through a shared [`reqwest::Client`].
///
/// Connection pooling lives in the client, so one dispatcher is meant to
/// be created per process and cloned freely.
#[derive(Clone)]
pub struct ReqwestDispatcher {
    client: reqwest::Client,
}

impl ReqwestDispatcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("flowmill/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for ReqwestDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpDispatcher for ReqwestDispatcher {
    async fn dispatch(&self, request: OutboundRequest) -> Result<OutboundResponse, HttpError> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|_| HttpError::InvalidRequest(format!("invalid method '{}'", request.method)))?;

        let mut builder = self
            .client
            .request(method, &request.url)
            .timeout(request.timeout);

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|err| {
            if err.is_timeout() {
                HttpError::Timeout {
                    url: request.url.clone(),
                    seconds: request.timeout.as_secs(),
                }
            } else {
                HttpError::Transport {
                    url: request.url.clone(),
                    message: err.to_string(),
                }
            }
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect();

        let body = response.text().await.map_err(|err| HttpError::Transport {
            url: request.url.clone(),
            message: format!("failed to read response body: {err}"),
        })?;

        Ok(OutboundResponse {
            status,
            headers,
            body,
        })
    }
}
