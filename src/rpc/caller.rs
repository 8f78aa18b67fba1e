//! HTTP client for generated RPC endpoints.
//!
//! The Rust counterpart of the generated `Caller.ts`: posts a JSON body to
//! `/rpc/<feature>/<method>` and decodes the JSON answer.

use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::rpc::generator::{rpc_endpoint, CallerFunction};

#[derive(Debug, Error)]
pub enum CallerError {
    #[error("Invalid endpoint '{endpoint}': {source}")]
    Url {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server answered {status}: {body}")]
    Status { status: u16, body: Value },
}

/// Invokes RPC endpoints of a running server.
#[derive(Debug, Clone)]
pub struct RpcCaller {
    base: Url,
    client: reqwest::Client,
}

impl RpcCaller {
    pub fn new(base: Url) -> Self {
        Self {
            base,
            client: reqwest::Client::new(),
        }
    }

    /// Call a function of a generated caller module.
    pub async fn call(&self, function: &CallerFunction, body: Option<Value>) -> Result<Value, CallerError> {
        self.post(&function.endpoint, body).await
    }

    /// Call `method` of `feature` without a generated module at hand.
    pub async fn call_method(
        &self,
        feature: &str,
        method: &str,
        body: Option<Value>,
    ) -> Result<Value, CallerError> {
        self.post(&rpc_endpoint(feature, method), body).await
    }

    async fn post(&self, endpoint: &str, body: Option<Value>) -> Result<Value, CallerError> {
        let url = self.base.join(endpoint).map_err(|source| CallerError::Url {
            endpoint: endpoint.to_string(),
            source,
        })?;

        let response = self
            .client
            .post(url)
            .json(&body.unwrap_or_else(|| Value::Object(Default::default())))
            .send()
            .await?;

        let status = response.status();
        let value: Value = response.json().await?;
        if !status.is_success() {
            return Err(CallerError::Status {
                status: status.as_u16(),
                body: value,
            });
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_server_is_http_error() {
        // Port 9 (discard) is not expected to run an HTTP server.
        let caller = RpcCaller::new(Url::parse("http://127.0.0.1:9").unwrap());
        let err = caller.call_method("Post", "list", None).await.unwrap_err();
        assert!(matches!(err, CallerError::Http(_)));
    }
}
