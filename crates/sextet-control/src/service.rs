//! Client for the preset-generation service.
//!
//! The service is an opaque HTTP endpoint: POST `{"prompt": "<text>"}`,
//! receive a [`PresetPayload`](crate::PresetPayload) as JSON. The client
//! is blocking (it lives on a control thread), carries a 30-second
//! timeout, and optionally sends a bearer token taken from
//! `OPENAI_API_KEY`. Failures surface as [`ControlError`]; the chain is
//! never touched on a failed request.

use crate::error::ControlError;
use crate::payload::PresetPayload;
use serde::Serialize;
use std::time::Duration;

/// Request body sent to the service.
#[derive(Debug, Serialize)]
struct PromptRequest<'a> {
    prompt: &'a str,
}

/// Blocking preset-service client.
pub struct PresetService {
    endpoint: String,
    client: reqwest::blocking::Client,
    bearer_token: Option<String>,
}

/// Request timeout mandated for external service calls.
const TIMEOUT: Duration = Duration::from_secs(30);

impl PresetService {
    /// Create a client for the given endpoint URL.
    ///
    /// Reads `OPENAI_API_KEY` from the environment for an optional bearer
    /// token; absence is fine for unauthenticated endpoints.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ControlError> {
        let endpoint = endpoint.into();
        if endpoint.is_empty() {
            return Err(ControlError::NoEndpoint);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(TIMEOUT)
            .build()?;
        Ok(Self {
            endpoint,
            client,
            bearer_token: std::env::var("OPENAI_API_KEY").ok(),
        })
    }

    /// Override the bearer token (instead of the environment).
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// The configured endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Ask the service to turn a free-text prompt into a preset.
    ///
    /// Blocks up to 30 seconds. A malformed response is rejected the same
    /// way a malformed file would be — wholesale.
    pub fn generate(&self, prompt: &str) -> Result<PresetPayload, ControlError> {
        tracing::info!(endpoint = %self.endpoint, "requesting preset");
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&PromptRequest { prompt });
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }
        let response = request.send()?.error_for_status()?;
        let text = response.text()?;
        let payload = PresetPayload::from_json(&text)?;
        // Validation up front so a bad payload fails here, not mid-install.
        payload.resolve()?;
        tracing::info!(preset = %payload.preset_name, "received preset");
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_endpoint_is_rejected() {
        assert!(matches!(
            PresetService::new(""),
            Err(ControlError::NoEndpoint)
        ));
    }

    #[test]
    fn endpoint_is_kept() {
        let service = PresetService::new("http://localhost:9000/generate").unwrap();
        assert_eq!(service.endpoint(), "http://localhost:9000/generate");
    }

    #[test]
    fn unreachable_endpoint_surfaces_an_error() {
        // Port 1 on loopback refuses immediately; no network dependency.
        let service = PresetService::new("http://127.0.0.1:1/generate").unwrap();
        let result = service.generate("warm tape slapback");
        assert!(matches!(result, Err(ControlError::Service(_))));
    }
}
