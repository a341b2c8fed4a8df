//! Retell web-call API client

use super::{VoiceError, WebCall, WebCallService};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.retellai.com";

pub struct RetellService {
    client: Client,
    api_key: String,
    base_url: String,
}

impl RetellService {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl WebCallService for RetellService {
    async fn create_web_call(&self, agent_id: &str) -> Result<WebCall, VoiceError> {
        let response = self
            .client
            .post(format!("{}/v2/create-web-call", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&CreateWebCallRequest { agent_id })
            .send()
            .await
            .map_err(|e| VoiceError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| VoiceError::Network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(VoiceError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let created: CreateWebCallResponse =
            serde_json::from_str(&body).map_err(|e| VoiceError::Decode(e.to_string()))?;

        Ok(WebCall {
            access_token: created.access_token,
            call_id: created.call_id,
        })
    }
}

#[derive(Debug, Serialize)]
struct CreateWebCallRequest<'a> {
    agent_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateWebCallResponse {
    access_token: String,
    #[serde(default)]
    call_id: Option<String>,
}
