use std::time::Duration;

use axum::http::StatusCode;

use crate::{
    config::AzureOpenAiConfig,
    errors::{AppError, Result},
    models::{ChatCompletionRequest, ChatCompletionResponse},
};

/// Client for an Azure OpenAI chat-completions deployment.
#[derive(Clone)]
pub struct AzureOpenAiClient {
    http: reqwest::Client,
    config: AzureOpenAiConfig,
}

impl AzureOpenAiClient {
    pub fn new(config: AzureOpenAiConfig, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, config })
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_complete()
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.deployment,
            self.config.api_version
        )
    }

    pub async fn chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse> {
        if !self.is_configured() {
            return Err(AppError::Configuration(
                "Azure OpenAI configuration is incomplete".to_string(),
            ));
        }

        let response = self
            .http
            .post(self.completions_url())
            .header("api-key", &self.config.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        if !(200..300).contains(&status) {
            return Err(AppError::Upstream {
                status: StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                message: body,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Error parsing Azure OpenAI response: {}", e))
        })
    }
}
