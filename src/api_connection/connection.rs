use dotenv::dotenv;
use reqwest::Client;
use std::env;
use thiserror::Error;
use tracing::debug;

use super::endpoints::{
    ChatCompletionRequest, ChatCompletionResponse, LlmProvider, OpenRouterAvailableModel, OPENROUTER_CHAT_URL,
    OPENROUTER_MODELS,
};

#[derive(Debug, Error)]
pub enum ApiConnectionError {
    #[error("API key not found in environment: {0}")]
    MissingApiKey(String),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("API error {status}: {error_body}")]
    Api {
        status: reqwest::StatusCode,
        error_body: String,
    },
    #[error("API returned no usable content: {0}")]
    EmptyResponse(String),
}

impl LlmProvider {
    pub fn openrouter(api_key_env_var_name: &str) -> Self {
        Self::openrouter_with_endpoint(api_key_env_var_name, OPENROUTER_CHAT_URL)
    }

    pub fn openrouter_with_endpoint(api_key_env_var_name: &str, endpoint: &str) -> Self {
        dotenv().ok();
        Self::OpenRouter {
            api_key: api_key_env_var_name.to_string(),
            endpoint: endpoint.to_string(),
            available_models: OPENROUTER_MODELS.to_vec(),
        }
    }

    pub fn get_available_models(&self) -> Vec<OpenRouterAvailableModel> {
        match self {
            LlmProvider::OpenRouter { available_models, .. } => available_models.clone(),
        }
    }

    pub fn default_model(&self) -> String {
        self.get_available_models()
            .first()
            .map(|m| m.model_name.to_string())
            .unwrap_or_else(|| "qwen/qwen3-32b".to_string())
    }

    pub async fn call_chat_completion(
        &self,
        client: &Client,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ApiConnectionError> {
        match self {
            LlmProvider::OpenRouter {
                api_key: api_key_env_var_name,
                endpoint,
                ..
            } => {
                let actual_api_key = env::var(api_key_env_var_name)
                    .map_err(|_| ApiConnectionError::MissingApiKey(api_key_env_var_name.clone()))?;

                let site_url = env::var("SITE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
                let app_name = env::var("APP_NAME").unwrap_or_else(|_| "MealPlanEngine".to_string());

                debug!(model = %request.model, endpoint = %endpoint, "Sending chat completion request");
                let response = client
                    .post(endpoint)
                    .bearer_auth(actual_api_key)
                    .header("Content-Type", "application/json")
                    .header("HTTP-Referer", site_url)
                    .header("X-Title", app_name)
                    .json(request)
                    .send()
                    .await?;

                if response.status().is_success() {
                    let chat_response = response.json::<ChatCompletionResponse>().await?;
                    Ok(chat_response)
                } else {
                    let status = response.status();
                    let error_body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Failed to read error body".to_string());
                    Err(ApiConnectionError::Api { status, error_body })
                }
            }
        }
    }
}
