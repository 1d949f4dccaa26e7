//! Text generation through a local Ollama instance.
//!
//! The query pipeline hands the assembled prompt to a [`Generator`] and
//! prints whatever comes back. [`OllamaGenerator`] uses the non-streaming
//! `/api/generate` endpoint, so the whole answer arrives in one response.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::LlmConfig;

#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f64,
    num_predict: u32,
}

#[derive(Serialize)]
struct GenerateReq<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Deserialize, Debug)]
struct GenerateResp {
    response: Option<String>,
    error: Option<String>,
}

pub struct OllamaGenerator {
    url: String,
    model: String,
    temperature: f64,
    num_predict: u32,
    client: reqwest::Client,
}

impl OllamaGenerator {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            num_predict: config.num_predict,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Fail early if the configured model has not been pulled.
    pub async fn check_model(&self) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/api/show", self.url))
            .json(&serde_json::json!({ "model": self.model }))
            .send()
            .await
            .with_context(|| format!("Ollama is not reachable at {}", self.url))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            bail!(
                "Model '{}' is not available in Ollama. Run: ollama pull {}",
                self.model,
                self.model
            );
        }
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Ollama API error {}: {}", status, body_text);
        }
        Ok(())
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let body = GenerateReq {
            model: &self.model,
            prompt: compose_prompt(system_prompt, user_prompt),
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
                num_predict: self.num_predict,
            },
        };

        tracing::info!(
            model = %self.model,
            prompt_chars = body.prompt.len(),
            "sending generation request"
        );

        let response = self
            .client
            .post(format!("{}/api/generate", self.url))
            .json(&body)
            .send()
            .await
            .with_context(|| {
                format!(
                    "Ollama connection error (is Ollama running at {}?)",
                    self.url
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Ollama API error {}: {}", status, body_text);
        }

        let parsed: GenerateResp = response.json().await?;
        parse_generate_response(parsed)
    }
}

fn compose_prompt(system_prompt: &str, user_prompt: &str) -> String {
    format!(
        "System: {}\n\nUser: {}\n\nAssistant:",
        system_prompt, user_prompt
    )
}

fn parse_generate_response(resp: GenerateResp) -> Result<String> {
    if let Some(err) = resp.error {
        bail!("Ollama generation failed: {}", err);
    }
    resp.response
        .ok_or_else(|| anyhow!("Invalid Ollama response: missing response field"))
}
