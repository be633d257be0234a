//! OpenRouter chat-completions adapter.
//!
//! Design constraints:
//! - The LLM is **untrusted**: it produces *candidate* proposals; the
//!   deterministic merge decides what enters the Schema Card.
//! - Configuration is resolved once at command entry into an explicit
//!   [`LlmConfig`]; pure merge code paths never read the environment.
//! - Fixed retry policy: one strict-JSON retry per call, a minimum delay
//!   between successive chunk calls. Neither is stateful across documents.

use anyhow::{anyhow, Context, Result};
use serde_json::{json, Value};
use std::time::Duration;

pub(crate) const OPENROUTER_API_KEY_ENV: &str = "OPENROUTER_API_KEY";
pub(crate) const OPENROUTER_MODEL_ENV: &str = "OPENROUTER_MODEL";
pub(crate) const OPENROUTER_BASE_URL_ENV: &str = "OPENROUTER_BASE_URL";
pub(crate) const OPENROUTER_APP_NAME_ENV: &str = "OPENROUTER_APP_NAME";
pub(crate) const OPENROUTER_SITE_URL_ENV: &str = "OPENROUTER_SITE_URL";
pub(crate) const ONTORAG_LLM_TIMEOUT_SECS_ENV: &str = "ONTORAG_LLM_TIMEOUT_SECS";
pub(crate) const ONTORAG_LLM_DELAY_SECS_ENV: &str = "ONTORAG_LLM_DELAY_SECS";

const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";
const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_APP_NAME: &str = "OntoRAG";
const DEFAULT_SITE_URL: &str = "https://ontorag.github.io";
// Generous enough for slow models; the pipeline drops a timed-out chunk
// with a warning and keeps going.
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;
// Minimum pause between successive chunk calls (upstream rate limits).
const DEFAULT_INTER_CALL_DELAY_SECS: u64 = 10;

const STRICT_JSON_REMINDER: &str = "Return STRICT JSON only. No prose, no code fences.";

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub app_name: String,
    pub site_url: String,
    pub timeout: Duration,
    pub inter_call_delay: Duration,
}

impl LlmConfig {
    /// Resolve configuration from the environment. Missing `OPENROUTER_API_KEY`
    /// is a configuration error at the boundary of the first LLM call.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(OPENROUTER_API_KEY_ENV).unwrap_or_default();
        let api_key = api_key.trim().to_string();
        if api_key.is_empty() {
            return Err(anyhow!(
                "configuration error: {OPENROUTER_API_KEY_ENV} is not set (set it in your env; do not hardcode secrets)"
            ));
        }

        Ok(Self {
            api_key,
            model: env_or(OPENROUTER_MODEL_ENV, DEFAULT_MODEL),
            base_url: env_or(OPENROUTER_BASE_URL_ENV, DEFAULT_BASE_URL),
            app_name: env_or(OPENROUTER_APP_NAME_ENV, DEFAULT_APP_NAME),
            site_url: env_or(OPENROUTER_SITE_URL_ENV, DEFAULT_SITE_URL),
            timeout: Duration::from_secs(env_secs(
                ONTORAG_LLM_TIMEOUT_SECS_ENV,
                DEFAULT_LLM_TIMEOUT_SECS,
            )?),
            inter_call_delay: Duration::from_secs(env_secs(
                ONTORAG_LLM_DELAY_SECS_ENV,
                DEFAULT_INTER_CALL_DELAY_SECS,
            )?),
        })
    }
}

fn env_or(name: &str, default: &str) -> String {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => default.to_string(),
    }
}

fn env_secs(name: &str, default: u64) -> Result<u64> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => v.trim().parse::<u64>().map_err(|_| {
            anyhow!("configuration error: invalid {name}={v:?} (expected whole seconds)")
        }),
        _ => Ok(default),
    }
}

/// One reusable HTTP client per run.
pub struct LlmClient {
    config: LlmConfig,
    http: reqwest::blocking::Client,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| anyhow!("failed to build http client: {e}"))?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    pub fn inter_call_delay(&self) -> Duration {
        self.config.inter_call_delay
    }

    /// One chat-completions round trip; returns the assistant message text
    /// with any code fences stripped.
    pub fn chat(&self, system: &str, user: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "temperature": 0.2,
        });

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .header("HTTP-Referer", &self.config.site_url)
            .header("X-Title", &self.config.app_name)
            .json(&body)
            .send()
            .map_err(|e| anyhow!("failed to reach OpenRouter at {url}: {e}"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().unwrap_or_default();
            return Err(anyhow!("openrouter http error {status}: {text}"));
        }

        let value: Value = resp
            .json()
            .map_err(|e| anyhow!("openrouter returned invalid JSON: {e}"))?;
        let content = value
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|t| t.as_str())
            .ok_or_else(|| anyhow!("openrouter: no message content in response"))?;

        Ok(strip_code_fences(content))
    }

    /// Chat expecting strict JSON. On a parse failure the call is retried
    /// once with a strict-JSON reminder; a second failure is the caller's
    /// cue to skip the chunk.
    pub fn chat_strict_json(&self, system: &str, user: &str) -> Result<Value> {
        let first = self.chat(system, user)?;
        match serde_json::from_str::<Value>(&first) {
            Ok(value) => Ok(value),
            Err(first_err) => {
                let reminder = format!("{user}\n\n{STRICT_JSON_REMINDER}");
                let second = self.chat(system, &reminder)?;
                serde_json::from_str::<Value>(&second).with_context(|| {
                    format!("response is not valid JSON after one retry (first error: {first_err})")
                })
            }
        }
    }
}

/// Strip a leading ```/```json fence pair, if present.
pub(crate) fn strip_code_fences(content: &str) -> String {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let rest = match rest.find('\n') {
        Some(i) => &rest[i + 1..],
        None => rest.trim_start_matches("json"),
    };
    let rest = match rest.rfind("```") {
        Some(i) => &rest[..i],
        None => rest,
    };
    rest.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fences_are_stripped() {
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
    }
}
