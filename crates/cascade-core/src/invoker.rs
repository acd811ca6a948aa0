//! The `Invoker` capability (§6): a substitutable inference-backend call.
//! Two default implementations are provided — a subprocess-based local
//! daemon invoker and a remote HTTP invoker — so the orchestrator never
//! depends on either concretely.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{CascadeError, CascadeResult};
use crate::registry::KeyStore;
use std::sync::Arc;

#[async_trait]
pub trait Invoker: Send + Sync {
    async fn invoke(
        &self,
        model_name: &str,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
        timeout: Duration,
    ) -> CascadeResult<String>;
}

/// Spawns the local daemon's run command with the prompt as an argument,
/// reads stdout, fails on non-zero exit or timeout. Runs the subprocess on
/// a blocking task so it never stalls the async runtime.
pub struct LocalDaemonInvoker {
    binary: String,
}

impl LocalDaemonInvoker {
    pub fn new(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }
}

#[async_trait]
impl Invoker for LocalDaemonInvoker {
    async fn invoke(
        &self,
        model_name: &str,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
        timeout: Duration,
    ) -> CascadeResult<String> {
        let binary = self.binary.clone();
        let model_name = model_name.to_string();
        let prompt = prompt.to_string();

        let run = tokio::task::spawn_blocking(move || {
            std::process::Command::new(&binary)
                .arg("run")
                .arg(&model_name)
                .arg(&prompt)
                .arg("--temperature")
                .arg(temperature.to_string())
                .arg("--max-tokens")
                .arg(max_tokens.to_string())
                .output()
        });

        let output = tokio::time::timeout(timeout, run)
            .await
            .map_err(|_| CascadeError::BackendFailure("local daemon invocation timed out".into()))?
            .map_err(|e| CascadeError::Internal(format!("subprocess join failed: {e}")))?
            .map_err(|e| CascadeError::BackendFailure(format!("failed to spawn daemon: {e}")))?;

        if !output.status.success() {
            return Err(CascadeError::BackendFailure(format!(
                "daemon exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequestBody {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponseBody {
    choices: Vec<ChatChoice>,
}

/// Sends a JSON body to a provider's chat-completions endpoint,
/// authenticated via `KeyStore`. Non-2xx responses map to `BackendFailure`.
pub struct RemoteHttpInvoker {
    client: reqwest::Client,
    base_url: String,
    provider: String,
    key_store: Arc<dyn KeyStore>,
}

impl RemoteHttpInvoker {
    pub fn new(base_url: impl Into<String>, provider: impl Into<String>, key_store: Arc<dyn KeyStore>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            provider: provider.into(),
            key_store,
        }
    }
}

#[async_trait]
impl Invoker for RemoteHttpInvoker {
    async fn invoke(
        &self,
        model_name: &str,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
        timeout: Duration,
    ) -> CascadeResult<String> {
        let secret = self
            .key_store
            .get(&self.provider)
            .ok_or_else(|| CascadeError::NotAvailable(format!("no credential for {}", self.provider)))?;

        let body = ChatRequestBody {
            model: model_name.to_string(),
            messages: vec![ChatMessage { role: "user", content: prompt.to_string() }],
            temperature,
            max_tokens,
        };

        let request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(secret)
            .json(&body)
            .timeout(timeout);

        let response = request
            .send()
            .await
            .map_err(|e| CascadeError::BackendFailure(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(CascadeError::BackendFailure(format!(
                "provider returned status {}",
                response.status()
            )));
        }

        let parsed: ChatResponseBody = response
            .json()
            .await
            .map_err(|e| CascadeError::Shape(format!("unexpected response body: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| CascadeError::Shape("empty choices array".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DenyAll;
    impl KeyStore for DenyAll {
        fn get(&self, _provider: &str) -> Option<String> {
            None
        }
    }

    #[tokio::test]
    async fn remote_invoker_fails_fast_without_credential() {
        let invoker = RemoteHttpInvoker::new("http://localhost:1", "providerA", Arc::new(DenyAll));
        let result = invoker
            .invoke("gpt", "hello", 0.2, 100, Duration::from_secs(1))
            .await;
        assert!(matches!(result, Err(CascadeError::NotAvailable(_))));
    }

    #[tokio::test]
    async fn local_daemon_invoker_surfaces_spawn_failure() {
        let invoker = LocalDaemonInvoker::new("definitely-not-a-real-binary-xyz");
        let result = invoker
            .invoke("m", "hi", 0.2, 10, Duration::from_secs(2))
            .await;
        assert!(result.is_err());
    }
}
