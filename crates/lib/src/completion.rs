//! # External Completion Client
//!
//! Sends a single-message prompt to a hosted chat-completion endpoint (Perplexity by
//! default) and retries transient failures with a fixed backoff.
//!
//! The client never returns an error to its caller. Every outcome is a
//! [`CompletionOutcome`], whose text form is either the model's answer or one of
//! two fixed sentinels.

use crate::constants::{FAILED_AFTER_RETRIES, UNEXPECTED_RESPONSE_FORMAT};
use crate::errors::PromptError;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [CompletionMessage<'a>; 1],
}

#[derive(Serialize)]
struct CompletionMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
struct CompletionResponse {
    #[serde(default)]
    choices: Option<Vec<CompletionChoice>>,
}

#[derive(Deserialize, Debug)]
struct CompletionChoice {
    #[serde(default)]
    message: Option<CompletionResponseMessage>,
}

#[derive(Deserialize, Debug)]
struct CompletionResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// What a call to [`CompletionClient::complete`] produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The first choice's message content.
    Answer(String),
    /// A well-formed response with no choices. Not retried.
    EmptyChoices,
    /// Every attempt failed.
    RetriesExhausted,
}

impl CompletionOutcome {
    pub fn is_answer(&self) -> bool {
        matches!(self, CompletionOutcome::Answer(_))
    }

    /// The answer text, or the sentinel for the failure case.
    pub fn into_text(self) -> String {
        match self {
            CompletionOutcome::Answer(text) => text,
            other => other.to_string(),
        }
    }
}

impl fmt::Display for CompletionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionOutcome::Answer(text) => f.write_str(text),
            CompletionOutcome::EmptyChoices => f.write_str(UNEXPECTED_RESPONSE_FORMAT),
            CompletionOutcome::RetriesExhausted => f.write_str(FAILED_AFTER_RETRIES),
        }
    }
}

/// One attempt either settles the call or asks for another try.
enum Attempt {
    Settled(CompletionOutcome),
    Retry(String),
}

#[derive(Clone, Debug)]
pub struct CompletionClient {
    client: ReqwestClient,
    api_url: String,
    api_key: Option<String>,
    model: String,
    backoff: Duration,
}

impl CompletionClient {
    /// Creates a client whose every request is bounded by `timeout`.
    pub fn new(
        api_url: String,
        api_key: Option<String>,
        model: String,
        timeout: Duration,
        backoff: Duration,
    ) -> Result<Self, PromptError> {
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(PromptError::ReqwestClientBuild)?;
        Ok(Self {
            client,
            api_url,
            api_key,
            model,
            backoff,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends `prompt`, making at most `max_retries` attempts.
    ///
    /// Network errors, non-2xx statuses, unparsable bodies and choices without
    /// message content are retried after the backoff interval. There is no wait
    /// after the last attempt.
    pub async fn complete(&self, prompt: &str, max_retries: u32) -> CompletionOutcome {
        for attempt in 1..=max_retries {
            match self.attempt(prompt).await {
                Attempt::Settled(outcome) => return outcome,
                Attempt::Retry(reason) => {
                    warn!(attempt, max_retries, "Completion request failed: {reason}");
                    if attempt < max_retries {
                        tokio::time::sleep(self.backoff).await;
                    }
                }
            }
        }
        CompletionOutcome::RetriesExhausted
    }

    async fn attempt(&self, prompt: &str) -> Attempt {
        let request_body = CompletionRequest {
            model: &self.model,
            messages: [CompletionMessage {
                role: "user",
                content: prompt,
            }],
        };
        debug!(model = %self.model, "--> Sending completion request");

        let mut request_builder = self.client.post(&self.api_url).json(&request_body);
        if let Some(key) = &self.api_key {
            request_builder = request_builder.bearer_auth(key);
        }

        let response = match request_builder.send().await {
            Ok(response) => response,
            Err(e) => return Attempt::Retry(e.to_string()),
        };
        let response = match response.error_for_status() {
            Ok(response) => response,
            Err(e) => return Attempt::Retry(e.to_string()),
        };
        let parsed: CompletionResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => return Attempt::Retry(e.to_string()),
        };

        let Some(first) = parsed.choices.and_then(|c| c.into_iter().next()) else {
            return Attempt::Settled(CompletionOutcome::EmptyChoices);
        };
        match first.message.and_then(|m| m.content) {
            Some(content) => Attempt::Settled(CompletionOutcome::Answer(content)),
            None => Attempt::Retry("response choice has no message content".to_string()),
        }
    }
}
