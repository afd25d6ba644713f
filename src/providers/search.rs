//! Search-based score provider. Wraps an OpenAI-compatible chat-completions
//! search API (Perplexity-style): ask for one game's final score, then run
//! the reply through the score parser. Slow and rate-limited, but it covers
//! every league and is the only source that can answer odd matchups, so it
//! runs first broadly and again last with a narrower prompt.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{PROVIDER_CALL_DELAY_MS, SEARCH_TIMEOUT_SECS};
use crate::error::{AppError, Result};
use crate::parser;
use crate::providers::{http_client, status_error, FetchMode, ScoreProvider, ScoreQuery};
use crate::types::ScoreRecord;

const PROVIDER_ID: &str = "search";

#[derive(Debug, Clone)]
pub struct SearchProviderConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub call_delay_ms: u64,
}

impl SearchProviderConfig {
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        Self {
            api_key,
            base_url,
            model,
            timeout_secs: SEARCH_TIMEOUT_SECS,
            call_delay_ms: PROVIDER_CALL_DELAY_MS,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: String,
}

pub struct SearchScoreProvider {
    cfg: SearchProviderConfig,
    http: reqwest::Client,
}

impl SearchScoreProvider {
    pub fn new(cfg: SearchProviderConfig) -> Result<Self> {
        if !cfg.is_configured() {
            return Err(AppError::Config(
                "search provider requires SEARCH_API_KEY".to_string(),
            ));
        }
        let http = http_client(cfg.timeout_secs)?;
        Ok(Self { cfg, http })
    }

    fn broad_prompt(query: &ScoreQuery) -> String {
        format!(
            "Search for the final score of the {league} game {away} at {home} played on {date}. \
             Respond with a single JSON object and no commentary: \
             {{\"home_team\": \"{home}\", \"away_team\": \"{away}\", \
             \"home_score\": <integer>, \"away_score\": <integer>, \
             \"status\": \"final\" | \"in_progress\" | \"scheduled\"}}. \
             If the game has not finished, set status accordingly and use 0 scores.",
            league = query.league,
            away = query.away_team,
            home = query.home_team,
            date = query.date.format("%Y-%m-%d"),
        )
    }

    fn narrow_prompt(query: &ScoreQuery) -> String {
        format!(
            "What was the final score of {away} at {home} ({league}) on {date}? \
             Answer with only the score in the form AWAY-HOME, for example 102-98. \
             If the game has not finished or you cannot find it, answer UNKNOWN.",
            away = query.away_team,
            home = query.home_team,
            league = query.league,
            date = query.date.format("%Y-%m-%d"),
        )
    }

    async fn chat(&self, prompt: String) -> Result<String> {
        let request = ChatRequest {
            model: self.cfg.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.1,
            max_tokens: 500,
        };

        let url = format!("{}/chat/completions", self.cfg.base_url);
        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.cfg.api_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(PROVIDER_ID, status, &body));
        }

        let chat: ChatResponse = response.json().await?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        debug!("search reply: {} chars", content.len());
        Ok(content)
    }
}

#[async_trait]
impl ScoreProvider for SearchScoreProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn mode(&self) -> FetchMode {
        FetchMode::PerPick {
            delay: Duration::from_millis(self.cfg.call_delay_ms),
        }
    }

    fn supports_narrow(&self) -> bool {
        true
    }

    async fn fetch_score(&self, query: &ScoreQuery) -> Result<Option<ScoreRecord>> {
        let prompt = if query.narrow {
            Self::narrow_prompt(query)
        } else {
            Self::broad_prompt(query)
        };
        let reply = self.chat(prompt).await?;

        if reply.trim().eq_ignore_ascii_case("unknown") {
            return Ok(None);
        }
        let record = parser::extract_score(&reply, query).map(|mut rec| {
            rec.source = PROVIDER_ID;
            rec
        });
        Ok(record)
    }
}
