//! Telegram Bot API control plane
//!
//! Only two capabilities are needed: asking the bot for its own handle
//! (`getMe`) and minting opaque codes for `/start` deep links.

use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error};

use crate::config::TelegramConfig;
use crate::error::{OnboardError, Result};
use crate::platform::{BotControlPlane, BotIdentity};

/// Uppercase alphabet without 0, O, 1 or I
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LEN: usize = 10;

#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct GetMeResult {
    id: i64,
    username: Option<String>,
}

/// Telegram bot client
#[derive(Clone)]
pub struct TelegramBotClient {
    client: Client,
    api_base: String,
    bot_token: Option<String>,
}

impl TelegramBotClient {
    pub fn new(api_base: &str, bot_token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token: bot_token.filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn from_config(config: &TelegramConfig) -> Result<Self> {
        Self::new(
            &config.api_base,
            config.bot_token.clone(),
            config.lookup_timeout(),
        )
    }
}

/// Draw `len` characters from the code alphabet using the thread-local CSPRNG
pub fn random_code(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

#[async_trait]
impl BotControlPlane for TelegramBotClient {
    async fn get_self_identity(&self) -> Result<BotIdentity> {
        let Some(token) = self.bot_token.as_deref() else {
            return Err(OnboardError::Upstream(
                "telegram bot token is not configured".to_string(),
            ));
        };

        let url = format!("{}/bot{}/getMe", self.api_base, token);
        // The token is part of the URL, so it is stripped from transport errors.
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| OnboardError::Upstream(e.without_url().to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            error!("Telegram getMe failed: HTTP {}", status);
            return Err(OnboardError::Upstream(format!(
                "telegram getMe returned HTTP {}",
                status
            )));
        }

        let body: ApiResponse<GetMeResult> = resp
            .json()
            .await
            .map_err(|e| OnboardError::Upstream(e.without_url().to_string()))?;
        match body {
            ApiResponse {
                ok: true,
                result: Some(GetMeResult {
                    id,
                    username: Some(username),
                }),
                ..
            } => {
                debug!(bot_id = id, "Resolved bot handle @{}", username);
                Ok(BotIdentity { id, username })
            }
            ApiResponse { description, .. } => Err(OnboardError::Upstream(format!(
                "telegram getMe returned no username: {}",
                description.unwrap_or_else(|| "no description".to_string())
            ))),
        }
    }

    fn generate_opaque_code(&self) -> Result<String> {
        Ok(random_code(CODE_LEN))
    }
}
