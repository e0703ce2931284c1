use crate::error::{OnboardError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_WALLET_LEN: usize = 128;

/// Canonical (lowercase) wallet identifier. Every store lookup is keyed on this form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletId(String);

impl WalletId {
    /// Trim and lowercase a raw identifier.
    ///
    /// Rejects empty or overlong values and any embedded whitespace or
    /// control character. Punctuation is kept so ENS names like `name.eth`
    /// pass through.
    pub fn normalize(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(OnboardError::Validation(
                "userWallet cannot be empty".to_string(),
            ));
        }

        if trimmed.len() > MAX_WALLET_LEN {
            return Err(OnboardError::Validation(format!(
                "userWallet exceeds {} characters",
                MAX_WALLET_LEN
            )));
        }

        if trimmed.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(OnboardError::Validation(format!(
                "userWallet has invalid characters: {}",
                trimmed
            )));
        }

        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    /// Normalize an optional JSON value, rejecting anything that is not a string.
    pub fn from_json(value: Option<&serde_json::Value>) -> Result<Self> {
        match value {
            Some(serde_json::Value::String(raw)) => Self::normalize(raw),
            Some(_) => Err(OnboardError::Validation(
                "userWallet must be a string".to_string(),
            )),
            None => Err(OnboardError::Validation(
                "userWallet is required".to_string(),
            )),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for WalletId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
