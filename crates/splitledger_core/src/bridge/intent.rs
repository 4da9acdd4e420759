//! Contract of the external wallet/intent SDK.
//!
//! Nothing here implements intent creation, allowances, or settlement; the
//! SDK does. Adapters wrap the real SDK behind [`IntentService`].

use crate::progress::events::StepEventSource;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Substring the SDK puts in errors caused by the user declining in-wallet.
pub const USER_REJECTION_MARKER: &str = "User rejected the request";

/// Parameters of a quote. `recipient` is set only for transfers to a
/// third-party address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub token: String,
    pub amount: String,
    pub chain_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
}

impl QuoteRequest {
    pub fn is_transfer(&self) -> bool {
        self.recipient.is_some()
    }
}

/// A quoted cross-chain operation awaiting acceptance. `details` is SDK-defined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub id: String,
    pub request: QuoteRequest,
    #[serde(default)]
    pub details: Value,
}

/// SDK request asking the user to approve a token spending limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllowancePrompt {
    pub token: String,
    pub chain_id: u64,
    #[serde(default)]
    pub details: Value,
}

/// Reply of an execute call that did not throw.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResponse {
    pub success: bool,
    #[serde(default)]
    pub explorer_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ExecuteResponse {
    pub fn succeeded(explorer_url: impl Into<String>) -> Self {
        Self {
            success: true,
            explorer_url: Some(explorer_url.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            explorer_url: None,
            error: Some(error.into()),
        }
    }
}

/// Unified balance of one token across chains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalance {
    pub symbol: String,
    pub balance: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentError {
    /// The user declined in their wallet.
    UserRejected,
    /// The SDK reported or threw a failure.
    Failed(String),
}

impl IntentError {
    /// Classifies an SDK error message.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.contains(USER_REJECTION_MARKER) {
            Self::UserRejected
        } else {
            Self::Failed(message)
        }
    }

    pub fn is_user_rejection(&self) -> bool {
        matches!(self, Self::UserRejected)
    }
}

impl Display for IntentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UserRejected => write!(f, "{USER_REJECTION_MARKER}"),
            Self::Failed(message) => write!(f, "{message}"),
        }
    }
}

impl Error for IntentError {}

/// Wallet SDK surface used by the bridge panel.
#[async_trait]
pub trait IntentService: Send + Sync {
    async fn quote(&self, request: &QuoteRequest) -> Result<Intent, IntentError>;
    async fn execute(&self, intent: &Intent) -> Result<ExecuteResponse, IntentError>;
    /// Re-validates a held intent; returns the refreshed quote.
    async fn refresh_intent(&self, intent: &Intent) -> Result<Intent, IntentError>;
    async fn get_balances(&self) -> Result<Vec<TokenBalance>, IntentError>;
    fn allow_intent(&self, intent: &Intent);
    fn deny_intent(&self, intent: &Intent);
    fn step_events(&self) -> Arc<dyn StepEventSource>;
}

#[cfg(test)]
mod tests {
    use super::{ExecuteResponse, IntentError, QuoteRequest};

    #[test]
    fn rejection_marker_is_recognized() {
        let err = IntentError::from_message("MetaMask: User rejected the request.");
        assert!(err.is_user_rejection());
        let err = IntentError::from_message("insufficient balance");
        assert_eq!(err, IntentError::Failed("insufficient balance".to_string()));
    }

    #[test]
    fn execute_response_reads_sdk_shape() {
        let ok: ExecuteResponse =
            serde_json::from_str(r#"{"success":true,"explorerUrl":"https://e/1"}"#).unwrap();
        assert_eq!(ok, ExecuteResponse::succeeded("https://e/1"));
        let failed: ExecuteResponse =
            serde_json::from_str(r#"{"success":false,"error":"boom"}"#).unwrap();
        assert_eq!(failed.error.as_deref(), Some("boom"));
    }

    #[test]
    fn recipient_marks_a_transfer() {
        let request = QuoteRequest {
            token: "USDC".into(),
            amount: "5".into(),
            chain_id: 1,
            recipient: None,
        };
        assert!(!request.is_transfer());
    }
}
