//! Bridge form inputs and their validation.
//!
//! # Invariants
//! - Valid inputs have a non-zero chain, a non-blank token, a strictly
//!   positive amount, and a `0x`-prefixed 20-byte hex recipient.
//! - Validation failures never reach the SDK.

use crate::config::BridgeConfig;
use crate::model::amount::parse_positive_amount;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static ADDRESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("valid address regex"));

/// Returns whether `value` is syntactically an EVM address.
pub fn is_address(value: &str) -> bool {
    ADDRESS_RE.is_match(value)
}

/// Filters raw amount-field text: digits and one decimal point survive,
/// later points are dropped, and a lone `.` becomes `0.`.
pub fn sanitize_amount_input(raw: &str) -> String {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let mut parts = kept.splitn(2, '.');
    let whole = parts.next().unwrap_or_default();
    let sanitized = match parts.next() {
        Some(fraction) => format!("{whole}.{}", fraction.replace('.', "")),
        None => whole.to_string(),
    };
    if sanitized == "." {
        return "0.".to_string();
    }
    sanitized
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputIssue {
    MissingChain,
    MissingToken,
    InvalidAmount,
    InvalidRecipient,
}

impl Display for InputIssue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingChain => write!(f, "destination chain is required"),
            Self::MissingToken => write!(f, "token is required"),
            Self::InvalidAmount => write!(f, "amount must be greater than zero"),
            Self::InvalidRecipient => write!(f, "recipient must be a valid address"),
        }
    }
}

impl Error for InputIssue {}

/// Current bridge form values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeInputs {
    pub chain_id: u64,
    pub token: String,
    pub amount: Option<String>,
    pub recipient: Option<String>,
}

impl BridgeInputs {
    /// Form defaults: network chain, configured token, no amount, and the
    /// connected wallet as recipient.
    pub fn defaults(config: &BridgeConfig, connected_address: &str) -> Self {
        Self {
            chain_id: config.network.default_chain_id(),
            token: config.default_token.clone(),
            amount: None,
            recipient: Some(connected_address.to_string()),
        }
    }

    /// Every problem with the current values, in form order.
    pub fn issues(&self) -> Vec<InputIssue> {
        let mut issues = Vec::new();
        if self.chain_id == 0 {
            issues.push(InputIssue::MissingChain);
        }
        if self.token.trim().is_empty() {
            issues.push(InputIssue::MissingToken);
        }
        if self
            .amount
            .as_deref()
            .and_then(parse_positive_amount)
            .is_none()
        {
            issues.push(InputIssue::InvalidAmount);
        }
        if !self.recipient.as_deref().is_some_and(is_address) {
            issues.push(InputIssue::InvalidRecipient);
        }
        issues
    }

    pub fn is_valid(&self) -> bool {
        self.issues().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{is_address, sanitize_amount_input, BridgeInputs, InputIssue};
    use crate::config::BridgeConfig;

    const WALLET: &str = "0x1111111111111111111111111111111111111111";

    #[test]
    fn address_shape_is_checked() {
        assert!(is_address(WALLET));
        assert!(is_address("0xAbCdEf0123456789abcdef0123456789ABCDEF01"));
        assert!(!is_address("0x123"));
        assert!(!is_address("1111111111111111111111111111111111111111"));
        assert!(!is_address("0xZZ11111111111111111111111111111111111111"));
    }

    #[test]
    fn sanitize_mirrors_amount_field() {
        assert_eq!(sanitize_amount_input("12a.5"), "12.5");
        assert_eq!(sanitize_amount_input("1.2.3"), "1.23");
        assert_eq!(sanitize_amount_input("."), "0.");
        assert_eq!(sanitize_amount_input("$ 40"), "40");
        assert_eq!(sanitize_amount_input(""), "");
    }

    #[test]
    fn defaults_need_an_amount() {
        let inputs = BridgeInputs::defaults(&BridgeConfig::default(), WALLET);
        assert_eq!(inputs.chain_id, 1);
        assert_eq!(inputs.token, "USDC");
        assert_eq!(inputs.issues(), vec![InputIssue::InvalidAmount]);
    }

    #[test]
    fn all_issues_are_reported() {
        let inputs = BridgeInputs {
            chain_id: 0,
            token: " ".into(),
            amount: Some("0".into()),
            recipient: Some("nope".into()),
        };
        assert_eq!(
            inputs.issues(),
            vec![
                InputIssue::MissingChain,
                InputIssue::MissingToken,
                InputIssue::InvalidAmount,
                InputIssue::InvalidRecipient,
            ]
        );
    }
}
