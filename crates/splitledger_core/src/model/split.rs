//! Split record: one shared expense divided evenly.
//!
//! # Responsibility
//! - Define the persisted split shape (camelCase JSON, matching stored data).
//! - Validate drafts and derive the per-person share.
//!
//! # Invariants
//! - `amount` and `per_person_amount` are two-decimal strings.
//! - `settled` only moves from `false` to `true`; `settled_date` is set once.
//! - Participants keep their input order; duplicates are allowed.

use crate::model::amount::{even_share, format_amount, parse_positive_amount};
use crate::model::friend::FriendId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Split id: creation time in epoch milliseconds, as a decimal string.
pub type SplitId = String;

/// Name shown for the ledger owner when they paid.
pub const OWNER_DISPLAY_NAME: &str = "You";

/// Who fronted the money. Stored as `"me"` or the friend id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Payer {
    Me,
    Friend(FriendId),
}

impl From<String> for Payer {
    fn from(value: String) -> Self {
        if value == "me" {
            Self::Me
        } else {
            Self::Friend(value)
        }
    }
}

impl From<Payer> for String {
    fn from(value: Payer) -> Self {
        match value {
            Payer::Me => "me".to_string(),
            Payer::Friend(id) => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: FriendId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Split {
    pub id: SplitId,
    pub title: String,
    /// Total expense.
    pub amount: String,
    /// `amount / (participants + 1)`; the creator counts as one head.
    pub per_person_amount: String,
    pub paid_by: Payer,
    pub paid_by_name: String,
    pub participants: Vec<Participant>,
    /// RFC 3339 creation time.
    pub date: String,
    #[serde(default)]
    pub settled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settled_date: Option<String>,
    /// Chain the split is meant to be paid on, e.g. `"arbitrum"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blockchain: Option<String>,
    /// Token the split is meant to be paid in, e.g. `"usdc"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Keys this version does not model, written back unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// User input for a new split.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitDraft {
    pub title: String,
    pub amount: String,
    pub participants: Vec<Participant>,
    pub blockchain: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitValidationError {
    BlankTitle,
    InvalidAmount(String),
    NoParticipants,
}

impl Display for SplitValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankTitle => write!(f, "title is required"),
            Self::InvalidAmount(raw) => write!(f, "amount must be a positive number, got `{raw}`"),
            Self::NoParticipants => write!(f, "select at least one friend"),
        }
    }
}

impl Error for SplitValidationError {}

impl Split {
    /// Builds an unsettled split paid by the ledger owner.
    pub fn create(
        id: SplitId,
        date: String,
        draft: SplitDraft,
    ) -> Result<Self, SplitValidationError> {
        if draft.title.trim().is_empty() {
            return Err(SplitValidationError::BlankTitle);
        }
        let total = parse_positive_amount(&draft.amount)
            .ok_or_else(|| SplitValidationError::InvalidAmount(draft.amount.clone()))?;
        if draft.participants.is_empty() {
            return Err(SplitValidationError::NoParticipants);
        }

        let heads = draft.participants.len() + 1;
        Ok(Self {
            id,
            title: draft.title,
            amount: format_amount(total),
            per_person_amount: format_amount(even_share(total, heads)),
            paid_by: Payer::Me,
            paid_by_name: OWNER_DISPLAY_NAME.to_string(),
            participants: draft.participants,
            date,
            settled: false,
            settled_date: None,
            blockchain: non_blank(draft.blockchain),
            token: non_blank(draft.token),
            extra: Map::new(),
        })
    }

    /// Marks the split settled at `at`.
    ///
    /// Returns `false` and leaves the record untouched when already settled.
    pub fn settle(&mut self, at: String) -> bool {
        if self.settled {
            return false;
        }
        self.settled = true;
        self.settled_date = Some(at);
        true
    }

    pub fn includes(&self, friend_id: &str) -> bool {
        self.participants.iter().any(|p| p.id == friend_id)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
