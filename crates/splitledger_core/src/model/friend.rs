//! Friend record.
//!
//! # Invariants
//! - `name` is never blank.
//! - A friend is never mutated after creation.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Friend id: creation time in epoch milliseconds, as a decimal string.
pub type FriendId = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Friend {
    pub id: FriendId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
}

/// Input for adding a friend; the id is assigned by the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewFriend {
    pub name: String,
    pub nickname: Option<String>,
}

impl NewFriend {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nickname: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FriendValidationError {
    BlankName,
}

impl Display for FriendValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "name is required"),
        }
    }
}

impl Error for FriendValidationError {}

impl Friend {
    /// Builds a friend from user input.
    ///
    /// Name and nickname are stored as entered; a blank nickname becomes `None`.
    pub fn create(id: FriendId, input: NewFriend) -> Result<Self, FriendValidationError> {
        if input.name.trim().is_empty() {
            return Err(FriendValidationError::BlankName);
        }
        let nickname = input.nickname.filter(|value| !value.trim().is_empty());
        Ok(Self {
            id,
            name: input.name,
            nickname,
        })
    }

    /// Nickname when set, otherwise the name.
    pub fn display_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.name)
    }
}
