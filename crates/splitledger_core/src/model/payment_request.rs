//! Composite id behind the `/payment/:requestId` route.

use crate::model::friend::FriendId;
use crate::model::split::SplitId;
use std::fmt::{Display, Formatter};

/// `"{split_id}_{friend_id}"`: one friend's share of one split.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PaymentRequestId {
    pub split_id: SplitId,
    pub friend_id: FriendId,
}

impl PaymentRequestId {
    pub fn new(split_id: impl Into<SplitId>, friend_id: impl Into<FriendId>) -> Self {
        Self {
            split_id: split_id.into(),
            friend_id: friend_id.into(),
        }
    }

    /// Splits on the first `_`. Both halves must be non-empty.
    pub fn parse(raw: &str) -> Option<Self> {
        let (split_id, friend_id) = raw.split_once('_')?;
        if split_id.is_empty() || friend_id.is_empty() {
            return None;
        }
        Some(Self::new(split_id, friend_id))
    }
}

impl Display for PaymentRequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.split_id, self.friend_id)
    }
}

#[cfg(test)]
mod tests {
    use super::PaymentRequestId;

    #[test]
    fn parse_splits_on_first_underscore() {
        let id = PaymentRequestId::parse("1700000000000_1690000000000").unwrap();
        assert_eq!(id.split_id, "1700000000000");
        assert_eq!(id.friend_id, "1690000000000");
        assert_eq!(id.to_string(), "1700000000000_1690000000000");
    }

    #[test]
    fn parse_rejects_missing_halves() {
        assert!(PaymentRequestId::parse("17000").is_none());
        assert!(PaymentRequestId::parse("_42").is_none());
        assert!(PaymentRequestId::parse("42_").is_none());
    }
}
