//! Local ledger store: friends, splits, and reward points.
//!
//! # Responsibility
//! - Load the three persisted snapshots once and serve reads from memory.
//! - Apply friend/split use cases and write the touched snapshot through.
//!
//! # Invariants
//! - Storage is written before memory changes, so a failed write leaves the
//!   in-memory view equal to what is persisted.
//! - Ids are creation timestamps, bumped past the last issued id so two
//!   records made in the same millisecond still differ.
//! - Points only grow: +[`POINTS_PER_SPLIT`] per created split.

use crate::model::amount::{format_amount, parse_amount};
use crate::model::friend::{Friend, FriendValidationError, NewFriend};
use crate::model::payment_request::PaymentRequestId;
use crate::model::split::{Split, SplitDraft, SplitValidationError};
use crate::repo::kv_repo::{KeyValueRepository, RepoError};
use crate::service::balance;
use chrono::{DateTime, SecondsFormat, Utc};
use log::{error, info};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const FRIENDS_KEY: &str = "friends";
pub const SPLITS_KEY: &str = "splits";
pub const POINTS_KEY: &str = "ezPoints";
pub const POINTS_PER_SPLIT: u64 = 20;

pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Debug)]
pub enum LedgerError {
    Repo(RepoError),
    Friend(FriendValidationError),
    Split(SplitValidationError),
    SplitNotFound(String),
    FriendNotFound(String),
    InvalidPaymentRequest(String),
    Encode(serde_json::Error),
}

impl Display for LedgerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Friend(err) => write!(f, "{err}"),
            Self::Split(err) => write!(f, "{err}"),
            Self::SplitNotFound(id) => write!(f, "split not found: {id}"),
            Self::FriendNotFound(id) => write!(f, "friend not found: {id}"),
            Self::InvalidPaymentRequest(raw) => write!(f, "invalid payment request id `{raw}`"),
            Self::Encode(err) => write!(f, "cannot encode ledger snapshot: {err}"),
        }
    }
}

impl Error for LedgerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Friend(err) => Some(err),
            Self::Split(err) => Some(err),
            Self::Encode(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for LedgerError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<FriendValidationError> for LedgerError {
    fn from(value: FriendValidationError) -> Self {
        Self::Friend(value)
    }
}

impl From<SplitValidationError> for LedgerError {
    fn from(value: SplitValidationError) -> Self {
        Self::Split(value)
    }
}

/// Wall-clock source for ids and record dates.
pub trait TimeSource {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Result of a settle request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleOutcome {
    Settled,
    /// The split was already settled; nothing changed.
    AlreadySettled,
}

/// One friend's share of one split, resolved from a [`PaymentRequestId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    pub id: PaymentRequestId,
    pub split: Split,
    pub friend: Friend,
    /// The per-person share, two decimals.
    pub amount: String,
}

/// Counters for dashboards and the CLI probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSummary {
    pub friends: usize,
    pub active_splits: usize,
    pub settled_splits: usize,
    pub outstanding: String,
    pub points: u64,
}

/// In-memory ledger with write-through persistence.
pub struct LedgerStore<R: KeyValueRepository, T: TimeSource = SystemTimeSource> {
    repo: R,
    time: T,
    friends: Vec<Friend>,
    splits: Vec<Split>,
    points: u64,
    last_issued_ms: i64,
}

impl<R: KeyValueRepository, T: TimeSource> LedgerStore<R, T> {
    /// Reads all three snapshots; absent entries start empty.
    ///
    /// # Errors
    /// - `Repo(InvalidData)` when a stored snapshot cannot be decoded.
    pub fn load(repo: R, time: T) -> LedgerResult<Self> {
        let friends: Vec<Friend> = read_json(&repo, FRIENDS_KEY)?.unwrap_or_default();
        let splits: Vec<Split> = read_json(&repo, SPLITS_KEY)?.unwrap_or_default();
        let points = match repo.get(POINTS_KEY)? {
            Some(raw) => raw.trim().parse::<u64>().map_err(|err| RepoError::InvalidData {
                key: POINTS_KEY.to_string(),
                message: err.to_string(),
            })?,
            None => 0,
        };

        let last_issued_ms = friends
            .iter()
            .map(|friend| friend.id.as_str())
            .chain(splits.iter().map(|split| split.id.as_str()))
            .filter_map(|id| id.parse::<i64>().ok())
            .max()
            .unwrap_or(i64::MIN);

        info!(
            "event=ledger_load module=ledger status=ok friends={} splits={} points={}",
            friends.len(),
            splits.len(),
            points
        );

        Ok(Self {
            repo,
            time,
            friends,
            splits,
            points,
            last_issued_ms,
        })
    }

    pub fn friends(&self) -> &[Friend] {
        &self.friends
    }

    pub fn splits(&self) -> &[Split] {
        &self.splits
    }

    pub fn friend(&self, id: &str) -> Option<&Friend> {
        self.friends.iter().find(|friend| friend.id == id)
    }

    pub fn split(&self, id: &str) -> Option<&Split> {
        self.splits.iter().find(|split| split.id == id)
    }

    pub fn points(&self) -> u64 {
        self.points
    }

    /// Adds a friend with a generated id.
    pub fn add_friend(&mut self, input: NewFriend) -> LedgerResult<Friend> {
        let (id, _) = self.next_id();
        let friend = Friend::create(id, input)?;

        let mut next = self.friends.clone();
        next.push(friend.clone());
        write_json(&self.repo, FRIENDS_KEY, &next)?;
        self.friends = next;

        info!(
            "event=friend_add module=ledger status=ok friend_id={}",
            friend.id
        );
        Ok(friend)
    }

    /// Creates a split paid by the owner and awards reward points.
    pub fn create_split(&mut self, draft: SplitDraft) -> LedgerResult<Split> {
        let (id, date) = self.next_id();
        let split = Split::create(id, date, draft)?;

        let mut next = self.splits.clone();
        next.push(split.clone());
        write_json(&self.repo, SPLITS_KEY, &next)?;

        let points = self.points + POINTS_PER_SPLIT;
        if let Err(err) = self.repo.put(POINTS_KEY, &points.to_string()) {
            error!(
                "event=points_award module=ledger status=error split_id={} error={}",
                split.id, err
            );
            // Split and award land together or not at all.
            if let Err(rollback) = write_json(&self.repo, SPLITS_KEY, &self.splits) {
                error!(
                    "event=split_create module=ledger status=error phase=rollback split_id={} error={}",
                    split.id, rollback
                );
            }
            return Err(err.into());
        }
        self.splits = next;
        self.points = points;

        info!(
            "event=split_create module=ledger status=ok split_id={} participants={} per_person={}",
            split.id,
            split.participants.len(),
            split.per_person_amount
        );
        Ok(split)
    }

    /// Removes a split. Points already awarded are kept.
    pub fn delete_split(&mut self, id: &str) -> LedgerResult<Split> {
        let position = self
            .splits
            .iter()
            .position(|split| split.id == id)
            .ok_or_else(|| LedgerError::SplitNotFound(id.to_string()))?;

        let mut next = self.splits.clone();
        let removed = next.remove(position);
        write_json(&self.repo, SPLITS_KEY, &next)?;
        self.splits = next;

        info!("event=split_delete module=ledger status=ok split_id={id}");
        Ok(removed)
    }

    /// Marks a split settled.
    ///
    /// Settling an already settled split is a no-op: nothing is written and the
    /// first `settled_date` is kept.
    pub fn settle_split(&mut self, id: &str) -> LedgerResult<SettleOutcome> {
        let position = self
            .splits
            .iter()
            .position(|split| split.id == id)
            .ok_or_else(|| LedgerError::SplitNotFound(id.to_string()))?;

        let mut next = self.splits.clone();
        if !next[position].settle(self.now_rfc3339()) {
            info!("event=split_settle module=ledger status=noop split_id={id}");
            return Ok(SettleOutcome::AlreadySettled);
        }
        write_json(&self.repo, SPLITS_KEY, &next)?;
        self.splits = next;

        info!("event=split_settle module=ledger status=ok split_id={id}");
        Ok(SettleOutcome::Settled)
    }

    /// Clears every friend, split, and point, in storage and in memory.
    ///
    /// Each container is emptied in memory as soon as its entry is removed,
    /// so a failure part-way leaves memory matching storage.
    pub fn reset(&mut self) -> LedgerResult<()> {
        self.repo.remove(FRIENDS_KEY)?;
        self.friends.clear();
        self.repo.remove(SPLITS_KEY)?;
        self.splits.clear();
        self.repo.remove(POINTS_KEY)?;
        self.points = 0;
        info!("event=ledger_reset module=ledger status=ok");
        Ok(())
    }

    /// Resolves a `"{split}_{friend}"` id to the friend's share.
    pub fn payment_request(&self, raw_id: &str) -> LedgerResult<PaymentRequest> {
        let id = PaymentRequestId::parse(raw_id)
            .ok_or_else(|| LedgerError::InvalidPaymentRequest(raw_id.to_string()))?;
        let split = self
            .split(&id.split_id)
            .cloned()
            .ok_or_else(|| LedgerError::SplitNotFound(id.split_id.clone()))?;
        let friend = self
            .friend(&id.friend_id)
            .cloned()
            .ok_or_else(|| LedgerError::FriendNotFound(id.friend_id.clone()))?;
        let amount = parse_amount(&split.per_person_amount)
            .map(format_amount)
            .unwrap_or_else(|| "0.00".to_string());

        Ok(PaymentRequest {
            id,
            split,
            friend,
            amount,
        })
    }

    /// Settles the split behind a payment request.
    pub fn pay_request(&mut self, raw_id: &str) -> LedgerResult<SettleOutcome> {
        let request = self.payment_request(raw_id)?;
        self.settle_split(&request.id.split_id)
    }

    /// Outstanding balance of one friend, two decimals.
    pub fn friend_balance(&self, friend_id: &str) -> String {
        format_amount(balance::friend_balance(&self.splits, friend_id))
    }

    /// Outstanding total over unsettled splits, two decimals.
    pub fn total_outstanding(&self) -> String {
        format_amount(balance::total_outstanding(&self.splits))
    }

    pub fn summary(&self) -> LedgerSummary {
        let settled = self.splits.iter().filter(|split| split.settled).count();
        LedgerSummary {
            friends: self.friends.len(),
            active_splits: self.splits.len() - settled,
            settled_splits: settled,
            outstanding: self.total_outstanding(),
            points: self.points,
        }
    }

    fn now_rfc3339(&self) -> String {
        self.time.now().to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    fn next_id(&mut self) -> (String, String) {
        let now = self.time.now();
        let candidate = now.timestamp_millis();
        let issued = if candidate > self.last_issued_ms {
            candidate
        } else {
            self.last_issued_ms.saturating_add(1)
        };
        self.last_issued_ms = issued;
        (
            issued.to_string(),
            now.to_rfc3339_opts(SecondsFormat::Millis, true),
        )
    }
}

fn read_json<R: KeyValueRepository, V: DeserializeOwned>(
    repo: &R,
    key: &str,
) -> LedgerResult<Option<V>> {
    let Some(raw) = repo.get(key)? else {
        return Ok(None);
    };
    serde_json::from_str(&raw).map(Some).map_err(|err| {
        error!("event=ledger_load module=ledger status=error key={key} error={err}");
        LedgerError::Repo(RepoError::InvalidData {
            key: key.to_string(),
            message: err.to_string(),
        })
    })
}

fn write_json<R: KeyValueRepository, V: Serialize + ?Sized>(
    repo: &R,
    key: &str,
    value: &V,
) -> LedgerResult<()> {
    let encoded = serde_json::to_string(value).map_err(LedgerError::Encode)?;
    repo.put(key, &encoded)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{LedgerStore, TimeSource};
    use crate::model::friend::NewFriend;
    use crate::repo::kv_repo::MemoryKeyValueRepository;
    use chrono::{DateTime, TimeZone, Utc};

    struct Frozen(DateTime<Utc>);

    impl TimeSource for Frozen {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[test]
    fn ids_stay_unique_within_one_millisecond() {
        let repo = MemoryKeyValueRepository::new();
        let frozen = Frozen(Utc.timestamp_millis_opt(1_700_000_000_000).unwrap());
        let mut store = LedgerStore::load(&repo, &frozen).unwrap();

        let first = store.add_friend(NewFriend::named("Ann")).unwrap();
        let second = store.add_friend(NewFriend::named("Bo")).unwrap();
        assert_eq!(first.id, "1700000000000");
        assert_eq!(second.id, "1700000000001");
    }

    #[test]
    fn reload_continues_past_stored_ids() {
        let repo = MemoryKeyValueRepository::new();
        let frozen = Frozen(Utc.timestamp_millis_opt(5_000).unwrap());
        {
            let mut store = LedgerStore::load(&repo, &frozen).unwrap();
            store.add_friend(NewFriend::named("Ann")).unwrap();
        }
        let mut store = LedgerStore::load(&repo, &frozen).unwrap();
        let next = store.add_friend(NewFriend::named("Bo")).unwrap();
        assert_eq!(next.id, "5001");
    }
}
