use splitledger_core::db::{open_db, open_db_in_memory};
use splitledger_core::service::ledger::{
    SystemTimeSource, FRIENDS_KEY, POINTS_KEY, SPLITS_KEY,
};
use splitledger_core::{
    Friend, KeyValueRepository, LedgerError, LedgerStore, MemoryKeyValueRepository, NewFriend,
    Participant, RepoError, RepoResult, SettleOutcome, SplitDraft, SplitValidationError,
    SqliteKeyValueRepository,
};

fn participant(friend: &Friend) -> Participant {
    Participant {
        id: friend.id.clone(),
        name: friend.name.clone(),
    }
}

fn draft(title: &str, amount: &str, participants: Vec<Participant>) -> SplitDraft {
    SplitDraft {
        title: title.to_string(),
        amount: amount.to_string(),
        participants,
        ..SplitDraft::default()
    }
}

/// Memory repository whose writes and removals of one key fail.
struct FailingKeyRepo {
    inner: MemoryKeyValueRepository,
    failing_key: &'static str,
}

impl FailingKeyRepo {
    fn new(failing_key: &'static str) -> Self {
        Self {
            inner: MemoryKeyValueRepository::new(),
            failing_key,
        }
    }

    fn check(&self, key: &str) -> RepoResult<()> {
        if key == self.failing_key {
            return Err(RepoError::InvalidKey(key.to_string()));
        }
        Ok(())
    }
}

impl KeyValueRepository for FailingKeyRepo {
    fn get(&self, key: &str) -> RepoResult<Option<String>> {
        self.inner.get(key)
    }

    fn put(&self, key: &str, value: &str) -> RepoResult<()> {
        self.check(key)?;
        self.inner.put(key, value)
    }

    fn remove(&self, key: &str) -> RepoResult<()> {
        self.check(key)?;
        self.inner.remove(key)
    }
}

#[test]
fn add_friend_generates_id_without_nickname() {
    let repo = MemoryKeyValueRepository::new();
    let mut store = LedgerStore::load(&repo, SystemTimeSource).unwrap();

    let bo = store.add_friend(NewFriend::named("Bo")).unwrap();

    assert_eq!(store.friends().len(), 1);
    assert!(!bo.id.is_empty());
    assert!(bo.id.parse::<i64>().is_ok());
    assert_eq!(bo.name, "Bo");
    assert!(bo.nickname.is_none());
}

#[test]
fn blank_friend_name_is_rejected_and_nothing_is_stored() {
    let repo = MemoryKeyValueRepository::new();
    let mut store = LedgerStore::load(&repo, SystemTimeSource).unwrap();

    let err = store.add_friend(NewFriend::named("   ")).unwrap_err();

    assert!(matches!(err, LedgerError::Friend(_)));
    assert!(store.friends().is_empty());
    assert!(repo.snapshot().is_empty());
}

#[test]
fn create_split_divides_among_participants_and_owner() {
    let repo = MemoryKeyValueRepository::new();
    let mut store = LedgerStore::load(&repo, SystemTimeSource).unwrap();
    let a = store.add_friend(NewFriend::named("A")).unwrap();
    let b = store.add_friend(NewFriend::named("B")).unwrap();

    let split = store
        .create_split(draft("Dinner", "30", vec![participant(&a), participant(&b)]))
        .unwrap();

    assert_eq!(split.amount, "30.00");
    assert_eq!(split.per_person_amount, "10.00");
    assert_eq!(split.paid_by_name, "You");
    assert!(!split.settled);
    assert_eq!(store.points(), 20);
    assert_eq!(repo.get(POINTS_KEY).unwrap().as_deref(), Some("20"));
    assert_eq!(store.friend_balance(&a.id), "10.00");
    assert_eq!(store.friend_balance(&b.id), "10.00");
    assert_eq!(store.total_outstanding(), "30.00");
}

#[test]
fn stored_split_uses_camel_case_fields() {
    let repo = MemoryKeyValueRepository::new();
    let mut store = LedgerStore::load(&repo, SystemTimeSource).unwrap();
    let a = store.add_friend(NewFriend::named("A")).unwrap();
    store
        .create_split(draft("Taxi", "12.5", vec![participant(&a)]))
        .unwrap();

    let raw = repo.get(SPLITS_KEY).unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let first = &value[0];
    assert_eq!(first["perPersonAmount"], "6.25");
    assert_eq!(first["paidBy"], "me");
    assert_eq!(first["paidByName"], "You");
    assert_eq!(first["settled"], false);
    assert!(first.get("settledDate").is_none());
}

#[test]
fn invalid_split_draft_does_not_award_points() {
    let repo = MemoryKeyValueRepository::new();
    let mut store = LedgerStore::load(&repo, SystemTimeSource).unwrap();

    let err = store.create_split(draft("Lunch", "12", Vec::new())).unwrap_err();

    assert!(matches!(
        err,
        LedgerError::Split(SplitValidationError::NoParticipants)
    ));
    assert_eq!(store.points(), 0);
    assert!(store.splits().is_empty());
}

#[test]
fn settling_zeroes_friend_balances() {
    let repo = MemoryKeyValueRepository::new();
    let mut store = LedgerStore::load(&repo, SystemTimeSource).unwrap();
    let a = store.add_friend(NewFriend::named("A")).unwrap();
    let b = store.add_friend(NewFriend::named("B")).unwrap();
    let split = store
        .create_split(draft("Dinner", "30", vec![participant(&a), participant(&b)]))
        .unwrap();

    let outcome = store.settle_split(&split.id).unwrap();

    assert_eq!(outcome, SettleOutcome::Settled);
    assert_eq!(store.friend_balance(&a.id), "0.00");
    assert_eq!(store.friend_balance(&b.id), "0.00");
    assert_eq!(store.total_outstanding(), "0.00");
    let stored = store.split(&split.id).unwrap();
    assert!(stored.settled);
    assert!(stored.settled_date.is_some());
}

#[test]
fn settling_twice_keeps_first_settled_date() {
    let repo = MemoryKeyValueRepository::new();
    let mut store = LedgerStore::load(&repo, SystemTimeSource).unwrap();
    let a = store.add_friend(NewFriend::named("A")).unwrap();
    let split = store
        .create_split(draft("Coffee", "9", vec![participant(&a)]))
        .unwrap();

    store.settle_split(&split.id).unwrap();
    let first_date = store.split(&split.id).unwrap().settled_date.clone();
    let second = store.settle_split(&split.id).unwrap();

    assert_eq!(second, SettleOutcome::AlreadySettled);
    let stored = store.split(&split.id).unwrap();
    assert!(stored.settled);
    assert_eq!(stored.settled_date, first_date);
}

#[test]
fn unknown_split_ids_are_reported() {
    let repo = MemoryKeyValueRepository::new();
    let mut store = LedgerStore::load(&repo, SystemTimeSource).unwrap();

    assert!(matches!(
        store.settle_split("404").unwrap_err(),
        LedgerError::SplitNotFound(id) if id == "404"
    ));
    assert!(matches!(
        store.delete_split("404").unwrap_err(),
        LedgerError::SplitNotFound(_)
    ));
}

#[test]
fn delete_split_keeps_points() {
    let repo = MemoryKeyValueRepository::new();
    let mut store = LedgerStore::load(&repo, SystemTimeSource).unwrap();
    let a = store.add_friend(NewFriend::named("A")).unwrap();
    let split = store
        .create_split(draft("Snacks", "4", vec![participant(&a)]))
        .unwrap();

    let removed = store.delete_split(&split.id).unwrap();

    assert_eq!(removed.id, split.id);
    assert!(store.splits().is_empty());
    assert_eq!(store.points(), 20);
}

#[test]
fn payment_request_resolves_share_and_settles() {
    let repo = MemoryKeyValueRepository::new();
    let mut store = LedgerStore::load(&repo, SystemTimeSource).unwrap();
    let a = store.add_friend(NewFriend::named("A")).unwrap();
    let split = store
        .create_split(draft("Tickets", "50", vec![participant(&a)]))
        .unwrap();
    let raw_id = format!("{}_{}", split.id, a.id);

    let request = store.payment_request(&raw_id).unwrap();
    assert_eq!(request.amount, "25.00");
    assert_eq!(request.friend.name, "A");

    assert_eq!(store.pay_request(&raw_id).unwrap(), SettleOutcome::Settled);
    assert!(store.split(&split.id).unwrap().settled);

    assert!(matches!(
        store.payment_request("garbage").unwrap_err(),
        LedgerError::InvalidPaymentRequest(_)
    ));
    assert!(matches!(
        store.payment_request(&format!("{}_nobody", split.id)).unwrap_err(),
        LedgerError::FriendNotFound(_)
    ));
}

#[test]
fn reset_clears_storage_and_memory() {
    let repo = MemoryKeyValueRepository::new();
    let mut store = LedgerStore::load(&repo, SystemTimeSource).unwrap();
    let a = store.add_friend(NewFriend::named("A")).unwrap();
    store
        .create_split(draft("Gas", "20", vec![participant(&a)]))
        .unwrap();

    store.reset().unwrap();

    assert!(store.friends().is_empty());
    assert!(store.splits().is_empty());
    assert_eq!(store.points(), 0);
    assert!(repo.snapshot().is_empty());
}

#[test]
fn ledger_survives_reopening_a_database_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.db");

    let (friend_id, split_id) = {
        let conn = open_db(&path).unwrap();
        let repo = SqliteKeyValueRepository::new(&conn);
        let mut store = LedgerStore::load(repo, SystemTimeSource).unwrap();
        let a = store.add_friend(NewFriend::named("A")).unwrap();
        let split = store
            .create_split(draft("Rent", "1000", vec![participant(&a)]))
            .unwrap();
        (a.id, split.id)
    };

    let conn = open_db(&path).unwrap();
    let repo = SqliteKeyValueRepository::new(&conn);
    let mut store = LedgerStore::load(repo, SystemTimeSource).unwrap();

    assert_eq!(store.friends().len(), 1);
    assert_eq!(store.points(), 20);
    assert_eq!(store.friend_balance(&friend_id), "500.00");

    let next = store.add_friend(NewFriend::named("B")).unwrap();
    assert_ne!(next.id, friend_id);
    assert_ne!(next.id, split_id);
}

#[test]
fn corrupt_snapshot_is_rejected_on_load() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteKeyValueRepository::new(&conn);
    repo.put(SPLITS_KEY, "{not json").unwrap();

    let err = LedgerStore::load(&repo, SystemTimeSource).err().unwrap();

    assert!(matches!(
        err,
        LedgerError::Repo(RepoError::InvalidData { ref key, .. }) if key == SPLITS_KEY
    ));
}

#[test]
fn corrupt_points_entry_is_rejected_on_load() {
    let repo = MemoryKeyValueRepository::new();
    repo.put(POINTS_KEY, "lots").unwrap();

    let err = LedgerStore::load(&repo, SystemTimeSource).err().unwrap();

    assert!(matches!(
        err,
        LedgerError::Repo(RepoError::InvalidData { .. })
    ));
}

#[test]
fn failed_points_award_leaves_no_split_behind() {
    let repo = FailingKeyRepo::new(POINTS_KEY);
    let mut store = LedgerStore::load(&repo, SystemTimeSource).unwrap();
    let a = store.add_friend(NewFriend::named("A")).unwrap();

    let err = store
        .create_split(draft("Dinner", "30", vec![participant(&a)]))
        .unwrap_err();

    assert!(matches!(err, LedgerError::Repo(_)));
    assert!(store.splits().is_empty());
    assert_eq!(store.points(), 0);
    assert_eq!(repo.get(SPLITS_KEY).unwrap().as_deref(), Some("[]"));

    let reloaded = LedgerStore::load(&repo, SystemTimeSource).unwrap();
    assert!(reloaded.splits().is_empty());
}

#[test]
fn failed_reset_keeps_memory_in_step_with_storage() {
    let repo = FailingKeyRepo::new(SPLITS_KEY);
    repo.inner
        .put(FRIENDS_KEY, r#"[{"id":"1","name":"A"}]"#)
        .unwrap();
    repo.inner
        .put(
            SPLITS_KEY,
            r#"[{"id":"2","title":"t","amount":"4.00","perPersonAmount":"2.00",
                "paidBy":"me","paidByName":"You","participants":[{"id":"1","name":"A"}],
                "date":"d"}]"#,
        )
        .unwrap();
    let mut store = LedgerStore::load(&repo, SystemTimeSource).unwrap();

    assert!(store.reset().is_err());

    assert!(store.friends().is_empty());
    assert!(repo.get(FRIENDS_KEY).unwrap().is_none());
    assert_eq!(store.splits().len(), 1);
    assert!(repo.get(SPLITS_KEY).unwrap().is_some());
}

#[test]
fn split_written_by_the_web_app_keeps_its_payment_rail_after_settle() {
    let repo = MemoryKeyValueRepository::new();
    repo.put(
        SPLITS_KEY,
        r#"[{"id":"1","title":"Hotel","amount":"90.00","perPersonAmount":"45.00",
            "paidBy":"me","paidByName":"You","participants":[{"id":"9","name":"Bo"}],
            "date":"2025-05-01T10:00:00.000Z","blockchain":"ethereum","token":"USDC"}]"#,
    )
    .unwrap();
    let mut store = LedgerStore::load(&repo, SystemTimeSource).unwrap();

    store.settle_split("1").unwrap();

    let raw = repo.get(SPLITS_KEY).unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value[0]["blockchain"], "ethereum");
    assert_eq!(value[0]["token"], "USDC");
    assert_eq!(value[0]["settled"], true);
}
