//! Sessions over real stores: reopening, and rollback on write failure.

use std::sync::Arc;

use entityshare::core::{AccessLevel, GranteeRef};
use entityshare::store::{ShareStore, SqliteShareStore, StoreError};
use entityshare::{SessionConfig, ShareError, ShareSession};
use entityshare_testkit::{fixtures, FailingStore};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

#[tokio::test]
async fn test_sqlite_session_survives_reopen() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shares.db");

    {
        let store = Arc::new(SqliteShareStore::open(&path).unwrap());
        let mut session = ShareSession::open(
            fixtures::conversation(),
            fixtures::owner(),
            fixtures::tenant_members(),
            store,
            fixtures::directory(),
            SessionConfig::default(),
        )
        .await
        .unwrap();

        session
            .change_access_level(&GranteeRef::party("3"), AccessLevel::Commenter)
            .await
            .unwrap();
        session.invite_guest(fixtures::external_user()).await.unwrap();
        session.close();
    }

    let store = Arc::new(SqliteShareStore::open(&path).unwrap());
    let session = ShareSession::open(
        fixtures::conversation(),
        fixtures::owner(),
        fixtures::tenant_members(),
        store,
        fixtures::directory(),
        SessionConfig::default(),
    )
    .await
    .unwrap();

    let order: Vec<String> = session
        .registry()
        .list_grants()
        .map(|g| g.grantee.to_string())
        .collect();
    let expected: Vec<String> = ["1", "2", "3", "4"]
        .into_iter()
        .map(|id| GranteeRef::party(id).to_string())
        .collect();
    assert_eq!(order, expected);
    assert_eq!(
        session.registry().level_of(&GranteeRef::party("3")),
        Some(AccessLevel::Commenter)
    );
    assert_eq!(session.registry().guests().count(), 1);
}

#[tokio::test]
async fn test_failed_write_rolls_back() {
    init_tracing();
    let store = Arc::new(FailingStore::new());
    let mut session = ShareSession::open(
        fixtures::project(),
        fixtures::owner(),
        Vec::new(),
        store.clone(),
        fixtures::directory(),
        SessionConfig::default(),
    )
    .await
    .unwrap();
    session
        .add_grant(fixtures::jonathan(), AccessLevel::Viewer)
        .await
        .unwrap();
    let jonathan = GranteeRef::party("2");

    store.fail_writes(true);

    let err = session
        .add_grant(fixtures::rick(), AccessLevel::Editor)
        .await
        .unwrap_err();
    assert!(matches!(err, ShareError::Store(StoreError::Io(_))));
    assert!(!session.registry().contains(&GranteeRef::party("3")));

    assert!(session
        .change_access_level(&jonathan, AccessLevel::Editor)
        .await
        .is_err());
    assert_eq!(session.registry().level_of(&jonathan), Some(AccessLevel::Viewer));

    assert!(session.remove_grant(&jonathan).await.is_err());
    assert!(session.registry().contains(&jonathan));

    // Once the store recovers the same operation goes through.
    store.fail_writes(false);
    session.remove_grant(&jonathan).await.unwrap();
    assert_eq!(
        store.count(&fixtures::project().reference()).await.unwrap(),
        1
    );
}

#[tokio::test]
async fn test_rejected_operation_writes_nothing() {
    let store = Arc::new(FailingStore::new());
    let mut session = ShareSession::open(
        fixtures::project(),
        fixtures::owner(),
        Vec::new(),
        store.clone(),
        fixtures::directory(),
        SessionConfig::default(),
    )
    .await
    .unwrap();

    // A write would fail, but the registry rejects the call first.
    store.fail_writes(true);
    let err = session
        .remove_grant(&GranteeRef::party("1"))
        .await
        .unwrap_err();
    assert!(matches!(err, ShareError::Permission(_)));
}

#[tokio::test]
async fn test_corrupt_grant_set_is_refused() {
    let store = Arc::new(FailingStore::new());
    let project = fixtures::project();

    // A grant set with no owner row.
    let stray = entityshare::core::Grant::new(
        &project.reference(),
        GranteeRef::party("2"),
        AccessLevel::Viewer,
        fixtures::owner(),
        0,
    );
    store.save(&stray).await.unwrap();

    let result = ShareSession::open(
        project,
        fixtures::owner(),
        Vec::new(),
        store,
        fixtures::directory(),
        SessionConfig::default(),
    )
    .await;
    assert!(matches!(result, Err(ShareError::Permission(_))));
}

#[tokio::test]
async fn test_interrupted_seed_is_completed_on_reopen() {
    init_tracing();
    let store = Arc::new(FailingStore::new());
    let conversation = fixtures::conversation();

    // The owner row lands, the first member row does not.
    store.fail_after(1);
    let result = ShareSession::open(
        conversation.clone(),
        fixtures::owner(),
        fixtures::tenant_members(),
        store.clone(),
        fixtures::directory(),
        SessionConfig::default(),
    )
    .await;
    assert!(matches!(result, Err(ShareError::Store(StoreError::Io(_)))));
    assert_eq!(store.count(&conversation.reference()).await.unwrap(), 1);

    store.fail_writes(false);
    let session = ShareSession::open(
        conversation.clone(),
        fixtures::owner(),
        fixtures::tenant_members(),
        store.clone(),
        fixtures::directory(),
        SessionConfig::default(),
    )
    .await
    .unwrap();

    let registry = session.registry();
    assert_eq!(registry.len(), 3);
    assert_eq!(registry.members().count(), 2);
    for member in ["2", "3"] {
        assert_eq!(
            registry.level_of(&GranteeRef::party(member)),
            Some(AccessLevel::Editor)
        );
    }
    assert_eq!(store.count(&conversation.reference()).await.unwrap(), 3);
}

#[tokio::test]
async fn test_failed_member_reseed_fails_open() {
    let store = Arc::new(FailingStore::new());
    let conversation = fixtures::conversation();

    store.fail_after(1);
    let _ = ShareSession::open(
        conversation.clone(),
        fixtures::owner(),
        fixtures::tenant_members(),
        store.clone(),
        fixtures::directory(),
        SessionConfig::default(),
    )
    .await;

    // Still failing: the reopen reports the error instead of going on
    // without the members.
    let result = ShareSession::open(
        conversation,
        fixtures::owner(),
        fixtures::tenant_members(),
        store,
        fixtures::directory(),
        SessionConfig::default(),
    )
    .await;
    assert!(matches!(result, Err(ShareError::Store(_))));
}
