//! Two concurrent writers racing to save over the same expected version:
//! exactly one wins, the other observes `ConcurrencyConflict` with the
//! actual version that beat it.

use std::sync::Arc;

use quark::error::QuarkError;
use quark::persistence::StateStore;
use quark::testkit::InMemoryStateStore;
use quark::ActorIdentity;
use serde_json::json;

#[tokio::test]
async fn concurrent_saves_over_the_same_version_conflict() {
    let store: Arc<dyn StateStore> = Arc::new(InMemoryStateStore::new());
    let actor = ActorIdentity::new("Order", "o-1");

    let first = store.save_with_version(&actor, json!({"status": "Ordered"}), 0).await.unwrap();
    assert_eq!(first, 1);

    let winner = store
        .save_with_version(&actor, json!({"status": "Baking"}), 1)
        .await
        .unwrap();
    assert_eq!(winner, 2);

    let err = store
        .save_with_version(&actor, json!({"status": "Cancelled"}), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, QuarkError::ConcurrencyConflict { expected: 1, actual: 2 }));

    let loaded = store.load_with_version(&actor).await.unwrap().unwrap();
    assert_eq!(loaded.version, 2);
    assert_eq!(loaded.state, json!({"status": "Baking"}));
}
