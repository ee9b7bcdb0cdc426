//! CRUD round trips and error normalization.

use std::error::Error;

use pucci::bson::doc;
use pucci::{DatabaseService, MemoryError, StoreError};

use crate::support::{connected, Profile, User, DB, USERS};

// ============================================================================
// Full lifecycle of one document
// ============================================================================

#[tokio::test]
async fn users_scenario_create_read_update_delete() {
    let c = connected().await;
    let store = &c.store;
    let scope = &c.scope;

    let id = store
        .create(scope, DB, USERS, "42", &User::named("a"))
        .await
        .unwrap();
    assert_eq!(id.to_string(), "42");

    let user: User = store
        .read(scope, DB, USERS, &doc! { "name": "a" })
        .await
        .unwrap();
    assert_eq!(user.name, "a");

    store
        .update(scope, DB, USERS, &doc! { "name": "a" }, &User::named("b"))
        .await
        .unwrap();

    let user: User = store
        .read(scope, DB, USERS, &doc! { "name": "b" })
        .await
        .unwrap();
    assert_eq!(user.name, "b");

    let err = store
        .read::<User>(scope, DB, USERS, &doc! { "name": "a" })
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    store.delete(scope, DB, USERS, "42").await.unwrap();

    let err = store.delete(scope, DB, USERS, "42").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn create_then_read_round_trips_all_fields() {
    let c = connected().await;
    let profile = Profile {
        name: "ada".into(),
        age: 36,
        tags: vec!["math".into(), "engines".into()],
    };

    c.store
        .create(&c.scope, DB, "profiles", "p-1", &profile)
        .await
        .unwrap();

    let loaded: Profile = c
        .store
        .read(&c.scope, DB, "profiles", &doc! { "_id": "p-1" })
        .await
        .unwrap();
    assert_eq!(loaded, profile);
}

#[tokio::test]
async fn schema_less_values_round_trip() {
    let c = connected().await;
    let document = serde_json::json!({
        "name": "a",
        "nested": { "list": [true, "x"] },
    });

    c.store
        .create(&c.scope, DB, "raw", "j-1", &document)
        .await
        .unwrap();

    let loaded: serde_json::Value = c
        .store
        .read_by_id(&c.scope, DB, "raw", "j-1")
        .await
        .unwrap();
    assert_eq!(loaded["_id"], "j-1");
    assert_eq!(loaded["name"], "a");
    assert_eq!(loaded["nested"]["list"][0], true);
    assert_eq!(loaded["nested"]["list"][1], "x");
}

// ============================================================================
// DuplicateIdentifier
// ============================================================================

#[tokio::test]
async fn create_with_existing_id_is_duplicate() {
    let c = connected().await;
    c.store
        .create(&c.scope, DB, USERS, "42", &User::named("a"))
        .await
        .unwrap();

    let err = c
        .store
        .create(&c.scope, DB, USERS, "42", &User::named("other"))
        .await
        .unwrap_err();

    match err {
        StoreError::DuplicateIdentifier {
            database,
            table,
            id,
        } => {
            assert_eq!(database, DB);
            assert_eq!(table, USERS);
            assert_eq!(id, "42");
        }
        other => panic!("expected DuplicateIdentifier, got {:?}", other),
    }

    // The original document is untouched and alone.
    assert_eq!(c.backend.len(DB, USERS), 1);
    let user: User = c.store.read_by_id(&c.scope, DB, USERS, "42").await.unwrap();
    assert_eq!(user, User::named("a"));
}

#[tokio::test]
async fn same_id_in_different_tables_is_not_duplicate() {
    let c = connected().await;
    c.store
        .create(&c.scope, DB, USERS, "42", &User::named("a"))
        .await
        .unwrap();
    c.store
        .create(&c.scope, DB, "admins", "42", &User::named("a"))
        .await
        .unwrap();
    c.store
        .create(&c.scope, "other", USERS, "42", &User::named("a"))
        .await
        .unwrap();
}

// ============================================================================
// NotFound vs Decoding
// ============================================================================

#[tokio::test]
async fn read_without_match_is_not_found_never_decoding() {
    let c = connected().await;

    // Empty table.
    let err = c
        .store
        .read::<User>(&c.scope, DB, USERS, &doc! { "name": "nobody" })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));

    // Populated table, no match.
    c.store
        .create(&c.scope, DB, USERS, "1", &User::named("a"))
        .await
        .unwrap();
    let err = c
        .store
        .read::<Profile>(&c.scope, DB, USERS, &doc! { "name": "nobody" })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));

    let err = c
        .store
        .read_by_id::<User>(&c.scope, DB, USERS, "2")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn read_into_wrong_shape_is_decoding_error() {
    let c = connected().await;
    c.store
        .create(&c.scope, DB, USERS, "1", &User::named("a"))
        .await
        .unwrap();

    let err = c
        .store
        .read::<Profile>(&c.scope, DB, USERS, &doc! { "name": "a" })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Decoding(_)));
}

#[tokio::test]
async fn read_takes_first_match() {
    let c = connected().await;
    for (id, name) in [("1", "first"), ("2", "second")] {
        c.store
            .create(&c.scope, DB, "pets", id, &doc! { "kind": "cat", "name": name })
            .await
            .unwrap();
    }

    let pet: pucci::Fields = c
        .store
        .read(&c.scope, DB, "pets", &doc! { "kind": "cat" })
        .await
        .unwrap();
    assert_eq!(pet.get_str("name").unwrap(), "first");
}

// ============================================================================
// EncodingError
// ============================================================================

#[tokio::test]
async fn non_map_documents_fail_to_encode() {
    let c = connected().await;

    let err = c
        .store
        .create(&c.scope, DB, USERS, "1", "plain string")
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Encoding(_)));

    let err = c
        .store
        .update(&c.scope, DB, USERS, &doc! {}, &[1, 2, 3])
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Encoding(_)));

    assert!(c.backend.is_empty(DB, USERS));
}

// ============================================================================
// Update
// ============================================================================

#[tokio::test]
async fn update_without_match_is_not_found_and_changes_nothing() {
    let c = connected().await;
    c.store
        .create(&c.scope, DB, USERS, "1", &User::named("a"))
        .await
        .unwrap();

    let err = c
        .store
        .update(&c.scope, DB, USERS, &doc! { "name": "zz" }, &User::named("b"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let user: User = c.store.read_by_id(&c.scope, DB, USERS, "1").await.unwrap();
    assert_eq!(user, User::named("a"));
    assert_eq!(c.backend.len(DB, USERS), 1);
}

#[tokio::test]
async fn update_replaces_the_whole_document() {
    let c = connected().await;
    let profile = Profile {
        name: "a".into(),
        age: 1,
        tags: vec!["x".into()],
    };
    c.store
        .create(&c.scope, DB, "profiles", "1", &profile)
        .await
        .unwrap();

    c.store
        .update(&c.scope, DB, "profiles", &doc! { "name": "a" }, &User::named("b"))
        .await
        .unwrap();

    let stored: pucci::Fields = c
        .store
        .read_by_id(&c.scope, DB, "profiles", "1")
        .await
        .unwrap();
    assert_eq!(stored, doc! { "_id": "1", "name": "b" });
}

// Regression: replacement never changes the matched document's identifier,
// even when the replacement payload carries an `_id` of its own.
#[tokio::test]
async fn update_preserves_the_original_identifier() {
    let c = connected().await;
    c.store
        .create(&c.scope, DB, USERS, "42", &User::named("a"))
        .await
        .unwrap();

    c.store
        .update(
            &c.scope,
            DB,
            USERS,
            &doc! { "name": "a" },
            &doc! { "_id": "99", "name": "b" },
        )
        .await
        .unwrap();

    let (id, user) = c
        .store
        .read_with_id::<User>(&c.scope, DB, USERS, &doc! { "name": "b" })
        .await
        .unwrap();
    assert_eq!(id.to_string(), "42");
    assert_eq!(user, User::named("b"));

    let err = c
        .store
        .read_by_id::<User>(&c.scope, DB, USERS, "99")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

// ============================================================================
// Delete
// ============================================================================

#[tokio::test]
async fn delete_is_not_found_the_second_time() {
    let c = connected().await;

    let err = c.store.delete(&c.scope, DB, USERS, "7").await.unwrap_err();
    assert!(err.is_not_found());

    c.store
        .create(&c.scope, DB, USERS, "7", &User::named("a"))
        .await
        .unwrap();
    c.store.delete(&c.scope, DB, USERS, "7").await.unwrap();

    let err = c.store.delete(&c.scope, DB, USERS, "7").await.unwrap_err();
    assert!(err.is_not_found());

    let err = c
        .store
        .read::<User>(&c.scope, DB, USERS, &doc! { "_id": "7" })
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn delete_removes_only_the_addressed_document() {
    let c = connected().await;
    for id in ["1", "2", "3"] {
        c.store
            .create(&c.scope, DB, USERS, id, &User::named(id))
            .await
            .unwrap();
    }

    c.store.delete(&c.scope, DB, USERS, "2").await.unwrap();

    assert_eq!(c.backend.len(DB, USERS), 2);
    let one: User = c.store.read_by_id(&c.scope, DB, USERS, "1").await.unwrap();
    let three: User = c.store.read_by_id(&c.scope, DB, USERS, "3").await.unwrap();
    assert_eq!(one.name, "1");
    assert_eq!(three.name, "3");
}

// ============================================================================
// BackendError
// ============================================================================

#[tokio::test]
async fn backend_failures_wrap_the_cause() {
    let c = connected().await;
    c.backend.set_available(false);

    let err = c
        .store
        .create(&c.scope, DB, USERS, "1", &User::named("a"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Backend(_)));
    let cause = err
        .source()
        .and_then(|source| source.downcast_ref::<MemoryError>())
        .expect("cause is the backend's own error");
    assert_eq!(cause, &MemoryError::Unavailable);

    for err in [
        c.store
            .read::<User>(&c.scope, DB, USERS, &doc! {})
            .await
            .unwrap_err(),
        c.store
            .update(&c.scope, DB, USERS, &doc! {}, &User::named("b"))
            .await
            .unwrap_err(),
        c.store.delete(&c.scope, DB, USERS, "1").await.unwrap_err(),
    ] {
        assert!(matches!(err, StoreError::Backend(_)), "got {:?}", err);
    }
}
