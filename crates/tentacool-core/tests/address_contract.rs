//! Contract Test: Address Reconciliation
//!
//! Constraints verified:
//! - Create allocates decimal ids and round-trips through Get
//! - Numeric caller ids and colliding ids are rejected before any live change
//! - Update removes the previous declaration strictly before applying the next
//! - Update of an undeclared id is NotFound; only the bootstrap path upserts
//! - A started transition survives its caller being dropped
//! - The store key, not the stored value, is the record id
//! - Delete removes live state before forgetting the declaration
//! - A failed apply leaves the store untouched (default policy)

mod common;

use common::*;
use std::sync::Arc;
use std::time::Duration;
use tentacool_core::records::{AddressRecord, Domain};
use tentacool_core::traits::ConfigStore;
use tentacool_core::{ApplyStatus, Error, ReconcilerConfig};

#[tokio::test]
async fn create_allocates_id_and_round_trips() {
    let (reconcilers, fakes, _store) = reconcilers();

    let created = reconcilers
        .address
        .create(lan("192.168.1.10/24"))
        .await
        .expect("create succeeds");

    assert_eq!(created.record.id, "1");
    assert_eq!(created.status, ApplyStatus::Applied);

    let fetched = reconcilers.address.get("1").await.unwrap();
    assert_eq!(fetched, AddressRecord::new("1", "eth0", "192.168.1.10/24"));
    assert_eq!(fakes.address.calls(), vec![Call::Apply(fetched)]);

    let second = reconcilers.address.create(lan("192.168.1.11/24")).await.unwrap();
    assert_eq!(second.record.id, "2");
}

#[tokio::test]
async fn numeric_caller_id_is_rejected() {
    let (reconcilers, fakes, store) = reconcilers();

    for id in ["0", "7", "18446744073709551615"] {
        let err = reconcilers
            .address
            .create(AddressRecord::new(id, "eth0", "10.0.0.1/8"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)), "id {id}: {err}");
    }

    assert_eq!(fakes.address.apply_count(), 0);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn colliding_id_is_conflict() {
    let (reconcilers, fakes, _store) = reconcilers();

    reconcilers
        .address
        .create(AddressRecord::new("wan", "eth1", "203.0.113.5/24"))
        .await
        .unwrap();

    let err = reconcilers
        .address
        .create(AddressRecord::new("wan", "eth0", "10.0.0.1/8"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Conflict(_)));
    assert_eq!(fakes.address.apply_count(), 1);
    assert_eq!(
        reconcilers.address.get("wan").await.unwrap().ip,
        "203.0.113.5/24"
    );
}

#[tokio::test]
async fn invalid_record_touches_nothing() {
    let (reconcilers, fakes, store) = reconcilers();

    for record in [
        AddressRecord::new("", "eth0", "192.168.1.10"),
        AddressRecord::new("", "eth0", "192.168.1.10/33"),
        AddressRecord::new("", "", "192.168.1.10/24"),
    ] {
        let err = reconcilers.address.create(record).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    assert!(fakes.address.calls().is_empty());
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn allocation_skips_ids_taken_outside_the_sequence() {
    let (reconcilers, _fakes, _store) = reconcilers();

    // The bootstrap path may declare numeric ids directly
    reconcilers
        .address
        .reconcile(AddressRecord::new("1", "eth0", "10.0.0.1/8"))
        .await
        .unwrap();

    let created = reconcilers.address.create(lan("10.0.0.2/8")).await.unwrap();
    assert_eq!(created.record.id, "2");
}

#[tokio::test]
async fn update_removes_previous_before_applying_next() {
    let (reconcilers, fakes, _store) = reconcilers();

    let created = reconcilers.address.create(lan("192.168.1.10/24")).await.unwrap();
    fakes.address.clear();

    let next = AddressRecord::new("1", "eth0", "192.168.1.20/24");
    let updated = reconcilers
        .address
        .update("1", next.clone())
        .await
        .unwrap();

    assert!(updated.is_applied());
    assert_eq!(
        fakes.address.calls(),
        vec![Call::Remove(created.record), Call::Apply(next.clone())]
    );
    assert_eq!(reconcilers.address.get("1").await.unwrap(), next);
}

#[tokio::test]
async fn equal_update_reapplies_without_remove() {
    let (reconcilers, fakes, _store) = reconcilers();

    let created = reconcilers.address.create(lan("192.168.1.10/24")).await.unwrap();
    fakes.address.clear();

    reconcilers
        .address
        .update("1", created.record.clone())
        .await
        .unwrap();

    assert_eq!(fakes.address.calls(), vec![Call::Apply(created.record)]);
}

#[tokio::test]
async fn update_uses_path_id() {
    let (reconcilers, _fakes, _store) = reconcilers();
    reconcilers.address.create(lan("192.168.1.10/24")).await.unwrap();

    let updated = reconcilers
        .address
        .update("1", AddressRecord::new("other", "eth0", "192.168.1.30/24"))
        .await
        .unwrap();

    assert_eq!(updated.record.id, "1");
    assert!(reconcilers.address.get("other").await.is_err());
}

#[tokio::test]
async fn update_of_unknown_id_is_not_found() {
    let (reconcilers, fakes, store) = reconcilers();

    for id in ["lan", "5"] {
        let err = reconcilers
            .address
            .update(id, AddressRecord::new("", "eth1", "10.1.0.1/16"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)), "id {id}: {err}");
    }

    assert!(fakes.address.calls().is_empty());
    assert!(store.is_empty().await);

    // Allocation is unaffected
    let created = reconcilers.address.create(lan("10.0.0.1/8")).await.unwrap();
    assert_eq!(created.record.id, "1");
}

#[tokio::test]
async fn reconcile_of_unknown_id_creates_without_remove() {
    let (reconcilers, fakes, _store) = reconcilers();

    reconcilers
        .address
        .reconcile(AddressRecord::new("lan", "eth1", "10.1.0.1/16"))
        .await
        .unwrap();

    assert_eq!(fakes.address.remove_count(), 0);
    assert_eq!(fakes.address.apply_count(), 1);
    assert_eq!(reconcilers.address.get("lan").await.unwrap().link, "eth1");
}

#[tokio::test]
async fn stored_key_is_the_record_id() {
    let (reconcilers, _fakes, store) = reconcilers();

    store
        .put(
            Domain::Address,
            "7",
            serde_json::json!({"link": "eth0", "ip": "10.0.0.1/24"}),
        )
        .await
        .unwrap();
    store
        .put(
            Domain::Address,
            "wan",
            serde_json::json!({"id": "lan", "link": "eth1", "ip": "203.0.113.5/24"}),
        )
        .await
        .unwrap();

    let listed = reconcilers.address.list().await.unwrap();
    assert_eq!(
        listed,
        vec![
            AddressRecord::new("7", "eth0", "10.0.0.1/24"),
            AddressRecord::new("wan", "eth1", "203.0.113.5/24"),
        ]
    );
    assert_eq!(reconcilers.address.get("7").await.unwrap().id, "7");

    let deleted = reconcilers.address.delete("wan").await.unwrap();
    assert_eq!(deleted.id, "wan");
    assert!(reconcilers.address.get("lan").await.is_err());
}

#[tokio::test]
async fn delete_semantics() {
    let (reconcilers, fakes, _store) = reconcilers();

    let err = reconcilers.address.delete("1").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert!(fakes.address.calls().is_empty());

    let created = reconcilers.address.create(lan("192.168.1.10/24")).await.unwrap();

    // A failed remove keeps the declaration
    fakes.address.fail_remove(true);
    let err = reconcilers.address.delete("1").await.unwrap_err();
    assert!(matches!(err, Error::SystemApply { .. }));
    assert!(reconcilers.address.get("1").await.is_ok());

    fakes.address.fail_remove(false);
    let deleted = reconcilers.address.delete("1").await.unwrap();
    assert_eq!(deleted, created.record);

    let err = reconcilers.address.get("1").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(fakes.address.remove_count(), 2);
}

#[tokio::test]
async fn list_follows_store_order() {
    let (reconcilers, _fakes, _store) = reconcilers();

    reconcilers
        .address
        .create(AddressRecord::new("wan", "eth1", "203.0.113.5/24"))
        .await
        .unwrap();
    reconcilers.address.create(lan("192.168.1.10/24")).await.unwrap();
    reconcilers
        .address
        .update("wan", AddressRecord::new("", "eth1", "203.0.113.6/24"))
        .await
        .unwrap();

    let ids: Vec<String> = reconcilers
        .address
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|record| record.id)
        .collect();
    assert_eq!(ids, vec!["wan", "1"]);
}

#[tokio::test]
async fn failed_apply_stores_nothing() {
    let (reconcilers, fakes, store) = reconcilers();
    fakes.address.fail_every_apply(true);

    let err = reconcilers
        .address
        .create(AddressRecord::new("lan", "eth0", "192.168.1.10/24"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::SystemApply { .. }));
    assert!(store.list(Domain::Address).await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_update_restores_previous_live_state() {
    let (reconcilers, fakes, _store) = reconcilers();

    let created = reconcilers.address.create(lan("192.168.1.10/24")).await.unwrap();
    let next = AddressRecord::new("1", "eth0", "192.168.1.20/24");
    fakes.address.fail_apply_of(next.clone());
    fakes.address.clear();

    let err = reconcilers.address.update("1", next.clone()).await.unwrap_err();
    assert!(matches!(err, Error::SystemApply { .. }));

    assert_eq!(
        fakes.address.calls(),
        vec![
            Call::Remove(created.record.clone()),
            Call::Apply(next),
            Call::Apply(created.record.clone()),
        ]
    );
    assert_eq!(reconcilers.address.get("1").await.unwrap(), created.record);
}

#[tokio::test]
async fn persist_on_apply_failure_reports_degraded_outcome() {
    let store = Arc::new(tentacool_core::MemoryConfigStore::new());
    let config = ReconcilerConfig {
        persist_on_apply_failure: true,
        ..ReconcilerConfig::default()
    };
    let (reconcilers, fakes) = reconcilers_with(store, config);
    fakes.address.fail_every_apply(true);

    let outcome = reconcilers.address.create(lan("192.168.1.10/24")).await.unwrap();

    assert!(matches!(outcome.status, ApplyStatus::ApplyFailed(_)));
    assert_eq!(reconcilers.address.get("1").await.unwrap(), outcome.record);
}

#[tokio::test]
async fn persistence_failure_after_apply_is_reported() {
    let store = Arc::new(FailingStore::new());
    let (reconcilers, fakes) = reconcilers_with(store.clone(), ReconcilerConfig::default());

    reconcilers
        .address
        .create(AddressRecord::new("lan", "eth0", "192.168.1.10/24"))
        .await
        .unwrap();

    store.fail_writes(true);
    let err = reconcilers
        .address
        .update("lan", AddressRecord::new("", "eth0", "192.168.1.20/24"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Persistence(_)));
    // Live change is not rolled back
    assert_eq!(fakes.address.apply_count(), 2);
    assert_eq!(
        reconcilers.address.get("lan").await.unwrap().ip,
        "192.168.1.10/24"
    );
}

#[tokio::test(start_paused = true)]
async fn hung_adapter_times_out() {
    let store = Arc::new(tentacool_core::MemoryConfigStore::new());
    let config = ReconcilerConfig {
        adapter_timeout_secs: 5,
        ..ReconcilerConfig::default()
    };
    let (reconcilers, fakes) = reconcilers_with(store.clone(), config);
    fakes.address.set_delay(Duration::from_secs(3600));

    let err = reconcilers
        .address
        .create(lan("192.168.1.10/24"))
        .await
        .unwrap_err();

    match err {
        Error::SystemApply { adapter, message } => {
            assert_eq!(adapter, "address");
            assert!(message.contains("timed out"), "{message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(store.list(Domain::Address).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn dropped_caller_does_not_cut_update_short() {
    let (reconcilers, fakes, _store) = reconcilers();

    let created = reconcilers.address.create(lan("192.168.1.10/24")).await.unwrap();
    fakes.address.clear();
    fakes.address.set_delay(Duration::from_secs(5));

    let next = AddressRecord::new("1", "eth0", "192.168.1.20/24");
    let dropped = tokio::time::timeout(
        Duration::from_secs(1),
        reconcilers.address.update("1", next.clone()),
    )
    .await;
    assert!(dropped.is_err());

    // The started transition finishes on its own
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(
        fakes.address.calls(),
        vec![Call::Remove(created.record), Call::Apply(next.clone())]
    );
    assert_eq!(reconcilers.address.get("1").await.unwrap(), next);
}

#[tokio::test]
async fn concurrent_updates_of_one_key_do_not_interleave() {
    let (reconcilers, fakes, _store) = reconcilers();

    let first = reconcilers
        .address
        .create(AddressRecord::new("lan", "eth0", "10.0.0.1/8"))
        .await
        .unwrap()
        .record;
    fakes.address.clear();
    fakes.address.set_delay(Duration::from_millis(20));

    let a = AddressRecord::new("lan", "eth0", "10.0.0.2/8");
    let b = AddressRecord::new("lan", "eth0", "10.0.0.3/8");

    let task_a = {
        let reconcilers = reconcilers.clone();
        let a = a.clone();
        tokio::spawn(async move { reconcilers.address.update("lan", a).await })
    };
    let task_b = {
        let reconcilers = reconcilers.clone();
        let b = b.clone();
        tokio::spawn(async move { reconcilers.address.update("lan", b).await })
    };
    task_a.await.unwrap().unwrap();
    task_b.await.unwrap().unwrap();

    let calls = fakes.address.calls();
    let a_then_b = vec![
        Call::Remove(first.clone()),
        Call::Apply(a.clone()),
        Call::Remove(a.clone()),
        Call::Apply(b.clone()),
    ];
    let b_then_a = vec![
        Call::Remove(first),
        Call::Apply(b.clone()),
        Call::Remove(b),
        Call::Apply(a),
    ];
    assert!(
        calls == a_then_b || calls == b_then_a,
        "calls interleaved: {calls:?}"
    );
}

#[tokio::test]
async fn concurrent_creates_get_distinct_ids() {
    let (reconcilers, _fakes, _store) = reconcilers();

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let reconcilers = reconcilers.clone();
            tokio::spawn(async move {
                reconcilers
                    .address
                    .create(lan(&format!("10.0.0.{}/8", i + 1)))
                    .await
                    .unwrap()
                    .record
                    .id
            })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().parse::<u64>().unwrap());
    }
    ids.sort_unstable();

    assert_eq!(ids, (1..=16).collect::<Vec<u64>>());
}
