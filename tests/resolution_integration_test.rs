//! Resolution integration tests
//!
//! End-to-end resolution through the services: base snapshot selection,
//! overlay ordering, validity windows, provenance and the audit trail.

mod common;

use chrono::{Duration, Utc};
use common::{base_snapshot, context, snapshot_event, Store};
use engram::domain::errors::DomainError;
use engram::domain::models::{Context, NewOverlay};
use engram::domain::ports::ResolutionLogRepository;
use engram::services::ResolutionAudit;
use serde_json::json;

async fn seeded_revenue(store: &Store, dimensions: serde_json::Value) {
    store.register("default", "revenue").await;
    store
        .event_log()
        .append(
            "default",
            "revenue",
            snapshot_event(json!({
                "definition": {
                    "display": "Revenue",
                    "logic": {"type": "sum", "field": "amount", "filters": [{"field": "status", "op": "=", "value": "paid"}]}
                },
                "dimensions": dimensions,
                "grain": "day"
            })),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_dimensions_key_replaces_base_list() {
    let store = Store::in_memory().await;
    seeded_revenue(&store, json!(["country", "channel"])).await;
    store
        .overlay_service()
        .create("default", "revenue", NewOverlay::new(json!({"dimensions": ["channel", "campaign"]})))
        .await
        .unwrap();

    let resolved = store.resolver().resolve("default", "revenue", &Context::new()).await.unwrap();
    assert_eq!(resolved.resolved_snapshot["dimensions"], json!(["channel", "campaign"]));
    assert_eq!(resolved.resolved_snapshot["grain"], "day");
}

#[tokio::test]
async fn test_dimension_ops_edit_base_list() {
    let store = Store::in_memory().await;
    seeded_revenue(&store, json!(["a", "b", "c"])).await;
    store
        .overlay_service()
        .create(
            "default",
            "revenue",
            NewOverlay::new(json!({"dimensions_remove": ["b"], "dimensions_add": ["d", "a"]})),
        )
        .await
        .unwrap();

    let resolved = store.resolver().resolve("default", "revenue", &Context::new()).await.unwrap();
    assert_eq!(resolved.resolved_snapshot["dimensions"], json!(["a", "c", "d"]));
    assert!(resolved.resolved_snapshot.get("dimensions_add").is_none());
}

#[tokio::test]
async fn test_priority_then_specificity_order() {
    let store = Store::in_memory().await;
    seeded_revenue(&store, json!([])).await;
    let overlays = store.overlay_service();
    let marketing = context(&[("team", "marketing")]);
    let weekly = context(&[("team", "marketing"), ("use_case", "weekly")]);

    let broad = overlays
        .create(
            "default",
            "revenue",
            NewOverlay::new(json!({"grain": "week", "owner": "broad", "dimensions_add": ["campaign"]}))
                .with_selector(marketing.clone()),
        )
        .await
        .unwrap();
    let specific = overlays
        .create(
            "default",
            "revenue",
            NewOverlay::new(json!({"grain": "week", "owner": "specific", "label": "weekly"}))
                .with_selector(weekly.clone()),
        )
        .await
        .unwrap();
    let urgent = overlays
        .create(
            "default",
            "revenue",
            NewOverlay::new(json!({"owner": "urgent"}))
                .with_selector(marketing)
                .with_priority(10),
        )
        .await
        .unwrap();

    let resolved = store.resolver().resolve("default", "revenue", &weekly).await.unwrap();
    assert_eq!(
        resolved.applied_overlay_ids,
        vec![broad.overlay_id, specific.overlay_id, urgent.overlay_id]
    );
    assert_eq!(resolved.resolved_snapshot["owner"], "urgent");
    assert_eq!(resolved.resolved_snapshot["label"], "weekly");
    assert_eq!(resolved.resolved_snapshot["dimensions"], json!(["campaign"]));
}

#[tokio::test]
async fn test_validity_windows_exclude_future_and_expired() {
    let store = Store::in_memory().await;
    seeded_revenue(&store, json!([])).await;
    let overlays = store.overlay_service();
    let now = Utc::now();

    overlays
        .create(
            "default",
            "revenue",
            NewOverlay::new(json!({"future": true})).with_window(Some(now + Duration::days(1)), None),
        )
        .await
        .unwrap();
    overlays
        .create(
            "default",
            "revenue",
            NewOverlay::new(json!({"expired": true})).with_window(None, Some(now - Duration::days(1))),
        )
        .await
        .unwrap();
    let always = overlays
        .create("default", "revenue", NewOverlay::new(json!({"always": true})))
        .await
        .unwrap();

    let resolved = store.resolver().resolve_at("default", "revenue", &Context::new(), now).await.unwrap();
    assert_eq!(resolved.applied_overlay_ids, vec![always.overlay_id]);
    assert!(resolved.resolved_snapshot.get("future").is_none());
    assert!(resolved.resolved_snapshot.get("expired").is_none());

    let later = store
        .resolver()
        .resolve_at("default", "revenue", &Context::new(), now + Duration::days(2))
        .await
        .unwrap();
    assert_eq!(later.applied_overlay_ids.len(), 2);
    assert_eq!(later.resolved_snapshot["future"], true);
}

#[tokio::test]
async fn test_filter_ops_through_resolution() {
    let store = Store::in_memory().await;
    seeded_revenue(&store, json!([])).await;
    store
        .overlay_service()
        .create(
            "default",
            "revenue",
            NewOverlay::new(json!({
                "filters_remove": [{"field": "status", "op": "=", "value": "paid"}],
                "filters_add": [{"field": "region", "op": "=", "value": "eu"}]
            }))
            .with_selector(context(&[("region", "eu")])),
        )
        .await
        .unwrap();

    let eu = store
        .resolver()
        .resolve("default", "revenue", &context(&[("region", "eu")]))
        .await
        .unwrap();
    assert_eq!(
        eu.resolved_snapshot["definition"]["logic"]["filters"],
        json!([{"field": "region", "op": "=", "value": "eu"}])
    );

    let us = store
        .resolver()
        .resolve("default", "revenue", &context(&[("region", "us")]))
        .await
        .unwrap();
    assert_eq!(us.resolved_snapshot["definition"]["logic"]["filters"][0]["value"], "paid");
}

#[tokio::test]
async fn test_unknown_metric_is_not_found_without_writes() {
    let store = Store::in_memory().await;
    store.register("default", "revenue").await;

    let (handle, worker) = ResolutionAudit::spawn(store.resolution_log.clone(), 4);
    let resolver = store.resolver().with_audit(handle);

    let err = resolver.resolve("default", "revenue", &Context::new()).await.unwrap_err();
    assert!(matches!(err, DomainError::MetricNotFound { .. }));
    let err = resolver.resolve("default", "missing", &Context::new()).await.unwrap_err();
    assert!(err.is_not_found());

    drop(resolver);
    assert_eq!(worker.await.unwrap(), 0);
    assert!(store.resolution_log.list_recent("default", 10).await.unwrap().is_empty());
    assert!(store.event_log().get_latest("default", "revenue").await.unwrap().is_none());
}

#[tokio::test]
async fn test_provenance_tracks_latest_version() {
    let store = Store::in_memory().await;
    seeded_revenue(&store, json!(["country"])).await;
    let second = store
        .event_log()
        .append(
            "default",
            "revenue",
            engram::domain::models::NewSemanticEvent::new("edit", "console", {
                let mut snapshot = base_snapshot();
                snapshot["grain"] = json!("hour");
                snapshot
            })
                .with_source_ref(json!({"ticket": "MET-42"}))
                .with_actor("ana"),
        )
        .await
        .unwrap();

    let resolved = store.resolver().resolve("default", "revenue", &Context::new()).await.unwrap();
    assert_eq!(resolved.base_version_id, 2);
    assert_eq!(resolved.resolved_snapshot["grain"], "hour");
    assert!(resolved.resolved_snapshot.get("dimensions").is_none());
    assert_eq!(resolved.resolved_snapshot["definition"]["logic"]["field"], "amount");
    assert_eq!(resolved.provenance.source_system, "console");
    assert_eq!(resolved.provenance.source_ref, json!({"ticket": "MET-42"}));
    assert_eq!(resolved.provenance.timestamp, second.timestamp);
}

#[tokio::test]
async fn test_audit_records_each_resolution() {
    let store = Store::in_memory().await;
    seeded_revenue(&store, json!([])).await;
    let overlay = store
        .overlay_service()
        .create(
            "default",
            "revenue",
            NewOverlay::new(json!({"grain": "week"})).with_selector(context(&[("team", "marketing")])),
        )
        .await
        .unwrap();

    let (handle, worker) = ResolutionAudit::spawn(store.resolution_log.clone(), 16);
    let resolver = store.resolver().with_audit(handle);
    resolver.resolve("default", "revenue", &Context::new()).await.unwrap();
    resolver
        .resolve("default", "revenue", &context(&[("team", "marketing")]))
        .await
        .unwrap();
    drop(resolver);
    assert_eq!(worker.await.unwrap(), 2);

    let records = store.resolution_log.list_recent("default", 10).await.unwrap();
    assert_eq!(records.len(), 2);
    let with_overlay = records
        .iter()
        .find(|r| !r.applied_overlay_ids.is_empty())
        .expect("marketing resolution should be recorded");
    assert_eq!(with_overlay.applied_overlay_ids, vec![overlay.overlay_id]);
    assert_eq!(with_overlay.context, context(&[("team", "marketing")]));
}
