//! Integration tests: EventDispatcher → SideEffectCoordinator → in-memory collaborators.

use std::time::Duration;

use common::SubjectId;
use domain::{DomainEvent, EventEnvelope, EventKind};
use notifier::{
    CoordinatorConfig, EffectStatus, ErrorKind, EventDispatcher, HandlerState,
    InMemoryAudienceSync, InMemoryCustomerStore, InMemoryEmailSender, RenderContext,
    SideEffect, SideEffectCoordinator,
};
use projector::{Entity, InMemoryDataSource};
use serde_json::{Value, json};

type TestDispatcher = EventDispatcher<
    InMemoryDataSource,
    InMemoryEmailSender,
    InMemoryAudienceSync,
    InMemoryCustomerStore,
>;

struct Harness {
    dispatcher: TestDispatcher,
    source: InMemoryDataSource,
    email: InMemoryEmailSender,
    audience: InMemoryAudienceSync,
    customers: InMemoryCustomerStore,
}

fn order_row() -> Value {
    json!({
        "id": "ord_1",
        "display_id": 1001,
        "email": "a@b.com",
        "currency_code": "eur",
        "metadata": {"newsletter_subscribed": true},
        "items": [{"title": "Widget", "quantity": 2, "unit_price": 10, "tax_total": 0}],
        "shipping_address": {"first_name": "Sam", "last_name": "Lee"},
        "shipping_methods": [{"name": "Standard", "amount": 5, "tax_total": 0}],
        "customer": {"id": "cus_1", "email": "a@b.com", "first_name": "Guest"}
    })
}

fn config() -> CoordinatorConfig {
    CoordinatorConfig {
        from_email: "orders@shop.test".into(),
        audience_id: Some("aud_1".into()),
        call_timeout: Duration::from_secs(2),
        render: RenderContext {
            store_name: "Test Shop".into(),
            ..RenderContext::default()
        },
    }
}

fn harness_with(rows: Vec<(Entity, Value)>, config: CoordinatorConfig) -> Harness {
    let source = InMemoryDataSource::new();
    for (entity, row) in rows {
        source.insert(entity, row);
    }
    let email = InMemoryEmailSender::new();
    let audience = InMemoryAudienceSync::new();
    let customers = InMemoryCustomerStore::new();

    let coordinator = SideEffectCoordinator::new(
        source.clone(),
        email.clone(),
        audience.clone(),
        customers.clone(),
        config,
    );
    Harness {
        dispatcher: EventDispatcher::new(coordinator),
        source,
        email,
        audience,
        customers,
    }
}

fn harness() -> Harness {
    harness_with(
        vec![
            (Entity::Order, order_row()),
            (
                Entity::Fulfillment,
                json!({
                    "id": "ful_1",
                    "labels": [],
                    "order": {"email": "a@b.com", "display_id": 1001,
                              "shipping_address": {"first_name": "Sam"}}
                }),
            ),
            (
                Entity::Customer,
                json!({"id": "cus_9", "email": "new@b.com", "first_name": "Ada"}),
            ),
        ],
        config(),
    )
}

fn event(kind: EventKind, subject: &str) -> EventEnvelope {
    EventEnvelope::new(DomainEvent::new(kind, subject))
}

#[tokio::test]
async fn test_order_placed_runs_all_effects_in_order() {
    let h = harness();

    let outcome = h.dispatcher.dispatch(&event(EventKind::OrderPlaced, "ord_1")).await;

    assert!(outcome.delivered);
    assert_eq!(outcome.error, None);
    assert_eq!(outcome.recipient.as_deref(), Some("a@b.com"));
    assert_eq!(
        outcome.states,
        vec![
            HandlerState::Fetching,
            HandlerState::Deriving,
            HandlerState::Rendering,
            HandlerState::Dispatching,
            HandlerState::Done,
        ]
    );
    let order: Vec<SideEffect> = outcome.effects.iter().map(|e| e.effect).collect();
    assert_eq!(
        order,
        vec![SideEffect::CustomerPatch, SideEffect::NewsletterContact, SideEffect::Email]
    );

    let sent = h.email.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "a@b.com");
    assert_eq!(sent[0].from, "orders@shop.test");
    assert!(sent[0].subject.contains("1001"));
    assert!(sent[0].html.contains("Widget"));
    assert!(sent[0].html.contains("25,00"));
    assert!(sent[0].html.contains("[ TEST SHOP ]"));

    let patches = h.customers.patches_for(&SubjectId::new("cus_1"));
    assert_eq!(patches.len(), 1);
    assert_eq!(patches[0].first_name.as_deref(), Some("Sam"));

    let contacts = h.audience.contacts();
    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts[0].first_name, "Sam");
    assert_eq!(contacts[0].audience_id, "aud_1");
}

#[tokio::test]
async fn test_not_found_performs_no_side_effects() {
    let h = harness();

    for kind in EventKind::ALL {
        let outcome = h.dispatcher.dispatch(&event(kind, "missing")).await;
        assert!(outcome.is_not_found(), "{kind}");
        assert!(!outcome.delivered);
        assert!(outcome.effects.is_empty());
        assert_eq!(outcome.states, vec![HandlerState::Fetching, HandlerState::Done]);
    }

    assert_eq!(h.email.attempts(), 0);
    assert_eq!(h.audience.attempts(), 0);
    assert_eq!(h.customers.patch_count(), 0);
}

#[tokio::test]
async fn test_customer_store_failure_still_sends_email() {
    let h = harness();
    h.customers.set_fail_on_patch(true);

    let outcome = h.dispatcher.dispatch(&event(EventKind::OrderPlaced, "ord_1")).await;

    assert!(outcome.delivered);
    assert_eq!(outcome.error, Some(ErrorKind::IntegrationFailure));
    assert_eq!(
        outcome.effect(SideEffect::CustomerPatch).unwrap().status,
        EffectStatus::Failed
    );
    assert_eq!(
        outcome.effect(SideEffect::NewsletterContact).unwrap().status,
        EffectStatus::Succeeded
    );
    assert_eq!(h.email.sent_count(), 1);
}

#[tokio::test]
async fn test_audience_failure_still_sends_email() {
    let h = harness();
    h.audience.set_fail_on_upsert(true);

    let outcome = h.dispatcher.dispatch(&event(EventKind::OrderPlaced, "ord_1")).await;

    assert!(outcome.delivered);
    assert_eq!(
        outcome.effect(SideEffect::NewsletterContact).unwrap().status,
        EffectStatus::Failed
    );
    assert_eq!(h.email.sent_count(), 1);
}

#[tokio::test]
async fn test_no_name_patch_when_customer_has_real_name() {
    let mut row = order_row();
    row["customer"]["first_name"] = json!("Alex");
    let h = harness_with(vec![(Entity::Order, row)], config());

    let outcome = h.dispatcher.dispatch(&event(EventKind::OrderPlaced, "ord_1")).await;

    assert_eq!(
        outcome.effect(SideEffect::CustomerPatch).unwrap().status,
        EffectStatus::Skipped
    );
    assert_eq!(h.customers.patch_count(), 0);
    assert!(outcome.delivered);
}

#[tokio::test]
async fn test_no_name_patch_without_shipping_first_name() {
    let mut row = order_row();
    row["shipping_address"] = json!({"last_name": "Lee"});
    let h = harness_with(vec![(Entity::Order, row)], config());

    let outcome = h.dispatcher.dispatch(&event(EventKind::OrderPlaced, "ord_1")).await;

    assert_eq!(
        outcome.effect(SideEffect::CustomerPatch).unwrap().status,
        EffectStatus::Skipped
    );
    assert_eq!(h.customers.patch_count(), 0);
    // Newsletter contact falls back to the placeholder name.
    assert_eq!(h.audience.contacts()[0].first_name, "Guest");
}

#[tokio::test]
async fn test_newsletter_skipped_without_audience() {
    let h = harness_with(
        vec![(Entity::Order, order_row())],
        CoordinatorConfig {
            audience_id: None,
            ..config()
        },
    );

    let outcome = h.dispatcher.dispatch(&event(EventKind::OrderPlaced, "ord_1")).await;

    assert_eq!(
        outcome.effect(SideEffect::NewsletterContact).unwrap().status,
        EffectStatus::Skipped
    );
    assert_eq!(h.audience.attempts(), 0);
}

#[tokio::test]
async fn test_shipment_without_tracking_uses_placeholders() {
    let h = harness();

    let outcome = h
        .dispatcher
        .dispatch(&event(EventKind::ShipmentCreated, "ful_1"))
        .await;

    assert!(outcome.delivered);
    assert_eq!(
        outcome.states,
        vec![
            HandlerState::Fetching,
            HandlerState::Rendering,
            HandlerState::Dispatching,
            HandlerState::Done,
        ]
    );
    let sent = h.email.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Order #1001 Shipped");
    assert!(sent[0].html.contains("N/A"));
    assert!(sent[0].html.contains(r##"href="#""##));
}

#[tokio::test]
async fn test_shipment_with_tracking_label() {
    let h = harness_with(
        vec![(
            Entity::Fulfillment,
            json!({
                "id": "ful_2",
                "labels": [{"tracking_number": "TRK123", "tracking_url": "https://track.test/TRK123"}],
                "order": {"email": "a@b.com", "display_id": 1001}
            }),
        )],
        config(),
    );

    h.dispatcher
        .dispatch(&event(EventKind::ShipmentCreated, "ful_2"))
        .await;

    let html = &h.email.sent()[0].html;
    assert!(html.contains("TRK123"));
    assert!(html.contains("https://track.test/TRK123"));
}

#[tokio::test]
async fn test_delivery_cancellation_and_welcome_emails() {
    let h = harness();

    let delivered = h
        .dispatcher
        .dispatch(&event(EventKind::FulfillmentDelivered, "ful_1"))
        .await;
    let canceled = h
        .dispatcher
        .dispatch(&event(EventKind::OrderCanceled, "ord_1"))
        .await;
    let welcome = h
        .dispatcher
        .dispatch(&event(EventKind::CustomerCreated, "cus_9"))
        .await;

    assert!(delivered.delivered && canceled.delivered && welcome.delivered);
    let subjects: Vec<String> = h.email.sent().into_iter().map(|m| m.subject).collect();
    assert_eq!(
        subjects,
        vec![
            "Order #1001 Delivered".to_string(),
            "Order #1001 Canceled".to_string(),
            "Welcome to Test Shop".to_string(),
        ]
    );
    assert_eq!(welcome.recipient.as_deref(), Some("new@b.com"));
    // Only the order-placed handler touches the customer or the audience.
    assert_eq!(h.customers.patch_count(), 0);
    assert_eq!(h.audience.attempts(), 0);
}

#[tokio::test]
async fn test_missing_email_is_malformed() {
    let mut row = order_row();
    row.as_object_mut().unwrap().remove("email");
    let h = harness_with(vec![(Entity::Order, row)], config());

    let outcome = h.dispatcher.dispatch(&event(EventKind::OrderPlaced, "ord_1")).await;

    assert!(!outcome.delivered);
    assert_eq!(outcome.error, Some(ErrorKind::MalformedRecord));
    let email = outcome.effect(SideEffect::Email).unwrap();
    assert_eq!(email.status, EffectStatus::Failed);
    assert_eq!(email.error, Some(ErrorKind::MalformedRecord));
    assert_eq!(h.email.attempts(), 0);
    // The patch does not depend on the recipient.
    assert_eq!(h.customers.patch_count(), 1);
}

#[tokio::test]
async fn test_data_source_failure_is_integration_failure() {
    let h = harness();
    h.source.set_fail_on_query(true);

    let outcome = h.dispatcher.dispatch(&event(EventKind::OrderPlaced, "ord_1")).await;

    assert_eq!(outcome.error, Some(ErrorKind::IntegrationFailure));
    assert!(outcome.effects.is_empty());
    assert_eq!(h.email.attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_slow_email_provider_times_out() {
    let h = harness();
    h.email.set_delay(Some(Duration::from_secs(30)));

    let outcome = h.dispatcher.dispatch(&event(EventKind::OrderPlaced, "ord_1")).await;

    assert!(!outcome.delivered);
    let email = outcome.effect(SideEffect::Email).unwrap();
    assert_eq!(email.status, EffectStatus::Failed);
    assert_eq!(email.error, Some(ErrorKind::IntegrationFailure));
    assert!(email.detail.as_deref().unwrap().contains("timed out"));
    assert_eq!(outcome.states.last(), Some(&HandlerState::Done));
}

#[tokio::test]
async fn test_dispatch_raw_ignores_unknown_names() {
    let h = harness();

    let outcome = h.dispatcher.dispatch_raw("product.updated", "prod_1", None).await;

    assert!(outcome.is_none());
    assert_eq!(h.source.query_count(), 0);
    assert_eq!(h.email.attempts(), 0);
}

#[tokio::test]
async fn test_dispatch_raw_accepts_delivery_alias() {
    let h = harness();

    let outcome = h
        .dispatcher
        .dispatch_raw("delivery.created", "ful_1", None)
        .await
        .unwrap();

    assert_eq!(outcome.kind, EventKind::FulfillmentDelivered);
    assert!(outcome.delivered);
}

#[tokio::test]
async fn test_dispatch_all_isolates_failures() {
    let h = harness();

    let outcomes = h
        .dispatcher
        .dispatch_all(
            vec![
                event(EventKind::OrderPlaced, "ord_1"),
                event(EventKind::OrderPlaced, "missing"),
                event(EventKind::ShipmentCreated, "ful_1"),
                event(EventKind::CustomerCreated, "cus_9"),
            ],
            2,
        )
        .await;

    assert_eq!(outcomes.len(), 4);
    assert_eq!(outcomes.iter().filter(|o| o.delivered).count(), 3);
    assert_eq!(outcomes.iter().filter(|o| o.is_not_found()).count(), 1);
    assert_eq!(h.email.sent_count(), 3);
}

#[tokio::test]
async fn test_redelivery_renders_identical_email() {
    let h = harness();
    let envelope = event(EventKind::OrderPlaced, "ord_1");

    let first = h.dispatcher.dispatch(&envelope).await;
    let second = h.dispatcher.dispatch(&envelope).await;

    assert_eq!(first.event_id, second.event_id);
    let sent = h.email.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0], sent[1]);
}
