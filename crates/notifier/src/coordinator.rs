//! Side-effect coordinator: one handler per event kind.
//!
//! Every handler walks the same states (see [`HandlerState`]) and runs its
//! side effects one after another. Each outbound call is bounded by the
//! configured timeout, and a failed effect is recorded without stopping the
//! effects after it. Nothing here retries; redelivery is the bus's job.

use std::future::Future;
use std::time::{Duration, Instant};

use common::{EventId, SubjectId};
use domain::{Address, DomainError, EventKind, OrderRecord, derive_totals};
use projector::{DataSource, Record, RecordProjector};

use crate::error::{DispatchError, ErrorKind, IntegrationError};
use crate::outcome::{EffectOutcome, NotificationOutcome, SideEffect};
use crate::render::{Document, Notification, RenderContext, render};
use crate::services::{
    AudienceSync, ContactUpsert, CustomerPatch, CustomerStore, EmailMessage, EmailSender,
};
use crate::state::HandlerState;

/// First name given to newsletter contacts without a shipping first name.
pub const DEFAULT_CONTACT_NAME: &str = domain::records::GUEST_FIRST_NAME;

/// Settings shared by every handler.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Sender address of every email.
    pub from_email: String,
    /// Newsletter audience; opted-in buyers are only synced when set.
    pub audience_id: Option<String>,
    /// Upper bound for each outbound call.
    pub call_timeout: Duration,
    pub render: RenderContext,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            from_email: "orders@example.com".to_string(),
            audience_id: None,
            call_timeout: Duration::from_secs(5),
            render: RenderContext::default(),
        }
    }
}

/// The customer patch an order warrants, if any.
///
/// Applies only when the shipping address has a first name and the customer's
/// own first name is missing or still the guest placeholder.
pub fn name_patch(order: &OrderRecord) -> Option<(SubjectId, CustomerPatch)> {
    let first_name = order.shipping_first_name()?;
    let customer = order.customer.as_ref()?;
    if !customer.has_placeholder_name() {
        return None;
    }

    Some((
        customer.id.clone(),
        CustomerPatch {
            first_name: Some(first_name.to_string()),
            last_name: order
                .shipping_address
                .as_ref()
                .and_then(Address::last_name)
                .map(str::to_string),
        },
    ))
}

/// The newsletter contact an order warrants, if any.
pub fn newsletter_contact(order: &OrderRecord, audience_id: Option<&str>) -> Option<ContactUpsert> {
    let audience_id = audience_id.filter(|id| !id.trim().is_empty())?;
    if !order.newsletter_opt_in() {
        return None;
    }
    Some(ContactUpsert {
        email: order.email()?.to_string(),
        first_name: order
            .shipping_first_name()
            .unwrap_or(DEFAULT_CONTACT_NAME)
            .to_string(),
        unsubscribed: false,
        audience_id: audience_id.to_string(),
    })
}

/// Bookkeeping for one handler invocation.
struct Run {
    started: Instant,
    outcome: NotificationOutcome,
}

impl Run {
    fn start(event_id: EventId, kind: EventKind, subject_id: &SubjectId) -> Self {
        Self {
            started: Instant::now(),
            outcome: NotificationOutcome {
                event_id,
                kind,
                subject_id: subject_id.clone(),
                recipient: None,
                delivered: false,
                error: None,
                states: vec![HandlerState::Fetching],
                effects: Vec::new(),
            },
        }
    }

    fn state(&self) -> HandlerState {
        self.outcome.states.last().copied().unwrap_or_default()
    }

    fn advance(&mut self, next: HandlerState) {
        let current = self.state();
        if !current.can_transition_to(next) {
            tracing::warn!(from = %current, to = %next, "unexpected handler transition");
        }
        self.outcome.states.push(next);
    }

    fn note_error(&mut self, kind: ErrorKind) {
        self.outcome.error.get_or_insert(kind);
    }

    fn not_found(&mut self) {
        tracing::info!(subject_id = %self.outcome.subject_id, "subject not found, skipping");
        self.note_error(ErrorKind::NotFound);
    }

    fn failed(&mut self, err: &DispatchError) {
        let kind = err.kind();
        match kind {
            ErrorKind::MalformedRecord => tracing::warn!(error = %err, "malformed record"),
            _ => tracing::error!(error = %err, "handler step failed"),
        }
        self.note_error(kind);
    }

    fn effect(&mut self, outcome: EffectOutcome) {
        metrics::counter!(
            "side_effects_total",
            "effect" => outcome.effect.as_str(),
            "status" => outcome.status.as_str()
        )
        .increment(1);
        if let Some(kind) = outcome.error {
            self.note_error(kind);
        }
        self.outcome.effects.push(outcome);
    }

    fn effect_failed(&mut self, effect: SideEffect, err: DispatchError) {
        tracing::warn!(effect = %effect, error = %err, "side effect failed");
        self.effect(EffectOutcome::failed(effect, err.kind(), err.to_string()));
    }

    fn finish(mut self) -> NotificationOutcome {
        if !self.state().is_terminal() {
            self.advance(HandlerState::Done);
        }
        let kind = self.outcome.kind.as_str();
        metrics::histogram!("handler_duration_seconds", "kind" => kind)
            .record(self.started.elapsed().as_secs_f64());
        if self.outcome.delivered {
            metrics::counter!("notifications_delivered_total", "kind" => kind).increment(1);
        }
        self.outcome
    }
}

/// Executes the side effects of each event kind against injected collaborators.
pub struct SideEffectCoordinator<D, E, A, C>
where
    D: DataSource,
    E: EmailSender,
    A: AudienceSync,
    C: CustomerStore,
{
    projector: RecordProjector<D>,
    email: E,
    audience: A,
    customers: C,
    config: CoordinatorConfig,
}

impl<D, E, A, C> SideEffectCoordinator<D, E, A, C>
where
    D: DataSource,
    E: EmailSender,
    A: AudienceSync,
    C: CustomerStore,
{
    pub fn new(source: D, email: E, audience: A, customers: C, config: CoordinatorConfig) -> Self {
        Self {
            projector: RecordProjector::new(source),
            email,
            audience,
            customers,
            config,
        }
    }

    pub fn projector(&self) -> &RecordProjector<D> {
        &self.projector
    }

    pub fn email(&self) -> &E {
        &self.email
    }

    pub fn audience(&self) -> &A {
        &self.audience
    }

    pub fn customers(&self) -> &C {
        &self.customers
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Order placed: name patch, newsletter contact, then the confirmation email.
    #[tracing::instrument(skip(self), fields(kind = "order.placed"))]
    pub async fn order_placed(&self, event_id: EventId, order_id: &SubjectId) -> NotificationOutcome {
        let mut run = Run::start(event_id, EventKind::OrderPlaced, order_id);
        let Some(order) = self.fetch(&mut run).await.and_then(Record::into_order) else {
            return run.finish();
        };

        run.advance(HandlerState::Deriving);
        let totals = derive_totals(&order);

        run.advance(HandlerState::Rendering);
        let email = self.prepare(Notification::order_confirmation(&order, totals));

        run.advance(HandlerState::Dispatching);
        self.patch_customer_name(&mut run, &order).await;
        self.sync_newsletter(&mut run, &order).await;
        self.send(&mut run, email).await;
        run.finish()
    }

    /// Shipment created: tracking email.
    #[tracing::instrument(skip(self), fields(kind = "shipment.created"))]
    pub async fn shipment_created(
        &self,
        event_id: EventId,
        fulfillment_id: &SubjectId,
    ) -> NotificationOutcome {
        let mut run = Run::start(event_id, EventKind::ShipmentCreated, fulfillment_id);
        let Some(fulfillment) = self.fetch(&mut run).await.and_then(Record::into_fulfillment) else {
            return run.finish();
        };

        run.advance(HandlerState::Rendering);
        let email = self.prepare(Notification::shipment_tracking(&fulfillment));

        run.advance(HandlerState::Dispatching);
        self.send(&mut run, email).await;
        run.finish()
    }

    /// Fulfillment delivered: delivery email.
    #[tracing::instrument(skip(self), fields(kind = "fulfillment.delivered"))]
    pub async fn fulfillment_delivered(
        &self,
        event_id: EventId,
        fulfillment_id: &SubjectId,
    ) -> NotificationOutcome {
        let mut run = Run::start(event_id, EventKind::FulfillmentDelivered, fulfillment_id);
        let Some(fulfillment) = self.fetch(&mut run).await.and_then(Record::into_fulfillment) else {
            return run.finish();
        };

        run.advance(HandlerState::Rendering);
        let email = self.prepare(Notification::delivery_confirmation(&fulfillment));

        run.advance(HandlerState::Dispatching);
        self.send(&mut run, email).await;
        run.finish()
    }

    /// Order canceled: cancellation email.
    #[tracing::instrument(skip(self), fields(kind = "order.canceled"))]
    pub async fn order_canceled(&self, event_id: EventId, order_id: &SubjectId) -> NotificationOutcome {
        let mut run = Run::start(event_id, EventKind::OrderCanceled, order_id);
        let Some(order) = self.fetch(&mut run).await.and_then(Record::into_order) else {
            return run.finish();
        };

        run.advance(HandlerState::Rendering);
        let email = self.prepare(Notification::cancellation(&order));

        run.advance(HandlerState::Dispatching);
        self.send(&mut run, email).await;
        run.finish()
    }

    /// Customer created: welcome email.
    #[tracing::instrument(skip(self), fields(kind = "customer.created"))]
    pub async fn customer_created(
        &self,
        event_id: EventId,
        customer_id: &SubjectId,
    ) -> NotificationOutcome {
        let mut run = Run::start(event_id, EventKind::CustomerCreated, customer_id);
        let Some(customer) = self.fetch(&mut run).await.and_then(Record::into_customer) else {
            return run.finish();
        };

        run.advance(HandlerState::Rendering);
        let email = self.prepare(Notification::welcome(&customer));

        run.advance(HandlerState::Dispatching);
        self.send(&mut run, email).await;
        run.finish()
    }

    /// Reads the run's subject, recording not-found and failures on the run.
    async fn fetch(&self, run: &mut Run) -> Option<Record> {
        let kind = run.outcome.kind;
        let fetched = match tokio::time::timeout(
            self.config.call_timeout,
            self.projector.fetch(kind, &run.outcome.subject_id),
        )
        .await
        {
            Ok(result) => result.map_err(DispatchError::from),
            Err(_) => Err(IntegrationError::Timeout {
                operation: "data.query",
                after: self.config.call_timeout,
            }
            .into()),
        };

        match fetched {
            Ok(Some(record)) => Some(record),
            Ok(None) => {
                run.not_found();
                None
            }
            Err(err) => {
                run.failed(&err);
                None
            }
        }
    }

    fn prepare(
        &self,
        notification: Result<Notification, DomainError>,
    ) -> Result<(String, Document), DomainError> {
        let notification = notification?;
        let document = render(&notification, &self.config.render);
        Ok((notification.recipient().to_string(), document))
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = crate::error::Result<T>>,
    ) -> crate::error::Result<T> {
        match tokio::time::timeout(self.config.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(IntegrationError::Timeout {
                operation,
                after: self.config.call_timeout,
            }),
        }
    }

    async fn patch_customer_name(&self, run: &mut Run, order: &OrderRecord) {
        let Some((customer_id, patch)) = name_patch(order) else {
            run.effect(EffectOutcome::skipped(SideEffect::CustomerPatch));
            return;
        };

        match self
            .bounded("customer.patch", self.customers.patch(&customer_id, &patch))
            .await
        {
            Ok(()) => {
                tracing::info!(customer_id = %customer_id, "customer name filled from shipping address");
                run.effect(EffectOutcome::succeeded(SideEffect::CustomerPatch, None));
            }
            Err(err) => run.effect_failed(SideEffect::CustomerPatch, err.into()),
        }
    }

    async fn sync_newsletter(&self, run: &mut Run, order: &OrderRecord) {
        let Some(contact) = newsletter_contact(order, self.config.audience_id.as_deref()) else {
            run.effect(EffectOutcome::skipped(SideEffect::NewsletterContact));
            return;
        };

        match self
            .bounded("audience.upsert", self.audience.upsert_contact(contact))
            .await
        {
            Ok(()) => run.effect(EffectOutcome::succeeded(SideEffect::NewsletterContact, None)),
            Err(err) => run.effect_failed(SideEffect::NewsletterContact, err.into()),
        }
    }

    async fn send(&self, run: &mut Run, email: Result<(String, Document), DomainError>) {
        let (to, document) = match email {
            Ok(prepared) => prepared,
            Err(err) => {
                run.effect_failed(SideEffect::Email, err.into());
                return;
            }
        };
        run.outcome.recipient = Some(to.clone());

        let message = EmailMessage {
            from: self.config.from_email.clone(),
            to,
            subject: document.subject,
            html: document.html,
        };
        match self.bounded("email.send", self.email.send(message)).await {
            Ok(receipt) => {
                tracing::info!(email_id = %receipt.id, "notification sent");
                run.outcome.delivered = true;
                run.effect(EffectOutcome::succeeded(SideEffect::Email, Some(receipt.id)));
            }
            Err(err) => run.effect_failed(SideEffect::Email, err.into()),
        }
    }
}
