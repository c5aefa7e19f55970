//! Event handling for the order notification dispatcher.
//!
//! This crate provides:
//! - `EventDispatcher`, which routes each subscribed event to its handler
//! - `SideEffectCoordinator`, the per-kind handlers and their side effects
//! - The notification renderer and email layout
//! - Outbound integration traits with in-memory, console and HTTP implementations

pub mod coordinator;
pub mod dispatcher;
pub mod error;
pub mod outcome;
pub mod render;
pub mod services;
pub mod state;

pub use coordinator::{CoordinatorConfig, SideEffectCoordinator, name_patch, newsletter_contact};
pub use dispatcher::EventDispatcher;
pub use error::{DispatchError, ErrorKind, IntegrationError};
pub use outcome::{EffectOutcome, EffectStatus, NotificationOutcome, SideEffect};
pub use render::{Document, Notification, RenderContext, render};
pub use services::{
    AudienceSync, ConsoleEmailSender, ContactUpsert, CustomerPatch, CustomerStore, EmailMessage,
    EmailReceipt, EmailSender, HttpCustomerStore, InMemoryAudienceSync, InMemoryCustomerStore,
    InMemoryEmailSender, NoopAudienceSync, ResendClient,
};
pub use state::HandlerState;
