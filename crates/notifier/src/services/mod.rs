//! Outbound integration traits and their implementations.

pub mod audience;
pub mod customers;
pub mod email;
pub mod resend;

pub use audience::{AudienceSync, ContactUpsert, InMemoryAudienceSync, NoopAudienceSync};
pub use customers::{CustomerPatch, CustomerStore, HttpCustomerStore, InMemoryCustomerStore};
pub use email::{ConsoleEmailSender, EmailMessage, EmailReceipt, EmailSender, InMemoryEmailSender};
pub use resend::ResendClient;
