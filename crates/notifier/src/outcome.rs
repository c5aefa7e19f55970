//! Per-invocation results, logged and returned to callers. Never persisted.

use common::{EventId, SubjectId};
use domain::EventKind;
use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::state::HandlerState;

/// An externally observable action a handler may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEffect {
    CustomerPatch,
    NewsletterContact,
    Email,
}

impl SideEffect {
    pub fn as_str(&self) -> &'static str {
        match self {
            SideEffect::CustomerPatch => "customer_patch",
            SideEffect::NewsletterContact => "newsletter_contact",
            SideEffect::Email => "email",
        }
    }
}

impl std::fmt::Display for SideEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectStatus {
    Succeeded,
    /// The effect's guard did not hold; nothing was called.
    Skipped,
    Failed,
}

impl EffectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EffectStatus::Succeeded => "succeeded",
            EffectStatus::Skipped => "skipped",
            EffectStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectOutcome {
    pub effect: SideEffect,
    pub status: EffectStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    /// Provider id on success, error message on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl EffectOutcome {
    pub fn succeeded(effect: SideEffect, detail: Option<String>) -> Self {
        Self {
            effect,
            status: EffectStatus::Succeeded,
            error: None,
            detail,
        }
    }

    pub fn skipped(effect: SideEffect) -> Self {
        Self {
            effect,
            status: EffectStatus::Skipped,
            error: None,
            detail: None,
        }
    }

    pub fn failed(effect: SideEffect, error: ErrorKind, detail: String) -> Self {
        Self {
            effect,
            status: EffectStatus::Failed,
            error: Some(error),
            detail: Some(detail),
        }
    }
}

/// What happened while handling one event occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationOutcome {
    pub event_id: EventId,
    pub kind: EventKind,
    pub subject_id: SubjectId,
    pub recipient: Option<String>,
    /// True when the notification email was accepted by the provider.
    pub delivered: bool,
    /// The first error met, if any.
    pub error: Option<ErrorKind>,
    /// States visited, ending in `Done`.
    pub states: Vec<HandlerState>,
    /// Side effects in the order they were attempted.
    pub effects: Vec<EffectOutcome>,
}

impl NotificationOutcome {
    /// The outcome recorded for `effect`, if it was reached.
    pub fn effect(&self, effect: SideEffect) -> Option<&EffectOutcome> {
        self.effects.iter().find(|e| e.effect == effect)
    }

    pub fn is_not_found(&self) -> bool {
        self.error == Some(ErrorKind::NotFound)
    }

    /// Number of effects that actually called an integration.
    pub fn attempted_effects(&self) -> usize {
        self.effects
            .iter()
            .filter(|e| e.status != EffectStatus::Skipped)
            .count()
    }
}
