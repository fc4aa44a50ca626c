//! Workflow events: every mint and unlock step emits a structured event.

use chrono::{DateTime, Utc};
use secretmint_envelope::Address;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};

use crate::types::{TokenId, UnlockState};

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// What happened.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultAction {
    MintSubmitted,
    MintCompleted,
    MintFailed { reason: String },
    TokensRefreshed { count: usize },
    UnlockStarted,
    AccessGranted { viewer: Address },
    UnlockCompleted,
    UnlockFailed { reason: String },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VaultEvent {
    pub timestamp: DateTime<Utc>,
    pub token_id: Option<TokenId>,
    /// Unlock state after the step, for unlock events.
    pub state: Option<UnlockState>,
    pub action: VaultAction,
    /// Account that triggered this, if connected.
    pub actor: Option<Address>,
    pub success: bool,
    pub detail: Option<String>,
}

impl VaultEvent {
    pub fn token_event(token_id: TokenId, state: UnlockState, action: VaultAction) -> Self {
        Self {
            timestamp: Utc::now(),
            token_id: Some(token_id),
            state: Some(state),
            action,
            actor: None,
            success: true,
            detail: None,
        }
    }

    pub fn account_event(action: VaultAction) -> Self {
        Self {
            timestamp: Utc::now(),
            token_id: None,
            state: None,
            action,
            actor: None,
            success: true,
            detail: None,
        }
    }

    pub fn with_token(mut self, token_id: Option<TokenId>) -> Self {
        self.token_id = token_id;
        self
    }

    pub fn with_actor(mut self, actor: Option<Address>) -> Self {
        self.actor = actor;
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.success = false;
        self
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Where workflow events go.
pub trait EventSink: Send + Sync {
    fn record(&self, event: VaultEvent);
}

/// Logs events via the `tracing` crate.
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn record(&self, event: VaultEvent) {
        if event.success {
            tracing::info!(
                timestamp = %event.timestamp,
                token_id = ?event.token_id,
                state = ?event.state,
                action = ?event.action,
                actor = ?event.actor,
                detail = ?event.detail,
                "vault"
            );
        } else {
            tracing::warn!(
                timestamp = %event.timestamp,
                token_id = ?event.token_id,
                state = ?event.state,
                action = ?event.action,
                actor = ?event.actor,
                detail = ?event.detail,
                "vault"
            );
        }
    }
}

/// Collects events in memory.
#[derive(Default)]
pub struct InMemoryEventSink {
    events: Mutex<Vec<VaultEvent>>,
}

impl InMemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<VaultEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn events_for_token(&self, token_id: TokenId) -> Vec<VaultEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.token_id == Some(token_id))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for InMemoryEventSink {
    fn record(&self, event: VaultEvent) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).push(event);
    }
}
