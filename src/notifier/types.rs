//! Event and wire types of the notifier.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happened to the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    Saved,
    Deleted,
    /// Whole-record rewrite, e.g. a status change.
    Updated,
}

/// Where the mutation was performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOrigin {
    /// This vault instance.
    Local,
    /// Another vault instance sharing the same directory.
    Remote,
}

/// Delivered to subscribers. Carries no record data: subscribers re-query the
/// store for the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaultEvent {
    pub id: Uuid,
    pub kind: MutationKind,
    pub origin: EventOrigin,
}

/// Datagram exchanged between contexts, e.g.
/// `{"type":"mutation-complete","kind":"saved","id":"…"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WireMessage {
    MutationComplete { kind: MutationKind, id: Uuid },
}

impl WireMessage {
    pub fn into_event(self, origin: EventOrigin) -> VaultEvent {
        match self {
            WireMessage::MutationComplete { kind, id } => VaultEvent { id, kind, origin },
        }
    }
}
