//! Cross-context notifier.
//!
//! Tells every interested observer that the vault changed, without polling.
//! Two channels sit behind one `publish`/`subscribe` interface:
//! - `emitter`: in-process callbacks, fired synchronously right after a
//!   successful mutation so the mutating context sees it at once.
//! - `broadcast`: best-effort datagrams to other vault instances opened on the
//!   same directory, surfaced to their subscribers as remote events.
//!
//! Messages only carry the mutation kind and the record id. Receivers re-read
//! the store for the current state.

pub mod broadcast;
pub mod emitter;
pub mod types;

use std::path::Path;

use log::{info, warn};
use uuid::Uuid;

pub use broadcast::BroadcastChannel;
pub use emitter::{LocalEmitter, Subscription};
pub use types::{EventOrigin, MutationKind, VaultEvent, WireMessage};

pub struct Notifier {
    emitter: LocalEmitter,
    channel: Option<BroadcastChannel>,
}

impl Notifier {
    /// Notifier that only reaches subscribers of this instance.
    pub fn local_only() -> Self {
        Self {
            emitter: LocalEmitter::new(),
            channel: None,
        }
    }

    /// Notifier that also broadcasts through `channel_dir`.
    ///
    /// If the channel cannot be opened the notifier degrades to local delivery;
    /// other contexts then only see changes when they re-read the store.
    pub fn with_broadcast(channel_dir: &Path) -> Self {
        let emitter = LocalEmitter::new();
        let channel = match BroadcastChannel::open(channel_dir, emitter.clone()) {
            Ok(channel) => Some(channel),
            Err(e) => {
                warn!(
                    "Cross-context notifications disabled for {}: {}",
                    channel_dir.display(),
                    e
                );
                None
            }
        };
        if channel.is_some() {
            info!("Cross-context notifications enabled at {}", channel_dir.display());
        }
        Self { emitter, channel }
    }

    pub fn is_broadcasting(&self) -> bool {
        self.channel.is_some()
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&VaultEvent) + Send + Sync + 'static,
    {
        self.emitter.subscribe(callback)
    }

    /// Notifies local subscribers, then other contexts. Broadcast failures are
    /// logged and never returned.
    pub async fn publish(&self, kind: MutationKind, id: Uuid) {
        self.emitter.emit(&VaultEvent {
            id,
            kind,
            origin: EventOrigin::Local,
        });
        if let Some(channel) = &self.channel {
            if let Err(e) = channel.post(kind, id).await {
                warn!("Failed to broadcast {:?} of {}: {}", kind, id, e);
            }
        }
    }
}
