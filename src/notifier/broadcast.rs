//! Cross-context broadcast channel.
//!
//! Every open channel binds a Unix datagram socket named
//! `<context-id>.sock` inside the shared channel directory. Posting sends the
//! message to every other socket found there; sockets left behind by a context
//! that exited without cleaning up are unlinked on the first failed send.
//!
//! Delivery is best-effort. Contexts that are not running miss the message and
//! catch up by reading the store when they next open.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::emitter::LocalEmitter;
use super::types::MutationKind;
use crate::error_handling::types::NotifyError;

#[cfg(unix)]
pub use unix::BroadcastChannel;

#[cfg(not(unix))]
pub use unsupported::BroadcastChannel;

/// Socket path for a new context inside `dir`.
fn socket_path(dir: &Path) -> PathBuf {
    dir.join(format!("{}.sock", Uuid::new_v4().simple()))
}

#[cfg(unix)]
mod unix {
    use super::*;

    use std::io::ErrorKind;
    use std::sync::Arc;

    use log::{debug, trace, warn};
    use tokio::net::UnixDatagram;
    use tokio::task::JoinHandle;

    use crate::notifier::types::{EventOrigin, WireMessage};

    const MAX_DATAGRAM: usize = 1024;

    pub struct BroadcastChannel {
        dir: PathBuf,
        own_path: PathBuf,
        socket: Arc<UnixDatagram>,
        listener: JoinHandle<()>,
    }

    impl BroadcastChannel {
        /// Binds this context's socket in `dir` and starts forwarding messages
        /// from other contexts to `emitter` as remote events.
        ///
        /// Must be called from within a tokio runtime.
        pub fn open(dir: &Path, emitter: LocalEmitter) -> Result<Self, NotifyError> {
            std::fs::create_dir_all(dir).map_err(NotifyError::Bind)?;
            let own_path = socket_path(dir);
            let socket = Arc::new(UnixDatagram::bind(&own_path).map_err(NotifyError::Bind)?);
            debug!("Broadcast channel bound at {}", own_path.display());

            let listener = tokio::spawn(listen(Arc::clone(&socket), emitter));
            Ok(Self {
                dir: dir.to_path_buf(),
                own_path,
                socket,
                listener,
            })
        }

        pub fn socket_path(&self) -> &Path {
            &self.own_path
        }

        /// Sends a mutation message to every other context. Returns how many
        /// peers accepted it.
        pub async fn post(&self, kind: MutationKind, id: Uuid) -> Result<usize, NotifyError> {
            let payload = serde_json::to_vec(&WireMessage::MutationComplete { kind, id })
                .map_err(|e| NotifyError::Encode(e.to_string()))?;

            let mut entries = tokio::fs::read_dir(&self.dir)
                .await
                .map_err(NotifyError::Send)?;
            let mut delivered = 0usize;
            while let Some(entry) = entries.next_entry().await.map_err(NotifyError::Send)? {
                let peer = entry.path();
                if peer == self.own_path
                    || peer.extension().and_then(|s| s.to_str()) != Some("sock")
                {
                    continue;
                }
                match self.socket.try_send_to(&payload, &peer) {
                    Ok(_) => delivered += 1,
                    Err(e) if matches!(e.kind(), ErrorKind::ConnectionRefused | ErrorKind::NotFound) => {
                        debug!("Removing stale broadcast socket {}", peer.display());
                        let _ = tokio::fs::remove_file(&peer).await;
                    }
                    Err(e) => warn!("Broadcast to {} dropped: {}", peer.display(), e),
                }
            }
            trace!("Broadcast {:?} {} to {} peer(s)", kind, id, delivered);
            Ok(delivered)
        }
    }

    async fn listen(socket: Arc<UnixDatagram>, emitter: LocalEmitter) {
        let mut buf = [0u8; MAX_DATAGRAM];
        loop {
            let n = match socket.recv(&mut buf).await {
                Ok(n) => n,
                Err(e) => {
                    warn!("Broadcast channel receive failed, stopping listener: {}", e);
                    return;
                }
            };
            match serde_json::from_slice::<WireMessage>(&buf[..n]) {
                Ok(msg) => emitter.emit(&msg.into_event(EventOrigin::Remote)),
                Err(e) => warn!("Ignoring malformed broadcast message: {}", e),
            }
        }
    }

    impl Drop for BroadcastChannel {
        fn drop(&mut self) {
            self.listener.abort();
            let _ = std::fs::remove_file(&self.own_path);
            debug!("Broadcast channel at {} closed", self.own_path.display());
        }
    }
}

#[cfg(not(unix))]
mod unsupported {
    use super::*;

    /// Placeholder on platforms without Unix datagram sockets; opening always
    /// fails and the notifier falls back to local delivery only.
    pub struct BroadcastChannel {
        own_path: PathBuf,
    }

    impl BroadcastChannel {
        pub fn open(_dir: &Path, _emitter: LocalEmitter) -> Result<Self, NotifyError> {
            Err(NotifyError::Unsupported)
        }

        pub fn socket_path(&self) -> &Path {
            &self.own_path
        }

        pub async fn post(&self, _kind: MutationKind, _id: Uuid) -> Result<usize, NotifyError> {
            Err(NotifyError::Unsupported)
        }
    }
}
