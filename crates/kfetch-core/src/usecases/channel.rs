//! Channel use case
//!
//! The channel is the single read/write endpoint clients talk to. Its life
//! cycle per client is `open → (write | read)* → close`:
//!
//! - `open` takes exclusive hold or fails with `Busy` at once
//! - `write` replaces the shared mask with a 4-byte integer
//! - `read` renders a complete report from a snapshot of the mask
//! - `close` frees the channel for the next client
//!
//! Offsets and requested lengths are not part of the model: every read
//! returns a freshly built, complete report.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::ChannelConfig;
use crate::domain::{InfoMask, KfetchError, Report, SessionHandle, SessionManager};
use crate::ports::IFactsProvider;

use super::render::ReportRenderer;

/// Exclusive-access report channel
#[derive(Debug, Clone)]
pub struct Channel {
    sessions: Arc<SessionManager>,
    renderer: ReportRenderer,
}

impl Channel {
    /// Creates a channel over `facts`, configured from `config`.
    ///
    /// The channel starts free, with `config.default_mask` as its mask.
    pub fn new(facts: Arc<dyn IFactsProvider>, config: &ChannelConfig) -> Self {
        info!(
            mask = %config.initial_mask(),
            strict = config.strict_mask,
            "Creating kfetch channel"
        );
        Self {
            sessions: SessionManager::new(config.initial_mask(), config.strict_mask),
            renderer: ReportRenderer::new(facts),
        }
    }

    /// Opens a session.
    ///
    /// # Errors
    ///
    /// [`KfetchError::Busy`] while another session is open.
    pub fn open(&self) -> Result<SessionHandle, KfetchError> {
        match self.sessions.acquire() {
            Ok(handle) => {
                debug!(session = handle.id(), "Channel opened");
                Ok(handle)
            }
            Err(e) => {
                warn!("Channel open rejected: in use by another session");
                Err(e)
            }
        }
    }

    /// Renders one full report for `session`.
    ///
    /// The mask is snapshotted first, so a concurrent write cannot change the
    /// fields of a read already in progress.
    pub fn read(&self, session: &SessionHandle) -> Result<Report, KfetchError> {
        self.check_owner(session)?;
        let mask = self.sessions.mask();
        debug!(session = session.id(), mask = %mask, "Channel read");
        Ok(self.renderer.render(mask))
    }

    /// Renders a report into `dst`, NUL terminator included.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// [`KfetchError::Fault`] if `dst` cannot hold the whole report.
    pub fn read_into(&self, session: &SessionHandle, dst: &mut [u8]) -> Result<usize, KfetchError> {
        let report = self.read(session)?;
        report.copy_to(dst)
    }

    /// Replaces the shared mask with the 4-byte integer in `bytes`.
    ///
    /// Always reports zero bytes accepted on success.
    ///
    /// # Errors
    ///
    /// - [`KfetchError::Fault`] if `bytes` is not exactly 4 bytes long
    /// - [`KfetchError::InvalidMask`] in strict mode, for unknown bits
    pub fn write(&self, session: &SessionHandle, bytes: &[u8]) -> Result<usize, KfetchError> {
        self.check_owner(session)?;
        let mask = self.sessions.configure(bytes)?;
        debug!(session = session.id(), mask = %mask, "Channel write");
        Ok(0)
    }

    /// Closes a session, freeing the channel.
    ///
    /// # Errors
    ///
    /// [`KfetchError::Fault`] if `session` was opened on another channel.
    /// The handle is consumed either way and frees the channel it came from.
    pub fn close(&self, session: SessionHandle) -> Result<(), KfetchError> {
        let owned = self.check_owner(&session);
        debug!(session = session.id(), "Channel closed");
        self.sessions.release(session);
        owned
    }

    /// Mask the next read will use
    pub fn mask(&self) -> InfoMask {
        self.sessions.mask()
    }

    /// Session manager backing this channel
    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Renderer backing this channel
    pub fn renderer(&self) -> &ReportRenderer {
        &self.renderer
    }

    fn check_owner(&self, session: &SessionHandle) -> Result<(), KfetchError> {
        if session.belongs_to(&self.sessions) {
            Ok(())
        } else {
            Err(KfetchError::Fault(format!(
                "session {} was not opened on this channel",
                session.id()
            )))
        }
    }
}
