//! The transport engine seam.
//!
//! # Design
//! A `Transport` hands out sessions; a `Session` is the engine's per-handle
//! state. The handler owns at most one session at a time and releases it by
//! dropping it, so implementations put their cleanup in `Drop`.
//!
//! `apply` installs a complete option list in one step: it either accepts
//! every option or leaves the session untouched.

use crate::error::{EngineFailure, TransportError};
use crate::options::OptionList;

/// Factory for engine sessions.
pub trait Transport {
    type Session: Session;

    /// Whether the engine can be used at all. Checked once, when the handler
    /// is constructed.
    fn is_available(&self) -> bool {
        true
    }

    /// Allocate a fresh session handle.
    fn open(&self) -> Result<Self::Session, TransportError>;
}

/// An open engine session.
pub trait Session {
    /// Clear everything previously applied to this session.
    fn reset(&mut self);

    /// Replace the session's request configuration with `options`.
    fn apply(&mut self, options: &OptionList) -> Result<(), TransportError>;

    /// Perform the configured request and return the body bytes as received.
    fn execute(&mut self) -> Result<Vec<u8>, EngineFailure>;
}
