//! Stream session identifiers.
//!
//! Every session gets a fresh `tlsess_<uuidv7>` id when it is spawned, so
//! ids sort by start time and one session's log lines can be grepped out.

use mti::prelude::*;
use std::fmt;

/// Names one translation stream, from dispatch to termination.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(MagicTypeId);

impl SessionId {
    /// Prefix carried by every session id.
    pub const PREFIX: &'static str = "tlsess";

    /// Allocates an id for a session that is about to start.
    #[must_use]
    pub fn new() -> Self {
        Self(Self::PREFIX.create_type_id::<V7>())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
