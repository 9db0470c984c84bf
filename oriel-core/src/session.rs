//! Session Boundary Types
//!
//! Types that cross the boundary between the core runtime and the transport
//! layer hosting it: window identities, the parameters a client presents when
//! it connects, the frames the runtime emits, and the close codes it answers
//! rejected connections with.
//!
//! The transport itself (sockets, HTTP upgrade, wire encoding of frames) is
//! not part of this crate. A frame carries either an opaque buffer produced
//! by the embedding codec or one of the small control messages the lifecycle
//! sweeper emits.

use std::fmt;

use serde::{Deserialize, Serialize};

/// First byte of an inbound message that marks it as a liveness pong.
///
/// Pongs refresh the window's liveness clock directly and never enter the
/// input queue.
pub const PONG_COMMAND: u8 = 0;

/// Identity of a connected window (one per client session).
///
/// Ids are random 64-bit values, so a client cannot guess another session's
/// id from its own. They are unique within one manager; the manager retries
/// generation on the (unlikely) collision.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowId(u64);

impl WindowId {
    /// Generate a fresh random id.
    pub fn random() -> Self {
        Self(rand::random())
    }

    /// The raw id value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for WindowId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl fmt::Debug for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WindowId({:016x})", self.0)
    }
}

/// Parameters a client presents when opening or resuming a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionParams {
    /// Path the client is on, e.g. `/settings/profile`.
    pub path: String,

    /// Viewport size in CSS pixels, `(width, height)`.
    pub viewport: (u32, u32),

    /// How many bytes of output the client has already applied. Used by the
    /// embedding codec to resume the stream on reconnect.
    pub read_offset: u64,

    /// Raw cookie header contents, passed through to application code.
    pub cookie: String,
}

/// Close codes sent when a connection attempt is rejected.
///
/// The numeric values are part of the client protocol: the client reacts to
/// them differently, so they must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseCode {
    /// The origin created too many windows in a short span. The client must
    /// not retry automatically.
    ExcessiveWindowCreation,

    /// The presented window id is unknown (expired or never existed). The
    /// client discards its local state and starts a fresh session.
    UnknownWindow,
}

impl CloseCode {
    /// The on-the-wire close code value.
    pub fn as_u16(&self) -> u16 {
        match self {
            CloseCode::ExcessiveWindowCreation => 3010,
            CloseCode::UnknownWindow => 3001,
        }
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseCode::ExcessiveWindowCreation => {
                write!(f, "{} (excessive window creation)", self.as_u16())
            }
            CloseCode::UnknownWindow => write!(f, "{} (unknown window)", self.as_u16()),
        }
    }
}

/// A frame emitted by a window towards its client connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Opaque output produced by the embedding codec.
    Buffer(Vec<u8>),

    /// Liveness ping. The client answers with a pong message.
    Ping,

    /// Acknowledgement that the listed block ids were released server-side
    /// and the client may recycle them.
    DeleteAcks(Vec<u32>),
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
