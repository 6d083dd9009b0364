//! Transport seam for the probe and forwarding engines.
//!
//! The engines never touch sockets directly; they go through the narrow
//! [`Transport`] capability trait so the real network stack can be replaced
//! with a deterministic in-memory double in tests. The trait is a
//! pass-through over the socket API: no retries, no timeouts, and errors
//! (address-in-use, connection-refused, ...) propagate verbatim without
//! classification.

mod memory;
mod tcp;
mod transport;

pub use memory::{MemoryListener, MemoryTransport};
pub use tcp::TokioTransport;
pub use transport::{Listener, Transport};
