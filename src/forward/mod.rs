//! TCP forwarding engine.
//!
//! A forwarding session owns one listener and accepts inbound connections
//! indefinitely. Each accepted connection is handed to its own relay task,
//! which dials the fixed target and duplex-copies bytes between the two
//! sides until either one closes or errors. The relay is byte-transparent:
//! no framing, no buffering beyond the copy loop, no awareness of the
//! traffic it carries.
//!
//! Failure scoping: bind and accept errors are fatal to the session and
//! surface to the caller. A relay's dial failure closes that relay's inbound
//! connection and the session keeps accepting, unless fail-fast mode is
//! enabled, in which case the first dial failure terminates the session the
//! way the listener errors do. Sessions end via those errors or via the
//! shutdown signal; in-flight relays drain naturally either way.

mod error;
mod relay;
mod session;

pub use error::{ForwardError, ForwardResult};
pub use session::{ForwardConfig, Forwarder, RelayGauge};
