//! HTTP responder shim.
//!
//! A deliberately small hyper server bound to a local port. In text mode
//! every request is answered with a fixed body naming the port and the
//! request path; in file mode the working directory is served as static
//! files. Each accepted connection is handled in its own task; the server
//! stops on the shared shutdown signal or an accept failure.

mod error;
mod files;
mod responder;

pub use error::{ServeError, ServeResult};
pub use responder::{HttpResponder, ResponderConfig};
