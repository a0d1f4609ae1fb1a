//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, proxy route)
//!     → request.rs (buffer body, decode form/multipart, classify content type)
//!         - query.rs (bracket-aware query codec)
//!         - form.rs (value tree of fields and uploaded files)
//!         - options.rs (reserved options parameter)
//!     → [forwarding engine]
//!     → multipart.rs (outbound multipart bodies)
//!     → Send to client
//! ```

pub mod form;
pub mod multipart;
pub mod options;
pub mod query;
pub mod request;
pub mod server;

pub use request::InboundRequest;
pub use server::{build_app, AppState, HttpServer};
