//! Local routing subsystem.
//!
//! # Data Flow
//! ```text
//! Local path + RequestContext (method, host)
//!     → matcher.rs (RouteTable: template lookup)
//!     → RouteMatch { route, params } | NotFound | MethodNotAllowed(allowed)
//!
//! Derived request (RouteAttributes, RouteParams, Stateless(false))
//!     → kernel.rs (AxumKernel: oneshot through the in-process router)
//!     → Response
//! ```
//!
//! # Design Decisions
//! - Route tables are built at startup and immutable at runtime
//! - Deterministic: same input always matches the same route
//! - First match wins (registration order)
//! - Matching and dispatch are separate seams, both behind traits

pub mod kernel;
pub mod matcher;

pub use kernel::{AxumKernel, RequestKind, RouteAttributes, RouteParams, Stateless, SubRequestHandler};
pub use matcher::{MatchError, Params, RequestContext, Route, RouteMatch, RouteMatcher, RouteTable};
