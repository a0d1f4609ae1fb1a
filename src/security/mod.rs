//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Remote upstream resolved
//!     → ProxySubject { upstream, route, request, config }
//!     → AccessGate::decide(subject, ALLOW_PROXY_ATTRIBUTE)
//!         - each supporting Voter casts a vote
//!         - votes recorded in AccessDecision
//!     → Granted: forward
//!     → otherwise: ProxyError::Forbidden (subject + decision trace)
//! ```

pub mod voter;

pub use voter::{
    AccessDecision, AccessGate, AffirmativeGate, AllowProxyVoter, ProxySubject, Vote, VoteRecord,
    Voter, ALLOW_PROXY_ATTRIBUTE,
};
