//! Authorization gate consulted before a request is forwarded.
//!
//! # Responsibilities
//! - Describe the proxied request as a subject (`ProxySubject`)
//! - Collect votes from registered voters
//! - Keep the decision trace for diagnostics
//!
//! # Design Decisions
//! - Affirmative strategy: one granting voter is enough
//! - Abstaining voters never grant by themselves
//! - The gate is synchronous; voters must not perform I/O

use std::fmt;
use std::sync::Arc;

use crate::http::InboundRequest;
use crate::upstream::UpstreamConfig;

/// Attribute checked before forwarding to a remote upstream.
pub const ALLOW_PROXY_ATTRIBUTE: &str = "bff_proxy.allow_proxy";

/// Outcome of a single voter or of the whole gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    Granted,
    Denied,
    Abstain,
}

/// Everything a voter may base its decision on.
#[derive(Clone, Copy)]
pub struct ProxySubject<'a> {
    /// Name of the proxied upstream.
    pub upstream: &'a str,
    /// Normalized path on the upstream, always starting with `/`.
    pub route: &'a str,
    pub request: &'a InboundRequest,
    pub config: &'a UpstreamConfig,
}

impl fmt::Debug for ProxySubject<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxySubject")
            .field("upstream", &self.upstream)
            .field("route", &self.route)
            .field("method", self.request.method())
            .finish()
    }
}

/// A vote cast by a named voter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteRecord {
    pub voter: String,
    pub vote: Vote,
}

/// Decision trace filled in by an [`AccessGate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessDecision {
    votes: Vec<VoteRecord>,
    result: Option<Vote>,
}

impl AccessDecision {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, voter: impl Into<String>, vote: Vote) {
        self.votes.push(VoteRecord {
            voter: voter.into(),
            vote,
        });
    }

    pub fn votes(&self) -> &[VoteRecord] {
        &self.votes
    }

    /// Final result, once a gate has decided.
    pub fn result(&self) -> Option<Vote> {
        self.result
    }

    pub fn set_result(&mut self, vote: Vote) {
        self.result = Some(vote);
    }

    pub fn is_granted(&self) -> bool {
        self.result == Some(Vote::Granted)
    }
}

/// A single authorization rule.
pub trait Voter: Send + Sync {
    /// Name recorded in the decision trace.
    fn name(&self) -> &str;

    fn supports_attribute(&self, attribute: &str) -> bool;

    fn vote(&self, subject: &ProxySubject<'_>, attribute: &str) -> Vote;
}

/// Grants or denies access to an upstream.
pub trait AccessGate: Send + Sync {
    fn decide(&self, subject: &ProxySubject<'_>, attribute: &str, decision: &mut AccessDecision) -> Vote;
}

/// Grants [`ALLOW_PROXY_ATTRIBUTE`] unconditionally and abstains otherwise.
///
/// Register it with a low priority and add stricter voters in front of it
/// to restrict access.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowProxyVoter;

impl Voter for AllowProxyVoter {
    fn name(&self) -> &str {
        "allow_proxy"
    }

    fn supports_attribute(&self, attribute: &str) -> bool {
        attribute == ALLOW_PROXY_ATTRIBUTE
    }

    fn vote(&self, _subject: &ProxySubject<'_>, attribute: &str) -> Vote {
        if self.supports_attribute(attribute) {
            Vote::Granted
        } else {
            Vote::Abstain
        }
    }
}

/// Gate granting access as soon as one voter grants.
pub struct AffirmativeGate {
    voters: Vec<Arc<dyn Voter>>,
    allow_if_all_abstain: bool,
}

impl AffirmativeGate {
    pub fn new(voters: Vec<Arc<dyn Voter>>) -> Self {
        Self {
            voters,
            allow_if_all_abstain: false,
        }
    }

    pub fn allow_if_all_abstain(mut self, allow: bool) -> Self {
        self.allow_if_all_abstain = allow;
        self
    }
}

impl Default for AffirmativeGate {
    fn default() -> Self {
        Self::new(vec![Arc::new(AllowProxyVoter)])
    }
}

impl fmt::Debug for AffirmativeGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AffirmativeGate")
            .field("voters", &self.voters.iter().map(|v| v.name()).collect::<Vec<_>>())
            .field("allow_if_all_abstain", &self.allow_if_all_abstain)
            .finish()
    }
}

impl AccessGate for AffirmativeGate {
    fn decide(&self, subject: &ProxySubject<'_>, attribute: &str, decision: &mut AccessDecision) -> Vote {
        let mut denied = false;

        for voter in &self.voters {
            if !voter.supports_attribute(attribute) {
                continue;
            }

            let vote = voter.vote(subject, attribute);
            decision.record(voter.name(), vote);
            match vote {
                Vote::Granted => {
                    decision.set_result(Vote::Granted);
                    return Vote::Granted;
                }
                Vote::Denied => denied = true,
                Vote::Abstain => {}
            }
        }

        let result = if !denied && self.allow_if_all_abstain {
            Vote::Granted
        } else {
            Vote::Denied
        };
        decision.set_result(result);
        result
    }
}
