// SPDX-License-Identifier: GPL-3.0-only

//! Join-token extraction from decoded candidates

use crate::constants::JOIN_URI_PREFIX;
use crate::decode::{CandidateKind, RawCandidate};

/// A validated join-code payload
///
/// The only artifact that crosses from the acquisition pipeline into the
/// onboarding workflow. Always non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinToken(String);

impl JoinToken {
    /// Build a token from a raw payload; blank payloads yield nothing
    pub fn new(payload: &str) -> Option<Self> {
        let trimmed = payload.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for JoinToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Extract the first join token among a frame's candidates
///
/// Only text and URL candidates are considered; their value must start
/// with the join URI prefix and carry a non-blank payload. Everything
/// else is silently ignored. First match wins; single delivery is the
/// gate's job, not this filter's.
pub fn extract_token(candidates: &[RawCandidate]) -> Option<JoinToken> {
    candidates
        .iter()
        .filter(|c| matches!(c.kind, CandidateKind::Text | CandidateKind::Url))
        .find_map(|c| {
            c.value
                .strip_prefix(JOIN_URI_PREFIX)
                .and_then(JoinToken::new)
        })
}
