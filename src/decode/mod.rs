// SPDX-License-Identifier: GPL-3.0-only

//! Code decoder capability
//!
//! The pipeline consumes a [`Decoder`]: one frame in, zero or more raw
//! candidate strings out. Zero candidates is the common case (no code
//! visible), not an error. A failed decode is local to that frame; the
//! pipeline logs it and moves on.

pub mod qr;

pub use qr::QrDecoder;

use crate::capture::Frame;
use crate::errors::DecodeError;
use futures::future::BoxFuture;

/// Classification of a decoded candidate string
///
/// Mirrors what recognition backends report about a code's payload.
/// Only [`Text`](CandidateKind::Text) and [`Url`](CandidateKind::Url)
/// candidates are eligible for token extraction; other kinds are
/// silently ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    /// Free-form text payload
    Text,
    /// URI-shaped payload (has a scheme)
    Url,
    /// Anything else (structured payloads, binary, ...)
    Other,
}

/// A raw decoded string plus its classification, pre-filtering
///
/// Ephemeral: produced per frame, consumed by token extraction, never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCandidate {
    pub value: String,
    pub kind: CandidateKind,
}

impl RawCandidate {
    /// Build a candidate, classifying the payload by shape
    pub fn classify(value: String) -> Self {
        let kind = if value.split_once("://").is_some_and(|(scheme, _)| {
            !scheme.is_empty() && scheme.chars().all(|c| c.is_ascii_alphanumeric())
        }) {
            CandidateKind::Url
        } else {
            CandidateKind::Text
        };
        Self { value, kind }
    }
}

/// One-frame recognition capability consumed by the analyzer
///
/// `decode` is async relative to the analyzer; its completion is what
/// frees the analyzer's single slot.
pub trait Decoder: Send + Sync {
    /// Decode all recognizable codes in `frame`
    fn decode<'a>(
        &'a self,
        frame: &'a Frame,
    ) -> BoxFuture<'a, Result<Vec<RawCandidate>, DecodeError>>;
}
