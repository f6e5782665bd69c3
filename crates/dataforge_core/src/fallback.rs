//! Ordered resolution with graceful skip.
//!
//! Both the font chain and the render-backend chain walk an ordered list of
//! candidates and keep the first one that works. Failures along the way are
//! recorded and logged, never raised.

use std::fmt;

use tracing::{debug, warn};

/// A candidate that was tried and rejected.
#[derive(Debug)]
pub struct Skipped<E> {
    pub label: String,
    pub error: E,
}

/// Outcome of walking a fallback chain.
#[derive(Debug)]
pub struct Resolution<T, E> {
    /// The first successful value, if any candidate succeeded.
    pub value: Option<T>,
    /// Position of the winning candidate in the chain.
    pub index: Option<usize>,
    /// Every candidate rejected before the winner (or all of them).
    pub skipped: Vec<Skipped<E>>,
}

impl<T, E> Resolution<T, E> {
    pub fn is_resolved(&self) -> bool {
        self.value.is_some()
    }

    /// True when at least one higher-priority candidate was passed over.
    pub fn degraded(&self) -> bool {
        !self.skipped.is_empty()
    }
}

/// Try `candidates` in order and stop at the first `Ok`.
///
/// `chain` names the chain in log output; `label` names each candidate.
/// Each candidate is attempted exactly once.
pub fn resolve_first<C, T, E>(
    chain: &str,
    candidates: impl IntoIterator<Item = C>,
    label: impl Fn(&C) -> String,
    mut attempt: impl FnMut(&C) -> Result<T, E>,
) -> Resolution<T, E>
where
    E: fmt::Display,
{
    let mut skipped = Vec::new();

    for (index, candidate) in candidates.into_iter().enumerate() {
        match attempt(&candidate) {
            Ok(value) => {
                debug!(chain, candidate = %label(&candidate), index, "resolved");
                return Resolution {
                    value: Some(value),
                    index: Some(index),
                    skipped,
                };
            }
            Err(error) => {
                let name = label(&candidate);
                warn!(chain, candidate = %name, %error, "skipping candidate");
                skipped.push(Skipped { label: name, error });
            }
        }
    }

    Resolution {
        value: None,
        index: None,
        skipped,
    }
}
