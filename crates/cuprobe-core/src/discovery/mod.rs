//! Toolkit resolution.
//!
//! The algorithms here are plain functions over a [`DiscoveryContext`];
//! sequencing and memoization live in [`crate::state`].

mod bundled;
mod compiler;
mod error;
mod locate;
mod optional;
mod provision;

pub use bundled::{bundle_candidates, resolve_bundled};
pub use compiler::{CompilerCandidate, compiler_candidates, match_host_compiler};
pub use error::{CompilerError, DiscoveryError, DiscoveryWarning, FailureReason, Warnings};
pub use locate::{candidate_roots, locate_toolkit, toolkit_version};
pub use optional::resolve_optional;
pub use provision::{BundleProvisioner, read_manifest};

use crate::ports::VersionProbe;
use crate::search::Searcher;

/// Outcome of one resolution strategy.
///
/// `NotFound` means "try the next strategy"; `Failed` ends resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
    Failed(FailureReason),
}

impl<T> Lookup<T> {
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Run `next` only when this strategy found nothing.
    pub fn or_else(self, next: impl FnOnce() -> Self) -> Self {
        match self {
            Self::NotFound => next(),
            other => other,
        }
    }

    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            _ => None,
        }
    }
}

/// What the resolution algorithms need from the outside world.
#[derive(Clone, Copy)]
pub struct DiscoveryContext<'a> {
    pub searcher: Searcher<'a>,
    pub versions: &'a dyn VersionProbe,
}

impl<'a> DiscoveryContext<'a> {
    pub fn new(searcher: Searcher<'a>, versions: &'a dyn VersionProbe) -> Self {
        Self { searcher, versions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_else_only_runs_on_not_found() {
        let found: Lookup<u32> = Lookup::Found(1);
        assert_eq!(found.or_else(|| Lookup::Found(2)), Lookup::Found(1));

        let missing: Lookup<u32> = Lookup::NotFound;
        assert_eq!(missing.or_else(|| Lookup::Found(2)), Lookup::Found(2));

        let failed: Lookup<u32> = Lookup::Failed(FailureReason::ToolkitNotFound);
        assert!(matches!(
            failed.or_else(|| Lookup::Found(2)),
            Lookup::Failed(FailureReason::ToolkitNotFound)
        ));
    }
}
