//! Bundle version selection.
//!
//! Picks which bundled toolkit releases to try and in what order, then
//! provisions them newest first until one succeeds.

use tracing::debug;

use super::Lookup;
use crate::ports::ProvisionError;
use crate::toolkit::{ResolvedToolkit, ToolkitCandidate, ToolkitSource};
use crate::version::Version;

/// Candidate releases in the order they will be tried.
///
/// A pin replaces the candidate set with exactly the pinned release,
/// regardless of the ceiling. Otherwise a known ceiling drops every
/// candidate whose release is newer than it.
pub fn bundle_candidates(
    available: &[Version],
    pin: Option<Version>,
    ceiling: Option<Version>,
) -> Vec<ToolkitCandidate> {
    let mut releases: Vec<Version> = match pin {
        Some(pinned) => vec![pinned.release()],
        None => available
            .iter()
            .map(|v| v.release())
            .filter(|v| ceiling.is_none_or(|max| *v <= max.release()))
            .collect(),
    };

    releases.sort_unstable_by(|a, b| b.cmp(a));
    releases.dedup();

    releases
        .into_iter()
        .map(|version| ToolkitCandidate {
            version,
            source: ToolkitSource::Bundle,
        })
        .collect()
}

/// Provision the newest acceptable bundle.
///
/// Never fails: an empty candidate set or a run of failed provisions both
/// come back as [`Lookup::NotFound`], which tells the caller to fall back to
/// a local installation.
pub fn resolve_bundled<F>(
    available: &[Version],
    pin: Option<Version>,
    ceiling: Option<Version>,
    mut provision: F,
) -> Lookup<ResolvedToolkit>
where
    F: FnMut(Version) -> Result<ResolvedToolkit, ProvisionError>,
{
    if let Some(pinned) = pin.filter(|p| !available.iter().any(|v| v.same_release(*p))) {
        debug!(
            release = %pinned.release_string(),
            "pinned release is not a published bundle, trying it anyway"
        );
    }

    let candidates = bundle_candidates(available, pin, ceiling);
    if candidates.is_empty() {
        debug!(
            ceiling = ?ceiling.map(Version::release_string),
            "no bundled CUDA release is compatible with the driver"
        );
        return Lookup::NotFound;
    }

    for candidate in candidates {
        match provision(candidate.version) {
            Ok(toolkit) => {
                debug!(version = %toolkit.version, "selected bundled CUDA toolkit");
                return Lookup::Found(toolkit);
            }
            Err(e) => {
                debug!(
                    release = %candidate.version.release_string(),
                    error = %e,
                    "bundle unavailable"
                );
            }
        }
    }

    Lookup::NotFound
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::ports::ArtifactId;

    fn toolkit(version: Version) -> ResolvedToolkit {
        ResolvedToolkit {
            source: ToolkitSource::Bundle,
            version,
            prefixes: Vec::new(),
            libraries: BTreeMap::new(),
            binaries: BTreeMap::new(),
            libdevice: None,
        }
    }

    fn unavailable(version: Version) -> ProvisionError {
        ProvisionError::unavailable(&ArtifactId::toolkit(version), "test")
    }

    fn releases(list: &[(u32, u32)]) -> Vec<Version> {
        list.iter().map(|(a, b)| Version::release_of(*a, *b)).collect()
    }

    #[test]
    fn test_ceiling_filters_and_orders_descending() {
        let available = releases(&[(11, 8), (12, 0), (12, 4), (12, 2), (12, 6)]);
        let ceiling = Some(Version::new(12, 4, 0));
        let versions: Vec<Version> = bundle_candidates(&available, None, ceiling)
            .into_iter()
            .map(|c| c.version)
            .collect();
        assert_eq!(versions, releases(&[(12, 4), (12, 2), (12, 0), (11, 8)]));
    }

    #[test]
    fn test_no_ceiling_keeps_everything() {
        let available = releases(&[(11, 8), (12, 0)]);
        assert_eq!(bundle_candidates(&available, None, None).len(), 2);
    }

    #[test]
    fn test_pin_ignores_ceiling() {
        let available = releases(&[(11, 8), (12, 0), (12, 4)]);
        let candidates = bundle_candidates(
            &available,
            Some(Version::new(12, 4, 1)),
            Some(Version::release_of(11, 8)),
        );
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].version, Version::release_of(12, 4));
    }

    #[test]
    fn test_first_success_stops_the_search() {
        let available = releases(&[(10, 2), (10, 1), (10, 0)]);
        let mut attempts = Vec::new();

        let result = resolve_bundled(&available, None, Some(Version::release_of(10, 1)), |v| {
            attempts.push(v);
            if v == Version::release_of(10, 0) {
                Ok(toolkit(v))
            } else {
                Err(unavailable(v))
            }
        });

        assert_eq!(attempts, releases(&[(10, 1), (10, 0)]));
        match result {
            Lookup::Found(t) => assert_eq!(t.version, Version::release_of(10, 0)),
            other => panic!("expected a toolkit, got {other:?}"),
        }
    }

    #[test]
    fn test_only_the_pin_is_attempted() {
        let available = releases(&[(12, 0), (12, 2), (12, 4)]);
        let mut attempts = Vec::new();

        let result = resolve_bundled(
            &available,
            Some(Version::release_of(12, 2)),
            Some(Version::release_of(12, 0)),
            |v| {
                attempts.push(v);
                Err(unavailable(v))
            },
        );

        assert_eq!(attempts, releases(&[(12, 2)]));
        assert!(result.is_not_found());
    }

    #[test]
    fn test_unpublished_pin_is_still_attempted() {
        let available = releases(&[(12, 4), (12, 6)]);
        let mut attempts = Vec::new();

        let result = resolve_bundled(&available, Some(Version::new(11, 2, 152)), None, |v| {
            attempts.push(v);
            Err(unavailable(v))
        });

        assert_eq!(attempts, releases(&[(11, 2)]));
        assert!(result.is_not_found());
    }

    #[test]
    fn test_empty_candidate_set_is_not_found() {
        let available = releases(&[(12, 0)]);
        let mut called = false;
        let result = resolve_bundled(&available, None, Some(Version::release_of(11, 2)), |v| {
            called = true;
            Ok(toolkit(v))
        });
        assert!(!called);
        assert!(result.is_not_found());
    }

    #[test]
    fn test_exhausted_candidates_is_not_found() {
        let available = releases(&[(12, 0), (12, 1)]);
        let mut count = 0;
        let result = resolve_bundled(&available, None, None, |v| {
            count += 1;
            Err(unavailable(v))
        });
        assert_eq!(count, 2);
        assert!(result.is_not_found());
    }
}
