//! Retention pruning: bound disk usage by deleting old, inactive releases.
//!
//! Pruning is not correctness-critical. Discovery failures surface as
//! errors, but an individual deletion that fails is logged and skipped so
//! one wedged directory cannot abort the rest of the sweep.

use serde::Serialize;

use crate::error::Result;
use crate::executor::RemoteExecutor;
use crate::layout::{ReleaseId, ReleaseLayout};
use crate::utils::shell;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PruneOutcome {
    pub kept: Vec<ReleaseId>,
    pub deleted: Vec<ReleaseId>,
    pub failed: Vec<PruneFailure>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PruneFailure {
    pub id: ReleaseId,
    pub error: String,
}

/// Select the releases to delete: everything but the `keep` newest, never
/// including the active release even when it has aged out of the window.
pub fn plan(existing: &[ReleaseId], active: Option<&ReleaseId>, keep: usize) -> Vec<ReleaseId> {
    // The active release is out of scope entirely: it neither gets deleted
    // nor occupies a slot in the retention window.
    let mut ordered: Vec<ReleaseId> = existing
        .iter()
        .filter(|id| Some(*id) != active)
        .cloned()
        .collect();
    ordered.sort();
    ordered.reverse();

    ordered.into_iter().skip(keep).collect()
}

/// List release directories under `<home>/versions`, newest first.
/// Entries that are not release-id tokens are ignored.
pub fn list_releases(
    executor: &dyn RemoteExecutor,
    layout: &ReleaseLayout,
) -> Result<Vec<ReleaseId>> {
    let command = format!("ls -1 {}", shell::quote_path(&layout.versions_path()));
    let output = executor.run(&command)?;
    if !output.success {
        // No versions directory yet means no releases.
        return Ok(Vec::new());
    }

    let mut ids: Vec<ReleaseId> = output
        .stdout
        .lines()
        .filter_map(|line| ReleaseId::parse(line.trim()).ok())
        .collect();
    ids.sort();
    ids.reverse();
    Ok(ids)
}

/// Read the release id `current` points at, if any.
pub fn active_release(
    executor: &dyn RemoteExecutor,
    layout: &ReleaseLayout,
) -> Result<Option<ReleaseId>> {
    let command = format!("readlink {}", shell::quote_path(&layout.current_path()));
    let output = executor.run(&command)?;
    if !output.success {
        return Ok(None);
    }
    let basename = match output.stdout.trim().rsplit('/').next() {
        Some(name) => name,
        None => return Ok(None),
    };
    Ok(ReleaseId::parse(basename).ok())
}

/// Delete all releases outside the retention window. Best effort per id.
pub fn prune(
    executor: &dyn RemoteExecutor,
    layout: &ReleaseLayout,
    keep: usize,
) -> Result<PruneOutcome> {
    let existing = list_releases(executor, layout)?;
    let active = active_release(executor, layout)?;
    let to_delete = plan(&existing, active.as_ref(), keep);

    let mut deleted = Vec::new();
    let mut failed = Vec::new();

    for id in to_delete {
        let command = format!("rm -rf {}", shell::quote_path(&layout.version_path(&id)));
        let output = executor.run(&command)?;
        if output.success {
            log_status!("prune", "Removed release {}", id);
            deleted.push(id);
        } else {
            log_status!("prune", "Could not remove release {}: {}", id, output.stderr.trim());
            failed.push(PruneFailure {
                id,
                error: output.stderr.trim().to_string(),
            });
        }
    }

    let kept = existing
        .into_iter()
        .filter(|id| !deleted.iter().any(|d| d == id))
        .collect();

    Ok(PruneOutcome {
        kept,
        deleted,
        failed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(days: &[u8]) -> Vec<ReleaseId> {
        days.iter()
            .map(|d| ReleaseId::parse(&format!("202301{:02}000000", d)).unwrap())
            .collect()
    }

    #[test]
    fn keeps_everything_when_under_the_window() {
        let existing = ids(&[1, 2, 3]);
        assert!(plan(&existing, None, 10).is_empty());
        assert!(plan(&existing, None, 3).is_empty());
    }

    #[test]
    fn deletes_only_the_oldest_beyond_the_window() {
        let existing = ids(&[1, 2, 3, 4, 5]);
        let doomed = plan(&existing, None, 3);
        assert_eq!(doomed, ids(&[2, 1]));
    }

    #[test]
    fn never_deletes_the_active_release() {
        // 15 releases, keep 10, active is the 10th-oldest: exactly the 4
        // oldest non-active ids are deleted.
        let existing = ids(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15]);
        let active = ReleaseId::parse("20230110000000").unwrap();

        let doomed = plan(&existing, Some(&active), 10);

        assert_eq!(doomed.len(), 4);
        assert!(!doomed.contains(&active));
        assert_eq!(doomed, ids(&[4, 3, 2, 1]));
    }

    #[test]
    fn active_release_does_not_occupy_a_retention_slot() {
        let existing = ids(&[1, 2, 3, 4, 5]);
        let active = ReleaseId::parse("20230105000000").unwrap();
        // Non-active releases are 4,3,2,1; the newest 3 of those survive.
        let doomed = plan(&existing, Some(&active), 3);
        assert_eq!(doomed, ids(&[1]));
    }

    #[test]
    fn unordered_input_is_sorted_before_selection() {
        let existing = ids(&[3, 1, 5, 2, 4]);
        let doomed = plan(&existing, None, 4);
        assert_eq!(doomed, ids(&[1]));
    }
}
