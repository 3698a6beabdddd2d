//! Pure path derivation for the on-host release layout.
//!
//! Everything under the target's home directory follows one shape:
//!
//! ```text
//! <home>/versions/<release_id>/   one directory per release
//! <home>/shared/                  config fixtures linked into every release
//! <home>/current                  symlink naming the active release
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A release identifier: a 14-digit UTC timestamp token (`%Y%m%d%H%M%S`).
///
/// Zero-padded so that lexicographic order equals creation order, which lets
/// retention pruning sort releases without stat-ing their directories.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReleaseId(String);

impl ReleaseId {
    pub fn now() -> Self {
        Self(Utc::now().format("%Y%m%d%H%M%S").to_string())
    }

    pub fn parse(token: &str) -> Result<Self> {
        if token.len() != 14 || !token.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::validation_invalid_argument(
                "release_id",
                format!("'{}' is not a 14-digit timestamp token", token),
                None,
            ));
        }
        Ok(Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReleaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derived paths for a target home directory. Pure string computation, no I/O.
#[derive(Debug, Clone)]
pub struct ReleaseLayout {
    home: String,
}

impl ReleaseLayout {
    /// The home path is validated at Target construction; this constructor
    /// only normalizes a trailing slash.
    pub fn new(home: &str) -> Self {
        Self {
            home: home.trim_end_matches('/').to_string(),
        }
    }

    pub fn home(&self) -> &str {
        &self.home
    }

    pub fn shared_path(&self) -> String {
        format!("{}/shared", self.home)
    }

    pub fn versions_path(&self) -> String {
        format!("{}/versions", self.home)
    }

    pub fn version_path(&self, id: &ReleaseId) -> String {
        format!("{}/versions/{}", self.home, id)
    }

    pub fn current_path(&self) -> String {
        format!("{}/current", self.home)
    }

    /// Staging link used by the atomic activation swap.
    pub fn current_staging_path(&self) -> String {
        format!("{}/current.new", self.home)
    }

    /// Advisory lock directory serializing deploys per target.
    pub fn lock_path(&self) -> String {
        format!("{}/.slipway-lock", self.home)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_id_rejects_non_timestamp_tokens() {
        assert!(ReleaseId::parse("20230101120000").is_ok());
        assert!(ReleaseId::parse("not-a-timestamp").is_err());
        assert!(ReleaseId::parse("2023").is_err());
        assert!(ReleaseId::parse("2023010112000a").is_err());
    }

    #[test]
    fn release_ids_sort_lexicographically_by_time() {
        let older = ReleaseId::parse("20230101120000").unwrap();
        let newer = ReleaseId::parse("20230102090000").unwrap();
        assert!(older < newer);
    }

    #[test]
    fn layout_derives_all_paths_from_home() {
        let layout = ReleaseLayout::new("/projects/scout/");
        let id = ReleaseId::parse("20230101120000").unwrap();

        assert_eq!(layout.home(), "/projects/scout");
        assert_eq!(layout.shared_path(), "/projects/scout/shared");
        assert_eq!(layout.versions_path(), "/projects/scout/versions");
        assert_eq!(
            layout.version_path(&id),
            "/projects/scout/versions/20230101120000"
        );
        assert_eq!(layout.current_path(), "/projects/scout/current");
        assert_eq!(layout.lock_path(), "/projects/scout/.slipway-lock");
    }
}
