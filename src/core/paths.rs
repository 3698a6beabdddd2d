use crate::error::{Error, Result};
use std::env;
use std::path::PathBuf;

/// Base slipway config directory (universal ~/.config/slipway/ on all platforms)
pub fn slipway() -> Result<PathBuf> {
    #[cfg(windows)]
    {
        let appdata = env::var("APPDATA").map_err(|_| {
            Error::internal_unexpected("APPDATA environment variable not set on Windows".to_string())
        })?;
        Ok(PathBuf::from(appdata).join("slipway"))
    }

    #[cfg(not(windows))]
    {
        let home = env::var("HOME").map_err(|_| {
            Error::internal_unexpected(
                "HOME environment variable not set on Unix-like system".to_string(),
            )
        })?;
        Ok(PathBuf::from(home).join(".config").join("slipway"))
    }
}

/// Targets directory
pub fn targets() -> Result<PathBuf> {
    Ok(slipway()?.join("targets"))
}

/// Target config file path
pub fn target(name: &str) -> Result<PathBuf> {
    Ok(targets()?.join(format!("{}.json", name)))
}
