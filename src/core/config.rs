//! Target configuration storage: one JSON file per target under
//! `~/.config/slipway/targets/`.

use std::path::Path;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::paths;
use crate::target::{Target, TargetName};

pub fn load(name: TargetName) -> Result<Target> {
    let path = paths::target(name.as_str())?;
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::config_missing_file(path.display().to_string()));
        }
        Err(e) => {
            return Err(Error::internal_io(
                e.to_string(),
                Some(format!("read {}", path.display())),
            ));
        }
    };

    let mut target: Target = serde_json::from_str(&raw)
        .map_err(|e| Error::config_invalid_json(path.display().to_string(), e))?;
    target.name = name;
    target.validate()?;
    Ok(target)
}

pub fn save(target: &Target) -> Result<()> {
    target.validate()?;

    let path = paths::target(target.name.as_str())?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("create {}", parent.display())))
        })?;
    }

    let payload = serde_json::to_string_pretty(target)
        .map_err(|e| Error::internal_json(e.to_string(), Some("serialize target".to_string())))?;
    std::fs::write(&path, payload)
        .map_err(|e| Error::internal_io(e.to_string(), Some(format!("write {}", path.display()))))
}

pub fn exists(name: TargetName) -> bool {
    paths::target(name.as_str())
        .map(|p| p.exists())
        .unwrap_or(false)
}

pub fn list() -> Vec<TargetName> {
    TargetName::all()
        .iter()
        .copied()
        .filter(|name| exists(*name))
        .collect()
}

/// Merge a JSON spec over the stored target (or over defaults when none is
/// stored yet), validate, and save.
pub fn merge(name: TargetName, json_spec: &str) -> Result<Target> {
    let spec: Value = serde_json::from_str(json_spec)
        .map_err(|e| Error::config_invalid_json(format!("target spec for {}", name), e))?;
    let Value::Object(spec_obj) = spec else {
        return Err(Error::validation_invalid_argument(
            "json",
            "Target spec must be a JSON object",
            None,
        ));
    };

    let mut base = match load(name) {
        Ok(existing) => serde_json::to_value(&existing)
            .map_err(|e| Error::internal_json(e.to_string(), Some("serialize target".to_string())))?,
        Err(e) if e.code == crate::ErrorCode::ConfigMissingFile => {
            Value::Object(serde_json::Map::new())
        }
        Err(e) => return Err(e),
    };

    if let Value::Object(base_obj) = &mut base {
        for (key, value) in spec_obj {
            base_obj.insert(key, value);
        }
    }

    let mut target: Target = serde_json::from_value(base)
        .map_err(|e| Error::config_invalid_json(format!("target spec for {}", name), e))?;
    target.name = name;
    save(&target)?;
    Ok(target)
}

/// Expand and check an identity file path before handing it to ssh.
pub fn resolve_identity_file(target: &Target) -> Result<Option<String>> {
    match &target.identity_file {
        Some(path) if !path.is_empty() => {
            let expanded = shellexpand::tilde(path).to_string();
            if !Path::new(&expanded).exists() {
                return Err(Error::ssh_identity_file_not_found(
                    target.name.as_str(),
                    expanded,
                ));
            }
            Ok(Some(expanded))
        }
        _ => Ok(None),
    }
}
