//! String template rendering utilities.

use std::collections::HashMap;

use crate::error::{Error, Result};

pub struct TemplateVars;

impl TemplateVars {
    pub const HOME: &'static str = "home";
    pub const SHARED_PATH: &'static str = "shared_path";
    pub const VERSIONS_PATH: &'static str = "versions_path";
    pub const VERSION_PATH: &'static str = "version_path";
    pub const CURRENT_PATH: &'static str = "current_path";
    pub const TARGET: &'static str = "target";
    pub const USER: &'static str = "user";
    pub const BRANCH: &'static str = "branch";
    pub const REPO: &'static str = "repo";
}

pub fn render_map(template: &str, variables: &HashMap<String, String>) -> String {
    let mut result = template.to_string();

    for (key, value) in variables {
        let placeholder = format!("{{{{{}}}}}", key);
        result = result.replace(&placeholder, value);
    }

    result
}

/// Render a template and fail if any `{{placeholder}}` is left unresolved.
///
/// Plans are built from user-editable command templates; an unknown variable
/// must surface before the first remote command runs, not in the middle of a
/// deploy.
pub fn render_strict(template: &str, variables: &HashMap<String, String>) -> Result<String> {
    let rendered = render_map(template, variables);

    if let Some(placeholder) = first_placeholder(&rendered) {
        let mut known: Vec<String> = variables.keys().cloned().collect();
        known.sort();
        return Err(Error::config_invalid_value(
            "commandTemplate",
            Some(template.to_string()),
            format!("Unknown template variable '{{{{{}}}}}'", placeholder),
        )
        .with_hint(format!("Known variables: {}", known.join(", "))));
    }

    Ok(rendered)
}

fn first_placeholder(rendered: &str) -> Option<&str> {
    let start = rendered.find("{{")?;
    let rest = &rendered[start + 2..];
    let end = rest.find("}}")?;
    Some(&rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> HashMap<String, String> {
        HashMap::from([
            ("home".to_string(), "/projects/scout".to_string()),
            ("branch".to_string(), "master".to_string()),
        ])
    }

    #[test]
    fn render_map_substitutes_known_variables() {
        let out = render_map("cd {{home}} && git checkout {{branch}}", &vars());
        assert_eq!(out, "cd /projects/scout && git checkout master");
    }

    #[test]
    fn render_strict_accepts_fully_resolved_template() {
        let out = render_strict("echo {{home}}", &vars()).unwrap();
        assert_eq!(out, "echo /projects/scout");
    }

    #[test]
    fn render_strict_rejects_unknown_placeholder() {
        let err = render_strict("rm -rf {{version_path}}", &vars()).unwrap_err();
        assert_eq!(err.code, crate::ErrorCode::ConfigInvalidValue);
        assert!(err.message.contains("Invalid configuration value"));
    }
}
