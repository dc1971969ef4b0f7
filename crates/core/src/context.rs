//! Process-wide execution context shared read-only by every domain load.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use tracing::warn;

pub const ENV_CHROOT: &str = "HWSCOPE_CHROOT";
pub const ENV_ERROR_POLICY: &str = "HWSCOPE_ERROR_POLICY";
pub const ENV_PRIVILEGED: &str = "HWSCOPE_PRIVILEGED";

/// What a multi-domain run does when one domain fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    #[default]
    Abort,
    Collect,
}

impl FromStr for ErrorPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(ErrorPolicy::Abort),
            "collect" | "continue" => Ok(ErrorPolicy::Collect),
            other => Err(format!("unknown error policy: {other}")),
        }
    }
}

/// Optional settings; unset fields fall through to the next layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextOptions {
    pub root: Option<PathBuf>,
    pub privileged: Option<bool>,
    pub error_policy: Option<ErrorPolicy>,
}

impl ContextOptions {
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> Self {
        let root = get(ENV_CHROOT)
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);
        let privileged = get(ENV_PRIVILEGED).and_then(|value| match parse_flag(&value) {
            Some(flag) => Some(flag),
            None => {
                warn!(variable = ENV_PRIVILEGED, %value, "ignoring unrecognised flag");
                None
            }
        });
        let error_policy = get(ENV_ERROR_POLICY).and_then(|value| match value.parse() {
            Ok(policy) => Some(policy),
            Err(err) => {
                warn!(variable = ENV_ERROR_POLICY, %err, "ignoring setting");
                None
            }
        });
        Self {
            root,
            privileged,
            error_policy,
        }
    }

    /// Fields set in `over` win.
    pub fn merge(self, over: ContextOptions) -> Self {
        Self {
            root: over.root.or(self.root),
            privileged: over.privileged.or(self.privileged),
            error_policy: over.error_policy.or(self.error_policy),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    root: PathBuf,
    privileged: bool,
    error_policy: ErrorPolicy,
}

impl Context {
    /// `detected_privilege` is what the platform check found; an explicit
    /// option overrides it.
    pub fn new(options: ContextOptions, detected_privilege: bool) -> Self {
        Self {
            root: options.root.unwrap_or_else(|| PathBuf::from("/")),
            privileged: options.privileged.unwrap_or(detected_privilege),
            error_policy: options.error_policy.unwrap_or_default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves an absolute system path such as `/proc/meminfo` under the root.
    pub fn path(&self, system_path: impl AsRef<Path>) -> PathBuf {
        let relative: PathBuf = system_path
            .as_ref()
            .components()
            .filter(|component| matches!(component, Component::Normal(_)))
            .collect();
        self.root.join(relative)
    }

    pub fn is_privileged(&self) -> bool {
        self.privileged
    }

    pub fn error_policy(&self) -> ErrorPolicy {
        self.error_policy
    }

    pub fn aborts_on_error(&self) -> bool {
        self.error_policy == ErrorPolicy::Abort
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(ContextOptions::default(), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_to_system_root_and_abort() {
        let ctx = Context::default();
        assert_eq!(ctx.root(), Path::new("/"));
        assert!(!ctx.is_privileged());
        assert!(ctx.aborts_on_error());
        assert_eq!(ctx.path("/proc/meminfo"), PathBuf::from("/proc/meminfo"));
    }

    #[test]
    fn reads_environment_layer() {
        let options = ContextOptions::from_vars(vars(&[
            (ENV_CHROOT, "/tmp/host"),
            (ENV_ERROR_POLICY, "collect"),
            (ENV_PRIVILEGED, "yes"),
        ]));
        let ctx = Context::new(options, false);
        assert_eq!(ctx.path("/sys/class/drm"), PathBuf::from("/tmp/host/sys/class/drm"));
        assert_eq!(ctx.error_policy(), ErrorPolicy::Collect);
        assert!(ctx.is_privileged());
    }

    #[test]
    fn ignores_bad_values() {
        let options = ContextOptions::from_vars(vars(&[
            (ENV_CHROOT, "  "),
            (ENV_ERROR_POLICY, "sometimes"),
            (ENV_PRIVILEGED, "maybe"),
        ]));
        assert_eq!(options, ContextOptions::default());
        assert!(Context::new(options, true).is_privileged());
    }

    #[test]
    fn explicit_options_override_environment() {
        let env = ContextOptions::from_vars(vars(&[(ENV_CHROOT, "/a"), (ENV_ERROR_POLICY, "abort")]));
        let cli = ContextOptions {
            root: Some(PathBuf::from("/b")),
            privileged: None,
            error_policy: Some(ErrorPolicy::Collect),
        };
        let ctx = Context::new(env.merge(cli), false);
        assert_eq!(ctx.root(), Path::new("/b"));
        assert_eq!(ctx.error_policy(), ErrorPolicy::Collect);
    }

    #[test]
    fn path_ignores_parent_components() {
        let ctx = Context::new(
            ContextOptions {
                root: Some(PathBuf::from("/snap")),
                ..ContextOptions::default()
            },
            false,
        );
        assert_eq!(ctx.path("/../etc/passwd"), PathBuf::from("/snap/etc/passwd"));
    }
}
