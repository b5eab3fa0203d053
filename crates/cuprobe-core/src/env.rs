//! Environment variable access.
//!
//! Discovery never reads `std::env` directly. Everything goes through an
//! [`EnvSource`] so tests can describe an environment without touching the
//! process-wide one (which would need `unsafe` and a global lock).

use std::collections::HashMap;

/// Read-only view of environment variables.
pub trait EnvSource: Send + Sync {
    /// Value of `key`, or `None` when unset or empty.
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|value| !value.is_empty())
    }
}

/// An in-memory environment.
///
/// # Example
///
/// ```
/// use cuprobe_core::env::{EnvSource, MapEnv};
///
/// let env = MapEnv::new().with("CUDA_HOME", "/opt/cuda");
/// assert_eq!(env.var("CUDA_HOME").as_deref(), Some("/opt/cuda"));
/// assert_eq!(env.var("PATH"), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MapEnv {
    vars: HashMap<String, String>,
}

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }
}

impl EnvSource for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).filter(|value| !value.is_empty()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_env_treats_empty_as_unset() {
        let env = MapEnv::new().with("CUDA_PATH", "");
        assert_eq!(env.var("CUDA_PATH"), None);
    }

    #[test]
    fn test_map_env_set_overwrites() {
        let mut env = MapEnv::new().with("CUDA_HOME", "/a");
        env.set("CUDA_HOME", "/b");
        assert_eq!(env.var("CUDA_HOME").as_deref(), Some("/b"));
    }
}
