//! Ambient analyzer configuration.
//!
//! [`AnalyzerConf`] is an explicit, injectable key/value store read by the
//! analyzer during resolution. Handles are cheap to clone and share one
//! underlying map, so a scoped override installed through [`with_setting`]
//! is visible to every holder of the handle for exactly the dynamic extent
//! of the call.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Well-known configuration keys.
pub mod keys {
    /// Whether name resolution distinguishes letter case. Default: `"true"`.
    pub const CASE_SENSITIVE: &str = "analyzer.case_sensitive";

    /// Upper bound on rule fixpoint iterations. Default: `"50"`.
    pub const MAX_ITERATIONS: &str = "analyzer.max_iterations";
}

/// A shared configuration store.
#[derive(Debug, Clone, Default)]
pub struct AnalyzerConf {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl AnalyzerConf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.read().get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.write().insert(key.into(), value.into());
    }

    /// Removes a key, returning the prior value if any.
    pub fn unset(&self, key: &str) -> Option<String> {
        self.write().remove(key)
    }

    /// The case policy for name resolution; sensitive unless configured off.
    pub fn case_sensitive(&self) -> bool {
        self.get(keys::CASE_SENSITIVE)
            .map(|v| v != "false")
            .unwrap_or(true)
    }

    pub fn max_iterations(&self) -> usize {
        self.get(keys::MAX_ITERATIONS)
            .and_then(|v| v.parse().ok())
            .unwrap_or(50)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, String>> {
        self.values.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, String>> {
        self.values.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Installs a value for one key and restores the prior state on drop.
///
/// Restoration happens on every exit path from the owning scope, including
/// unwinding, so an override can never leak into a later analysis run.
pub struct ScopedSetting {
    conf: AnalyzerConf,
    key: String,
    prior: Option<String>,
}

impl ScopedSetting {
    pub fn new(conf: &AnalyzerConf, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let prior = conf.get(&key);
        conf.set(key.clone(), value);
        Self {
            conf: conf.clone(),
            key,
            prior,
        }
    }
}

impl Drop for ScopedSetting {
    fn drop(&mut self) {
        match self.prior.take() {
            Some(value) => self.conf.set(self.key.clone(), value),
            None => {
                self.conf.unset(&self.key);
            }
        }
    }
}

/// Runs `body` with `key` set to `value`, restoring the prior value after.
pub fn with_setting<T>(
    conf: &AnalyzerConf,
    key: &str,
    value: &str,
    body: impl FnOnce() -> T,
) -> T {
    let _guard = ScopedSetting::new(conf, key, value);
    body()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    #[test]
    fn defaults() {
        let conf = AnalyzerConf::new();
        assert!(conf.case_sensitive());
        assert_eq!(conf.max_iterations(), 50);
    }

    #[test]
    fn clones_share_state() {
        let conf = AnalyzerConf::new();
        let other = conf.clone();
        conf.set(keys::CASE_SENSITIVE, "false");
        assert!(!other.case_sensitive());
    }

    #[test]
    fn with_setting_restores_missing_key() {
        let conf = AnalyzerConf::new();
        with_setting(&conf, keys::CASE_SENSITIVE, "false", || {
            assert!(!conf.case_sensitive());
        });
        assert_eq!(conf.get(keys::CASE_SENSITIVE), None);
    }

    #[test]
    fn with_setting_restores_prior_value() {
        let conf = AnalyzerConf::new();
        conf.set(keys::MAX_ITERATIONS, "7");
        with_setting(&conf, keys::MAX_ITERATIONS, "9", || {
            assert_eq!(conf.max_iterations(), 9);
        });
        assert_eq!(conf.max_iterations(), 7);
    }

    #[test]
    fn with_setting_restores_across_panic() {
        let conf = AnalyzerConf::new();
        conf.set(keys::CASE_SENSITIVE, "true");
        let result = catch_unwind(AssertUnwindSafe(|| {
            with_setting(&conf, keys::CASE_SENSITIVE, "false", || {
                panic!("boom");
            })
        }));
        assert!(result.is_err());
        assert_eq!(conf.get(keys::CASE_SENSITIVE).as_deref(), Some("true"));
    }

    #[test]
    fn nested_scopes_unwind_in_order() {
        let conf = AnalyzerConf::new();
        with_setting(&conf, "k", "outer", || {
            with_setting(&conf, "k", "inner", || {
                assert_eq!(conf.get("k").as_deref(), Some("inner"));
            });
            assert_eq!(conf.get("k").as_deref(), Some("outer"));
        });
        assert_eq!(conf.get("k"), None);
    }
}
