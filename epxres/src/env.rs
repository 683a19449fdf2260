//! Ambient configuration for locating a results tree.
//!
//! Resolution order for the default results root:
//! 1. `EPX_RESULTS` environment variable (used verbatim)
//! 2. `EPX_HOME` environment variable, with `results` appended
//!
//! Lookups go through the [`EnvSource`] trait so tests can inject a
//! deterministic map instead of mutating the process environment. Values are
//! read fresh on every call; nothing is cached.

use std::path::PathBuf;

use tracing::warn;

use crate::error::ResolveError;

/// Environment variable naming a results directory directly.
pub const RESULTS_ENV: &str = "EPX_RESULTS";

/// Environment variable naming the simulator installation home.
/// The results tree is assumed to live at `$EPX_HOME/results`.
pub const HOME_ENV: &str = "EPX_HOME";

/// Source of environment-style key/value configuration.
pub trait EnvSource {
    /// Return the value for `key`, or `None` if unset.
    fn var(&self, key: &str) -> Option<String>;
}

/// [`EnvSource`] backed by the real process environment.
///
/// Empty values count as unset, so `EPX_RESULTS= epxctl ...` disables the
/// variable rather than pointing at the current directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|value| !value.is_empty())
    }
}

/// Return the default results root from the environment.
///
/// `EPX_RESULTS` takes precedence over `EPX_HOME/results`. Fails with
/// [`ResolveError::NoResultsConfigured`] when neither is set. Existence of
/// the returned path is the caller's concern.
pub fn default_results_root(env: &dyn EnvSource) -> Result<PathBuf, ResolveError> {
    if let Some(results) = env.var(RESULTS_ENV) {
        return Ok(expand_tilde(&results));
    }
    if let Some(home) = env.var(HOME_ENV) {
        let root = expand_tilde(&home).join("results");
        warn!(
            root = %root.display(),
            "{RESULTS_ENV} is not set, defaulting to ${HOME_ENV}/results"
        );
        return Ok(root);
    }
    Err(ResolveError::NoResultsConfigured)
}

/// Expand a leading `~` or `~/` to the user's home directory.
///
/// Left untouched when the home directory cannot be determined or the path
/// does not start with `~`.
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MapEnv;

    #[test]
    fn results_var_wins_over_home() {
        let env = MapEnv::new([(RESULTS_ENV, "/data/results"), (HOME_ENV, "/opt/epx")]);
        let root = default_results_root(&env).expect("root");
        assert_eq!(root, PathBuf::from("/data/results"));
    }

    #[test]
    fn home_fallback_appends_results() {
        let env = MapEnv::new([(HOME_ENV, "/opt/epx")]);
        let root = default_results_root(&env).expect("root");
        assert_eq!(root, PathBuf::from("/opt/epx/results"));
    }

    #[test]
    fn neither_set_is_a_configuration_error() {
        let env = MapEnv::default();
        let err = default_results_root(&env).expect_err("no config");
        assert!(matches!(err, ResolveError::NoResultsConfigured));
    }

    #[test]
    fn tilde_expansion_applies_to_results_var() {
        let env = MapEnv::new([(RESULTS_ENV, "~/results")]);
        let root = default_results_root(&env).expect("root");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(root, home.join("results"));
        } else {
            assert_eq!(root, PathBuf::from("~/results"));
        }
    }

    #[test]
    fn non_tilde_paths_pass_through() {
        assert_eq!(expand_tilde("/srv/epx"), PathBuf::from("/srv/epx"));
        assert_eq!(expand_tilde("relative/dir"), PathBuf::from("relative/dir"));
    }
}
