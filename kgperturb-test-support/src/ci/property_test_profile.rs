//! Property-test run profile shared by every proptest suite in the workspace.
//!
//! `PROGTEST_CASES` overrides the number of cases per property and
//! `KGPERTURB_PBT_FORK` toggles forked execution. Invalid overrides are
//! reported and ignored.

use std::env;

/// Environment variable controlling proptest case counts.
pub const PROGTEST_CASES_ENV_KEY: &str = "PROGTEST_CASES";
/// Environment variable controlling proptest process forking.
pub const KGPERTURB_PBT_FORK_ENV_KEY: &str = "KGPERTURB_PBT_FORK";

/// Runtime profile for property-test execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProptestRunProfile {
    cases: u32,
    fork: bool,
}

impl ProptestRunProfile {
    /// Loads a profile from the environment, falling back to the defaults.
    ///
    /// # Examples
    /// ```
    /// use kgperturb_test_support::ci::property_test_profile::ProptestRunProfile;
    ///
    /// let profile = ProptestRunProfile::load(64, false);
    /// assert!(profile.cases() > 0);
    /// ```
    #[must_use]
    pub fn load(default_cases: u32, default_fork: bool) -> Self {
        Self {
            cases: override_from_env(PROGTEST_CASES_ENV_KEY, parse_cases).unwrap_or(default_cases),
            fork: override_from_env(KGPERTURB_PBT_FORK_ENV_KEY, parse_flag).unwrap_or(default_fork),
        }
    }

    /// Number of cases to run per property.
    #[must_use]
    pub fn cases(&self) -> u32 {
        self.cases
    }

    /// Whether cases run in forked subprocesses.
    #[must_use]
    pub fn fork(&self) -> bool {
        self.fork
    }
}

fn override_from_env<T>(key: &'static str, parse: fn(&str) -> Result<T, String>) -> Option<T> {
    let raw = env::var(key).ok()?;
    parse(&raw)
        .inspect_err(|reason| {
            tracing::warn!(
                env = key,
                raw = %raw,
                reason = %reason,
                "ignoring invalid property-test override",
            );
        })
        .ok()
}

fn parse_cases(raw: &str) -> Result<u32, String> {
    match raw.trim().parse::<u32>() {
        Ok(0) => Err("cases must be positive".to_owned()),
        Ok(cases) => Ok(cases),
        Err(error) => Err(format!("not a case count: {error}")),
    }
}

fn parse_flag(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(format!("`{other}` is not a boolean flag")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::{Mutex, MutexGuard};

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Serialises environment edits and restores the previous values on drop.
    struct ScopedEnv {
        saved: Vec<(&'static str, Option<String>)>,
        _lock: MutexGuard<'static, ()>,
    }

    impl ScopedEnv {
        fn new(overrides: &[(&'static str, Option<&str>)]) -> Self {
            let lock = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            let mut saved = Vec::with_capacity(overrides.len());
            for (key, value) in overrides {
                saved.push((*key, env::var(key).ok()));
                // SAFETY: every test touching these keys holds ENV_LOCK.
                unsafe {
                    match value {
                        Some(value) => env::set_var(key, value),
                        None => env::remove_var(key),
                    }
                }
            }
            Self { saved, _lock: lock }
        }
    }

    impl Drop for ScopedEnv {
        fn drop(&mut self) {
            for (key, value) in self.saved.drain(..) {
                // SAFETY: ENV_LOCK is still held by this guard.
                unsafe {
                    match value {
                        Some(value) => env::set_var(key, value),
                        None => env::remove_var(key),
                    }
                }
            }
        }
    }

    #[rstest]
    fn defaults_apply_without_overrides() {
        let _env = ScopedEnv::new(&[
            (PROGTEST_CASES_ENV_KEY, None),
            (KGPERTURB_PBT_FORK_ENV_KEY, None),
        ]);
        let profile = ProptestRunProfile::load(64, false);
        assert_eq!(profile, ProptestRunProfile { cases: 64, fork: false });
    }

    #[rstest]
    #[case("1", 1)]
    #[case(" 250 ", 250)]
    #[case("25000", 25_000)]
    fn valid_case_overrides_apply(#[case] raw: &str, #[case] expected: u32) {
        let _env = ScopedEnv::new(&[(PROGTEST_CASES_ENV_KEY, Some(raw))]);
        assert_eq!(ProptestRunProfile::load(64, false).cases(), expected);
    }

    #[rstest]
    #[case("0")]
    #[case("-1")]
    #[case("many")]
    fn invalid_case_overrides_fall_back(#[case] raw: &str) {
        let _env = ScopedEnv::new(&[(PROGTEST_CASES_ENV_KEY, Some(raw))]);
        assert_eq!(ProptestRunProfile::load(64, false).cases(), 64);
    }

    #[rstest]
    #[case("true", true)]
    #[case("YES", true)]
    #[case("on", true)]
    #[case("0", false)]
    #[case("Off", false)]
    fn valid_fork_overrides_apply(#[case] raw: &str, #[case] expected: bool) {
        let _env = ScopedEnv::new(&[(KGPERTURB_PBT_FORK_ENV_KEY, Some(raw))]);
        assert_eq!(ProptestRunProfile::load(64, !expected).fork(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("maybe")]
    #[case("2")]
    fn invalid_fork_overrides_fall_back(#[case] raw: &str) {
        let _env = ScopedEnv::new(&[(KGPERTURB_PBT_FORK_ENV_KEY, Some(raw))]);
        assert!(ProptestRunProfile::load(64, true).fork());
    }
}
