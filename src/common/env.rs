//! Process environment helpers: typed lookups and scoped overrides.

use anyhow::{Context, Result, anyhow};
use std::collections::HashMap;
use std::env;
use std::ffi::OsString;

pub const CPU_COUNT_ENV_VAR: &str = "SYSPKG_CPU_COUNT";

/// Somewhere environment-style variables can be read from.
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// `"1"` or any casing of `"true"`.
pub fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

/// Types [`get_env`] can convert a variable into.
pub trait EnvValue: Sized {
    fn from_env_str(key: &str, value: &str) -> Result<Self>;
}

impl EnvValue for String {
    fn from_env_str(_key: &str, value: &str) -> Result<Self> {
        Ok(value.to_string())
    }
}

impl EnvValue for bool {
    fn from_env_str(_key: &str, value: &str) -> Result<Self> {
        Ok(parse_bool(value))
    }
}

impl EnvValue for Vec<String> {
    fn from_env_str(_key: &str, value: &str) -> Result<Self> {
        Ok(value.split(',').map(|s| s.trim().to_string()).collect())
    }
}

macro_rules! parsed_env_value {
    ($($ty:ty),*) => {
        $(
            impl EnvValue for $ty {
                fn from_env_str(key: &str, value: &str) -> Result<Self> {
                    value
                        .trim()
                        .parse::<$ty>()
                        .with_context(|| format!("invalid value for {}: '{}'", key, value))
                }
            }
        )*
    };
}

parsed_env_value!(i32, i64, u32, u64, usize, f32, f64);

/// Read `key` from `source`, converted to the type of `default`.
pub fn get_env<T: EnvValue>(key: &str, default: T, source: &impl EnvSource) -> Result<T> {
    match source.var(key) {
        Some(value) => T::from_env_str(key, &value),
        None => Ok(default),
    }
}

/// Number of jobs to run in parallel.
pub fn cpu_count() -> Result<usize> {
    cpu_count_from(&ProcessEnv)
}

pub fn cpu_count_from(source: &impl EnvSource) -> Result<usize> {
    if let Some(value) = source.var(CPU_COUNT_ENV_VAR) {
        return value
            .trim()
            .parse::<usize>()
            .map_err(|_| anyhow!("Invalid {} value: {}", CPU_COUNT_ENV_VAR, value));
    }
    Ok(std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvChange {
    Set(String),
    Unset,
    /// Prepend entries to a path-list variable, keeping what was there.
    PrependPaths(Vec<String>),
}

impl EnvChange {
    pub fn set(value: impl Into<String>) -> Self {
        Self::Set(value.into())
    }

    pub fn prepend<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::PrependPaths(paths.into_iter().map(Into::into).collect())
    }
}

/// Restores every variable it touched when dropped.
#[must_use = "the environment is restored as soon as the scope is dropped"]
#[derive(Debug)]
pub struct EnvironmentScope {
    saved: Vec<(String, Option<OsString>)>,
}

impl EnvironmentScope {
    pub fn apply<K: AsRef<str>>(changes: &[(K, EnvChange)]) -> Self {
        let mut saved = Vec::with_capacity(changes.len());
        for (key, change) in changes {
            let key = key.as_ref();
            saved.push((key.to_string(), env::var_os(key)));
            match change {
                EnvChange::Set(value) => set_var(key, value),
                EnvChange::Unset => remove_var(key),
                EnvChange::PrependPaths(paths) => {
                    let mut entries: Vec<OsString> = paths.iter().map(OsString::from).collect();
                    if let Some(existing) = env::var_os(key) {
                        entries.extend(env::split_paths(&existing).map(Into::into));
                    }
                    match env::join_paths(entries) {
                        Ok(joined) => set_var(key, joined),
                        // An entry containing the separator cannot be joined.
                        Err(_) => {
                            let sep = if cfg!(windows) { ";" } else { ":" };
                            set_var(key, paths.join(sep))
                        }
                    }
                }
            }
        }
        Self { saved }
    }
}

impl Drop for EnvironmentScope {
    fn drop(&mut self) {
        // Reverse order so a key listed twice ends at its first snapshot.
        for (key, previous) in self.saved.drain(..).rev() {
            match previous {
                Some(value) => set_var(&key, value),
                None => remove_var(&key),
            }
        }
    }
}

/// Apply `changes` until the returned guard is dropped.
pub fn environment_append<K: AsRef<str>>(changes: &[(K, EnvChange)]) -> EnvironmentScope {
    EnvironmentScope::apply(changes)
}

fn set_var(key: &str, value: impl AsRef<std::ffi::OsStr>) {
    // SAFETY: syspkg runs its commands sequentially on one thread; tests
    // touching the environment are serialized.
    unsafe { env::set_var(key, value) }
}

fn remove_var(key: &str) {
    // SAFETY: see set_var.
    unsafe { env::remove_var(key) }
}
