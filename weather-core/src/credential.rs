//! API key resolution.
//!
//! The key can come from six places. They are consulted in a fixed order and
//! the first one holding a non-blank value wins.

use crate::storage::{KeyValueStore, WEATHER_API_KEY};

/// Compile-time variables, grouped into a single source.
const COMPILE_TIME_KEY: Option<&str> = match option_env!("VITE_WEATHER_API_KEY") {
    Some(v) => Some(v),
    None => match option_env!("VITE_APP_WEATHER_API_KEY") {
        Some(v) => Some(v),
        None => option_env!("PUBLIC_WEATHER_API_KEY"),
    },
};

pub const ENV_KEY: &str = "REACT_APP_WEATHER_API_KEY";
pub const ENV_PUBLIC_KEY: &str = "NEXT_PUBLIC_WEATHER_API_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialSource {
    CompileTime,
    CompileTimeAlt,
    Env,
    EnvPublic,
    Runtime,
    Stored,
}

impl CredentialSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialSource::CompileTime => "compile-time",
            CredentialSource::CompileTimeAlt => "compile-time-alt",
            CredentialSource::Env => "env",
            CredentialSource::EnvPublic => "env-public",
            CredentialSource::Runtime => "runtime",
            CredentialSource::Stored => "stored",
        }
    }
}

impl std::fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Candidate values for every credential source. Empty means "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialSources {
    pub compile_time: String,
    /// Reserved; never filled by [`CredentialSources::load`].
    pub compile_time_alt: String,
    pub env: String,
    pub env_public: String,
    pub runtime: String,
    pub stored: String,
}

impl CredentialSources {
    /// Gather candidates from the process.
    ///
    /// `lookup_env` reads a process variable, `runtime` is a value handed in
    /// at run time (e.g. a command-line flag).
    pub fn load<F>(lookup_env: F, runtime: Option<&str>, store: &dyn KeyValueStore) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let stored = match store.get(WEATHER_API_KEY) {
            Ok(v) => v.unwrap_or_default(),
            Err(err) => {
                tracing::warn!("could not read stored API key: {err:#}");
                String::new()
            }
        };

        Self {
            compile_time: COMPILE_TIME_KEY.unwrap_or_default().to_string(),
            compile_time_alt: String::new(),
            env: lookup_env(ENV_KEY).unwrap_or_default(),
            env_public: lookup_env(ENV_PUBLIC_KEY).unwrap_or_default(),
            runtime: runtime.unwrap_or_default().to_string(),
            stored,
        }
    }

    /// Like [`CredentialSources::load`], reading the real process environment.
    pub fn from_process(runtime: Option<&str>, store: &dyn KeyValueStore) -> Self {
        Self::load(|name| std::env::var(name).ok(), runtime, store)
    }

    fn ordered(&self) -> [(CredentialSource, &str); 6] {
        [
            (CredentialSource::CompileTime, self.compile_time.as_str()),
            (CredentialSource::CompileTimeAlt, self.compile_time_alt.as_str()),
            (CredentialSource::Env, self.env.as_str()),
            (CredentialSource::EnvPublic, self.env_public.as_str()),
            (CredentialSource::Runtime, self.runtime.as_str()),
            (CredentialSource::Stored, self.stored.as_str()),
        ]
    }

    /// The winning source and its trimmed value, if any source is non-blank.
    pub fn resolve_with_source(&self) -> Option<(CredentialSource, String)> {
        self.ordered().into_iter().find_map(|(source, value)| {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then(|| (source, trimmed.to_string()))
        })
    }
}

/// First non-blank candidate, trimmed; empty string when none is set.
pub fn choose_api_key(sources: &CredentialSources) -> String {
    sources
        .resolve_with_source()
        .map(|(_, key)| key)
        .unwrap_or_default()
}
