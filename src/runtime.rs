//! The runtime whose identity surfaces are spoofed and probed.
//!
//! Every signal-reading path goes through a [`Runtime`] handle instead of
//! patching shared globals, so the "current profile" lives in exactly one
//! place per runtime.

use anyhow::{anyhow, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

/// What a runtime reports through its timezone and locale accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub timezone: String,
    pub languages: Vec<String>,
}

impl Identity {
    pub fn new<I, S>(timezone: impl Into<String>, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            timezone: timezone.into(),
            languages: languages.into_iter().map(Into::into).collect(),
        }
    }

    pub fn primary_language(&self) -> Option<&str> {
        self.languages.first().map(String::as_str)
    }
}

/// A named signal query. Browser runtimes evaluate `script`; emulated
/// runtimes answer by `name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    pub name: &'static str,
    pub script: &'static str,
}

/// Identity surfaces plus probe evaluation for one runtime.
///
/// Implementations must tolerate being called concurrently by several
/// providers while no override is in flight.
pub trait Runtime: Send + Sync {
    /// Read the identity currently reported by the runtime.
    fn identity(&self) -> BoxFuture<'_, Result<Identity>>;

    /// Override the timezone accessor.
    fn set_timezone<'a>(&'a self, timezone: &'a str) -> BoxFuture<'a, Result<()>>;

    /// Override the language accessors (`languages[0]` is primary).
    fn set_languages<'a>(&'a self, languages: &'a [String]) -> BoxFuture<'a, Result<()>>;

    /// Drop every override and report the runtime's own identity again.
    fn clear_overrides(&self) -> BoxFuture<'_, Result<()>>;

    /// Evaluate a probe, returning its JSON value (`None` for `undefined`).
    fn probe<'a>(&'a self, probe: &'a Probe) -> BoxFuture<'a, Result<Option<Value>>>;
}

#[derive(Debug, Default)]
struct Overrides {
    timezone: Option<String>,
    languages: Option<Vec<String>>,
}

/// In-process runtime: a base identity, per-surface overrides and canned
/// probe answers.
///
/// # Example
///
/// ```rust
/// use fp_sampler::runtime::{EmulatedRuntime, Identity};
/// use serde_json::json;
///
/// let runtime = EmulatedRuntime::new(Identity::new("Europe/Dublin", ["en-IE"]))
///     .with_answer("sensors", json!({"gyroscope_supported": false}));
/// assert_eq!(runtime.current().timezone, "Europe/Dublin");
/// ```
#[derive(Debug)]
pub struct EmulatedRuntime {
    base: Identity,
    overrides: RwLock<Overrides>,
    answers: RwLock<HashMap<String, Value>>,
    reject_timezone: AtomicBool,
    reject_languages: AtomicBool,
}

impl EmulatedRuntime {
    pub fn new(base: Identity) -> Self {
        Self {
            base,
            overrides: RwLock::new(Overrides::default()),
            answers: RwLock::new(HashMap::new()),
            reject_timezone: AtomicBool::new(false),
            reject_languages: AtomicBool::new(false),
        }
    }

    /// Register the value returned for the probe called `name`.
    pub fn with_answer(self, name: impl Into<String>, value: Value) -> Self {
        self.set_answer(name, value);
        self
    }

    pub fn set_answer(&self, name: impl Into<String>, value: Value) {
        self.answers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.into(), value);
    }

    /// Make subsequent timezone overrides fail.
    pub fn reject_timezone(&self, reject: bool) {
        self.reject_timezone.store(reject, Ordering::SeqCst);
    }

    /// Make subsequent language overrides fail.
    pub fn reject_languages(&self, reject: bool) {
        self.reject_languages.store(reject, Ordering::SeqCst);
    }

    /// The identity as observed right now.
    pub fn current(&self) -> Identity {
        let overrides = self.overrides.read().unwrap_or_else(|e| e.into_inner());
        Identity {
            timezone: overrides
                .timezone
                .clone()
                .unwrap_or_else(|| self.base.timezone.clone()),
            languages: overrides
                .languages
                .clone()
                .unwrap_or_else(|| self.base.languages.clone()),
        }
    }

    pub fn base(&self) -> &Identity {
        &self.base
    }
}

impl Default for EmulatedRuntime {
    fn default() -> Self {
        Self::new(Identity::new("UTC", ["en-US", "en"]))
    }
}

impl Runtime for EmulatedRuntime {
    fn identity(&self) -> BoxFuture<'_, Result<Identity>> {
        async move { Ok(self.current()) }.boxed()
    }

    fn set_timezone<'a>(&'a self, timezone: &'a str) -> BoxFuture<'a, Result<()>> {
        async move {
            if self.reject_timezone.load(Ordering::SeqCst) {
                return Err(anyhow!("timezone surface is not writable"));
            }
            self.overrides
                .write()
                .map_err(|_| anyhow!("identity lock poisoned"))?
                .timezone = Some(timezone.to_string());
            Ok(())
        }
        .boxed()
    }

    fn set_languages<'a>(&'a self, languages: &'a [String]) -> BoxFuture<'a, Result<()>> {
        async move {
            if self.reject_languages.load(Ordering::SeqCst) {
                return Err(anyhow!("language surface is not writable"));
            }
            self.overrides
                .write()
                .map_err(|_| anyhow!("identity lock poisoned"))?
                .languages = Some(languages.to_vec());
            Ok(())
        }
        .boxed()
    }

    fn clear_overrides(&self) -> BoxFuture<'_, Result<()>> {
        async move {
            *self
                .overrides
                .write()
                .map_err(|_| anyhow!("identity lock poisoned"))? = Overrides::default();
            Ok(())
        }
        .boxed()
    }

    fn probe<'a>(&'a self, probe: &'a Probe) -> BoxFuture<'a, Result<Option<Value>>> {
        async move {
            let answers = self
                .answers
                .read()
                .map_err(|_| anyhow!("probe table lock poisoned"))?;
            answers
                .get(probe.name)
                .cloned()
                .map(Some)
                .ok_or_else(|| anyhow!("probe '{}' is not available", probe.name))
        }
        .boxed()
    }
}
