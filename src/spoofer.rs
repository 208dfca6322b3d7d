//! Best-effort locale and timezone spoofing, scoped to one pipeline run.

use crate::profiles::Profile;
use crate::runtime::{Identity, Runtime};
use std::sync::Arc;

/// Which surfaces an [`ProfileSpoofer::apply`] call managed to override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedSurfaces {
    pub timezone: bool,
    pub languages: bool,
}

impl AppliedSurfaces {
    pub fn complete(&self) -> bool {
        self.timezone && self.languages
    }
}

/// Applies profiles to a runtime and puts back whatever identity it
/// reported when the spoofer was acquired.
///
/// An override that was already active at acquire time survives the run.
/// Spoofing never fails: a surface that cannot be overridden is logged and
/// left as it was. Dropping the spoofer without calling
/// [`release`](Self::release) spawns the restore on the current tokio
/// runtime, if there is one.
///
/// # Example
///
/// ```rust
/// # async fn run() {
/// use fp_sampler::profiles::Profile;
/// use fp_sampler::runtime::EmulatedRuntime;
/// use fp_sampler::spoofer::ProfileSpoofer;
/// use std::sync::Arc;
///
/// let runtime = Arc::new(EmulatedRuntime::default());
/// let spoofer = ProfileSpoofer::acquire(runtime.clone()).await;
/// spoofer.apply(&Profile::new("de", "Europe/Berlin", ["de-DE"])).await;
/// assert_eq!(runtime.current().timezone, "Europe/Berlin");
///
/// spoofer.release().await;
/// assert_eq!(runtime.current().timezone, "UTC");
/// # }
/// ```
pub struct ProfileSpoofer {
    runtime: Arc<dyn Runtime>,
    prior: Option<Identity>,
    released: bool,
}

impl ProfileSpoofer {
    /// Record the runtime's current identity so it can be put back later.
    ///
    /// When the identity cannot be read, release falls back to clearing
    /// every override.
    pub async fn acquire(runtime: Arc<dyn Runtime>) -> Self {
        let prior = match runtime.identity().await {
            Ok(identity) => Some(identity),
            Err(e) => {
                tracing::warn!("could not read identity before spoofing: {:#}", e);
                None
            }
        };
        Self {
            runtime,
            prior,
            released: false,
        }
    }

    /// The identity that release restores, if it could be read.
    pub fn prior(&self) -> Option<&Identity> {
        self.prior.as_ref()
    }

    /// Override timezone and language surfaces. Both calls have settled
    /// when this returns.
    pub async fn apply(&self, profile: &Profile) -> AppliedSurfaces {
        let timezone = match self.runtime.set_timezone(&profile.timezone).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(profile = %profile.label, "timezone spoofing failed: {:#}", e);
                false
            }
        };

        let languages = match self.runtime.set_languages(&profile.languages).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(profile = %profile.label, "language spoofing failed: {:#}", e);
                false
            }
        };

        tracing::debug!(
            profile = %profile.label,
            timezone = %profile.timezone,
            language = profile.primary_language(),
            complete = timezone && languages,
            "profile applied"
        );
        AppliedSurfaces {
            timezone,
            languages,
        }
    }

    /// Restore the identity recorded at acquire time.
    pub async fn release(mut self) {
        self.released = true;
        restore(self.runtime.as_ref(), self.prior.as_ref()).await;
    }
}

impl Drop for ProfileSpoofer {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let runtime = Arc::clone(&self.runtime);
                let prior = self.prior.take();
                handle.spawn(async move { restore(runtime.as_ref(), prior.as_ref()).await });
            }
            Err(_) => {
                tracing::warn!("spoofer dropped outside a tokio runtime, overrides left in place")
            }
        }
    }
}

/// Clear every override, then re-apply any surface of `prior` that the
/// bare runtime does not report by itself.
async fn restore(runtime: &dyn Runtime, prior: Option<&Identity>) {
    match runtime.clear_overrides().await {
        Ok(()) => tracing::debug!("identity overrides cleared"),
        Err(e) => tracing::warn!("failed to clear identity overrides: {:#}", e),
    }

    let Some(prior) = prior else {
        return;
    };
    let bare = match runtime.identity().await {
        Ok(identity) => identity,
        Err(e) => {
            tracing::warn!("could not read identity after clearing: {:#}", e);
            return;
        }
    };

    if bare.timezone != prior.timezone {
        if let Err(e) = runtime.set_timezone(&prior.timezone).await {
            tracing::warn!(timezone = %prior.timezone, "failed to restore timezone: {:#}", e);
        }
    }
    if bare.languages != prior.languages {
        if let Err(e) = runtime.set_languages(&prior.languages).await {
            tracing::warn!(languages = ?prior.languages, "failed to restore languages: {:#}", e);
        }
    }
}
