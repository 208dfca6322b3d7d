use crate::config::SamplerConfig;
use crate::controller::CollectionController;
use crate::error::Result;
use crate::runtime::Runtime;
use crate::session::SessionContext;
use crate::signals::{default_providers, SignalProvider};
use crate::submit::SubmissionOutcome;
use std::sync::Arc;

/// A configured pipeline bound to one runtime.
///
/// # Example
///
/// ```rust,no_run
/// # async fn run(page: chromiumoxide::Page) -> anyhow::Result<()> {
/// use fp_sampler::cdp::CdpRuntime;
/// use fp_sampler::{Sampler, SamplerConfig};
/// use std::sync::Arc;
///
/// let runtime = Arc::new(CdpRuntime::attach(page).await?);
/// let mut sampler = Sampler::new(SamplerConfig::default(), runtime)?;
/// let outcome = sampler.collect_and_submit().await;
/// println!("{:?}: {}", outcome.status, outcome.message);
/// # Ok(())
/// # }
/// ```
pub struct Sampler {
    config: SamplerConfig,
    controller: CollectionController,
}

impl Sampler {
    /// Pipeline with the built-in signal providers.
    pub fn new(config: SamplerConfig, runtime: Arc<dyn Runtime>) -> Result<Self> {
        Self::with_providers(config, runtime, default_providers())
    }

    pub fn with_providers(
        config: SamplerConfig,
        runtime: Arc<dyn Runtime>,
        providers: Vec<Arc<dyn SignalProvider>>,
    ) -> Result<Self> {
        let controller = CollectionController::new(&config, runtime, providers)?;
        Ok(Self { config, controller })
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    pub fn controller(&self) -> &CollectionController {
        &self.controller
    }

    /// A fresh session tagged from the configured invocation URL, or with
    /// `UNKNOWN` tags when there is none.
    pub fn new_session(&self) -> SessionContext {
        match &self.config.invocation_url {
            Some(url) => SessionContext::from_invocation_url(url),
            None => SessionContext::new(None, None),
        }
    }

    /// Run every profile, submit the batch and return the outcome.
    pub async fn collect_and_submit(&mut self) -> SubmissionOutcome {
        let session = self.new_session();
        tracing::info!(
            session = %session.session_id,
            device = %session.device_tag,
            browser = %session.browser_tag,
            profiles = self.config.profiles.len(),
            "starting sampling run"
        );
        self.controller.run(&session).await
    }
}
