use crate::assembler::{assemble, Batch};
use crate::config::SamplerConfig;
use crate::error::Result;
use crate::profiles::ProfileTable;
use crate::runtime::Runtime;
use crate::session::SessionContext;
use crate::signals::{self, SignalBundle, SignalProvider};
use crate::spoofer::ProfileSpoofer;
use crate::submit::{SubmissionClient, SubmissionOutcome};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Where a [`CollectionController`] is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    /// Collecting the sample for profile `i` (0-based)
    Iterating(usize),
    /// Waiting after profile `i` before the next one starts
    Pacing(usize),
    Finalizing,
    Submitting,
    Done,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerState::Idle => f.write_str("idle"),
            ControllerState::Iterating(i) => write!(f, "iterating({})", i),
            ControllerState::Pacing(i) => write!(f, "pacing({})", i),
            ControllerState::Finalizing => f.write_str("finalizing"),
            ControllerState::Submitting => f.write_str("submitting"),
            ControllerState::Done => f.write_str("done"),
        }
    }
}

/// Drives spoofing, signal collection and assembly once per profile, in
/// table order, then hands the frozen batch to the submission client.
///
/// Iterations are strictly sequential: the sample for profile `i` is in the
/// batch before profile `i + 1` is applied. Providers within one iteration
/// run concurrently and are all settled before the sample is assembled.
pub struct CollectionController {
    runtime: Arc<dyn Runtime>,
    providers: Vec<Arc<dyn SignalProvider>>,
    profiles: ProfileTable,
    pacing: Duration,
    provider_timeout: Option<Duration>,
    client: SubmissionClient,
    state: ControllerState,
    transitions: Vec<ControllerState>,
}

impl CollectionController {
    pub fn new(
        config: &SamplerConfig,
        runtime: Arc<dyn Runtime>,
        providers: Vec<Arc<dyn SignalProvider>>,
    ) -> Result<Self> {
        let client = SubmissionClient::new(config.endpoint.clone(), config.request_timeout())?;
        Ok(Self {
            runtime,
            providers,
            profiles: config.profiles.clone(),
            pacing: config.pacing(),
            provider_timeout: config.provider_timeout(),
            client,
            state: ControllerState::Idle,
            transitions: vec![ControllerState::Idle],
        })
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Every state entered during the latest run, starting with `Idle`.
    pub fn transitions(&self) -> &[ControllerState] {
        &self.transitions
    }

    pub fn profiles(&self) -> &ProfileTable {
        &self.profiles
    }

    fn transition(&mut self, next: ControllerState) {
        tracing::debug!(from = %self.state, to = %next, "controller transition");
        self.state = next;
        self.transitions.push(next);
    }

    /// Collect one sample per profile. Leaves the controller in
    /// `Finalizing` with the identity from before the run restored.
    pub async fn collect(&mut self, session: &SessionContext) -> Batch {
        self.state = ControllerState::Idle;
        self.transitions = vec![ControllerState::Idle];

        let profiles = self.profiles.clone();
        let total = profiles.len();
        let spoofer = ProfileSpoofer::acquire(Arc::clone(&self.runtime)).await;
        let mut samples = Vec::with_capacity(total);

        for (i, profile) in profiles.iter().enumerate() {
            self.transition(ControllerState::Iterating(i));

            spoofer.apply(profile).await;
            let fragments =
                signals::gather(&self.providers, self.runtime.as_ref(), self.provider_timeout)
                    .await;
            let sample = assemble(
                session,
                profile,
                i + 1,
                &SignalBundle::from_fragments(fragments),
            );
            tracing::info!(
                session = %session.session_id,
                index = sample.sample_index,
                label = %sample.label_type,
                "collected sample {}/{}",
                i + 1,
                total
            );
            samples.push(sample);

            if i + 1 < total {
                self.transition(ControllerState::Pacing(i));
                tokio::time::sleep(self.pacing).await;
            }
        }

        spoofer.release().await;
        self.transition(ControllerState::Finalizing);
        Batch::from(samples)
    }

    /// Collect, then submit. Resolves to the client's outcome unchanged.
    pub async fn run(&mut self, session: &SessionContext) -> SubmissionOutcome {
        let batch = self.collect(session).await;
        self.transition(ControllerState::Submitting);
        let outcome = self.client.submit(&batch).await;
        self.transition(ControllerState::Done);
        outcome
    }
}
