//! Signal providers and the per-iteration fan-out/fan-in.
//!
//! A provider never fails the iteration: errors, panics and timeouts are
//! turned into a sentinel fragment by [`gather`], using the provider's own
//! [`SignalProvider::unavailable`] shape.

mod providers;
pub mod scripts;

pub use providers::{
    default_providers, LocaleProvider, OpaqueProvider, SensorProvider, WebGpuProvider,
};

use crate::runtime::Runtime;
use anyhow::Result;
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

/// Reason recorded when a provider exceeds its time budget.
pub const TIMEOUT: &str = "TIMEOUT";
/// Reason recorded when a provider panics.
pub const PROVIDER_PANICKED: &str = "PROVIDER_PANICKED";

/// Graphics adapter information as reported by the WebGPU probe.
///
/// `supported: false` with an `error` means the API is absent or threw;
/// `supported: true` with a `status` means an API without an adapter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GraphicsInfo {
    pub supported: bool,
    pub vendor: Option<String>,
    pub architecture: Option<String>,
    pub driver_version: Option<String>,
    pub error: Option<String>,
    pub status: Option<String>,
    pub max_texture_dimension: Option<u64>,
    pub max_buffer_size: Option<u64>,
}

/// Motion sensor availability and accelerometer permission state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorInfo {
    pub gyroscope_supported: bool,
    pub accel_permission_state: Option<String>,
    pub error: Option<String>,
}

/// Signals whose content is only ever compared, never interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpaqueKind {
    CanvasHash,
    WebglRenderer,
    AudioValue,
    MathJitter,
}

impl OpaqueKind {
    pub const ALL: [OpaqueKind; 4] = [
        OpaqueKind::CanvasHash,
        OpaqueKind::WebglRenderer,
        OpaqueKind::AudioValue,
        OpaqueKind::MathJitter,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            OpaqueKind::CanvasHash => "canvas_hash",
            OpaqueKind::WebglRenderer => "webgl_renderer",
            OpaqueKind::AudioValue => "audio_value",
            OpaqueKind::MathJitter => "math_jitter_hash",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpaqueSignal {
    pub value: Option<Value>,
    pub error: Option<String>,
}

/// The identity the runtime reported after spoofing was applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservedLocale {
    pub timezone: Option<String>,
    pub language: Option<String>,
    pub error: Option<String>,
}

/// One provider's contribution to a sample.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalFragment {
    Graphics(GraphicsInfo),
    Sensor(SensorInfo),
    Opaque(OpaqueKind, OpaqueSignal),
    Locale(ObservedLocale),
}

/// Source of one category of environment signal.
pub trait SignalProvider: Send + Sync {
    /// Stable name used in logs.
    fn name(&self) -> &str;

    /// Read the signal from `runtime`.
    fn collect<'a>(&'a self, runtime: &'a dyn Runtime) -> BoxFuture<'a, Result<SignalFragment>>;

    /// The sentinel fragment reported when collection failed for `reason`.
    fn unavailable(&self, reason: &str) -> SignalFragment;
}

/// Run every provider concurrently on the current task and wait for all of
/// them to settle. Fragments come back in provider order.
pub async fn gather(
    providers: &[Arc<dyn SignalProvider>],
    runtime: &dyn Runtime,
    timeout: Option<Duration>,
) -> Vec<SignalFragment> {
    join_all(
        providers
            .iter()
            .map(|provider| settle(provider.as_ref(), runtime, timeout)),
    )
    .await
}

async fn settle(
    provider: &dyn SignalProvider,
    runtime: &dyn Runtime,
    timeout: Option<Duration>,
) -> SignalFragment {
    // A panic while building the future counts the same as one while polling it.
    let collect = match std::panic::catch_unwind(AssertUnwindSafe(|| provider.collect(runtime))) {
        Ok(future) => AssertUnwindSafe(future).catch_unwind(),
        Err(_) => {
            tracing::warn!(provider = provider.name(), "signal provider panicked");
            return provider.unavailable(PROVIDER_PANICKED);
        }
    };
    let settled = match timeout {
        Some(limit) => match tokio::time::timeout(limit, collect).await {
            Ok(settled) => settled,
            Err(_) => {
                tracing::warn!(provider = provider.name(), ?limit, "signal provider timed out");
                return provider.unavailable(TIMEOUT);
            }
        },
        None => collect.await,
    };

    match settled {
        Ok(Ok(fragment)) => {
            tracing::debug!(provider = provider.name(), ?fragment, "signal collected");
            fragment
        }
        Ok(Err(e)) => {
            tracing::warn!(provider = provider.name(), "signal unavailable: {:#}", e);
            provider.unavailable(&e.to_string())
        }
        Err(_) => {
            tracing::warn!(provider = provider.name(), "signal provider panicked");
            provider.unavailable(PROVIDER_PANICKED)
        }
    }
}

/// Everything gathered during one iteration, keyed by category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalBundle {
    pub graphics: Option<GraphicsInfo>,
    pub sensor: Option<SensorInfo>,
    pub opaque: HashMap<OpaqueKind, OpaqueSignal>,
    pub locale: Option<ObservedLocale>,
}

impl SignalBundle {
    /// Merge fragments; a later fragment of the same category replaces an
    /// earlier one.
    pub fn from_fragments(fragments: impl IntoIterator<Item = SignalFragment>) -> Self {
        let mut bundle = Self::default();
        for fragment in fragments {
            match fragment {
                SignalFragment::Graphics(info) => bundle.graphics = Some(info),
                SignalFragment::Sensor(info) => bundle.sensor = Some(info),
                SignalFragment::Opaque(kind, signal) => {
                    bundle.opaque.insert(kind, signal);
                }
                SignalFragment::Locale(locale) => bundle.locale = Some(locale),
            }
        }
        bundle
    }

    pub fn opaque(&self, kind: OpaqueKind) -> Option<&OpaqueSignal> {
        self.opaque.get(&kind)
    }
}
