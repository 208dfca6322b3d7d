use super::scripts;
use super::{
    GraphicsInfo, ObservedLocale, OpaqueKind, OpaqueSignal, SensorInfo, SignalFragment,
    SignalProvider,
};
use crate::runtime::{Probe, Runtime};
use anyhow::{anyhow, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::sync::Arc;

/// WebGPU, sensors, the four opaque hashes and the observed locale, in that
/// order.
pub fn default_providers() -> Vec<Arc<dyn SignalProvider>> {
    let mut providers: Vec<Arc<dyn SignalProvider>> =
        vec![Arc::new(WebGpuProvider), Arc::new(SensorProvider)];
    providers.extend(
        OpaqueKind::ALL
            .into_iter()
            .map(|kind| Arc::new(OpaqueProvider::new(kind)) as Arc<dyn SignalProvider>),
    );
    providers.push(Arc::new(LocaleProvider));
    providers
}

async fn probe_value(runtime: &dyn Runtime, probe: &Probe) -> Result<Value> {
    runtime
        .probe(probe)
        .await?
        .ok_or_else(|| anyhow!("probe '{}' returned undefined", probe.name))
}

/// Graphics adapter vendor, architecture and limits.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebGpuProvider;

impl SignalProvider for WebGpuProvider {
    fn name(&self) -> &str {
        scripts::WEBGPU.name
    }

    fn collect<'a>(&'a self, runtime: &'a dyn Runtime) -> BoxFuture<'a, Result<SignalFragment>> {
        async move {
            let value = probe_value(runtime, &scripts::WEBGPU).await?;
            let info: GraphicsInfo = serde_json::from_value(value)?;
            Ok(SignalFragment::Graphics(info))
        }
        .boxed()
    }

    fn unavailable(&self, reason: &str) -> SignalFragment {
        SignalFragment::Graphics(GraphicsInfo {
            supported: false,
            error: Some(reason.to_string()),
            ..Default::default()
        })
    }
}

/// Gyroscope presence and accelerometer permission.
#[derive(Debug, Clone, Copy, Default)]
pub struct SensorProvider;

impl SignalProvider for SensorProvider {
    fn name(&self) -> &str {
        scripts::SENSORS.name
    }

    fn collect<'a>(&'a self, runtime: &'a dyn Runtime) -> BoxFuture<'a, Result<SignalFragment>> {
        async move {
            let value = probe_value(runtime, &scripts::SENSORS).await?;
            let info: SensorInfo = serde_json::from_value(value)?;
            Ok(SignalFragment::Sensor(info))
        }
        .boxed()
    }

    fn unavailable(&self, reason: &str) -> SignalFragment {
        SignalFragment::Sensor(SensorInfo {
            gyroscope_supported: false,
            accel_permission_state: None,
            error: Some(reason.to_string()),
        })
    }
}

/// A hash-like value that is recorded verbatim.
#[derive(Debug, Clone, Copy)]
pub struct OpaqueProvider {
    kind: OpaqueKind,
}

impl OpaqueProvider {
    pub fn new(kind: OpaqueKind) -> Self {
        Self { kind }
    }

    fn probe(&self) -> &'static Probe {
        match self.kind {
            OpaqueKind::CanvasHash => &scripts::CANVAS_HASH,
            OpaqueKind::WebglRenderer => &scripts::WEBGL_RENDERER,
            OpaqueKind::AudioValue => &scripts::AUDIO_VALUE,
            OpaqueKind::MathJitter => &scripts::MATH_JITTER,
        }
    }
}

impl SignalProvider for OpaqueProvider {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn collect<'a>(&'a self, runtime: &'a dyn Runtime) -> BoxFuture<'a, Result<SignalFragment>> {
        async move {
            let value = runtime.probe(self.probe()).await?.filter(|v| !v.is_null());
            Ok(SignalFragment::Opaque(
                self.kind,
                OpaqueSignal { value, error: None },
            ))
        }
        .boxed()
    }

    fn unavailable(&self, reason: &str) -> SignalFragment {
        SignalFragment::Opaque(
            self.kind,
            OpaqueSignal {
                value: None,
                error: Some(reason.to_string()),
            },
        )
    }
}

/// Reads back the timezone and primary language the runtime reports, so a
/// sample shows whether spoofing took effect.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocaleProvider;

impl SignalProvider for LocaleProvider {
    fn name(&self) -> &str {
        "locale"
    }

    fn collect<'a>(&'a self, runtime: &'a dyn Runtime) -> BoxFuture<'a, Result<SignalFragment>> {
        async move {
            let identity = runtime.identity().await?;
            Ok(SignalFragment::Locale(ObservedLocale {
                language: identity.primary_language().map(str::to_string),
                timezone: Some(identity.timezone),
                error: None,
            }))
        }
        .boxed()
    }

    fn unavailable(&self, reason: &str) -> SignalFragment {
        SignalFragment::Locale(ObservedLocale {
            error: Some(reason.to_string()),
            ..Default::default()
        })
    }
}
