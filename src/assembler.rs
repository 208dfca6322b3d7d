//! Flattening of one iteration's signals into the submitted record shape.

use crate::profiles::Profile;
use crate::session::SessionContext;
use crate::signals::{OpaqueKind, SignalBundle};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::ops::Deref;

/// Reported for a string attribute that no source could provide.
pub const NOT_AVAILABLE: &str = "N/A";

/// One fully assembled record for a single profile iteration.
///
/// Every field is always present so the schema is identical across samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub session_id: String,
    pub device_tag: String,
    pub browser_tag: String,
    pub sample_index: usize,
    pub label_type: String,

    pub spoofed_timezone_result: String,
    pub spoofed_language_result: String,
    pub observed_timezone: String,
    pub observed_language: String,

    pub canvas_hash: String,
    pub webgl_renderer: String,
    pub audio_value: f64,
    pub math_jitter_hash: String,

    pub webgpu_supported: bool,
    pub webgpu_vendor: String,
    pub webgpu_architecture: String,
    pub webgpu_max_texture_dim: u64,
    pub webgpu_max_buffer_size: u64,

    pub sensor_gyro_supported: bool,
    pub sensor_accel_permission: String,
}

/// First non-empty candidate, or [`NOT_AVAILABLE`].
///
/// Callers pass candidates in precedence order: substantive value, error
/// reason, status string.
pub fn first_present<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> String {
    candidates
        .into_iter()
        .flatten()
        .find(|s| !s.is_empty())
        .unwrap_or(NOT_AVAILABLE)
        .to_string()
}

fn opaque_text(bundle: &SignalBundle, kind: OpaqueKind) -> String {
    let Some(signal) = bundle.opaque(kind) else {
        return NOT_AVAILABLE.to_string();
    };
    let rendered = signal.value.as_ref().map(|value| match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    });
    first_present([rendered.as_deref(), signal.error.as_deref()])
}

fn opaque_number(bundle: &SignalBundle, kind: OpaqueKind) -> f64 {
    bundle
        .opaque(kind)
        .and_then(|signal| signal.value.as_ref())
        .and_then(|value| match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        })
        .unwrap_or(0.0)
}

/// Combine session, profile, 1-based index and signals into a [`Sample`].
pub fn assemble(
    session: &SessionContext,
    profile: &Profile,
    sample_index: usize,
    bundle: &SignalBundle,
) -> Sample {
    let graphics = bundle.graphics.clone().unwrap_or_default();
    let sensor = bundle.sensor.clone().unwrap_or_default();
    let locale = bundle.locale.clone().unwrap_or_default();

    Sample {
        session_id: session.session_id.clone(),
        device_tag: session.device_tag.clone(),
        browser_tag: session.browser_tag.clone(),
        sample_index,
        label_type: profile.label.clone(),

        spoofed_timezone_result: profile.timezone.clone(),
        spoofed_language_result: profile.primary_language().to_string(),
        observed_timezone: first_present([
            locale.timezone.as_deref(),
            locale.error.as_deref(),
        ]),
        observed_language: first_present([
            locale.language.as_deref(),
            locale.error.as_deref(),
        ]),

        canvas_hash: opaque_text(bundle, OpaqueKind::CanvasHash),
        webgl_renderer: opaque_text(bundle, OpaqueKind::WebglRenderer),
        audio_value: opaque_number(bundle, OpaqueKind::AudioValue),
        math_jitter_hash: opaque_text(bundle, OpaqueKind::MathJitter),

        webgpu_supported: graphics.supported,
        webgpu_vendor: first_present([
            graphics.vendor.as_deref(),
            graphics.error.as_deref(),
            graphics.status.as_deref(),
        ]),
        webgpu_architecture: first_present([
            graphics.architecture.as_deref(),
            graphics.error.as_deref(),
            graphics.status.as_deref(),
        ]),
        webgpu_max_texture_dim: graphics.max_texture_dimension.unwrap_or(0),
        webgpu_max_buffer_size: graphics.max_buffer_size.unwrap_or(0),

        sensor_gyro_supported: sensor.gyroscope_supported,
        sensor_accel_permission: first_present([
            sensor.accel_permission_state.as_deref(),
            sensor.error.as_deref(),
        ]),
    }
}

/// The ordered, frozen result of one collection run. Read-only once built.
///
/// Serializes as a JSON array of samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Batch(Vec<Sample>);

impl Batch {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Sample>> for Batch {
    fn from(samples: Vec<Sample>) -> Self {
        Self(samples)
    }
}

impl Deref for Batch {
    type Target = [Sample];

    fn deref(&self) -> &[Sample] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::{GraphicsInfo, OpaqueSignal, SensorInfo, SignalFragment};
    use serde_json::json;

    fn session() -> SessionContext {
        SessionContext::new(Some("D01"), Some("Chrome"))
    }

    fn profile() -> Profile {
        Profile::new("03_Spoof_Culture_ES", "Europe/Dublin", ["es-ES", "es"])
    }

    #[test]
    fn precedence_prefers_value_then_error_then_status() {
        assert_eq!(first_present([Some("NVIDIA"), Some("BLOCKED"), Some("ok")]), "NVIDIA");
        assert_eq!(first_present([None, Some("BLOCKED"), Some("ok")]), "BLOCKED");
        assert_eq!(first_present([Some(""), None, Some("NoAdapter")]), "NoAdapter");
        assert_eq!(first_present([None, None, None]), NOT_AVAILABLE);
    }

    #[test]
    fn empty_bundle_yields_stable_defaults() {
        let sample = assemble(&session(), &profile(), 3, &SignalBundle::default());
        assert_eq!(sample.sample_index, 3);
        assert_eq!(sample.label_type, "03_Spoof_Culture_ES");
        assert_eq!(sample.spoofed_language_result, "es-ES");
        assert_eq!(sample.webgpu_vendor, NOT_AVAILABLE);
        assert_eq!(sample.canvas_hash, NOT_AVAILABLE);
        assert_eq!(sample.webgpu_max_texture_dim, 0);
        assert_eq!(sample.webgpu_max_buffer_size, 0);
        assert_eq!(sample.audio_value, 0.0);
        assert!(!sample.webgpu_supported);
    }

    #[test]
    fn graphics_vendor_falls_back_to_error_and_status() {
        let blocked = SignalBundle::from_fragments([SignalFragment::Graphics(GraphicsInfo {
            supported: true,
            error: Some("ADAPTER_INFO_BLOCKED".into()),
            max_texture_dimension: Some(8192),
            ..Default::default()
        })]);
        let sample = assemble(&session(), &profile(), 1, &blocked);
        assert_eq!(sample.webgpu_vendor, "ADAPTER_INFO_BLOCKED");
        assert_eq!(sample.webgpu_max_texture_dim, 8192);

        let no_adapter = SignalBundle::from_fragments([SignalFragment::Graphics(GraphicsInfo {
            supported: true,
            status: Some("NoAdapter".into()),
            ..Default::default()
        })]);
        assert_eq!(
            assemble(&session(), &profile(), 1, &no_adapter).webgpu_vendor,
            "NoAdapter"
        );

        let full = SignalBundle::from_fragments([SignalFragment::Graphics(GraphicsInfo {
            supported: true,
            vendor: Some("nvidia".into()),
            error: Some("ignored".into()),
            ..Default::default()
        })]);
        assert_eq!(assemble(&session(), &profile(), 1, &full).webgpu_vendor, "nvidia");
    }

    #[test]
    fn opaque_values_are_rendered() {
        let bundle = SignalBundle::from_fragments([
            SignalFragment::Opaque(
                OpaqueKind::CanvasHash,
                OpaqueSignal {
                    value: Some(json!("a1b2c3d4")),
                    error: None,
                },
            ),
            SignalFragment::Opaque(
                OpaqueKind::AudioValue,
                OpaqueSignal {
                    value: Some(json!(124.043475)),
                    error: None,
                },
            ),
            SignalFragment::Opaque(
                OpaqueKind::MathJitter,
                OpaqueSignal {
                    value: None,
                    error: Some("TIMEOUT".into()),
                },
            ),
            SignalFragment::Sensor(SensorInfo {
                gyroscope_supported: true,
                accel_permission_state: Some("granted".into()),
                error: None,
            }),
        ]);
        let sample = assemble(&session(), &profile(), 1, &bundle);
        assert_eq!(sample.canvas_hash, "a1b2c3d4");
        assert_eq!(sample.audio_value, 124.043475);
        assert_eq!(sample.math_jitter_hash, "TIMEOUT");
        assert!(sample.sensor_gyro_supported);
        assert_eq!(sample.sensor_accel_permission, "granted");
    }

    #[test]
    fn batch_serializes_as_array() {
        let sample = assemble(&session(), &profile(), 1, &SignalBundle::default());
        let batch = Batch::from(vec![sample]);
        let value = serde_json::to_value(&batch).expect("should serialize batch");
        let items = value.as_array().expect("should serialize as an array");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["sample_index"], 1);
        assert_eq!(items[0]["device_tag"], "D01");
        assert_eq!(items[0]["webgpu_vendor"], NOT_AVAILABLE);
    }
}
