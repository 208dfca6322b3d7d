use anyhow::{anyhow, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use fp_sampler::runtime::{EmulatedRuntime, Identity, Runtime};
use fp_sampler::signals::{OpaqueKind, OpaqueSignal, SignalFragment, SignalProvider};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use url::Url;

pub const SUBMIT_PATH: &str = "/api/submit-fingerprints";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Runtime answering every built-in probe.
pub fn full_runtime() -> Arc<EmulatedRuntime> {
    Arc::new(
        EmulatedRuntime::new(Identity::new("Europe/Dublin", ["en-IE"]))
            .with_answer(
                "webgpu",
                json!({
                    "supported": true,
                    "vendor": "nvidia",
                    "architecture": "ampere",
                    "driverVersion": null,
                    "maxTextureDimension": 16384,
                    "maxBufferSize": 4294967296u64
                }),
            )
            .with_answer(
                "sensors",
                json!({"gyroscope_supported": false, "accel_permission_state": "prompt"}),
            )
            .with_answer("canvas_hash", json!("9f86d081"))
            .with_answer(
                "webgl_renderer",
                json!("ANGLE (NVIDIA, NVIDIA GeForce RTX 3080 Direct3D11 vs_5_0 ps_5_0)"),
            )
            .with_answer("audio_value", json!(124.04347527516074))
            .with_answer("math_jitter_hash", json!("3c2f1a0b")),
    )
}

/// Reports the math jitter signal by panicking.
pub struct PanickingProvider;

impl SignalProvider for PanickingProvider {
    fn name(&self) -> &str {
        "panicking"
    }

    fn collect<'a>(&'a self, _runtime: &'a dyn Runtime) -> BoxFuture<'a, Result<SignalFragment>> {
        async move { panic!("provider blew up") }.boxed()
    }

    fn unavailable(&self, reason: &str) -> SignalFragment {
        SignalFragment::Opaque(
            OpaqueKind::MathJitter,
            OpaqueSignal {
                value: None,
                error: Some(reason.to_string()),
            },
        )
    }
}

/// Panics before it has a future to return.
pub struct EagerPanickingProvider;

impl SignalProvider for EagerPanickingProvider {
    fn name(&self) -> &str {
        "eager-panicking"
    }

    fn collect<'a>(&'a self, _runtime: &'a dyn Runtime) -> BoxFuture<'a, Result<SignalFragment>> {
        panic!("provider blew up while starting")
    }

    fn unavailable(&self, reason: &str) -> SignalFragment {
        SignalFragment::Opaque(
            OpaqueKind::CanvasHash,
            OpaqueSignal {
                value: None,
                error: Some(reason.to_string()),
            },
        )
    }
}

/// Never settles.
pub struct HangingProvider;

impl SignalProvider for HangingProvider {
    fn name(&self) -> &str {
        "hanging"
    }

    fn collect<'a>(&'a self, _runtime: &'a dyn Runtime) -> BoxFuture<'a, Result<SignalFragment>> {
        futures::future::pending().boxed()
    }

    fn unavailable(&self, reason: &str) -> SignalFragment {
        SignalFragment::Opaque(
            OpaqueKind::CanvasHash,
            OpaqueSignal {
                value: None,
                error: Some(reason.to_string()),
            },
        )
    }
}

/// Fails with an error after a short delay.
pub struct FailingProvider;

impl SignalProvider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    fn collect<'a>(&'a self, _runtime: &'a dyn Runtime) -> BoxFuture<'a, Result<SignalFragment>> {
        async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Err(anyhow!("WEBGL_BLOCKED"))
        }
        .boxed()
    }

    fn unavailable(&self, reason: &str) -> SignalFragment {
        SignalFragment::Opaque(
            OpaqueKind::WebglRenderer,
            OpaqueSignal {
                value: None,
                error: Some(reason.to_string()),
            },
        )
    }
}

#[derive(Debug, Clone)]
pub struct Visit {
    pub timezone: String,
    pub started: Instant,
    pub finished: Instant,
}

/// Records the timezone it observes and when it ran.
#[derive(Default)]
pub struct RecordingProvider {
    pub visits: Mutex<Vec<Visit>>,
    pub delay: Duration,
}

impl SignalProvider for RecordingProvider {
    fn name(&self) -> &str {
        "recording"
    }

    fn collect<'a>(&'a self, runtime: &'a dyn Runtime) -> BoxFuture<'a, Result<SignalFragment>> {
        async move {
            let started = Instant::now();
            let identity = runtime.identity().await?;
            tokio::time::sleep(self.delay).await;
            self.visits.lock().expect("should lock visits").push(Visit {
                timezone: identity.timezone.clone(),
                started,
                finished: Instant::now(),
            });
            Ok(SignalFragment::Opaque(
                OpaqueKind::AudioValue,
                OpaqueSignal {
                    value: Some(json!(1.5)),
                    error: None,
                },
            ))
        }
        .boxed()
    }

    fn unavailable(&self, reason: &str) -> SignalFragment {
        SignalFragment::Opaque(
            OpaqueKind::AudioValue,
            OpaqueSignal {
                value: None,
                error: Some(reason.to_string()),
            },
        )
    }
}

#[derive(Clone)]
struct EndpointState {
    status: StatusCode,
    body: &'static str,
    delay: Duration,
    received: Arc<Mutex<Vec<Value>>>,
}

/// In-process collection endpoint answering every submission with a fixed
/// status and body.
pub struct MockEndpoint {
    pub url: Url,
    pub received: Arc<Mutex<Vec<Value>>>,
}

impl MockEndpoint {
    pub async fn start(status: StatusCode, body: &'static str) -> Self {
        Self::start_with_delay(status, body, Duration::ZERO).await
    }

    pub async fn start_with_delay(status: StatusCode, body: &'static str, delay: Duration) -> Self {
        let received = Arc::new(Mutex::new(Vec::new()));
        let state = EndpointState {
            status,
            body,
            delay,
            received: Arc::clone(&received),
        };
        let app = Router::new()
            .route(SUBMIT_PATH, post(accept))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("should bind mock endpoint");
        let addr = listener.local_addr().expect("should have local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock endpoint failed");
        });

        Self {
            url: Url::parse(&format!("http://{}{}", addr, SUBMIT_PATH)).expect("should build endpoint url"),
            received,
        }
    }

    pub fn payloads(&self) -> Vec<Value> {
        self.received.lock().expect("should lock payloads").clone()
    }
}

async fn accept(
    State(state): State<EndpointState>,
    Json(payload): Json<Value>,
) -> (StatusCode, &'static str) {
    state.received.lock().expect("should lock payloads").push(payload);
    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }
    (state.status, state.body)
}

/// A local URL nothing is listening on.
pub async fn closed_endpoint() -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("should bind a local port");
    let addr = listener.local_addr().expect("should have a local address");
    drop(listener);
    Url::parse(&format!("http://{}{}", addr, SUBMIT_PATH)).expect("should build endpoint url")
}
