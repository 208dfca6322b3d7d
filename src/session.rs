use rand::Rng;
use url::Url;

/// Tag reported when the caller did not identify the device or browser.
pub const UNKNOWN_TAG: &str = "UNKNOWN";

const SESSION_ID_LEN: usize = 13;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Per-run identity shared by every sample of one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub session_id: String,
    pub device_tag: String,
    pub browser_tag: String,
}

impl SessionContext {
    /// Create a context with a fresh session id. Missing or blank tags fall
    /// back to [`UNKNOWN_TAG`].
    pub fn new(device: Option<&str>, browser: Option<&str>) -> Self {
        Self {
            session_id: generate_session_id(),
            device_tag: tag_or_unknown(device),
            browser_tag: tag_or_unknown(browser),
        }
    }

    /// Read the `device` and `browser` query parameters of the URL the
    /// pipeline was invoked from.
    pub fn from_invocation_url(url: &Url) -> Self {
        let mut device = None;
        let mut browser = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "device" if device.is_none() => device = Some(value.into_owned()),
                "browser" if browser.is_none() => browser = Some(value.into_owned()),
                _ => {}
            }
        }
        Self::new(device.as_deref(), browser.as_deref())
    }
}

fn tag_or_unknown(tag: Option<&str>) -> String {
    match tag.map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => UNKNOWN_TAG.to_string(),
    }
}

fn generate_session_id() -> String {
    let mut rng = rand::thread_rng();
    (0..SESSION_ID_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}
