use crate::runtime::{Identity, Probe, Runtime};
use anyhow::{anyhow, Result};
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetLocaleOverrideParams, SetTimezoneOverrideParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::page::CreateIsolatedWorldParams;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::Page;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;

const WORLD_NAME: &str = "fp_sampler";

const IDENTITY_SCRIPT: &str = r#"({
    timezone: Intl.DateTimeFormat().resolvedOptions().timeZone,
    languages: Array.from(navigator.languages || [navigator.language])
})"#;

/// Chrome page driven over the DevTools protocol.
///
/// Identity overrides use the `Emulation` domain, so they apply to the page's
/// main world and to every isolated world alike:
///
/// - timezone: `Emulation.setTimezoneOverride`
/// - `Intl` locale: `Emulation.setLocaleOverride`
/// - `navigator.language(s)`: `Emulation.setUserAgentOverride` with an
///   `acceptLanguage` list, keeping the page's own User-Agent
///
/// Probes are evaluated in an isolated world created with
/// `Page.createIsolatedWorld`, so the `Runtime` domain is never enabled and
/// page scripts cannot see probe variables.
///
/// # Example
///
/// ```rust,no_run
/// # async fn run(page: chromiumoxide::Page) -> anyhow::Result<()> {
/// use fp_sampler::cdp::CdpRuntime;
///
/// let runtime = CdpRuntime::attach(page).await?;
/// println!("native timezone: {}", runtime.native_identity().timezone);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CdpRuntime {
    page: Page,
    user_agent: String,
    native: Identity,
}

impl CdpRuntime {
    /// Attach to a page, capturing its own User-Agent and identity so they
    /// can be restored by [`Runtime::clear_overrides`].
    pub async fn attach(page: Page) -> Result<Self> {
        let user_agent = evaluate_isolated(&page, "navigator.userAgent")
            .await?
            .and_then(|v| v.as_str().map(str::to_string))
            .ok_or_else(|| anyhow!("page did not report a user agent"))?;
        let native = read_identity(&page).await?;
        tracing::debug!(timezone = %native.timezone, languages = ?native.languages, "attached to page");

        Ok(Self {
            page,
            user_agent,
            native,
        })
    }

    /// Access the underlying page.
    pub fn raw_page(&self) -> &Page {
        &self.page
    }

    /// The identity the page reported before any override.
    pub fn native_identity(&self) -> &Identity {
        &self.native
    }

    async fn override_timezone(&self, timezone_id: &str) -> Result<()> {
        self.page
            .execute(SetTimezoneOverrideParams {
                timezone_id: timezone_id.to_string(),
            })
            .await
            .map_err(|e| anyhow!("{}", e))?;
        Ok(())
    }

    async fn override_accept_language(&self, languages: &[String]) -> Result<()> {
        self.page
            .execute(
                SetUserAgentOverrideParams::builder()
                    .user_agent(self.user_agent.clone())
                    .accept_language(languages.join(","))
                    .build()
                    .map_err(|e| anyhow!("{}", e))?,
            )
            .await
            .map_err(|e| anyhow!("{}", e))?;
        Ok(())
    }
}

impl Runtime for CdpRuntime {
    fn identity(&self) -> BoxFuture<'_, Result<Identity>> {
        read_identity(&self.page).boxed()
    }

    fn set_timezone<'a>(&'a self, timezone: &'a str) -> BoxFuture<'a, Result<()>> {
        async move {
            // Chrome refuses a second override while one is active.
            if let Err(e) = self.override_timezone("").await {
                tracing::debug!("clearing timezone override failed: {}", e);
            }
            self.override_timezone(timezone).await
        }
        .boxed()
    }

    fn set_languages<'a>(&'a self, languages: &'a [String]) -> BoxFuture<'a, Result<()>> {
        async move {
            let primary = languages
                .first()
                .ok_or_else(|| anyhow!("no language tags to apply"))?;

            self.page
                .execute(SetLocaleOverrideParams {
                    locale: Some(primary.clone()),
                })
                .await
                .map_err(|e| anyhow!("{}", e))?;

            self.override_accept_language(languages).await
        }
        .boxed()
    }

    fn clear_overrides(&self) -> BoxFuture<'_, Result<()>> {
        async move {
            // Every surface gets its reset attempt; the first failure is reported.
            let timezone = self.override_timezone("").await;
            let locale = self
                .page
                .execute(SetLocaleOverrideParams::default())
                .await
                .map(drop)
                .map_err(|e| anyhow!("{}", e));
            let languages = self.override_accept_language(&self.native.languages).await;

            first_failure([
                ("timezone", timezone),
                ("locale", locale),
                ("accept-language", languages),
            ])
        }
        .boxed()
    }

    fn probe<'a>(&'a self, probe: &'a Probe) -> BoxFuture<'a, Result<Option<Value>>> {
        evaluate_isolated(&self.page, probe.script).boxed()
    }
}

/// Log every failed step and return the first error, if any.
fn first_failure(steps: impl IntoIterator<Item = (&'static str, Result<()>)>) -> Result<()> {
    let mut first = None;
    for (surface, result) in steps {
        if let Err(e) = result {
            tracing::warn!(surface, "failed to clear override: {:#}", e);
            first.get_or_insert(e);
        }
    }
    first.map_or(Ok(()), Err)
}

async fn read_identity(page: &Page) -> Result<Identity> {
    let value = evaluate_isolated(page, IDENTITY_SCRIPT)
        .await?
        .ok_or_else(|| anyhow!("identity probe returned nothing"))?;
    Ok(serde_json::from_value(value)?)
}

/// Evaluate `script` in a fresh isolated world of the main frame, awaiting
/// promises and returning the result by value.
async fn evaluate_isolated(page: &Page, script: &str) -> Result<Option<Value>> {
    let frame_id = page
        .mainframe()
        .await
        .map_err(|e| anyhow!("{}", e))?
        .ok_or_else(|| anyhow!("No main frame available"))?;

    // The response carries the context id, so Runtime.enable is never needed.
    let isolated_world = page
        .execute(
            CreateIsolatedWorldParams::builder()
                .frame_id(frame_id)
                .world_name(WORLD_NAME)
                .grant_univeral_access(true)
                .build()
                .map_err(|e| anyhow!("{}", e))?,
        )
        .await
        .map_err(|e| anyhow!("{}", e))?;

    let params = EvaluateParams::builder()
        .expression(script)
        .context_id(isolated_world.result.execution_context_id)
        .await_promise(true)
        .return_by_value(true)
        .build()
        .map_err(|e| anyhow!("{}", e))?;

    let res = page.execute(params).await.map_err(|e| anyhow!("{}", e))?;
    if let Some(details) = &res.result.exception_details {
        return Err(anyhow!("script threw: {}", details.text));
    }
    Ok(res.result.result.value)
}
