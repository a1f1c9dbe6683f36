//! Stealth injection applied once per tab at open
//!
//! The session's [`Identity`] is published as `window.__identity` before any
//! evasion runs; evasions read it instead of hard-coding values so every tab of
//! a session agrees on its fingerprint.

use anyhow::{Context, Result};
use chromiumoxide::{Page, cdp};
use futures::future::join_all;
use tracing::{debug, warn};

use super::Identity;

// Injected in this order; later evasions may rely on earlier ones
const EVASION_SCRIPTS: &[(&str, &str)] = &[
    ("navigator_webdriver", NAVIGATOR_WEBDRIVER),
    ("navigator_languages", NAVIGATOR_LANGUAGES),
    ("navigator_plugins", NAVIGATOR_PLUGINS),
    ("navigator_permissions", NAVIGATOR_PERMISSIONS),
    ("hardware", HARDWARE),
    ("chrome_runtime", CHROME_RUNTIME),
    ("webgl_vendor", WEBGL_VENDOR),
];

const NAVIGATOR_WEBDRIVER: &str = r#"
Object.defineProperty(Navigator.prototype, 'webdriver', { get: () => undefined });
for (const key of Object.keys(window)) {
  if (/^cdc_|^\$cdc_/.test(key)) { try { delete window[key]; } catch (_) {} }
}
"#;

const NAVIGATOR_LANGUAGES: &str = r#"
(() => {
  const id = window.__identity || {};
  const languages = id.languages || ['en-US', 'en'];
  Object.defineProperty(Navigator.prototype, 'languages', { get: () => languages.slice() });
  Object.defineProperty(Navigator.prototype, 'language', { get: () => languages[0] });
  if (id.platform) {
    Object.defineProperty(Navigator.prototype, 'platform', { get: () => id.platform });
  }
  Object.defineProperty(Navigator.prototype, 'vendor', { get: () => 'Google Inc.' });
})();
"#;

const NAVIGATOR_PLUGINS: &str = r#"
(() => {
  const names = ['PDF Viewer', 'Chrome PDF Viewer', 'Chromium PDF Viewer',
                 'Microsoft Edge PDF Viewer', 'WebKit built-in PDF'];
  const plugins = names.map((name) => ({
    name, filename: 'internal-pdf-viewer', description: 'Portable Document Format', length: 1,
  }));
  plugins.item = (i) => plugins[i] || null;
  plugins.namedItem = (n) => plugins.find((p) => p.name === n) || null;
  plugins.refresh = () => {};
  Object.defineProperty(Navigator.prototype, 'plugins', { get: () => plugins });
})();
"#;

const NAVIGATOR_PERMISSIONS: &str = r#"
(() => {
  if (!window.navigator.permissions) return;
  const originalQuery = window.navigator.permissions.query.bind(window.navigator.permissions);
  window.navigator.permissions.query = (parameters) =>
    parameters && parameters.name === 'notifications'
      ? Promise.resolve({ state: Notification.permission, onchange: null })
      : originalQuery(parameters);
})();
"#;

const HARDWARE: &str = r#"
(() => {
  const id = window.__identity || {};
  const cores = id.hardwareConcurrency || 8;
  Object.defineProperty(Navigator.prototype, 'hardwareConcurrency', { get: () => cores });
  Object.defineProperty(Navigator.prototype, 'deviceMemory', { get: () => 8 });
  if (id.screenWidth && id.screenHeight) {
    Object.defineProperty(Screen.prototype, 'width', { get: () => id.screenWidth });
    Object.defineProperty(Screen.prototype, 'height', { get: () => id.screenHeight });
    Object.defineProperty(Screen.prototype, 'availWidth', { get: () => id.screenWidth });
    Object.defineProperty(Screen.prototype, 'availHeight', { get: () => id.screenHeight - 40 });
  }
})();
"#;

const CHROME_RUNTIME: &str = r#"
(() => {
  if (!window.chrome) {
    Object.defineProperty(window, 'chrome', { value: {}, writable: true, configurable: true });
  }
  if (!window.chrome.runtime) {
    window.chrome.runtime = {
      OnInstalledReason: { CHROME_UPDATE: 'chrome_update', INSTALL: 'install', UPDATE: 'update' },
      PlatformOs: { LINUX: 'linux', MAC: 'mac', WIN: 'win' },
      connect: () => {},
      sendMessage: () => {},
    };
  }
  if (!window.chrome.app) {
    window.chrome.app = { isInstalled: false, getDetails: () => null, getIsInstalled: () => false };
  }
})();
"#;

const WEBGL_VENDOR: &str = r#"
(() => {
  const patch = (proto) => {
    if (!proto) return;
    const getParameter = proto.getParameter;
    proto.getParameter = function (parameter) {
      if (parameter === 37445) return 'Intel Inc.';
      if (parameter === 37446) return 'Intel(R) UHD Graphics';
      return getParameter.call(this, parameter);
    };
  };
  patch(window.WebGLRenderingContext && WebGLRenderingContext.prototype);
  patch(window.WebGL2RenderingContext && WebGL2RenderingContext.prototype);
})();
"#;

/// Render the `window.__identity` bootstrap script
fn identity_bootstrap(identity: &Identity) -> String {
    let config = serde_json::json!({
        "userAgent": identity.user_agent,
        "platform": identity.platform,
        "languages": [identity.locale, identity.locale.split('-').next().unwrap_or("en")],
        "screenWidth": identity.viewport_width,
        "screenHeight": identity.viewport_height,
        "hardwareConcurrency": identity.hardware_concurrency,
        "timezone": identity.timezone,
        "sessionSeed": identity.session_seed,
    });
    format!("Object.defineProperty(window, '__identity', {{ value: {config}, enumerable: false }});")
}

async fn add_init_script(page: &Page, source: String) -> Result<()> {
    page.execute(
        cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams {
            source,
            include_command_line_api: None,
            world_name: None,
            run_immediately: None,
        },
    )
    .await?;
    Ok(())
}

/// Apply the identity and evasions to a freshly opened tab
///
/// Individual evasion failures are logged and skipped; failing to publish the
/// identity itself or to override the user agent is an error.
pub async fn apply_identity(page: &Page, identity: &Identity) -> Result<()> {
    add_init_script(page, identity_bootstrap(identity))
        .await
        .context("Failed to publish identity bootstrap")?;

    let injections = EVASION_SCRIPTS.iter().map(|(name, source)| {
        let page = page.clone();
        async move {
            let result = add_init_script(&page, (*source).to_string()).await;
            (*name, result)
        }
    });

    let mut injected = 0usize;
    for (name, result) in join_all(injections).await {
        match result {
            Ok(()) => injected += 1,
            Err(e) => warn!("Failed to inject evasion {}: {}", name, e),
        }
    }
    debug!("Injected {}/{} evasions", injected, EVASION_SCRIPTS.len());

    page.execute(cdp::browser_protocol::network::SetUserAgentOverrideParams {
        user_agent: identity.user_agent.clone(),
        accept_language: Some(identity.accept_language.clone()),
        platform: Some(identity.platform.clone()),
        user_agent_metadata: None,
    })
    .await
    .context("Failed to override user agent")?;

    page.execute(
        cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams::builder()
            .width(i64::from(identity.viewport_width))
            .height(i64::from(identity.viewport_height))
            .device_scale_factor(1.0)
            .mobile(false)
            .build()
            .map_err(anyhow::Error::msg)?,
    )
    .await
    .context("Failed to set viewport")?;

    if let Err(e) = page
        .execute(cdp::browser_protocol::emulation::SetTimezoneOverrideParams::new(
            identity.timezone.clone(),
        ))
        .await
    {
        warn!("Failed to override timezone to {}: {}", identity.timezone, e);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_embeds_identity() {
        let identity = Identity::with(crate::utils::USER_AGENT_POOL[0], 1536, 864);
        let script = identity_bootstrap(&identity);
        assert!(script.contains("__identity"));
        assert!(script.contains("\"screenWidth\":1536"));
        assert!(script.contains("America/New_York"));
        assert!(script.contains(&identity.session_seed));
    }
}
