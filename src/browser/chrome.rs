//! [`BrowserControl`] on an eoka (Chrome DevTools) page.
//!
//! Element enumeration and interaction run as injected JavaScript. Each call
//! re-enumerates with the same filters, so an index taken from a `*_vectors`
//! call addresses the same element as long as the page hasn't changed.

use super::BrowserControl;
use crate::config::BrowserConfig;
use crate::Result;
use eoka::{Browser, Page};
use std::time::Duration;
use tracing::debug;

/// Shared element filters, prepended to every script.
const PRELUDE_JS: &str = r#"
const __as = {
    visible(el) {
        const rect = el.getBoundingClientRect();
        if (rect.width < 2 || rect.height < 2) return false;
        const style = getComputedStyle(el);
        return style.display !== 'none' && style.visibility !== 'hidden';
    },
    text(el) {
        const t = (el.innerText || el.value || el.getAttribute('aria-label') || el.title || '');
        return t.trim().replace(/\s+/g, ' ');
    },
    fields(form, type) {
        const sel = type === 'text'
            ? 'input:not([type]), input[type="text"], input[type="search"], textarea'
            : 'input[type=' + JSON.stringify(type) + ']';
        return Array.from(form.querySelectorAll(sel)).filter(__as.visible);
    },
    forms(type) {
        return Array.from(document.forms).filter(f => __as.fields(f, type).length > 0);
    },
    buttons() {
        const sel = 'button, input[type="submit"], input[type="button"], a, [role="button"], [onclick]';
        return Array.from(document.querySelectorAll(sel)).filter(__as.visible);
    },
    links(leaveHost) {
        return Array.from(document.querySelectorAll('a[href]')).filter(a => {
            if (!__as.visible(a)) return false;
            const href = a.getAttribute('href') || '';
            if (href.startsWith('#') || href.startsWith('javascript:')) return false;
            if (href.startsWith('mailto:') || href.startsWith('tel:')) return false;
            return leaveHost || a.host === location.host;
        });
    },
};
"#;

/// Describe a form: its visible text plus the attributes that usually name it.
const FORM_VECTORS_JS: &str = r#"
return JSON.stringify(__as.forms(__type).map(f => {
    const parts = [__as.text(f)];
    for (const el of f.querySelectorAll('input, textarea, button')) {
        for (const attr of ['placeholder', 'name', 'aria-label', 'title']) {
            const v = el.getAttribute(attr);
            if (v) parts.push(v);
        }
        if (el.type === 'submit' && el.value) parts.push(el.value);
    }
    for (const attr of ['action', 'id', 'name', 'role', 'aria-label']) {
        const v = f.getAttribute(attr);
        if (v) parts.push(v);
    }
    return parts.join(' ');
}));
"#;

/// Converts a JSON parse failure into the browser error eoka-agent uses.
fn parse_error(what: &str, e: serde_json::Error) -> eoka::Error {
    eoka::Error::CdpSimple(format!("{} parse error: {}", what, e))
}

fn js_str(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

/// Chrome-backed browser control.
pub struct EokaBrowser {
    browser: Browser,
    page: Page,
    leave_host: bool,
    submit_wait: Duration,
    field_type: String,
}

impl EokaBrowser {
    /// Launch Chrome with the given config.
    ///
    /// `form_submit_wait` is in seconds and is waited after every submit.
    pub async fn launch(config: &BrowserConfig, form_submit_wait: u64) -> Result<Self> {
        let stealth = eoka::StealthConfig {
            headless: config.headless,
            proxy: config.proxy.clone(),
            user_agent: config.user_agent.clone(),
            viewport_width: config.viewport.as_ref().map(|v| v.width).unwrap_or(1280),
            viewport_height: config.viewport.as_ref().map(|v| v.height).unwrap_or(720),
            ..Default::default()
        };

        debug!(
            "Launching browser (headless: {}, proxy: {:?})",
            config.headless, config.proxy
        );
        let browser = Browser::launch_with_config(stealth).await?;
        let page = browser.new_page("about:blank").await?;

        Ok(Self {
            browser,
            page,
            leave_host: config.leave_host,
            submit_wait: Duration::from_secs(form_submit_wait),
            field_type: "text".into(),
        })
    }

    /// Get a reference to the page.
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Close the browser.
    pub async fn close(self) -> Result<()> {
        self.browser.close().await?;
        Ok(())
    }

    /// Run `body` (which may `return`) after the prelude.
    async fn run<T: serde::de::DeserializeOwned>(&self, body: &str) -> Result<T> {
        let js = format!("(() => {{ {} {} }})()", PRELUDE_JS, body);
        Ok(self.page.evaluate(&js).await?)
    }

    async fn run_list(&self, what: &str, body: &str) -> Result<Vec<String>> {
        let json: String = self.run(body).await?;
        let list = serde_json::from_str(&json).map_err(|e| parse_error(what, e))?;
        Ok(list)
    }

    /// Where the tab is: its URL and the length of its session history.
    async fn position(&self) -> Result<(String, u64)> {
        let url = self.page.url().await?;
        let depth: u64 = self.page.evaluate("history.length").await?;
        Ok((url, depth))
    }

    /// Best-effort network idle, then a short DOM settle. Some sites never
    /// stop polling, so the idle timeout is not an error.
    async fn wait_for_stable(&self) {
        let _ = self.page.wait_for_network_idle(200, 2000).await;
        self.page.wait(50).await;
    }
}

impl BrowserControl for EokaBrowser {
    async fn initialize(&mut self, base_url: &str) -> Result<()> {
        debug!("Loading {}", base_url);
        self.page.goto(base_url).await?;
        self.wait_for_stable().await;
        Ok(())
    }

    async fn back(&mut self) -> Result<()> {
        self.page.back().await?;
        self.wait_for_stable().await;
        Ok(())
    }

    async fn form_vectors(&mut self, field_type: &str) -> Result<Vec<String>> {
        self.field_type = field_type.to_string();
        let body = format!("const __type = {}; {}", js_str(field_type), FORM_VECTORS_JS);
        self.run_list("forms", &body).await
    }

    async fn button_vectors(&mut self) -> Result<Vec<String>> {
        self.run_list(
            "buttons",
            "return JSON.stringify(__as.buttons().map(__as.text));",
        )
        .await
    }

    async fn link_vectors(&mut self) -> Result<Vec<String>> {
        let body = format!(
            "return JSON.stringify(__as.links({}).map(__as.text));",
            self.leave_host
        );
        self.run_list("links", &body).await
    }

    async fn input(&mut self, form_index: usize, field_index: usize, value: &str) -> Result<()> {
        let body = format!(
            r#"
            const form = __as.forms({ty})[{form}];
            if (!form) return false;
            const el = __as.fields(form, {ty})[{field}];
            if (!el) return false;
            el.focus();
            el.value = {value};
            el.dispatchEvent(new Event('input', {{ bubbles: true }}));
            el.dispatchEvent(new Event('change', {{ bubbles: true }}));
            return true;
            "#,
            ty = js_str(&self.field_type),
            form = form_index,
            field = field_index,
            value = js_str(value),
        );
        let found: bool = self.run(&body).await?;
        if !found {
            return Err(eoka::Error::ElementNotFound(format!(
                "input {} of form {}",
                field_index, form_index
            ))
            .into());
        }
        Ok(())
    }

    async fn submit(&mut self, form_index: usize) -> Result<()> {
        let body = format!(
            r#"
            const form = __as.forms({ty})[{form}];
            if (!form) return false;
            if (form.requestSubmit) form.requestSubmit(); else form.submit();
            return true;
            "#,
            ty = js_str(&self.field_type),
            form = form_index,
        );
        let found: bool = self.run(&body).await?;
        if !found {
            return Err(eoka::Error::ElementNotFound(format!("form {}", form_index)).into());
        }
        tokio::time::sleep(self.submit_wait).await;
        self.wait_for_stable().await;
        Ok(())
    }

    async fn select_button(&mut self, index: usize, iterating_form: bool) -> Result<bool> {
        let before = self.position().await?;
        let body = format!(
            r#"
            const el = __as.buttons()[{index}];
            if (!el) return false;
            if (el.tagName === 'A') el.removeAttribute('target');
            el.click();
            return true;
            "#,
        );
        let found: bool = self.run(&body).await?;
        if !found {
            return Err(eoka::Error::ElementNotFound(format!("button {}", index)).into());
        }
        // Result pages behind a "next" control load like a form submission.
        if iterating_form {
            tokio::time::sleep(self.submit_wait).await;
        }
        self.wait_for_stable().await;
        // A disabled control, or one that only rewrites the DOM, leaves no
        // history entry to go back from.
        Ok(self.position().await? != before)
    }

    async fn select_link(&mut self, index: usize) -> Result<bool> {
        let before = self.position().await?;
        let body = format!(
            r#"
            const el = __as.links({leave})[{index}];
            if (!el) return false;
            el.removeAttribute('target');
            el.click();
            return true;
            "#,
            leave = self.leave_host,
        );
        let clicked: bool = self.run(&body).await?;
        if !clicked {
            return Ok(false);
        }
        self.wait_for_stable().await;
        Ok(self.position().await? != before)
    }

    async fn page_html(&mut self) -> Result<String> {
        Ok(self
            .page
            .evaluate("document.documentElement.outerHTML")
            .await?)
    }

    async fn page_url(&mut self) -> Result<String> {
        Ok(self.page.url().await?)
    }

    async fn screenshot_png(&mut self) -> Result<Vec<u8>> {
        Ok(self.page.screenshot().await?)
    }
}
