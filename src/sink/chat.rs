// src/sink/chat.rs
//! Writer for the messaging web client rendered in the sink tab. The
//! client is a moving target, so every selector and pause lives up here
//! and delivery has a second, cruder composition path.

use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::input::{DispatchKeyEventParams, DispatchKeyEventType};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::SinkSection;
use crate::error::RelayError;
use crate::sanitize::clean_message;
use crate::session::{absent_ok, classify_cdp, CredentialGate};
use crate::sink::{compose_line, SinkWriter};
use crate::source::Post;

/// Any of these means the client is past the QR screen.
const READY_SELECTORS: [&str; 3] = [
    r#"[data-testid="chat-list"]"#,
    ".app-wrapper-web",
    r#"[data-testid="chats-list"]"#,
];
/// The attributed message composer.
const COMPOSER_SELECTOR: &str = r#"div[contenteditable="true"][data-tab="10"]"#;
/// Last-resort composer: first editable div on the page.
const COMPOSER_FALLBACK_SELECTOR: &str = r#"div[contenteditable="true"]"#;
/// Select-all plus delete in whatever element holds focus. The client
/// keeps per-chat drafts, and typing appends to them.
const CLEAR_COMPOSER_SCRIPT: &str =
    "document.execCommand('selectAll', false, null); document.execCommand('delete', false, null);";

const FAILURE_SCREENSHOT: &str = "sink_error.png";

/// Let the client settle before poking at the chat list.
const SETTLE_WAIT: Duration = Duration::from_secs(3);
/// After clicking a conversation row.
const CHAT_OPEN_WAIT: Duration = Duration::from_secs(2);
/// After focusing the composer.
const FOCUS_WAIT: Duration = Duration::from_secs(1);
/// After pressing Enter, before the next devtools call.
const POST_SEND_WAIT: Duration = Duration::from_secs(2);

/// Bit flag for Shift in devtools key events.
const SHIFT_MODIFIER: i64 = 8;

pub struct ChatWriter {
    tab: Page,
    url: String,
    chat_name: String,
    prefix: String,
    ready_timeout: Duration,
    preview_wait: Duration,
}

/// Click the chat-list row whose label contains `chat_name`. Rows carry
/// no stable ids, so this walks span labels and climbs to the clickable
/// container, all inside the page.
fn locate_script(chat_name: &str) -> String {
    let name_json = serde_json::Value::String(chat_name.to_string()).to_string();
    format!(
        r#"(() => {{
  const name = {name_json};
  const span = Array.from(document.querySelectorAll('span'))
    .find(s => (s.textContent || '').includes(name));
  if (!span) return false;
  const row = span.closest('[role="listitem"]') || span.closest('div[class*="chat"]');
  if (!row) return false;
  row.click();
  return true;
}})()"#
    )
}

impl ChatWriter {
    pub fn new(tab: Page, cfg: &SinkSection) -> Self {
        Self {
            tab,
            url: cfg.url.clone(),
            chat_name: cfg.chat_name.clone(),
            prefix: cfg.message_prefix.clone(),
            ready_timeout: Duration::from_secs(cfg.ready_timeout_secs),
            preview_wait: Duration::from_secs(cfg.preview_wait_secs),
        }
    }

    async fn open_chat(&self) -> Result<(), RelayError> {
        let clicked: bool = self
            .tab
            .evaluate(locate_script(&self.chat_name))
            .await
            .map_err(|e| classify_cdp("locating conversation", e))?
            .into_value()
            .map_err(|e| RelayError::Automation {
                context: "reading locate result",
                message: e.to_string(),
            })?;
        if !clicked {
            return Err(RelayError::ChatNotFound(self.chat_name.clone()));
        }
        debug!(chat = %self.chat_name, "conversation opened");
        sleep(CHAT_OPEN_WAIT).await;
        Ok(())
    }

    /// Preferred path: one line into the attributed composer, a space to
    /// trigger the link preview, then Enter.
    async fn submit_single_line(&self, clean: &str, link: &str) -> Result<(), RelayError> {
        let composer = absent_ok(
            "composer lookup",
            self.tab.find_element(COMPOSER_SELECTOR).await,
        )?
        .ok_or_else(|| RelayError::ComposerUnavailable("attributed composer not found".into()))?;

        composer
            .click()
            .await
            .map_err(|e| classify_cdp("focusing composer", e))?;
        sleep(FOCUS_WAIT).await;
        self.clear_composer().await?;

        let line = compose_line(&self.prefix, clean, link);
        composer
            .type_str(&line)
            .await
            .map_err(|e| classify_cdp("typing message", e))?;
        composer
            .type_str(" ")
            .await
            .map_err(|e| classify_cdp("typing preview trigger", e))?;

        debug!("waiting for link preview");
        sleep(self.preview_wait).await;

        composer
            .press_key("Enter")
            .await
            .map_err(|e| classify_cdp("sending message", e))?;
        sleep(POST_SEND_WAIT).await;
        Ok(())
    }

    /// Alternate path: header line, two manual line breaks, then the bare
    /// link so the client still renders a preview.
    async fn submit_block(&self, clean: &str, link: &str) -> Result<(), RelayError> {
        let composer = absent_ok(
            "fallback composer lookup",
            self.tab.find_element(COMPOSER_FALLBACK_SELECTOR).await,
        )?
        .ok_or_else(|| {
            RelayError::ComposerUnavailable("no editable composer on page".into())
        })?;

        composer
            .click()
            .await
            .map_err(|e| classify_cdp("focusing fallback composer", e))?;
        sleep(FOCUS_WAIT).await;
        self.clear_composer().await?;

        composer
            .type_str(&format!("{}{}", self.prefix, clean))
            .await
            .map_err(|e| classify_cdp("typing message header", e))?;
        self.line_break().await?;
        self.line_break().await?;
        composer
            .type_str(link)
            .await
            .map_err(|e| classify_cdp("typing link", e))?;
        composer
            .type_str(" ")
            .await
            .map_err(|e| classify_cdp("typing preview trigger", e))?;

        debug!("waiting for link preview");
        sleep(self.preview_wait).await;

        composer
            .press_key("Enter")
            .await
            .map_err(|e| classify_cdp("sending message", e))?;
        sleep(POST_SEND_WAIT).await;
        Ok(())
    }

    /// Empty the focused composer. Runs after the click so the selection
    /// lands inside the editable, and before any typing; a draft left by
    /// an earlier failed attempt would otherwise lead the message.
    async fn clear_composer(&self) -> Result<(), RelayError> {
        self.tab
            .evaluate(CLEAR_COMPOSER_SCRIPT)
            .await
            .map_err(|e| classify_cdp("clearing composer", e))?;
        Ok(())
    }

    /// Shift+Enter: a line break inside the composer without submitting.
    async fn line_break(&self) -> Result<(), RelayError> {
        let down = DispatchKeyEventParams::builder()
            .key("Enter")
            .text("\r")
            .r#type(DispatchKeyEventType::KeyDown)
            .modifiers(SHIFT_MODIFIER)
            .build()
            .map_err(|e| RelayError::Automation {
                context: "building key event",
                message: e,
            })?;
        let up = DispatchKeyEventParams::builder()
            .key("Enter")
            .r#type(DispatchKeyEventType::KeyUp)
            .modifiers(SHIFT_MODIFIER)
            .build()
            .map_err(|e| RelayError::Automation {
                context: "building key event",
                message: e,
            })?;
        self.tab
            .execute(down)
            .await
            .map_err(|e| classify_cdp("line break key down", e))?;
        self.tab
            .execute(up)
            .await
            .map_err(|e| classify_cdp("line break key up", e))?;
        Ok(())
    }

    async fn capture_failure_screenshot(&self) {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        match self.tab.screenshot(params).await {
            Ok(bytes) => {
                if let Err(e) = std::fs::write(FAILURE_SCREENSHOT, &bytes) {
                    debug!(error = %e, "could not write failure screenshot");
                } else {
                    info!(path = FAILURE_SCREENSHOT, "saved failure screenshot");
                }
            }
            Err(e) => debug!(error = %e, "screenshot capture failed"),
        }
    }
}

#[async_trait::async_trait]
impl SinkWriter for ChatWriter {
    async fn setup(&self, gate: &dyn CredentialGate) -> Result<(), RelayError> {
        self.tab
            .bring_to_front()
            .await
            .map_err(|e| classify_cdp("activating sink tab", e))?;
        info!(url = %self.url, "opening messaging client");
        self.tab
            .goto(self.url.as_str())
            .await
            .map_err(|e| classify_cdp("opening messaging client", e))?;

        gate.await_ready(
            "Scan the QR code to link the messaging session, then press Enter here...",
        )
        .await?;

        let attempts = (self.ready_timeout.as_secs() / 2).max(1);
        for attempt in 1..=attempts {
            for sel in READY_SELECTORS {
                if absent_ok("readiness probe", self.tab.find_element(sel).await)?.is_some() {
                    info!("messaging client ready");
                    return Ok(());
                }
            }
            debug!(attempt, attempts, "messaging client still loading");
            sleep(Duration::from_secs(2)).await;
        }
        warn!("messaging client readiness not confirmed; continuing anyway");
        Ok(())
    }

    async fn send(&self, post: &Post) -> Result<(), RelayError> {
        info!(origin = %post.origin, id = %post.id, "relaying post");
        self.tab
            .bring_to_front()
            .await
            .map_err(|e| classify_cdp("activating sink tab", e))?;

        let clean = clean_message(&post.text);
        sleep(SETTLE_WAIT).await;

        self.open_chat().await?;

        match self.submit_single_line(&clean, &post.link).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_session_fatal() => Err(e),
            Err(primary) => {
                warn!(error = %primary, "primary composer path failed; trying block layout");
                match self.submit_block(&clean, &post.link).await {
                    Ok(()) => Ok(()),
                    Err(e) if e.is_session_fatal() => Err(e),
                    Err(fallback) => {
                        self.capture_failure_screenshot().await;
                        Err(fallback)
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locate_script_escapes_chat_name() {
        let script = locate_script(r#"O'Brien "A" chat"#);
        assert!(script.contains(r#"\"A\""#));
        assert!(script.contains("listitem"));
    }

    #[test]
    fn locate_script_embeds_plain_names_verbatim() {
        let script = locate_script("Arteta FC");
        assert!(script.contains(r#""Arteta FC""#));
    }

    #[test]
    fn clear_script_selects_before_deleting() {
        let select = CLEAR_COMPOSER_SCRIPT.find("selectAll").unwrap();
        let delete = CLEAR_COMPOSER_SCRIPT.find("'delete'").unwrap();
        assert!(select < delete);
    }
}
