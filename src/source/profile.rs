// src/source/profile.rs
//! Timeline reader for one profile page rendered in the source tab.
//! Extraction is DOM-shape dependent; every selector lives up here so a
//! markup change is a one-line fix.

use std::time::Duration;

use chromiumoxide::{Element, Page};
use metrics::counter;
use tracing::{debug, info, warn};

use crate::config::SourceSection;
use crate::error::RelayError;
use crate::session::{absent_ok, classify_cdp, wait_for_element, CredentialGate};
use crate::source::{build_post, Post, RawCandidate, SourceReader, RECENT_WINDOW};

const POST_SELECTOR: &str = r#"[data-testid="tweet"]"#;
const POST_TEXT_SELECTOR: &str = r#"[data-testid="tweetText"]"#;
const PERMALINK_SELECTOR: &str = r#"a[href*="/status/"]"#;
const SOCIAL_CONTEXT_SELECTOR: &str = r#"[data-testid="socialContext"]"#;
/// Present once the timeline column has rendered for a logged-in user.
const LOGGED_IN_PROBE: &str = r#"[data-testid="primaryColumn"]"#;

/// How long to look for the timeline column after the operator reports
/// the login is done.
const LOGIN_CONFIRM_WAIT: Duration = Duration::from_secs(30);

pub struct ProfileReader {
    tab: Page,
    base_url: String,
    item_wait: Duration,
}

impl ProfileReader {
    pub fn new(tab: Page, cfg: &SourceSection) -> Self {
        Self {
            tab,
            base_url: cfg.base_url.clone(),
            item_wait: Duration::from_secs(cfg.item_wait_secs),
        }
    }

    /// Pull text, permalink and social context out of one timeline item.
    /// Missing text fails the item; a missing permalink or context is
    /// normal and handled downstream.
    async fn extract_candidate(&self, el: &Element) -> Result<RawCandidate, RelayError> {
        let text_el = absent_ok("post text element", el.find_element(POST_TEXT_SELECTOR).await)?
            .ok_or_else(|| RelayError::Automation {
                context: "post text element",
                message: "not present in item".into(),
            })?;
        let text = absent_ok("post text read", text_el.inner_text().await)?
            .flatten()
            .unwrap_or_default();

        let permalink = match absent_ok(
            "permalink element",
            el.find_element(PERMALINK_SELECTOR).await,
        )? {
            Some(a) => absent_ok("permalink href", a.attribute("href").await)?.flatten(),
            None => None,
        };

        let social_context = match absent_ok(
            "social context element",
            el.find_element(SOCIAL_CONTEXT_SELECTOR).await,
        )? {
            Some(sc) => absent_ok("social context read", sc.inner_text().await)?.flatten(),
            None => None,
        };

        Ok(RawCandidate {
            text,
            permalink,
            social_context,
        })
    }
}

#[async_trait::async_trait]
impl SourceReader for ProfileReader {
    async fn login(&self, gate: &dyn CredentialGate) -> Result<(), RelayError> {
        self.tab
            .bring_to_front()
            .await
            .map_err(|e| classify_cdp("activating source tab", e))?;
        let url = format!("{}/login", self.base_url);
        info!(%url, "opening source login page");
        self.tab
            .goto(url.as_str())
            .await
            .map_err(|e| classify_cdp("opening login page", e))?;

        gate.await_ready(
            "Log in to the source account in the browser window, then press Enter here...",
        )
        .await?;

        match wait_for_element(&self.tab, LOGGED_IN_PROBE, LOGIN_CONFIRM_WAIT).await? {
            Some(_) => info!("source login confirmed"),
            None => warn!("could not confirm source login; continuing anyway"),
        }
        Ok(())
    }

    async fn read_recent(&self, origin: &str) -> Result<Vec<Post>, RelayError> {
        self.tab
            .bring_to_front()
            .await
            .map_err(|e| classify_cdp("activating source tab", e))?;
        let url = format!("{}/{}", self.base_url, origin);
        debug!(origin, %url, "loading profile");
        self.tab
            .goto(url.as_str())
            .await
            .map_err(|e| classify_cdp("loading profile page", e))?;

        if wait_for_element(&self.tab, POST_SELECTOR, self.item_wait)
            .await?
            .is_none()
        {
            info!(origin, "no posts rendered within the wait window");
            return Ok(Vec::new());
        }

        let elements = self
            .tab
            .find_elements(POST_SELECTOR)
            .await
            .map_err(|e| classify_cdp("listing timeline items", e))?;

        let mut posts = Vec::new();
        for el in elements.iter().take(RECENT_WINDOW) {
            match self.extract_candidate(el).await {
                Ok(candidate) => match build_post(origin, &self.base_url, candidate) {
                    Some(post) => posts.push(post),
                    None => {
                        debug!(origin, "skipping reshare");
                        counter!("relay_reshares_skipped_total").increment(1);
                    }
                },
                Err(e) if e.is_session_fatal() => return Err(e),
                Err(e) => debug!(origin, error = %e, "skipping unreadable item"),
            }
        }
        debug!(origin, count = posts.len(), "profile read complete");
        Ok(posts)
    }
}
