use chrono::Utc;

use crate::error::ThemeError;
use crate::schedule::Mode;
use crate::services::broadcast::{Broadcaster, ThemeEvent};
use crate::services::store::ThemeStore;
use crate::theme::browsers::Browser;
use crate::theme::colors::{self, ColorScheme};
use crate::theme::css;
use crate::theme::surface::DocumentSurface;

/// Snapshot of one theme application. Created fresh each time, never mutated,
/// superseded by the next application.
#[derive(Debug, Clone)]
pub struct ThemeRecord {
    pub mode: Mode,
    pub browser: Browser,
    pub colors: &'static ColorScheme,
    pub css: String,
    pub applied_at_ms: i64,
}

/// Applies a mode to a document surface: resolves tokens, renders the
/// stylesheet, swaps the injected style, stamps the identifying attributes,
/// persists the stored mode, and broadcasts the change.
pub struct ThemeApplier {
    browser: Browser,
    surface: Box<dyn DocumentSurface>,
    broadcaster: Broadcaster,
}

impl ThemeApplier {
    pub fn new(browser: Browser, surface: Box<dyn DocumentSurface>, broadcaster: Broadcaster) -> Self {
        Self {
            browser,
            surface,
            broadcaster,
        }
    }

    pub fn browser(&self) -> Browser {
        self.browser
    }

    pub async fn apply(&mut self, mode: Mode, store: &ThemeStore) -> Result<ThemeRecord, ThemeError> {
        let colors = colors::scheme(mode);
        let stylesheet = css::render_stylesheet(mode, self.browser);
        let applied_at_ms = Utc::now().timestamp_millis();

        self.surface
            .replace_style(&css::style_element_id(self.browser), &stylesheet)?;

        self.surface
            .set_root_attribute("data-theme-mode", mode.as_str())?;
        self.surface
            .set_root_attribute("data-browser", self.browser.as_str())?;
        self.surface
            .set_body_attribute("data-time-mode", mode.as_str())?;

        store.set_current_mode(mode, applied_at_ms).await;

        self.broadcaster
            .publish(ThemeEvent::changed(mode, *colors, self.browser, applied_at_ms));

        log::info!("theme applied: {} for {}", mode, self.browser);

        Ok(ThemeRecord {
            mode,
            browser: self.browser,
            colors,
            css: stylesheet,
            applied_at_ms,
        })
    }

    /// Removes the injected style on context teardown.
    pub fn teardown(&mut self) {
        let id = css::style_element_id(self.browser);
        if let Err(e) = self.surface.remove_style(&id) {
            log::debug!("teardown: failed to remove style {}: {}", id, e);
        }
    }
}
