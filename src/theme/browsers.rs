use serde::{Deserialize, Serialize};

use crate::error::ThemeError;

/// Supported browser targets. Each entry is a row in the selector catalog;
/// the applier itself is browser-agnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Browser {
    EdgeCanary,
    Opera,
    Orion,
    Generic,
}

impl Browser {
    pub const ALL: [Browser; 4] = [
        Browser::EdgeCanary,
        Browser::Opera,
        Browser::Orion,
        Browser::Generic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::EdgeCanary => "edge-canary",
            Browser::Opera => "opera",
            Browser::Orion => "orion",
            Browser::Generic => "generic",
        }
    }

    pub fn parse(s: &str) -> Result<Browser, ThemeError> {
        match s {
            "edge-canary" => Ok(Browser::EdgeCanary),
            "opera" => Ok(Browser::Opera),
            "orion" => Ok(Browser::Orion),
            "generic" => Ok(Browser::Generic),
            other => Err(ThemeError::UnknownBrowser(other.to_string())),
        }
    }
}

impl std::fmt::Display for Browser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CSS selector groups for the chrome surfaces a theme repaints.
#[derive(Debug, Clone, Copy)]
pub struct SelectorGroups {
    pub navigation: &'static [&'static str],
    pub tabs: &'static [&'static str],
    pub address_bar: &'static [&'static str],
    pub sidebar: &'static [&'static str],
    pub content: &'static [&'static str],
}

/// One row of the browser catalog: selectors plus any browser-specific rules
/// appended verbatim after the generated ones.
#[derive(Debug, Clone, Copy)]
pub struct BrowserSpec {
    pub browser: Browser,
    pub selectors: SelectorGroups,
    pub extra_css: &'static str,
}

const COMMON_SELECTORS: SelectorGroups = SelectorGroups {
    navigation: &[
        ".toolbar",
        ".navigation-bar",
        ".nav-bar",
        "[class*=\"toolbar\"]",
        "[class*=\"navigation\"]",
    ],
    tabs: &[
        ".tab",
        ".tab-content",
        "[class*=\"tab\"]:not([class*=\"tab-strip\"]):not([class*=\"tab-bar\"])",
    ],
    address_bar: &[
        ".address-bar",
        ".url-bar",
        "input[type=\"url\"]",
        "[class*=\"address\"]",
        "[class*=\"url\"]",
        ".search-field",
        ".omnibox",
    ],
    sidebar: &[
        ".sidebar",
        ".panel",
        "[class*=\"sidebar\"]",
        "[class*=\"panel\"]",
    ],
    content: &[
        ".main-content",
        ".content",
        ".window-content",
        "[class*=\"content\"]",
    ],
};

const EDGE_CANARY: BrowserSpec = BrowserSpec {
    browser: Browser::EdgeCanary,
    selectors: SelectorGroups {
        navigation: &[
            ".toolbar",
            ".navigation-bar",
            ".address-bar-container",
            "div[class*=\"Toolbar\"]",
        ],
        tabs: &[
            ".tab",
            ".tab-content",
            "[class*=\"tab\"]:not([class*=\"tab-strip\"]):not([class*=\"tab-bar\"])",
            "div[class*=\"Tab\"]:not(div[class*=\"TabStrip\"])",
        ],
        address_bar: &[
            ".address-bar",
            ".url-bar",
            "input[type=\"url\"]",
            "[class*=\"address\"]",
            "[class*=\"url\"]",
            ".omnibox",
            "input[class*=\"omnibox\"]",
            "input[aria-label*=\"address\"]",
        ],
        sidebar: COMMON_SELECTORS.sidebar,
        content: COMMON_SELECTORS.content,
    },
    extra_css: "\
.tab-strip, .tab-bar, [class*=\"tab-strip\"], [class*=\"tab-bar\"] {\n\
  background: var(--themeshift-bg) !important;\n\
  border-bottom: 1px solid var(--themeshift-border) !important;\n\
}\n",
};

const OPERA: BrowserSpec = BrowserSpec {
    browser: Browser::Opera,
    selectors: SelectorGroups {
        navigation: COMMON_SELECTORS.navigation,
        tabs: COMMON_SELECTORS.tabs,
        address_bar: COMMON_SELECTORS.address_bar,
        sidebar: &[
            ".sidebar",
            ".panel",
            ".speed-dial-sidebar",
            "[class*=\"sidebar\"]",
            "[class*=\"panel\"]",
        ],
        content: COMMON_SELECTORS.content,
    },
    extra_css: "\
.speed-dial, [class*=\"speed-dial\"] {\n\
  background: var(--themeshift-bg) !important;\n\
}\n",
};

const ORION: BrowserSpec = BrowserSpec {
    browser: Browser::Orion,
    selectors: COMMON_SELECTORS,
    extra_css: "\
.urlbar, .tab-bar-container {\n\
  background: var(--themeshift-bg) !important;\n\
  color: var(--themeshift-text) !important;\n\
}\n",
};

const GENERIC: BrowserSpec = BrowserSpec {
    browser: Browser::Generic,
    selectors: COMMON_SELECTORS,
    extra_css: "",
};

/// Looks up the catalog row for a browser.
pub fn spec(browser: Browser) -> &'static BrowserSpec {
    match browser {
        Browser::EdgeCanary => &EDGE_CANARY,
        Browser::Opera => &OPERA,
        Browser::Orion => &ORION,
        Browser::Generic => &GENERIC,
    }
}
