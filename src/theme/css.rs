use crate::schedule::Mode;
use crate::theme::browsers::{self, Browser, SelectorGroups};
use crate::theme::colors::{self, ColorScheme};

/// Stable id of the injected style element. Exactly one element with this id
/// exists per document at a time.
pub fn style_element_id(browser: Browser) -> String {
    format!("themeshift-{}-theme", browser.as_str())
}

/// Custom-property block the selector rules reference. Tokens are substituted
/// by plain string replacement; there is no CSS parsing anywhere.
const ROOT_TEMPLATE: &str = "\
:root {
  --themeshift-bg: {{bg}} !important;
  --themeshift-border: {{border}} !important;
  --themeshift-accent: {{accent}} !important;
  --themeshift-text: {{text}} !important;
  --themeshift-sidebar: {{sidebar}} !important;
  --themeshift-shadow: {{shadow}} !important;
  --themeshift-focus: {{focus}} !important;
}
";

fn substitute(template: &str, colors: &ColorScheme) -> String {
    template
        .replace("{{bg}}", colors.bg)
        .replace("{{border}}", colors.border)
        .replace("{{accent}}", colors.accent)
        .replace("{{text}}", colors.text)
        .replace("{{sidebar}}", colors.sidebar)
        .replace("{{shadow}}", colors.shadow)
        .replace("{{focus}}", colors.focus)
}

fn rule(selectors: &[&str], body: &str, out: &mut String) {
    if selectors.is_empty() {
        return;
    }
    out.push_str(&selectors.join(",\n"));
    out.push_str(" {\n");
    out.push_str(body);
    out.push_str("}\n\n");
}

fn selector_rules(selectors: &SelectorGroups) -> String {
    let mut out = String::new();
    rule(
        selectors.navigation,
        "  background: var(--themeshift-bg) !important;\n  border-color: var(--themeshift-border) !important;\n",
        &mut out,
    );
    rule(
        selectors.tabs,
        "  background: var(--themeshift-bg) !important;\n  color: var(--themeshift-text) !important;\n",
        &mut out,
    );
    rule(
        selectors.address_bar,
        "  background: var(--themeshift-bg) !important;\n  color: var(--themeshift-text) !important;\n  border: 1px solid var(--themeshift-border) !important;\n",
        &mut out,
    );
    rule(
        selectors.sidebar,
        "  background: var(--themeshift-sidebar) !important;\n",
        &mut out,
    );
    rule(
        selectors.content,
        "  color: var(--themeshift-text) !important;\n",
        &mut out,
    );
    rule(
        &[":focus"],
        "  outline: 2px solid var(--themeshift-accent) !important;\n  box-shadow: 0 0 15px var(--themeshift-focus);\n",
        &mut out,
    );
    out
}

/// Generates the complete stylesheet for a mode and browser: the custom
/// properties, the per-surface rules, then any browser-specific extras.
pub fn render_stylesheet(mode: Mode, browser: Browser) -> String {
    let colors = colors::scheme(mode);
    let spec = browsers::spec(browser);

    let mut css = String::new();
    css.push_str(&format!(
        "/* themeshift: {} for {} */\n",
        colors.name,
        browser.as_str()
    ));
    css.push_str(&substitute(ROOT_TEMPLATE, colors));
    css.push('\n');
    css.push_str(&selector_rules(&spec.selectors));
    css.push_str(spec.extra_css);
    css
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_substituted() {
        let css = render_stylesheet(Mode::Night, Browser::Generic);
        assert!(css.contains("--themeshift-bg: #1A1A2E !important;"));
        assert!(css.contains("--themeshift-accent: #9B59B6 !important;"));
        assert!(!css.contains("{{"));
    }

    #[test]
    fn test_selector_rules_present() {
        let css = render_stylesheet(Mode::Day, Browser::Opera);
        assert!(css.contains(".toolbar"));
        assert!(css.contains(".address-bar"));
        assert!(css.contains(".speed-dial"));
    }

    #[test]
    fn test_browser_extras_appended() {
        let css = render_stylesheet(Mode::Evening, Browser::EdgeCanary);
        assert!(css.contains(".tab-strip"));
        let generic = render_stylesheet(Mode::Evening, Browser::Generic);
        assert!(!generic.contains(".tab-strip,"));
    }

    #[test]
    fn test_style_element_id_stable() {
        assert_eq!(style_element_id(Browser::Orion), "themeshift-orion-theme");
        assert_eq!(
            style_element_id(Browser::Orion),
            style_element_id(Browser::Orion)
        );
    }
}
