use serde::Serialize;

use crate::schedule::Mode;

// ═══════════════════════════════════════════════════════════════════════════════
// Color tokens
// ═══════════════════════════════════════════════════════════════════════════════

/// Color tokens for one theme mode. Immutable; exactly one scheme exists per
/// mode and no dynamic mode creation is possible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColorScheme {
    pub bg: &'static str,
    pub border: &'static str,
    pub accent: &'static str,
    pub text: &'static str,
    pub sidebar: &'static str,
    pub shadow: &'static str,
    pub focus: &'static str,
    #[serde(skip)]
    pub name: &'static str,
    #[serde(skip)]
    pub description: &'static str,
}

const DAY: ColorScheme = ColorScheme {
    bg: "#F8F9FA",
    border: "#E9ECEF",
    accent: "#0078d4",
    text: "#2C3E50",
    sidebar: "rgba(248, 249, 250, 0.95)",
    shadow: "rgba(0,0,0,0.1)",
    focus: "rgba(0, 120, 212, 0.3)",
    name: "Day Mode",
    description: "Clean and bright for daytime productivity",
};

const EVENING: ColorScheme = ColorScheme {
    bg: "#FFF8F0",
    border: "#FF8C42",
    accent: "#E67E22",
    text: "#8B4513",
    sidebar: "rgba(255, 140, 66, 0.15)",
    shadow: "rgba(0,0,0,0.1)",
    focus: "rgba(255, 140, 66, 0.4)",
    name: "Evening Mode",
    description: "Warm focus mode for evening work sessions",
};

const NIGHT: ColorScheme = ColorScheme {
    bg: "#1A1A2E",
    border: "#722F37",
    accent: "#9B59B6",
    text: "#ECF0F1",
    sidebar: "rgba(45, 27, 105, 0.9)",
    shadow: "rgba(0,0,0,0.3)",
    focus: "rgba(155, 89, 182, 0.2)",
    name: "Night Mode",
    description: "Dark theme for late-night sessions",
};

/// Resolves the static color tokens for a mode.
pub fn scheme(mode: Mode) -> &'static ColorScheme {
    match mode {
        Mode::Day => &DAY,
        Mode::Evening => &EVENING,
        Mode::Night => &NIGHT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_per_mode() {
        assert_eq!(scheme(Mode::Day).bg, "#F8F9FA");
        assert_eq!(scheme(Mode::Evening).accent, "#E67E22");
        assert_eq!(scheme(Mode::Night).bg, "#1A1A2E");
    }

    #[test]
    fn test_schemes_are_distinct() {
        assert_ne!(scheme(Mode::Day), scheme(Mode::Evening));
        assert_ne!(scheme(Mode::Evening), scheme(Mode::Night));
    }
}
