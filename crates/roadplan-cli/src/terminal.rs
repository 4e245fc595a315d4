//! Terminal styling and number formatting for text output.

/// ANSI escape codes used by the text renderer.
pub mod colors {
    pub const RESET: &str = "\x1b[0m";
    /// Bright bold white for addresses and headings.
    pub const WHITE_BOLD: &str = "\x1b[1;97m";
    /// Gray for secondary details such as timings.
    pub const GRAY: &str = "\x1b[90m";
    /// Cyan for algorithm names.
    pub const CYAN: &str = "\x1b[36m";
    /// Green for cache hits and successful plans.
    pub const GREEN: &str = "\x1b[32m";
    /// Red for unreachable destinations.
    pub const RED: &str = "\x1b[31m";
}

/// Resolved color codes, empty when color is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorPalette {
    pub reset: &'static str,
    pub white_bold: &'static str,
    pub gray: &'static str,
    pub cyan: &'static str,
    pub green: &'static str,
    pub red: &'static str,
}

impl ColorPalette {
    #[must_use]
    pub const fn colored() -> Self {
        Self {
            reset: colors::RESET,
            white_bold: colors::WHITE_BOLD,
            gray: colors::GRAY,
            cyan: colors::CYAN,
            green: colors::GREEN,
            red: colors::RED,
        }
    }

    #[must_use]
    pub const fn plain() -> Self {
        Self {
            reset: "",
            white_bold: "",
            gray: "",
            cyan: "",
            green: "",
            red: "",
        }
    }

    /// Palette matching the current process environment.
    #[must_use]
    pub fn detect() -> Self {
        if supports_color() {
            Self::colored()
        } else {
            Self::plain()
        }
    }
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self::detect()
    }
}

/// Whether ANSI color should be used, honouring `NO_COLOR` and `TERM=dumb`.
#[must_use]
pub fn supports_color() -> bool {
    supports_color_with(|name| std::env::var(name).ok())
}

/// [`supports_color`] over an arbitrary variable lookup.
pub fn supports_color_with<F>(lookup: F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    if lookup("NO_COLOR").is_some() {
        return false;
    }
    !matches!(lookup("TERM"), Some(term) if term.eq_ignore_ascii_case("dumb"))
}

/// Format a number with thousand separators, e.g. `1,234,567`.
///
/// ```
/// # use roadplan_cli::terminal::format_with_separators;
/// assert_eq!(format_with_separators(999), "999");
/// assert_eq!(format_with_separators(1234567), "1,234,567");
/// ```
#[must_use]
pub fn format_with_separators(n: u64) -> String {
    let digits = n.to_string();
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// Render a length in meters, switching to kilometres from 1 km.
#[must_use]
pub fn format_meters(meters: f64) -> String {
    if !meters.is_finite() {
        "unreachable".to_string()
    } else if meters >= 1000.0 {
        format!("{:.2} km", meters / 1000.0)
    } else {
        format!("{meters:.0} m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separators_group_thousands() {
        assert_eq!(format_with_separators(0), "0");
        assert_eq!(format_with_separators(999), "999");
        assert_eq!(format_with_separators(1000), "1,000");
        assert_eq!(format_with_separators(123_456), "123,456");
        assert_eq!(
            format_with_separators(u64::MAX),
            "18,446,744,073,709,551,615"
        );
    }

    #[test]
    fn meters_switch_units() {
        assert_eq!(format_meters(0.0), "0 m");
        assert_eq!(format_meters(999.4), "999 m");
        assert_eq!(format_meters(10_150.0), "10.15 km");
        assert_eq!(format_meters(f64::INFINITY), "unreachable");
    }

    #[test]
    fn palettes() {
        assert!(ColorPalette::plain().reset.is_empty());
        assert!(!ColorPalette::colored().green.is_empty());
    }

    #[test]
    fn color_detection_honours_conventions() {
        assert!(supports_color_with(|_| None));
        assert!(!supports_color_with(|name| {
            (name == "NO_COLOR").then(String::new)
        }));
        assert!(!supports_color_with(|name| {
            (name == "TERM").then(|| "DUMB".to_string())
        }));
        assert!(supports_color_with(|name| {
            (name == "TERM").then(|| "xterm-256color".to_string())
        }));
    }
}
