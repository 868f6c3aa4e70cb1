//! Color schemes and the axis-title helper.
//!
//! Series colors cycle through the selected scheme; the custom scheme
//! repeats one user-supplied color. Color values travel as strings
//! (names or hex codes) because the renderer, not this crate, owns
//! the color type.

use thiserror::Error;

use crate::data::loader::XAxisUnit;

use super::schema::PlotParameters;

const DEFAULT_COLORS: &[&str] = &["black"];
const SCHEME1_COLORS: &[&str] = &["red", "green", "blue", "cyan", "magenta", "yellow", "black"];
const SCHEME2_COLORS: &[&str] = &[
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2",
];
const SCHEME3_COLORS: &[&str] = &[
    "#17becf", "#bcbd22", "#7f7f7f", "#aec7e8", "#ffbb78", "#98df8a", "#ff9896",
];

/// Color names accepted for the custom scheme, next to hex codes.
const NAMED_COLORS: &[&str] = &[
    "black", "white", "red", "green", "blue", "cyan", "magenta", "yellow", "gray", "grey",
    "orange", "purple", "brown",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorError {
    #[error("custom color {0:?} is neither a known color name nor a #rrggbb hex code")]
    InvalidCustom(String),
}

fn is_hex_color(s: &str) -> bool {
    let Some(digits) = s.strip_prefix('#') else {
        return false;
    };
    (digits.len() == 3 || digits.len() == 6) && digits.bytes().all(|b| b.is_ascii_hexdigit())
}

/// True when `value` would be accepted as a custom color.
pub fn is_valid_color(value: &str) -> bool {
    let value = value.trim();
    is_hex_color(value) || NAMED_COLORS.contains(&value.to_ascii_lowercase().as_str())
}

/// The color list for the selected scheme. The custom scheme requires
/// a valid `custom_color`; every other scheme always succeeds.
pub fn resolve_colors(params: &PlotParameters) -> Result<Vec<String>, ColorError> {
    let scheme = params.get("color_scheme");
    let colors: &[&str] = match scheme {
        "scheme1" => SCHEME1_COLORS,
        "scheme2" => SCHEME2_COLORS,
        "scheme3" => SCHEME3_COLORS,
        "custom" => {
            let custom = params.get("custom_color").trim().to_string();
            if !is_valid_color(&custom) {
                return Err(ColorError::InvalidCustom(custom));
            }
            return Ok(vec![custom]);
        }
        _ => DEFAULT_COLORS,
    };
    Ok(colors.iter().map(|c| c.to_string()).collect())
}

/// Color for the series at `index`, cycling through the scheme.
pub fn color_for(colors: &[String], index: usize) -> &str {
    &colors[index % colors.len()]
}

fn superscript(digit: char) -> char {
    match digit {
        '0' => '⁰',
        '1' => '¹',
        '2' => '²',
        '3' => '³',
        '4' => '⁴',
        '5' => '⁵',
        '6' => '⁶',
        '7' => '⁷',
        '8' => '⁸',
        '9' => '⁹',
        other => other,
    }
}

/// X-axis title for a nucleus and unit, mass number superscripted:
/// `axis_title("13C", Ppm)` → `"¹³C Chemical Shift (ppm)"`. A blank
/// nucleus yields no title.
pub fn axis_title(nucleus: &str, unit: XAxisUnit) -> Option<String> {
    let nucleus = nucleus.trim();
    if nucleus.is_empty() {
        return None;
    }

    let unit_text = match unit {
        XAxisUnit::Ppm => "Chemical Shift (ppm)",
        XAxisUnit::Hz => "Frequency (Hz)",
        XAxisUnit::KHz => "Frequency (kHz)",
    };

    let mass: String = nucleus
        .chars()
        .filter(|c| c.is_ascii_digit())
        .map(superscript)
        .collect();
    let element: String = nucleus.chars().filter(|c| !c.is_ascii_digit()).collect();

    Some(format!("{}{} {}", mass, element, unit_text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_colors_cycle() {
        let mut p = PlotParameters::new();
        p.set("color_scheme", "scheme1").unwrap();
        let colors = resolve_colors(&p).unwrap();
        assert_eq!(colors.len(), 7);
        assert_eq!(color_for(&colors, 0), "red");
        assert_eq!(color_for(&colors, 7), "red");
        assert_eq!(color_for(&colors, 8), "green");
    }

    #[test]
    fn test_default_scheme_is_black() {
        let p = PlotParameters::new();
        assert_eq!(resolve_colors(&p).unwrap(), vec!["black".to_string()]);
    }

    #[test]
    fn test_custom_color_validation() {
        assert!(is_valid_color("#1f77b4"));
        assert!(is_valid_color("#abc"));
        assert!(is_valid_color("Magenta"));
        assert!(!is_valid_color("#12345"));
        assert!(!is_valid_color("#gggggg"));
        assert!(!is_valid_color("chartreuse-ish"));

        let mut p = PlotParameters::new();
        p.set("color_scheme", "custom").unwrap();
        p.set("custom_color", "no-such-color").unwrap();
        assert!(matches!(
            resolve_colors(&p),
            Err(ColorError::InvalidCustom(_))
        ));

        p.set("custom_color", "#d62728").unwrap();
        assert_eq!(resolve_colors(&p).unwrap(), vec!["#d62728".to_string()]);
    }

    #[test]
    fn test_axis_title_superscripts_mass_number() {
        assert_eq!(
            axis_title("13C", XAxisUnit::Ppm).unwrap(),
            "¹³C Chemical Shift (ppm)"
        );
        assert_eq!(
            axis_title("1H", XAxisUnit::Hz).unwrap(),
            "¹H Frequency (Hz)"
        );
        assert_eq!(
            axis_title("19F", XAxisUnit::KHz).unwrap(),
            "¹⁹F Frequency (kHz)"
        );
        assert_eq!(axis_title("", XAxisUnit::Ppm), None);
        assert_eq!(axis_title("  ", XAxisUnit::Ppm), None);
    }
}
