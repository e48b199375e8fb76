//! Engineering notation for component values and display helpers.
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    pub static ref RE_VALUE: regex::Regex =
        Regex::new(r"(?i)^([+-]?(?:\d+\.?\d*|\.\d+)(?:e[+-]?\d+)?)(meg|mil|[tgkmunpf])?[a-z]*$")
            .unwrap();
}

/// Parse a SPICE value like `10k`, `4.7MEG` or `100n`.
///
/// The scale suffix is case insensitive, `M` is milli and `MEG` is mega.
/// Trailing unit letters (`10kohm`) are ignored the way the simulator
/// ignores them. Surrounding whitespace is rejected, the value is written
/// into the netlist as one token.
pub fn parse_value(value: &str) -> Option<f64> {
    let caps = RE_VALUE.captures(value)?;
    let number: f64 = caps.get(1)?.as_str().parse().ok()?;
    let multiplier = match caps.get(2).map(|m| m.as_str().to_lowercase()) {
        None => 1.0,
        Some(suffix) => match suffix.as_str() {
            "t" => 1e12,
            "g" => 1e9,
            "meg" => 1e6,
            "k" => 1e3,
            "m" => 1e-3,
            "mil" => 25.4e-6,
            "u" => 1e-6,
            "n" => 1e-9,
            "p" => 1e-12,
            "f" => 1e-15,
            _ => return None,
        },
    };
    Some(number * multiplier)
}

pub fn format_ohms(ohms: f64) -> String {
    if ohms >= 1e6 {
        format!("{:.2} MΩ", ohms / 1e6)
    } else if ohms >= 1e3 {
        format!("{:.2} kΩ", ohms / 1e3)
    } else {
        format!("{:.0} Ω", ohms)
    }
}

pub fn format_ms(ms: f64) -> String {
    if ms >= 1000.0 {
        format!("{:.2} s", ms / 1000.0)
    } else {
        format!("{:.0} ms", ms)
    }
}
