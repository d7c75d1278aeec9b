//! Sanitizers: total, pure coercions from raw input to a stored value.
//!
//! Sanitizers never fail. Unparseable or out-of-range input is coerced to
//! the descriptor's default (or the nearest bound), so the store can never
//! hold an unrepresentable value. Every variant is idempotent: applying it to
//! its own output returns that output unchanged.

use chrono::{DateTime, Datelike, NaiveDateTime, SecondsFormat, Utc};

use crate::options::value::OptionValue;

/// A tagged sanitizer attached to an option descriptor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sanitize {
    /// `"false"`, `"0"`, `"off"`, `"no"` and empty text are false; any other text is true.
    Bool,
    /// Leading integer of the input, clamped to `[min, max]`.
    Int { min: i64, max: i64 },
    /// Leading decimal number of the input, clamped to `[min, max]`.
    Float { min: f64, max: f64 },
    /// Case-insensitive membership; anything else becomes the first entry.
    OneOf(&'static [&'static str]),
    /// `#rgb` / `#rrggbb`, lowercased and expanded to six digits.
    Color,
    /// RFC 3339, `YYYY-MM-DDTHH:MM[:SS]` (UTC) or unix seconds; normalized to RFC 3339 UTC.
    Timestamp,
    Lowercase,
}

impl Sanitize {
    /// Coerces `raw` into this sanitizer's canonical shape, using `default`
    /// when the input carries nothing usable.
    pub fn apply(&self, raw: &OptionValue, default: &OptionValue) -> OptionValue {
        match *self {
            Self::Bool => OptionValue::Bool(parse_bool(raw)),
            Self::Int { min, max } => {
                let parsed = match raw {
                    OptionValue::Int(n) => Some(*n),
                    OptionValue::Float(x) if x.is_finite() => Some(x.trunc() as i64),
                    OptionValue::Text(s) => leading_int(s),
                    _ => None,
                };
                let value = parsed.or_else(|| default.as_int()).unwrap_or(min);
                OptionValue::Int(value.clamp(min, max))
            }
            Self::Float { min, max } => {
                let parsed = match raw {
                    OptionValue::Float(x) if x.is_finite() => Some(*x),
                    OptionValue::Int(n) => Some(*n as f64),
                    OptionValue::Text(s) => leading_float(s),
                    _ => None,
                };
                let value = parsed.or_else(|| default.as_float()).unwrap_or(min);
                OptionValue::Float(value.clamp(min, max))
            }
            Self::OneOf(choices) => {
                let text = raw.to_string();
                let needle = text.trim();
                let chosen = choices
                    .iter()
                    .find(|c| c.eq_ignore_ascii_case(needle))
                    .or_else(|| choices.first())
                    .copied()
                    .unwrap_or_default();
                OptionValue::Text(chosen.to_string())
            }
            Self::Color => match normalize_color(&raw.to_string()) {
                Some(color) => OptionValue::Text(color),
                None => OptionValue::Text(
                    normalize_color(&default.to_string()).unwrap_or_else(|| default.to_string()),
                ),
            },
            Self::Timestamp => {
                let parsed = match raw {
                    OptionValue::Int(n) => from_unix_seconds(*n),
                    other => parse_timestamp(&other.to_string()),
                };
                OptionValue::Text(
                    parsed
                        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
                        .unwrap_or_default(),
                )
            }
            Self::Lowercase => OptionValue::Text(raw.to_string().to_lowercase()),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Parsing helpers
// ────────────────────────────────────────────────────────────────────────────

fn parse_bool(raw: &OptionValue) -> bool {
    match raw {
        OptionValue::Bool(b) => *b,
        OptionValue::Text(s) => {
            let s = s.trim();
            !(s.is_empty()
                || s.eq_ignore_ascii_case("false")
                || s.eq_ignore_ascii_case("off")
                || s.eq_ignore_ascii_case("no")
                || s == "0")
        }
        other => other.is_truthy(),
    }
}

/// Parses the leading integer of `s` (`"12px"` → 12), ignoring leading whitespace.
fn leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let end = numeric_prefix_len(s, false);
    s[..end].parse().ok()
}

/// Parses the leading decimal number of `s` (`"0.05em"` → 0.05).
fn leading_float(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let end = numeric_prefix_len(s, true);
    s[..end].parse().ok().filter(|x: &f64| x.is_finite())
}

fn numeric_prefix_len(s: &str, allow_fraction: bool) -> usize {
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    let mut seen_dot = false;
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => end += 1,
            b'.' if allow_fraction && !seen_dot => {
                seen_dot = true;
                end += 1;
            }
            _ => break,
        }
    }
    // A trailing '.' parses fine for f64 but reads as garbage; drop it.
    if end > 0 && bytes[end - 1] == b'.' {
        end -= 1;
    }
    end
}

fn normalize_color(s: &str) -> Option<String> {
    let s = s.trim().to_ascii_lowercase();
    let hex = s.strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        6 => Some(s),
        3 => Some(
            std::iter::once('#')
                .chain(hex.chars().flat_map(|c| [c, c]))
                .collect(),
        ),
        _ => None,
    }
}

/// Parses the timestamp shapes accepted by [`Sanitize::Timestamp`].
///
/// Naive date-times (as produced by `datetime-local` inputs) are taken as UTC.
/// Instants outside the four-digit years are rejected: RFC 3339 can't
/// represent them, so they wouldn't survive a second pass.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return four_digit_year(t.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return four_digit_year(naive.and_utc());
        }
    }
    s.parse::<i64>().ok().and_then(from_unix_seconds)
}

fn from_unix_seconds(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0).and_then(four_digit_year)
}

fn four_digit_year(t: DateTime<Utc>) -> Option<DateTime<Utc>> {
    (0..=9999).contains(&t.year()).then_some(t)
}
