//! Normalization of numbers as they arrive from the feed.
//!
//! Feed values are text such as `"25,350"`, `"+1.5"` or `"0.8%"`. Every numeric
//! comparison in the pipeline goes through [`parse`] (or [`parse_or_nan`]) so
//! the same rules apply everywhere: thousands-separator commas are removed,
//! surrounding whitespace is trimmed and a trailing percent sign is dropped.
//! No other locale conventions are assumed.

/// Placeholder the feed sends for a field that has no data yet.
pub const NO_DATA: &str = "--";

/// Strip thousands separators, whitespace and a trailing `%` from `raw`.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix('%').unwrap_or(trimmed).trim_end();
    trimmed.chars().filter(|c| *c != ',').collect()
}

/// Returns `true` for values that carry no number at all (empty or the sentinel).
pub fn is_absent(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || trimmed == NO_DATA
}

/// Parse a feed value into a finite `f64`.
///
/// Returns `None` for absent values, the no-data sentinel and anything that
/// does not parse after normalization.
pub fn parse(raw: &str) -> Option<f64> {
    if is_absent(raw) {
        return None;
    }
    normalize(raw)
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Like [`parse`] but maps failures to `NaN`, which never satisfies a
/// numeric threshold.
pub fn parse_or_nan(raw: &str) -> f64 {
    parse(raw).unwrap_or(f64::NAN)
}
