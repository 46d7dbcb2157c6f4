//! Human-readable magnitudes ("1.2M", "500K") and their reverse parsing.

/// Expands a compact count such as `"1.2M"`, `"500k"` or `"12,345"`.
///
/// The scale suffix is read from the end of the original string before any
/// stripping. Everything that is not an ASCII digit or `.` is then dropped and
/// the leading decimal number is parsed. Input without digits yields `NaN`,
/// so callers must check `is_finite()` before doing ratio math.
pub fn parse_compact_number(input: &str) -> f64 {
  let trimmed = input.trim();
  let multiplier = match trimmed.chars().last().map(|c| c.to_ascii_uppercase()) {
    Some('M') => 1_000_000.0,
    Some('K') => 1_000.0,
    _ => 1.0,
  };

  let cleaned: String = trimmed
    .chars()
    .filter(|c| c.is_ascii_digit() || *c == '.')
    .collect();

  leading_decimal(&cleaned)
    .map(|value| value * multiplier)
    .unwrap_or(f64::NAN)
}

// "1.2.3" parses as 1.2, mirroring a lenient float prefix parse.
fn leading_decimal(cleaned: &str) -> Option<f64> {
  let mut end = 0;
  let mut seen_dot = false;
  for (idx, ch) in cleaned.char_indices() {
    if ch == '.' {
      if seen_dot {
        break;
      }
      seen_dot = true;
    }
    end = idx + ch.len_utf8();
  }

  let prefix = &cleaned[..end];
  if !prefix.chars().any(|c| c.is_ascii_digit()) {
    return None;
  }
  prefix.trim_end_matches('.').parse::<f64>().ok()
}

/// Renders a count for display: one decimal place with an `M` or `K`
/// suffix from a thousand upwards, the plain integer below that.
pub fn format_compact_number(value: u64) -> String {
  if value >= 1_000_000 {
    format!("{:.1}M", value as f64 / 1_000_000.0)
  } else if value >= 1_000 {
    format!("{:.1}K", value as f64 / 1_000.0)
  } else {
    value.to_string()
  }
}
