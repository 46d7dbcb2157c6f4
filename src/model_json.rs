use serde_json::Value;

pub fn truncate_chars(value: &str, max_chars: usize) -> String {
  value.chars().take(max_chars).collect()
}

/// Removes a surrounding markdown code fence (```json ... ```), if any.
pub fn normalize_model_json_text(raw: &str) -> String {
  let mut text = raw.trim().to_string();
  if !text.starts_with("```") {
    return text;
  }

  if let Some(first_nl) = text.find('\n') {
    text = text[(first_nl + 1)..].to_string();
  } else {
    text = text.trim_start_matches('`').trim_start_matches("json").to_string();
  }
  if let Some(end_fence) = text.rfind("```") {
    text = text[..end_fence].to_string();
  }
  text.trim().to_string()
}

fn slice_between(text: &str, open: char, close: char) -> Option<&str> {
  let start = text.find(open)?;
  let end = text.rfind(close)?;
  if end <= start {
    return None;
  }
  Some(&text[start..=end])
}

/// Best-effort parse of model output: fenced or bare JSON, or the outermost
/// array/object embedded in surrounding prose.
pub fn parse_model_json(raw: &str) -> Option<Value> {
  let normalized = normalize_model_json_text(raw);
  if normalized.is_empty() {
    return None;
  }

  if let Ok(v) = serde_json::from_str::<Value>(&normalized) {
    return Some(v);
  }

  let array_first = match (normalized.find('['), normalized.find('{')) {
    (Some(a), Some(o)) => a < o,
    (Some(_), None) => true,
    _ => false,
  };
  let candidates = if array_first {
    [('[', ']'), ('{', '}')]
  } else {
    [('{', '}'), ('[', ']')]
  };

  candidates.iter().find_map(|(open, close)| {
    slice_between(&normalized, *open, *close).and_then(|s| serde_json::from_str::<Value>(s).ok())
  })
}

/// Parses a model answer that should be a JSON array. A single object is
/// accepted as a one-element array, and an object wrapping the array under
/// one key (e.g. `{"trends": [...]}`) is unwrapped.
pub fn parse_model_json_array(raw: &str) -> Option<Vec<Value>> {
  match parse_model_json(raw)? {
    Value::Array(items) => Some(items),
    Value::Object(map) => {
      let single = {
        let mut arrays = map.values().filter_map(|v| v.as_array());
        match (arrays.next(), arrays.next()) {
          (Some(only), None) => Some(only.clone()),
          _ => None,
        }
      };
      Some(single.unwrap_or_else(|| vec![Value::Object(map)]))
    }
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_fenced_json() {
    let raw = "```json\n[{\"title\":\"a\"}]\n```";
    let v = parse_model_json(raw).unwrap();
    assert_eq!(v[0]["title"], "a");
  }

  #[test]
  fn parses_json_embedded_in_prose() {
    let raw = "Here are the trends: [{\"title\":\"x\"}] hope this helps";
    assert_eq!(parse_model_json_array(raw).unwrap().len(), 1);

    let raw = "Result -> {\"critique\":\"ok\"} <- end";
    assert_eq!(parse_model_json(raw).unwrap()["critique"], "ok");
  }

  #[test]
  fn unwraps_single_array_field() {
    let raw = r#"{"trends":[{"title":"a"},{"title":"b"}]}"#;
    assert_eq!(parse_model_json_array(raw).unwrap().len(), 2);
  }

  #[test]
  fn rejects_garbage() {
    assert!(parse_model_json("").is_none());
    assert!(parse_model_json("no json here").is_none());
    assert!(parse_model_json_array("[{\"title\": ").is_none());
    assert!(parse_model_json_array("42").is_none());
  }

  #[test]
  fn truncate_chars_respects_char_boundaries() {
    assert_eq!(truncate_chars("héllo", 2), "hé");
    assert_eq!(truncate_chars("abc", 0), "");
  }
}
