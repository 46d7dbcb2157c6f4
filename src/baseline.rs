use serde::Serialize;

/// Subscriber count as reported by the channels endpoint. Channels that hide
/// their count, or that were missing from the batch, are `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberCount {
  Known(u64),
  Unknown,
}

impl SubscriberCount {
  pub fn known(&self) -> Option<u64> {
    match self {
      SubscriberCount::Known(n) => Some(*n),
      SubscriberCount::Unknown => None,
    }
  }
}

impl std::fmt::Display for SubscriberCount {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      SubscriberCount::Known(n) => write!(f, "{}", crate::compact_number::format_compact_number(*n)),
      SubscriberCount::Unknown => write!(f, "Unknown"),
    }
  }
}

impl Serialize for SubscriberCount {
  fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    match self {
      SubscriberCount::Known(n) => serializer.serialize_u64(*n),
      SubscriberCount::Unknown => serializer.serialize_str("Unknown"),
    }
  }
}

/// Lifetime channel statistics used as the "expected" performance reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelBaseline {
  pub channel_id: String,
  pub subscriber_count: SubscriberCount,
  pub total_views: u64,
  pub total_video_count: u64,
}

impl ChannelBaseline {
  /// Placeholder for a channel the statistics batch did not return.
  pub fn unknown(channel_id: &str) -> Self {
    Self {
      channel_id: channel_id.to_string(),
      subscriber_count: SubscriberCount::Unknown,
      total_views: 0,
      total_video_count: 0,
    }
  }

  pub fn typical_views(&self) -> u64 {
    compute_baseline(self.total_views, self.total_video_count)
  }
}

/// Average lifetime views per video, rounded half up. Zero videos yields 0.
pub fn compute_baseline(total_views: u64, total_video_count: u64) -> u64 {
  if total_video_count == 0 {
    return 0;
  }
  let views = total_views as u128;
  let videos = total_video_count as u128;
  ((views * 2 + videos) / (videos * 2)) as u64
}
