use serde::Serialize;

const BIG_CREATOR_FLOOR: f64 = 1_000_000.0;
const VIRAL_OPPORTUNITY_CEILING: f64 = 200_000.0;

/// Competitive nature of a cluster of videos, judged by how large the
/// channels behind it are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrendNature {
  BigCreatorDominated,
  ViralOpportunity,
  Mixed,
}

impl TrendNature {
  /// Display label, matching the wording the model is prompted with.
  pub fn label(&self) -> &'static str {
    match self {
      TrendNature::BigCreatorDominated => "Big Creator Dominated",
      TrendNature::ViralOpportunity => "Viral Opportunity",
      TrendNature::Mixed => "Mixed",
    }
  }
}

/// Both boundaries (exactly 1M and exactly 200K) fall in `Mixed`.
pub fn classify_trend_nature(average_subscriber_count: f64) -> TrendNature {
  if average_subscriber_count > BIG_CREATOR_FLOOR {
    TrendNature::BigCreatorDominated
  } else if average_subscriber_count < VIRAL_OPPORTUNITY_CEILING {
    TrendNature::ViralOpportunity
  } else {
    TrendNature::Mixed
  }
}

/// Natural-language statement of the rule, embedded in clustering prompts so
/// the model labels trends with the same categories and boundaries.
pub fn prompt_rule() -> String {
  format!(
    "'trendNature': one of \"{}\" (average subscriber count above 1,000,000), \"{}\" (average subscriber count below 200,000), or \"{}\" (anything in between).",
    TrendNature::BigCreatorDominated.label(),
    TrendNature::ViralOpportunity.label(),
    TrendNature::Mixed.label()
  )
}
