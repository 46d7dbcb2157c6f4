use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Niche {
  Gaming,
  Tech,
  Lifestyle,
  Education,
  Entertainment,
  Finance,
  ArtificialIntelligence,
}

impl Niche {
  pub const ALL: [Niche; 7] = [
    Niche::Gaming,
    Niche::Tech,
    Niche::Lifestyle,
    Niche::Education,
    Niche::Entertainment,
    Niche::Finance,
    Niche::ArtificialIntelligence,
  ];

  pub fn display_name(&self) -> &'static str {
    match self {
      Niche::Gaming => "Gaming",
      Niche::Tech => "Tech",
      Niche::Lifestyle => "Lifestyle",
      Niche::Education => "Education",
      Niche::Entertainment => "Entertainment",
      Niche::Finance => "Finance",
      Niche::ArtificialIntelligence => "Artificial Intelligence",
    }
  }

  /// YouTube video category used to approximate the niche.
  pub fn category_id(&self) -> &'static str {
    match self {
      Niche::Gaming => "20",
      Niche::Tech => "28",
      // Howto & Style
      Niche::Lifestyle => "26",
      Niche::Education => "27",
      Niche::Entertainment => "24",
      // News & Politics
      Niche::Finance => "25",
      Niche::ArtificialIntelligence => "28",
    }
  }

  /// Accepts the display name (any case) or the short forms "ai" / "artificial_intelligence".
  pub fn parse(input: &str) -> Option<Niche> {
    let needle = input.trim().replace(['_', '-'], " ");
    if needle.eq_ignore_ascii_case("ai") {
      return Some(Niche::ArtificialIntelligence);
    }
    Niche::ALL
      .iter()
      .copied()
      .find(|n| n.display_name().eq_ignore_ascii_case(&needle))
  }
}

impl std::fmt::Display for Niche {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.display_name())
  }
}
