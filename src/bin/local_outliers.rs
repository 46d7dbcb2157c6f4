use vercel_runtime::Error;

use trendscout_rust::compact_number::format_compact_number;
use trendscout_rust::config::AppContext;
use trendscout_rust::credentials::CredentialStore;
use trendscout_rust::http_api::init_tracing;
use trendscout_rust::ideas::generate_video_ideas;
use trendscout_rust::niche::Niche;
use trendscout_rust::outliers::{find_outliers, trend_from_outlier};

fn parse_flag_value(args: &[String], flag: &str) -> Option<String> {
  args
    .iter()
    .position(|a| a == flag)
    .and_then(|idx| args.get(idx + 1))
    .cloned()
}

fn has_flag(args: &[String], flag: &str) -> bool {
  args.iter().any(|a| a == flag)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
  init_tracing();
  let args: Vec<String> = std::env::args().collect();

  let store = CredentialStore::default_location()
    .ok_or_else(|| Box::new(std::io::Error::other("no config directory for credentials")) as Error)?;

  if has_flag(&args, "--clear-key") {
    store.clear()?;
    println!("Cleared saved YouTube API key ({})", store.path().display());
    return Ok(());
  }
  if let Some(key) = parse_flag_value(&args, "--save-key") {
    store.save(&key)?;
    println!("Saved YouTube API key to {}", store.path().display());
  }

  let niche_raw = parse_flag_value(&args, "--niche").unwrap_or_else(|| "gaming".to_string());
  let Some(niche) = Niche::parse(&niche_raw) else {
    eprintln!(
      "Unknown --niche {niche_raw}. Expected one of: {}",
      Niche::ALL.iter().map(|n| n.display_name()).collect::<Vec<_>>().join(", ")
    );
    return Ok(());
  };
  let keyword = parse_flag_value(&args, "--keyword");

  let key = std::env::var("YOUTUBE_API_KEY").ok().or_else(|| store.load());
  let ctx = AppContext::from_env(key.as_deref());
  if ctx.youtube.is_none() {
    eprintln!("Missing YouTube API key. Pass --save-key <KEY> once or set YOUTUBE_API_KEY.");
    return Ok(());
  }

  let outliers = find_outliers(&ctx, niche, keyword.as_deref()).await?;
  if outliers.is_empty() {
    println!("No outliers found.");
    return Ok(());
  }

  for o in &outliers {
    println!(
      "{:>7.2}x  {:<13}  {:>7} views  (channel typical {:>7}, subs {})  {}  {}",
      o.performance_ratio(),
      o.tier().label(),
      format_compact_number(o.video.view_count),
      format_compact_number(o.typical_views),
      o.channel.subscriber_count,
      o.video.title,
      o.video.watch_url(),
    );
  }

  if has_flag(&args, "--ideas") {
    let seed = trend_from_outlier(&outliers[0]);
    println!("\nIdeas riffing on \"{}\" ({}):", seed.title, seed.trend_nature.as_deref().unwrap_or("-"));
    for idea in generate_video_ideas(&ctx, &seed).await? {
      println!("- {} [{:?}] :: {}", idea.title, idea.estimated_effort, idea.hook);
    }
  }

  Ok(())
}
