use chrono::{Duration, Utc};
use tracing::info;

use crate::assembly::{assemble_outliers, distinct_channel_ids, OutlierResult};
use crate::compact_number::format_compact_number;
use crate::config::AppContext;
use crate::error::AppError;
use crate::niche::Niche;
use crate::providers::youtube_data::{fetch_channel_baselines, fetch_videos, search_video_ids, SearchOrder, VideoSearch};
use crate::trend_nature::{classify_trend_nature, TrendNature};
use crate::trends::{Trend, TrendSource, TrendStats};

const SEARCH_WINDOW_DAYS: i64 = 30;
const SEARCH_MAX_RESULTS: u32 = 50;

/// Most-viewed recent videos for a keyword (or the niche's category when no
/// keyword is given), ranked by how far each outperforms its own channel.
pub async fn find_outliers(ctx: &AppContext, niche: Niche, keyword: Option<&str>) -> Result<Vec<OutlierResult>, AppError> {
  let yt = ctx.youtube()?;
  let keyword = keyword.map(str::trim).filter(|k| !k.is_empty());

  let search = VideoSearch {
    keyword,
    category_id: if keyword.is_none() { Some(niche.category_id()) } else { None },
    order: SearchOrder::ViewCount,
    published_after: Utc::now() - Duration::days(SEARCH_WINDOW_DAYS),
    max_results: SEARCH_MAX_RESULTS,
  };
  let ids = search_video_ids(yt, &search).await?;
  if ids.is_empty() {
    return Ok(Vec::new());
  }

  let videos = fetch_videos(yt, &ids).await?;
  let channel_ids = distinct_channel_ids(&videos);
  let channels = fetch_channel_baselines(yt, &channel_ids).await?;
  let results = assemble_outliers(&videos, &channels, &ctx.outliers);

  info!(
    niche = %niche,
    keyword = keyword.unwrap_or(""),
    candidates = videos.len(),
    channels = channel_ids.len(),
    outliers = results.len(),
    "outlier scan complete"
  );
  Ok(results)
}

/// Seed trend for idea generation built from a single outlier video.
pub fn trend_from_outlier(outlier: &OutlierResult) -> Trend {
  let video = &outlier.video;
  let nature = outlier
    .channel
    .subscriber_count
    .known()
    .map(|subs| classify_trend_nature(subs as f64))
    .unwrap_or(TrendNature::ViralOpportunity);

  Trend {
    id: format!("outlier-{}", video.id),
    title: video.title.clone(),
    description: format!(
      "Outlier video from {} pulling {}x its channel's typical views ({} vs {}).",
      video.channel_title,
      outlier.performance_ratio(),
      format_compact_number(video.view_count),
      format_compact_number(outlier.typical_views),
    ),
    relevance_score: 100,
    search_query: video.title.clone(),
    sources: vec![TrendSource {
      title: video.title.clone(),
      uri: video.watch_url(),
    }],
    stats: Some(TrendStats {
      average_views: format_compact_number(video.view_count),
      average_likes: format_compact_number(video.like_count),
      average_comments: format_compact_number(video.comment_count),
      engagement_rate: engagement_rate(video.view_count, video.like_count, video.comment_count),
      average_subscriber_count: outlier.channel.subscriber_count.to_string(),
      average_channel_views: format_compact_number(outlier.typical_views),
    }),
    intensity: Vec::new(),
    video_count: Some(1),
    trend_nature: Some(nature.label().to_string()),
  }
}

fn engagement_rate(views: u64, likes: u64, comments: u64) -> String {
  if views == 0 {
    return "0%".to_string();
  }
  let rate = (likes + comments) as f64 / views as f64 * 100.0;
  format!("{rate:.1}%")
}
