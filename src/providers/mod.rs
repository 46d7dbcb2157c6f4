pub mod gemini;
pub mod youtube_data;
