pub mod assembly;
pub mod baseline;
pub mod compact_number;
pub mod config;
pub mod credentials;
pub mod error;
pub mod http_api;
pub mod http_client;
pub mod ideas;
pub mod model_json;
pub mod niche;
pub mod optimizer;
pub mod outlier_engine;
pub mod outliers;
pub mod policy;
pub mod providers;
pub mod trend_nature;
pub mod trends;

#[cfg(test)]
mod test_server;
