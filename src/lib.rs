pub mod config;
pub mod ev;
pub mod fixtures_fetch;
pub mod http_cache;
pub mod http_client;
pub mod model;
pub mod provider;
pub mod state;
pub mod team_stats_fetch;
pub mod training_data;
