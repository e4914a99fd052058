use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub redis: RedisConfig,
    pub engine: EngineConfig,
    pub behavior: BehaviorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        format!("{}:{}", self.host, self.port).parse().unwrap()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    pub ttl_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub default_limit: usize,
    pub max_limit: usize,
    pub pool_factor: usize,
    pub request_timeout_ms: u64,
    pub generator_timeout_ms: u64,
    pub trending_window_days: i64,
    pub collaborative_window_days: i64,
    pub min_similarity: f64,
    pub neighborhood_size: usize,
    pub default_diversity_factor: f64,
    pub default_freshness_factor: f64,
    pub default_personality_factor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorConfig {
    pub window_days: i64,
    pub analysis_window_days: i64,
    pub min_interactions: u64,
    pub interest_threshold: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                workers: num_cpus::get(),
            },
            redis: RedisConfig {
                url: "redis://localhost:6379".to_string(),
                ttl_seconds: 600,
            },
            engine: EngineConfig {
                default_limit: 10,
                max_limit: 100,
                pool_factor: 3,
                request_timeout_ms: 5000,
                generator_timeout_ms: 1500,
                trending_window_days: 7,
                collaborative_window_days: 90,
                min_similarity: 0.05,
                neighborhood_size: 20,
                default_diversity_factor: 0.3,
                default_freshness_factor: 0.2,
                default_personality_factor: 0.5,
            },
            behavior: BehaviorConfig {
                window_days: 30,
                analysis_window_days: 90,
                min_interactions: 3,
                interest_threshold: 0.1,
            },
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("RANKOR"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
