use anyhow::Result;
use figment::{providers::{Env, Format, Toml}, Figment};
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub driver: DriverConfig,
    pub responder: ResponderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DriverConfig {
    /// Burst size of the single-burst worker.
    pub primary_burst: usize,
    /// First burst size of the split worker.
    pub split_burst: usize,
    /// Second burst size of the split worker, issued after the pause.
    pub second_burst: usize,
    /// Wall-clock pause between the split worker's two bursts.
    pub pause_seconds: f64,
    /// Log-and-continue on individual request failures instead of aborting
    /// the burst.
    pub continue_on_error: bool,
    pub http_timeout_seconds: u64,
}

impl DriverConfig {
    pub fn pause(&self) -> Duration {
        Duration::from_secs_f64(self.pause_seconds.max(0.0))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            primary_burst: 1000,
            split_burst: 500,
            second_burst: 1000,
            pause_seconds: 60.0,
            continue_on_error: true,
            http_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponderConfig {
    pub host: String,
    pub port: u16,
    /// Identifier echoed in every response body so an operator can tell
    /// which machine behind the load balancer answered.
    pub machine_id: String,
    pub request_timeout_secs: u64,
}

impl ResponderConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("BENCH__").split("__"));
        Ok(figment.extract()?)
    }
}
