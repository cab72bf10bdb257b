use crate::prelude::*;

use serde::Deserialize;
use std::str::FromStr;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub inverter: Inverter,

    #[serde(default = "Config::default_publisher")]
    pub publisher: PublisherConfig,

    #[serde(default = "Config::default_loglevel")]
    pub loglevel: String,
}

// Inverter {{{
#[derive(Clone, Debug, Deserialize)]
pub struct Inverter {
    pub host: String,
    #[serde(default = "Config::default_port")]
    pub port: u16,

    /// Wire protocol version spoken by the datalogger.
    #[serde(default = "Config::default_protocol")]
    pub protocol: u16,

    #[serde(default, deserialize_with = "de_serial")]
    pub datalog: Option<Serial>,

    #[serde(default = "Config::default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    pub read_timeout: Option<u64>,
    pub use_tcp_nodelay: Option<bool>,
}

impl Inverter {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn protocol(&self) -> u16 {
        self.protocol
    }

    // dataloggers answer the broadcast serial before theirs is known
    pub fn datalog(&self) -> Serial {
        self.datalog.unwrap_or(Serial::BROADCAST)
    }

    pub fn poll_interval_ms(&self) -> u64 {
        self.poll_interval_ms
    }

    pub fn read_timeout(&self) -> u64 {
        self.read_timeout.unwrap_or(0)
    }

    pub fn use_tcp_nodelay(&self) -> bool {
        self.use_tcp_nodelay != Some(false)
    }
}
// }}}

// PublisherConfig {{{
#[derive(Clone, Debug, Deserialize)]
pub struct PublisherConfig {
    #[serde(default = "Config::default_enabled")]
    pub enabled: bool,

    #[serde(default = "Config::default_publisher_bind")]
    pub bind: String,
}

impl PublisherConfig {
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn bind(&self) -> &str {
        &self.bind
    }
}
// }}}

impl Config {
    pub fn new(file: String) -> Result<Self> {
        let content = std::fs::read_to_string(&file)
            .map_err(|err| anyhow!("error reading {}: {}", file, err))?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        match self.inverter.protocol {
            1 | 2 => Ok(()),
            other => Err(anyhow!(
                "unsupported protocol version {}; the datalogger speaks 1 or 2",
                other
            )),
        }
    }

    pub fn inverter(&self) -> &Inverter {
        &self.inverter
    }

    pub fn publisher(&self) -> &PublisherConfig {
        &self.publisher
    }

    pub fn loglevel(&self) -> String {
        self.loglevel.clone()
    }

    fn default_loglevel() -> String {
        "info".to_string()
    }

    fn default_port() -> u16 {
        8000
    }

    fn default_protocol() -> u16 {
        1
    }

    fn default_poll_interval_ms() -> u64 {
        5000
    }

    fn default_enabled() -> bool {
        true
    }

    fn default_publisher_bind() -> String {
        "0.0.0.0:8080".to_string()
    }

    fn default_publisher() -> PublisherConfig {
        PublisherConfig {
            enabled: Self::default_enabled(),
            bind: Self::default_publisher_bind(),
        }
    }
}

fn de_serial<'de, D>(deserializer: D) -> Result<Option<Serial>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    if s.is_empty() {
        Ok(None)
    } else {
        Serial::from_str(&s).map(Some).map_err(serde::de::Error::custom)
    }
}
