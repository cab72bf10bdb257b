pub use {
    anyhow::{anyhow, bail, Result},
    log::{debug, error, info, trace, warn},
    tokio::sync::broadcast,
};

pub use crate::{
    channels::Channels,
    config::{self, Config},
    options::Options,
    protocol::packet::Serial,
    protocol::telemetry::TelemetrySnapshot,
    publisher::Publisher,
    scheduler::Scheduler,
    utils::Utils,
};
