use clap::Parser;

/// Solar Bridge - polls a solar inverter and republishes its telemetry
#[derive(Debug, Parser)]
#[clap(author, version)]
pub struct Options {
    /// Config file to read
    #[clap(short = 'c', long = "config", default_value = "config.yaml")]
    pub config_file: String,

    /// Override the wire protocol version from the config (1 or 2)
    #[clap(short = 'p', long = "protocol")]
    pub protocol: Option<u16>,
}

impl Options {
    pub fn new() -> Self {
        Self::parse()
    }
}
