use std::error::Error;

use solar_bridge::config::Config;
use solar_bridge::options::Options;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let options = Options::new();

    let mut config = Config::new(options.config_file.clone())?;
    if let Some(protocol) = options.protocol {
        config.inverter.protocol = protocol;
        config.validate()?;
    }

    solar_bridge::run(config).await?;

    Ok(())
}
