use crate::prelude::*;

use crate::protocol::inverter::ChannelData;
use crate::protocol::packet::ReadInputs;

// the vendor app always reads the first forty input registers
const START_REGISTER: u16 = 0;
const REGISTER_COUNT: u16 = 40;

pub struct Scheduler {
    config: Config,
    channels: Channels,
}

impl Scheduler {
    pub fn new(config: Config, channels: Channels) -> Self {
        Self { config, channels }
    }

    pub async fn start(&self) -> Result<()> {
        let mut interval = tokio::time::interval(std::time::Duration::from_millis(
            self.config.inverter().poll_interval_ms(),
        ));
        let mut receiver = self.channels.to_inverter.subscribe();

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let command = ReadInputs {
                        inverter: Serial::EMPTY,
                        register: START_REGISTER,
                        count: REGISTER_COUNT,
                    };

                    if let Err(e) = self.channels.to_inverter.send(ChannelData::ReadInputs(command)) {
                        warn!("failed to send read request: {}", e);
                    }
                }

                msg = receiver.recv() => {
                    if let Ok(ChannelData::Shutdown) = msg {
                        break;
                    }
                }
            }
        }

        info!("scheduler exiting");
        Ok(())
    }
}
