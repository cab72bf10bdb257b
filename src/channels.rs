use crate::prelude::*;
use crate::protocol::inverter::ChannelData;

#[derive(Debug, Clone)]
pub struct Channels {
    pub to_inverter: broadcast::Sender<ChannelData>,
    pub from_inverter: broadcast::Sender<ChannelData>,
}

impl Default for Channels {
    fn default() -> Self {
        Self::new()
    }
}

impl Channels {
    pub fn new() -> Self {
        Self {
            to_inverter: Self::channel(),
            from_inverter: Self::channel(),
        }
    }

    fn channel<T: Clone>() -> broadcast::Sender<T> {
        broadcast::channel(2048).0
    }
}
