use crate::prelude::*;

use {
    futures::{SinkExt, StreamExt},
    std::sync::{Arc, Mutex},
    tokio::net::{TcpListener, TcpStream},
    tokio_tungstenite::tungstenite::Message,
};

use crate::protocol::inverter::ChannelData;

type SharedSnapshot = Arc<Mutex<Option<String>>>;

/// Fans decoded snapshots out to WebSocket subscribers as JSON. A new
/// subscriber is greeted with the most recent snapshot, if there is one.
#[derive(Clone)]
pub struct Publisher {
    config: Config,
    channels: Channels,
}

impl Publisher {
    pub fn new(config: Config, channels: Channels) -> Self {
        Self { config, channels }
    }

    pub fn stop(&self) {
        let _ = self.channels.from_inverter.send(ChannelData::Shutdown);
    }

    pub async fn start(&self) -> Result<()> {
        if !self.config.publisher().enabled() {
            info!("publisher disabled");
            return Ok(());
        }

        let listener = TcpListener::bind(self.config.publisher().bind()).await?;
        info!("publishing snapshots on ws://{}", self.config.publisher().bind());

        let (sessions, _) = broadcast::channel(64);
        let last: SharedSnapshot = Arc::new(Mutex::new(None));

        tokio::select! {
            res = self.fanout(sessions.clone(), last.clone()) => res,
            res = self.accept(listener, sessions, last) => res,
        }
    }

    // inverter -> every connected subscriber
    async fn fanout(
        &self,
        sessions: broadcast::Sender<String>,
        last: SharedSnapshot,
    ) -> Result<()> {
        let mut receiver = self.channels.from_inverter.subscribe();

        loop {
            match receiver.recv().await {
                Ok(ChannelData::Snapshot(snapshot)) => {
                    let json = serde_json::to_string(&snapshot)?;
                    if let Ok(mut guard) = last.lock() {
                        *guard = Some(json.clone());
                    }
                    // nobody connected is fine
                    let _ = sessions.send(json);
                }
                Ok(ChannelData::Shutdown) => break,
                Ok(_) => {} // connection status messages
                Err(broadcast::error::RecvError::Closed) => bail!("channel closed"),
                Err(e) => warn!("error receiving from channel: {}", e),
            }
        }

        info!("publisher exiting");
        Ok(())
    }

    async fn accept(
        &self,
        listener: TcpListener,
        sessions: broadcast::Sender<String>,
        last: SharedSnapshot,
    ) -> Result<()> {
        loop {
            let (stream, addr) = listener.accept().await?;
            debug!("subscriber connected from {}", addr);

            let receiver = sessions.subscribe();
            let last = last.clone();
            tokio::spawn(async move {
                if let Err(e) = Self::session(stream, receiver, last).await {
                    debug!("subscriber {} dropped: {}", addr, e);
                }
            });
        }
    }

    async fn session(
        stream: TcpStream,
        mut receiver: broadcast::Receiver<String>,
        last: SharedSnapshot,
    ) -> Result<()> {
        let mut ws = tokio_tungstenite::accept_async(stream).await?;

        let greeting = last.lock().ok().and_then(|guard| guard.clone());
        if let Some(json) = greeting {
            ws.send(Message::Text(json)).await?;
        }

        loop {
            tokio::select! {
                update = receiver.recv() => {
                    match update {
                        Ok(json) => ws.send(Message::Text(json)).await?,
                        Err(broadcast::error::RecvError::Closed) => break,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            debug!("subscriber lagged, skipped {} snapshots", skipped);
                        }
                    }
                }

                incoming = ws.next() => {
                    match incoming {
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => {} // subscribers have nothing to tell us
                        Some(Err(e)) => bail!("websocket error: {}", e),
                    }
                }
            }
        }

        let _ = ws.close(None).await;
        Ok(())
    }
}
