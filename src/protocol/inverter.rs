use crate::prelude::*;

use {
    bytes::BytesMut,
    net2::TcpStreamExt,
    std::time::Duration,
    tokio::io::{AsyncReadExt, AsyncWriteExt},
    tokio_util::codec::Decoder,
};

use crate::protocol::packet::{Frame, ReadInputs, TcpFrameFactory};
use crate::protocol::packet_decoder::PacketDecoder;

#[derive(Clone, Debug, PartialEq)]
pub enum ChannelData {
    Connected,
    Disconnect,
    ReadInputs(ReadInputs),      // scheduler -> inverter
    Snapshot(TelemetrySnapshot), // inverter -> publisher
    Shutdown,
}
pub type Sender = broadcast::Sender<ChannelData>;
pub type Receiver = broadcast::Receiver<ChannelData>;

const READ_TIMEOUT_SECS: u64 = 1; // multiplier for read_timeout from config
const WRITE_TIMEOUT_SECS: u64 = 5;
const RECONNECT_DELAY_SECS: u64 = 5;
const TCP_KEEPALIVE_SECS: u64 = 60;
const MAX_BUFFER_SIZE: usize = 65536;

#[derive(Clone)]
pub struct Inverter {
    config: config::Inverter,
    channels: Channels,
}

impl Inverter {
    pub fn new(config: &Config, channels: Channels) -> Self {
        Self {
            config: config.inverter().clone(),
            channels,
        }
    }

    pub async fn start(&self) -> Result<()> {
        let mut receiver = self.channels.to_inverter.subscribe();

        while let Err(e) = self.connect().await {
            error!("inverter {}: {}", self.config.datalog(), e);
            info!(
                "inverter {}: reconnecting in {}s",
                self.config.datalog(),
                RECONNECT_DELAY_SECS
            );
            tokio::time::sleep(Duration::from_secs(RECONNECT_DELAY_SECS)).await;

            // a shutdown may have arrived while we slept
            loop {
                match receiver.try_recv() {
                    Ok(ChannelData::Shutdown) => return Ok(()),
                    Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                    Err(_) => break,
                }
            }
        }

        Ok(())
    }

    pub fn stop(&self) {
        let _ = self.channels.to_inverter.send(ChannelData::Shutdown);
    }

    pub async fn connect(&self) -> Result<()> {
        info!(
            "connecting to inverter at {}:{}",
            self.config.host(),
            self.config.port()
        );

        let host_port = (self.config.host().to_owned(), self.config.port());

        let stream = match tokio::time::timeout(
            Duration::from_secs(WRITE_TIMEOUT_SECS * 2),
            tokio::net::TcpStream::connect(host_port),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => bail!("failed to connect to inverter: {}", e),
            Err(_) => bail!("connection timeout after {} seconds", WRITE_TIMEOUT_SECS * 2),
        };

        let std_stream = stream.into_std()?;
        if let Err(e) = std_stream.set_keepalive(Some(Duration::new(TCP_KEEPALIVE_SECS, 0))) {
            warn!("failed to set TCP keepalive: {}", e);
        }

        let stream = tokio::net::TcpStream::from_std(std_stream)?;

        if self.config.use_tcp_nodelay() {
            if let Err(e) = stream.set_nodelay(true) {
                warn!("failed to set TCP_NODELAY: {}", e);
            }
        }

        let (reader, writer) = stream.into_split();

        info!("inverter {}: connected!", self.config.datalog());

        let sender_task = self.sender(writer);
        let receiver_task = self.receiver(reader);

        if let Err(e) = self.channels.from_inverter.send(ChannelData::Connected) {
            warn!("failed to send Connected message: {}", e);
        }

        let res = tokio::select! {
            res = sender_task => res,
            res = receiver_task => res,
        };

        let _ = self.channels.from_inverter.send(ChannelData::Disconnect);

        res
    }

    async fn sender(&self, mut writer: tokio::net::tcp::OwnedWriteHalf) -> Result<()> {
        let mut receiver = self.channels.to_inverter.subscribe();

        loop {
            match receiver.recv().await {
                Ok(ChannelData::Shutdown) => {
                    info!("inverter {}: received shutdown signal", self.config.datalog());
                    break;
                }
                Ok(ChannelData::ReadInputs(command)) => {
                    let bytes = TcpFrameFactory::read_inputs(
                        self.config.protocol(),
                        self.config.datalog(),
                        command,
                    );

                    debug!("inverter {}: TX {:02x?}", self.config.datalog(), bytes);

                    match tokio::time::timeout(
                        Duration::from_secs(WRITE_TIMEOUT_SECS),
                        writer.write_all(&bytes),
                    )
                    .await
                    {
                        Ok(Ok(())) => {
                            if let Err(e) = writer.flush().await {
                                bail!("failed to flush socket: {}", e);
                            }
                        }
                        Ok(Err(e)) => bail!("failed to write request: {}", e),
                        Err(_) => bail!("write timed out after {} seconds", WRITE_TIMEOUT_SECS),
                    }
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Closed) => bail!("channel closed"),
                Err(e) => {
                    warn!("error receiving from channel: {}", e);
                    continue;
                }
            }
        }

        info!("inverter {}: sender exiting", self.config.datalog());
        Ok(())
    }

    // inverter -> publisher
    async fn receiver(&self, mut socket: tokio::net::tcp::OwnedReadHalf) -> Result<()> {
        use tokio::time::timeout;

        let mut buf = BytesMut::with_capacity(MAX_BUFFER_SIZE);
        let mut decoder = PacketDecoder::new();
        let mut to_inverter_rx = self.channels.to_inverter.subscribe();

        loop {
            if buf.len() >= MAX_BUFFER_SIZE {
                bail!("receive backlog exceeds {} bytes", MAX_BUFFER_SIZE);
            }

            tokio::select! {
                msg = to_inverter_rx.recv() => {
                    match msg {
                        Ok(ChannelData::Shutdown) => {
                            info!("inverter {}: receiver received shutdown signal", self.config.datalog());
                            break;
                        }
                        Ok(_) => continue,
                        Err(e) => {
                            warn!("error receiving from channel: {}", e);
                            continue;
                        }
                    }
                }

                read_result = async {
                    if self.config.read_timeout() > 0 {
                        timeout(
                            Duration::from_secs(self.config.read_timeout() * READ_TIMEOUT_SECS),
                            socket.read_buf(&mut buf),
                        ).await
                    } else {
                        Ok(socket.read_buf(&mut buf).await)
                    }
                } => {
                    let len = match read_result {
                        Ok(Ok(n)) => n,
                        Ok(Err(e)) => bail!("read error: {}", e),
                        Err(_) => bail!(
                            "no data received for {} seconds",
                            self.config.read_timeout() * READ_TIMEOUT_SECS
                        ),
                    };

                    if len == 0 {
                        // drain whatever is already complete before giving up
                        while let Some(frame) = decoder.decode_eof(&mut buf)? {
                            self.handle_frame(frame);
                        }
                        bail!("connection closed by peer");
                    }

                    while let Some(frame) = decoder.decode(&mut buf)? {
                        self.handle_frame(frame);
                    }
                }
            }
        }

        info!("inverter {}: receiver exiting", self.config.datalog());
        Ok(())
    }

    fn handle_frame(&self, frame: Frame) {
        debug!(
            "inverter {}: RX {} byte frame",
            self.config.datalog(),
            frame.len()
        );

        match TelemetrySnapshot::decode(&frame) {
            Some(snapshot) => {
                if let Err(e) = self
                    .channels
                    .from_inverter
                    .send(ChannelData::Snapshot(snapshot))
                {
                    warn!("failed to forward snapshot: {}", e);
                }
            }
            None => debug!(
                "inverter {}: ignoring frame with function {:?}",
                self.config.datalog(),
                frame.tcp_function()
            ),
        }
    }
}
