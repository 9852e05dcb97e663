use anyhow::{Context, Result};
use duet_core::{PeerId, SignalMessage};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::signal_helpers::SIGNAL_TIMEOUT_MS;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Raw WebSocket peer talking the relay protocol.
pub struct TestWsClient {
    pub peer_id: PeerId,
    write: SplitSink<Socket, Message>,
    read: SplitStream<Socket>,
}

impl TestWsClient {
    /// Connects and consumes the `Welcome` + `IceConfig` greeting.
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let (socket, _) = connect_async(format!("ws://{addr}/ws"))
            .await
            .context("Failed to connect to relay")?;
        let (write, read) = socket.split();
        let mut client = Self {
            peer_id: PeerId::new(),
            write,
            read,
        };

        match client.recv_signal().await? {
            SignalMessage::Welcome { peer_id } => client.peer_id = peer_id,
            other => anyhow::bail!("Expected Welcome, got {:?}", other),
        }
        match client.recv_signal().await? {
            SignalMessage::IceConfig { .. } => {}
            other => anyhow::bail!("Expected IceConfig, got {:?}", other),
        }
        Ok(client)
    }

    pub async fn send(&mut self, msg: &SignalMessage) -> Result<()> {
        let json = serde_json::to_string(msg)?;
        self.write.send(Message::Text(json.into())).await?;
        Ok(())
    }

    pub async fn send_raw_text(&mut self, text: &str) -> Result<()> {
        self.write.send(Message::Text(text.to_owned().into())).await?;
        Ok(())
    }

    pub async fn send_binary(&mut self, data: Vec<u8>) -> Result<()> {
        self.write.send(Message::Binary(data.into())).await?;
        Ok(())
    }

    /// Round-trips a ping so every earlier message has been handled.
    pub async fn barrier(&mut self) -> Result<()> {
        self.send(&SignalMessage::Ping).await?;
        match self.recv_signal().await? {
            SignalMessage::Pong => Ok(()),
            other => anyhow::bail!("Expected Pong, got {:?}", other),
        }
    }

    pub async fn recv_signal(&mut self) -> Result<SignalMessage> {
        loop {
            match self.next_frame().await? {
                Message::Text(text) => return Ok(serde_json::from_str(text.as_str())?),
                Message::Close(_) => anyhow::bail!("Socket closed"),
                _ => continue,
            }
        }
    }

    pub async fn recv_binary(&mut self) -> Result<Vec<u8>> {
        loop {
            match self.next_frame().await? {
                Message::Binary(data) => return Ok(data.to_vec()),
                Message::Close(_) => anyhow::bail!("Socket closed"),
                _ => continue,
            }
        }
    }

    /// Asserts that no binary frame arrives for a short while.
    pub async fn expect_no_binary(&mut self, window_ms: u64) -> Result<()> {
        let waited =
            tokio::time::timeout(Duration::from_millis(window_ms), self.recv_binary()).await;
        match waited {
            Ok(Ok(data)) => anyhow::bail!("Unexpected binary frame of {} bytes", data.len()),
            _ => Ok(()),
        }
    }

    async fn next_frame(&mut self) -> Result<Message> {
        let frame = tokio::time::timeout(Duration::from_millis(SIGNAL_TIMEOUT_MS), self.read.next())
            .await
            .context("Timeout waiting for frame")?;
        match frame {
            Some(Ok(msg)) => Ok(msg),
            Some(Err(e)) => Err(e.into()),
            None => anyhow::bail!("Socket ended"),
        }
    }

    pub async fn close(mut self) -> Result<()> {
        self.write.send(Message::Close(None)).await?;
        Ok(())
    }
}
