//! src/platforms/twitch_irc/client.rs

use std::fmt;
use std::io;

use emotebot_common::models::{ChatEvent, Endpoint};
use tokio::io::{split, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_native_tls::native_tls;
use tokio_native_tls::TlsConnector;
use tracing::{debug, error, info};

use crate::config::BotConfig;

use super::events::{to_chat_event, SessionInfo};
use super::message::IrcMessage;

/// Everything needed to open and register a chat connection.
#[derive(Clone)]
pub struct IrcSettings {
    pub host: String,
    pub port: u16,
    pub secure: bool,
    pub username: String,
    pub password: String,
    pub channels: Vec<String>,
}

impl IrcSettings {
    pub fn from_config(config: &BotConfig) -> Self {
        Self {
            host: config.connection.host.clone(),
            port: config.connection.port,
            secure: config.connection.secure,
            username: config.identity.username.clone(),
            password: config.identity.password.clone(),
            channels: config.connection.channels.clone(),
        }
    }
}

impl fmt::Debug for IrcSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IrcSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("secure", &self.secure)
            .field("username", &self.username)
            .field("channels", &self.channels)
            .finish_non_exhaustive()
    }
}

/// Low-level IRC client for one Twitch chat connection.
///
/// Inbound lines are translated to [`ChatEvent`]s and pushed into the
/// channel handed to [`TwitchIrcClient::connect`]. When the read side ends a
/// final `Disconnected` event is sent.
pub struct TwitchIrcClient {
    raw_outgoing: mpsc::UnboundedSender<String>,
    read_task: JoinHandle<()>,
    write_task: JoinHandle<()>,
}

impl TwitchIrcClient {
    /// Connects (with TLS when `secure`), queues PASS/NICK/CAP and spawns the
    /// read/write tasks. Channels are joined once the server welcomes us.
    pub async fn connect(
        settings: &IrcSettings,
        events: mpsc::UnboundedSender<ChatEvent>,
    ) -> io::Result<Self> {
        let tcp = TcpStream::connect((settings.host.as_str(), settings.port))
            .await
            .map_err(|e| io::Error::other(format!("TCP connect error: {e}")))?;

        let session = SessionInfo {
            username: settings.username.clone(),
            endpoint: Endpoint {
                address: settings.host.clone(),
                port: settings.port,
            },
        };

        let (tx_outgoing, rx_outgoing) = mpsc::unbounded_channel::<String>();
        tx_outgoing.send(format!("PASS {}", settings.password)).ok();
        tx_outgoing.send(format!("NICK {}", settings.username)).ok();
        tx_outgoing
            .send("CAP REQ :twitch.tv/tags twitch.tv/commands".to_string())
            .ok();

        let channels = settings.channels.clone();

        let (read_task, write_task) = if settings.secure {
            let native_connector = native_tls::TlsConnector::new()
                .map_err(|e| io::Error::other(format!("TLSConnector::new() => {e}")))?;
            let connector = TlsConnector::from(native_connector);
            let tls_stream = connector
                .connect(&settings.host, tcp)
                .await
                .map_err(|e| io::Error::other(format!("TLS connect() => {e}")))?;

            let (read_half, write_half) = split(tls_stream);
            (
                tokio::spawn(Self::reader_loop(read_half, session, channels, events, tx_outgoing.clone())),
                tokio::spawn(Self::writer_loop(write_half, rx_outgoing)),
            )
        } else {
            let (read_half, write_half) = split(tcp);
            (
                tokio::spawn(Self::reader_loop(read_half, session, channels, events, tx_outgoing.clone())),
                tokio::spawn(Self::writer_loop(write_half, rx_outgoing)),
            )
        };

        info!("(TwitchIrcClient) connected to {}:{}", settings.host, settings.port);

        Ok(Self {
            raw_outgoing: tx_outgoing,
            read_task,
            write_task,
        })
    }

    async fn reader_loop<R>(
        read_half: R,
        session: SessionInfo,
        channels: Vec<String>,
        tx_events: mpsc::UnboundedSender<ChatEvent>,
        tx_outgoing: mpsc::UnboundedSender<String>,
    )
    where
        R: AsyncRead + Unpin,
    {
        let mut reader = BufReader::new(read_half);
        let mut line_buffer = Vec::new();

        let reason = loop {
            line_buffer.clear();
            match reader.read_until(b'\n', &mut line_buffer).await {
                Ok(0) => break "Connection closed.".to_string(),
                Ok(_) => {
                    // invalid UTF-8 becomes U+FFFD instead of ending the session
                    let decoded = String::from_utf8_lossy(&line_buffer);
                    let line = decoded.trim_end();
                    if line.is_empty() {
                        continue;
                    }

                    let parsed = IrcMessage::parse(line);
                    match parsed.command.as_str() {
                        "PING" => {
                            let token = parsed.trailing.as_deref().unwrap_or("tmi.twitch.tv");
                            tx_outgoing.send(format!("PONG :{}", token)).ok();
                            continue;
                        }
                        "RECONNECT" => break "Server requested a reconnect".to_string(),
                        "001" => {
                            for channel in &channels {
                                tx_outgoing.send(format!("JOIN {}", channel)).ok();
                            }
                        }
                        _ => {}
                    }
                    debug!("<< {}", line);

                    if let Some(evt) = to_chat_event(&parsed, &session) {
                        if tx_events.send(evt).is_err() {
                            break "Event receiver dropped".to_string();
                        }
                    }
                }
                Err(e) => {
                    error!("(TwitchIrcClient) read error => {:?}", e);
                    break e.to_string();
                }
            }
        };

        info!("(TwitchIrcClient) reader_loop ended: {}", reason);
        let _ = tx_events.send(ChatEvent::Disconnected { reason });
    }

    async fn writer_loop<W>(
        mut write_half: W,
        mut rx_outgoing: mpsc::UnboundedReceiver<String>,
    )
    where
        W: AsyncWrite + Unpin,
    {
        let mut writer = BufWriter::new(&mut write_half);

        while let Some(line) = rx_outgoing.recv().await {
            if line.starts_with("PASS ") {
                debug!(">> PASS ********");
            } else {
                debug!(">> {}", line);
            }
            if let Err(e) = writer.write_all(line.as_bytes()).await {
                error!("writer error => {:?}", e);
                break;
            }
            if let Err(e) = writer.write_all(b"\r\n").await {
                error!("writer error => {:?}", e);
                break;
            }
            if let Err(e) = writer.flush().await {
                error!("writer flush error => {:?}", e);
                break;
            }
        }

        info!("(TwitchIrcClient) writer_loop ended.");
    }

    pub fn send_raw_line(&self, line: &str) -> Result<(), mpsc::error::SendError<String>> {
        self.raw_outgoing.send(line.to_string())
    }

    pub fn send_privmsg(&self, channel: &str, message: &str) -> Result<(), mpsc::error::SendError<String>> {
        self.send_raw_line(&format!("PRIVMSG {} :{}", channel, message))
    }

    /// Aborts the read/write tasks without emitting a `Disconnected` event.
    pub fn shutdown(self) {
        self.read_task.abort();
        self.write_task.abort();
    }
}
