//! IRC client adapter
//!
//! Opens a plain or TLS connection, registers, and turns server lines
//! into [`ConnectionEvent`]s. Outbound lines go through a channel to the
//! session task, which owns the socket.

mod message;

pub use message::{sanitize, IrcMessage};

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_rustls::TlsConnector;

use crate::application::errors::BotError;
use crate::domain::traits::{Connection, ConnectionEvent};
use crate::infrastructure::config::IrcConfig;

const TLS_PORT: u16 = 6697;
const PLAIN_PORT: u16 = 6667;
const MAX_NICK_TRIES: u32 = 5;
const PING_INTERVAL: Duration = Duration::from_secs(60);
const PING_TIMEOUT: Duration = Duration::from_secs(180);

enum Outgoing {
    Line(String),
    Quit {
        line: String,
        done: oneshot::Sender<()>,
    },
}

/// Handle to a running IRC session
pub struct IrcConnection {
    nick: Arc<RwLock<String>>,
    outgoing: mpsc::Sender<Outgoing>,
}

impl IrcConnection {
    /// Connect, start registration and return the event stream
    pub async fn connect(config: &IrcConfig) -> Result<(Self, mpsc::Receiver<ConnectionEvent>), BotError> {
        let address = server_address(&config.server, config.tls);
        let (event_tx, event_rx) = mpsc::channel(256);
        let (out_tx, out_rx) = mpsc::channel(64);
        let nick = Arc::new(RwLock::new(config.nick.clone()));

        let session = Session {
            base_nick: config.nick.clone(),
            nick: nick.clone(),
            events: event_tx,
        };

        tracing::info!("Connecting to {} (tls: {})", address, config.tls);
        let tcp = TcpStream::connect(&address)
            .await
            .map_err(|e| BotError::Network(format!("TCP connect to {} failed: {}", address, e)))?;

        if config.tls {
            let tls_config = if config.tls_insecure {
                tracing::warn!("TLS certificate verification disabled");
                rustls_insecure_config()
            } else {
                rustls_default_config()
            };
            let host = address.rsplit_once(':').map(|(h, _)| h).unwrap_or(&address);
            let dns_name = rustls::pki_types::ServerName::try_from(host.to_string())
                .map_err(|e| BotError::Network(format!("invalid server name {}: {}", host, e)))?;
            let tls = TlsConnector::from(Arc::new(tls_config))
                .connect(dns_name, tcp)
                .await
                .map_err(|e| BotError::Network(format!("TLS handshake with {} failed: {}", address, e)))?;
            tracing::debug!("TLS handshake complete");

            let (reader, writer) = tokio::io::split(tls);
            tokio::spawn(session.run(BufReader::new(reader), writer, out_rx));
        } else {
            let (reader, writer) = tokio::io::split(tcp);
            tokio::spawn(session.run(BufReader::new(reader), writer, out_rx));
        }

        Ok((Self { nick, outgoing: out_tx }, event_rx))
    }

    async fn write_line(&self, line: String) -> Result<(), BotError> {
        self.outgoing
            .send(Outgoing::Line(line))
            .await
            .map_err(|_| BotError::Disconnected("session task ended".to_string()))
    }
}

#[async_trait]
impl Connection for IrcConnection {
    async fn join(&self, channel: &str, key: Option<&str>) -> Result<(), BotError> {
        let line = match key {
            Some(key) if !key.is_empty() => format!("JOIN {} {}", channel, key),
            _ => format!("JOIN {}", channel),
        };
        self.write_line(line).await
    }

    async fn send(&self, target: &str, text: &str) -> Result<(), BotError> {
        self.write_line(format!("PRIVMSG {} :{}", sanitize(target), sanitize(text)))
            .await
    }

    async fn query_roster(&self, channel: &str) -> Result<(), BotError> {
        self.write_line(format!("NAMES {}", channel)).await
    }

    async fn disconnect(&self, reason: Option<&str>) -> Result<(), BotError> {
        let line = match reason {
            Some(reason) => format!("QUIT :{}", sanitize(reason)),
            None => "QUIT".to_string(),
        };
        let (done, flushed) = oneshot::channel();
        self.outgoing
            .send(Outgoing::Quit { line, done })
            .await
            .map_err(|_| BotError::Disconnected("session task ended".to_string()))?;
        let _ = flushed.await;
        Ok(())
    }

    fn nick(&self) -> String {
        self.nick.read().clone()
    }
}

struct Session {
    base_nick: String,
    nick: Arc<RwLock<String>>,
    events: mpsc::Sender<ConnectionEvent>,
}

impl Session {
    async fn run<R, W>(self, reader: R, writer: W, outgoing: mpsc::Receiver<Outgoing>)
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let reason = match self.drive(reader, writer, outgoing).await {
            Ok(reason) => reason,
            Err(e) => e.to_string(),
        };
        tracing::info!("IRC session ended: {}", reason);
        let _ = self.events.send(ConnectionEvent::Disconnected { reason }).await;
    }

    async fn drive<R, W>(&self, reader: R, mut writer: W, mut outgoing: mpsc::Receiver<Outgoing>) -> Result<String, BotError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        write_raw(&mut writer, &format!("NICK {}", self.base_nick)).await?;
        write_raw(&mut writer, &format!("USER {} 0 * :Goxxx", self.base_nick)).await?;

        let mut registered = false;
        let mut nick_tries: u32 = 0;
        let mut pending: Vec<String> = Vec::new();
        let mut names: HashMap<String, Vec<String>> = HashMap::new();
        let mut lines = reader.lines();
        let mut last_activity = tokio::time::Instant::now();
        let mut ping_sent = false;

        loop {
            let deadline = last_activity + if ping_sent { PING_TIMEOUT } else { PING_INTERVAL };
            tokio::select! {
                read = lines.next_line() => {
                    let Some(line) = read.map_err(|e| BotError::Network(e.to_string()))? else {
                        return Ok("EOF".to_string());
                    };
                    last_activity = tokio::time::Instant::now();
                    ping_sent = false;

                    let Some(msg) = IrcMessage::parse(&line) else {
                        continue;
                    };
                    tracing::trace!("<< {}", line);

                    match msg.command.as_str() {
                        "PING" => {
                            write_raw(&mut writer, &format!("PONG :{}", msg.param(0))).await?;
                        }
                        // RPL_WELCOME
                        "001" => {
                            let nick = msg.param(0).to_string();
                            *self.nick.write() = nick.clone();
                            registered = true;
                            self.emit(ConnectionEvent::Registered { nick }).await;
                            for line in pending.drain(..) {
                                write_raw(&mut writer, &line).await?;
                            }
                        }
                        // ERR_NICKNAMEINUSE
                        "433" if !registered => {
                            nick_tries += 1;
                            if nick_tries > MAX_NICK_TRIES {
                                return Ok("Nick in use".to_string());
                            }
                            let alt = format!("{}{}", self.base_nick, "_".repeat(nick_tries as usize));
                            tracing::warn!("Nick {} in use, trying {}", msg.param(1), alt);
                            write_raw(&mut writer, &format!("NICK {}", alt)).await?;
                        }
                        // RPL_NAMREPLY: me [=*@] channel :names
                        "353" if msg.params.len() >= 3 => {
                            let count = msg.params.len();
                            let channel = msg.params[count - 2].to_lowercase();
                            names
                                .entry(channel)
                                .or_default()
                                .extend(msg.params[count - 1].split_whitespace().map(str::to_string));
                        }
                        // RPL_ENDOFNAMES
                        "366" => {
                            let channel = msg.param(1).to_string();
                            let entries = names.remove(&channel.to_lowercase()).unwrap_or_default();
                            self.emit(ConnectionEvent::Roster { channel, entries }).await;
                        }
                        "PRIVMSG" => {
                            if let Some(from) = msg.source_nick() {
                                self.emit(ConnectionEvent::Message {
                                    from: from.to_string(),
                                    target: msg.param(0).to_string(),
                                    text: msg.param(1).to_string(),
                                })
                                .await;
                            }
                        }
                        "JOIN" => {
                            if let Some(nick) = msg.source_nick() {
                                self.emit(ConnectionEvent::Joined {
                                    channel: msg.param(0).to_string(),
                                    nick: nick.to_string(),
                                })
                                .await;
                            }
                        }
                        "PART" => {
                            if let Some(nick) = msg.source_nick() {
                                self.emit(ConnectionEvent::Parted {
                                    channel: msg.param(0).to_string(),
                                    nick: nick.to_string(),
                                })
                                .await;
                            }
                        }
                        "KICK" => {
                            self.emit(ConnectionEvent::Parted {
                                channel: msg.param(0).to_string(),
                                nick: msg.param(1).to_string(),
                            })
                            .await;
                        }
                        "NICK" => {
                            let own = self.nick.read().clone();
                            if msg.source_nick().is_some_and(|n| n.eq_ignore_ascii_case(&own)) {
                                *self.nick.write() = msg.param(0).to_string();
                            }
                        }
                        "ERROR" => {
                            return Ok(msg.param(0).to_string());
                        }
                        _ => {}
                    }
                }
                command = outgoing.recv() => {
                    match command {
                        Some(Outgoing::Line(line)) if registered => write_raw(&mut writer, &line).await?,
                        Some(Outgoing::Line(line)) => pending.push(line),
                        Some(Outgoing::Quit { line, done }) => {
                            write_raw(&mut writer, &line).await?;
                            let _ = done.send(());
                            return Ok("quit".to_string());
                        }
                        None => return Ok("connection handle dropped".to_string()),
                    }
                }
                _ = tokio::time::sleep_until(deadline) => {
                    if ping_sent {
                        return Err(BotError::Timeout(PING_TIMEOUT));
                    }
                    write_raw(&mut writer, "PING :goxxx").await?;
                    ping_sent = true;
                }
            }
        }
    }

    async fn emit(&self, event: ConnectionEvent) {
        if self.events.send(event).await.is_err() {
            tracing::debug!("Event receiver dropped");
        }
    }
}

async fn write_raw<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> Result<(), BotError> {
    tracing::trace!(">> {}", line);
    let io = async {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\r\n").await?;
        writer.flush().await
    };
    io.await.map_err(|e| BotError::Network(e.to_string()))
}

/// `host[:port]`, defaulting the port from the transport
fn server_address(server: &str, tls: bool) -> String {
    let has_port = server
        .rsplit_once(':')
        .is_some_and(|(_, port)| port.parse::<u16>().is_ok());
    if has_port {
        server.to_string()
    } else {
        format!("{}:{}", server, if tls { TLS_PORT } else { PLAIN_PORT })
    }
}

fn install_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

fn rustls_default_config() -> rustls::ClientConfig {
    install_crypto_provider();
    let root_store = rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth()
}

fn rustls_insecure_config() -> rustls::ClientConfig {
    install_crypto_provider();
    rustls::ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(InsecureVerifier))
        .with_no_client_auth()
}

#[derive(Debug)]
struct InsecureVerifier;

impl rustls::client::danger::ServerCertVerifier for InsecureVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::CryptoProvider::get_default()
            .map(|p| p.signature_verification_algorithms.supported_schemes())
            .unwrap_or_default()
    }
}
