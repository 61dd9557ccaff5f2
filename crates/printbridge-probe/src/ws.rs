// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Minimal RFC 6455 WebSocket client over plain TCP.
//
// Enough of the protocol to talk to the PrintBridge streaming endpoint: the
// HTTP/1.1 upgrade handshake, masked client frames, 7/16/64-bit payload
// lengths, fragmented messages, ping/pong and the close handshake. Only
// `ws://` is supported; there is no TLS and no extension negotiation.

use base64::Engine as _;
use reqwest::Url;
use sha1::{Digest, Sha1};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info, instrument, trace};
use uuid::Uuid;

use printbridge_core::error::{BridgeError, Result};

/// GUID appended to the client key when computing `Sec-WebSocket-Accept`.
const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Upper bound on a single frame or reassembled message.
pub const MAX_MESSAGE_BYTES: u64 = 16 * 1024 * 1024; // 16 MiB

/// Upper bound on the handshake response headers.
const MAX_HANDSHAKE_BYTES: usize = 16 * 1024;

/// Status code for a normal closure.
pub const CLOSE_NORMAL: u16 = 1000;

// ---------------------------------------------------------------------------
// Opcodes (RFC 6455 §5.2)
// ---------------------------------------------------------------------------

pub const OP_CONTINUATION: u8 = 0x0;
pub const OP_TEXT: u8 = 0x1;
pub const OP_BINARY: u8 = 0x2;
pub const OP_CLOSE: u8 = 0x8;
pub const OP_PING: u8 = 0x9;
pub const OP_PONG: u8 = 0xA;

/// A decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub fin: bool,
    pub opcode: u8,
    /// Unmasked payload.
    pub payload: Vec<u8>,
}

/// A complete application-level message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Text(String),
    Binary(Vec<u8>),
    /// The peer closed the connection, with its status code if it sent one.
    Close(Option<u16>),
}

/// `Sec-WebSocket-Accept` value for a client key.
pub fn accept_key(client_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(client_key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
}

/// Encode one frame with FIN set. Client frames must pass a `mask`; server
/// frames must not.
pub fn encode_frame(opcode: u8, payload: &[u8], mask: Option<[u8; 4]>) -> Vec<u8> {
    let len = payload.len();
    let mut out = Vec::with_capacity(len + 14);
    out.push(0x80 | (opcode & 0x0F));

    let mask_bit = if mask.is_some() { 0x80 } else { 0x00 };
    if len < 126 {
        out.push(mask_bit | len as u8);
    } else if let Ok(short) = u16::try_from(len) {
        out.push(mask_bit | 126);
        out.extend_from_slice(&short.to_be_bytes());
    } else {
        out.push(mask_bit | 127);
        out.extend_from_slice(&(len as u64).to_be_bytes());
    }

    match mask {
        Some(key) => {
            out.extend_from_slice(&key);
            out.extend(payload.iter().enumerate().map(|(i, b)| b ^ key[i % 4]));
        }
        None => out.extend_from_slice(payload),
    }
    out
}

/// Read and unmask one frame.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Frame> {
    let mut head = [0u8; 2];
    reader.read_exact(&mut head).await?;

    let fin = head[0] & 0x80 != 0;
    if head[0] & 0x70 != 0 {
        return Err(BridgeError::WebSocket("reserved bits set without an extension".into()));
    }
    let opcode = head[0] & 0x0F;
    let masked = head[1] & 0x80 != 0;

    let len = match head[1] & 0x7F {
        126 => {
            let mut ext = [0u8; 2];
            reader.read_exact(&mut ext).await?;
            u64::from(u16::from_be_bytes(ext))
        }
        127 => {
            let mut ext = [0u8; 8];
            reader.read_exact(&mut ext).await?;
            u64::from_be_bytes(ext)
        }
        short => u64::from(short),
    };
    if len > MAX_MESSAGE_BYTES {
        return Err(BridgeError::WebSocket(format!(
            "frame of {len} bytes exceeds the {MAX_MESSAGE_BYTES} byte limit"
        )));
    }

    let mask = if masked {
        let mut key = [0u8; 4];
        reader.read_exact(&mut key).await?;
        Some(key)
    } else {
        None
    };

    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;
    if let Some(key) = mask {
        for (i, byte) in payload.iter_mut().enumerate() {
            *byte ^= key[i % 4];
        }
    }

    trace!(fin, opcode, len, "frame read");
    Ok(Frame { fin, opcode, payload })
}

/// Where to connect and what to ask for.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    /// Host as written in the URL; IPv6 literals keep their brackets.
    host: String,
    port: u16,
    /// Path plus query, as sent in the request line.
    resource: String,
}

impl Target {
    fn parse(url: &str) -> Result<Self> {
        let parsed = Url::parse(url)
            .map_err(|e| BridgeError::WebSocket(format!("invalid WebSocket URL {url}: {e}")))?;
        match parsed.scheme() {
            "ws" => {}
            "wss" => {
                return Err(BridgeError::WebSocket(
                    "wss:// endpoints are not supported, use ws://".into(),
                ));
            }
            other => {
                return Err(BridgeError::WebSocket(format!(
                    "unsupported WebSocket scheme {other}://"
                )));
            }
        }
        let host = parsed
            .host_str()
            .ok_or_else(|| BridgeError::WebSocket(format!("WebSocket URL {url} has no host")))?
            .to_string();
        let port = parsed.port_or_known_default().unwrap_or(80);
        let mut resource = parsed.path().to_string();
        if let Some(query) = parsed.query() {
            resource.push('?');
            resource.push_str(query);
        }
        Ok(Self { host, port, resource })
    }

    /// Host in the form a socket lookup accepts (`::1`, not `[::1]`).
    fn connect_host(&self) -> &str {
        self.host.trim_start_matches('[').trim_end_matches(']')
    }

    fn host_header(&self) -> String {
        if self.port == 80 {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// An open client connection.
#[derive(Debug)]
pub struct WsConnection {
    stream: BufReader<TcpStream>,
    close_sent: bool,
    close_received: bool,
    /// Set while a frame is being written. Still set afterwards means the
    /// write was cancelled or failed partway and the stream is misaligned.
    mid_frame: bool,
}

impl WsConnection {
    /// Open a TCP connection and perform the upgrade handshake.
    #[instrument]
    pub async fn connect(url: &str) -> Result<Self> {
        let target = Target::parse(url)?;
        let stream = TcpStream::connect((target.connect_host(), target.port))
            .await
            .map_err(|e| {
                BridgeError::Transport(format!("connect to {}:{}: {e}", target.host, target.port))
            })?;
        stream.set_nodelay(true)?;
        let mut stream = BufReader::new(stream);

        let key = base64::engine::general_purpose::STANDARD.encode(Uuid::new_v4().as_bytes());
        let request = format!(
            "GET {} HTTP/1.1\r\n\
             Host: {}\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Key: {key}\r\n\
             Sec-WebSocket-Version: 13\r\n\
             \r\n",
            target.resource,
            target.host_header(),
        );
        stream.get_mut().write_all(request.as_bytes()).await?;
        stream.get_mut().flush().await?;

        let (status_line, headers) = read_response_head(&mut stream).await?;
        let status = status_line.split_whitespace().nth(1).unwrap_or_default();
        if status != "101" {
            return Err(BridgeError::Handshake(format!(
                "server answered `{status_line}` instead of 101 Switching Protocols"
            )));
        }

        let upgrade = header_value(&headers, "upgrade").unwrap_or_default();
        if !upgrade.eq_ignore_ascii_case("websocket") {
            return Err(BridgeError::Handshake(format!(
                "unexpected Upgrade header `{upgrade}`"
            )));
        }
        let expected = accept_key(&key);
        match header_value(&headers, "sec-websocket-accept") {
            Some(accept) if accept == expected => {}
            Some(accept) => {
                return Err(BridgeError::Handshake(format!(
                    "Sec-WebSocket-Accept mismatch: expected {expected}, got {accept}"
                )));
            }
            None => {
                return Err(BridgeError::Handshake("missing Sec-WebSocket-Accept".into()));
            }
        }

        info!(url, "WebSocket connected");
        Ok(Self {
            stream,
            close_sent: false,
            close_received: false,
            mid_frame: false,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.close_sent || self.close_received
    }

    /// Send a single text message.
    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        if self.is_closed() {
            return Err(BridgeError::WebSocket("connection already closed".into()));
        }
        debug!(bytes = text.len(), "sending text frame");
        self.write_frame(OP_TEXT, text.as_bytes()).await
    }

    /// Wait for the next complete message, answering pings along the way.
    pub async fn next_message(&mut self) -> Result<Message> {
        if self.close_received {
            return Err(BridgeError::WebSocket("connection already closed".into()));
        }

        let mut assembling: Option<(u8, Vec<u8>)> = None;
        loop {
            let frame = read_frame(&mut self.stream).await?;
            match frame.opcode {
                OP_TEXT | OP_BINARY => {
                    if assembling.is_some() {
                        return Err(BridgeError::WebSocket(
                            "new message started inside a fragmented one".into(),
                        ));
                    }
                    if frame.fin {
                        return finish_message(frame.opcode, frame.payload);
                    }
                    assembling = Some((frame.opcode, frame.payload));
                }
                OP_CONTINUATION => {
                    let Some((opcode, mut buffer)) = assembling.take() else {
                        return Err(BridgeError::WebSocket(
                            "continuation frame without a message".into(),
                        ));
                    };
                    buffer.extend_from_slice(&frame.payload);
                    if buffer.len() as u64 > MAX_MESSAGE_BYTES {
                        return Err(BridgeError::WebSocket("fragmented message too large".into()));
                    }
                    if frame.fin {
                        return finish_message(opcode, buffer);
                    }
                    assembling = Some((opcode, buffer));
                }
                OP_PING => {
                    trace!("ping");
                    self.write_frame(OP_PONG, &frame.payload).await?;
                }
                OP_PONG => {}
                OP_CLOSE => {
                    self.close_received = true;
                    let code = (frame.payload.len() >= 2)
                        .then(|| u16::from_be_bytes([frame.payload[0], frame.payload[1]]));
                    debug!(?code, "peer closed WebSocket");
                    if !self.close_sent {
                        self.close_sent = true;
                        // Echo the close; the peer may already be gone.
                        let echo = &frame.payload[..frame.payload.len().min(2)];
                        let _ = self.write_frame(OP_CLOSE, echo).await;
                    }
                    return Ok(Message::Close(code));
                }
                other => {
                    return Err(BridgeError::WebSocket(format!("unknown opcode 0x{other:X}")));
                }
            }
        }
    }

    /// Send a close frame. Calling it again is a no-op.
    pub async fn close(&mut self, code: u16) -> Result<()> {
        if self.close_sent {
            return Ok(());
        }
        self.close_sent = true;
        if self.mid_frame {
            // A close frame would land inside the unfinished one.
            debug!("frame write was interrupted, closing without a close frame");
            self.stream.get_mut().shutdown().await?;
            return Ok(());
        }
        debug!(code, "closing WebSocket");
        self.write_frame(OP_CLOSE, &code.to_be_bytes()).await?;
        self.stream.get_mut().shutdown().await?;
        Ok(())
    }

    async fn write_frame(&mut self, opcode: u8, payload: &[u8]) -> Result<()> {
        let mut mask = [0u8; 4];
        mask.copy_from_slice(&Uuid::new_v4().as_bytes()[..4]);
        let bytes = encode_frame(opcode, payload, Some(mask));
        self.mid_frame = true;
        let stream = self.stream.get_mut();
        stream.write_all(&bytes).await?;
        stream.flush().await?;
        self.mid_frame = false;
        Ok(())
    }
}

fn finish_message(opcode: u8, payload: Vec<u8>) -> Result<Message> {
    if opcode == OP_TEXT {
        String::from_utf8(payload)
            .map(Message::Text)
            .map_err(|_| BridgeError::WebSocket("text frame is not valid UTF-8".into()))
    } else {
        Ok(Message::Binary(payload))
    }
}

/// Read the status line and headers (lower-cased names) of an HTTP response.
async fn read_response_head<R: AsyncRead + Unpin>(
    reader: &mut BufReader<R>,
) -> Result<(String, Vec<(String, String)>)> {
    let mut consumed = 0usize;
    let mut status_line = String::new();
    consumed += reader.read_line(&mut status_line).await?;
    if consumed == 0 {
        return Err(BridgeError::Handshake("connection closed during handshake".into()));
    }
    let status_line = status_line.trim_end_matches(['\r', '\n']).to_string();

    let mut headers = Vec::with_capacity(8);
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            return Err(BridgeError::Handshake("connection closed during handshake".into()));
        }
        consumed += n;
        if consumed > MAX_HANDSHAKE_BYTES {
            return Err(BridgeError::Handshake("handshake response too large".into()));
        }
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            break;
        }
        if let Some((name, value)) = trimmed.split_once(':') {
            headers.push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
        }
    }
    Ok((status_line, headers))
}

fn header_value<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}
