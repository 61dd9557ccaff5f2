// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-process stand-in for the PrintBridge service.
//
// Speaks just enough HTTP/1.1 (one request per connection, Content-Length
// bodies) and WebSocket to drive the probes, and records what it saw.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use printbridge_core::SmokeConfig;
use printbridge_probe::ws::{self, OP_CLOSE, OP_TEXT};

/// How the `/ws` endpoint behaves.
#[derive(Debug, Clone)]
pub enum WsBehavior {
    /// Answer the first message with this text.
    Reply(String),
    /// Accept the upgrade, read the message, never answer.
    Silent,
    /// Refuse the upgrade with a 404.
    RejectUpgrade,
    /// Send a close frame right after the handshake.
    CloseImmediately,
}

#[derive(Debug, Clone)]
pub struct MockSettings {
    pub root_status: u16,
    pub printers_status: u16,
    pub printers: Value,
    /// Sent verbatim instead of `printers` when set.
    pub printers_raw: Option<String>,
    pub print_status: u16,
    pub print_body: String,
    pub jobs_status: u16,
    pub jobs: Value,
    /// Sent verbatim instead of `jobs` when set.
    pub jobs_raw: Option<String>,
    pub ws: WsBehavior,
}

impl Default for MockSettings {
    fn default() -> Self {
        Self {
            root_status: 200,
            printers_status: 200,
            printers: json!(["Zebra ZD420", "Brother QL-800"]),
            printers_raw: None,
            print_status: 200,
            print_body: json!({
                "printerName": "Zebra ZD420",
                "success": true,
                "errorMessage": null
            })
            .to_string(),
            jobs_status: 200,
            jobs: json!([{
                "timestamp": "2026-10-18T09:00:00",
                "printerName": "Zebra ZD420",
                "success": true,
                "errorMessage": null
            }]),
            jobs_raw: None,
            ws: WsBehavior::Reply("Print job queued".into()),
        }
    }
}

#[derive(Debug, Default)]
struct Recorded {
    hits: HashMap<String, usize>,
    print_bodies: Vec<Value>,
    ws_messages: Vec<String>,
}

/// A running mock service. Dropping it leaves the listener task running
/// until the test runtime shuts down.
pub struct MockBridge {
    addr: SocketAddr,
    recorded: Arc<Mutex<Recorded>>,
}

impl MockBridge {
    pub async fn start(settings: MockSettings) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let settings = Arc::new(settings);

        let shared = recorded.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let settings = settings.clone();
                let recorded = shared.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, &settings, &recorded).await;
                });
            }
        });

        Self { addr, recorded }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Smoke config pointed at this mock.
    pub fn config(&self) -> SmokeConfig {
        SmokeConfig {
            base_url: self.url(),
            ..Default::default()
        }
    }

    pub fn hits(&self, path: &str) -> usize {
        self.recorded.lock().unwrap().hits.get(path).copied().unwrap_or(0)
    }

    pub fn print_bodies(&self) -> Vec<Value> {
        self.recorded.lock().unwrap().print_bodies.clone()
    }

    pub fn ws_messages(&self) -> Vec<String> {
        self.recorded.lock().unwrap().ws_messages.clone()
    }
}

/// A port with nothing listening on it.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

async fn serve(
    stream: TcpStream,
    settings: &MockSettings,
    recorded: &Mutex<Recorded>,
) -> std::io::Result<()> {
    let mut stream = BufReader::new(stream);

    let mut request_line = String::new();
    stream.read_line(&mut request_line).await?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts
        .next()
        .unwrap_or_default()
        .split('?')
        .next()
        .unwrap_or_default()
        .to_string();

    let mut headers = HashMap::new();
    loop {
        let mut line = String::new();
        if stream.read_line(&mut line).await? == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    *recorded.lock().unwrap().hits.entry(path.clone()).or_default() += 1;

    if path == "/ws" {
        return serve_websocket(stream, &headers, settings, recorded).await;
    }

    let length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; length];
    stream.read_exact(&mut body).await?;

    let (status, reply) = match (method.as_str(), path.as_str()) {
        ("GET", "/") => (settings.root_status, "<html>PrintBridge</html>".to_string()),
        ("GET", "/printers") => (
            settings.printers_status,
            body_or(&settings.printers_raw, &settings.printers),
        ),
        ("POST", "/print") => {
            if let Ok(value) = serde_json::from_slice::<Value>(&body) {
                recorded.lock().unwrap().print_bodies.push(value);
            }
            (settings.print_status, settings.print_body.clone())
        }
        ("GET", "/jobs") => (settings.jobs_status, body_or(&settings.jobs_raw, &settings.jobs)),
        _ => (404, String::new()),
    };

    let response = format!(
        "HTTP/1.1 {status} Mock\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n{reply}",
        reply.len()
    );
    stream.get_mut().write_all(response.as_bytes()).await?;
    stream.get_mut().shutdown().await
}

fn body_or(raw: &Option<String>, value: &Value) -> String {
    raw.clone().unwrap_or_else(|| value.to_string())
}

async fn serve_websocket(
    mut stream: BufReader<TcpStream>,
    headers: &HashMap<String, String>,
    settings: &MockSettings,
    recorded: &Mutex<Recorded>,
) -> std::io::Result<()> {
    if matches!(settings.ws, WsBehavior::RejectUpgrade) {
        let response = "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
        stream.get_mut().write_all(response.as_bytes()).await?;
        return stream.get_mut().shutdown().await;
    }

    let key = headers.get("sec-websocket-key").cloned().unwrap_or_default();
    let response = format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {}\r\n\
         \r\n",
        ws::accept_key(&key)
    );
    stream.get_mut().write_all(response.as_bytes()).await?;

    if matches!(settings.ws, WsBehavior::CloseImmediately) {
        let frame = ws::encode_frame(OP_CLOSE, &1000u16.to_be_bytes(), None);
        stream.get_mut().write_all(&frame).await?;
    }

    loop {
        let Ok(frame) = ws::read_frame(&mut stream).await else {
            return Ok(());
        };
        match frame.opcode {
            OP_TEXT => {
                let text = String::from_utf8_lossy(&frame.payload).into_owned();
                recorded.lock().unwrap().ws_messages.push(text);
                if let WsBehavior::Reply(reply) = &settings.ws {
                    let out = ws::encode_frame(OP_TEXT, reply.as_bytes(), None);
                    stream.get_mut().write_all(&out).await?;
                }
            }
            OP_CLOSE => {
                let out = ws::encode_frame(OP_CLOSE, &frame.payload, None);
                let _ = stream.get_mut().write_all(&out).await;
                return Ok(());
            }
            _ => {}
        }
    }
}
