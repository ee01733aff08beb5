//! Shared utilities for integration tests: in-process HTTP peers acting as a
//! JSON-RPC node and as a remote signer.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Requests a mock peer has received, in arrival order.
pub type Recorded = Arc<Mutex<Vec<Value>>>;

/// Start a programmable HTTP server on an ephemeral port.
///
/// `f` receives the request body and returns `(status, body)`.
pub async fn start_programmable_server<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request_body(&mut socket).await else {
                            return;
                        };
                        let (status, body) = f(request).await;
                        let status_text = match status {
                            200 => "200 OK",
                            400 => "400 Bad Request",
                            403 => "403 Forbidden",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

async fn read_request_body(socket: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
    let content_length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let body_start = header_end + 4;
    while buf.len() < body_start + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    Some(String::from_utf8_lossy(&buf[body_start..body_start + content_length]).into_owned())
}

/// Start a JSON-RPC node. `handler` maps `(method, params)` to a result or a
/// `(code, message)` error object.
pub async fn start_mock_node<H>(handler: H) -> (SocketAddr, Recorded)
where
    H: Fn(&str, &Value) -> Result<Value, (i64, String)> + Send + Sync + 'static,
{
    let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
    let seen = recorded.clone();
    let handler = Arc::new(handler);

    let addr = start_programmable_server(move |body| {
        let seen = seen.clone();
        let handler = handler.clone();
        async move {
            let request: Value = match serde_json::from_str(&body) {
                Ok(v) => v,
                Err(_) => return (400, "bad request".to_string()),
            };
            seen.lock().unwrap().push(request.clone());

            let method = request["method"].as_str().unwrap_or_default().to_string();
            let reply = match handler(&method, &request["params"]) {
                Ok(result) => json!({ "jsonrpc": "2.0", "id": request["id"], "result": result }),
                Err((code, message)) => json!({
                    "jsonrpc": "2.0",
                    "id": request["id"],
                    "error": { "code": code, "message": message }
                }),
            };
            (200, reply.to_string())
        }
    })
    .await;

    (addr, recorded)
}

/// Answers for a healthy Sepolia node: nonce 5, gas 21000, price 1 gwei.
pub fn sepolia_node(method: &str, submit: &Result<Value, (i64, String)>) -> Result<Value, (i64, String)> {
    match method {
        "eth_chainId" => Ok(json!("0xaa36a7")),
        "eth_estimateGas" => Ok(json!("0x5208")),
        "eth_gasPrice" => Ok(json!("0x3b9aca00")),
        "eth_getTransactionCount" => Ok(json!("0x5")),
        "eth_getBalance" => Ok(json!("0xde0b6b3a7640000")),
        "eth_blockNumber" => Ok(json!("0x64")),
        "eth_sendRawTransaction" => submit.clone(),
        other => Err((-32601, format!("the method {} does not exist", other))),
    }
}

/// Start a signer that answers every request with `(status, body)`.
pub async fn start_mock_signer(status: u16, body: &'static str) -> (SocketAddr, Recorded) {
    let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
    let seen = recorded.clone();

    let addr = start_programmable_server(move |request| {
        let seen = seen.clone();
        async move {
            if let Ok(v) = serde_json::from_str::<Value>(&request) {
                seen.lock().unwrap().push(v);
            }
            (status, body.to_string())
        }
    })
    .await;

    (addr, recorded)
}

/// Start a peer that accepts connections and never answers.
pub async fn start_silent_server() -> SocketAddr {
    start_programmable_server(|_| async {
        tokio::time::sleep(Duration::from_secs(60)).await;
        (200, String::new())
    })
    .await
}

/// Hash the mock node returns for accepted submissions.
pub fn deadbeef_hash() -> String {
    format!("0xdeadbeef{}", "00".repeat(28))
}
