//! Loopback HTTP/1.1 responder for driving the reqwest paths in unit tests.
//! One request per connection; every reply closes the socket.

use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Debug, Clone)]
pub(crate) struct Seen {
    pub method: String,
    pub target: String,
    pub head: String,
    pub body: String,
}

impl Seen {
    pub fn path(&self) -> &str {
        self.target.split('?').next().unwrap_or("")
    }

    pub fn query(&self, key: &str) -> Option<String> {
        let url = url::Url::parse(&format!("http://loopback{}", self.target)).ok()?;
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.head.lines().skip(1).find_map(|line| {
            let (k, v) = line.split_once(':')?;
            k.trim()
                .eq_ignore_ascii_case(name)
                .then(|| v.trim().to_string())
        })
    }
}

pub(crate) struct TestServer {
    pub base: String,
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl TestServer {
    pub async fn start<F>(respond: F) -> Self
    where
        F: Fn(&Seen) -> Vec<u8> + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let respond = Arc::new(respond);
        let log = seen.clone();
        tokio::spawn(async move {
            while let Ok((mut sock, _)) = listener.accept().await {
                let respond = respond.clone();
                let log = log.clone();
                tokio::spawn(async move {
                    let Some(req) = read_request(&mut sock).await else {
                        return;
                    };
                    let reply = respond(&req);
                    log.lock().unwrap().push(req);
                    // the client may hang up early on oversized bodies
                    let _ = sock.write_all(&reply).await;
                    let _ = sock.shutdown().await;
                });
            }
        });
        Self {
            base: format!("http://{}", addr),
            seen,
        }
    }

    pub fn requests(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }
}

async fn read_request(sock: &mut TcpStream) -> Option<Seen> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        let n = sock.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };
    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let mut body = buf[head_end + 4..].to_vec();

    let mut first = head.lines().next()?.split_whitespace();
    let method = first.next()?.to_string();
    let target = first.next()?.to_string();
    let mut seen = Seen {
        method,
        target,
        head,
        body: String::new(),
    };

    let content_length = seen
        .header("content-length")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    while body.len() < content_length {
        let n = sock.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    seen.body = String::from_utf8_lossy(&body).into_owned();
    Some(seen)
}

fn head(status: u16, extra: &str) -> String {
    format!(
        "HTTP/1.1 {} Test\r\nConnection: close\r\n{}\r\n",
        status, extra
    )
}

pub(crate) fn json_reply(status: u16, body: &serde_json::Value) -> Vec<u8> {
    bytes_reply(status, "application/json", body.to_string().as_bytes())
}

pub(crate) fn bytes_reply(status: u16, content_type: &str, body: &[u8]) -> Vec<u8> {
    let mut out = head(
        status,
        &format!(
            "Content-Type: {}\r\nContent-Length: {}\r\n",
            content_type,
            body.len()
        ),
    )
    .into_bytes();
    out.extend_from_slice(body);
    out
}

/// Headers announcing `len` bytes, with no body behind them.
pub(crate) fn declared_length_reply(len: u64) -> Vec<u8> {
    head(
        200,
        &format!("Content-Type: text/plain\r\nContent-Length: {}\r\n", len),
    )
    .into_bytes()
}

/// A chunked body of `total` bytes with no `Content-Length`.
pub(crate) fn chunked_reply(total: usize, chunk: usize) -> Vec<u8> {
    let mut out = head(
        200,
        "Content-Type: text/plain\r\nTransfer-Encoding: chunked\r\n",
    )
    .into_bytes();
    let piece = vec![b'x'; chunk];
    let mut left = total;
    while left > 0 {
        let n = left.min(chunk);
        out.extend_from_slice(format!("{:x}\r\n", n).as_bytes());
        out.extend_from_slice(&piece[..n]);
        out.extend_from_slice(b"\r\n");
        left -= n;
    }
    out.extend_from_slice(b"0\r\n\r\n");
    out
}
