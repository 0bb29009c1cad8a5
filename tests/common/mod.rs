#![allow(dead_code)]

use comment_sieve::store::{DynStore, ModerationStore, sqlite::SqliteStore};
use comment_sieve::validators::ValidationContext;
use comment_sieve::{Comment, RequestContext};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub async fn memory_store() -> DynStore {
    Arc::new(SqliteStore::new("sqlite::memory:").await.unwrap())
}

/// Store with one blacklist holding `phrases`
pub async fn store_with_phrases(phrases: &[&str]) -> DynStore {
    let store = memory_store().await;
    store.add_blacklist("spam", 1.0).await.unwrap();
    for phrase in phrases {
        store.add_phrase("spam", phrase).await.unwrap();
    }
    store
}

pub fn context<'a>(
    comment: &'a Comment,
    request: &'a RequestContext,
    store: &'a DynStore,
) -> ValidationContext<'a> {
    ValidationContext {
        comment,
        request,
        store,
    }
}

/// Minimal HTTP server standing in for an Akismet-protocol service
pub struct FakeAntispam {
    pub addr: SocketAddr,
    pub requests: Arc<Mutex<Vec<String>>>,
    handle: tokio::task::JoinHandle<()>,
}

impl FakeAntispam {
    pub async fn spawn(verify_reply: &'static str, check_reply: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = requests.clone();
        let handle = tokio::spawn(async move {
            loop {
                let Ok((sock, _)) = listener.accept().await else {
                    return;
                };
                let log = log.clone();
                tokio::spawn(async move {
                    let _ = respond(sock, log, verify_reply, check_reply).await;
                });
            }
        });
        Self {
            addr,
            requests,
            handle,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn request_count(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.contains(path))
            .count()
    }

    pub fn last_request(&self) -> String {
        self.requests.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

impl Drop for FakeAntispam {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn respond(
    mut sock: TcpStream,
    log: Arc<Mutex<Vec<String>>>,
    verify_reply: &str,
    check_reply: &str,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        let n = sock.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };
    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = sock.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let request = String::from_utf8_lossy(&buf).to_string();
    let body = if head.contains("/verify-key") {
        verify_reply
    } else {
        check_reply
    };
    log.lock().unwrap().push(request);

    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    sock.write_all(response.as_bytes()).await?;
    sock.shutdown().await
}

/// Accepts connections and never answers
pub struct SilentServer {
    pub addr: SocketAddr,
    handle: tokio::task::JoinHandle<()>,
}

impl SilentServer {
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((sock, _)) = listener.accept().await {
                held.push(sock);
            }
        });
        Self { addr, handle }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for SilentServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
