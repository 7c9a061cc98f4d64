//! Shared fakes for the integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use canvas_painter::artifact::{ArtifactError, ArtifactService};
use canvas_painter::ledger::{Ledger, LedgerError, SendOptions};
use canvas_painter::signing::Identity;
use canvas_painter::transaction::{encode_short_u16, Transaction, EMPTY_SIGNATURE};
use canvas_painter::types::{ArtifactRequest, Receipt, UnsignedArtifact};
use ed25519_dalek::SigningKey;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

// =============================================================================
// Identity and artifacts
// =============================================================================

pub fn test_identity() -> Identity {
    Identity::from_signing_key(SigningKey::from_bytes(&[7u8; 32]))
}

/// Unsigned legacy transfer-shaped transaction with `payer` as the only signer.
pub fn unsigned_artifact_for(payer: &[u8; 32]) -> UnsignedArtifact {
    let mut message = vec![1, 0, 1];
    encode_short_u16(2, &mut message);
    message.extend_from_slice(payer);
    message.extend_from_slice(&[2u8; 32]);
    message.extend_from_slice(&[9u8; 32]); // recent blockhash
    encode_short_u16(0, &mut message);

    let tx = Transaction { signatures: vec![EMPTY_SIGNATURE], message };
    UnsignedArtifact::new(tx.to_base64()).expect("non-empty artifact")
}

// =============================================================================
// Artifact service fake
// =============================================================================

pub type MintBehaviour = dyn Fn(&ArtifactRequest) -> Result<UnsignedArtifact, ArtifactError> + Send + Sync;

pub struct FakeArtifacts {
    behaviour: Box<MintBehaviour>,
    confirm_status: Option<u16>,
    pub requests: Mutex<Vec<ArtifactRequest>>,
    pub confirmations: Mutex<Vec<String>>,
}

impl FakeArtifacts {
    pub fn new<F>(behaviour: F) -> Self
    where
        F: Fn(&ArtifactRequest) -> Result<UnsignedArtifact, ArtifactError> + Send + Sync + 'static,
    {
        Self {
            behaviour: Box::new(behaviour),
            confirm_status: None,
            requests: Mutex::new(Vec::new()),
            confirmations: Mutex::new(Vec::new()),
        }
    }

    /// Every request gets a valid artifact for `payer`.
    pub fn minting_for(payer: [u8; 32]) -> Self {
        Self::new(move |_| Ok(unsigned_artifact_for(&payer)))
    }

    pub fn rejecting_with(status: u16) -> Self {
        Self::new(move |_| {
            if status == 400 { Err(ArtifactError::AlreadyPainted) } else { Err(ArtifactError::Status(status)) }
        })
    }

    /// Confirmation answers with this status instead of 200.
    pub fn with_confirm_status(mut self, status: u16) -> Self {
        self.confirm_status = Some(status);
        self
    }

    pub fn request_count(&self) -> usize { self.requests.lock().unwrap().len() }
}

#[async_trait]
impl ArtifactService for FakeArtifacts {
    async fn request_artifact(&self, req: &ArtifactRequest) -> Result<UnsignedArtifact, ArtifactError> {
        self.requests.lock().unwrap().push(req.clone());
        tokio::task::yield_now().await;
        (self.behaviour)(req)
    }

    fn confirmation_uri(&self, req: &ArtifactRequest, receipt: &Receipt) -> Result<String, ArtifactError> {
        Ok(format!("fake://success?x={}&y={}&color={}&transaction={}", req.x, req.y, req.color.to_hex(), receipt))
    }

    async fn confirm(&self, uri: &str) -> Result<(), ArtifactError> {
        self.confirmations.lock().unwrap().push(uri.to_string());
        match self.confirm_status {
            None | Some(200) => Ok(()),
            Some(status) => Err(ArtifactError::Status(status)),
        }
    }
}

// =============================================================================
// Ledger fake
// =============================================================================

#[derive(Default)]
pub struct FakeLedger {
    fail: bool,
    counter: AtomicUsize,
    pub submitted: Mutex<Vec<(Transaction, SendOptions)>>,
}

impl FakeLedger {
    pub fn accepting() -> Self { Self::default() }

    pub fn failing() -> Self { Self { fail: true, ..Self::default() } }

    pub fn submission_count(&self) -> usize { self.submitted.lock().unwrap().len() }
}

#[async_trait]
impl Ledger for FakeLedger {
    async fn send_transaction(&self, tx: &Transaction, opts: &SendOptions) -> Result<Receipt, LedgerError> {
        self.submitted.lock().unwrap().push((tx.clone(), *opts));
        tokio::task::yield_now().await;
        if self.fail {
            return Err(LedgerError::Rpc { code: -32002, message: "blockhash not found".into() });
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(Receipt(format!("sig{n}")))
    }
}

// =============================================================================
// Loopback HTTP stub
// =============================================================================

/// Direct loopback client; ignores any proxy in the environment.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Answers every connection with one canned response and records what it got.
pub struct StubServer {
    pub base_url: String,
    pub requests: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    pub async fn start(status: u16, body: &str) -> StubServer {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let body = body.to_string();

        let recorded = Arc::clone(&requests);
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else { return };
                let recorded = Arc::clone(&recorded);
                let body = body.clone();
                tokio::spawn(async move {
                    let request = read_request(&mut socket).await;
                    recorded.lock().unwrap().push(request);
                    let response = format!(
                        "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        StubServer { base_url: format!("http://{addr}"), requests }
    }

    pub fn recorded(&self) -> Vec<String> { self.requests.lock().unwrap().clone() }
}

/// Head plus body, as text.
async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        data.extend_from_slice(&buf[..n]);
        let text = String::from_utf8_lossy(&data);
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text[..end]
                .lines()
                .find_map(|l| {
                    let (name, value) = l.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length").then(|| value.trim().parse::<usize>().ok())?
                })
                .unwrap_or(0);
            if data.len() >= end + 4 + length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&data).into_owned()
}
