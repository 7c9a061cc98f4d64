//! Ledger submission over Solana JSON-RPC `sendTransaction`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::transaction::Transaction;
use crate::types::Receipt;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("rpc endpoint returned status {0}")]
    Status(u16),
    #[error("malformed rpc response: {0}")]
    Malformed(String),
    #[error("rpc request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Submission options forwarded to the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOptions {
    pub skip_preflight: bool,
    /// Rebroadcast budget the node applies on its own.
    pub max_retries: u32,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self { skip_preflight: true, max_retries: 3 }
    }
}

#[async_trait]
pub trait Ledger: Send + Sync {
    async fn send_transaction(&self, tx: &Transaction, opts: &SendOptions) -> Result<Receipt, LedgerError>;
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

pub struct RpcLedger {
    client: reqwest::Client,
    url: String,
}

impl RpcLedger {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self { client, url: url.into() }
    }

    fn request_body(tx: &Transaction, opts: &SendOptions) -> serde_json::Value {
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "sendTransaction",
            "params": [
                tx.to_base64(),
                {
                    "encoding": "base64",
                    "skipPreflight": opts.skip_preflight,
                    "maxRetries": opts.max_retries,
                }
            ]
        })
    }
}

#[async_trait]
impl Ledger for RpcLedger {
    async fn send_transaction(&self, tx: &Transaction, opts: &SendOptions) -> Result<Receipt, LedgerError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&Self::request_body(tx, opts))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(LedgerError::Status(resp.status().as_u16()));
        }

        let body: RpcResponse = resp
            .json()
            .await
            .map_err(|e| LedgerError::Malformed(e.to_string()))?;
        match body {
            RpcResponse { error: Some(err), .. } => {
                warn!(code = err.code, message = %err.message, "Txn error");
                Err(LedgerError::Rpc { code: err.code, message: err.message })
            }
            RpcResponse { result: Some(sig), .. } => {
                debug!(signature = %sig, "transaction accepted");
                Ok(Receipt(sig))
            }
            _ => Err(LedgerError::Malformed("neither result nor error present".into())),
        }
    }
}
