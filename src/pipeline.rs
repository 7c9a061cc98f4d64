//! The per-pixel paint pipeline: request, sign, submit, optionally confirm.

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{trace, warn};

use crate::artifact::{ArtifactError, ArtifactService};
use crate::ledger::{Ledger, LedgerError, SendOptions};
use crate::signing::Identity;
use crate::transaction::TransactionError;
use crate::types::{ArtifactRequest, CanvasOffset, PixelJob, Receipt};

/// Where a job is in its pipeline. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Requesting,
    Signing,
    Submitting,
    Confirming,
    Done,
    Failed,
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobState::Pending => "pending",
            JobState::Requesting => "requesting",
            JobState::Signing => "signing",
            JobState::Submitting => "submitting",
            JobState::Confirming => "confirming",
            JobState::Done => "done",
            JobState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Terminal failure of a single job. Never retried by the pool.
#[derive(Error, Debug)]
pub enum PaintError {
    #[error("already painted")]
    AlreadyPainted,
    #[error("invalid txn data")]
    InvalidArtifact,
    #[error("get txn failed: {0}")]
    Request(ArtifactError),
    #[error("sign txn failed: {0}")]
    Signing(#[from] TransactionError),
    #[error("send txn failed: {0}")]
    Submission(#[from] LedgerError),
    #[error("check success failed: {0}")]
    Confirmation(ArtifactError),
}

impl PaintError {
    fn from_request(err: ArtifactError) -> Self {
        match err {
            ArtifactError::AlreadyPainted => PaintError::AlreadyPainted,
            ArtifactError::InvalidArtifact => PaintError::InvalidArtifact,
            other => PaintError::Request(other),
        }
    }

    /// The state the job was in when it failed.
    pub fn stage(&self) -> JobState {
        match self {
            PaintError::AlreadyPainted | PaintError::InvalidArtifact | PaintError::Request(_) => {
                JobState::Requesting
            }
            PaintError::Signing(_) => JobState::Signing,
            PaintError::Submission(_) => JobState::Submitting,
            PaintError::Confirmation(_) => JobState::Confirming,
        }
    }
}

const SEND_OPTIONS: SendOptions = SendOptions { skip_preflight: true, max_retries: 3 };

pub struct Painter<A, L> {
    identity: Arc<Identity>,
    pubkey: String,
    artifacts: A,
    ledger: L,
    offset: CanvasOffset,
    confirm: bool,
    confirmation_uris: Mutex<Vec<String>>,
}

impl<A: ArtifactService, L: Ledger> Painter<A, L> {
    pub fn new(identity: Arc<Identity>, artifacts: A, ledger: L, offset: CanvasOffset) -> Self {
        let pubkey = identity.pubkey_base58();
        Self {
            identity,
            pubkey,
            artifacts,
            ledger,
            offset,
            confirm: false,
            confirmation_uris: Mutex::new(Vec::new()),
        }
    }

    /// Run the acceptance check after submission. Off by default.
    pub fn with_confirmation(mut self, confirm: bool) -> Self {
        self.confirm = confirm;
        self
    }

    pub fn offset(&self) -> CanvasOffset { self.offset }

    pub fn artifacts(&self) -> &A { &self.artifacts }

    pub fn ledger(&self) -> &L { &self.ledger }

    pub async fn paint(&self, job: &PixelJob) -> Result<Receipt, PaintError> {
        let (x, y) = self.offset.apply(job);
        let req = ArtifactRequest { x, y, color: job.color, pubkey: self.pubkey.clone() };
        trace!(x, y, state = %JobState::Requesting, "job state");
        let artifact = self
            .artifacts
            .request_artifact(&req)
            .await
            .map_err(PaintError::from_request)?;

        trace!(x, y, state = %JobState::Signing, "job state");
        let tx = self.identity.sign_artifact(&artifact)?;

        trace!(x, y, state = %JobState::Submitting, "job state");
        let receipt = self.ledger.send_transaction(&tx, &SEND_OPTIONS).await?;

        let uri = match self.artifacts.confirmation_uri(&req, &receipt) {
            Ok(uri) => uri,
            Err(e) if self.confirm => return Err(PaintError::Confirmation(e)),
            Err(e) => {
                warn!(x, y, error = %e, "could not build confirmation uri");
                return Ok(receipt);
            }
        };
        if let Ok(mut uris) = self.confirmation_uris.lock() {
            uris.push(uri.clone());
        }

        if self.confirm {
            trace!(x, y, state = %JobState::Confirming, "job state");
            self.artifacts.confirm(&uri).await.map_err(PaintError::Confirmation)?;
        }

        trace!(x, y, state = %JobState::Done, receipt = %receipt, "job state");
        Ok(receipt)
    }

    /// Every confirmation URI built so far, whether or not it was called.
    pub fn confirmation_uris(&self) -> Vec<String> {
        self.confirmation_uris.lock().map(|u| u.clone()).unwrap_or_default()
    }
}
