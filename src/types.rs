use serde::{Deserialize, Deserializer, Serialize};

use crate::color::Rgb;

/// One pixel to paint, in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelJob { pub x: u32, pub y: u32, pub color: Rgb }

/// Pool-wide offset from image coordinates to canvas coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CanvasOffset { pub x: i64, pub y: i64 }

impl CanvasOffset {
    pub fn new(x: i64, y: i64) -> Self { Self { x, y } }

    pub fn apply(&self, job: &PixelJob) -> (i64, i64) {
        (self.x + i64::from(job.x), self.y + i64::from(job.y))
    }
}

/// Parameters of a mint request, already in canvas coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRequest {
    pub x: i64,
    pub y: i64,
    pub color: Rgb,
    pub pubkey: String, // base58
}

/// Body of a successful mint response. Missing or null fields are empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtifactResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub transaction: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub message: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Base64 encoded unsigned transaction. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedArtifact(String);

impl UnsignedArtifact {
    /// Returns `None` for an empty payload.
    pub fn new(encoded: impl Into<String>) -> Option<Self> {
        let encoded = encoded.into();
        if encoded.is_empty() { None } else { Some(Self(encoded)) }
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

/// Submission signature handed back by the ledger (base58).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Receipt(pub String);

impl std::fmt::Display for Receipt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
