//! Solana transaction wire format, limited to what signing needs.
//!
//! A serialized transaction is a shortvec of 64-byte signatures followed by the
//! message. The message bytes are kept verbatim; only the header and the static
//! account keys are parsed, to find which signer slot belongs to which key.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ed25519_dalek::{Signer, SigningKey};
use thiserror::Error;

pub const SIGNATURE_LEN: usize = 64;
pub const PUBKEY_LEN: usize = 32;

/// An unset signer slot.
pub const EMPTY_SIGNATURE: [u8; SIGNATURE_LEN] = [0u8; SIGNATURE_LEN];

const VERSION_PREFIX: u8 = 0x80;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TransactionError {
    #[error("base64 decode failed: {0}")]
    Base64(String),
    #[error("transaction truncated while reading {0}")]
    Truncated(&'static str),
    #[error("compact-u16 length prefix overflows")]
    LengthOverflow,
    #[error("empty message")]
    EmptyMessage,
    #[error("unsupported message version {0}")]
    UnsupportedVersion(u8),
    #[error("message requires {required} signers but lists {keys} account keys")]
    TooManySigners { required: usize, keys: usize },
}

/// Decode a compact-u16 ("shortvec") length. Returns the value and bytes consumed.
pub fn decode_short_u16(bytes: &[u8]) -> Result<(u16, usize), TransactionError> {
    let mut value: u32 = 0;
    for i in 0..3 {
        let byte = *bytes.get(i).ok_or(TransactionError::Truncated("length prefix"))?;
        value |= u32::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return u16::try_from(value)
                .map(|v| (v, i + 1))
                .map_err(|_| TransactionError::LengthOverflow);
        }
    }
    Err(TransactionError::LengthOverflow)
}

pub fn encode_short_u16(mut value: u16, out: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// The part of a message header that decides signer placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageKeys {
    pub num_required_signatures: usize,
    pub account_keys: Vec<[u8; PUBKEY_LEN]>,
}

impl MessageKeys {
    /// Parses legacy and v0 messages.
    pub fn parse(message: &[u8]) -> Result<Self, TransactionError> {
        let first = *message.first().ok_or(TransactionError::EmptyMessage)?;
        let mut pos = 0;
        if first & VERSION_PREFIX != 0 {
            let version = first & !VERSION_PREFIX;
            if version != 0 {
                return Err(TransactionError::UnsupportedVersion(version));
            }
            pos = 1;
        }

        // header: required signatures, readonly signed, readonly unsigned
        let header = message
            .get(pos..pos + 3)
            .ok_or(TransactionError::Truncated("message header"))?;
        let num_required_signatures = usize::from(header[0]);
        pos += 3;

        let (count, used) = decode_short_u16(&message[pos..])?;
        pos += used;
        let count = usize::from(count);
        let keys = message
            .get(pos..pos + count * PUBKEY_LEN)
            .ok_or(TransactionError::Truncated("account keys"))?;
        let account_keys = keys
            .chunks_exact(PUBKEY_LEN)
            .map(|k| {
                let mut key = [0u8; PUBKEY_LEN];
                key.copy_from_slice(k);
                key
            })
            .collect::<Vec<_>>();

        if num_required_signatures > account_keys.len() {
            return Err(TransactionError::TooManySigners {
                required: num_required_signatures,
                keys: account_keys.len(),
            });
        }
        Ok(Self { num_required_signatures, account_keys })
    }

    pub fn signers(&self) -> &[[u8; PUBKEY_LEN]] {
        &self.account_keys[..self.num_required_signatures]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub signatures: Vec<[u8; SIGNATURE_LEN]>,
    pub message: Vec<u8>,
}

impl Transaction {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let (count, mut pos) = decode_short_u16(bytes)?;
        let mut signatures = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            let raw = bytes
                .get(pos..pos + SIGNATURE_LEN)
                .ok_or(TransactionError::Truncated("signatures"))?;
            let mut sig = [0u8; SIGNATURE_LEN];
            sig.copy_from_slice(raw);
            signatures.push(sig);
            pos += SIGNATURE_LEN;
        }
        let message = bytes[pos..].to_vec();
        if message.is_empty() {
            return Err(TransactionError::EmptyMessage);
        }
        Ok(Self { signatures, message })
    }

    pub fn from_base64(encoded: &str) -> Result<Self, TransactionError> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| TransactionError::Base64(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(3 + self.signatures.len() * SIGNATURE_LEN + self.message.len());
        // from_bytes caps the count at u16::MAX
        encode_short_u16(self.signatures.len() as u16, &mut out);
        for sig in &self.signatures {
            out.extend_from_slice(sig);
        }
        out.extend_from_slice(&self.message);
        out
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    /// Sign every required slot whose key `lookup` can sign for. Slots without a
    /// matching key keep whatever they held. Returns the signatures produced.
    pub fn partial_sign<'k, F>(&mut self, lookup: F) -> Result<Vec<[u8; SIGNATURE_LEN]>, TransactionError>
    where
        F: Fn(&[u8; PUBKEY_LEN]) -> Option<&'k SigningKey>,
    {
        let keys = MessageKeys::parse(&self.message)?;
        if self.signatures.len() < keys.num_required_signatures {
            self.signatures.resize(keys.num_required_signatures, EMPTY_SIGNATURE);
        }

        let mut produced = Vec::new();
        for (index, key) in keys.signers().iter().enumerate() {
            if let Some(signing_key) = lookup(key) {
                let sig = signing_key.sign(&self.message).to_bytes();
                self.signatures[index] = sig;
                produced.push(sig);
            }
        }
        Ok(produced)
    }

    /// Move `own` to the front and drop every empty slot. Other signatures keep
    /// their relative order.
    pub fn normalize_signatures(&mut self, own: Option<&[u8; SIGNATURE_LEN]>) {
        let own = own.filter(|s| **s != EMPTY_SIGNATURE && self.signatures.contains(*s));
        let mut normalized = Vec::with_capacity(self.signatures.len());
        if let Some(own) = own {
            normalized.push(*own);
        }
        normalized.extend(
            self.signatures
                .iter()
                .filter(|s| **s != EMPTY_SIGNATURE && Some(*s) != own)
                .copied(),
        );
        self.signatures = normalized;
    }
}
