use ed25519_dalek::SigningKey;
use thiserror::Error;

use crate::transaction::{PUBKEY_LEN, Transaction, TransactionError};
use crate::types::UnsignedArtifact;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("keypair is not valid base58: {0}")]
    Base58(#[from] bs58::decode::Error),
    #[error("keypair must be 64 bytes, got {0}")]
    Length(usize),
    #[error("public half does not match secret key")]
    Mismatch(#[from] ed25519_dalek::SignatureError),
}

/// The wallet every paint is signed with. Read-only after load.
pub struct Identity { sk: SigningKey, pubkey: [u8; PUBKEY_LEN] }

impl Identity {
    /// Base58 of the 64-byte keypair (secret then public), as exported by wallets.
    pub fn from_base58(keypair: &str) -> Result<Self, IdentityError> {
        let bytes = bs58::decode(keypair.trim()).into_vec()?;
        let bytes: [u8; 64] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| IdentityError::Length(bytes.len()))?;
        let sk = SigningKey::from_keypair_bytes(&bytes)?;
        Ok(Self::from_signing_key(sk))
    }

    pub fn from_signing_key(sk: SigningKey) -> Self {
        let pubkey = sk.verifying_key().to_bytes();
        Self { sk, pubkey }
    }

    pub fn public_key(&self) -> &[u8; PUBKEY_LEN] { &self.pubkey }

    pub fn pubkey_base58(&self) -> String { bs58::encode(self.pubkey).into_string() }

    /// The only key ever handed to the signer: ours, when asked for our pubkey.
    pub fn signer_for(&self, key: &[u8; PUBKEY_LEN]) -> Option<&SigningKey> {
        (*key == self.pubkey).then_some(&self.sk)
    }

    /// Decode, sign our slot, then put our signature first and drop empty slots.
    pub fn sign_artifact(&self, artifact: &UnsignedArtifact) -> Result<Transaction, TransactionError> {
        let mut tx = Transaction::from_base64(artifact.as_str())?;
        let produced = tx.partial_sign(|key| self.signer_for(key))?;
        if produced.is_empty() {
            tracing::warn!(pubkey = %self.pubkey_base58(), "artifact does not request our signature");
        }
        tx.normalize_signatures(produced.first());
        Ok(tx)
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity").field("pubkey", &self.pubkey_base58()).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::EMPTY_SIGNATURE;
    use crate::transaction::tests::legacy_message;

    fn keypair_base58(sk: &SigningKey) -> String {
        bs58::encode(sk.to_keypair_bytes()).into_string()
    }

    #[test]
    fn loads_wallet_keypair() {
        let sk = SigningKey::from_bytes(&[11u8; 32]);
        let id = Identity::from_base58(&keypair_base58(&sk)).unwrap();
        assert_eq!(id.public_key(), &sk.verifying_key().to_bytes());
        assert_eq!(bs58::decode(id.pubkey_base58()).into_vec().unwrap(), sk.verifying_key().to_bytes());
    }

    #[test]
    fn rejects_bad_keypairs() {
        assert!(matches!(Identity::from_base58("0OIl"), Err(IdentityError::Base58(_))));
        let short = bs58::encode([1u8; 32]).into_string();
        assert!(matches!(Identity::from_base58(&short), Err(IdentityError::Length(32))));

        let mut bytes = SigningKey::from_bytes(&[11u8; 32]).to_keypair_bytes();
        bytes[40] ^= 0xff;
        let mismatched = bs58::encode(bytes).into_string();
        assert!(matches!(Identity::from_base58(&mismatched), Err(IdentityError::Mismatch(_))));
    }

    #[test]
    fn signer_lookup_only_matches_own_key() {
        let id = Identity::from_signing_key(SigningKey::from_bytes(&[11u8; 32]));
        assert!(id.signer_for(id.public_key()).is_some());
        assert!(id.signer_for(&[0u8; 32]).is_none());
    }

    #[test]
    fn signed_artifact_has_own_signature_first() {
        let id = Identity::from_signing_key(SigningKey::from_bytes(&[11u8; 32]));
        let message = legacy_message(2, &[[9u8; 32], *id.public_key(), [1u8; 32]]);
        let unsigned = Transaction { signatures: vec![EMPTY_SIGNATURE; 2], message };
        let artifact = UnsignedArtifact::new(unsigned.to_base64()).unwrap();

        let signed = id.sign_artifact(&artifact).unwrap();

        assert_eq!(signed.signatures.len(), 1);
        let sig = ed25519_dalek::Signature::from_bytes(&signed.signatures[0]);
        assert!(id.sk.verifying_key().verify_strict(&signed.message, &sig).is_ok());
    }

    #[test]
    fn undecodable_artifact_is_an_error() {
        let id = Identity::from_signing_key(SigningKey::from_bytes(&[11u8; 32]));
        let artifact = UnsignedArtifact::new("AA==").unwrap();
        assert_eq!(id.sign_artifact(&artifact), Err(TransactionError::EmptyMessage));
    }
}
