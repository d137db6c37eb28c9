use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Length of an ed25519 seed in bytes.
pub const SEED_LEN: usize = 32;

/// Length of an ed25519 public key in bytes.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Length of a role signature: a 64 byte ed25519 signature followed by one
/// recovery byte.
pub const SIGNATURE_LEN: usize = 65;

/// The trailing byte appended to every role signature. ed25519 has no key
/// recovery, so the byte is a constant; verifiers only check the first 64
/// bytes.
pub const RECOVERY_BYTE: u8 = 0;

/// Fixed seed for Alice's role key.
pub const ALICE_ROLE_SEED: [u8; SEED_LEN] = [0x01; SEED_LEN];

/// Fixed seed for Bob's role key.
pub const BOB_ROLE_SEED: [u8; SEED_LEN] = [0x02; SEED_LEN];

/// Fixed seed the demo derives the simulated keygen output from.
pub const DKG_OUTPUT_SEED: [u8; SEED_LEN] = [0x2a; SEED_LEN];

#[derive(Debug, Error)]
pub enum KeyError {
    /// Raised when a seed decodes to the wrong number of bytes.
    #[error("seed must be {SEED_LEN} bytes, got {0}")]
    BadSeedLength(usize),

    /// Raised when a signature has the wrong length before any
    /// cryptographic check runs.
    #[error("signature must be {SIGNATURE_LEN} bytes, got {0}")]
    BadSignatureLength(usize),

    /// Raised when hex decoding of a seed fails.
    #[error("{0}")]
    Hex(#[from] hex::FromHexError),

    /// Raised when a key fails to parse or a signature fails to verify.
    #[error("{0}")]
    Crypto(#[from] ed25519_dalek::SignatureError),
}

/// An ed25519 key pair derived from a 32 byte seed. Used both for the role
/// keys attached to a profile and for the simulated keygen output.
#[derive(Clone)]
pub struct SigningPair {
    inner: SigningKey,
}

impl SigningPair {
    pub fn from_seed(seed: [u8; SEED_LEN]) -> Self {
        Self {
            inner: SigningKey::from_bytes(&seed),
        }
    }

    /// Parses a hex encoded seed, with or without a `0x` prefix.
    pub fn from_seed_hex(seed: &str) -> Result<Self, KeyError> {
        let raw = hex::decode(seed.trim_start_matches("0x"))?;
        let seed: [u8; SEED_LEN] = raw
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::BadSeedLength(raw.len()))?;
        Ok(Self::from_seed(seed))
    }

    pub fn public(&self) -> [u8; PUBLIC_KEY_LEN] {
        self.inner.verifying_key().to_bytes()
    }

    pub fn public_hex(&self) -> String {
        hex::encode(self.public())
    }

    /// Signs `message` and appends the fixed recovery byte.
    pub fn sign_with_recovery(&self, message: &[u8]) -> [u8; SIGNATURE_LEN] {
        let mut out = [0u8; SIGNATURE_LEN];
        out[..SIGNATURE_LEN - 1].copy_from_slice(&self.inner.sign(message).to_bytes());
        out[SIGNATURE_LEN - 1] = RECOVERY_BYTE;
        out
    }
}

/// The digest role keys sign to authenticate a keygen output.
pub fn key_digest(public_key: &[u8]) -> [u8; 32] {
    Sha256::digest(public_key).into()
}

/// Checks a 65 byte role signature against `message`. The recovery byte is
/// not part of the verification.
pub fn verify_with_recovery(
    public: &[u8; PUBLIC_KEY_LEN],
    message: &[u8],
    signature: &[u8],
) -> Result<(), KeyError> {
    if signature.len() != SIGNATURE_LEN {
        return Err(KeyError::BadSignatureLength(signature.len()));
    }
    let key = VerifyingKey::from_bytes(public)?;
    let signature = Signature::from_slice(&signature[..SIGNATURE_LEN - 1])?;
    key.verify(message, &signature)?;
    Ok(())
}
