use aes_gcm::{aead::Aead, Aes256Gcm, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;
use zeroize::Zeroizing;

pub const KEY_LENGTH: usize = 32;
const NONCE_LENGTH: usize = 12;

/// Errors produced by the common-crypto helpers.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },
    #[error("ciphertext missing nonce")]
    MissingNonce,
    #[error("encryption failure")]
    EncryptFailure,
    #[error("decryption failure")]
    DecryptFailure,
    #[error("decrypted value is not valid UTF-8")]
    InvalidUtf8,
    #[error("base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),
}

/// Key used to encrypt donor PII (ID and tax numbers) before it leaves the process.
/// Supplied externally; never compiled in.
#[derive(Clone)]
pub struct FieldKey(Zeroizing<[u8; KEY_LENGTH]>);

impl FieldKey {
    /// Construct a field key from a base64-encoded string.
    pub fn from_base64(value: &str) -> Result<Self, CryptoError> {
        let decoded = Zeroizing::new(BASE64_STANDARD.decode(value.trim())?);
        Self::from_bytes(decoded.as_slice())
    }

    /// Construct a field key from raw bytes.
    pub fn from_bytes<B>(bytes: B) -> Result<Self, CryptoError>
    where
        B: AsRef<[u8]>,
    {
        let slice = bytes.as_ref();
        if slice.len() != KEY_LENGTH {
            return Err(CryptoError::InvalidKeyLength {
                expected: KEY_LENGTH,
                actual: slice.len(),
            });
        }
        let mut array = [0u8; KEY_LENGTH];
        array.copy_from_slice(slice);
        Ok(Self(Zeroizing::new(array)))
    }

    /// Generate a fresh random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LENGTH];
        OsRng.fill_bytes(&mut bytes);
        Self(Zeroizing::new(bytes))
    }
}

impl std::fmt::Debug for FieldKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldKey")
            .field("bytes", &"***redacted***")
            .finish()
    }
}

/// Encrypt a text field with AES-256-GCM under a fresh random nonce and
/// return base64(nonce || ciphertext).
pub fn encrypt_to_base64(key: &FieldKey, plaintext: &str) -> Result<String, CryptoError> {
    let blob = encrypt_with_key(&key.0, plaintext.as_bytes())?;
    Ok(BASE64_STANDARD.encode(blob))
}

/// Inverse of [`encrypt_to_base64`].
pub fn decrypt_from_base64(key: &FieldKey, encoded: &str) -> Result<String, CryptoError> {
    let blob = BASE64_STANDARD.decode(encoded.trim())?;
    let plaintext = decrypt_with_key(&key.0, &blob)?;
    String::from_utf8(plaintext).map_err(|_| CryptoError::InvalidUtf8)
}

fn encrypt_with_key(key: &[u8; KEY_LENGTH], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength {
        expected: KEY_LENGTH,
        actual: key.len(),
    })?;
    let mut nonce_bytes = [0u8; NONCE_LENGTH];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);
    let mut ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| CryptoError::EncryptFailure)?;
    let mut output = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
    output.extend_from_slice(&nonce_bytes);
    output.append(&mut ciphertext);
    Ok(output)
}

fn decrypt_with_key(key: &[u8; KEY_LENGTH], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.len() <= NONCE_LENGTH {
        return Err(CryptoError::MissingNonce);
    }
    let (nonce_bytes, encrypted) = ciphertext.split_at(NONCE_LENGTH);
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength {
        expected: KEY_LENGTH,
        actual: key.len(),
    })?;
    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), encrypted)
        .map_err(|_| CryptoError::DecryptFailure)
}
