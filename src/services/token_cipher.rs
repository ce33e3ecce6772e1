use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use sha2::{Digest, Sha256};
use thiserror::Error;

const NONCE_LEN: usize = 12;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("secret must not be empty")]
    EmptySecret,
    #[error("encryption failed")]
    Encrypt,
    #[error("invalid encoding")]
    Encoding,
    #[error("ciphertext too short")]
    TooShort,
    #[error("decryption failed")]
    Decrypt,
}

/// AES-256-GCM over base64 text, keyed by the SHA-256 of a secret string.
///
/// Output layout is `base64(nonce || ciphertext || tag)`; any change to it
/// fails authentication on decrypt.
#[derive(Clone)]
pub struct TokenCipher {
    key: [u8; 32],
}

impl std::fmt::Debug for TokenCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCipher")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl TokenCipher {
    pub fn from_secret(secret: &str) -> Result<Self, CipherError> {
        if secret.is_empty() {
            return Err(CipherError::EmptySecret);
        }
        Ok(Self {
            key: Sha256::digest(secret.as_bytes()).into(),
        })
    }

    /// Random 32-byte secret, base64 encoded.
    pub fn generate_secret() -> String {
        Self::generate_secret_of_len(32)
    }

    pub fn generate_secret_of_len(len: usize) -> String {
        use rand::RngCore;
        let mut bytes = vec![0u8; len];
        OsRng.fill_bytes(&mut bytes);
        BASE64.encode(bytes)
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key))
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String, CipherError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher()
            .encrypt(&nonce, plaintext)
            .map_err(|_| CipherError::Encrypt)?;

        let mut combined = nonce.to_vec();
        combined.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(&combined))
    }

    pub fn decrypt(&self, encrypted: &str) -> Result<Vec<u8>, CipherError> {
        let combined = BASE64
            .decode(encrypted)
            .map_err(|_| CipherError::Encoding)?;

        if combined.len() <= NONCE_LEN {
            return Err(CipherError::TooShort);
        }

        let (nonce, ciphertext) = combined.split_at(NONCE_LEN);
        self.cipher()
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CipherError::Decrypt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encryption_decryption() {
        let cipher = TokenCipher::from_secret("s3cret").unwrap();
        let encrypted = cipher.encrypt(b"hello pantry").unwrap();
        assert_ne!(encrypted, "hello pantry");
        assert_eq!(cipher.decrypt(&encrypted).unwrap(), b"hello pantry");
    }

    #[test]
    fn test_different_encryptions() {
        let cipher = TokenCipher::from_secret("s3cret").unwrap();
        let encrypted1 = cipher.encrypt(b"same").unwrap();
        let encrypted2 = cipher.encrypt(b"same").unwrap();
        assert_ne!(encrypted1, encrypted2);
        assert_eq!(cipher.decrypt(&encrypted1).unwrap(), b"same");
        assert_eq!(cipher.decrypt(&encrypted2).unwrap(), b"same");
    }

    #[test]
    fn test_invalid_encrypted_data() {
        let cipher = TokenCipher::from_secret("s3cret").unwrap();
        assert_eq!(cipher.decrypt("not-base64!@#"), Err(CipherError::Encoding));
        assert_eq!(cipher.decrypt("dGVzdA=="), Err(CipherError::TooShort));
        assert_eq!(
            cipher.decrypt(&BASE64.encode([0u8; 40])),
            Err(CipherError::Decrypt)
        );
    }

    #[test]
    fn test_wrong_secret_cannot_decrypt() {
        let encrypted = TokenCipher::from_secret("one")
            .unwrap()
            .encrypt(b"payload")
            .unwrap();
        let other = TokenCipher::from_secret("two").unwrap();
        assert_eq!(other.decrypt(&encrypted), Err(CipherError::Decrypt));
    }

    #[test]
    fn test_empty_secret_is_rejected() {
        assert_eq!(
            TokenCipher::from_secret("").unwrap_err(),
            CipherError::EmptySecret
        );
    }

    #[test]
    fn test_generated_secret_length() {
        let secret = TokenCipher::generate_secret();
        assert_eq!(BASE64.decode(secret).unwrap().len(), 32);
        let long = TokenCipher::generate_secret_of_len(64);
        assert_eq!(BASE64.decode(long).unwrap().len(), 64);
    }
}
