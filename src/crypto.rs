use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use zeroize::{Zeroize, Zeroizing};

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;
const HEADER_LEN: usize = SALT_LEN + NONCE_LEN;
/// Prefixed to the plaintext; finding it after decryption confirms the passphrase.
const MAGIC: &[u8] = b"CYCLECALC_HISTORY_V1";

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("key derivation failed")]
    KeyDerivation,
    #[error("sealing failed")]
    Seal,
    #[error("wrong passphrase or corrupted vault")]
    WrongPassphrase,
    #[error("vault too short to be valid ({0} bytes)")]
    Truncated(usize),
}

/// Argon2id cost settings for the vault key.
#[derive(Debug, Clone, Copy)]
pub struct KdfCost {
    pub memory_kib: u32,
    pub iterations: u32,
}

impl Default for KdfCost {
    fn default() -> Self {
        Self {
            memory_kib: 64 * 1024,
            iterations: 3,
        }
    }
}

fn derive_key(
    passphrase: &str,
    salt: &[u8],
    cost: KdfCost,
) -> Result<Zeroizing<[u8; KEY_LEN]>, CryptoError> {
    let params = Params::new(cost.memory_kib, cost.iterations, 1, Some(KEY_LEN))
        .map_err(|_| CryptoError::KeyDerivation)?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut key[..])
        .map_err(|_| CryptoError::KeyDerivation)?;
    Ok(key)
}

/// Seal `plaintext` under `passphrase`.
/// Layout: salt (16) || nonce (12) || AES-256-GCM ciphertext of MAGIC || plaintext.
pub fn seal(passphrase: &str, plaintext: &[u8], cost: KdfCost) -> Result<Vec<u8>, CryptoError> {
    let mut header = [0u8; HEADER_LEN];
    rand::thread_rng().fill_bytes(&mut header);
    let (salt, nonce) = header.split_at(SALT_LEN);

    let key = derive_key(passphrase, salt, cost)?;
    let cipher = Aes256Gcm::new_from_slice(&key[..]).map_err(|_| CryptoError::Seal)?;

    let mut payload = Zeroizing::new(Vec::with_capacity(MAGIC.len() + plaintext.len()));
    payload.extend_from_slice(MAGIC);
    payload.extend_from_slice(plaintext);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(nonce), payload.as_slice())
        .map_err(|_| CryptoError::Seal)?;

    let mut sealed = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    sealed.extend_from_slice(&header);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Reverse of [`seal`].
pub fn open(passphrase: &str, sealed: &[u8], cost: KdfCost) -> Result<Vec<u8>, CryptoError> {
    if sealed.len() < HEADER_LEN + MAGIC.len() {
        return Err(CryptoError::Truncated(sealed.len()));
    }
    let (header, ciphertext) = sealed.split_at(HEADER_LEN);
    let (salt, nonce) = header.split_at(SALT_LEN);

    let key = derive_key(passphrase, salt, cost)?;
    let cipher =
        Aes256Gcm::new_from_slice(&key[..]).map_err(|_| CryptoError::WrongPassphrase)?;

    let mut opened = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::WrongPassphrase)?;

    if !opened.starts_with(MAGIC) {
        opened.zeroize();
        return Err(CryptoError::WrongPassphrase);
    }
    let plaintext = opened[MAGIC.len()..].to_vec();
    opened.zeroize();
    Ok(plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHEAP: KdfCost = KdfCost {
        memory_kib: 1024,
        iterations: 1,
    };

    #[test]
    fn sealed_history_opens_with_same_passphrase() {
        let sealed = seal("hunter2", b"{\"records\":[]}", CHEAP).unwrap();
        assert_eq!(open("hunter2", &sealed, CHEAP).unwrap(), b"{\"records\":[]}");
    }

    #[test]
    fn each_seal_uses_fresh_salt_and_nonce() {
        let a = seal("pass", b"same", CHEAP).unwrap();
        let b = seal("pass", b"same", CHEAP).unwrap();
        assert_ne!(a[..HEADER_LEN], b[..HEADER_LEN]);
    }

    #[test]
    fn wrong_passphrase_rejected() {
        let sealed = seal("right", b"secret", CHEAP).unwrap();
        assert!(matches!(
            open("wrong", &sealed, CHEAP),
            Err(CryptoError::WrongPassphrase)
        ));
    }

    #[test]
    fn truncated_input_rejected() {
        assert!(matches!(
            open("any", &[0u8; 10], CHEAP),
            Err(CryptoError::Truncated(10))
        ));
    }
}
