//! Secret resolver: AES-256-GCM credential blobs.
//!
//! A blob is `{ encrypted, tag, iv }` with hex ciphertext and a detached
//! 128-bit tag. `tag` and `iv` deserialize from plain byte arrays or from the
//! Node `Buffer` JSON form (`{"type":"Buffer","data":[..]}`), and serialize
//! back to the latter so blobs written by either side decrypt identically.

use std::fmt;

use aes_gcm::aead::consts::{U12, U16, U32};
use aes_gcm::aead::generic_array::{ArrayLength, GenericArray};
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::AesGcm;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::SecretError;

/// IV length used when none is requested
pub const DEFAULT_IV_LEN: usize = 32;

const TAG_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// Built-in application key; pairs with the default credential in `config`
const DEFAULT_KEY: &[u8; KEY_LEN] = b"2ExCoDy42humpkgQwTKJfsFjUdjmpPpJ";

/// 256-bit AES key
#[derive(Clone)]
pub struct SecretKey([u8; KEY_LEN]);

impl SecretKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SecretError> {
        let key: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|_| SecretError::KeyLength { len: bytes.len() })?;
        Ok(Self(key))
    }
}

impl Default for SecretKey {
    fn default() -> Self {
        Self(*DEFAULT_KEY)
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

/// Ciphertext blob as persisted in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedSecret {
    /// Hex-encoded ciphertext
    pub encrypted: String,
    #[serde(with = "buffer_bytes")]
    pub tag: Vec<u8>,
    #[serde(with = "buffer_bytes")]
    pub iv: Vec<u8>,
}

impl EncryptedSecret {
    pub fn from_json(json: &str) -> Result<Self, SecretError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, SecretError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Random IV of `len` bytes
pub fn generate_iv(len: usize) -> Vec<u8> {
    let mut iv = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut iv);
    iv
}

pub fn encrypt(text: &str, iv: &[u8], key: &SecretKey) -> Result<EncryptedSecret, SecretError> {
    let mut buffer = text.as_bytes().to_vec();
    let tag = match iv.len() {
        12 => seal::<U12>(key, iv, &mut buffer)?,
        16 => seal::<U16>(key, iv, &mut buffer)?,
        32 => seal::<U32>(key, iv, &mut buffer)?,
        len => return Err(SecretError::IvLength { len }),
    };
    Ok(EncryptedSecret {
        encrypted: hex::encode(&buffer),
        tag,
        iv: iv.to_vec(),
    })
}

/// Verify and decrypt a blob. Any tampering or a wrong key fails with
/// [`SecretError::Authentication`]; there is no fallback value.
pub fn decrypt(secret: &EncryptedSecret, key: &SecretKey) -> Result<String, SecretError> {
    if secret.tag.len() != TAG_LEN {
        return Err(SecretError::TagLength {
            len: secret.tag.len(),
        });
    }
    let mut buffer = hex::decode(&secret.encrypted)?;
    match secret.iv.len() {
        12 => open::<U12>(key, &secret.iv, &secret.tag, &mut buffer)?,
        16 => open::<U16>(key, &secret.iv, &secret.tag, &mut buffer)?,
        32 => open::<U32>(key, &secret.iv, &secret.tag, &mut buffer)?,
        len => return Err(SecretError::IvLength { len }),
    }
    Ok(String::from_utf8(buffer)?)
}

fn seal<N>(key: &SecretKey, iv: &[u8], buffer: &mut [u8]) -> Result<Vec<u8>, SecretError>
where
    N: ArrayLength<u8>,
{
    let cipher = AesGcm::<Aes256, N>::new(GenericArray::from_slice(&key.0));
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(iv), b"", buffer)
        .map_err(|_| SecretError::Encrypt)?;
    Ok(tag.to_vec())
}

fn open<N>(key: &SecretKey, iv: &[u8], tag: &[u8], buffer: &mut [u8]) -> Result<(), SecretError>
where
    N: ArrayLength<u8>,
{
    let cipher = AesGcm::<Aes256, N>::new(GenericArray::from_slice(&key.0));
    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(iv),
            b"",
            buffer,
            GenericArray::from_slice(tag),
        )
        .map_err(|_| SecretError::Authentication)
}

mod buffer_bytes {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize)]
    struct BufferJson<'a> {
        #[serde(rename = "type")]
        kind: &'static str,
        data: &'a [u8],
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ByteRepr {
        Buffer { data: Vec<u8> },
        Raw(Vec<u8>),
    }

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        BufferJson {
            kind: "Buffer",
            data: bytes,
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        Ok(match ByteRepr::deserialize(deserializer)? {
            ByteRepr::Buffer { data } => data,
            ByteRepr::Raw(data) => data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_PASSWORD_BLOB;

    const SECRET: &str = "ThisIsARandomSuperSecret";

    #[test]
    fn encrypt_produces_hex_and_tag() {
        let blob = encrypt(SECRET, &generate_iv(DEFAULT_IV_LEN), &SecretKey::default()).unwrap();
        assert!(hex::decode(&blob.encrypted).is_ok());
        assert_eq!(blob.tag.len(), TAG_LEN);
        assert_eq!(blob.iv.len(), DEFAULT_IV_LEN);
    }

    #[test]
    fn round_trips_for_each_iv_length() {
        let key = SecretKey::default();
        for len in [12, 16, 32] {
            let blob = encrypt(SECRET, &generate_iv(len), &key).unwrap();
            assert_eq!(decrypt(&blob, &key).unwrap(), SECRET);
        }
    }

    #[test]
    fn round_trips_through_json() {
        let key = SecretKey::default();
        let blob = encrypt(SECRET, &generate_iv(DEFAULT_IV_LEN), &key).unwrap();
        let json = blob.to_json().unwrap();
        assert!(json.contains(r#""type":"Buffer""#));

        let parsed = EncryptedSecret::from_json(&json).unwrap();
        assert_eq!(parsed, blob);
        assert_eq!(decrypt(&parsed, &key).unwrap(), SECRET);
    }

    #[test]
    fn accepts_plain_byte_arrays() {
        let key = SecretKey::default();
        let blob = encrypt(SECRET, &generate_iv(12), &key).unwrap();
        let json = serde_json::json!({
            "encrypted": blob.encrypted,
            "tag": blob.tag,
            "iv": blob.iv,
        })
        .to_string();
        let parsed = EncryptedSecret::from_json(&json).unwrap();
        assert_eq!(decrypt(&parsed, &key).unwrap(), SECRET);
    }

    #[test]
    fn decrypts_shipped_default_credential() {
        let blob = EncryptedSecret::from_json(DEFAULT_PASSWORD_BLOB).unwrap();
        assert_eq!(blob.iv.len(), 32);
        assert_eq!(decrypt(&blob, &SecretKey::default()).unwrap(), "ThisIsRootPW");
    }

    #[test]
    fn tampered_tag_fails_authentication() {
        let key = SecretKey::default();
        let mut blob = encrypt(SECRET, &generate_iv(16), &key).unwrap();
        blob.tag[0] ^= 0xff;
        assert!(matches!(decrypt(&blob, &key), Err(SecretError::Authentication)));
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let blob = encrypt(SECRET, &generate_iv(16), &SecretKey::default()).unwrap();
        let other = SecretKey::from_bytes(&[7u8; 32]).unwrap();
        assert!(matches!(decrypt(&blob, &other), Err(SecretError::Authentication)));
    }

    #[test]
    fn rejects_malformed_blobs() {
        assert!(matches!(
            EncryptedSecret::from_json("not json"),
            Err(SecretError::Json(_))
        ));
        assert!(matches!(
            encrypt(SECRET, &[0u8; 8], &SecretKey::default()),
            Err(SecretError::IvLength { len: 8 })
        ));
        let bad_hex = EncryptedSecret {
            encrypted: "zz".into(),
            tag: vec![0; 16],
            iv: vec![0; 12],
        };
        assert!(matches!(
            decrypt(&bad_hex, &SecretKey::default()),
            Err(SecretError::Hex(_))
        ));
        assert!(matches!(
            SecretKey::from_bytes(b"short"),
            Err(SecretError::KeyLength { len: 5 })
        ));
    }
}
