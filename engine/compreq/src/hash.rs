use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Blake3,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Blake3 => "blake3",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sha256" => Some(HashAlgorithm::Sha256),
            "blake3" => Some(HashAlgorithm::Blake3),
            _ => None,
        }
    }

    /// Keyed digest of `data`: HMAC for SHA-256, the native keyed mode for
    /// BLAKE3 (keyed with the BLAKE3 hash of `secret`).
    pub fn keyed(&self, secret: &[u8], data: &[u8]) -> Result<[u8; 32], InvalidLength> {
        match self {
            HashAlgorithm::Sha256 => hmac_sha256(secret, data),
            HashAlgorithm::Blake3 => {
                let key: [u8; 32] = blake3::hash(secret).into();
                Ok(blake3::keyed_hash(&key, data).into())
            }
        }
    }
}

fn hmac_sha256(secret: &[u8], message: &[u8]) -> Result<[u8; 32], InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(secret)?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().into())
}
