use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Stable content hash of a serializable value.
///
/// Used as the cache key for every cache tier and as artifact identity. Two
/// values with the same serialized form always produce the same fingerprint.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint([u8; 16]);

impl Fingerprint {
    pub fn of<T: Serialize + ?Sized>(value: &T) -> Fingerprint {
        // Serializing plain data types into a Vec cannot fail.
        let bytes = serde_json::to_vec(value).unwrap_or_default();
        Fingerprint::of_bytes(&bytes)
    }

    pub fn of_bytes(bytes: &[u8]) -> Fingerprint {
        let digest = Sha256::digest(bytes);
        let mut out = [0; 16];
        out.copy_from_slice(&digest[..16]);
        Fingerprint(out)
    }

    /// Short hex prefix, suitable for embedding in backend object names.
    pub fn short(&self) -> String {
        self.to_string()[..12].to_string()
    }
}

impl core::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl core::fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Fingerprint({self})")
    }
}
