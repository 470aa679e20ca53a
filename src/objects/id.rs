//! Object identity
//!
//! An object is addressed by a name (the request path). The name is hashed
//! into a fixed-width id that keys the instance table and names the
//! object's on-disk store.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ObjectId {
    name: String,
    #[serde(rename = "id")]
    hex: String,
}

impl ObjectId {
    /// Derive the id for a name. The same name always yields the same id.
    pub fn from_name(name: &str) -> Self {
        let digest = Sha256::digest(name.as_bytes());
        Self {
            name: name.to_string(),
            hex: format!("{digest:x}"),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 64 lowercase hex characters
    pub fn as_str(&self) -> &str {
        &self.hex
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex)
    }
}
