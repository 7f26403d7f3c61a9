//! Deterministic identification of configurations and of a strategy's
//! output stream.
//!
//! Replaying the same bars through a fresh strategy must reproduce the same
//! `OutputFingerprint` bit for bit.

use crate::strategy::BarOutput;
use serde::{Deserialize, Serialize};
use std::fmt;

/// BLAKE3 hex digest identifying a parameter set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigHash(pub String);

impl ConfigHash {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }

    pub fn from_hasher(hasher: &blake3::Hasher) -> Self {
        Self(hasher.finalize().to_hex().to_string())
    }

    /// First eight hex characters, for directory names and logs.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(8)]
    }
}

impl fmt::Display for ConfigHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Running hash over the published value and intent of every bar.
#[derive(Debug, Clone, Default)]
pub struct OutputFingerprint {
    hasher: blake3::Hasher,
    bars: u64,
}

impl OutputFingerprint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, output: &BarOutput) {
        let value_bits = output.aml_value.map_or(u64::MAX, f64::to_bits);
        self.hasher.update(&self.bars.to_le_bytes());
        self.hasher.update(&value_bits.to_le_bytes());
        self.hasher.update(&[output.intent.kind as u8]);
        self.hasher.update(&output.intent.volume.to_bits().to_le_bytes());
        self.bars += 1;
    }

    pub fn bars(&self) -> u64 {
        self.bars
    }

    pub fn finish(&self) -> String {
        self.hasher.finalize().to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_hash_is_deterministic() {
        let a = ConfigHash::from_bytes(b"aml");
        let b = ConfigHash::from_bytes(b"aml");
        assert_eq!(a, b);
        assert_eq!(a.0.len(), 64);
        assert_eq!(a.short().len(), 8);
        assert_ne!(a, ConfigHash::from_bytes(b"AML"));
    }

    #[test]
    fn empty_fingerprint_is_stable() {
        assert_eq!(OutputFingerprint::new().finish(), OutputFingerprint::new().finish());
        assert_eq!(OutputFingerprint::new().bars(), 0);
    }
}
