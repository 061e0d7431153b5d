use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::error::Error;

/// Wire-level compression algorithm identifier, negotiated during the
/// handshake. `None` is always registered; `Zstd` names the algorithm this
/// core expects to be the common case but does not itself implement — an
/// embedding application registers the actual binding. `Other` extends the
/// tag space to whatever else gets registered beyond those two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressType {
    None,
    Zstd,
    Other(u8),
}

impl CompressType {
    pub fn as_u8(&self) -> u8 {
        match self {
            CompressType::None => 0,
            CompressType::Zstd => 1,
            CompressType::Other(n) => *n,
        }
    }

    pub fn from_u8(n: u8) -> Self {
        match n {
            0 => CompressType::None,
            1 => CompressType::Zstd,
            other => CompressType::Other(other),
        }
    }
}

/// A negotiable compressor. One instance is created per session via
/// [`Compressor::create`]; `compress`/`decompress` then run against that
/// session's own state (matters for stateful algorithms that keep a sliding
/// window across calls).
pub trait Compressor: Send + Sync {
    fn name(&self) -> &str;
    fn compress_type(&self) -> CompressType;

    /// Produce a fresh, independent instance for a new session.
    fn create(&self) -> Box<dyn Compressor>;

    fn compress(&mut self, payload: &[u8]) -> Result<Vec<u8>, Error>;
    fn decompress(&mut self, payload: &[u8]) -> Result<Vec<u8>, Error>;
}

impl fmt::Debug for dyn Compressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compressor").field("name", &self.name()).finish()
    }
}

/// The always-present identity compressor: handshake offers it even when no
/// real algorithm is registered, so two peers with nothing else in common
/// still agree on *something*.
#[derive(Debug, Clone, Default)]
pub struct NoneCompressor;

impl Compressor for NoneCompressor {
    fn name(&self) -> &str {
        "none"
    }

    fn compress_type(&self) -> CompressType {
        CompressType::None
    }

    fn create(&self) -> Box<dyn Compressor> {
        Box::new(NoneCompressor)
    }

    fn compress(&mut self, payload: &[u8]) -> Result<Vec<u8>, Error> {
        Ok(payload.to_vec())
    }

    fn decompress(&mut self, payload: &[u8]) -> Result<Vec<u8>, Error> {
        Ok(payload.to_vec())
    }
}

/// Process-wide name↔type registry. Mirrors `CompressManager`'s singleton:
/// one table shared by every session, built once at startup (registration
/// is not expected at runtime after the first handshake).
pub struct CompressorRegistry {
    by_name: HashMap<String, CompressType>,
    by_type: HashMap<CompressType, Arc<dyn Compressor>>,
    supported: String,
}

impl CompressorRegistry {
    fn new() -> Self {
        let mut registry = Self {
            by_name: HashMap::new(),
            by_type: HashMap::new(),
            supported: String::new(),
        };
        registry.register(Arc::new(NoneCompressor));
        registry
    }

    /// Global instance, matching `CompressManager::Instance()`.
    pub fn global() -> &'static CompressorRegistry {
        static INSTANCE: OnceLock<CompressorRegistry> = OnceLock::new();
        INSTANCE.get_or_init(CompressorRegistry::new)
    }

    pub fn register(&mut self, compressor: Arc<dyn Compressor>) {
        let name = compressor.name().to_string();
        let ty = compressor.compress_type();

        if !self.supported.is_empty() {
            self.supported.push(';');
        }
        self.supported.push_str(&name);

        self.by_name.insert(name, ty);
        self.by_type.insert(ty, compressor);
    }

    /// Semicolon-separated list of every registered compressor's name — the
    /// literal payload of a handshake offer frame.
    pub fn supported_compressors(&self) -> &str {
        &self.supported
    }

    /// Same, but filtered down to a caller-supplied allowlist, preserving
    /// registry order rather than the allowlist's order.
    pub fn supported_compressors_filtered(&self, types: &[CompressType]) -> String {
        let mut out = String::new();
        for ty in types {
            if let Some(compressor) = self.by_type.get(ty) {
                if !out.is_empty() {
                    out.push(';');
                }
                out.push_str(compressor.name());
            }
        }
        out
    }

    pub fn create(&self, ty: CompressType) -> Option<Box<dyn Compressor>> {
        self.by_type.get(&ty).map(|c| c.create())
    }

    /// Parse a handshake offer (`"none;zstd"`) back into known types,
    /// silently dropping names this registry doesn't recognize.
    pub fn parse_offer(&self, offer: &str) -> Vec<CompressType> {
        offer
            .split(';')
            .filter_map(|name| self.by_name.get(name.trim()).copied())
            .collect()
    }

    /// First mutually supported compressor, in the order the offer lists
    /// them — the same precedence a real negotiation would use.
    pub fn negotiate(&self, offer: &str) -> Option<Box<dyn Compressor>> {
        self.parse_offer(offer)
            .into_iter()
            .find_map(|ty| self.create(ty))
    }
}
