//! Compression wrapper
//!
//! `CompressedCell<T>` behaves like a `Cell<T>` but serializes, conditionally
//! compresses, and records compression statistics on every write. Reads
//! transparently decompress and deserialize back to `T`.

use memcell_core::{CellId, Clock, Error, Metadata, Result, Tag, Timestamp};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Default byte threshold below which writes are stored uncompressed.
pub const DEFAULT_THRESHOLD: usize = 1024;

/// Compression algorithm used by a `CompressedCell`.
///
/// `Gzip` is the default — it is what the worked "compression threshold"
/// scenario names (`strategy_name = "GZIP"`). `Zstd` is offered as a
/// second, opt-in algorithm for callers who prefer its ratio/speed
/// tradeoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionAlgorithm {
    Gzip,
    Zstd,
}

impl CompressionAlgorithm {
    fn name(&self) -> &'static str {
        match self {
            CompressionAlgorithm::Gzip => "GZIP",
            CompressionAlgorithm::Zstd => "ZSTD",
        }
    }
}

impl Default for CompressionAlgorithm {
    fn default() -> Self {
        CompressionAlgorithm::Gzip
    }
}

fn compress_bytes(bytes: &[u8], algo: CompressionAlgorithm) -> Result<Vec<u8>> {
    match algo {
        CompressionAlgorithm::Gzip => {
            use flate2::write::GzEncoder;
            use flate2::Compression;
            use std::io::Write;

            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder
                .write_all(bytes)
                .map_err(|e| Error::CompressionError(e.to_string()))?;
            encoder
                .finish()
                .map_err(|e| Error::CompressionError(e.to_string()))
        }
        CompressionAlgorithm::Zstd => {
            zstd::encode_all(bytes, 0).map_err(|e| Error::CompressionError(e.to_string()))
        }
    }
}

fn decompress_bytes(bytes: &[u8], algo: CompressionAlgorithm) -> Result<Vec<u8>> {
    match algo {
        CompressionAlgorithm::Gzip => {
            use flate2::read::GzDecoder;
            use std::io::Read;

            let mut decoder = GzDecoder::new(bytes);
            let mut out = Vec::new();
            decoder
                .read_to_end(&mut out)
                .map_err(|e| Error::CompressionError(e.to_string()))?;
            Ok(out)
        }
        CompressionAlgorithm::Zstd => {
            zstd::decode_all(bytes).map_err(|e| Error::CompressionError(e.to_string()))
        }
    }
}

/// Compression statistics for the most recent write.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionStats {
    pub original_size: usize,
    pub compressed_size: usize,
    pub ratio: f64,
    /// `"None"` when the write was under the threshold and stored as-is.
    pub strategy_name: String,
    pub last_compressed: Timestamp,
}

fn compress_if_needed(
    bytes: &[u8],
    algo: CompressionAlgorithm,
    threshold: usize,
    now: Timestamp,
) -> Result<(Vec<u8>, CompressionStats)> {
    let original_size = bytes.len();
    if original_size < threshold {
        return Ok((
            bytes.to_vec(),
            CompressionStats {
                original_size,
                compressed_size: original_size,
                ratio: 1.0,
                strategy_name: "None".to_string(),
                last_compressed: now,
            },
        ));
    }

    let compressed = compress_bytes(bytes, algo)?;
    let compressed_size = compressed.len();
    let ratio = if compressed_size > 0 {
        original_size as f64 / compressed_size as f64
    } else {
        1.0
    };
    Ok((
        compressed,
        CompressionStats {
            original_size,
            compressed_size,
            ratio,
            strategy_name: algo.name().to_string(),
            last_compressed: now,
        },
    ))
}

struct State {
    stored: Option<Vec<u8>>,
    stats: Option<CompressionStats>,
    metadata: Metadata,
}

impl State {
    fn is_compressed(&self) -> bool {
        self.stats
            .as_ref()
            .map(|s| s.strategy_name != "None")
            .unwrap_or(false)
    }
}

/// A Cell that transparently compresses values above a byte threshold.
pub struct CompressedCell<T: Clone + Send + Sync + 'static> {
    id: CellId,
    initial: T,
    state: Mutex<State>,
    clock: Arc<dyn Clock>,
    serialize: Arc<dyn Fn(&T) -> Vec<u8> + Send + Sync>,
    deserialize: Arc<dyn Fn(&[u8]) -> Result<T> + Send + Sync>,
    algorithm: CompressionAlgorithm,
    threshold: usize,
}

impl<T: Clone + Send + Sync + 'static> CompressedCell<T> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: CellId,
        initial: T,
        clock: Arc<dyn Clock>,
        serialize: Arc<dyn Fn(&T) -> Vec<u8> + Send + Sync>,
        deserialize: Arc<dyn Fn(&[u8]) -> Result<T> + Send + Sync>,
        algorithm: CompressionAlgorithm,
        threshold: usize,
    ) -> Result<Self> {
        let now = clock.now();
        let bytes = serialize(&initial);
        let (stored, stats) = compress_if_needed(&bytes, algorithm, threshold, now)?;
        let mut metadata = Metadata::new(now);
        metadata.size = stored.len();
        Ok(Self {
            id,
            initial,
            state: Mutex::new(State {
                stored: Some(stored),
                stats: Some(stats),
                metadata,
            }),
            clock,
            serialize,
            deserialize,
            algorithm,
            threshold,
        })
    }

    pub fn id(&self) -> CellId {
        self.id
    }

    fn decode(&self, state: &State) -> Result<Option<T>> {
        match &state.stored {
            None => Ok(None),
            Some(bytes) => {
                let raw = if state.is_compressed() {
                    decompress_bytes(bytes, self.algorithm)?
                } else {
                    bytes.clone()
                };
                Ok(Some((self.deserialize)(&raw)?))
            }
        }
    }

    /// Current value, transparently decompressed. Advances `last_accessed`.
    pub fn read(&self) -> Result<Option<T>> {
        let mut state = self.state.lock();
        state.metadata.mark_accessed(self.clock.now());
        self.decode(&state)
    }

    /// Serialize, conditionally compress, and store `v`.
    pub fn write(&self, v: T) -> Result<()> {
        let bytes = (self.serialize)(&v);
        let now = self.clock.now();
        let (stored, stats) = compress_if_needed(&bytes, self.algorithm, self.threshold, now)?;
        let mut state = self.state.lock();
        state.metadata.mark_modified(now, stored.len());
        state.stored = Some(stored);
        state.stats = Some(stats);
        Ok(())
    }

    /// Apply `f` to the decompressed current value and store the result.
    /// Held under one lock for the whole read-compute-write sequence, so
    /// `f` sees exactly the value that will be written back.
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(Option<T>) -> T,
    {
        let mut state = self.state.lock();
        let current = self.decode(&state)?;
        let new_value = f(current);
        let bytes = (self.serialize)(&new_value);
        let now = self.clock.now();
        let (stored, stats) = compress_if_needed(&bytes, self.algorithm, self.threshold, now)?;
        state.metadata.mark_modified(now, stored.len());
        state.stored = Some(stored);
        state.stats = Some(stats);
        Ok(())
    }

    /// Restore the initial value. Compression stats are recomputed against
    /// it, honoring the threshold as any other write would.
    pub fn clear(&self) -> Result<()> {
        let bytes = (self.serialize)(&self.initial);
        let now = self.clock.now();
        let (stored, stats) = compress_if_needed(&bytes, self.algorithm, self.threshold, now)?;
        let mut state = self.state.lock();
        state.metadata.mark_modified(now, stored.len());
        state.stored = Some(stored);
        state.stats = Some(stats);
        Ok(())
    }

    /// Set the value to `None`; compression stats become `None` too.
    pub fn empty(&self) {
        let mut state = self.state.lock();
        state.metadata.mark_modified(self.clock.now(), 0);
        state.stored = None;
        state.stats = None;
    }

    /// `None` only when the cell is empty.
    pub fn get_compression_stats(&self) -> Option<CompressionStats> {
        self.state.lock().stats.clone()
    }

    /// Compress the current value regardless of threshold. `None` if empty.
    pub fn force_compress(&self) -> Result<Option<CompressionStats>> {
        let mut state = self.state.lock();
        let raw = match &state.stored {
            None => return Ok(None),
            Some(bytes) => {
                if state.is_compressed() {
                    decompress_bytes(bytes, self.algorithm)?
                } else {
                    bytes.clone()
                }
            }
        };
        let original_size = raw.len();
        let compressed = compress_bytes(&raw, self.algorithm)?;
        let compressed_size = compressed.len();
        let ratio = if compressed_size > 0 {
            original_size as f64 / compressed_size as f64
        } else {
            1.0
        };
        let now = self.clock.now();
        let stats = CompressionStats {
            original_size,
            compressed_size,
            ratio,
            strategy_name: self.algorithm.name().to_string(),
            last_compressed: now,
        };
        state.metadata.mark_modified(now, compressed_size);
        state.stored = Some(compressed);
        state.stats = Some(stats.clone());
        Ok(Some(stats))
    }

    pub fn metadata(&self) -> Metadata {
        self.state.lock().metadata.clone()
    }

    pub fn add_tag(&self, tag: Tag) {
        let mut state = self.state.lock();
        state.metadata.tags.insert(tag);
        state.metadata.mark_tags_modified(self.clock.now());
    }

    pub fn remove_tag(&self, tag: &Tag) {
        let mut state = self.state.lock();
        state.metadata.tags.remove(tag);
        state.metadata.mark_tags_modified(self.clock.now());
    }

    pub fn get_tags(&self) -> HashSet<Tag> {
        self.state.lock().metadata.tags.clone()
    }

    /// Raw bytes currently on the wire (compressed, or raw if under
    /// threshold), for the persistence layer's own record format.
    pub fn stored_bytes(&self) -> Option<Vec<u8>> {
        self.state.lock().stored.clone()
    }
}
