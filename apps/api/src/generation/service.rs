//! Generation/Parsing Facade.
//!
//! `DrawingService` is the single entry point tying validation, profile building,
//! caching and the batch executor together. Every method is synchronous and may
//! touch the codec or the file system; async callers go through
//! `tokio::task::spawn_blocking`.
//!
//! Three independent caches are owned here:
//! - generation: `CacheKey` → encoded drawing bytes
//! - parse: SHA-256 of uploaded content → recovered dimensions
//! - batch: `BatchKey` → packaged archive bytes
//!
//! No cache lock is ever held while calling into the codec, the packager or the
//! executor.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::cache::{batch_key, cache_key, content_hash, CacheStats, CacheStore};
use crate::config::{Config, SystemLimits, Tolerances};
use crate::drawing::{ArchiveEntry, ArchivePackager, DrawingCodec, DrawingError};
use crate::errors::AppError;
use crate::executor::{BatchExecutor, Task};
use crate::geometry::{build_profile, infer_profile};
use crate::models::component::{ComponentKind, ComponentSpec, ParsedProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    /// Value of the `X-Cache` response header.
    pub fn as_header(self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

/// Encoded output plus whether it came from the cache.
#[derive(Debug, Clone)]
pub struct Generated {
    pub content: Bytes,
    pub cache: CacheStatus,
}

/// Outcome of a fire-and-forget batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSubmission {
    /// Files written synchronously from cache hits.
    pub ready: Vec<PathBuf>,
    /// Cache misses handed to the executor; their files appear later.
    pub queued: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceCacheStats {
    pub generation: CacheStats,
    pub parse: CacheStats,
    pub batch: CacheStats,
}

/// Cache-through drawing generation. Cheap to clone into background jobs.
#[derive(Clone)]
pub struct Generator {
    codec: Arc<dyn DrawingCodec>,
    cache: Arc<CacheStore<Bytes>>,
}

impl Generator {
    pub fn new(codec: Arc<dyn DrawingCodec>, cache: Arc<CacheStore<Bytes>>) -> Self {
        Self { codec, cache }
    }

    pub fn generate(&self, spec: &ComponentSpec) -> Result<Generated, AppError> {
        let key = cache_key(spec);
        if let Some(content) = self.cache.get(&key) {
            return Ok(Generated {
                content,
                cache: CacheStatus::Hit,
            });
        }

        let profile = build_profile(spec);
        let content = Bytes::from(self.codec.encode(profile.vertices())?);
        self.cache.set(key, content.clone());
        debug!(
            "Generated {} ({} bytes)",
            spec.display_stem(),
            content.len()
        );

        Ok(Generated {
            content,
            cache: CacheStatus::Miss,
        })
    }

    /// Generates (or reuses) the drawing and writes it to `path`.
    pub fn generate_to(&self, spec: &ComponentSpec, path: &Path) -> Result<CacheStatus, AppError> {
        let generated = self.generate(spec)?;
        write_output(path, &generated.content)?;
        Ok(generated.cache)
    }

    pub fn extension(&self) -> &'static str {
        self.codec.extension()
    }

    pub fn media_type(&self) -> &'static str {
        self.codec.media_type()
    }

    /// Cached bytes for `spec`, without generating on a miss.
    fn cached(&self, spec: &ComponentSpec) -> Option<Bytes> {
        self.cache.get(&cache_key(spec))
    }
}

pub struct DrawingService {
    generator: Generator,
    codec: Arc<dyn DrawingCodec>,
    packager: Arc<dyn ArchivePackager>,
    executor: Arc<BatchExecutor>,
    generation_cache: Arc<CacheStore<Bytes>>,
    parse_cache: CacheStore<ParsedProfile>,
    batch_cache: CacheStore<Bytes>,
    limits: SystemLimits,
    tolerances: Tolerances,
}

impl DrawingService {
    pub fn new(
        config: &Config,
        codec: Arc<dyn DrawingCodec>,
        packager: Arc<dyn ArchivePackager>,
        executor: Arc<BatchExecutor>,
    ) -> Self {
        let generation_cache = Arc::new(CacheStore::new("generation", config.generation_cache_size));
        Self {
            generator: Generator::new(Arc::clone(&codec), Arc::clone(&generation_cache)),
            codec,
            packager,
            executor,
            generation_cache,
            parse_cache: CacheStore::new("parse", config.parse_cache_size),
            batch_cache: CacheStore::new("batch", config.batch_cache_size),
            limits: config.limits,
            tolerances: config.tolerances,
        }
    }

    pub fn drawing_media_type(&self) -> &'static str {
        self.generator.media_type()
    }

    pub fn drawing_extension(&self) -> &'static str {
        self.generator.extension()
    }

    pub fn archive_media_type(&self) -> &'static str {
        self.packager.media_type()
    }

    pub fn archive_extension(&self) -> &'static str {
        self.packager.extension()
    }

    // ────────────────────────────────────────────────────────────────────────
    // Validation entry points
    // ────────────────────────────────────────────────────────────────────────

    pub fn validate(&self, kind: ComponentKind, raw: &Value) -> Result<ComponentSpec, AppError> {
        ComponentSpec::from_json(kind, raw, &self.tolerances)
    }

    /// Checks the batch size before validating any item.
    pub fn validate_batch(
        &self,
        kind: ComponentKind,
        items: &[Value],
    ) -> Result<Vec<ComponentSpec>, AppError> {
        self.check_batch_size(items.len())?;
        items
            .iter()
            .enumerate()
            .map(|(i, raw)| self.validate(kind, raw).map_err(|e| e.at_item(i)))
            .collect()
    }

    fn check_batch_size(&self, actual: usize) -> Result<(), AppError> {
        let limit = self.limits.max_batch_size;
        if actual > limit {
            return Err(AppError::SystemLimit { limit, actual });
        }
        Ok(())
    }

    // ────────────────────────────────────────────────────────────────────────
    // Generation
    // ────────────────────────────────────────────────────────────────────────

    pub fn generate(&self, spec: &ComponentSpec) -> Result<Generated, AppError> {
        self.generator.generate(spec)
    }

    /// Fire-and-forget batch generation.
    ///
    /// Cached items are written to their paths before this returns and listed in
    /// `ready`. Every miss becomes one executor task that generates, caches and
    /// writes its file later; those paths are not reported back. A cached item
    /// whose file cannot be written is queued like a miss, so its failure stays
    /// local to that item.
    pub fn generate_batch(
        &self,
        jobs: Vec<(ComponentSpec, PathBuf)>,
    ) -> Result<BatchSubmission, AppError> {
        self.check_batch_size(jobs.len())?;

        let mut ready = Vec::new();
        let mut tasks = Vec::new();

        for (spec, path) in jobs {
            if let Some(content) = self.generator.cached(&spec) {
                match write_output(&path, &content) {
                    Ok(()) => {
                        ready.push(path);
                        continue;
                    }
                    Err(e) => warn!(
                        "Could not write cached {} to {}, queueing it: {e}",
                        spec.display_stem(),
                        path.display()
                    ),
                }
            }

            let generator = self.generator.clone();
            let name = spec.display_stem();
            let done_path = path.clone();
            let failed_name = name.clone();
            tasks.push(
                Task::new(move || {
                    generator
                        .generate_to(&spec, &path)
                        .map(|_| ())
                        .map_err(|e| anyhow::anyhow!("{name}: {e}"))
                })
                .on_success(move || debug!("Batch item written: {}", done_path.display()))
                .on_error(move |e| error!("Batch item {failed_name} failed: {e}")),
            );
        }

        let queued = if tasks.is_empty() {
            0
        } else {
            self.executor.submit_batch(tasks)
        };

        info!(
            "Batch accepted: {} ready from cache, {} queued",
            ready.len(),
            queued
        );
        Ok(BatchSubmission { ready, queued })
    }

    /// Returns one archive holding every member, keyed by the order-independent
    /// `BatchKey`. Members are generated synchronously; any failure aborts the
    /// whole archive and nothing is cached.
    pub fn get_or_compute_batch_archive(
        &self,
        specs: &[ComponentSpec],
    ) -> Result<Generated, AppError> {
        self.check_batch_size(specs.len())?;

        let key = batch_key(specs);
        if let Some(content) = self.batch_cache.get(&key) {
            info!("Batch archive served from cache ({} items)", specs.len());
            return Ok(Generated {
                content,
                cache: CacheStatus::Hit,
            });
        }

        let extension = self.generator.extension();
        let entries = specs
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                self.generator.generate(spec).map(|generated| ArchiveEntry {
                    name: format!("{}.{extension}", spec.batch_stem(i)),
                    content: generated.content,
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        let content = Bytes::from(self.packager.package(&entries)?);
        self.batch_cache.set(key, content.clone());
        info!(
            "Batch archive built: {} items, {} bytes",
            entries.len(),
            content.len()
        );

        Ok(Generated {
            content,
            cache: CacheStatus::Miss,
        })
    }

    // ────────────────────────────────────────────────────────────────────────
    // Parsing
    // ────────────────────────────────────────────────────────────────────────

    pub fn parse(&self, path: &Path) -> Result<ParsedProfile, AppError> {
        let bytes = fs::read(path)
            .map_err(|e| AppError::CorruptDrawing(format!("could not read drawing: {e}")))?;
        self.parse_bytes(&bytes)
    }

    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<ParsedProfile, AppError> {
        let key = content_hash(bytes);
        if let Some(parsed) = self.parse_cache.get(&key) {
            return Ok(parsed);
        }

        let vertices = self.codec.decode(bytes).map_err(|e| match e {
            DrawingError::NoPolyline => AppError::UnsupportedShape(
                "No polyline found in drawing. Only standard I-Beams and Columns are supported."
                    .to_string(),
            ),
            other => AppError::CorruptDrawing(other.to_string()),
        })?;

        let parsed = infer_profile(&vertices)?;
        self.parse_cache.set(key, parsed);
        info!("Parsed drawing as {}", parsed.kind().type_name());
        Ok(parsed)
    }

    // ────────────────────────────────────────────────────────────────────────
    // Housekeeping
    // ────────────────────────────────────────────────────────────────────────

    pub fn cache_stats(&self) -> ServiceCacheStats {
        ServiceCacheStats {
            generation: self.generation_cache.stats(),
            parse: self.parse_cache.stats(),
            batch: self.batch_cache.stats(),
        }
    }

    pub fn clear_caches(&self) {
        self.generation_cache.clear();
        self.parse_cache.clear();
        self.batch_cache.clear();
    }

    pub fn executor(&self) -> &BatchExecutor {
        &self.executor
    }

    pub async fn shutdown(&self, wait: bool) {
        self.executor.shutdown(wait).await;
    }
}

fn write_output(path: &Path, content: &[u8]) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}
