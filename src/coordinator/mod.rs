//! Coordinated ownership of the type and reference caches.
//!
//! [`CacheCoordinator`] owns one cache-backed [`TypeDecomposer`] and one
//! cache-backed [`ReferenceResolver`], configured together through
//! [`CacheConfig`]. The rendering layer asks the coordinator for decomposed
//! trees and resolved symbols; the coordinator delegates to the owned
//! components, which check their cache before doing real work. External
//! callers observe produced values only and never touch cache internals.
//!
//! # Shared Instance
//!
//! Callers that do not want to thread a coordinator through every call can
//! use the process-wide shared instance. It is an explicit context object
//! with one guarded initialization, not an open global: requesting it again
//! with a configuration that differs from how it was first configured fails
//! with [`SigtreeError::SharedInstanceMismatch`] instead of silently
//! discarding the caller's options. An explicit [`CacheCoordinator::new`]
//! always yields a fresh, independently configured instance.
//!
//! # Examples
//!
//! ```rust
//! use sigtree::coordinator::{CacheCoordinator, CacheConfig};
//!
//! # fn example() -> anyhow::Result<()> {
//! let coordinator = CacheCoordinator::new(CacheConfig::minimal())?;
//!
//! let tree = coordinator.decompose("{ id: number }");
//! assert_eq!(tree.children.len(), 1);
//!
//! let stats = coordinator.statistics();
//! assert_eq!(stats.type_cache.miss_count, 0); // minimal preset disables stats
//! # Ok(())
//! # }
//! ```

use crate::cache::{
    CacheSettings, CacheStatistics, DEFAULT_REFERENCE_CACHE_SIZE, DEFAULT_TYPE_CACHE_SIZE,
};
use crate::core::error::SigtreeError;
use crate::decompose::{DEFAULT_MAX_DEPTH, PropertyNode, TypeDecomposer};
use crate::parser::{ShapeParser, StructuralParser};
use crate::resolver::{
    ContextSymbol, DeclarationReference, ReferenceResolver, ResolvedSymbol, SymbolTable,
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, OnceLock};
use tracing::debug;

/// Configuration surface for a [`CacheCoordinator`].
///
/// Deserializable with per-field defaults so host tools can embed a partial
/// `[cache]` section in their own configuration files. `enabled` switches
/// both caches off at once; the per-cache settings refine capacity and
/// participation individually.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Master switch. When `false`, no cache is consulted or populated;
    /// decomposition and resolution still run.
    pub enabled: bool,
    /// Whether hit/miss counters are maintained.
    pub enable_stats: bool,
    /// Recursion budget for type decomposition.
    pub max_depth: usize,
    /// Settings for the type decomposition cache.
    pub type_cache: CacheSettings,
    /// Settings for the reference resolution cache.
    pub reference_cache: CacheSettings,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            enable_stats: true,
            max_depth: DEFAULT_MAX_DEPTH,
            type_cache: CacheSettings::with_max_size(DEFAULT_TYPE_CACHE_SIZE),
            reference_cache: CacheSettings::with_max_size(DEFAULT_REFERENCE_CACHE_SIZE),
        }
    }
}

impl CacheConfig {
    /// Preset for large documentation sets: bigger caches, statistics on.
    #[must_use]
    pub fn comprehensive() -> Self {
        Self {
            type_cache: CacheSettings::with_max_size(2048),
            reference_cache: CacheSettings::with_max_size(4096),
            ..Self::default()
        }
    }

    /// Preset for memory-constrained runs: small caches, statistics off.
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            enable_stats: false,
            type_cache: CacheSettings::with_max_size(64),
            reference_cache: CacheSettings::with_max_size(128),
            ..Self::default()
        }
    }

    /// Preset that bypasses caching entirely, e.g. for debugging stale
    /// output.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            enable_stats: false,
            ..Self::default()
        }
    }

    /// Looks up a preset by name.
    ///
    /// # Errors
    ///
    /// Returns [`SigtreeError::UnknownPreset`] for names other than
    /// `default`, `comprehensive`, `minimal`, and `disabled`.
    pub fn preset(name: &str) -> Result<Self> {
        match name {
            "default" => Ok(Self::default()),
            "comprehensive" => Ok(Self::comprehensive()),
            "minimal" => Ok(Self::minimal()),
            "disabled" => Ok(Self::disabled()),
            other => Err(SigtreeError::UnknownPreset {
                name: other.to_string(),
            }
            .into()),
        }
    }

    /// Checks the configuration for construction-time errors.
    ///
    /// # Errors
    ///
    /// Returns [`SigtreeError::InvalidMaxDepth`] for a zero depth budget and
    /// [`SigtreeError::InvalidCacheSize`] for an enabled cache with zero
    /// capacity. Disabled caches may carry any capacity.
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(SigtreeError::InvalidMaxDepth {
                depth: self.max_depth,
            }
            .into());
        }
        if self.enabled {
            if self.type_cache.enabled && self.type_cache.max_size == 0 {
                return Err(SigtreeError::InvalidCacheSize {
                    cache: "type".to_string(),
                    size: self.type_cache.max_size,
                }
                .into());
            }
            if self.reference_cache.enabled && self.reference_cache.max_size == 0 {
                return Err(SigtreeError::InvalidCacheSize {
                    cache: "reference".to_string(),
                    size: self.reference_cache.max_size,
                }
                .into());
            }
        }
        Ok(())
    }
}

/// Aggregated point-in-time statistics for both coordinated caches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CoordinatorStatistics {
    /// Snapshot of the type decomposition cache.
    pub type_cache: CacheStatistics,
    /// Snapshot of the reference resolution cache.
    pub reference_cache: CacheStatistics,
}

impl CoordinatorStatistics {
    /// Hit rate across both caches combined, 0.0 with no lookups.
    #[must_use]
    pub fn combined_hit_rate(&self) -> f64 {
        let hits = self.type_cache.hit_count + self.reference_cache.hit_count;
        let lookups =
            hits + self.type_cache.miss_count + self.reference_cache.miss_count;
        if lookups == 0 {
            0.0
        } else {
            hits as f64 / lookups as f64
        }
    }
}

static SHARED: OnceLock<Arc<CacheCoordinator>> = OnceLock::new();

/// Owns and coordinates the type and reference caches for a documentation
/// run.
///
/// Interior mutability via [`Mutex`] keeps the public surface `&self`, so
/// one coordinator (including the shared instance) can flow through a call
/// chain without threading `&mut` everywhere. Execution within a run is
/// single-threaded; the locks exist for that flow and for `Send + Sync` of
/// the shared instance, not for contention.
#[derive(Debug)]
pub struct CacheCoordinator {
    config: CacheConfig,
    decomposer: Mutex<TypeDecomposer>,
    resolver: Mutex<ReferenceResolver>,
}

impl CacheCoordinator {
    /// Creates a fresh, independently configured coordinator with the
    /// default structural shape parser.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when `config` fails
    /// [`CacheConfig::validate`].
    pub fn new(config: CacheConfig) -> Result<Self> {
        Self::with_parser(config, Box::new(StructuralParser::new()))
    }

    /// Creates a coordinator whose decomposer uses a custom shape parser.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when `config` fails
    /// [`CacheConfig::validate`].
    pub fn with_parser(config: CacheConfig, parser: Box<dyn ShapeParser + Send>) -> Result<Self> {
        config.validate()?;

        let mut decomposer =
            TypeDecomposer::with_parser(parser).with_max_depth(config.max_depth)?;
        if config.enabled {
            decomposer = decomposer.with_cache(&config.type_cache, config.enable_stats)?;
        }
        let resolver = if config.enabled {
            ReferenceResolver::with_cache(&config.reference_cache, config.enable_stats)?
        } else {
            ReferenceResolver::new()
        };

        debug!(
            enabled = config.enabled,
            type_capacity = config.type_cache.max_size,
            reference_capacity = config.reference_cache.max_size,
            "constructed cache coordinator"
        );
        Ok(Self {
            config,
            decomposer: Mutex::new(decomposer),
            resolver: Mutex::new(resolver),
        })
    }

    /// The process-wide shared coordinator, lazily constructed with the
    /// default configuration on first access.
    ///
    /// Requesting the instance without options never conflicts: whatever
    /// configuration the instance was first given stays in effect.
    ///
    /// # Errors
    ///
    /// Returns a configuration error only if first-time construction fails.
    pub fn shared() -> Result<Arc<Self>> {
        if let Some(existing) = SHARED.get() {
            return Ok(Arc::clone(existing));
        }
        Self::shared_with(CacheConfig::default())
    }

    /// The process-wide shared coordinator, constructed with `config` on
    /// first access.
    ///
    /// # Errors
    ///
    /// Returns [`SigtreeError::SharedInstanceMismatch`] when the shared
    /// instance already exists with a different configuration — the
    /// caller's options are never silently discarded. Also returns
    /// configuration errors from first-time construction.
    pub fn shared_with(config: CacheConfig) -> Result<Arc<Self>> {
        if let Some(existing) = SHARED.get() {
            if existing.config != config {
                return Err(SigtreeError::SharedInstanceMismatch.into());
            }
            return Ok(Arc::clone(existing));
        }

        let created = Arc::new(Self::new(config)?);
        match SHARED.set(Arc::clone(&created)) {
            Ok(()) => {
                debug!("initialized shared cache coordinator");
                Ok(created)
            }
            // Lost a first-initialization race; re-check against the winner.
            Err(_) => match SHARED.get() {
                Some(existing) if existing.config == created.config => Ok(Arc::clone(existing)),
                Some(_) => Err(SigtreeError::SharedInstanceMismatch.into()),
                None => Ok(created),
            },
        }
    }

    /// The configuration this coordinator was constructed with.
    #[must_use]
    pub const fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Decomposes a type signature into a property tree, memoized when the
    /// type cache is enabled.
    pub fn decompose(&self, signature: &str) -> Arc<PropertyNode> {
        self.decomposer.lock().unwrap().decompose(signature)
    }

    /// Resolves a declaration reference against `table`, memoized when the
    /// reference cache is enabled.
    ///
    /// # Errors
    ///
    /// Returns [`SigtreeError::KeyDerivation`] for references whose
    /// canonical fields cannot key a cache slot.
    pub fn resolve(
        &self,
        reference: &DeclarationReference,
        context: Option<&ContextSymbol>,
        table: &dyn SymbolTable,
    ) -> Result<Arc<ResolvedSymbol>> {
        self.resolver.lock().unwrap().resolve(reference, context, table)
    }

    /// Drops the cached resolution for one `(reference, context)` pair.
    ///
    /// # Errors
    ///
    /// Returns [`SigtreeError::KeyDerivation`] for references whose key
    /// cannot be derived.
    pub fn invalidate_reference(
        &self,
        reference: &DeclarationReference,
        context: Option<&ContextSymbol>,
    ) -> Result<bool> {
        self.resolver.lock().unwrap().invalidate(reference, context)
    }

    /// Drops every cached resolution failure so they can be retried.
    ///
    /// Returns the number of entries dropped.
    pub fn clear_failed_resolutions(&self) -> usize {
        self.resolver.lock().unwrap().clear_failures()
    }

    /// Aggregated statistics snapshot across both caches.
    #[must_use]
    pub fn statistics(&self) -> CoordinatorStatistics {
        CoordinatorStatistics {
            type_cache: self.decomposer.lock().unwrap().stats(),
            reference_cache: self.resolver.lock().unwrap().stats(),
        }
    }

    /// Empties both caches and resets their counters.
    ///
    /// Call between independent runs that must not see stale state, e.g.
    /// after the documented sources change.
    pub fn clear_all(&self) {
        self.decomposer.lock().unwrap().clear_cache();
        self.resolver.lock().unwrap().clear_cache();
        debug!("cleared all coordinated caches");
    }
}
