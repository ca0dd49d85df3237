//! Cross-reference resolution with structurally-keyed memoization.
//!
//! [`ReferenceResolver`] turns a [`DeclarationReference`] (plus an optional
//! context symbol) into a [`ResolvedSymbol`] by delegating the actual lookup
//! to an external [`SymbolTable`] — an opaque, potentially expensive,
//! synchronous collaborator. Results are memoized per `(reference, context)`
//! pair: while an entry is warm, an equal pair never triggers a second table
//! lookup.
//!
//! # Structural Keys
//!
//! Cache keys are derived from the **structural** identity of the input —
//! the symbol path segments, the package name, and the context symbol's
//! canonical id — never from a textual rendering of the reference. Two
//! references that happen to stringify identically but differ in package or
//! context land in different cache slots. When the canonical fields cannot
//! be extracted (an empty symbol path), key derivation fails loudly with
//! [`SigtreeError::KeyDerivation`] instead of degrading to a colliding key.
//!
//! # Failure Caching
//!
//! A lookup the symbol table cannot satisfy comes back as
//! [`ResolvedSymbol::Failed`] and is cached like a success: a broken
//! reference is unlikely to start resolving mid-run, and re-attempting it on
//! every render would defeat memoization. Callers that know external state
//! changed retry through the explicit invalidation hooks
//! ([`invalidate`](ReferenceResolver::invalidate),
//! [`clear_failures`](ReferenceResolver::clear_failures)).
//!
//! # Examples
//!
//! ```rust
//! use sigtree::resolver::{
//!     DeclarationReference, ReferenceResolver, ResolvedSymbol, SymbolHandle, SymbolTable,
//! };
//!
//! struct SingleEntryTable;
//!
//! impl SymbolTable for SingleEntryTable {
//!     fn resolve(
//!         &self,
//!         reference: &DeclarationReference,
//!         _context: Option<&sigtree::resolver::ContextSymbol>,
//!     ) -> ResolvedSymbol {
//!         if reference.symbol_path == ["Widget"] {
//!             ResolvedSymbol::Found {
//!                 target: SymbolHandle {
//!                     canonical_id: "pkg::Widget".to_string(),
//!                     display_name: "Widget".to_string(),
//!                 },
//!             }
//!         } else {
//!             ResolvedSymbol::Failed {
//!                 error_message: "no such symbol".to_string(),
//!             }
//!         }
//!     }
//! }
//!
//! # fn example() -> anyhow::Result<()> {
//! let mut resolver = ReferenceResolver::new();
//! let reference = DeclarationReference::new(["Widget"]);
//! let resolved = resolver.resolve(&reference, None, &SingleEntryTable)?;
//! assert!(resolved.is_resolved());
//! # Ok(())
//! # }
//! ```

use crate::cache::{CacheSettings, CacheStatistics, MemoizingCache};
use crate::core::error::SigtreeError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// A structural pointer to a named symbol.
///
/// The identity of a reference is its path segments plus the optional
/// package scope. The [`Display`](fmt::Display) rendering is for logs and
/// diagnostics only — it deliberately plays no part in cache keying, since
/// distinct references can render identically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationReference {
    /// Path segments naming the symbol, outermost first (e.g. `["Foo", "bar"]`).
    pub symbol_path: Vec<String>,
    /// Package the path is scoped to, when the source declares one.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub package_name: Option<String>,
}

impl DeclarationReference {
    /// A reference with the given path segments and no package scope.
    #[must_use]
    pub fn new(symbol_path: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            symbol_path: symbol_path.into_iter().map(Into::into).collect(),
            package_name: None,
        }
    }

    /// Scopes the reference to a package.
    #[must_use]
    pub fn with_package(mut self, package_name: impl Into<String>) -> Self {
        self.package_name = Some(package_name.into());
        self
    }
}

impl fmt::Display for DeclarationReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol_path.join("."))
    }
}

/// The declared fields a resolution context exposes.
///
/// An explicit interface instead of an unconstrained shape: key
/// construction depends only on `canonical_id`, and `member_count` gives
/// table implementations the scoping information they need without handing
/// them (or the key builder) an arbitrary object to stringify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSymbol {
    /// Stable canonical identity of the context symbol.
    pub canonical_id: String,
    /// Number of members declared on the context symbol.
    pub member_count: usize,
}

impl ContextSymbol {
    /// A context with the given canonical identity.
    #[must_use]
    pub fn new(canonical_id: impl Into<String>, member_count: usize) -> Self {
        Self {
            canonical_id: canonical_id.into(),
            member_count,
        }
    }
}

/// A lookup result handle for an externally-owned API item.
///
/// Weak-reference semantics: this crate never owns the lifetime of the
/// resolved item, only the identifiers needed to link to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolHandle {
    /// Stable canonical identity of the resolved item.
    pub canonical_id: String,
    /// Human-readable name for link text.
    pub display_name: String,
}

/// Outcome of resolving a declaration reference.
///
/// Failures are values, not errors: the rendering layer shows a broken
/// reference in place and the run keeps going.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolvedSymbol {
    /// The symbol table found a match.
    Found {
        /// Handle to the externally-owned item.
        target: SymbolHandle,
    },
    /// The symbol table reported no match.
    Failed {
        /// Why resolution failed, for diagnostics and rendering.
        error_message: String,
    },
}

impl ResolvedSymbol {
    /// Whether resolution succeeded.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Found { .. })
    }

    /// The failure message, if resolution failed.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Found { .. } => None,
            Self::Failed { error_message } => Some(error_message),
        }
    }

    /// The resolved handle, if resolution succeeded.
    #[must_use]
    pub const fn target(&self) -> Option<&SymbolHandle> {
        match self {
            Self::Found { target } => Some(target),
            Self::Failed { .. } => None,
        }
    }
}

/// External symbol table collaborator.
///
/// Implementations perform the actual lookup; the resolver treats the call
/// as opaque and potentially expensive, which is why results are memoized.
pub trait SymbolTable {
    /// Looks up `reference`, optionally scoped to `context`.
    fn resolve(
        &self,
        reference: &DeclarationReference,
        context: Option<&ContextSymbol>,
    ) -> ResolvedSymbol;
}

/// Structural cache key for a `(reference, context)` pair.
///
/// A typed struct rather than a joined string: equality and hashing run
/// over the actual fields, so no separator convention can be defeated by
/// hostile segment contents, and the key is collision-free by construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReferenceKey {
    symbol_path: Vec<String>,
    package_name: Option<String>,
    context_id: Option<String>,
}

impl ReferenceKey {
    /// Derives the key for a `(reference, context)` pair.
    ///
    /// # Errors
    ///
    /// Returns [`SigtreeError::KeyDerivation`] when the reference has no
    /// symbol path or a blank path segment — inputs that cannot be
    /// disambiguated must not silently share a key.
    pub fn derive(
        reference: &DeclarationReference,
        context: Option<&ContextSymbol>,
    ) -> Result<Self> {
        if reference.symbol_path.is_empty() {
            return Err(SigtreeError::KeyDerivation {
                reason: "declaration reference has an empty symbol path".to_string(),
            }
            .into());
        }
        if reference.symbol_path.iter().any(|segment| segment.is_empty()) {
            return Err(SigtreeError::KeyDerivation {
                reason: "declaration reference contains a blank path segment".to_string(),
            }
            .into());
        }
        Ok(Self {
            symbol_path: reference.symbol_path.clone(),
            package_name: reference.package_name.clone(),
            context_id: context.map(|c| c.canonical_id.clone()),
        })
    }
}

/// Memoizing front for an external symbol table.
///
/// Constructed once per documentation-generation run (or shared through the
/// [`CacheCoordinator`](crate::coordinator::CacheCoordinator)).
pub struct ReferenceResolver {
    cache: Option<MemoizingCache<ReferenceKey, Arc<ResolvedSymbol>>>,
}

impl fmt::Debug for ReferenceResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceResolver")
            .field("cached", &self.cache.is_some())
            .finish()
    }
}

impl Default for ReferenceResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceResolver {
    /// Creates an uncached resolver: every call reaches the symbol table.
    #[must_use]
    pub const fn new() -> Self {
        Self { cache: None }
    }

    /// Creates a resolver memoized per the given settings.
    ///
    /// Settings with `enabled: false` yield an uncached resolver.
    ///
    /// # Errors
    ///
    /// Returns [`SigtreeError::InvalidCacheSize`] for enabled settings with
    /// a zero capacity.
    pub fn with_cache(settings: &CacheSettings, enable_stats: bool) -> Result<Self> {
        let cache = if settings.enabled {
            Some(MemoizingCache::from_settings(
                "reference",
                settings,
                enable_stats,
            )?)
        } else {
            None
        };
        Ok(Self { cache })
    }

    /// Resolves `reference` against `table`, memoized per
    /// `(reference, context)` pair.
    ///
    /// While the cache entry is warm, at most one `table.resolve` call is
    /// made per key; failed lookups are cached alongside successes.
    ///
    /// # Errors
    ///
    /// Returns [`SigtreeError::KeyDerivation`] when a cache key cannot be
    /// built from the reference's canonical fields. The symbol table itself
    /// never makes this method fail — a missing symbol is a
    /// [`ResolvedSymbol::Failed`] value.
    pub fn resolve(
        &mut self,
        reference: &DeclarationReference,
        context: Option<&ContextSymbol>,
        table: &dyn SymbolTable,
    ) -> Result<Arc<ResolvedSymbol>> {
        let key = ReferenceKey::derive(reference, context)?;
        if let Some(cache) = &mut self.cache {
            if let Some(hit) = cache.get(&key) {
                trace!(reference = %reference, "reference served from cache");
                return Ok(hit);
            }
        }

        debug!(reference = %reference, "resolving reference through symbol table");
        let resolved = Arc::new(table.resolve(reference, context));
        if let ResolvedSymbol::Failed { error_message } = &*resolved {
            debug!(reference = %reference, error = %error_message, "caching failed resolution");
        }
        if let Some(cache) = &mut self.cache {
            cache.set(key, Arc::clone(&resolved));
        }
        Ok(resolved)
    }

    /// Drops the cached entry for one `(reference, context)` pair.
    ///
    /// Returns `true` when an entry was present.
    ///
    /// # Errors
    ///
    /// Returns [`SigtreeError::KeyDerivation`] for references whose key
    /// cannot be derived.
    pub fn invalidate(
        &mut self,
        reference: &DeclarationReference,
        context: Option<&ContextSymbol>,
    ) -> Result<bool> {
        let key = ReferenceKey::derive(reference, context)?;
        Ok(self
            .cache
            .as_mut()
            .is_some_and(|cache| cache.remove(&key).is_some()))
    }

    /// Drops every cached failure, keeping successful resolutions warm.
    ///
    /// Returns the number of entries dropped. The retry hook for callers
    /// whose external state changed after failures were cached.
    pub fn clear_failures(&mut self) -> usize {
        let Some(cache) = &mut self.cache else {
            return 0;
        };
        let before = cache.len();
        cache.retain(|_, value| value.is_resolved());
        let dropped = before - cache.len();
        if dropped > 0 {
            debug!(dropped, "cleared cached resolution failures");
        }
        dropped
    }

    /// Statistics snapshot of the resolution cache.
    ///
    /// Reports the all-zero snapshot when caching is disabled.
    #[must_use]
    pub fn stats(&self) -> CacheStatistics {
        self.cache
            .as_ref()
            .map_or_else(CacheStatistics::empty, MemoizingCache::stats)
    }

    /// Empties the resolution cache and resets its counters.
    pub fn clear_cache(&mut self) {
        if let Some(cache) = &mut self.cache {
            cache.clear();
        }
    }
}
