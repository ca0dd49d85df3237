//! sigtree - Type signature trees and reference resolution for documentation
//! generators
//!
//! sigtree ingests structured descriptions of typed data shapes and symbol
//! cross-references produced by an external source-analysis toolchain and
//! turns them into renderable trees and resolved links. At its center sits a
//! memoizing type-decomposition and reference-resolution subsystem: the one
//! place where subtle correctness bugs — cache key collisions returning
//! another entity's data, unbounded recursion on self-referential types,
//! silently-ignored configuration on shared state — have outsized,
//! hard-to-detect impact on generated output.
//!
//! # Architecture Overview
//!
//! Control flows from the rendering layer through the coordinator to the
//! workers, which check their cache before doing real work:
//!
//! ```text
//! rendering layer
//!       │
//!       ▼
//! CacheCoordinator ──── owns one cache each, presets, statistics
//!       │
//!       ├─▶ TypeDecomposer ──▶ ShapeParser (collaborator)
//!       │        └─ MemoizingCache keyed by normalized signature
//!       └─▶ ReferenceResolver ──▶ SymbolTable (collaborator)
//!                └─ MemoizingCache keyed by structural ReferenceKey
//! ```
//!
//! ## Key Guarantees
//!
//! - **Collision-free keys**: cache keys are pure encodings of the logical
//!   input; inputs that render identically as text but differ structurally
//!   never share a slot, and unkeyable inputs fail loudly.
//! - **Bounded trees**: decomposition is depth-bounded (`truncated` flag)
//!   and cycle-safe (`cyclic` flag) with two independent guards.
//! - **Bounded caches**: LRU eviction keeps every cache at or below its
//!   configured capacity.
//! - **Data failures are data**: unclassifiable signatures and unresolvable
//!   references come back as flagged values, never as errors; only
//!   misconfiguration is fatal.
//!
//! # Core Modules
//!
//! - [`cache`] - Bounded memoization primitive: LRU eviction, statistics
//! - [`decompose`] - Recursive signature expansion into property trees
//! - [`parser`] - Type-shape classification boundary and default parser
//! - [`resolver`] - Cross-reference resolution against a symbol table
//! - [`coordinator`] - Coordinated cache ownership, presets, shared instance
//! - [`core`] - Error taxonomy and user-friendly error reporting
//!
//! # Usage
//!
//! ```rust
//! use sigtree::coordinator::{CacheCoordinator, CacheConfig};
//!
//! # fn main() -> anyhow::Result<()> {
//! let coordinator = CacheCoordinator::new(CacheConfig::default())?;
//!
//! // Decompose a type signature into a renderable tree
//! let tree = coordinator.decompose("{ id: number; tags?: string[] }");
//! assert_eq!(tree.children.len(), 2);
//!
//! // Formatting variants share one cached tree
//! let again = coordinator.decompose("{id:number;tags?:string[]}");
//! assert_eq!(coordinator.statistics().type_cache.hit_count, 1);
//! # let _ = again;
//! # Ok(())
//! # }
//! ```

// Core functionality modules
pub mod cache;
pub mod coordinator;
pub mod core;
pub mod decompose;
pub mod resolver;

// Collaborator boundaries
pub mod parser;
