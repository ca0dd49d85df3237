//! Recursive type decomposition into renderable property trees.
//!
//! [`TypeDecomposer`] expands a type signature into a [`PropertyNode`] tree
//! for nested-type display. Shape classification is delegated to the
//! [`ShapeParser`](crate::parser::ShapeParser) collaborator; this module owns
//! the recursion and its two independent safety guards:
//!
//! - **Depth guard**: a composite node at `depth >= max_depth` is emitted
//!   with `truncated = true` and no children. The default budget is
//!   [`DEFAULT_MAX_DEPTH`].
//! - **Cycle guard**: an explicit set of the normalized signatures currently
//!   being decomposed on the active call chain. A signature that reappears
//!   on its own chain is emitted with `cyclic = true` and no children,
//!   regardless of the remaining depth budget — a cycle can be declared well
//!   inside it.
//!
//! Decomposition is memoized behind a [`MemoizingCache`] keyed by the
//! [`normalize_signature`] canonical form, so syntactically different but
//! semantically identical signatures share one cached tree. Only the
//! top-level signature is cached directly; nested sub-decompositions benefit
//! transitively when they later arrive as top-level requests.
//!
//! No input shape makes decomposition fail: blank signatures become plain
//! leaves, unclassifiable ones become leaves flagged `parse_failed`.
//!
//! # Examples
//!
//! ```rust
//! use sigtree::decompose::TypeDecomposer;
//!
//! let mut decomposer = TypeDecomposer::new();
//! let tree = decomposer.decompose("{ id: number; name?: string }");
//!
//! assert_eq!(tree.children.len(), 2);
//! assert_eq!(tree.children[0].name, "id");
//! assert!(!tree.children[1].required);
//! ```

use crate::cache::{CacheSettings, CacheStatistics, MemoizingCache};
use crate::core::error::SigtreeError;
use crate::parser::{ShapeParser, StructuralParser, TypeShape};
use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};
use tracing::{debug, trace};

/// Default recursion budget for decomposition.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Name given to the synthetic root node of a decomposed signature.
const ROOT_NAME: &str = "root";

/// One node in a decomposed type tree: a named field and its nested shape.
///
/// Forms a tree in which a parent exclusively owns its children — no
/// sharing, no back-references. The flag fields record how the node was
/// produced: `truncated` for the depth guard, `cyclic` for the cycle guard,
/// `parse_failed` for signatures the shape parser could not classify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyNode {
    /// Field name, or `"root"` for the tree root.
    pub name: String,
    /// The type text shown for this node, as written in the source.
    pub type_annotation: String,
    /// Documentation text attached to the field.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    /// Whether the field must be present (`false` for optional members).
    pub required: bool,
    /// Whether the field is marked deprecated.
    pub deprecated: bool,
    /// Declared default value, verbatim.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub default_value: Option<String>,
    /// Nested properties, in declaration order.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub children: Vec<PropertyNode>,
    /// Distance from the root (root is 0).
    pub depth: usize,
    /// The depth guard stopped expansion here.
    pub truncated: bool,
    /// The cycle guard stopped expansion here.
    pub cyclic: bool,
    /// The shape parser could not classify this signature.
    pub parse_failed: bool,
}

impl PropertyNode {
    /// A leaf node with no children and no failure flags.
    #[must_use]
    pub fn leaf(name: impl Into<String>, type_annotation: impl Into<String>, depth: usize) -> Self {
        Self {
            name: name.into(),
            type_annotation: type_annotation.into(),
            description: None,
            required: true,
            deprecated: false,
            default_value: None,
            children: Vec::new(),
            depth,
            truncated: false,
            cyclic: false,
            parse_failed: false,
        }
    }

    /// Total number of nodes in this subtree, including `self`.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Self::node_count).sum::<usize>()
    }
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static pattern"))
}

fn punctuation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*([{}\[\]<>(),;:|&?=])\s*").expect("static pattern"))
}

fn dangling_separator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[;,]+([}\)\]])").expect("static pattern"))
}

/// Canonicalizes a signature for cache keying.
///
/// Whitespace- and formatting-insensitive: runs of whitespace collapse,
/// spacing around structural punctuation disappears, and trailing member
/// separators are dropped, so `{ a : string ; }` and `{a:string}` share one
/// key. The canonical form preserves every character that carries meaning;
/// it is a pure function of the signature text.
///
/// # Examples
///
/// ```rust
/// use sigtree::decompose::normalize_signature;
///
/// assert_eq!(
///     normalize_signature("{  a :  string ; }"),
///     normalize_signature("{a:string}"),
/// );
/// assert_ne!(
///     normalize_signature("{ a: string }"),
///     normalize_signature("{ b: string }"),
/// );
/// ```
#[must_use]
pub fn normalize_signature(signature: &str) -> String {
    let collapsed = whitespace_re().replace_all(signature.trim(), " ");
    let tightened = punctuation_re().replace_all(&collapsed, "$1");
    let cleaned = dangling_separator_re().replace_all(&tightened, "$1");
    cleaned.trim_end_matches([';', ',']).to_string()
}

/// Expands type signatures into [`PropertyNode`] trees, memoized.
///
/// Constructed once per documentation-generation run (or shared through the
/// [`CacheCoordinator`](crate::coordinator::CacheCoordinator)). The
/// decomposer never fails on input data; only construction with invalid
/// options is fallible.
pub struct TypeDecomposer {
    parser: Box<dyn ShapeParser + Send>,
    max_depth: usize,
    cache: Option<MemoizingCache<String, Arc<PropertyNode>>>,
}

impl std::fmt::Debug for TypeDecomposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeDecomposer")
            .field("max_depth", &self.max_depth)
            .field("cached", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for TypeDecomposer {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeDecomposer {
    /// Creates an uncached decomposer with the [`StructuralParser`] and the
    /// default depth budget.
    #[must_use]
    pub fn new() -> Self {
        Self::with_parser(Box::new(StructuralParser::new()))
    }

    /// Creates an uncached decomposer using a custom shape parser.
    #[must_use]
    pub fn with_parser(parser: Box<dyn ShapeParser + Send>) -> Self {
        Self {
            parser,
            max_depth: DEFAULT_MAX_DEPTH,
            cache: None,
        }
    }

    /// Sets the recursion budget.
    ///
    /// # Errors
    ///
    /// Returns [`SigtreeError::InvalidMaxDepth`] if `max_depth` is zero.
    pub fn with_max_depth(mut self, max_depth: usize) -> Result<Self> {
        if max_depth == 0 {
            return Err(SigtreeError::InvalidMaxDepth { depth: max_depth }.into());
        }
        self.max_depth = max_depth;
        Ok(self)
    }

    /// Wraps decomposition in a memoizing cache.
    ///
    /// Settings with `enabled: false` leave the decomposer uncached.
    ///
    /// # Errors
    ///
    /// Returns [`SigtreeError::InvalidCacheSize`] for enabled settings with
    /// a zero capacity.
    pub fn with_cache(mut self, settings: &CacheSettings, enable_stats: bool) -> Result<Self> {
        self.cache = if settings.enabled {
            Some(MemoizingCache::from_settings("type", settings, enable_stats)?)
        } else {
            None
        };
        Ok(self)
    }

    /// The configured recursion budget.
    #[must_use]
    pub const fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Decomposes `signature` into a property tree.
    ///
    /// Infallible for all inputs: blank signatures yield a plain leaf,
    /// unclassifiable ones a leaf with `parse_failed = true`. Repeated calls
    /// with formatting variants of one signature return the same cached
    /// tree.
    pub fn decompose(&mut self, signature: &str) -> Arc<PropertyNode> {
        let key = normalize_signature(signature);
        if let Some(cache) = &mut self.cache {
            if let Some(hit) = cache.get(&key) {
                return hit;
            }
        }

        debug!(signature = %key, "decomposing type signature");
        let mut active = HashSet::new();
        let root = Arc::new(self.expand(ROOT_NAME, signature, 0, &mut active));
        if let Some(cache) = &mut self.cache {
            cache.set(key, Arc::clone(&root));
        }
        root
    }

    /// Statistics snapshot of the decomposition cache.
    ///
    /// Reports the all-zero snapshot when caching is disabled.
    #[must_use]
    pub fn stats(&self) -> CacheStatistics {
        self.cache
            .as_ref()
            .map_or_else(CacheStatistics::empty, MemoizingCache::stats)
    }

    /// Empties the decomposition cache and resets its counters.
    pub fn clear_cache(&mut self) {
        if let Some(cache) = &mut self.cache {
            cache.clear();
        }
    }

    /// Recursive expansion worker.
    ///
    /// `active` holds the normalized signatures currently being decomposed
    /// on this call chain; membership means re-entry, which the cycle guard
    /// turns into a `cyclic` leaf.
    fn expand(
        &self,
        name: &str,
        signature: &str,
        depth: usize,
        active: &mut HashSet<String>,
    ) -> PropertyNode {
        let trimmed = signature.trim();
        let mut node = PropertyNode::leaf(name, trimmed, depth);
        if trimmed.is_empty() {
            return node;
        }

        let key = normalize_signature(trimmed);
        if active.contains(&key) {
            trace!(signature = %key, depth, "cycle detected on active decomposition path");
            node.cyclic = true;
            return node;
        }

        match self.parser.classify(trimmed) {
            TypeShape::Unknown => {
                trace!(signature = %key, "shape parser could not classify signature");
                node.parse_failed = true;
                node
            }
            TypeShape::Primitive { .. } => node,
            TypeShape::Object { members } => {
                if depth >= self.max_depth {
                    node.truncated = true;
                    return node;
                }
                active.insert(key.clone());
                for member in members {
                    let mut child =
                        self.expand(&member.name, &member.type_signature, depth + 1, active);
                    child.required = !member.optional;
                    child.deprecated = member.deprecated;
                    child.description = member.description;
                    child.default_value = member.default_value;
                    node.children.push(child);
                }
                active.remove(&key);
                node
            }
            TypeShape::Array { element } => {
                if depth >= self.max_depth {
                    node.truncated = true;
                    return node;
                }
                // The array node adopts its element type's expansion; the
                // element's guard flags carry over so cycles and truncation
                // inside the element stay visible.
                active.insert(key.clone());
                let expanded = self.expand(name, &element, depth, active);
                active.remove(&key);
                node.children = expanded.children;
                node.cyclic = expanded.cyclic;
                node.truncated = expanded.truncated;
                node
            }
            TypeShape::Union { variants } => {
                if depth >= self.max_depth {
                    node.truncated = true;
                    return node;
                }
                active.insert(key.clone());
                for variant in variants {
                    // A union member has no declared name; the variant text
                    // stands in for one.
                    node.children
                        .push(self.expand(&variant, &variant, depth + 1, active));
                }
                active.remove(&key);
                node
            }
            TypeShape::Alias { target } => {
                if depth >= self.max_depth {
                    node.truncated = true;
                    return node;
                }
                active.insert(key.clone());
                let mut expanded = self.expand(name, &target, depth, active);
                active.remove(&key);
                // Aliases are transparent: the tree comes from the target,
                // the annotation stays the alias text.
                expanded.type_annotation = node.type_annotation;
                expanded
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::MemberShape;
    use std::collections::HashMap;

    /// Table-driven parser for shapes the structural parser cannot see
    /// (aliases, member metadata).
    struct TableParser {
        shapes: HashMap<String, TypeShape>,
    }

    impl TableParser {
        fn new(entries: Vec<(&str, TypeShape)>) -> Self {
            Self {
                shapes: entries
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
            }
        }
    }

    impl ShapeParser for TableParser {
        fn classify(&self, signature: &str) -> TypeShape {
            self.shapes
                .get(signature.trim())
                .cloned()
                .unwrap_or_else(|| StructuralParser::new().classify(signature))
        }
    }

    fn cached_decomposer() -> TypeDecomposer {
        TypeDecomposer::new()
            .with_cache(&CacheSettings::with_max_size(16), true)
            .unwrap()
    }

    #[test]
    fn test_blank_signature_yields_plain_leaf() {
        let mut decomposer = TypeDecomposer::new();
        for signature in ["", "   ", "\n\t"] {
            let tree = decomposer.decompose(signature);
            assert!(tree.children.is_empty());
            assert!(!tree.parse_failed);
            assert!(!tree.truncated);
            assert!(!tree.cyclic);
        }
    }

    #[test]
    fn test_unclassifiable_signature_yields_parse_failed_leaf() {
        let mut decomposer = TypeDecomposer::new();
        let tree = decomposer.decompose("{ a: string");
        assert!(tree.parse_failed);
        assert!(tree.children.is_empty());
        assert_eq!(tree.type_annotation, "{ a: string");
    }

    #[test]
    fn test_object_members_become_children_with_metadata() {
        let mut decomposer = TypeDecomposer::new();
        let tree = decomposer.decompose("{ id: number; name?: string }");
        assert_eq!(tree.name, "root");
        assert_eq!(tree.children.len(), 2);
        assert!(tree.children[0].required);
        assert!(!tree.children[1].required);
        assert_eq!(tree.children[1].depth, 1);
    }

    #[test]
    fn test_depth_guard_scenario() {
        // maxDepth=2 truncates at the node two levels down
        let mut decomposer = TypeDecomposer::new().with_max_depth(2).unwrap();
        let tree = decomposer.decompose("{ a: { b: { c: string } } }");

        let a = &tree.children[0];
        assert_eq!(a.name, "a");
        assert!(!a.truncated);

        let b = &a.children[0];
        assert_eq!(b.name, "b");
        assert_eq!(b.depth, 2);
        assert!(b.truncated);
        assert!(b.children.is_empty());
    }

    #[test]
    fn test_deep_nesting_terminates_within_budget() {
        let mut signature = "string".to_string();
        for _ in 0..200 {
            signature = format!("{{ next: {signature} }}");
        }
        let mut decomposer = TypeDecomposer::new();
        let tree = decomposer.decompose(&signature);

        let mut node = &*tree;
        while !node.children.is_empty() {
            node = &node.children[0];
        }
        assert_eq!(node.depth, DEFAULT_MAX_DEPTH);
        assert!(node.truncated);
    }

    #[test]
    fn test_self_referential_object_is_cyclic() {
        let parser = TableParser::new(vec![(
            "Node",
            TypeShape::Object {
                members: vec![
                    MemberShape::new("value", "string"),
                    MemberShape::new("next", "Node"),
                ],
            },
        )]);
        let mut decomposer = TypeDecomposer::with_parser(Box::new(parser));
        let tree = decomposer.decompose("Node");

        let next = &tree.children[1];
        assert!(next.cyclic);
        assert!(next.children.is_empty());
        // Well within the depth budget: the cycle guard fired, not the
        // depth guard.
        assert!(!next.truncated);
    }

    #[test]
    fn test_mutually_referential_objects_terminate() {
        let parser = TableParser::new(vec![
            (
                "A",
                TypeShape::Object {
                    members: vec![MemberShape::new("b", "B")],
                },
            ),
            (
                "B",
                TypeShape::Object {
                    members: vec![MemberShape::new("a", "A")],
                },
            ),
        ]);
        let mut decomposer = TypeDecomposer::with_parser(Box::new(parser));
        let tree = decomposer.decompose("A");

        let b = &tree.children[0];
        let a_again = &b.children[0];
        assert!(a_again.cyclic);
    }

    #[test]
    fn test_sibling_reuse_is_not_a_cycle() {
        // The same signature in two sibling members is legitimate reuse;
        // only re-entry on the active chain is a cycle.
        let mut decomposer = TypeDecomposer::new();
        let tree = decomposer.decompose("{ a: { x: string }; b: { x: string } }");
        assert_eq!(tree.children.len(), 2);
        assert!(!tree.children[0].cyclic);
        assert!(!tree.children[1].cyclic);
        assert_eq!(tree.children[1].children.len(), 1);
    }

    #[test]
    fn test_union_expands_one_child_per_variant() {
        let mut decomposer = TypeDecomposer::new();
        let tree = decomposer.decompose("{ a: string } | null");
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[0].children.len(), 1);
        assert_eq!(tree.children[1].type_annotation, "null");
    }

    #[test]
    fn test_array_adopts_element_expansion() {
        let mut decomposer = TypeDecomposer::new();
        let tree = decomposer.decompose("{ id: number }[]");
        assert_eq!(tree.type_annotation, "{ id: number }[]");
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].name, "id");
    }

    #[test]
    fn test_alias_expands_transparently_and_detects_self_alias() {
        let parser = TableParser::new(vec![
            ("Options", TypeShape::Alias {
                target: "{ verbose: boolean }".to_string(),
            }),
            ("Loop", TypeShape::Alias {
                target: "Loop".to_string(),
            }),
        ]);
        let mut decomposer = TypeDecomposer::with_parser(Box::new(parser));

        let tree = decomposer.decompose("Options");
        assert_eq!(tree.type_annotation, "Options");
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].name, "verbose");

        let looped = decomposer.decompose("Loop");
        assert!(looped.cyclic);
        assert!(looped.children.is_empty());
    }

    #[test]
    fn test_cold_and_warm_decomposition_are_structurally_equal() {
        let mut decomposer = cached_decomposer();
        let cold = decomposer.decompose("{ a: { b: string } }");
        let warm = decomposer.decompose("{ a: { b: string } }");
        assert_eq!(cold, warm);
        assert!(Arc::ptr_eq(&cold, &warm));
    }

    #[test]
    fn test_formatting_variants_share_one_cache_entry() {
        let mut decomposer = cached_decomposer();
        let first = decomposer.decompose("{a:string}");
        let second = decomposer.decompose("{  a :  string ; }");
        assert!(Arc::ptr_eq(&first, &second));

        let stats = decomposer.stats();
        assert_eq!(stats.size, 1);
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
    }

    #[test]
    fn test_distinct_signatures_get_distinct_entries() {
        let mut decomposer = cached_decomposer();
        decomposer.decompose("{ a: string }");
        decomposer.decompose("{ b: string }");
        assert_eq!(decomposer.stats().size, 2);
    }

    #[test]
    fn test_zero_max_depth_is_rejected() {
        let err = TypeDecomposer::new().with_max_depth(0).unwrap_err();
        let err = err.downcast_ref::<SigtreeError>().unwrap();
        assert!(matches!(err, SigtreeError::InvalidMaxDepth { depth: 0 }));
    }

    #[test]
    fn test_disabled_cache_settings_leave_decomposer_uncached() {
        let mut decomposer = TypeDecomposer::new()
            .with_cache(&CacheSettings::disabled(), true)
            .unwrap();
        decomposer.decompose("{ a: string }");
        decomposer.decompose("{ a: string }");

        let stats = decomposer.stats();
        assert_eq!(stats, CacheStatistics::empty());
    }

    #[test]
    fn test_normalize_signature_examples() {
        assert_eq!(normalize_signature("{ a : string ; }"), "{a:string}");
        assert_eq!(normalize_signature("string |  number"), "string|number");
        assert_eq!(normalize_signature("  Widget  "), "Widget");
        assert_ne!(
            normalize_signature("{ a: string }"),
            normalize_signature("{ a: number }")
        );
    }

    #[test]
    fn test_node_count_walks_whole_tree() {
        let mut decomposer = TypeDecomposer::new();
        let tree = decomposer.decompose("{ a: { b: string }; c: number }");
        // root + a + b + c
        assert_eq!(tree.node_count(), 4);
    }
}
