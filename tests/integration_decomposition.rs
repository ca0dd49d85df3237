//! Integration tests for type decomposition: determinism, depth and cycle
//! guards, normalization-driven cache sharing, and the rendered JSON shape.

use anyhow::Result;
use sigtree::cache::CacheSettings;
use sigtree::coordinator::{CacheConfig, CacheCoordinator};
use sigtree::decompose::{DEFAULT_MAX_DEPTH, PropertyNode, TypeDecomposer};
use sigtree::parser::{MemberShape, ShapeParser, StructuralParser, TypeShape};
use std::collections::HashMap;
use std::sync::Arc;

/// Parser stub with a fixed symbol table, for shapes the structural parser
/// cannot see on its own (named types, aliases, member documentation).
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

#[test]
fn test_cold_and_warm_trees_are_structurally_equal() -> Result<()> {
    let coordinator = CacheCoordinator::new(CacheConfig::default())?;
    let signature = "{ id: number; nested: { flag: boolean } }";

    let cold = coordinator.decompose(signature);
    let warm = coordinator.decompose(signature);

    assert_eq!(cold, warm);
    assert!(Arc::ptr_eq(&cold, &warm));
    Ok(())
}

#[test]
fn test_depth_guard_truncates_at_the_configured_boundary() -> Result<()> {
    let mut config = CacheConfig::default();
    config.max_depth = 2;
    let coordinator = CacheCoordinator::new(config)?;

    let tree = coordinator.decompose("{ a: { b: { c: string } } }");
    assert_eq!(tree.name, "root");

    let a = &tree.children[0];
    let b = &a.children[0];
    assert_eq!(b.depth, 2);
    assert!(b.truncated);
    assert!(b.children.is_empty());
    Ok(())
}

#[test]
fn test_deeply_nested_signature_terminates_without_overflow() -> Result<()> {
    let mut signature = "string".to_string();
    for _ in 0..500 {
        signature = format!("{{ next: {signature} }}");
    }

    let coordinator = CacheCoordinator::new(CacheConfig::default())?;
    let tree = coordinator.decompose(&signature);

    let mut node: &PropertyNode = &tree;
    while !node.children.is_empty() {
        node = &node.children[0];
    }
    assert_eq!(node.depth, DEFAULT_MAX_DEPTH);
    assert!(node.truncated);
    Ok(())
}

#[test]
fn test_self_referential_shape_is_flagged_cyclic_not_recursed() -> Result<()> {
    let parser = TableParser::new(vec![(
        "TreeNode",
        TypeShape::Object {
            members: vec![
                MemberShape::new("label", "string"),
                MemberShape::new("children", "TreeNode[]"),
            ],
        },
    )]);
    let coordinator = CacheCoordinator::with_parser(CacheConfig::default(), Box::new(parser))?;

    let tree = coordinator.decompose("TreeNode");
    let children_member = &tree.children[1];

    // The array element re-enters TreeNode on the active chain
    assert!(children_member.cyclic);
    assert!(children_member.children.is_empty());
    assert!(!children_member.truncated);
    Ok(())
}

#[test]
fn test_member_documentation_flows_onto_nodes() -> Result<()> {
    let mut deprecated_member = MemberShape::new("legacyId", "string");
    deprecated_member.deprecated = true;
    deprecated_member.description = Some("Use `id` instead.".to_string());
    let mut defaulted_member = MemberShape::new("retries", "number");
    defaulted_member.optional = true;
    defaulted_member.default_value = Some("3".to_string());

    let parser = TableParser::new(vec![(
        "Options",
        TypeShape::Object {
            members: vec![deprecated_member, defaulted_member],
        },
    )]);
    let coordinator = CacheCoordinator::with_parser(CacheConfig::default(), Box::new(parser))?;

    let tree = coordinator.decompose("Options");
    assert!(tree.children[0].deprecated);
    assert_eq!(
        tree.children[0].description.as_deref(),
        Some("Use `id` instead.")
    );
    assert!(!tree.children[1].required);
    assert_eq!(tree.children[1].default_value.as_deref(), Some("3"));
    Ok(())
}

#[test]
fn test_formatting_variants_share_one_cached_tree() -> Result<()> {
    let coordinator = CacheCoordinator::new(CacheConfig::default())?;

    let first = coordinator.decompose("{ items : string[] ; }");
    let second = coordinator.decompose("{items:string[]}");

    assert!(Arc::ptr_eq(&first, &second));
    let stats = coordinator.statistics().type_cache;
    assert_eq!(stats.size, 1);
    assert_eq!(stats.hit_count, 1);
    Ok(())
}

#[test]
fn test_unparseable_signature_flows_through_as_flagged_leaf() -> Result<()> {
    let coordinator = CacheCoordinator::new(CacheConfig::default())?;

    let tree = coordinator.decompose("{ broken: ");
    assert!(tree.parse_failed);
    assert_eq!(tree.type_annotation, "{ broken:");
    assert!(tree.children.is_empty());

    let blank = coordinator.decompose("   ");
    assert!(!blank.parse_failed);
    assert!(blank.children.is_empty());
    Ok(())
}

#[test]
fn test_type_cache_stays_bounded_under_many_signatures() -> Result<()> {
    let mut decomposer = TypeDecomposer::new()
        .with_cache(&CacheSettings::with_max_size(8), true)
        .unwrap();

    for i in 0..50 {
        decomposer.decompose(&format!("{{ field{i}: string }}"));
    }
    assert_eq!(decomposer.stats().size, 8);
    Ok(())
}

#[test]
fn test_rendered_json_shape_for_the_rendering_layer() -> Result<()> {
    let coordinator = CacheCoordinator::new(CacheConfig::default())?;
    let tree = coordinator.decompose("{ id: number; name?: string }");

    let rendered = serde_json::to_value(&*tree)?;
    assert_eq!(rendered["name"], "root");
    assert_eq!(rendered["children"][0]["name"], "id");
    assert_eq!(rendered["children"][1]["required"], false);
    // Empty options and child lists stay out of the payload
    assert!(rendered["children"][0].get("description").is_none());
    assert!(rendered["children"][0].get("children").is_none());
    Ok(())
}
