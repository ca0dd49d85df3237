//! Type-shape classification boundary.
//!
//! Signature parsing proper belongs to the external source-analysis
//! toolchain; this module defines the seam the decomposer talks through.
//! [`ShapeParser`] classifies an already-extracted signature string into a
//! [`TypeShape`], and [`StructuralParser`] is the bundled default
//! implementation: a small single-pass scanner that recognizes object
//! literals, arrays, unions, and primitives by tracking bracket depth and
//! quoting. Richer parsers (backed by a real type checker) implement the
//! same trait and can additionally report aliases and member metadata such
//! as descriptions and deprecation.
//!
//! A parser never fails: a signature it cannot classify comes back as
//! [`TypeShape::Unknown`], which the decomposer turns into a leaf flagged
//! `parse_failed`.

use serde::{Deserialize, Serialize};

/// The classified shape of a type signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeShape {
    /// An object layout with named members.
    Object {
        /// The object's members in declaration order.
        members: Vec<MemberShape>,
    },
    /// An array of some element type.
    Array {
        /// The element type's signature.
        element: String,
    },
    /// A union of alternative types.
    Union {
        /// The variant signatures in declaration order.
        variants: Vec<String>,
    },
    /// A named alias that stands for another signature.
    ///
    /// Alias resolution needs a symbol table, so [`StructuralParser`] never
    /// produces this variant; table-aware parsers do.
    Alias {
        /// The signature the alias stands for.
        target: String,
    },
    /// A leaf type: built-in primitive, literal, or a bare type reference
    /// this parser cannot see into.
    Primitive {
        /// The primitive or reference name as written.
        name: String,
    },
    /// The parser could not classify the signature.
    Unknown,
}

/// One named member of an object shape.
///
/// The default parser fills in `name`, `type_signature`, and `optional`;
/// the metadata fields are for parsers with access to declaration
/// documentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberShape {
    /// Member name as declared (quotes stripped).
    pub name: String,
    /// Signature of the member's own type.
    pub type_signature: String,
    /// Whether the member was declared optional.
    pub optional: bool,
    /// Whether the member is marked deprecated.
    pub deprecated: bool,
    /// Documentation text attached to the member.
    pub description: Option<String>,
    /// Declared default value, verbatim.
    pub default_value: Option<String>,
}

impl MemberShape {
    /// A member with just a name and type, no metadata.
    #[must_use]
    pub fn new(name: impl Into<String>, type_signature: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_signature: type_signature.into(),
            optional: false,
            deprecated: false,
            description: None,
            default_value: None,
        }
    }
}

/// Classifies type signatures into shapes.
///
/// Implementations must be pure with respect to the signature text: the
/// same input always classifies the same way within a run, since the
/// decomposer memoizes trees keyed by normalized signature.
pub trait ShapeParser {
    /// Classifies `signature`.
    ///
    /// Never fails; unclassifiable input is [`TypeShape::Unknown`].
    fn classify(&self, signature: &str) -> TypeShape;
}

/// Built-in primitive and keyword type names recognized as leaves.
const PRIMITIVE_NAMES: &[&str] = &[
    "string",
    "number",
    "boolean",
    "bigint",
    "symbol",
    "object",
    "null",
    "undefined",
    "void",
    "never",
    "any",
    "unknown",
    "true",
    "false",
];

/// Default [`ShapeParser`]: structural classification without a symbol table.
///
/// Recognizes, in order of precedence:
/// - unions split on `|` at bracket depth zero
/// - object literals `{ name: type; ... }` (`;` or `,` separated, `?` for
///   optional members, quoted and `readonly` names handled)
/// - arrays `T[]`, `Array<T>`, `ReadonlyArray<T>`
/// - primitives, literals, function types, and bare type references, all of
///   which decompose as leaves
///
/// Everything else — unbalanced brackets, member-less fragments — is
/// [`TypeShape::Unknown`].
///
/// # Examples
///
/// ```rust
/// use sigtree::parser::{ShapeParser, StructuralParser, TypeShape};
///
/// let parser = StructuralParser::new();
///
/// match parser.classify("{ id: number; name?: string }") {
///     TypeShape::Object { members } => {
///         assert_eq!(members.len(), 2);
///         assert!(members[1].optional);
///     }
///     other => panic!("expected object, got {other:?}"),
/// }
///
/// assert_eq!(
///     parser.classify("string[]"),
///     TypeShape::Array { element: "string".to_string() }
/// );
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralParser;

impl StructuralParser {
    /// Creates the default structural parser.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ShapeParser for StructuralParser {
    fn classify(&self, signature: &str) -> TypeShape {
        let sig = strip_outer_parens(signature.trim());
        if sig.is_empty() {
            return TypeShape::Unknown;
        }

        let variants = split_top_level(sig, &['|']);
        if variants.len() > 1 {
            return TypeShape::Union { variants };
        }

        if let Some(body) = outermost_brace_body(sig) {
            return classify_object(body);
        }

        if let Some(element) = array_element(sig) {
            return TypeShape::Array { element };
        }

        if is_leaf(sig) {
            return TypeShape::Primitive {
                name: sig.to_string(),
            };
        }

        TypeShape::Unknown
    }
}

/// Parses the body of a brace group into an object shape.
///
/// A blank body is a valid empty object. Entries without a top-level colon
/// keep their raw text as the member name with an empty type, so odd
/// fragments still render instead of vanishing.
fn classify_object(body: &str) -> TypeShape {
    let mut members = Vec::new();
    for entry in split_top_level(body, &[';', ',']) {
        let (raw_name, type_signature) = split_member(&entry);
        let mut name = raw_name.trim();
        let mut optional = false;
        if let Some(stripped) = name.strip_suffix('?') {
            name = stripped.trim_end();
            optional = true;
        }
        if let Some(stripped) = name.strip_prefix("readonly ") {
            name = stripped.trim_start();
        }
        let name = strip_quotes(name);
        if name.is_empty() {
            continue;
        }
        let mut member = MemberShape::new(name, type_signature.trim());
        member.optional = optional;
        members.push(member);
    }
    TypeShape::Object { members }
}

/// Splits a member entry at the first top-level `:` into name and type.
fn split_member(entry: &str) -> (String, String) {
    let mut tracker = DepthTracker::new();
    for (idx, c) in entry.char_indices() {
        if tracker.step(c) && c == ':' {
            return (
                entry[..idx].to_string(),
                entry[idx + c.len_utf8()..].to_string(),
            );
        }
    }
    (entry.to_string(), String::new())
}

/// Splits `input` on any of `separators` occurring at bracket depth zero,
/// outside quotes. Empty pieces are dropped; pieces are trimmed.
fn split_top_level(input: &str, separators: &[char]) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut tracker = DepthTracker::new();
    for c in input.chars() {
        if tracker.step(c) && separators.contains(&c) {
            push_piece(&mut parts, &current);
            current.clear();
        } else {
            current.push(c);
        }
    }
    push_piece(&mut parts, &current);
    parts
}

fn push_piece(parts: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        parts.push(piece.to_string());
    }
}

/// If `sig` is exactly one brace group, returns the body between the braces.
fn outermost_brace_body(sig: &str) -> Option<&str> {
    if !sig.starts_with('{') {
        return None;
    }
    let mut tracker = DepthTracker::new();
    for (idx, c) in sig.char_indices() {
        tracker.step(c);
        if c == '}' && tracker.at_top_level() {
            if idx == sig.len() - 1 {
                return Some(&sig[1..idx]);
            }
            return None;
        }
    }
    None
}

/// Recognizes `T[]`, `Array<T>`, and `ReadonlyArray<T>` at top level.
fn array_element(sig: &str) -> Option<String> {
    if let Some(element) = sig.strip_suffix("[]") {
        let element = element.trim_end();
        if !element.is_empty() && is_balanced(element) {
            return Some(element.to_string());
        }
        return None;
    }
    for wrapper in ["Array<", "ReadonlyArray<"] {
        if let Some(rest) = sig.strip_prefix(wrapper) {
            if let Some(inner) = rest.strip_suffix('>') {
                if !inner.trim().is_empty() && is_balanced(inner) {
                    return Some(inner.trim().to_string());
                }
            }
        }
    }
    None
}

/// Whether `sig` decomposes as a leaf: primitive keyword, literal, function
/// type, or bare (possibly generic, possibly dotted) type reference.
fn is_leaf(sig: &str) -> bool {
    if PRIMITIVE_NAMES.contains(&sig) {
        return true;
    }
    // String literal types
    if (sig.starts_with('\'') && sig.ends_with('\'') && sig.len() >= 2)
        || (sig.starts_with('"') && sig.ends_with('"') && sig.len() >= 2)
        || (sig.starts_with('`') && sig.ends_with('`') && sig.len() >= 2)
    {
        return true;
    }
    // Numeric literal types
    if sig.parse::<f64>().is_ok() {
        return true;
    }
    // Function types stay opaque leaves
    if contains_top_level_arrow(sig) {
        return is_balanced(sig);
    }
    is_type_reference(sig)
}

/// Whether `sig` looks like `Ident`, `Ident.Path`, or `Ident<Args>`.
fn is_type_reference(sig: &str) -> bool {
    let (path, generics) = match sig.find('<') {
        Some(idx) => {
            if !sig.ends_with('>') {
                return false;
            }
            (&sig[..idx], &sig[idx..])
        }
        None => (sig, ""),
    };
    if !generics.is_empty() && !is_balanced(generics) {
        return false;
    }
    !path.is_empty()
        && path.split('.').all(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) if first.is_alphabetic() || first == '_' || first == '$' => {
                    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
                }
                _ => false,
            }
        })
}

/// Whether `=>` occurs at bracket depth zero.
fn contains_top_level_arrow(sig: &str) -> bool {
    let mut tracker = DepthTracker::new();
    let mut previous = ' ';
    for c in sig.chars() {
        let top = tracker.step(c);
        if top && previous == '=' && c == '>' {
            return true;
        }
        previous = c;
    }
    false
}

/// Whether every bracket in `sig` closes in order.
fn is_balanced(sig: &str) -> bool {
    let mut tracker = DepthTracker::new();
    for c in sig.chars() {
        tracker.step(c);
    }
    tracker.at_top_level() && !tracker.in_quote()
}

/// Strips parens that wrap the entire signature, repeatedly.
fn strip_outer_parens(sig: &str) -> &str {
    let mut current = sig;
    loop {
        let trimmed = current.trim();
        if !trimmed.starts_with('(') || !trimmed.ends_with(')') {
            return trimmed;
        }
        let mut tracker = DepthTracker::new();
        let mut wraps_whole = false;
        for (idx, c) in trimmed.char_indices() {
            tracker.step(c);
            if c == ')' && tracker.at_top_level() {
                wraps_whole = idx == trimmed.len() - 1;
                break;
            }
        }
        if !wraps_whole {
            return trimmed;
        }
        current = &trimmed[1..trimmed.len() - 1];
    }
}

fn strip_quotes(name: &str) -> &str {
    if name.len() >= 2 {
        for quote in ['\'', '"'] {
            if name.starts_with(quote) && name.ends_with(quote) {
                return &name[1..name.len() - 1];
            }
        }
    }
    name
}

/// Tracks bracket depth and quoting across a single left-to-right scan.
///
/// `step` consumes one character and reports whether the scanner was at
/// top level (depth zero, outside quotes) *before* structural characters
/// take effect — separators are recognized at top level, opening brackets
/// are not split points themselves.
#[derive(Debug, Default)]
struct DepthTracker {
    brace: u32,
    bracket: u32,
    paren: u32,
    angle: u32,
    quote: Option<char>,
    escaped: bool,
}

impl DepthTracker {
    fn new() -> Self {
        Self::default()
    }

    /// Consumes `c`; returns `true` when `c` sits at top level.
    fn step(&mut self, c: char) -> bool {
        if self.escaped {
            self.escaped = false;
            return false;
        }
        if let Some(q) = self.quote {
            if c == '\\' {
                self.escaped = true;
            } else if c == q {
                self.quote = None;
            }
            return false;
        }
        match c {
            '\'' | '"' | '`' => {
                self.quote = Some(c);
                false
            }
            '{' => {
                self.brace += 1;
                false
            }
            '}' => {
                self.brace = self.brace.saturating_sub(1);
                self.at_depth_zero()
            }
            '[' => {
                self.bracket += 1;
                false
            }
            ']' => {
                self.bracket = self.bracket.saturating_sub(1);
                self.at_depth_zero()
            }
            '(' => {
                self.paren += 1;
                false
            }
            ')' => {
                self.paren = self.paren.saturating_sub(1);
                self.at_depth_zero()
            }
            '<' => {
                self.angle += 1;
                false
            }
            '>' => {
                // `=>` and comparison-free type text never open with '<'
                self.angle = self.angle.saturating_sub(1);
                self.at_depth_zero()
            }
            _ => self.at_depth_zero(),
        }
    }

    fn at_depth_zero(&self) -> bool {
        self.brace == 0 && self.bracket == 0 && self.paren == 0 && self.angle == 0
    }

    /// Whether the whole scan so far has returned to depth zero.
    fn at_top_level(&self) -> bool {
        self.at_depth_zero()
    }

    fn in_quote(&self) -> bool {
        self.quote.is_some()
    }
}
