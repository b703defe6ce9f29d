// ── Value ─────────────────────────────────────────────────────────────────

/// A literal value on the right-hand side of a property.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Quoted string: `"hello"` or `'red'`
    Str(String),
    /// Floating-point literal: `16.0` or `16`
    Number(f32),
    /// Color literal: `#rrggbb` / `#rrggbbaa`, straight-alpha bytes.
    Color([u8; 4]),
    /// Unquoted identifier: booleans, named colors, enum variants, `parent`.
    Ident(String),
}

impl Value {
    /// Short type name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Number(_) => "number",
            Value::Color(_) => "color",
            Value::Ident(_) => "identifier",
        }
    }

    pub fn as_number(&self) -> Option<f32> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// `true`/`false` identifiers; numbers are truthy when non-zero.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Ident(s) if s == "true" => Some(true),
            Value::Ident(s) if s == "false" => Some(false),
            Value::Number(n) => Some(*n != 0.0),
            _ => None,
        }
    }

    /// Strings and identifiers both read as text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Str(s) | Value::Ident(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

// ── Prop ──────────────────────────────────────────────────────────────────

/// A single `key: value` property inside an element block.
#[derive(Debug, Clone, PartialEq)]
pub struct Prop {
    pub key: String,
    pub value: Value,
    pub line: usize,
    pub col: usize,
}

// ── Node ──────────────────────────────────────────────────────────────────

/// An element instantiation in the scene tree.
///
/// ```lml
/// Rectangle {
///     color: 'red'
///     radius: 8
///     VideoItem { fill: parent }
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Element type name or component alias: `"Rectangle"`, `"Badge"`.
    pub element: String,
    /// Optional inline string content after the element name.
    pub content: Option<String>,
    pub props: Vec<Prop>,
    pub children: Vec<Node>,
    pub line: usize,
    pub col: usize,
}

impl Node {
    /// Look up a property value by key. The last assignment wins.
    pub fn prop(&self, key: &str) -> Option<&Value> {
        self.props.iter().rev().find(|p| p.key == key).map(|p| &p.value)
    }

    pub fn prop_f32(&self, key: &str) -> Option<f32> {
        self.prop(key)?.as_number()
    }

    pub fn prop_str(&self, key: &str) -> Option<&str> {
        self.prop(key)?.as_text()
    }

    /// Depth-first count of this node and all descendants.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Node::subtree_len).sum::<usize>()
    }
}

// ── Import ────────────────────────────────────────────────────────────────

/// `import "path/to/badge.lml" as Badge`
#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub path: String,
    pub alias: String,
    pub line: usize,
    pub col: usize,
}

// ── Document ──────────────────────────────────────────────────────────────

/// Top-level parse result.
///
/// `root` is `None` for a document that only holds imports and comments.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub imports: Vec<Import>,
    pub root: Option<Node>,
}
