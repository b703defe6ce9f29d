//! Lexer, parser, and AST for the **Lumen Markup Language** (`.lml`).
//!
//! Scene descriptions for the video overlay are written in this language.
//! The crate has no dependencies so editors and linters can use it without
//! any engine or GPU code.
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`ast`] | `Document`, `Node`, `Prop`, `Value`, `Import` |
//! | [`error`] | `ParseError`, `ParseErrorKind` |
//! | [`lexer`] | `Lexer`, `Token`, `parse_hex_color` |
//! | [`parser`] | `parse_str` entry point |
//!
//! ```rust
//! use lumen_markup::parse_str;
//!
//! let src = r#"
//!     Item {
//!         VideoItem { fill: parent }
//!         Rectangle { x: 16; y: 16; width: 120; height: 32; color: '#00000080' }
//!     }
//! "#;
//!
//! let doc = parse_str(src).unwrap();
//! assert_eq!(doc.root.unwrap().children.len(), 2);
//! ```

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;

pub use ast::{Document, Node, Prop, Value};
pub use error::{ParseError, ParseErrorKind};
pub use parser::parse_str;

#[cfg(test)]
mod parse_tests {
    use super::*;

    fn ok(src: &str) -> Document { parse_str(src).unwrap() }
    fn err(src: &str) -> ParseError { parse_str(src).unwrap_err() }

    #[test] fn empty_element() { ok("Item { }"); }
    #[test] fn element_without_block() { ok("VideoItem"); }
    #[test] fn quoted_color_prop() {
        let doc = ok("Rectangle { color: 'red' }");
        let root = doc.root.unwrap();
        assert_eq!(root.element, "Rectangle");
        assert_eq!(root.prop_str("color"), Some("red"));
    }
    #[test] fn nested_elements() {
        let doc = ok("Item { Rectangle { Circle { radius: 4 } } VideoItem { } }");
        assert_eq!(doc.root.unwrap().subtree_len(), 4);
    }
    #[test] fn semicolons_between_props() {
        let doc = ok("Rectangle { x: 1; y: 2; width: 3, height: 4 }");
        assert_eq!(doc.root.unwrap().props.len(), 4);
    }
    #[test] fn comments() {
        ok("/* header */ Item { // inside\n x: 8 /* tail */ }");
    }
    #[test] fn hex_color_literal() {
        let doc = ok("Rectangle { color: #ff000080 }");
        assert_eq!(doc.root.unwrap().prop("color"), Some(&Value::Color([255, 0, 0, 128])));
    }
    #[test] fn negative_and_float_numbers() {
        let doc = ok("Item { x: -10  opacity: 0.75 }");
        let root = doc.root.unwrap();
        assert_eq!(root.prop_f32("x"), Some(-10.0));
        assert_eq!(root.prop_f32("opacity"), Some(0.75));
    }
    #[test] fn last_assignment_wins() {
        let doc = ok("Item { x: 1 x: 2 }");
        assert_eq!(doc.root.unwrap().prop_f32("x"), Some(2.0));
    }
    #[test] fn import_as() {
        let doc = ok(r#"import "badge.lml" as Badge  Item { Badge { } }"#);
        assert_eq!(doc.imports[0].alias, "Badge");
        assert_eq!(doc.imports[0].path, "badge.lml");
    }
    #[test] fn comment_only_document_has_no_root() {
        let doc = ok("// nothing to draw yet\n");
        assert!(doc.root.is_none());
    }
    #[test] fn imports_only_document_has_no_root() {
        let doc = ok(r#"import "a.lml" as A"#);
        assert!(doc.root.is_none());
        assert_eq!(doc.imports.len(), 1);
    }
    #[test] fn node_positions() {
        let doc = ok("Item {\n    Rectangle { }\n}");
        let child = &doc.root.unwrap().children[0];
        assert_eq!((child.line, child.col), (2, 5));
    }

    #[test] fn err_two_roots() {
        let e = err("Item { } Item { }");
        assert!(e.message.contains("one root"));
    }
    #[test] fn err_bad_color() { err("Rectangle { color: #xyz }"); }
    #[test] fn err_unclosed_string() { err("Rectangle { color: 'red }"); }
    #[test] fn err_unclosed_block() {
        let e = err("Item {\n  x: 1\n");
        assert!(e.message.contains("unclosed"));
    }
    #[test] fn err_double_colon() {
        let e = err("Item { x: : 8 }");
        assert_eq!((e.line, e.col), (1, 11));
    }
    #[test] fn err_display_has_position() {
        let e = err("Item { @ }");
        assert_eq!(e.to_string(), "1:8: unexpected character '@'");
    }
}
