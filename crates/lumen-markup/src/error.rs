use std::fmt;

/// Which stage rejected the source.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Bad characters, literals, or unterminated strings.
    Lexical,
    /// Well-formed tokens in the wrong order.
    Syntax,
}

/// A parse error from the `.lml` scene language.
///
/// `line` and `col` are 1-based and point at the offending character or
/// token.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub line: usize,
    pub col: usize,
}

impl ParseError {
    pub(crate) fn lexical(msg: impl Into<String>, line: usize, col: usize) -> Self {
        Self { kind: ParseErrorKind::Lexical, message: msg.into(), line, col }
    }

    pub(crate) fn syntax(msg: impl Into<String>, line: usize, col: usize) -> Self {
        Self { kind: ParseErrorKind::Syntax, message: msg.into(), line, col }
    }

    /// Renders the error with the offending source line and a caret under
    /// the column, for terminal output.
    ///
    /// Falls back to the plain message when `src` has no such line.
    pub fn snippet(&self, src: &str) -> String {
        let Some(text) = src.lines().nth(self.line.saturating_sub(1)) else {
            return self.to_string();
        };
        let gutter = self.line.to_string();
        // Tabs keep their width so the caret lines up in a terminal.
        let pad: String = text
            .chars()
            .take(self.col.saturating_sub(1))
            .map(|c| if c == '\t' { '\t' } else { ' ' })
            .collect();
        format!(
            "{self}\n{gutter} | {text}\n{blank} | {pad}^",
            blank = " ".repeat(gutter.len())
        )
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.col, self.message)
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_str;

    #[test]
    fn kind_follows_stage() {
        let lexical = parse_str("Rectangle { color: 'red }").unwrap_err();
        assert_eq!(lexical.kind, ParseErrorKind::Lexical);
        let syntax = parse_str("Item { x: : 8 }").unwrap_err();
        assert_eq!(syntax.kind, ParseErrorKind::Syntax);
    }

    #[test]
    fn snippet_points_at_column() {
        let src = "Item {\n  x: : 8\n}";
        let e = parse_str(src).unwrap_err();
        assert_eq!((e.line, e.col), (2, 6));
        assert_eq!(e.snippet(src), format!("{e}\n2 |   x: : 8\n  |      ^"));
    }

    #[test]
    fn snippet_without_source_line() {
        let e = ParseError::syntax("unexpected end", 9, 1);
        assert_eq!(e.snippet("Item { }"), "9:1: unexpected end");
    }
}
