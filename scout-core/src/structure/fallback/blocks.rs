//! Brace-block matching for C-family sources.
//!
//! Braces inside string literals and comments are not counted. Template
//! literal interpolation is treated as string text.

use std::ops::Range;

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    LineComment,
    BlockComment,
    Str(char),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Class {
    Code,
    Comment,
    Str,
}

/// Classifies characters one at a time.
struct Lexer {
    state: State,
    prev: char,
    escaped: bool,
}

impl Lexer {
    fn new() -> Self {
        Self {
            state: State::Code,
            prev: '\0',
            escaped: false,
        }
    }

    fn step(&mut self, c: char) -> Class {
        let prev = std::mem::replace(&mut self.prev, c);
        match self.state {
            State::Code => match c {
                '/' if prev == '/' => {
                    self.state = State::LineComment;
                    self.prev = '\0';
                    Class::Comment
                }
                '*' if prev == '/' => {
                    self.state = State::BlockComment;
                    self.prev = '\0';
                    Class::Comment
                }
                '"' | '\'' | '`' => {
                    self.state = State::Str(c);
                    self.escaped = false;
                    Class::Str
                }
                _ => Class::Code,
            },
            State::LineComment => {
                if c == '\n' {
                    self.state = State::Code;
                    Class::Code
                } else {
                    Class::Comment
                }
            }
            State::BlockComment => {
                if c == '/' && prev == '*' {
                    self.state = State::Code;
                    self.prev = '\0';
                }
                Class::Comment
            }
            State::Str(quote) => {
                if self.escaped {
                    self.escaped = false;
                } else if c == '\\' {
                    self.escaped = true;
                } else if c == quote || (c == '\n' && quote != '`') {
                    self.state = State::Code;
                    self.prev = '\0';
                }
                Class::Str
            }
        }
    }
}

/// Byte range of the block opening at `open`, including both braces.
///
/// Depth starts at zero, goes up on `{` and down on `}`; the block ends when
/// it returns to zero. An unbalanced block runs to the end of the source.
pub fn match_brace_block(source: &str, open: usize) -> Option<Range<usize>> {
    if source.as_bytes().get(open) != Some(&b'{') {
        return None;
    }

    let mut lexer = Lexer::new();
    let mut depth = 0usize;
    for (offset, c) in source[open..].char_indices() {
        if lexer.step(c) != Class::Code {
            continue;
        }
        match c {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(open..open + offset + 1);
                }
            }
            _ => {}
        }
    }
    Some(open..source.len())
}

/// First code-level `{` at or after `from`, stopping at a `;` (a bodiless
/// declaration such as `declare class X;`).
pub fn find_block_open(source: &str, from: usize) -> Option<usize> {
    let mut lexer = Lexer::new();
    for (offset, c) in source.get(from..)?.char_indices() {
        if lexer.step(c) != Class::Code {
            continue;
        }
        match c {
            '{' => return Some(from + offset),
            ';' => return None,
            _ => {}
        }
    }
    None
}

/// Opening `{` of a class or interface body that starts after `from`.
///
/// Braces nested in `<...>` type arguments belong to a type literal, not the
/// body. `=>` and `->` do not close a type argument.
pub fn find_body_open(source: &str, from: usize) -> Option<usize> {
    let mut lexer = Lexer::new();
    let mut angles = 0usize;
    let mut prev = ' ';
    for (offset, c) in source.get(from..)?.char_indices() {
        if lexer.step(c) != Class::Code {
            prev = c;
            continue;
        }
        match c {
            '<' => angles += 1,
            '>' if prev != '=' && prev != '-' => angles = angles.saturating_sub(1),
            '{' if angles == 0 => return Some(from + offset),
            ';' if angles == 0 => return None,
            _ => {}
        }
        prev = c;
    }
    None
}

/// `source` with comment text blanked out. Byte offsets and newlines are
/// preserved so regex positions still map to the original lines.
pub fn mask_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut lexer = Lexer::new();
    let mut pending_slash = false;

    for c in source.chars() {
        let class = lexer.step(c);
        if pending_slash {
            pending_slash = false;
            out.push(if class == Class::Comment { ' ' } else { '/' });
        }
        match class {
            Class::Comment => {
                if c == '\n' {
                    out.push('\n');
                } else {
                    out.extend(std::iter::repeat(' ').take(c.len_utf8()));
                }
            }
            Class::Code if c == '/' => pending_slash = true,
            _ => out.push(c),
        }
    }
    if pending_slash {
        out.push('/');
    }
    out
}

/// The text of a block body with every nested block collapsed to `{}` and
/// comments removed, leaving only the members declared directly inside it.
pub fn depth_one_text(block: &str) -> String {
    let inner = block.strip_prefix('{').unwrap_or(block);
    let inner = inner.strip_suffix('}').unwrap_or(inner);

    let mut out = String::with_capacity(inner.len());
    let mut lexer = Lexer::new();
    let mut depth = 0usize;
    let mut pending_slash = false;

    for c in inner.chars() {
        let class = lexer.step(c);
        if pending_slash {
            pending_slash = false;
            if class != Class::Comment && depth == 0 {
                out.push('/');
            }
        }
        match class {
            Class::Comment => {}
            Class::Str => {
                if depth == 0 {
                    out.push(c);
                }
            }
            Class::Code => match c {
                '/' => pending_slash = true,
                '{' => {
                    if depth == 0 {
                        out.push_str("{}");
                    }
                    depth += 1;
                }
                '}' => depth = depth.saturating_sub(1),
                _ => {
                    if depth == 0 {
                        out.push(c);
                    }
                }
            },
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_nested_blocks() {
        let source = "class A { foo() { if (x) { y(); } } } tail";
        let open = source.find('{').unwrap();
        let range = match_brace_block(source, open).unwrap();
        assert_eq!(&source[range.clone()], "{ foo() { if (x) { y(); } } }");
        assert_eq!(&source[range.end..], " tail");
    }

    #[test]
    fn ignores_braces_in_strings_and_comments() {
        let source = "{ const s = \"}\"; // }\n /* } */ const t = '{'; }";
        let range = match_brace_block(source, 0).unwrap();
        assert_eq!(range, 0..source.len());
    }

    #[test]
    fn unbalanced_block_runs_to_end() {
        let source = "{ a { b ";
        assert_eq!(match_brace_block(source, 0), Some(0..source.len()));
        assert_eq!(match_brace_block(source, 1), None);
    }

    #[test]
    fn block_open_stops_at_semicolon() {
        assert_eq!(find_block_open("class A extends B {", 0), Some(18));
        assert_eq!(find_block_open("declare class A; {", 0), None);
    }

    #[test]
    fn mask_comments_preserves_offsets() {
        let source = "a /* b */ c // d\ne / f";
        let masked = mask_comments(source);
        assert_eq!(masked.len(), source.len());
        assert_eq!(masked, "a         c     \ne / f");
    }

    #[test]
    fn depth_one_text_collapses_nested_bodies() {
        let block = "{\n  a = 1;\n  foo() {\n    class Inner { bar() {} }\n  }\n  // baz() {}\n  qux(): void;\n}";
        let flat = depth_one_text(block);
        assert!(flat.contains("a = 1;"));
        assert!(flat.contains("foo() {}"));
        assert!(flat.contains("qux(): void;"));
        assert!(!flat.contains("Inner"));
        assert!(!flat.contains("bar"));
        assert!(!flat.contains("baz"));
    }

    #[test]
    fn body_open_skips_type_argument_literals() {
        let source = "class Repo<T extends { id: string; }> implements Base<{ a: () => void }> { x }";
        let open = find_body_open(source, 0).unwrap();
        assert_eq!(&source[open..], "{ x }");
        assert_eq!(find_body_open("declare class X;", 0), None);
    }
}
