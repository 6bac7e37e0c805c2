//! Indentation-driven analyzer for Python.
//!
//! Methods are `def` lines at exactly the class indentation plus four
//! columns, so code indented with another width yields no methods.

use crate::language::Language;
use crate::structure::records::{
    ClassKind, ClassRecord, ExportKind, ExportRecord, FileStructure, FunctionRecord, ImportRecord,
    Location,
};
use regex::Regex;
use std::sync::LazyLock;

const INDENT_STEP: usize = 4;

static CLASS_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^class\s+([A-Za-z_]\w*)").unwrap());

static DEF_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(async\s+)?def\s+([A-Za-z_]\w*)").unwrap());

static IMPORT_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^import\s+(.+)$").unwrap());

static FROM_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^from\s+(\.*[\w.]*)\s+import\b").unwrap());

static CLASS_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_]\w*)\s*(?::[^=]+$|(?::[^=]+)?=(?:[^=]|$))").unwrap()
});

static SELF_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^self\.([A-Za-z_]\w*)\s*(?::[^=]+)?=(?:[^=]|$)").unwrap()
});

/// A line that starts a statement; blank lines, comments, string bodies and
/// bracket continuations are dropped.
struct Line<'a> {
    number: usize,
    indent: usize,
    text: &'a str,
}

pub(crate) fn analyze(source: &str) -> FileStructure {
    let lines = statement_lines(source);
    let mut structure = FileStructure::empty(Language::Python);
    structure.imports = imports(&lines);
    structure.functions = functions(&lines);
    structure.classes = classes(&lines);
    structure.exports = exports(&lines);
    structure
}

/// Name-mangled (`__name`, not a dunder) members are private to their module.
pub(crate) fn is_mangled(name: &str) -> bool {
    name.starts_with("__") && !name.ends_with("__")
}

fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .map(|c| if c == '\t' { INDENT_STEP } else { 1 })
        .sum()
}

fn statement_lines(source: &str) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut open_triple: Option<&'static str> = None;
    let mut bracket_depth = 0isize;

    for (idx, raw) in source.lines().enumerate() {
        if let Some(delim) = open_triple {
            if let Some(pos) = raw.find(delim) {
                let (delta, triple) = scan_line(&raw[pos + 3..]);
                bracket_depth = (bracket_depth + delta).max(0);
                open_triple = triple;
            }
            continue;
        }

        let text = raw.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }

        let continuation = bracket_depth > 0;
        let (delta, triple) = scan_line(raw);
        bracket_depth = (bracket_depth + delta).max(0);
        open_triple = triple;

        if !continuation {
            lines.push(Line {
                number: idx + 1,
                indent: indent_width(raw),
                text,
            });
        }
    }
    lines
}

/// Net bracket depth change of a line, and the triple-quote delimiter left
/// open at its end, if any.
fn scan_line(line: &str) -> (isize, Option<&'static str>) {
    let chars: Vec<char> = line.chars().collect();
    let mut delta = 0isize;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '#' => break,
            '"' | '\'' => {
                let triple = i + 2 < chars.len() && chars[i + 1] == c && chars[i + 2] == c;
                if triple {
                    let delim = if c == '"' { "\"\"\"" } else { "'''" };
                    let rest: String = chars[i + 3..].iter().collect();
                    match rest.find(delim) {
                        Some(pos) => {
                            i += 3 + rest[..pos].chars().count() + 3;
                            continue;
                        }
                        None => return (delta, Some(delim)),
                    }
                }
                i += 1;
                while i < chars.len() && chars[i] != c {
                    if chars[i] == '\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            '(' | '[' | '{' => delta += 1,
            ')' | ']' | '}' => delta -= 1,
            _ => {}
        }
        i += 1;
    }
    (delta, None)
}

fn imports(lines: &[Line]) -> Vec<ImportRecord> {
    let mut records = Vec::new();
    for line in lines {
        let location = Location::line(line.number);
        if let Some(caps) = FROM_LINE.captures(line.text) {
            if let Some(module) = caps.get(1).filter(|m| !m.as_str().is_empty()) {
                records.push(ImportRecord::new(module.as_str(), location));
            }
        } else if let Some(caps) = IMPORT_LINE.captures(line.text) {
            let Some(list) = caps.get(1) else { continue };
            for part in list.as_str().split(',') {
                if let Some(module) = part.split_whitespace().next() {
                    records.push(ImportRecord::new(module.trim_end_matches(';'), location));
                }
            }
        }
    }
    records
}

/// Last line of the block opened by `lines[idx]`.
fn block_end(lines: &[Line], idx: usize) -> usize {
    let indent = lines[idx].indent;
    lines[idx + 1..]
        .iter()
        .take_while(|l| l.indent > indent)
        .last()
        .map(|l| l.number)
        .unwrap_or(lines[idx].number)
}

fn functions(lines: &[Line]) -> Vec<FunctionRecord> {
    lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.indent == 0)
        .filter_map(|(idx, line)| {
            let caps = DEF_LINE.captures(line.text)?;
            let name = caps.get(2)?.as_str();
            let location = Location::span(line.number, block_end(lines, idx));
            Some(FunctionRecord::new(name, location, caps.get(1).is_some()))
        })
        .collect()
}

fn exports(lines: &[Line]) -> Vec<ExportRecord> {
    lines
        .iter()
        .filter(|line| line.indent == 0)
        .filter_map(|line| {
            let (name, kind) = if let Some(caps) = DEF_LINE.captures(line.text) {
                (caps.get(2)?.as_str(), ExportKind::Function)
            } else {
                (CLASS_LINE.captures(line.text)?.get(1)?.as_str(), ExportKind::Class)
            };
            (!is_mangled(name)).then(|| ExportRecord {
                name: name.to_string(),
                kind,
                location: Location::line(line.number),
                is_default: false,
            })
        })
        .collect()
}

fn classes(lines: &[Line]) -> Vec<ClassRecord> {
    let mut records = Vec::new();
    for (idx, header) in lines.iter().enumerate() {
        let Some(name) = CLASS_LINE
            .captures(header.text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
        else {
            continue;
        };
        let class_indent = header.indent;
        let member_indent = class_indent + INDENT_STEP;

        let mut methods: Vec<String> = Vec::new();
        let mut properties: Vec<String> = Vec::new();
        let mut nested_indent: Option<usize> = None;
        let mut in_direct_method = false;
        // Method state to resume once a class nested in a method ends.
        let mut resume_method = false;
        let mut end_line = header.number;

        for line in &lines[idx + 1..] {
            if line.indent <= class_indent {
                break;
            }
            end_line = line.number;

            // Everything under a nested class belongs to that class's own record.
            if let Some(nested) = nested_indent {
                if line.indent > nested {
                    continue;
                }
                nested_indent = None;
                in_direct_method = resume_method;
            }
            if CLASS_LINE.is_match(line.text) {
                nested_indent = Some(line.indent);
                resume_method = in_direct_method && line.indent > member_indent;
                in_direct_method = false;
                continue;
            }

            if let Some(caps) = DEF_LINE.captures(line.text) {
                if line.indent == member_indent {
                    if let Some(method) = caps.get(2) {
                        push_unique(&mut methods, method.as_str());
                    }
                    in_direct_method = true;
                }
                continue;
            }

            if line.indent == member_indent {
                in_direct_method = false;
                if let Some(attr) = CLASS_ATTR.captures(line.text).and_then(|c| c.get(1)) {
                    push_unique(&mut properties, attr.as_str());
                }
            } else if in_direct_method {
                if let Some(attr) = SELF_ATTR.captures(line.text).and_then(|c| c.get(1)) {
                    push_unique(&mut properties, attr.as_str());
                }
            }
        }

        records.push(ClassRecord {
            name: name.to_string(),
            kind: ClassKind::Class,
            methods,
            properties,
            location: Location::span(header.number, end_line),
            exported: class_indent == 0 && !is_mangled(name),
        });
    }
    records
}

fn push_unique(items: &mut Vec<String>, value: &str) {
    if !items.iter().any(|v| v == value) {
        items.push(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NESTED: &str = r#"
class Outer:
    def outer_method(self):
        self.value = 1

    class Inner:
        def inner_method(self):
            self.hidden = 2

    def another(self):
        pass
"#;

    #[test]
    fn nested_class_methods_do_not_leak() {
        let s = analyze(NESTED);
        let outer = s.classes.iter().find(|c| c.name == "Outer").unwrap();
        assert_eq!(outer.methods, vec!["outer_method", "another"]);
        assert!(!outer.methods.iter().any(|m| m == "inner_method"));
        assert_eq!(outer.properties, vec!["value"]);
        assert_eq!(outer.location.start_line, 2);
        assert_eq!(outer.location.end_line, 11);

        let inner = s.classes.iter().find(|c| c.name == "Inner").unwrap();
        assert_eq!(inner.methods, vec!["inner_method"]);
        assert_eq!(inner.properties, vec!["hidden"]);
        assert!(!inner.exported);
    }

    #[test]
    fn class_body_ends_at_dedent() {
        let source = "class A:\n    x: int = 0\n    name: str\n\n    async def run(self):\n        return 1\n\ndef free():\n    pass\n";
        let s = analyze(source);
        let a = &s.classes[0];
        assert_eq!(a.methods, vec!["run"]);
        assert_eq!(a.properties, vec!["x", "name"]);
        assert_eq!(a.location.end_line, 6);
        assert_eq!(s.functions.len(), 1);
        assert_eq!(s.functions[0].name, "free");
        assert_eq!(s.functions[0].location.end_line, 9);
    }

    #[test]
    fn docstrings_and_continuations_are_skipped() {
        let source = r#"class Doc:
    """
    def not_a_method(self):
    """
    def real(self,
a, b):
        pass
"#;
        let s = analyze(source);
        assert_eq!(s.classes[0].methods, vec!["real"]);
        assert!(s.functions.is_empty());
    }

    #[test]
    fn imports_mark_relative_as_internal() {
        let source = "import os, sys as system\nfrom . import views\nfrom ..models import User\nfrom requests import get\n";
        let s = analyze(source);
        let modules: Vec<_> = s.imports.iter().map(|i| (i.module.as_str(), i.is_external)).collect();
        assert_eq!(
            modules,
            vec![
                ("os", true),
                ("sys", true),
                (".", false),
                ("..models", false),
                ("requests", true),
            ]
        );
    }

    #[test]
    fn top_level_definitions_are_exported_unless_mangled() {
        let source = "def public():\n    pass\n\ndef _internal():\n    pass\n\ndef __mangled():\n    pass\n\nclass Model:\n    def method(self):\n        pass\n";
        let s = analyze(source);
        let names: Vec<_> = s.exports.iter().map(|e| (e.name.as_str(), e.kind)).collect();
        assert_eq!(
            names,
            vec![
                ("public", ExportKind::Function),
                ("_internal", ExportKind::Function),
                ("Model", ExportKind::Class),
            ]
        );
        assert!(s.exports.iter().all(|e| !e.is_default));
    }

    #[test]
    fn two_space_indentation_is_a_known_gap() {
        let source = "class Narrow:\n  def method(self):\n    pass\n";
        let s = analyze(source);
        assert!(s.classes[0].methods.is_empty());
    }

    #[test]
    fn class_inside_method_keeps_later_self_attributes() {
        let source = "class Outer:\n    def build(self):\n        self.a = 1\n        class Local:\n            x = 1\n        self.b = 2\n";
        let s = analyze(source);
        let outer = s.classes.iter().find(|c| c.name == "Outer").unwrap();
        assert_eq!(outer.methods, vec!["build"]);
        assert_eq!(outer.properties, vec!["a", "b"]);

        let local = s.classes.iter().find(|c| c.name == "Local").unwrap();
        assert_eq!(local.properties, vec!["x"]);
    }
}
