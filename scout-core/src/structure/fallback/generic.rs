//! Rust and Go analyzers built on the same brace matching as the script analyzer.

use super::blocks::{depth_one_text, find_block_open, mask_comments, match_brace_block};
use crate::language::Language;
use crate::structure::records::{
    line_at, ClassKind, ClassRecord, ExportKind, ExportRecord, FileStructure, FunctionRecord,
    ImportRecord, Location,
};
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

static RUST_USE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:pub(?:\([^)]*\))?\s+)?use\s+(?:::)?([A-Za-z_][\w:]*[\w])").unwrap()
});

static RUST_FN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?m)^[ \t]*(pub(?:\([^)]*\))?\s+)?(?:default\s+)?(?:const\s+)?(async\s+)?(?:unsafe\s+)?(?:extern\s+"[^"]*"\s+)?fn\s+([A-Za-z_]\w*)"#,
    )
    .unwrap()
});

static RUST_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(pub(?:\([^)]*\))?\s+)?(?:unsafe\s+)?(struct|enum|trait|union)\s+([A-Za-z_]\w*)",
    )
    .unwrap()
});

static RUST_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^pub\s+(const|static|type|mod)\s+([A-Za-z_]\w*)").unwrap()
});

static RUST_IMPL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?:unsafe\s+)?impl\b(?:\s*<[^{]*?>)?\s+(?:[\w:<>, ]+?\s+for\s+)?([A-Za-z_]\w*)",
    )
    .unwrap()
});

static RUST_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:#\[[^\]]*\]\s*)*(?:pub(?:\([^)]*\))?\s+)?([A-Za-z_]\w*)\s*:[^:]").unwrap()
});

static RUST_VARIANT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:#\[[^\]]*\]\s*)*([A-Z]\w*)").unwrap());

static GO_IMPORT_SINGLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^import\s+(?:[\w.]+\s+)?"([^"]+)""#).unwrap()
});

static GO_IMPORT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?ms)^import\s*\((.*?)\)").unwrap());

static QUOTED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""([^"]+)""#).unwrap());

static GO_FUNC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^func\s+(?:\(\s*\w*\s*\*?\s*([A-Za-z_]\w*)(?:\[[^\]]*\])?\s*\)\s*)?([A-Za-z_]\w*)",
    )
    .unwrap()
});

static GO_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^type\s+([A-Za-z_]\w*)(?:\[[^\]]*\])?\s+(struct|interface)\b").unwrap()
});

static GO_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_]\w*(?:\s*,\s*[A-Za-z_]\w*)*)\s+[^\s,]").unwrap()
});

static GO_INTERFACE_METHOD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z_]\w*)\s*\(").unwrap());

pub(crate) fn analyze_rust(source: &str) -> FileStructure {
    let masked = mask_comments(&blank_lifetimes(source));
    let mut structure = FileStructure::empty(Language::Rust);

    structure.imports = RUST_USE
        .captures_iter(&masked)
        .filter_map(|caps| caps.get(1))
        .map(|path| {
            let module = path.as_str().trim_end_matches(':');
            let root = module.split("::").next().unwrap_or(module);
            ImportRecord {
                module: module.to_string(),
                is_external: !matches!(root, "crate" | "self" | "super"),
                location: Location::line(line_at(&masked, path.start())),
            }
        })
        .collect();

    structure.functions = RUST_FN
        .captures_iter(&masked)
        .filter_map(|caps| {
            let name = caps.get(3)?;
            let location = Location::line(line_at(&masked, name.start()));
            Some(FunctionRecord::new(name.as_str(), location, caps.get(2).is_some()))
        })
        .collect();

    let mut classes: Vec<ClassRecord> = Vec::new();
    for caps in RUST_TYPE.captures_iter(&masked) {
        let (Some(whole), Some(keyword), Some(name)) = (caps.get(0), caps.get(2), caps.get(3))
        else {
            continue;
        };
        let block = body_range(&masked, name.end());
        let flat = block
            .as_ref()
            .map(|range| depth_one_text(&masked[range.clone()]))
            .unwrap_or_default();
        let (kind, methods, properties) = match keyword.as_str() {
            "trait" => (ClassKind::Interface, fn_names(&flat), Vec::new()),
            "enum" => (ClassKind::Class, Vec::new(), item_names(&flat, &RUST_VARIANT)),
            _ => (ClassKind::Class, Vec::new(), item_names(&flat, &RUST_FIELD)),
        };
        classes.push(ClassRecord {
            name: name.as_str().to_string(),
            kind,
            methods,
            properties,
            location: block_location(&masked, whole.start(), block),
            exported: caps.get(1).is_some(),
        });
    }

    for caps in RUST_IMPL.captures_iter(&masked) {
        let Some(target) = caps.get(1) else { continue };
        let Some(record) = classes.iter_mut().find(|c| c.name == target.as_str()) else {
            continue;
        };
        if let Some(range) = body_range(&masked, target.end()) {
            for method in fn_names(&depth_one_text(&masked[range])) {
                if !record.methods.contains(&method) {
                    record.methods.push(method);
                }
            }
        }
    }
    structure.classes = classes;

    structure.exports = rust_exports(&masked);
    structure
}

/// Replaces the quote of each lifetime (`'a`, `'static`) with a space so the
/// lexer does not read it as an unterminated char literal. Char literals such
/// as `'a'` are kept.
fn blank_lifetimes(source: &str) -> String {
    let bytes = source.as_bytes();
    let mut out = String::with_capacity(source.len());
    for (i, c) in source.char_indices() {
        if c == '\'' {
            let rest = &bytes[i + 1..];
            let ident = rest
                .iter()
                .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
                .count();
            if ident > 0 && rest.get(ident) != Some(&b'\'') {
                out.push(' ');
                continue;
            }
        }
        out.push(c);
    }
    out
}

fn rust_exports(masked: &str) -> Vec<ExportRecord> {
    let mut found: Vec<(usize, ExportRecord)> = Vec::new();
    let mut push = |offset: usize, name: &str, kind: ExportKind| {
        found.push((
            offset,
            ExportRecord {
                name: name.to_string(),
                kind,
                location: Location::line(line_at(masked, offset)),
                is_default: false,
            },
        ));
    };

    // Only column-zero `pub` items; methods inside impl blocks are not exports.
    for caps in RUST_FN.captures_iter(masked) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(3)) else { continue };
        if whole.as_str().starts_with("pub") {
            push(whole.start(), name.as_str(), ExportKind::Function);
        }
    }
    for caps in RUST_TYPE.captures_iter(masked) {
        let (Some(whole), Some(keyword), Some(name)) = (caps.get(0), caps.get(2), caps.get(3))
        else {
            continue;
        };
        if whole.as_str().starts_with("pub") {
            let kind = if keyword.as_str() == "trait" {
                ExportKind::Interface
            } else {
                ExportKind::Class
            };
            push(whole.start(), name.as_str(), kind);
        }
    }
    for caps in RUST_ITEM.captures_iter(masked) {
        let (Some(whole), Some(keyword), Some(name)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        let kind = match keyword.as_str() {
            "const" => ExportKind::Const,
            "type" => ExportKind::Type,
            _ => ExportKind::Variable,
        };
        push(whole.start(), name.as_str(), kind);
    }

    found.sort_by_key(|(offset, _)| *offset);
    found.into_iter().map(|(_, record)| record).collect()
}

pub(crate) fn analyze_go(source: &str) -> FileStructure {
    let masked = mask_comments(source);
    let mut structure = FileStructure::empty(Language::Go);

    let mut imports: Vec<(usize, String)> = GO_IMPORT_SINGLE
        .captures_iter(&masked)
        .filter_map(|caps| caps.get(1))
        .map(|m| (m.start(), m.as_str().to_string()))
        .collect();
    for caps in GO_IMPORT_BLOCK.captures_iter(&masked) {
        let Some(list) = caps.get(1) else { continue };
        for quoted in QUOTED.captures_iter(list.as_str()).filter_map(|c| c.get(1)) {
            imports.push((list.start() + quoted.start(), quoted.as_str().to_string()));
        }
    }
    imports.sort_by_key(|(offset, _)| *offset);
    structure.imports = imports
        .into_iter()
        .map(|(offset, module)| ImportRecord::new(module, Location::line(line_at(&masked, offset))))
        .collect();

    let mut classes: Vec<ClassRecord> = Vec::new();
    for caps in GO_TYPE.captures_iter(&masked) {
        let (Some(whole), Some(name), Some(keyword)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        let block = body_range(&masked, keyword.end());
        let flat = block
            .as_ref()
            .map(|range| depth_one_text(&masked[range.clone()]))
            .unwrap_or_default();
        let (kind, methods, properties) = if keyword.as_str() == "interface" {
            (ClassKind::Interface, item_names(&flat, &GO_INTERFACE_METHOD), Vec::new())
        } else {
            (ClassKind::Class, Vec::new(), go_fields(&flat))
        };
        classes.push(ClassRecord {
            name: name.as_str().to_string(),
            kind,
            methods,
            properties,
            location: block_location(&masked, whole.start(), block),
            exported: is_go_exported(name.as_str()),
        });
    }

    let mut functions = Vec::new();
    let mut exports: Vec<(usize, ExportRecord)> = Vec::new();
    for caps in GO_FUNC.captures_iter(&masked) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(2)) else { continue };
        let line = line_at(&masked, name.start());
        functions.push(FunctionRecord::new(name.as_str(), Location::line(line), false));

        match caps.get(1) {
            Some(receiver) => {
                if let Some(record) = classes.iter_mut().find(|c| c.name == receiver.as_str()) {
                    if !record.methods.iter().any(|m| m == name.as_str()) {
                        record.methods.push(name.as_str().to_string());
                    }
                }
            }
            None if is_go_exported(name.as_str()) => exports.push((
                whole.start(),
                ExportRecord {
                    name: name.as_str().to_string(),
                    kind: ExportKind::Function,
                    location: Location::line(line),
                    is_default: false,
                },
            )),
            None => {}
        }
    }
    for caps in GO_TYPE.captures_iter(&masked) {
        let (Some(whole), Some(name), Some(keyword)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        if is_go_exported(name.as_str()) {
            exports.push((
                whole.start(),
                ExportRecord {
                    name: name.as_str().to_string(),
                    kind: if keyword.as_str() == "interface" {
                        ExportKind::Interface
                    } else {
                        ExportKind::Class
                    },
                    location: Location::line(line_at(&masked, whole.start())),
                    is_default: false,
                },
            ));
        }
    }
    exports.sort_by_key(|(offset, _)| *offset);

    structure.functions = functions;
    structure.classes = classes;
    structure.exports = exports.into_iter().map(|(_, e)| e).collect();
    structure
}

fn is_go_exported(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}

fn body_range(masked: &str, from: usize) -> Option<Range<usize>> {
    find_block_open(masked, from).and_then(|open| match_brace_block(masked, open))
}

fn block_location(masked: &str, start: usize, block: Option<Range<usize>>) -> Location {
    let start_line = line_at(masked, start);
    match block {
        Some(range) => Location::span(start_line, line_at(masked, range.end.saturating_sub(1))),
        None => Location::line(start_line),
    }
}

fn fn_names(flat: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in RUST_FN.captures_iter(flat).filter_map(|c| c.get(3)) {
        if !names.iter().any(|n| n == name.as_str()) {
            names.push(name.as_str().to_string());
        }
    }
    names
}

/// First capture of `pattern` for each comma- or newline-separated segment.
fn item_names(flat: &str, pattern: &Regex) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for segment in flat.split([',', '\n', ';']) {
        if let Some(name) = pattern.captures(segment.trim()).and_then(|c| c.get(1)) {
            if !names.iter().any(|n| n == name.as_str()) {
                names.push(name.as_str().to_string());
            }
        }
    }
    names
}

fn go_fields(flat: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for line in flat.lines() {
        let Some(list) = GO_FIELD.captures(line.trim()).and_then(|c| c.get(1)) else {
            continue;
        };
        for name in list.as_str().split(',').map(str::trim) {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_items_and_impl_methods() {
        let source = r#"use std::collections::HashMap;
use crate::config::Config;
pub use super::records::Location;

/// Holds things
pub struct Store {
    pub items: HashMap<String, u32>,
    limit: usize,
}

impl Store {
    pub fn new() -> Self { todo!() }
    async fn refresh(&self) {
        fn nested() {}
    }
    fn label<'a>(&'a self) -> &'static str {
        let _quote = '{';
        "store"
    }
}

pub trait Source {
    fn load(&self) -> String;
}

enum Mode { Fast, Slow(u8) }

pub const LIMIT: usize = 3;
"#;
        let s = analyze_rust(source);
        let modules: Vec<_> = s.imports.iter().map(|i| (i.module.as_str(), i.is_external)).collect();
        assert_eq!(
            modules,
            vec![
                ("std::collections::HashMap", true),
                ("crate::config::Config", false),
                ("super::records::Location", false),
            ]
        );

        let store = s.classes.iter().find(|c| c.name == "Store").unwrap();
        assert_eq!(store.properties, vec!["items", "limit"]);
        assert_eq!(store.methods, vec!["new", "refresh", "label"]);
        assert_eq!(store.location.start_line, 6);
        assert_eq!(store.location.end_line, 9);
        assert!(store.exported);

        let source_trait = s.classes.iter().find(|c| c.name == "Source").unwrap();
        assert_eq!(source_trait.kind, ClassKind::Interface);
        assert_eq!(source_trait.methods, vec!["load"]);

        let mode = s.classes.iter().find(|c| c.name == "Mode").unwrap();
        assert_eq!(mode.properties, vec!["Fast", "Slow"]);
        assert!(!mode.exported);

        let exports: Vec<_> = s.exports.iter().map(|e| (e.name.as_str(), e.kind)).collect();
        assert_eq!(
            exports,
            vec![
                ("Store", ExportKind::Class),
                ("Source", ExportKind::Interface),
                ("LIMIT", ExportKind::Const),
            ]
        );
        assert!(s.functions.iter().any(|f| f.name == "refresh" && f.is_async));
    }

    #[test]
    fn go_types_funcs_and_imports() {
        let source = r#"package server

import "fmt"

import (
	"net/http"
	log "github.com/sirupsen/logrus"
)

type Server struct {
	Addr, Host string
	handler http.Handler
}

type Handler interface {
	Serve(w http.ResponseWriter) error
}

func (s *Server) Start() error {
	return nil
}

func NewServer() *Server { return &Server{} }

func helper() {}
"#;
        let s = analyze_go(source);
        let modules: Vec<_> = s.imports.iter().map(|i| i.module.as_str()).collect();
        assert_eq!(modules, vec!["fmt", "net/http", "github.com/sirupsen/logrus"]);

        let server = &s.classes[0];
        assert_eq!(server.name, "Server");
        assert_eq!(server.properties, vec!["Addr", "Host", "handler"]);
        assert_eq!(server.methods, vec!["Start"]);
        assert_eq!(server.location.end_line, 13);

        let handler = &s.classes[1];
        assert_eq!(handler.kind, ClassKind::Interface);
        assert_eq!(handler.methods, vec!["Serve"]);

        let names: Vec<_> = s.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Start", "NewServer", "helper"]);
        let exports: Vec<_> = s.exports.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(exports, vec!["Server", "Handler", "NewServer"]);
    }
}
