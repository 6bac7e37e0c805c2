//! Regex and brace-matching analyzer for TypeScript and JavaScript.

use super::blocks::{
    depth_one_text, find_body_open, mask_comments, match_brace_block,
};
use crate::language::Language;
use crate::structure::records::{
    line_at, ClassKind, ClassRecord, ExportKind, ExportRecord, FileStructure, FunctionRecord,
    ImportRecord, Location,
};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static IMPORT_FROM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*import\s+(?:type\s+)?[\w$*{}\s,]+?\s+from\s*['"]([^'"\n]+)['"]"#)
        .unwrap()
});

static IMPORT_BARE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^[ \t]*import\s*['"]([^'"\n]+)['"]"#).unwrap());

static REQUIRE_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b(?:require|import)\s*\(\s*['"]([^'"\n]+)['"]\s*\)"#).unwrap()
});

static DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(export\s+)?(?:declare\s+)?(?:abstract\s+)?(?:async\s+)?(function\*?|class|const|let|var|type|interface|enum)\s*\*?\s*([A-Za-z_$][\w$]*)",
    )
    .unwrap()
});

static EXPORT_DEFAULT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*export\s+default\s+(?:(?:abstract\s+)?(class|interface)\b|(?:async\s+)?(function)\b\s*\*?)?\s*([A-Za-z_$][\w$]*)?",
    )
    .unwrap()
});

static EXPORT_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*export\s+(?:type\s+)?\{([^}]*)\}").unwrap());

static FUNCTION_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?:export\s+)?(?:default\s+)?(?:declare\s+)?(async\s+)?function\b\s*\*?\s*([A-Za-z_$][\w$]*)",
    )
    .unwrap()
});

static ARROW_FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?:export\s+)?(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*(?::[^=\n]+)?=\s*(async\s+)?(?:function\b|(?:\([^)]*\)|[A-Za-z_$][\w$]*)\s*(?::[^=\n]+)?=>)",
    )
    .unwrap()
});

static CLASS_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(export\s+)?(?:default\s+)?(?:declare\s+)?(?:abstract\s+)?(class|interface)\s+([A-Za-z_$][\w$]*)",
    )
    .unwrap()
});

static TYPE_ALIAS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(export\s+)?(?:declare\s+)?type\s+([A-Za-z_$][\w$]*)\s*(?:<[^=]*>)?\s*=")
        .unwrap()
});

const MODIFIERS: &str = r"(?:(?:public|private|protected|static|readonly|async|abstract|override|declare|accessor|get|set)\s+)*";

static MEMBER_METHOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^{MODIFIERS}\*?\s*(#?[A-Za-z_$][\w$]*)\s*\??\s*(?:<[^>]*>)?\s*\("
    ))
    .unwrap()
});

static MEMBER_PROPERTY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^{MODIFIERS}(#?[A-Za-z_$][\w$]*)\s*[?!]?\s*(?::|=|$)"
    ))
    .unwrap()
});

static DECORATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:@[\w.$]+(?:\([^)]*\))?\s*)+").unwrap());

const NOT_MEMBERS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "return", "function", "class", "new", "super",
    "static", "get", "set", "async",
];

pub(crate) fn analyze(source: &str, language: Language) -> FileStructure {
    let masked = mask_comments(source);
    let mut structure = FileStructure::empty(language);
    structure.imports = imports(&masked);
    structure.exports = exports(&masked);
    structure.functions = functions(&masked);
    structure.classes = classes(&masked, &structure.exports);
    structure
}

fn imports(masked: &str) -> Vec<ImportRecord> {
    let mut found: Vec<(usize, String)> = Vec::new();
    for pattern in [&*IMPORT_FROM, &*IMPORT_BARE, &*REQUIRE_CALL] {
        for caps in pattern.captures_iter(masked) {
            if let Some(module) = caps.get(1) {
                found.push((module.start(), module.as_str().to_string()));
            }
        }
    }
    found.sort_by_key(|(offset, _)| *offset);
    found.dedup_by_key(|(offset, _)| *offset);
    found
        .into_iter()
        .map(|(offset, module)| ImportRecord::new(module, Location::line(line_at(masked, offset))))
        .collect()
}

fn declaration_kind(keyword: &str) -> ExportKind {
    match keyword.trim_end_matches('*') {
        "function" => ExportKind::Function,
        "class" => ExportKind::Class,
        "const" => ExportKind::Const,
        "type" | "enum" => ExportKind::Type,
        "interface" => ExportKind::Interface,
        _ => ExportKind::Variable,
    }
}

fn exports(masked: &str) -> Vec<ExportRecord> {
    let declared: HashMap<&str, ExportKind> = DECLARATION
        .captures_iter(masked)
        .filter_map(|caps| Some((caps.get(3)?.as_str(), declaration_kind(caps.get(2)?.as_str()))))
        .collect();

    let mut found: Vec<(usize, ExportRecord)> = Vec::new();

    for caps in DECLARATION.captures_iter(masked) {
        if caps.get(1).is_none() {
            continue;
        }
        let (Some(keyword), Some(name)) = (caps.get(2), caps.get(3)) else {
            continue;
        };
        found.push((
            name.start(),
            ExportRecord {
                name: name.as_str().to_string(),
                kind: declaration_kind(keyword.as_str()),
                location: Location::line(line_at(masked, name.start())),
                is_default: false,
            },
        ));
    }

    for caps in EXPORT_DEFAULT.captures_iter(masked) {
        let Some(whole) = caps.get(0) else { continue };
        let kind = match (caps.get(1).map(|m| m.as_str()), caps.get(2)) {
            (Some("class"), _) => ExportKind::Class,
            (Some(_), _) => ExportKind::Interface,
            (None, Some(_)) => ExportKind::Function,
            (None, None) => ExportKind::Default,
        };
        let name = caps
            .get(3)
            .map(|m| m.as_str())
            .filter(|n| !matches!(*n, "new" | "async" | "function" | "class"))
            .unwrap_or("default");
        let kind = if kind == ExportKind::Default {
            declared.get(name).copied().unwrap_or(ExportKind::Default)
        } else {
            kind
        };
        found.push((
            whole.start(),
            ExportRecord {
                name: name.to_string(),
                kind,
                location: Location::line(line_at(masked, whole.start())),
                is_default: true,
            },
        ));
    }

    for caps in EXPORT_CLAUSE.captures_iter(masked) {
        let Some(list) = caps.get(1) else { continue };
        for spec in list.as_str().split(',') {
            let spec = spec.trim();
            let spec = spec.strip_prefix("type ").unwrap_or(spec).trim();
            if spec.is_empty() {
                continue;
            }
            let (local, alias) = match spec.split_once(" as ") {
                Some((local, alias)) => (local.trim(), Some(alias.trim())),
                None => (spec, None),
            };
            let is_default = alias == Some("default");
            let fallback_kind = if is_default {
                ExportKind::Default
            } else {
                ExportKind::Variable
            };
            found.push((
                list.start(),
                ExportRecord {
                    name: local.to_string(),
                    kind: declared.get(local).copied().unwrap_or(fallback_kind),
                    location: Location::line(line_at(masked, list.start())),
                    is_default,
                },
            ));
        }
    }

    found.sort_by_key(|(offset, _)| *offset);

    // Only the first default export of a file counts.
    let mut seen_default = false;
    found
        .into_iter()
        .map(|(_, record)| record)
        .filter(|record| {
            if !record.is_default {
                return true;
            }
            !std::mem::replace(&mut seen_default, true)
        })
        .collect()
}

fn functions(masked: &str) -> Vec<FunctionRecord> {
    let mut found: Vec<(usize, FunctionRecord)> = Vec::new();
    for caps in FUNCTION_DECL.captures_iter(masked) {
        let Some(name) = caps.get(2) else { continue };
        let location = Location::line(line_at(masked, name.start()));
        found.push((
            name.start(),
            FunctionRecord::new(name.as_str(), location, caps.get(1).is_some()),
        ));
    }
    for caps in ARROW_FUNCTION.captures_iter(masked) {
        let Some(name) = caps.get(1) else { continue };
        let location = Location::line(line_at(masked, name.start()));
        found.push((
            name.start(),
            FunctionRecord::new(name.as_str(), location, caps.get(2).is_some()),
        ));
    }
    found.sort_by_key(|(offset, _)| *offset);
    found.into_iter().map(|(_, f)| f).collect()
}

fn classes(masked: &str, exports: &[ExportRecord]) -> Vec<ClassRecord> {
    let exported_names: Vec<&str> = exports.iter().map(|e| e.name.as_str()).collect();
    let mut found: Vec<(usize, ClassRecord)> = Vec::new();

    for caps in CLASS_HEADER.captures_iter(masked) {
        let (Some(whole), Some(keyword), Some(name)) = (caps.get(0), caps.get(2), caps.get(3))
        else {
            continue;
        };
        let start_line = line_at(masked, whole.start());
        let block = find_body_open(masked, name.end())
            .and_then(|open| match_brace_block(masked, open));
        let (methods, properties, end_line) = match block {
            Some(range) => {
                let (methods, properties) = members(&depth_one_text(&masked[range.clone()]));
                (methods, properties, line_at(masked, range.end.saturating_sub(1)))
            }
            None => (Vec::new(), Vec::new(), start_line),
        };
        found.push((
            whole.start(),
            ClassRecord {
                name: name.as_str().to_string(),
                kind: if keyword.as_str() == "interface" {
                    ClassKind::Interface
                } else {
                    ClassKind::Class
                },
                methods,
                properties,
                location: Location::span(start_line, end_line),
                exported: caps.get(1).is_some() || exported_names.contains(&name.as_str()),
            },
        ));
    }

    for caps in TYPE_ALIAS.captures_iter(masked) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(2)) else {
            continue;
        };
        found.push((
            whole.start(),
            ClassRecord {
                name: name.as_str().to_string(),
                kind: ClassKind::Type,
                methods: Vec::new(),
                properties: Vec::new(),
                location: Location::line(line_at(masked, whole.start())),
                exported: caps.get(1).is_some() || exported_names.contains(&name.as_str()),
            },
        ));
    }

    found.sort_by_key(|(offset, _)| *offset);
    found.into_iter().map(|(_, c)| c).collect()
}

/// Split depth-one class text into member declarations, keeping parameter
/// lists that span several lines together.
fn member_segments(flat: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut parens = 0usize;
    for c in flat.chars() {
        match c {
            '(' => parens += 1,
            ')' => parens = parens.saturating_sub(1),
            '\n' | ';' | '}' if parens == 0 => {
                segments.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    segments.push(current);
    segments
}

fn members(flat: &str) -> (Vec<String>, Vec<String>) {
    let mut methods: Vec<String> = Vec::new();
    let mut properties: Vec<String> = Vec::new();

    for segment in member_segments(flat) {
        let segment = segment.trim();
        let segment = DECORATOR
            .find(segment)
            .map(|m| &segment[m.end()..])
            .unwrap_or(segment);
        if segment.is_empty() {
            continue;
        }

        if let Some(name) = MEMBER_METHOD.captures(segment).and_then(|c| c.get(1)) {
            let name = name.as_str();
            if !NOT_MEMBERS.contains(&name) && !methods.iter().any(|m| m == name) {
                methods.push(name.to_string());
            }
            continue;
        }
        if let Some(name) = MEMBER_PROPERTY.captures(segment).and_then(|c| c.get(1)) {
            let name = name.as_str();
            if !NOT_MEMBERS.contains(&name) && !properties.iter().any(|p| p == name) {
                properties.push(name.to_string());
            }
        }
    }
    (methods, properties)
}
