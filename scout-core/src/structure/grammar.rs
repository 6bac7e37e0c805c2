//! Tree-sitter backed analysis for TypeScript, JavaScript and Python

use crate::error::ScoutError;
use crate::language::Language;
use crate::structure::fallback::python::is_mangled;
use crate::structure::infra;
use crate::structure::records::{
    ClassKind, ClassRecord, ExportKind, ExportRecord, FileStructure, FunctionRecord, ImportRecord,
    Location,
};
use crate::structure::StructuralBackend;
use std::collections::HashMap;
use std::path::Path;
use tree_sitter::{Node, Parser};

/// Grammar backend. Parsers are created per file since `tree_sitter::Parser`
/// is not `Sync`.
#[derive(Debug, Clone, Copy)]
pub struct TreeSitterBackend {
    _private: (),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Grammar {
    TypeScript,
    Tsx,
    JavaScript,
    Python,
}

impl Grammar {
    const ALL: [Grammar; 4] = [Self::TypeScript, Self::Tsx, Self::JavaScript, Self::Python];

    fn for_file(path: &Path, language: Language) -> Option<Self> {
        match language {
            Language::TypeScript => {
                if path.extension().is_some_and(|e| e == "tsx") {
                    Some(Self::Tsx)
                } else {
                    Some(Self::TypeScript)
                }
            }
            Language::JavaScript => Some(Self::JavaScript),
            Language::Python => Some(Self::Python),
            _ => None,
        }
    }

    fn language(self) -> tree_sitter::Language {
        match self {
            Self::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Self::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Self::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Self::Python => tree_sitter_python::LANGUAGE.into(),
        }
    }
}

impl TreeSitterBackend {
    /// Load every grammar once. `None` when any of them is rejected by the
    /// linked tree-sitter runtime.
    pub fn load() -> Option<Self> {
        let mut parser = Parser::new();
        for grammar in Grammar::ALL {
            if let Err(e) = parser.set_language(&grammar.language()) {
                tracing::debug!("tree-sitter grammar {:?} unavailable: {}", grammar, e);
                return None;
            }
        }
        Some(Self { _private: () })
    }
}

impl StructuralBackend for TreeSitterBackend {
    fn name(&self) -> &'static str {
        "tree-sitter"
    }

    fn supports(&self, language: Language) -> bool {
        matches!(
            language,
            Language::TypeScript | Language::JavaScript | Language::Python
        )
    }

    fn analyze(&self, path: &Path, source: &str, language: Language) -> crate::Result<FileStructure> {
        let grammar = Grammar::for_file(path, language).ok_or_else(|| {
            ScoutError::UnsupportedLanguage {
                path: path.to_path_buf(),
                language: language.to_string(),
            }
        })?;
        let parse_error = |message: &str| ScoutError::GrammarParse {
            path: path.to_path_buf(),
            message: message.to_string(),
        };

        let mut parser = Parser::new();
        parser
            .set_language(&grammar.language())
            .map_err(|e| parse_error(&e.to_string()))?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| parse_error("parser returned no tree"))?;
        let root = tree.root_node();
        if root.has_error() {
            return Err(parse_error("syntax errors in source"));
        }

        let mut structure = match grammar {
            Grammar::Python => python(root, source),
            _ => script(root, source, language),
        };
        structure.infrastructure = infra::extract(path, source, language, &structure.imports);
        Ok(structure)
    }
}

fn children(node: Node<'_>) -> Vec<Node<'_>> {
    (0..node.child_count()).filter_map(|i| node.child(i)).collect()
}

fn node_text<'s>(node: &Node, source: &'s str) -> &'s str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or_default()
}

fn field_text<'s>(node: &Node, field: &str, source: &'s str) -> Option<&'s str> {
    node.child_by_field_name(field).map(|n| node_text(&n, source))
}

fn location(node: &Node) -> Location {
    Location::span(node.start_position().row + 1, node.end_position().row + 1)
}

fn has_token(node: &Node, token: &str) -> bool {
    children(*node)
        .iter()
        .any(|c| !c.is_named() && c.kind() == token)
}

fn visit<'t>(node: Node<'t>, f: &mut impl FnMut(Node<'t>)) {
    f(node);
    for child in children(node) {
        visit(child, f);
    }
}

fn unquote(text: &str) -> &str {
    text.trim_matches(|c| c == '"' || c == '\'' || c == '`')
}

// TypeScript / JavaScript

fn declaration_kind(node: &Node, source: &str) -> Option<ExportKind> {
    Some(match node.kind() {
        "function_declaration" | "generator_function_declaration" | "function_signature" => {
            ExportKind::Function
        }
        "class_declaration" | "abstract_class_declaration" => ExportKind::Class,
        "interface_declaration" => ExportKind::Interface,
        "type_alias_declaration" | "enum_declaration" => ExportKind::Type,
        "lexical_declaration" => {
            if children(*node).first().is_some_and(|c| node_text(c, source) == "const") {
                ExportKind::Const
            } else {
                ExportKind::Variable
            }
        }
        "variable_declaration" => ExportKind::Variable,
        _ => return None,
    })
}

/// Names bound by a declaration node
fn declared_names<'s>(node: &Node, source: &'s str) -> Vec<&'s str> {
    match node.kind() {
        "lexical_declaration" | "variable_declaration" => children(*node)
            .iter()
            .filter(|c| c.kind() == "variable_declarator")
            .filter_map(|c| field_text(c, "name", source))
            .collect(),
        _ => field_text(node, "name", source).into_iter().collect(),
    }
}

fn script(root: Node<'_>, source: &str, language: Language) -> FileStructure {
    let mut structure = FileStructure::empty(language);

    let mut declared: HashMap<&str, ExportKind> = HashMap::new();
    for node in children(root) {
        let decl = if node.kind() == "export_statement" {
            node.child_by_field_name("declaration")
        } else {
            Some(node)
        };
        let Some(decl) = decl else { continue };
        if let Some(kind) = declaration_kind(&decl, source) {
            for name in declared_names(&decl, source) {
                declared.entry(name).or_insert(kind);
            }
        }
    }

    let mut seen_default = false;
    visit(root, &mut |node| match node.kind() {
        "import_statement" => {
            if let Some(module) = field_text(&node, "source", source) {
                structure
                    .imports
                    .push(ImportRecord::new(unquote(module), location(&node)));
            }
        }
        "call_expression" => {
            let Some(function) = node.child_by_field_name("function") else {
                return;
            };
            let is_loader = function.kind() == "import"
                || (function.kind() == "identifier" && node_text(&function, source) == "require");
            if !is_loader {
                return;
            }
            let argument = node
                .child_by_field_name("arguments")
                .and_then(|args| children(args).into_iter().find(|c| c.kind() == "string"));
            if let Some(argument) = argument {
                structure.imports.push(ImportRecord::new(
                    unquote(node_text(&argument, source)),
                    location(&node),
                ));
            }
        }
        "export_statement" => {
            for record in script_exports(&node, source, &declared) {
                if record.is_default && std::mem::replace(&mut seen_default, true) {
                    continue;
                }
                structure.exports.push(record);
            }
        }
        "function_declaration" | "generator_function_declaration" => {
            if let Some(name) = field_text(&node, "name", source) {
                structure.functions.push(FunctionRecord::new(
                    name,
                    location(&node),
                    has_token(&node, "async"),
                ));
            }
        }
        "variable_declarator" => {
            let Some(value) = node.child_by_field_name("value") else {
                return;
            };
            if !matches!(
                value.kind(),
                "arrow_function" | "function_expression" | "function" | "generator_function"
            ) {
                return;
            }
            if let Some(name) = field_text(&node, "name", source) {
                structure.functions.push(FunctionRecord::new(
                    name,
                    location(&node),
                    has_token(&value, "async"),
                ));
            }
        }
        "class_declaration" | "abstract_class_declaration" | "interface_declaration" => {
            if let Some(record) = script_class(&node, source) {
                structure.classes.push(record);
            }
        }
        "type_alias_declaration" => {
            if let Some(name) = field_text(&node, "name", source) {
                structure.classes.push(ClassRecord {
                    name: name.to_string(),
                    kind: ClassKind::Type,
                    methods: Vec::new(),
                    properties: Vec::new(),
                    location: location(&node),
                    exported: is_exported_node(&node),
                });
            }
        }
        _ => {}
    });

    let export_names: Vec<&str> = structure.exports.iter().map(|e| e.name.as_str()).collect();
    let re_exported: Vec<bool> = structure
        .classes
        .iter()
        .map(|c| export_names.contains(&c.name.as_str()))
        .collect();
    for (class, re_exported) in structure.classes.iter_mut().zip(re_exported) {
        class.exported |= re_exported;
    }
    structure
}

fn is_exported_node(node: &Node) -> bool {
    node.parent().is_some_and(|p| p.kind() == "export_statement")
}

fn script_exports(node: &Node, source: &str, declared: &HashMap<&str, ExportKind>) -> Vec<ExportRecord> {
    let is_default = has_token(node, "default");
    let loc = Location::line(node.start_position().row + 1);
    let record = |name: &str, kind: ExportKind, is_default: bool| ExportRecord {
        name: name.to_string(),
        kind,
        location: loc,
        is_default,
    };

    if let Some(decl) = node.child_by_field_name("declaration") {
        let kind = declaration_kind(&decl, source).unwrap_or(ExportKind::Variable);
        let names = declared_names(&decl, source);
        if names.is_empty() && is_default {
            return vec![record("default", kind, true)];
        }
        return names
            .into_iter()
            .map(|name| record(name, kind, is_default))
            .collect();
    }

    if is_default {
        let Some(value) = node.child_by_field_name("value") else {
            return vec![record("default", ExportKind::Default, true)];
        };
        let (name, kind) = match value.kind() {
            "identifier" => {
                let name = node_text(&value, source);
                (name, declared.get(name).copied().unwrap_or(ExportKind::Default))
            }
            "class" => (
                field_text(&value, "name", source).unwrap_or("default"),
                ExportKind::Class,
            ),
            "function_expression" | "function" | "arrow_function" | "generator_function" => (
                field_text(&value, "name", source).unwrap_or("default"),
                ExportKind::Function,
            ),
            _ => ("default", ExportKind::Default),
        };
        return vec![record(name, kind, true)];
    }

    let mut records = Vec::new();
    for clause in children(*node).into_iter().filter(|c| c.kind() == "export_clause") {
        for spec in children(clause).into_iter().filter(|c| c.kind() == "export_specifier") {
            let Some(local) = field_text(&spec, "name", source) else {
                continue;
            };
            let is_default = field_text(&spec, "alias", source) == Some("default");
            let fallback = if is_default {
                ExportKind::Default
            } else {
                ExportKind::Variable
            };
            let kind = declared.get(local).copied().unwrap_or(fallback);
            records.push(record(local, kind, is_default));
        }
    }
    records
}

fn script_class(node: &Node, source: &str) -> Option<ClassRecord> {
    let name = field_text(node, "name", source)?;
    let is_interface = node.kind() == "interface_declaration";
    let mut methods: Vec<String> = Vec::new();
    let mut properties: Vec<String> = Vec::new();

    if let Some(body) = node.child_by_field_name("body") {
        for member in children(body) {
            let (target, field) = match member.kind() {
                "method_definition" | "method_signature" | "abstract_method_signature" => {
                    (&mut methods, "name")
                }
                "public_field_definition" | "property_signature" => (&mut properties, "name"),
                "field_definition" => (&mut properties, "property"),
                _ => continue,
            };
            if let Some(member_name) = field_text(&member, field, source) {
                if !target.iter().any(|m| m == member_name) {
                    target.push(member_name.to_string());
                }
            }
        }
    }

    Some(ClassRecord {
        name: name.to_string(),
        kind: if is_interface {
            ClassKind::Interface
        } else {
            ClassKind::Class
        },
        methods,
        properties,
        location: location(node),
        exported: is_exported_node(node),
    })
}

// Python

/// The definition wrapped by a `decorated_definition`, or the node itself
fn undecorated<'t>(node: Node<'t>) -> Node<'t> {
    if node.kind() == "decorated_definition" {
        node.child_by_field_name("definition").unwrap_or(node)
    } else {
        node
    }
}

fn python(root: Node<'_>, source: &str) -> FileStructure {
    let mut structure = FileStructure::empty(Language::Python);

    visit(root, &mut |node| match node.kind() {
        "import_statement" => {
            for child in children(node) {
                let module = match child.kind() {
                    "dotted_name" => Some(node_text(&child, source)),
                    "aliased_import" => field_text(&child, "name", source),
                    _ => None,
                };
                if let Some(module) = module {
                    structure
                        .imports
                        .push(ImportRecord::new(module, location(&node)));
                }
            }
        }
        "import_from_statement" => {
            if let Some(module) = field_text(&node, "module_name", source) {
                structure
                    .imports
                    .push(ImportRecord::new(module, location(&node)));
            }
        }
        "class_definition" => {
            if let Some(record) = python_class(&node, source) {
                structure.classes.push(record);
            }
        }
        _ => {}
    });

    for top in children(root).into_iter().map(undecorated) {
        let Some(name) = field_text(&top, "name", source) else {
            continue;
        };
        let kind = match top.kind() {
            "function_definition" => {
                structure.functions.push(FunctionRecord::new(
                    name,
                    location(&top),
                    has_token(&top, "async"),
                ));
                ExportKind::Function
            }
            "class_definition" => ExportKind::Class,
            _ => continue,
        };
        if !is_mangled(name) {
            structure.exports.push(ExportRecord {
                name: name.to_string(),
                kind,
                location: Location::line(top.start_position().row + 1),
                is_default: false,
            });
        }
    }
    structure
}

fn python_class(node: &Node, source: &str) -> Option<ClassRecord> {
    let name = field_text(node, "name", source)?;
    let mut methods: Vec<String> = Vec::new();
    let mut properties: Vec<String> = Vec::new();
    let push = |list: &mut Vec<String>, value: &str| {
        if !list.iter().any(|v| v == value) {
            list.push(value.to_string());
        }
    };

    if let Some(body) = node.child_by_field_name("body") {
        for statement in children(body) {
            let statement = undecorated(statement);
            match statement.kind() {
                "function_definition" => {
                    if let Some(method) = field_text(&statement, "name", source) {
                        push(&mut methods, method);
                    }
                    if let Some(method_body) = statement.child_by_field_name("body") {
                        for attr in self_assignments(method_body, source) {
                            push(&mut properties, attr);
                        }
                    }
                }
                "expression_statement" => {
                    for assignment in children(statement)
                        .into_iter()
                        .filter(|c| c.kind() == "assignment")
                    {
                        let left = assignment.child_by_field_name("left");
                        if let Some(left) = left.filter(|l| l.kind() == "identifier") {
                            push(&mut properties, node_text(&left, source));
                        }
                    }
                }
                _ => {}
            }
        }
    }

    let top_level = node
        .parent()
        .and_then(|p| {
            if p.kind() == "decorated_definition" {
                p.parent()
            } else {
                Some(p)
            }
        })
        .is_some_and(|p| p.kind() == "module");

    Some(ClassRecord {
        name: name.to_string(),
        kind: ClassKind::Class,
        methods,
        properties,
        location: location(node),
        exported: top_level && !is_mangled(name),
    })
}

/// `self.<attr>` assignment targets in a method body, not descending into
/// nested classes.
fn self_assignments<'s>(body: Node<'_>, source: &'s str) -> Vec<&'s str> {
    let mut found = Vec::new();
    let mut stack = vec![body];
    while let Some(node) = stack.pop() {
        if node.kind() == "class_definition" {
            continue;
        }
        if node.kind() == "assignment" {
            let target = node
                .child_by_field_name("left")
                .filter(|l| l.kind() == "attribute")
                .filter(|l| field_text(l, "object", source) == Some("self"));
            if let Some(attr) = target.and_then(|l| field_text(&l, "attribute", source)) {
                found.push((node.start_byte(), attr));
            }
        }
        stack.extend(children(node));
    }
    found.sort_by_key(|(offset, _)| *offset);
    found.into_iter().map(|(_, attr)| attr).collect()
}
