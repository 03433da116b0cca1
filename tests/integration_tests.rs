//! End-to-end tests for the quarry parsing toolkit.
//!
//! Everything here goes through the public factory surface the way an
//! editing service would: resolve a parser, hand it raw (possibly broken)
//! source, and read the AST, warnings, and symbol table back.

use quarry::{PropValue, SymbolKind, WarningKind, create_parser, to_serializable};
use serde_json::Value;

fn parse(lang: &str, source: &str) -> quarry::Parse {
    create_parser(lang)
        .unwrap_or_else(|| panic!("no parser registered for {lang}"))
        .parse(source)
}

fn nodes_of<'a>(p: &'a quarry::Parse, node_type: &'a str) -> Vec<quarry::NodeId> {
    p.ast.nodes_of_type(node_type).collect()
}

// ============================================================================
// Python: function with parameters and a body
// ============================================================================

#[test]
fn test_python_function_roundtrip() {
    let p = parse("python", "def f(a, b=10):\n    return a*b\n");

    let funcs = nodes_of(&p, "function_declaration");
    assert_eq!(funcs.len(), 1);
    let f = funcs[0];
    assert_eq!(p.ast.prop(f, "name"), Some(&PropValue::Str("f".into())));

    let Some(PropValue::List(params)) = p.ast.prop(f, "params") else {
        panic!("params missing");
    };
    assert_eq!(params.len(), 2);
    let PropValue::Map(second) = &params[1] else {
        panic!("param shape");
    };
    assert_eq!(second.get("name"), Some(&PropValue::Str("b".into())));
    assert_eq!(second.get("default"), Some(&PropValue::Str("10".into())));

    // Module scope holds exactly one function symbol, on line 1.
    let by_scope = p.symbols.get_symbols_by_scope();
    let module: Vec<_> = by_scope[&0]
        .iter()
        .filter(|s| s.kind == SymbolKind::Function)
        .collect();
    assert_eq!(module.len(), 1);
    assert_eq!(module[0].name, "f");
    assert_eq!(module[0].line, 1);
}

// ============================================================================
// JavaScript: function with a nested if-block
// ============================================================================

#[test]
fn test_javascript_nested_block() {
    let p = parse("javascript", "function f() {\n  if (x) {\n    return 1;\n  }\n}");

    let funcs = nodes_of(&p, "function_declaration");
    assert_eq!(funcs.len(), 1);
    let blocks: Vec<_> = p
        .ast
        .children(funcs[0])
        .iter()
        .copied()
        .filter(|&id| p.ast.node(id).node_type == "block")
        .collect();
    assert_eq!(blocks.len(), 1);
    assert_eq!(p.ast.prop(blocks[0], "keyword"), Some(&PropValue::Str("if".into())));
}

// ============================================================================
// Unterminated string literal
// ============================================================================

#[test]
fn test_unterminated_string_is_a_root_warning() {
    for (lang, src) in [("python", "x = 'unclosed"), ("javascript", "x = 'unclosed")] {
        let p = parse(lang, src);
        assert!(
            p.ast
                .warnings
                .iter()
                .any(|w| w.kind == WarningKind::LexicalUnterminated),
            "{lang}: expected a lexical-unterminated warning"
        );
    }
}

// ============================================================================
// Orphan close braces
// ============================================================================

#[test]
fn test_orphan_braces_are_error_nodes() {
    let p = parse("javascript", "function f() {\n  return 1;\n}\n}}}\n");
    assert_eq!(nodes_of(&p, "function_declaration").len(), 1);
    assert_eq!(nodes_of(&p, "error").len(), 3);
    // The function body itself closed at its matching brace.
    let f = nodes_of(&p, "function_declaration")[0];
    assert!(p.ast.prop(f, "unterminated").is_none());
}

// ============================================================================
// Unknown language
// ============================================================================

#[test]
fn test_unknown_language_is_absent() {
    assert!(create_parser("cobol").is_none());
}

// ============================================================================
// Brace-style invariance
// ============================================================================

#[test]
fn test_brace_styles_produce_identical_structure() {
    let knr = "function f() {\n  if (x) {\n    y();\n  }\n}";
    let allman = "function f()\n{\n  if (x)\n  {\n    y();\n  }\n}";
    let whitesmiths = "function f()\n  {\n  if (x)\n    {\n    y();\n    }\n  }";
    let gnu = "function f()\n  {\n    if (x)\n      {\n        y();\n      }\n  }";

    let shapes: Vec<Vec<String>> = [knr, allman, whitesmiths, gnu]
        .iter()
        .map(|src| {
            let p = parse("javascript", src);
            p.ast
                .ids()
                .map(|id| {
                    let n = p.ast.node(id);
                    format!("{}:{}", n.node_type, n.children.len())
                })
                .collect()
        })
        .collect();

    assert_eq!(shapes[0], shapes[1]);
    assert_eq!(shapes[0], shapes[2]);
    assert_eq!(shapes[0], shapes[3]);
}

// ============================================================================
// Symbol round-trip
// ============================================================================

#[test]
fn test_top_level_declaration_count_matches_symbols() {
    let src = "def a():\n    pass\n\ndef b():\n    pass\n\nclass C:\n    pass\n";
    let p = parse("python", src);
    let by_scope = p.symbols.get_symbols_by_scope();
    let module: Vec<_> = by_scope[&0]
        .iter()
        .filter(|s| matches!(s.kind, SymbolKind::Function | SymbolKind::Class))
        .collect();
    assert_eq!(module.len(), 3);
    assert_eq!(module[0].name, "a");
    assert_eq!(module[0].line, 1);
    assert_eq!(module[1].name, "b");
    assert_eq!(module[1].line, 4);
    assert_eq!(module[2].name, "C");
    assert_eq!(module[2].line, 7);
}

// ============================================================================
// Serialization
// ============================================================================

fn assert_no_parent_key(value: &Value) {
    match value {
        Value::Object(obj) => {
            assert!(!obj.contains_key("parent"), "parent key leaked: {value}");
            obj.values().for_each(assert_no_parent_key);
        }
        Value::Array(items) => items.iter().for_each(assert_no_parent_key),
        _ => {}
    }
}

#[test]
fn test_serialized_tree_is_json_compatible_and_parent_free() {
    let src = "class Greeter:\n    def greet(self, name):\n        return name\n";
    let p = parse("python", src);
    let value = to_serializable(&p.ast);
    assert_no_parent_key(&value);

    // JSON round-trip: the transform's output is plain data.
    let text = serde_json::to_string(&value).unwrap();
    let back: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(back["node_type"], "module");
    assert_eq!(back["children"][0]["node_type"], "class_declaration");
}

#[test]
fn test_warnings_serialize_on_the_root() {
    let p = parse("python", "x = 'unclosed");
    let value = to_serializable(&p.ast);
    assert_eq!(value["warnings"][0]["kind"], "lexical_unterminated");
}

// ============================================================================
// Exclusion inertness end to end
// ============================================================================

#[test]
fn test_braces_in_literals_never_alter_structure() {
    let cases = [
        ("javascript", "function f() {\n  const s = \"}}}{{{\";\n  return s;\n}\n"),
        ("javascript", "function f() {\n  // } } }\n  return 1;\n}\n"),
        ("javascript", "function f() {\n  /* } */\n  return 1;\n}\n"),
        ("javascript", "function f() {\n  const re = /}/;\n  return re;\n}\n"),
        ("javascript", "function f() {\n  const t = `}${ok}{`;\n  return t;\n}\n"),
        ("typescript", "function f() {\n  const s = '}';\n  return s;\n}\n"),
    ];
    for (lang, src) in cases {
        let p = parse(lang, src);
        let funcs = nodes_of(&p, "function_declaration");
        assert_eq!(funcs.len(), 1, "{src:?}");
        assert!(
            p.ast.prop(funcs[0], "unterminated").is_none(),
            "literal braces broke the block scan for {src:?}"
        );
        assert_eq!(nodes_of(&p, "error").len(), 0, "{src:?}");
    }
}

#[test]
fn test_python_indentation_inside_string_is_inert() {
    let src = "def f():\n    s = '''\nno indent here\n    '''\n    return s\ng = 1\n";
    let p = parse("python", src);
    let funcs = nodes_of(&p, "function_declaration");
    assert_eq!(funcs.len(), 1);
    assert!(p.ast.prop(funcs[0], "unterminated").is_none());
    // g is back at module level.
    let g = p.symbols.symbols().iter().find(|s| s.name == "g").unwrap();
    assert_eq!(g.scope, 0);
}

// ============================================================================
// Cross-call independence
// ============================================================================

#[test]
fn test_parses_share_no_state() {
    // Same parser instance, repeated calls: results are independent.
    let parser = create_parser("python").unwrap();
    let first = parser.parse("def one():\n    pass\n");
    let second = parser.parse("def two():\n    pass\n");
    assert_eq!(first.symbols.get_symbols_by_scope()[&0].len(), 1);
    assert_eq!(second.symbols.get_symbols_by_scope()[&0].len(), 1);
    assert_eq!(first.symbols.get_symbols_by_scope()[&0][0].name, "one");
    assert_eq!(second.symbols.get_symbols_by_scope()[&0][0].name, "two");
}

#[test]
fn test_extension_mapping_helper() {
    use quarry::LanguageId;
    assert_eq!(
        quarry_core::lang::languages::from_extension("py"),
        Some(LanguageId::Python)
    );
    assert_eq!(quarry_core::lang::languages::from_extension("unknown"), None);
}
