//! TypeScript structural parser.
//!
//! JavaScript's walker with the type-level construct set enabled:
//! interfaces, type aliases, enums, namespaces, generics, and member
//! visibility modifiers.

use crate::config::ParserConfig;
use crate::languages::script::parse_script;
use crate::languages::{LanguageParser, Parse};
use quarry_core::lang::languages::LanguageId;

/// Structural parser for TypeScript source.
pub struct TypeScriptParser {
    config: ParserConfig,
}

impl TypeScriptParser {
    pub fn new() -> Self {
        Self {
            config: ParserConfig::default(),
        }
    }

    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }
}

impl Default for TypeScriptParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageParser for TypeScriptParser {
    fn language(&self) -> LanguageId {
        LanguageId::TypeScript
    }

    #[tracing::instrument(skip_all, fields(source_len = source.len()))]
    fn parse(&self, source: &str) -> Parse {
        parse_script(source, LanguageId::TypeScript, self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::PropValue;
    use crate::symbols::SymbolKind;
    use quarry_core::lang::nodes::{self, props};

    fn parse(source: &str) -> Parse {
        TypeScriptParser::new().parse(source)
    }

    fn prop_str<'a>(p: &'a Parse, id: crate::ast::NodeId, key: &str) -> Option<&'a str> {
        match p.ast.prop(id, key) {
            Some(PropValue::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    #[test]
    fn test_interface_declaration() {
        let src = "interface Point extends Base {\n  x: number;\n  y: number;\n}\n";
        let p = parse(src);
        let i = p.ast.nodes_of_type(nodes::INTERFACE_DECLARATION).next().unwrap();
        assert_eq!(prop_str(&p, i, props::NAME), Some("Point"));
        let sym = p.symbols.symbols().iter().find(|s| s.name == "Point").unwrap();
        assert_eq!(sym.kind, SymbolKind::Interface);
        // Interface members are signatures, not statements: no children.
        assert!(p.ast.children(i).is_empty());
    }

    #[test]
    fn test_type_alias() {
        let p = parse("export type Result<T> = { ok: boolean; value: T };\n");
        let t = p.ast.nodes_of_type(nodes::TYPE_ALIAS_DECLARATION).next().unwrap();
        assert_eq!(prop_str(&p, t, props::NAME), Some("Result"));
        assert_eq!(prop_str(&p, t, props::TYPE_PARAMS), Some("T"));
        assert_eq!(p.ast.prop(t, props::EXPORTED), Some(&PropValue::Bool(true)));
        let sym = p.symbols.symbols().iter().find(|s| s.name == "Result").unwrap();
        assert_eq!(sym.kind, SymbolKind::TypeAlias);
    }

    #[test]
    fn test_type_as_identifier_is_not_a_declaration() {
        let p = parse("const type = 5;\nuse(type);\n");
        assert_eq!(p.ast.nodes_of_type(nodes::TYPE_ALIAS_DECLARATION).count(), 0);
    }

    #[test]
    fn test_enum_declaration() {
        let p = parse("enum Color {\n  Red,\n  Green = 3,\n  Blue,\n}\n");
        let e = p.ast.nodes_of_type(nodes::ENUM_DECLARATION).next().unwrap();
        assert_eq!(prop_str(&p, e, props::NAME), Some("Color"));
        let Some(PropValue::List(members)) = p.ast.prop(e, props::MEMBERS) else {
            panic!("members missing");
        };
        assert_eq!(
            members,
            &vec![
                PropValue::Str("Red".into()),
                PropValue::Str("Green".into()),
                PropValue::Str("Blue".into())
            ]
        );
        let sym = p.symbols.symbols().iter().find(|s| s.name == "Color").unwrap();
        assert_eq!(sym.kind, SymbolKind::Enum);
    }

    #[test]
    fn test_const_enum() {
        let p = parse("const enum Flags { A, B }\n");
        let e = p.ast.nodes_of_type(nodes::ENUM_DECLARATION).next().unwrap();
        assert_eq!(p.ast.prop(e, props::CONST), Some(&PropValue::Bool(true)));
        // No variable declaration is fabricated for the `const` keyword.
        assert_eq!(p.ast.nodes_of_type(nodes::VARIABLE_DECLARATION).count(), 0);
    }

    #[test]
    fn test_namespace_with_contents() {
        let src = "namespace Geometry {\n  export function area(r: number) {\n    return r * r;\n  }\n}\n";
        let p = parse(src);
        let n = p.ast.nodes_of_type(nodes::NAMESPACE_DECLARATION).next().unwrap();
        assert_eq!(prop_str(&p, n, props::NAME), Some("Geometry"));

        // The function nests inside the namespace, and its symbol lives in
        // the namespace scope.
        let f = p
            .ast
            .children(n)
            .iter()
            .copied()
            .find(|&id| p.ast.node(id).node_type == nodes::FUNCTION_DECLARATION)
            .unwrap();
        assert_eq!(prop_str(&p, f, props::NAME), Some("area"));
        let area = p.symbols.symbols().iter().find(|s| s.name == "area").unwrap();
        assert_ne!(area.scope, 0);
    }

    #[test]
    fn test_generic_function_and_class() {
        let src = "function identity<T>(value: T): T {\n  return value;\n}\nclass Box<T, U extends Base> {\n  hold(v: T) {\n    this.v = v;\n  }\n}\n";
        let p = parse(src);
        let f = p.ast.nodes_of_type(nodes::FUNCTION_DECLARATION).next().unwrap();
        assert_eq!(prop_str(&p, f, props::TYPE_PARAMS), Some("T"));
        let c = p.ast.nodes_of_type(nodes::CLASS_DECLARATION).next().unwrap();
        assert_eq!(prop_str(&p, c, props::TYPE_PARAMS), Some("T, U extends Base"));
    }

    #[test]
    fn test_visibility_modifiers_on_members() {
        let src = "class Account {\n  private balance = 0;\n  public deposit(amount: number) {\n    this.balance += amount;\n  }\n}\n";
        let p = parse(src);
        let field = p.ast.nodes_of_type(nodes::VARIABLE_DECLARATION).next().unwrap();
        let Some(PropValue::List(mods)) = p.ast.prop(field, props::MODIFIERS) else {
            panic!("field modifiers missing");
        };
        assert_eq!(mods, &vec![PropValue::Str("private".into())]);

        let m = p.ast.nodes_of_type(nodes::METHOD_DEFINITION).next().unwrap();
        assert_eq!(prop_str(&p, m, props::NAME), Some("deposit"));
        let Some(PropValue::List(mmods)) = p.ast.prop(m, props::MODIFIERS) else {
            panic!("method modifiers missing");
        };
        assert_eq!(mmods, &vec![PropValue::Str("public".into())]);
    }

    #[test]
    fn test_annotation_types_are_not_bindings() {
        let p = parse("const count: Map<string, number> = new Map();\n");
        let names: Vec<_> = p
            .symbols
            .symbols()
            .iter()
            .filter(|s| s.kind == SymbolKind::Variable)
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["count"]);
    }

    #[test]
    fn test_declare_function_without_body() {
        let p = parse("declare function external(x: number): void;\n");
        let f = p.ast.nodes_of_type(nodes::FUNCTION_DECLARATION).next().unwrap();
        assert_eq!(p.ast.prop(f, props::DECLARE), Some(&PropValue::Bool(true)));
        assert!(p.ast.prop(f, props::UNTERMINATED).is_none());
    }

    #[test]
    fn test_abstract_class() {
        let p = parse("abstract class Shape {\n  area(): number;\n}\n");
        let c = p.ast.nodes_of_type(nodes::CLASS_DECLARATION).next().unwrap();
        assert_eq!(p.ast.prop(c, props::ABSTRACT), Some(&PropValue::Bool(true)));
    }

    #[test]
    fn test_type_only_import() {
        let p = parse("import type { Config } from './config';\n");
        let cfg = p.symbols.symbols().iter().find(|s| s.name == "Config").unwrap();
        assert_eq!(cfg.kind, SymbolKind::Import);
        let node = p.ast.nodes_of_type(nodes::IMPORT_DECLARATION).next().unwrap();
        assert_eq!(prop_str(&p, node, props::SOURCE), Some("./config"));
    }
}
