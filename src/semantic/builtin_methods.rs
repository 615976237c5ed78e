//! Built-in method injection.
//!
//! P4 gives every parser type, control type, and table an implicit `apply`.
//! This pass makes the method explicit: it appends a synthesized
//! `functionPrototype` named `apply` with a `void` return to each such
//! declaration's method list, so every later pass sees `.apply(...)` as an
//! ordinary method call.
//!
//! The prototype's parameter list is a deep copy of the declaration's own
//! parameters (empty for tables): later annotation of the copy must not
//! alias the original subtree. Source coordinates are inherited from the
//! declaration. This is the only pass that mutates the AST.

use crate::ast::{Ast, AstId, AstKind};

/// Runs the injection over the whole arena.
pub(crate) fn run(ast: &mut Ast) {
    // Collect targets first; injection appends nodes while iterating.
    let mut targets: Vec<(AstId, Option<AstId>, AstId)> = Vec::new();
    for idx in 0..ast.len() {
        let id = AstId::new(idx);
        match ast.kind(id) {
            AstKind::ParserTypeDeclaration {
                params,
                method_protos,
                ..
            }
            | AstKind::ControlTypeDeclaration {
                params,
                method_protos,
                ..
            } => targets.push((id, Some(*params), *method_protos)),
            AstKind::TableDeclaration { method_protos, .. } => {
                targets.push((id, None, *method_protos))
            }
            _ => {}
        }
    }

    for (decl, params, method_protos) in targets {
        let proto = synthesize_apply(ast, decl, params);
        match ast.kind_mut(method_protos) {
            AstKind::MethodPrototypes { items } => items.push(proto),
            other => panic!("method prototype list expected, found {:?}", other),
        }
    }
}

/// Builds the `void apply(<params>)` prototype for `decl`.
fn synthesize_apply(ast: &mut Ast, decl: AstId, params: Option<AstId>) -> AstId {
    let loc = ast.loc(decl);

    let params = match params {
        Some(params) => ast.deep_clone(params),
        None => ast.push(AstKind::ParameterList { items: Vec::new() }, loc),
    };
    let void_name = ast.push(
        AstKind::Name {
            strname: "void".into(),
        },
        loc,
    );
    let return_type = ast.push(AstKind::BaseTypeVoid { name: void_name }, loc);
    let name = ast.push(
        AstKind::Name {
            strname: "apply".into(),
        },
        loc,
    );
    ast.push(
        AstKind::FunctionPrototype {
            return_type: Some(return_type),
            name,
            params,
        },
        loc,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AstBuilder, ParamDirection};

    fn apply_protos(ast: &Ast, method_protos: AstId) -> Vec<AstId> {
        ast.list(method_protos)
            .iter()
            .copied()
            .filter(|p| match ast.kind(*p) {
                AstKind::FunctionPrototype { name, .. } => ast.name_str(*name) == "apply",
                _ => false,
            })
            .collect()
    }

    #[test]
    fn parser_type_gains_an_apply_with_cloned_params() {
        let mut b = AstBuilder::new();
        let pkt_ty = b.named_type("packet_in");
        let p = b.param(ParamDirection::None, pkt_ty, "pkt");
        let params = b.param_list(vec![p]);
        let proto = b.parser_type_decl("P", params);
        let decl = b.parser_decl(proto, None, vec![], vec![]);
        let mut ast = b.program(vec![decl]);

        run(&mut ast);

        let AstKind::ParserTypeDeclaration { method_protos, .. } = ast.kind(proto).clone() else {
            panic!("parser prototype expected");
        };
        let applies = apply_protos(&ast, method_protos);
        assert_eq!(applies.len(), 1);

        let AstKind::FunctionPrototype {
            params: apply_params,
            return_type,
            ..
        } = ast.kind(applies[0]).clone()
        else {
            unreachable!();
        };
        // The clone carries the same parameter shape under fresh nodes.
        assert_ne!(apply_params, params);
        assert_eq!(ast.list(apply_params).len(), 1);
        assert!(matches!(
            ast.kind(return_type.expect("void return")),
            AstKind::BaseTypeVoid { .. }
        ));
        // Coordinates come from the declaration.
        assert_eq!(ast.loc(applies[0]), ast.loc(proto));
    }

    #[test]
    fn table_gains_a_no_argument_apply() {
        let mut b = AstBuilder::new();
        let table = b.table_decl("ipv4_lpm", vec![]);
        let mut ast = b.program(vec![table]);

        run(&mut ast);

        let AstKind::TableDeclaration { method_protos, .. } = ast.kind(table).clone() else {
            panic!("table expected");
        };
        let applies = apply_protos(&ast, method_protos);
        assert_eq!(applies.len(), 1);
        let AstKind::FunctionPrototype { params, .. } = ast.kind(applies[0]).clone() else {
            unreachable!();
        };
        assert!(ast.list(params).is_empty());
    }

    #[test]
    fn injection_is_per_declaration() {
        let mut b = AstBuilder::new();
        let params_a = b.param_list(vec![]);
        let proto_a = b.parser_type_decl("A", params_a);
        let params_b = b.param_list(vec![]);
        let proto_b = b.control_type_decl("B", params_b);
        let mut ast = b.program(vec![proto_a, proto_b]);

        run(&mut ast);

        for proto in [proto_a, proto_b] {
            let method_protos = match ast.kind(proto) {
                AstKind::ParserTypeDeclaration { method_protos, .. }
                | AstKind::ControlTypeDeclaration { method_protos, .. } => *method_protos,
                _ => unreachable!(),
            };
            assert_eq!(apply_protos(&ast, method_protos).len(), 1);
        }
    }
}
