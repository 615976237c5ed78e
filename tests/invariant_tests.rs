//! Universal invariants of the decorated program.
//!
//! These properties must hold for any program the pipeline accepts:
//! every recorded scope descends from the root, declaration chains are
//! finite, no transient type former survives resolution, and every
//! selected type is a member of its expression's potential set.

use p4_frontend::analyze;
use p4_frontend::ast::{Ast, AstBuilder, AstId, AstOp, ParamDirection};
use p4_frontend::ir::type_table::Type;
use p4_frontend::ir::{SymbolTable, TypedProgram};

/// A program touching most of the surface: records, typedefs, enums,
/// externs, a parser with selects, and a control with a table.
fn representative_program() -> (Ast, Vec<AstId>) {
    let mut b = AstBuilder::new();

    let mk = b.match_kind_decl(vec!["exact", "lpm"]);
    let errs = b.error_decl(vec!["NoMatch"]);

    let bit48 = b.bit_type(Some(48));
    let mac_td = b.typedef_decl(bit48, "MacAddr");

    let dst_ty = b.named_type("MacAddr");
    let dst = b.struct_field(dst_ty, "dst");
    let et_ty = b.bit_type(Some(16));
    let et = b.struct_field(et_ty, "etherType");
    let eth = b.header_decl("Eth", vec![dst, et]);

    let eth_ref = b.named_type("Eth");
    let eth_field = b.struct_field(eth_ref, "eth");
    let hdrs = b.struct_decl("Headers", vec![eth_field]);

    let proto_enum = b.enum_decl("Proto", vec!["Tcp", "Udp"]);

    // parser P(Headers h)
    let h_ref = b.named_type("Headers");
    let h_param = b.param(ParamDirection::InOut, h_ref, "h");
    let p_params = b.param_list(vec![h_param]);
    let p_proto = b.parser_type_decl("P", p_params);
    let h_name = b.name("h");
    let eth_sel = b.member(h_name, "eth");
    let et_sel = b.member(eth_sel, "etherType");
    let v800 = b.int_literal(0x800);
    let k1 = b.simple_keyset(v800);
    let case1 = b.select_case(k1, "accept");
    let dc = b.dontcare();
    let k2 = b.simple_keyset(dc);
    let case2 = b.select_case(k2, "reject");
    let transition = b.transition_select(vec![et_sel], vec![case1, case2]);
    let start = b.parser_state("start", vec![], Some(transition));
    let parser = b.parser_decl(p_proto, None, vec![], vec![start]);

    // control C(Headers h) { bit<16> t; apply { t = h.eth.etherType + 1; } }
    let h_ref2 = b.named_type("Headers");
    let h_param2 = b.param(ParamDirection::InOut, h_ref2, "h");
    let c_params = b.param_list(vec![h_param2]);
    let c_proto = b.control_type_decl("C", c_params);
    let t_ty = b.bit_type(Some(16));
    let t_var = b.var_decl(t_ty, "t", None);
    let t_ref = b.name("t");
    let h_name2 = b.name("h");
    let eth_sel2 = b.member(h_name2, "eth");
    let et_sel2 = b.member(eth_sel2, "etherType");
    let one = b.int_literal(1);
    let sum = b.binary(AstOp::Add, et_sel2, one);
    let assign = b.assign(t_ref, sum);
    let body = b.block(vec![assign]);
    let ctrl = b.control_decl(c_proto, None, vec![t_var], body);

    let interesting = vec![v800, et_sel, sum, one];
    (
        b.program(vec![mk, errs, mac_td, eth, hdrs, proto_enum, parser, ctrl]),
        interesting,
    )
}

fn analyzed() -> (TypedProgram, Vec<AstId>) {
    let (ast, interesting) = representative_program();
    let program = analyze(ast, SymbolTable::new()).expect("well-typed");
    (program, interesting)
}

#[test]
fn every_recorded_scope_descends_from_the_root() {
    let (program, _) = analyzed();
    let symbols = program.symbols();
    for scope in program.scope_map().values() {
        assert!(symbols.is_descendant_of(*scope, symbols.root()));
    }
}

#[test]
fn declaration_chains_are_acyclic_and_finite() {
    let (program, _) = analyzed();
    let symbols = program.symbols();
    for (id, _) in symbols.decls() {
        // A cycle would make the chain longer than the declaration count.
        let mut steps = 0;
        for _ in symbols.chain(id) {
            steps += 1;
            assert!(steps <= symbols.decls().count(), "chain must terminate");
        }
    }
}

#[test]
fn no_transient_former_survives_resolution() {
    let (program, _) = analyzed();
    let types = program.types();
    for id in types.ids() {
        match types.get(id) {
            Type::Nameref { .. } => panic!("nameref survived the sweep"),
            Type::Pending => panic!("reserved slot was never filled"),
            Type::Alias { target } => {
                assert!(
                    !matches!(types.get(*target), Type::Alias { .. } | Type::Typedef { .. }),
                    "alias points at a collapsed type"
                );
            }
            _ => {}
        }
    }
    // No declaration's installed type is a nameref or typedef.
    for (_, decl) in program.symbols().decls() {
        if let Some(ty) = decl.ty {
            assert!(!matches!(
                types.get(ty),
                Type::Nameref { .. } | Type::Typedef { .. }
            ));
        }
    }
}

#[test]
fn populated_products_match_their_length() {
    let (program, _) = analyzed();
    let types = program.types();
    for id in types.ids() {
        if let Type::Product { members } = types.get(id) {
            for member in members {
                // Members are real arena entries, never unfilled slots.
                assert!(!matches!(types.get(*member), Type::Pending));
            }
        }
    }
}

#[test]
fn selected_types_come_from_the_potential_sets() {
    let (program, interesting) = analyzed();
    let types = program.types();
    for (node, chosen) in program.selected_type() {
        if let Some(set) = program.potype_map().get(node) {
            assert!(
                set.contains(types, *chosen),
                "selection outside the potential set"
            );
        }
    }
    // The nodes this program cares about were all selected.
    for node in interesting {
        assert!(program.type_of(node).is_some());
    }
}

#[test]
fn analysis_is_deterministic_across_runs() {
    let (ast_a, _) = representative_program();
    let (ast_b, _) = representative_program();
    let a = analyze(ast_a, SymbolTable::new()).expect("well-typed");
    let b = analyze(ast_b, SymbolTable::new()).expect("well-typed");

    assert_eq!(a.symbols().scope_count(), b.symbols().scope_count());
    assert_eq!(a.types().len(), b.types().len());
    assert_eq!(a.scope_map().len(), b.scope_map().len());
    assert_eq!(a.selected_type().len(), b.selected_type().len());
    for (node, ty) in a.selected_type() {
        assert_eq!(
            a.types().describe(a.types().effective(*ty)),
            b.types().describe(b.types().effective(b.selected_type()[node])),
        );
    }
}

#[test]
fn the_augmented_ast_is_part_of_the_output() {
    let (program, _) = analyzed();
    // The synthesized apply prototypes are visible in the returned tree.
    let ast = program.ast();
    let root = ast.root().expect("rooted");
    let applies = ast
        .preorder(root)
        .filter(|n| {
            matches!(
                ast.kind(*n),
                p4_frontend::ast::AstKind::FunctionPrototype { name, .. }
                    if ast.name_str(*name) == "apply"
            )
        })
        .count();
    // One per parser type and one per control type.
    assert_eq!(applies, 2);
}
