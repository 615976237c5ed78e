//! Scope hierarchy construction.
//!
//! A single top-down traversal opens a fresh scope for every
//! scope-introducing form and records `scope_map[node]` for every node a
//! later pass will look up: the scope-openers themselves, every statement,
//! and every name occurrence (so that lookups start in the environment the
//! source text appeared in).
//!
//! Declarations with a separate prototype reuse the prototype's scope:
//! a `parserDeclaration` or `controlDeclaration` binds its constructor
//! parameters and locals into the scope its type prototype opened, and a
//! function definition's body block opens a child of the prototype scope.

use crate::ast::{Ast, AstId, AstKind};
use crate::ir::symbol_table::{ScopeId, SymbolTable};
use std::collections::HashMap;

/// Builds the scope tree and the node → scope associations.
pub(crate) fn run(ast: &Ast, symbols: &mut SymbolTable) -> HashMap<AstId, ScopeId> {
    let mut builder = ScopeBuilder {
        ast,
        symbols,
        scope_map: HashMap::new(),
    };
    if let Some(root) = ast.root() {
        let program_scope = builder.symbols.root();
        builder.visit(root, program_scope);
    }
    builder.scope_map
}

struct ScopeBuilder<'a> {
    ast: &'a Ast,
    symbols: &'a mut SymbolTable,
    scope_map: HashMap<AstId, ScopeId>,
}

impl ScopeBuilder<'_> {
    /// Opens a child scope of `current`, records it for `node`, and visits
    /// all children inside it.
    fn open(&mut self, node: AstId, current: ScopeId) -> ScopeId {
        let scope = self.symbols.push_scope(current);
        self.scope_map.insert(node, scope);
        for child in self.ast.children(node) {
            self.visit(child, scope);
        }
        scope
    }

    fn visit(&mut self, node: AstId, current: ScopeId) {
        match self.ast.kind(node) {
            // The program opens the top scope under the seeded root.
            AstKind::P4Program { .. } => {
                self.open(node, current);
            }

            // Scope-opening declarations.
            AstKind::ParserTypeDeclaration { .. }
            | AstKind::ControlTypeDeclaration { .. }
            | AstKind::ExternTypeDeclaration { .. }
            | AstKind::FunctionPrototype { .. }
            | AstKind::HeaderTypeDeclaration { .. }
            | AstKind::HeaderUnionDeclaration { .. }
            | AstKind::StructTypeDeclaration { .. }
            | AstKind::EnumDeclaration { .. }
            | AstKind::ErrorDeclaration { .. }
            | AstKind::MatchKindDeclaration { .. }
            | AstKind::TableDeclaration { .. }
            | AstKind::ActionDeclaration { .. }
            | AstKind::ParserState { .. } => {
                self.open(node, current);
            }

            // A parser or control definition adopts its prototype's scope.
            AstKind::ParserDeclaration {
                proto,
                ctor_params,
                locals,
                states,
            } => {
                let (proto, ctor_params, locals, states) = (*proto, *ctor_params, *locals, *states);
                self.visit(proto, current);
                let inner = self.scope_map[&proto];
                self.scope_map.insert(node, inner);
                if let Some(ctor_params) = ctor_params {
                    self.visit(ctor_params, inner);
                }
                self.visit(locals, inner);
                self.visit(states, inner);
            }
            AstKind::ControlDeclaration {
                proto,
                ctor_params,
                locals,
                apply_stmt,
            } => {
                let (proto, ctor_params, locals, apply_stmt) =
                    (*proto, *ctor_params, *locals, *apply_stmt);
                self.visit(proto, current);
                let inner = self.scope_map[&proto];
                self.scope_map.insert(node, inner);
                if let Some(ctor_params) = ctor_params {
                    self.visit(ctor_params, inner);
                }
                self.visit(locals, inner);
                self.visit(apply_stmt, inner);
            }

            // A function definition adopts its prototype's scope; the body
            // block opens its own child.
            AstKind::FunctionDeclaration { proto, body } => {
                let (proto, body) = (*proto, *body);
                self.visit(proto, current);
                let inner = self.scope_map[&proto];
                self.scope_map.insert(node, inner);
                self.visit(body, inner);
            }

            // Block statements open a scope of their own.
            AstKind::BlockStatement { .. } => {
                self.open(node, current);
            }

            // Conditional bodies that are blocks open their own scope
            // through the arm above; single statements share the current
            // one.
            AstKind::ConditionalStatement { .. }
            | AstKind::AssignmentStatement { .. }
            | AstKind::EmptyStatement
            | AstKind::ReturnStatement { .. }
            | AstKind::ExitStatement
            | AstKind::DirectApplication { .. }
            | AstKind::SwitchStatement { .. }
            | AstKind::TransitionStatement { .. }
            | AstKind::ParserBlockStatement { .. }
            | AstKind::VariableDeclaration { .. }
            | AstKind::Instantiation { .. } => {
                self.scope_map.insert(node, current);
                for child in self.ast.children(node) {
                    self.visit(child, current);
                }
            }

            // Every name occurrence records the environment it appeared in.
            AstKind::Name { .. } => {
                self.scope_map.insert(node, current);
            }

            // Everything else just carries the traversal.
            _ => {
                for child in self.ast.children(node) {
                    self.visit(child, current);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AstBuilder, ParamDirection};
    use crate::semantic::builtin_methods;

    #[test]
    fn program_scope_descends_from_root() {
        let mut b = AstBuilder::new();
        let ty = b.bit_type(Some(8));
        let decl = b.var_decl(ty, "x", None);
        let ast = b.program(vec![decl]);

        let mut symbols = SymbolTable::new();
        let scope_map = run(&ast, &mut symbols);

        let root = ast.root().unwrap();
        let program_scope = scope_map[&root];
        assert_ne!(program_scope, symbols.root());
        assert!(symbols.is_descendant_of(program_scope, symbols.root()));
        assert_eq!(scope_map[&decl], program_scope);
    }

    #[test]
    fn struct_fields_live_in_the_struct_scope() {
        let mut b = AstBuilder::new();
        let f_ty = b.bit_type(Some(8));
        let field = b.struct_field(f_ty, "x");
        let s = b.struct_decl("S", vec![field]);
        let ast = b.program(vec![s]);

        let mut symbols = SymbolTable::new();
        let scope_map = run(&ast, &mut symbols);

        let struct_scope = scope_map[&s];
        let program_scope = scope_map[&ast.root().unwrap()];
        assert_ne!(struct_scope, program_scope);
        assert!(symbols.is_descendant_of(struct_scope, program_scope));
    }

    #[test]
    fn parser_declaration_reuses_prototype_scope() {
        let mut b = AstBuilder::new();
        let params = b.param_list(vec![]);
        let proto = b.parser_type_decl("P", params);
        let transition = b.transition_to("accept");
        let start = b.parser_state("start", vec![], Some(transition));
        let decl = b.parser_decl(proto, None, vec![], vec![start]);
        let mut ast = b.program(vec![decl]);
        builtin_methods::run(&mut ast);

        let mut symbols = SymbolTable::new();
        let scope_map = run(&ast, &mut symbols);

        assert_eq!(scope_map[&decl], scope_map[&proto]);
        // The state opens its own scope under the parser scope.
        assert_ne!(scope_map[&start], scope_map[&proto]);
        assert!(symbols.is_descendant_of(scope_map[&start], scope_map[&proto]));
    }

    #[test]
    fn block_statement_bodies_open_their_own_scope() {
        let mut b = AstBuilder::new();
        let cond = b.bool_literal(true);
        let inner_ty = b.bit_type(Some(8));
        let inner_decl = b.var_decl(inner_ty, "t", None);
        let then_block = b.block(vec![inner_decl]);
        let cond_stmt = b.if_stmt(cond, then_block, None);
        let body = b.block(vec![cond_stmt]);
        let params = b.param_list(vec![]);
        let proto = b.control_type_decl("C", params);
        let ctrl = b.control_decl(proto, None, vec![], body);
        let mut ast = b.program(vec![ctrl]);
        builtin_methods::run(&mut ast);

        let mut symbols = SymbolTable::new();
        let scope_map = run(&ast, &mut symbols);

        let control_scope = scope_map[&proto];
        let body_scope = scope_map[&body];
        let then_scope = scope_map[&then_block];
        assert!(symbols.is_descendant_of(body_scope, control_scope));
        assert!(symbols.is_descendant_of(then_scope, body_scope));
        assert_ne!(then_scope, body_scope);
        // The conditional itself stays in the body scope.
        assert_eq!(scope_map[&cond_stmt], body_scope);
    }

    #[test]
    fn single_statement_bodies_share_the_enclosing_scope() {
        let mut b = AstBuilder::new();
        let cond = b.bool_literal(true);
        let lhs = b.name("x");
        let rhs = b.int_literal(1);
        let assign = b.assign(lhs, rhs);
        let cond_stmt = b.if_stmt(cond, assign, None);
        let body = b.block(vec![cond_stmt]);
        let params = b.param_list(vec![]);
        let proto = b.control_type_decl("C", params);
        let ctrl = b.control_decl(proto, None, vec![], body);
        let mut ast = b.program(vec![ctrl]);
        builtin_methods::run(&mut ast);

        let mut symbols = SymbolTable::new();
        let scope_map = run(&ast, &mut symbols);

        assert_eq!(scope_map[&assign], scope_map[&body]);
        assert_eq!(scope_map[&lhs], scope_map[&body]);
    }

    #[test]
    fn recomputation_reproduces_the_same_shape() {
        let mut b = AstBuilder::new();
        let pkt = b.named_type("packet_in");
        let p = b.param(ParamDirection::None, pkt, "pkt");
        let params = b.param_list(vec![p]);
        let proto = b.parser_type_decl("P", params);
        let transition = b.transition_to("accept");
        let start = b.parser_state("start", vec![], Some(transition));
        let decl = b.parser_decl(proto, None, vec![], vec![start]);
        let mut ast = b.program(vec![decl]);
        builtin_methods::run(&mut ast);

        let mut symbols_a = SymbolTable::new();
        let map_a = run(&ast, &mut symbols_a);
        let mut symbols_b = SymbolTable::new();
        let map_b = run(&ast, &mut symbols_b);

        // Scope creation order is deterministic, so per-node scopes agree.
        assert_eq!(map_a.len(), map_b.len());
        for (node, scope) in &map_a {
            assert_eq!(map_b[node], *scope);
        }
        assert_eq!(symbols_a.scope_count(), symbols_b.scope_count());
    }
}
