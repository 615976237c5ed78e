//! Type selection.
//!
//! The final pass walks the tree top-down with an expected type threaded
//! from context and, for each expression, picks the unique member of its
//! potential-type set consistent with that context. An empty intersection
//! is an `expression type mismatch`; more than one survivor (or a
//! contextless set that is not a singleton) is an `ambiguous type`.
//!
//! Contexts that supply an expectation: declaration initializers take the
//! declared type, call arguments take the selected callee's parameter
//! types, `return` takes the enclosing function's return type, conditions
//! take `bool`, select keysets take the scrutinee types pointwise, and an
//! assignment's right side takes the left side's selected type.

use crate::ast::{Ast, AstId, AstKind};
use crate::diag;
use crate::diag::SemanticError;
use crate::ir::symbol_table::SymbolTable;
use crate::ir::type_table::{
    Type, TypeId, TypeSet, TypeTable, call_result, match_function_args, match_type,
    unify_integer_args,
};
use crate::semantic::name_binding::NameBinding;
use crate::semantic::potential_types::{call_candidates, operator_candidates};
use std::collections::HashMap;

/// Runs type selection, producing the node → type map.
pub(crate) fn run(
    ast: &Ast,
    symbols: &SymbolTable,
    types: &TypeTable,
    binding: &NameBinding,
    potype_map: &HashMap<AstId, TypeSet>,
) -> Result<HashMap<AstId, TypeId>, SemanticError> {
    let mut pass = Pass {
        ast,
        symbols,
        types,
        binding,
        potype_map,
        selected: HashMap::new(),
        return_stack: Vec::new(),
    };
    if let Some(root) = ast.root() {
        pass.visit(root)?;
    }
    Ok(pass.selected)
}

struct Pass<'a> {
    ast: &'a Ast,
    symbols: &'a SymbolTable,
    types: &'a TypeTable,
    binding: &'a NameBinding,
    potype_map: &'a HashMap<AstId, TypeSet>,
    selected: HashMap<AstId, TypeId>,
    return_stack: Vec<TypeId>,
}

impl Pass<'_> {
    fn set_of(&self, node: AstId) -> &TypeSet {
        self.potype_map
            .get(&node)
            .expect("potential types computed for every expression")
    }

    /// The declared type installed on a declaration node.
    fn declared_type(&self, node: AstId) -> TypeId {
        let decl = self.binding.decl_map[&node];
        let ty = self
            .symbols
            .decl(decl)
            .ty
            .expect("declared-types pass installed a type");
        self.types.effective(ty)
    }

    // ------------------------------------------------------------------
    // The selection rule
    // ------------------------------------------------------------------

    /// Picks the unique member of `node`'s set consistent with `expected`
    /// and records it.
    fn choose(&mut self, node: AstId, expected: Option<TypeId>) -> Result<TypeId, SemanticError> {
        let loc = self.ast.loc(node);
        let set = self.set_of(node).clone();
        let chosen = match (&set, expected) {
            (TypeSet::Product { .. }, Some(exp)) => {
                let exp = self.types.effective(exp);
                if match_type(self.types, &set, exp) {
                    exp
                } else {
                    return Err(diag::expression_type_mismatch(
                        Some(&self.types.describe(exp)),
                        loc,
                    ));
                }
            }
            (TypeSet::Product { .. }, None) => {
                return Err(diag::ambiguous_type(loc));
            }
            (_, Some(exp)) => {
                let exp = self.types.effective(exp);
                let matching: Vec<TypeId> = set
                    .members()
                    .iter()
                    .copied()
                    .filter(|m| self.types.accepts(exp, *m))
                    .collect();
                match matching.len() {
                    1 => matching[0],
                    0 if set.admits_any_integer()
                        && (self.types.is_integer(exp)
                            || matches!(self.types.get(exp), Type::Any)) =>
                    {
                        exp
                    }
                    0 => {
                        return Err(diag::expression_type_mismatch(
                            Some(&self.types.describe(exp)),
                            loc,
                        ));
                    }
                    _ => return Err(diag::ambiguous_type(loc)),
                }
            }
            (_, None) => {
                let members = set.members();
                match members.len() {
                    1 => members[0],
                    0 => return Err(diag::expression_type_mismatch(None, loc)),
                    _ => return Err(diag::ambiguous_type(loc)),
                }
            }
        };
        self.selected.insert(node, chosen);
        Ok(chosen)
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn select_expr(
        &mut self,
        node: AstId,
        expected: Option<TypeId>,
    ) -> Result<TypeId, SemanticError> {
        let chosen = self.choose(node, expected)?;
        match self.ast.kind(node) {
            AstKind::IntegerLiteral { .. }
            | AstKind::BooleanLiteral { .. }
            | AstKind::StringLiteral { .. }
            | AstKind::Name { .. }
            | AstKind::Dontcare
            | AstKind::Default => {}

            AstKind::MemberSelector { lhs, name } => {
                let (lhs, name) = (*lhs, *name);
                self.select_expr(lhs, None)?;
                self.selected.insert(name, chosen);
            }

            AstKind::FunctionCall { callee, args } => {
                let (callee, args) = (*callee, *args);
                self.select_call(node, callee, self.ast.list(args).to_vec(), chosen)?;
            }

            AstKind::BinaryExpression { op, left, right } => {
                let (op, left, right) = (*op, *left, *right);
                let operands = vec![left, right];
                let candidates =
                    operator_candidates(self.symbols, self.types, op.lexeme(), operands.len());
                self.select_overload(node, None, &candidates, operands, chosen)?;
            }
            AstKind::UnaryExpression { op, operand } => {
                let (op, operand) = (*op, *operand);
                let operands = vec![operand];
                let candidates =
                    operator_candidates(self.symbols, self.types, op.lexeme(), operands.len());
                self.select_overload(node, None, &candidates, operands, chosen)?;
            }

            AstKind::CastExpression { expr, .. } => {
                let expr = *expr;
                // A singleton operand settles on its own; only literal
                // operands need the cast target as context.
                if self.set_of(expr).is_singleton() {
                    self.select_expr(expr, None)?;
                } else {
                    self.select_expr(expr, Some(chosen))?;
                }
            }

            AstKind::ArraySubscript { lhs, index } => {
                let (lhs, index) = (*lhs, *index);
                self.select_expr(lhs, None)?;
                if let AstKind::IndexExpression { start, end } = self.ast.kind(index) {
                    let (start, end) = (*start, *end);
                    self.select_expr(start, None)?;
                    if let Some(end) = end {
                        self.select_expr(end, None)?;
                    }
                } else {
                    self.select_expr(index, None)?;
                }
            }

            AstKind::ExpressionList { items } => {
                let items = items.clone();
                let targets = self.member_targets(chosen);
                debug_assert_eq!(targets.len(), items.len());
                for (item, target) in items.into_iter().zip(targets) {
                    self.select_expr(item, Some(target))?;
                }
            }

            AstKind::SimpleKeysetExpression { expr } => {
                let expr = *expr;
                self.select_expr(expr, expected)?;
            }

            AstKind::StateExpression { expr } => {
                let expr = *expr;
                self.select_expr(expr, None)?;
            }

            AstKind::DirectApplication { name, args } => {
                let (name, args) = (*name, *args);
                let target = self.choose(name, None)?;
                let args = self.ast.list(args).to_vec();
                let apply = self.types.find_member(target, "apply");
                if let Some(apply) = apply
                    && let Type::Function { params, .. } =
                        self.types.get(self.types.effective(apply))
                {
                    let params = self.types.product_members(*params).to_vec();
                    if params.len() == args.len() {
                        for (arg, param) in args.into_iter().zip(params) {
                            self.select_expr(arg, Some(param))?;
                        }
                        return Ok(chosen);
                    }
                }
                for arg in args {
                    self.select_expr(arg, None)?;
                }
            }

            other => panic!("expression expected, found {:?}", other),
        }
        Ok(chosen)
    }

    /// The pointwise targets a record or product type supplies to an
    /// initializer list.
    fn member_targets(&self, ty: TypeId) -> Vec<TypeId> {
        if let Some(fields) = self.types.fields_of(ty) {
            fields
                .iter()
                .map(|f| match self.types.get(*f) {
                    Type::Field { ty, .. } => *ty,
                    _ => *f,
                })
                .collect()
        } else {
            match self.types.get(self.types.effective(ty)) {
                Type::Product { members } => members.clone(),
                Type::Tuple { left, right } => vec![*left, *right],
                _ => Vec::new(),
            }
        }
    }

    /// Settles a call: picks the surviving overload consistent with the
    /// chosen result, records it on the callee, and threads parameter
    /// types into the arguments.
    fn select_call(
        &mut self,
        node: AstId,
        callee: AstId,
        args: Vec<AstId>,
        chosen: TypeId,
    ) -> Result<(), SemanticError> {
        let callee_set = self.set_of(callee).clone();
        let arg_sets: Vec<TypeSet> = args.iter().map(|a| self.set_of(*a).clone()).collect();
        let candidates = call_candidates(self.types, &callee_set, &arg_sets);
        self.select_overload(node, Some(callee), &candidates, args, chosen)
    }

    fn select_overload(
        &mut self,
        node: AstId,
        callee: Option<AstId>,
        candidates: &[TypeId],
        args: Vec<AstId>,
        chosen: TypeId,
    ) -> Result<(), SemanticError> {
        let arg_sets: Vec<TypeSet> = args.iter().map(|a| self.set_of(*a).clone()).collect();
        let winner = self.winning_overload(candidates, &arg_sets, chosen);
        let Some(winner) = winner else {
            // The potential-types pass produced this result, so a winner
            // must exist; reaching here is an internal inconsistency.
            return Err(diag::expression_type_mismatch(
                Some(&self.types.describe(chosen)),
                self.ast.loc(node),
            ));
        };

        if let Some(callee) = callee {
            self.selected.insert(callee, winner);
            if let AstKind::MemberSelector { lhs, name } = self.ast.kind(callee) {
                let (lhs, name) = (*lhs, *name);
                self.select_expr(lhs, None)?;
                self.selected.insert(name, winner);
            }
        }

        let Type::Function { params, ret, .. } = self.types.get(self.types.effective(winner))
        else {
            unreachable!("call candidates are functions");
        };
        let (params, ret) = (*params, *ret);
        let params = self.types.product_members(params).to_vec();
        let unified = unify_integer_args(self.types, &params, &arg_sets)
            .flatten()
            .or_else(|| {
                // The result width pins the operands when the arguments
                // themselves did not.
                (self.types.is_width_open_integer(ret) && self.types.is_integer(chosen))
                    .then_some(chosen)
            });
        for (arg, param) in args.into_iter().zip(params) {
            let expected = if self.types.is_width_open_integer(param) {
                unified
            } else {
                Some(param)
            };
            self.select_expr(arg, expected)?;
        }
        Ok(())
    }

    /// The first candidate whose result is consistent with the chosen
    /// type. Traversal order is deterministic, so so is the winner.
    fn winning_overload(
        &self,
        candidates: &[TypeId],
        arg_sets: &[TypeSet],
        chosen: TypeId,
    ) -> Option<TypeId> {
        let surviving: Vec<TypeId> = candidates
            .iter()
            .copied()
            .filter(|c| match_function_args(self.types, *c, arg_sets))
            .collect();
        surviving
            .iter()
            .copied()
            .find(|c| match call_result(self.types, *c, arg_sets) {
                Some(r) => self.types.equiv(r, chosen),
                None => false,
            })
            .or_else(|| {
                surviving.into_iter().find(|c| {
                    let Type::Function { ret, .. } = self.types.get(self.types.effective(*c))
                    else {
                        return false;
                    };
                    self.types.is_width_open_integer(*ret) && self.types.is_integer(chosen)
                })
            })
    }

    // ------------------------------------------------------------------
    // Statements and declarations
    // ------------------------------------------------------------------

    fn visit_children(&mut self, node: AstId) -> Result<(), SemanticError> {
        for child in self.ast.children(node) {
            self.visit(child)?;
        }
        Ok(())
    }

    fn visit(&mut self, node: AstId) -> Result<(), SemanticError> {
        match self.ast.kind(node) {
            AstKind::VariableDeclaration { init, .. } => {
                if let Some(init) = *init {
                    let expected = self.declared_type(node);
                    self.select_expr(init, Some(expected))?;
                }
            }
            AstKind::Parameter { init, .. } => {
                if let Some(init) = *init {
                    let expected = self.declared_type(node);
                    self.select_expr(init, Some(expected))?;
                }
            }
            AstKind::SimpleProperty { init, .. } => {
                let init = *init;
                self.select_expr(init, None)?;
            }

            AstKind::Instantiation { args, .. } => {
                let args = *args;
                let ty = self.declared_type(node);
                let args = self.ast.list(args).to_vec();
                let params = self.constructor_params(ty, args.len());
                match params {
                    Some(params) => {
                        for (arg, param) in args.into_iter().zip(params) {
                            self.select_expr(arg, Some(param))?;
                        }
                    }
                    None => {
                        for arg in args {
                            self.select_expr(arg, None)?;
                        }
                    }
                }
            }

            AstKind::AssignmentStatement { lhs, rhs } => {
                let (lhs, rhs) = (*lhs, *rhs);
                let target = self.select_expr(lhs, None)?;
                self.select_expr(rhs, Some(target))?;
            }

            AstKind::ReturnStatement { expr } => {
                if let Some(expr) = *expr {
                    let expected = self.return_stack.last().copied();
                    self.select_expr(expr, expected)?;
                }
            }

            AstKind::ConditionalStatement {
                cond,
                then_stmt,
                else_stmt,
            } => {
                let (cond, then_stmt, else_stmt) = (*cond, *then_stmt, *else_stmt);
                let bool_ = self.binding.builtins.bool_;
                self.select_expr(cond, Some(bool_))?;
                self.visit(then_stmt)?;
                if let Some(else_stmt) = else_stmt {
                    self.visit(else_stmt)?;
                }
            }

            AstKind::SwitchStatement { expr, cases } => {
                let (expr, cases) = (*expr, *cases);
                self.select_expr(expr, None)?;
                self.visit(cases)?;
            }
            AstKind::SwitchLabel { label } => {
                let label = *label;
                self.select_expr(label, None)?;
            }

            AstKind::TransitionStatement { stmt } => {
                let stmt = *stmt;
                self.select_transition(stmt)?;
            }

            AstKind::KeyElement { expr, match_kind } => {
                let (expr, match_kind) = (*expr, *match_kind);
                self.select_expr(expr, None)?;
                self.choose(match_kind, None)?;
            }

            AstKind::Entry { keyset, action } => {
                let (keyset, action) = (*keyset, *action);
                self.select_keyset(keyset, None)?;
                self.visit(action)?;
            }

            AstKind::ActionRef { name, args } => {
                let (name, args) = (*name, *args);
                let action_ty = self.select_expr(name, None)?;
                self.selected.insert(node, action_ty);
                if let Some(args) = args {
                    let args = self.ast.list(args).to_vec();
                    let params = self.function_params(action_ty, args.len());
                    match params {
                        Some(params) => {
                            for (arg, param) in args.into_iter().zip(params) {
                                self.select_expr(arg, Some(param))?;
                            }
                        }
                        None => {
                            for arg in args {
                                self.select_expr(arg, None)?;
                            }
                        }
                    }
                }
            }

            AstKind::FunctionCall { .. } | AstKind::DirectApplication { .. } => {
                self.select_expr(node, None)?;
            }

            AstKind::FunctionDeclaration { proto, body } => {
                let (proto, body) = (*proto, *body);
                let ret = match self.types.get(self.declared_type(proto)) {
                    Type::Function { ret, .. } => self.types.effective(*ret),
                    _ => self.binding.builtins.void_,
                };
                self.return_stack.push(ret);
                self.visit(body)?;
                self.return_stack.pop();
            }
            AstKind::ActionDeclaration { body, .. } => {
                let body = *body;
                self.return_stack.push(self.binding.builtins.void_);
                self.visit(body)?;
                self.return_stack.pop();
            }

            _ => self.visit_children(node)?,
        }
        Ok(())
    }

    fn select_transition(&mut self, stmt: AstId) -> Result<(), SemanticError> {
        let AstKind::StateExpression { expr } = self.ast.kind(stmt) else {
            panic!("state expression expected under transition");
        };
        let expr = *expr;
        match self.ast.kind(expr) {
            AstKind::SelectExpression { exprs, cases } => {
                let (exprs, cases) = (*exprs, *cases);
                let mut scrutinee = Vec::new();
                for item in self.ast.list(exprs).to_vec() {
                    scrutinee.push(self.select_expr(item, None)?);
                }
                for case in self.ast.list(cases).to_vec() {
                    let AstKind::SelectCase { keyset, name } = self.ast.kind(case) else {
                        panic!("select case expected");
                    };
                    let (keyset, name) = (*keyset, *name);
                    self.select_keyset(keyset, Some(&scrutinee))?;
                    self.select_expr(name, None)?;
                }
            }
            _ => {
                self.select_expr(expr, None)?;
            }
        }
        Ok(())
    }

    /// Selects a keyset against the scrutinee types, pointwise for tuple
    /// keysets. Entries select without a scrutinee and settle on their own.
    fn select_keyset(
        &mut self,
        keyset: AstId,
        scrutinee: Option<&[TypeId]>,
    ) -> Result<(), SemanticError> {
        match self.ast.kind(keyset) {
            AstKind::TupleKeysetExpression { exprs } => {
                let exprs = *exprs;
                let items = self.ast.list(exprs).to_vec();
                for (i, item) in items.into_iter().enumerate() {
                    match scrutinee.and_then(|s| s.get(i)).copied() {
                        Some(e) => self.select_keyset(item, Some(std::slice::from_ref(&e)))?,
                        None => self.select_keyset(item, None)?,
                    }
                }
            }
            AstKind::SimpleKeysetExpression { expr } => {
                let expr = *expr;
                let expected = scrutinee.and_then(|s| s.first()).copied();
                self.select_expr(expr, expected)?;
                if let Some(ty) = self.selected.get(&expr).copied() {
                    self.selected.insert(keyset, ty);
                }
            }
            _ => {
                let expected = scrutinee.and_then(|s| s.first()).copied();
                self.select_expr(keyset, expected)?;
            }
        }
        Ok(())
    }

    /// The constructor parameter types an instantiation's arguments must
    /// satisfy.
    fn constructor_params(&self, ty: TypeId, arity: usize) -> Option<Vec<TypeId>> {
        match self.types.get(self.types.effective(ty)) {
            Type::Extern { ctors, .. } => {
                for &ctor in self.types.product_members(*ctors) {
                    if let Some(params) = self.function_params(ctor, arity) {
                        return Some(params);
                    }
                }
                None
            }
            Type::Parser { ctor_params, .. } | Type::Control { ctor_params, .. } => {
                let params = self.types.product_members(*ctor_params).to_vec();
                (params.len() == arity).then_some(params)
            }
            Type::Package { params, .. } => {
                let params = self.types.product_members(*params).to_vec();
                (params.len() == arity).then_some(params)
            }
            _ => None,
        }
    }

    fn function_params(&self, ty: TypeId, arity: usize) -> Option<Vec<TypeId>> {
        if let Type::Function { params, .. } = self.types.get(self.types.effective(ty)) {
            let params = self.types.product_members(*params).to_vec();
            if params.len() == arity {
                return Some(params);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AstBuilder, AstOp};
    use crate::diag::SemanticErrorKind;
    use crate::semantic::{
        builtin_methods, declared_types, name_binding, potential_types, scope_hierarchy,
    };

    #[derive(Debug)]
    struct Analyzed {
        types: TypeTable,
        potype_map: HashMap<AstId, TypeSet>,
        selected: HashMap<AstId, TypeId>,
    }

    fn analyze(mut ast: Ast) -> Result<Analyzed, SemanticError> {
        builtin_methods::run(&mut ast);
        let mut symbols = SymbolTable::new();
        let scope_map = scope_hierarchy::run(&ast, &mut symbols);
        let mut types = TypeTable::new();
        let binding = name_binding::run(&ast, &mut symbols, &scope_map, &mut types);
        let declared = declared_types::run(&ast, &mut symbols, &scope_map, &binding, &mut types)?;
        let potype_map =
            potential_types::run(&ast, &symbols, &mut types, &scope_map, &binding, &declared)?;
        let selected = run(&ast, &symbols, &types, &binding, &potype_map)?;
        Ok(Analyzed {
            types,
            potype_map,
            selected,
        })
    }

    #[test]
    fn literal_takes_the_declared_width() {
        let mut b = AstBuilder::new();
        let ty = b.bit_type(Some(8));
        let lit = b.int_literal(255);
        let v = b.const_decl(ty, "x", lit);
        let ast = b.program(vec![v]);

        let a = analyze(ast).expect("selects");
        let chosen = a.selected[&lit];
        assert!(matches!(
            a.types.get(a.types.effective(chosen)),
            Type::Bit { width: 8 }
        ));
    }

    #[test]
    fn bool_initializer_for_int_is_a_mismatch() {
        let mut b = AstBuilder::new();
        let ty = b.int_type(Some(8));
        b.at(1, 16);
        let lit = b.bool_literal(true);
        let v = b.const_decl(ty, "x", lit);
        let ast = b.program(vec![v]);

        let err = analyze(ast).expect_err("must fail");
        assert_eq!(err.kind, SemanticErrorKind::TypeMismatch);
        assert_eq!((err.loc.line, err.loc.column), (1, 16));
    }

    #[test]
    fn assignment_threads_the_left_type_rightward() {
        let mut b = AstBuilder::new();
        let a_ty = b.bit_type(Some(8));
        let a_decl = b.var_decl(a_ty, "a", None);
        let a_ref = b.name("a");
        let lit = b.int_literal(3);
        let assign = b.assign(a_ref, lit);
        let body = b.block(vec![assign]);
        let params = b.param_list(vec![]);
        let proto = b.control_type_decl("C", params);
        let ctrl = b.control_decl(proto, None, vec![a_decl], body);
        let ast = b.program(vec![ctrl]);

        let a = analyze(ast).expect("selects");
        assert!(matches!(
            a.types.get(a.types.effective(a.selected[&lit])),
            Type::Bit { width: 8 }
        ));
    }

    #[test]
    fn disjoint_widths_fail_at_the_operator() {
        let mut b = AstBuilder::new();
        let a_ty = b.bit_type(Some(8));
        let a_decl = b.var_decl(a_ty, "a", None);
        let b_ty = b.bit_type(Some(16));
        let b_decl = b.var_decl(b_ty, "b", None);
        let a_ref = b.name("a");
        let b_ref = b.name("b");
        let one = b.int_literal(1);
        let sum = b.binary(AstOp::Add, b_ref, one);
        let assign = b.assign(a_ref, sum);
        let body = b.block(vec![assign]);
        let params = b.param_list(vec![]);
        let proto = b.control_type_decl("C", params);
        let ctrl = b.control_decl(proto, None, vec![a_decl, b_decl], body);
        let ast = b.program(vec![ctrl]);

        let err = analyze(ast).expect_err("widths cannot unify");
        assert_eq!(err.kind, SemanticErrorKind::TypeMismatch);
    }

    #[test]
    fn selection_is_a_member_of_the_potential_set() {
        let mut b = AstBuilder::new();
        let ty = b.bit_type(Some(8));
        let lit = b.int_literal(7);
        let one = b.int_literal(1);
        let sum = b.binary(AstOp::Add, lit, one);
        let v = b.const_decl(ty, "x", sum);
        let ast = b.program(vec![v]);

        let a = analyze(ast).expect("selects");
        for (node, chosen) in &a.selected {
            if let Some(set) = a.potype_map.get(node) {
                assert!(
                    set.contains(&a.types, *chosen),
                    "selected type must come from the potential set"
                );
            }
        }
    }

    #[test]
    fn duplicate_declaration_is_ambiguous_at_the_use_site() {
        let mut b = AstBuilder::new();
        let s1 = b.struct_decl("S", vec![]);
        let s2 = b.header_decl("S", vec![]);
        b.at(4, 2);
        let s_ty = b.named_type("S");
        let v = b.var_decl(s_ty, "s", None);
        let ast = b.program(vec![s1, s2, v]);

        let err = analyze(ast).expect_err("ambiguous reference");
        assert_eq!(err.kind, SemanticErrorKind::AmbiguousName);
    }
}
