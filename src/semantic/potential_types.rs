//! Potential-type inference.
//!
//! A deterministic bottom-up pass that assigns every expression a
//! [`TypeSet`]: the types it could have before context narrows the choice.
//! Literals seed the sets (an unsuffixed integer admits the whole integer
//! width family), names contribute the types of their declaration chain,
//! member selection filters the left operand's set to carriers of the
//! member, and calls filter the callee's set to functions whose parameter
//! product matches the argument sets pointwise. Binary and unary operators
//! resolve through the operator overloads bound in the root scope and are
//! treated as calls.
//!
//! The empty set is the type-error sentinel; it is the selection pass that
//! turns it into a diagnostic, with one exception — a name that resolves
//! nowhere is reported here, where the lookup happens.

use crate::ast::{Ast, AstId, AstKind};
use crate::diag;
use crate::diag::SemanticError;
use crate::ir::symbol_table::{NameSpace, ScopeId, SymbolTable};
use crate::ir::type_table::{
    Type, TypeId, TypeSet, TypeTable, call_result, match_function_args,
};
use crate::semantic::declared_types::DeclaredTypes;
use crate::semantic::name_binding::NameBinding;
use std::collections::HashMap;

/// Runs potential-type inference over the whole program.
pub(crate) fn run(
    ast: &Ast,
    symbols: &SymbolTable,
    types: &mut TypeTable,
    scope_map: &HashMap<AstId, ScopeId>,
    binding: &NameBinding,
    declared: &DeclaredTypes,
) -> Result<HashMap<AstId, TypeSet>, SemanticError> {
    let mut pass = Pass {
        ast,
        symbols,
        types,
        scope_map,
        binding,
        declared,
        potype_map: HashMap::new(),
    };
    if let Some(root) = ast.root() {
        pass.visit(root)?;
    }
    Ok(pass.potype_map)
}

/// All operator overloads bound under `lexeme` with the given operand
/// count. Shared with the selection pass, which re-derives the surviving
/// overload to thread operand expectations.
pub(super) fn operator_candidates(
    symbols: &SymbolTable,
    types: &TypeTable,
    lexeme: &str,
    arity: usize,
) -> Vec<TypeId> {
    let mut out = Vec::new();
    let Some(head) = symbols.lookup(symbols.root(), lexeme, NameSpace::Type) else {
        return out;
    };
    for decl in symbols.chain(head) {
        if let Some(ty) = symbols.decl(decl).ty
            && let Type::Function { params, .. } = types.get(types.effective(ty))
            && types.product_members(*params).len() == arity
        {
            out.push(ty);
        }
    }
    out
}

/// Candidate callables of a call: functions from the callee set, plus the
/// constructors of any extern the set names, filtered by argument match.
pub(super) fn call_candidates(
    types: &TypeTable,
    callee_set: &TypeSet,
    args: &[TypeSet],
) -> Vec<TypeId> {
    let mut candidates = Vec::new();
    for &member in callee_set.members() {
        match types.get(types.effective(member)) {
            Type::Function { .. } => candidates.push(member),
            Type::Extern { ctors, .. } => {
                candidates.extend_from_slice(types.product_members(*ctors));
            }
            _ => {}
        }
    }
    candidates
        .into_iter()
        .filter(|c| match_function_args(types, *c, args))
        .collect()
}

struct Pass<'a> {
    ast: &'a Ast,
    symbols: &'a SymbolTable,
    types: &'a mut TypeTable,
    scope_map: &'a HashMap<AstId, ScopeId>,
    binding: &'a NameBinding,
    declared: &'a DeclaredTypes,
    potype_map: HashMap<AstId, TypeSet>,
}

impl Pass<'_> {
    // ------------------------------------------------------------------
    // Statement / declaration traversal
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
                    self.visit_expr(init)?;
                }
            }
            AstKind::Parameter { init, .. } => {
                if let Some(init) = *init {
                    self.visit_expr(init)?;
                }
            }
            AstKind::SimpleProperty { init, .. } => {
                let init = *init;
                self.visit_expr(init)?;
            }
            AstKind::Instantiation { args, .. } => {
                let args = *args;
                for arg in self.ast.list(args).to_vec() {
                    self.visit_expr(arg)?;
                }
            }
            AstKind::AssignmentStatement { lhs, rhs } => {
                let (lhs, rhs) = (*lhs, *rhs);
                self.visit_expr(lhs)?;
                self.visit_expr(rhs)?;
            }
            AstKind::ReturnStatement { expr } => {
                if let Some(expr) = *expr {
                    self.visit_expr(expr)?;
                }
            }
            AstKind::ConditionalStatement {
                cond,
                then_stmt,
                else_stmt,
            } => {
                let (cond, then_stmt, else_stmt) = (*cond, *then_stmt, *else_stmt);
                self.visit_expr(cond)?;
                self.visit(then_stmt)?;
                if let Some(else_stmt) = else_stmt {
                    self.visit(else_stmt)?;
                }
            }
            AstKind::SwitchStatement { expr, cases } => {
                let (expr, cases) = (*expr, *cases);
                self.visit_expr(expr)?;
                self.visit(cases)?;
            }
            AstKind::SwitchLabel { label } => {
                let label = *label;
                self.visit_expr(label)?;
            }
            AstKind::TransitionStatement { stmt } => {
                let stmt = *stmt;
                self.visit_expr(stmt)?;
            }
            AstKind::KeyElement { expr, match_kind } => {
                let (expr, match_kind) = (*expr, *match_kind);
                self.visit_expr(expr)?;
                self.visit_match_kind_name(match_kind)?;
            }
            AstKind::Entry { keyset, action } => {
                let (keyset, action) = (*keyset, *action);
                self.visit_expr(keyset)?;
                self.visit(action)?;
            }
            AstKind::ActionRef { name, args } => {
                let (name, args) = (*name, *args);
                let set = self.visit_expr(name)?;
                self.potype_map.insert(node, set);
                if let Some(args) = args {
                    for arg in self.ast.list(args).to_vec() {
                        self.visit_expr(arg)?;
                    }
                }
            }
            // A call in statement position is still an expression.
            AstKind::FunctionCall { .. } | AstKind::DirectApplication { .. } => {
                self.visit_expr(node)?;
            }
            _ => self.visit_children(node)?,
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn record(&mut self, node: AstId, set: TypeSet) -> TypeSet {
        self.potype_map.insert(node, set.clone());
        set
    }

    fn visit_expr(&mut self, node: AstId) -> Result<TypeSet, SemanticError> {
        let b = self.binding.builtins;
        let set = match self.ast.kind(node) {
            AstKind::IntegerLiteral {
                is_signed, width, ..
            } => {
                let (is_signed, width) = (*is_signed, *width);
                if width == 0 {
                    TypeSet::integer_literal(b.int)
                } else if is_signed {
                    let ty = self.types.add_for(Type::Int { width }, node);
                    TypeSet::singleton(ty)
                } else {
                    let ty = self.types.add_for(Type::Bit { width }, node);
                    TypeSet::singleton(ty)
                }
            }
            AstKind::BooleanLiteral { .. } => TypeSet::singleton(b.bool_),
            AstKind::StringLiteral { .. } => TypeSet::singleton(b.string),
            AstKind::Dontcare | AstKind::Default => TypeSet::singleton(b.any),

            AstKind::Name { strname } => {
                let strname = strname.clone();
                let scope = self.scope_map[&node];
                let head = self
                    .symbols
                    .lookup(scope, &strname, NameSpace::Var)
                    .or_else(|| self.symbols.lookup(scope, &strname, NameSpace::Type));
                let Some(head) = head else {
                    return Err(diag::unresolved_name(&strname, self.ast.loc(node)));
                };
                let members: Vec<TypeId> = self
                    .symbols
                    .chain(head)
                    .filter_map(|d| self.symbols.decl(d).ty)
                    .collect();
                TypeSet::from_members(members)
            }

            AstKind::MemberSelector { lhs, name } => {
                let (lhs, name) = (*lhs, *name);
                let lhs_set = self.visit_expr(lhs)?;
                let member = self.ast.name_str(name).clone();
                let mut members = Vec::new();
                for &candidate in lhs_set.members() {
                    if let Some(ty) = self.types.find_member(candidate, &member) {
                        members.push(ty);
                    }
                }
                let set = TypeSet::from_members(members);
                self.potype_map.insert(name, set.clone());
                set
            }

            AstKind::FunctionCall { callee, args } => {
                let (callee, args) = (*callee, *args);
                let callee_set = self.visit_expr(callee)?;
                let mut arg_sets = Vec::new();
                for arg in self.ast.list(args).to_vec() {
                    arg_sets.push(self.visit_expr(arg)?);
                }
                self.call_results(&callee_set, &arg_sets)
            }

            AstKind::BinaryExpression { op, left, right } => {
                let (op, left, right) = (*op, *left, *right);
                let args = vec![self.visit_expr(left)?, self.visit_expr(right)?];
                let candidates =
                    operator_candidates(self.symbols, self.types, op.lexeme(), args.len());
                self.overload_results(&candidates, &args)
            }
            AstKind::UnaryExpression { op, operand } => {
                let (op, operand) = (*op, *operand);
                let args = vec![self.visit_expr(operand)?];
                let candidates =
                    operator_candidates(self.symbols, self.types, op.lexeme(), args.len());
                self.overload_results(&candidates, &args)
            }

            AstKind::CastExpression { ty, expr } => {
                let (ty, expr) = (*ty, *expr);
                self.visit_expr(expr)?;
                let target = self.declared.type_env[&ty];
                TypeSet::singleton(target)
            }

            AstKind::ArraySubscript { lhs, index } => {
                let (lhs, index) = (*lhs, *index);
                let lhs_set = self.visit_expr(lhs)?;
                let slice_len = self.visit_subscript_index(index)?;
                let mut members = Vec::new();
                for &candidate in lhs_set.members() {
                    match self.types.get(self.types.effective(candidate)) {
                        Type::Stack { element, .. } => members.push(*element),
                        Type::Bit { .. } | Type::Varbit { .. } => {
                            let width = slice_len.unwrap_or(1);
                            members.push(self.types.add_for(Type::Bit { width }, node));
                        }
                        _ => {}
                    }
                }
                TypeSet::from_members(members)
            }

            AstKind::ExpressionList { items } => {
                let items = items.clone();
                let mut elems = Vec::with_capacity(items.len());
                for item in items {
                    elems.push(self.visit_expr(item)?);
                }
                TypeSet::product(elems)
            }

            AstKind::SimpleKeysetExpression { expr } => {
                let expr = *expr;
                self.visit_expr(expr)?
            }
            AstKind::TupleKeysetExpression { exprs } => {
                let exprs = *exprs;
                let mut elems = Vec::new();
                for item in self.ast.list(exprs).to_vec() {
                    elems.push(self.visit_expr(item)?);
                }
                let set = TypeSet::product(elems);
                self.potype_map.insert(exprs, set.clone());
                set
            }

            AstKind::StateExpression { expr } => {
                let expr = *expr;
                self.visit_expr(expr)?
            }
            AstKind::SelectExpression { exprs, cases } => {
                let (exprs, cases) = (*exprs, *cases);
                let mut elems = Vec::new();
                for item in self.ast.list(exprs).to_vec() {
                    elems.push(self.visit_expr(item)?);
                }
                let scrutinee = TypeSet::product(elems);
                self.potype_map.insert(exprs, scrutinee.clone());
                for case in self.ast.list(cases).to_vec() {
                    let AstKind::SelectCase { keyset, name } = self.ast.kind(case) else {
                        panic!("select case expected");
                    };
                    let (keyset, name) = (*keyset, *name);
                    self.visit_expr(keyset)?;
                    self.visit_expr(name)?;
                }
                scrutinee
            }

            AstKind::DirectApplication { name, args } => {
                let (name, args) = (*name, *args);
                let target_set = self.visit_expr(name)?;
                for arg in self.ast.list(args).to_vec() {
                    self.visit_expr(arg)?;
                }
                let mut members = Vec::new();
                for &candidate in target_set.members() {
                    if let Some(apply) = self.types.find_member(candidate, "apply")
                        && let Type::Function { ret, .. } =
                            self.types.get(self.types.effective(apply))
                    {
                        members.push(*ret);
                    }
                }
                TypeSet::from_members(members)
            }

            other => panic!("expression expected, found {:?}", other),
        };
        Ok(self.record(node, set))
    }

    /// Filters callables by the argument sets and collects their result
    /// types (width-open integer returns narrow to the unified width).
    fn call_results(&mut self, callee_set: &TypeSet, args: &[TypeSet]) -> TypeSet {
        let candidates = call_candidates(self.types, callee_set, args);
        self.overload_results(&candidates, args)
    }

    fn overload_results(&mut self, candidates: &[TypeId], args: &[TypeSet]) -> TypeSet {
        let mut members = Vec::new();
        let mut wildcard = false;
        for &candidate in candidates {
            if !match_function_args(self.types, candidate, args) {
                continue;
            }
            if let Some(ret) = call_result(self.types, candidate, args) {
                if !members.iter().any(|m| self.types.equiv(*m, ret)) {
                    members.push(ret);
                }
                // A width-open integer result stays polymorphic when no
                // argument pinned a width.
                if self.types.is_width_open_integer(ret)
                    && args.iter().all(|a| a.admits_any_integer())
                {
                    wildcard = true;
                }
            }
        }
        match TypeSet::from_members(members) {
            TypeSet::Members { members, .. } if wildcard => TypeSet::Members {
                members,
                wildcard_int: true,
            },
            other => other,
        }
    }

    /// Visits a subscript index, returning the bit-slice length when the
    /// index is a constant range.
    fn visit_subscript_index(&mut self, index: AstId) -> Result<Option<u32>, SemanticError> {
        if let AstKind::IndexExpression { start, end } = self.ast.kind(index) {
            let (start, end) = (*start, *end);
            self.visit_expr(start)?;
            if let Some(end) = end {
                self.visit_expr(end)?;
                let hi = self.ast.integer_value(start);
                let lo = self.ast.integer_value(end);
                if let (Some(hi), Some(lo)) = (hi, lo)
                    && hi >= lo
                {
                    return Ok(Some((hi - lo + 1) as u32));
                }
            }
            Ok(None)
        } else {
            self.visit_expr(index)?;
            Ok(None)
        }
    }

    /// Resolves a table key's match kind against the built-in `match_kind`
    /// enumeration.
    fn visit_match_kind_name(&mut self, name: AstId) -> Result<(), SemanticError> {
        let strname = self.ast.name_str(name).clone();
        let mk = self.binding.builtins.match_kind;
        let Some(ty) = self.types.find_member(mk, &strname) else {
            return Err(diag::unresolved_name(&strname, self.ast.loc(name)));
        };
        self.potype_map.insert(name, TypeSet::singleton(ty));
        Ok(())
    }
}
