//! Name binding.
//!
//! Seeds the root scope with the built-in names, then walks the tree and
//! creates a `NameDeclaration` for every declaring occurrence, recording
//! `decl_map[node]`. Binding never fails: a duplicate name simply prepends
//! to the scope's chain, and chains longer than one are the ambiguity
//! signal later passes act on.
//!
//! The pass also primes the type arena with one reserved slot per bound
//! declaration, so the declared-types pass can fill the slots in place and
//! self-referential types keep stable ids.
//!
//! Namespace choice follows the language: type-introducing declarations
//! (and, deliberately, variables — the declared-types pass reaches their
//! inferred type through the declaration record) bind in the TYPE
//! namespace; parameters, instantiations, and parser states bind in VAR.
//!
//! `error` and `match_kind` declarations have no name of their own: all
//! appearances accumulate members into the single built-in enumeration.
//! This pass counts the members per enumeration (first phase); the
//! declared-types pass allocates each members array once and fills it at a
//! running index (second phase).

use crate::ast::{Ast, AstId, AstKind};
use crate::ir::symbol_table::{DeclId, DeclOrigin, NameSpace, ScopeId, SymbolTable};
use crate::ir::type_table::{Type, TypeId, TypeTable};
use std::collections::HashMap;

/// Canonical arena entries and root declarations for the built-in names.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Builtins {
    pub void_: TypeId,
    pub bool_: TypeId,
    pub int: TypeId,
    pub bit: TypeId,
    pub varbit: TypeId,
    pub string: TypeId,
    pub error: TypeId,
    pub match_kind: TypeId,
    pub any: TypeId,
    /// The `error` enumeration's member product, accumulated program-wide.
    pub error_fields: TypeId,
    /// The `match_kind` enumeration's member product.
    pub match_kind_fields: TypeId,
    pub accept: DeclId,
    pub reject: DeclId,
    pub error_decl: DeclId,
    pub match_kind_decl: DeclId,
}

/// Everything the name-binding pass produces.
pub(crate) struct NameBinding {
    /// Declaration node → its name declaration.
    pub decl_map: HashMap<AstId, DeclId>,
    /// Declaration node → the arena slot reserved for its type.
    pub pending: HashMap<AstId, TypeId>,
    /// Built-in names and canonical types.
    pub builtins: Builtins,
    /// Total `error` members across all declarations.
    pub error_field_count: usize,
    /// Total `match_kind` members across all declarations.
    pub match_kind_field_count: usize,
}

/// Runs name binding over the whole program.
pub(crate) fn run(
    ast: &Ast,
    symbols: &mut SymbolTable,
    scope_map: &HashMap<AstId, ScopeId>,
    types: &mut TypeTable,
) -> NameBinding {
    let builtins = define_builtin_names(symbols, types);
    let mut binder = Binder {
        ast,
        symbols,
        scope_map,
        types,
        decl_map: HashMap::new(),
        pending: HashMap::new(),
        error_field_count: 0,
        match_kind_field_count: 0,
        builtins,
    };
    if let Some(root) = ast.root() {
        let scope = binder.scope_map[&root];
        binder.visit(root, scope);
    }
    NameBinding {
        decl_map: binder.decl_map,
        pending: binder.pending,
        builtins,
        error_field_count: binder.error_field_count,
        match_kind_field_count: binder.match_kind_field_count,
    }
}

/// Creates the universal arena entry for each primitive and binds the
/// built-in names: primitive type names plus `_` in the TYPE namespace,
/// `accept`/`reject` in VAR.
fn define_builtin_names(symbols: &mut SymbolTable, types: &mut TypeTable) -> Builtins {
    let root = symbols.root();

    let error_fields = types.add(Type::Product {
        members: Vec::new(),
    });
    let match_kind_fields = types.add(Type::Product {
        members: Vec::new(),
    });

    let void_ = types.add(Type::Void);
    let bool_ = types.add(Type::Bool);
    let int = types.add(Type::Int { width: 0 });
    let bit = types.add(Type::Bit { width: 0 });
    let varbit = types.add(Type::Varbit { width: 0 });
    let string = types.add(Type::String);
    let error = types.add(Type::Error {
        fields: error_fields,
    });
    let match_kind = types.add(Type::MatchKind {
        fields: match_kind_fields,
    });
    let any = types.add(Type::Any);

    let mut bind_type = |symbols: &mut SymbolTable, name: &str, ty: TypeId| -> DeclId {
        let decl = symbols.bind(root, name.into(), NameSpace::Type, DeclOrigin::Builtin);
        symbols.decl_mut(decl).ty = Some(ty);
        decl
    };
    bind_type(symbols, "void", void_);
    bind_type(symbols, "bool", bool_);
    bind_type(symbols, "int", int);
    bind_type(symbols, "bit", bit);
    bind_type(symbols, "varbit", varbit);
    bind_type(symbols, "string", string);
    let error_decl = bind_type(symbols, "error", error);
    let match_kind_decl = bind_type(symbols, "match_kind", match_kind);
    bind_type(symbols, "_", any);

    let accept = symbols.bind(root, "accept".into(), NameSpace::Var, DeclOrigin::Builtin);
    let reject = symbols.bind(root, "reject".into(), NameSpace::Var, DeclOrigin::Builtin);

    Builtins {
        void_,
        bool_,
        int,
        bit,
        varbit,
        string,
        error,
        match_kind,
        any,
        error_fields,
        match_kind_fields,
        accept,
        reject,
        error_decl,
        match_kind_decl,
    }
}

struct Binder<'a> {
    ast: &'a Ast,
    symbols: &'a mut SymbolTable,
    scope_map: &'a HashMap<AstId, ScopeId>,
    types: &'a mut TypeTable,
    decl_map: HashMap<AstId, DeclId>,
    pending: HashMap<AstId, TypeId>,
    error_field_count: usize,
    match_kind_field_count: usize,
    builtins: Builtins,
}

impl Binder<'_> {
    /// Binds `node`'s name in `scope`, records the declaration, and
    /// reserves its arena slot.
    fn bind(&mut self, node: AstId, name: AstId, scope: ScopeId, ns: NameSpace) -> DeclId {
        let strname = self.ast.name_str(name).clone();
        let decl = self
            .symbols
            .bind(scope, strname, ns, DeclOrigin::Ast(node));
        self.decl_map.insert(node, decl);
        self.pending.insert(node, self.types.reserve(node));
        decl
    }

    /// The scope `node` opened in the hierarchy pass.
    fn opened_scope(&self, node: AstId) -> ScopeId {
        self.scope_map[&node]
    }

    fn visit_children(&mut self, node: AstId, scope: ScopeId) {
        for child in self.ast.children(node) {
            self.visit(child, scope);
        }
    }

    fn visit(&mut self, node: AstId, current: ScopeId) {
        match self.ast.kind(node) {
            AstKind::P4Program { decls } => {
                let decls = *decls;
                let scope = self.opened_scope(node);
                self.visit(decls, scope);
            }

            // Record types: name binds outside, fields bind inside.
            AstKind::StructTypeDeclaration { name, fields }
            | AstKind::HeaderTypeDeclaration { name, fields }
            | AstKind::HeaderUnionDeclaration { name, fields } => {
                let (name, fields) = (*name, *fields);
                self.bind(node, name, current, NameSpace::Type);
                let inner = self.opened_scope(node);
                self.visit(fields, inner);
            }
            AstKind::StructField { name, .. } => {
                let name = *name;
                self.bind(node, name, current, NameSpace::Type);
            }

            AstKind::EnumDeclaration { name, fields, .. } => {
                let (name, fields) = (*name, *fields);
                self.bind(node, name, current, NameSpace::Type);
                let inner = self.opened_scope(node);
                self.visit(fields, inner);
            }
            AstKind::SpecifiedIdentifier { name, init } => {
                let (name, init) = (*name, *init);
                self.bind(node, name, current, NameSpace::Type);
                if let Some(init) = init {
                    self.visit(init, current);
                }
            }

            // `error` / `match_kind` appearances extend the built-in
            // enumeration; the declaration node resolves to the built-in's
            // root declaration.
            AstKind::ErrorDeclaration { fields } => {
                let fields = *fields;
                self.decl_map.insert(node, self.builtins.error_decl);
                self.error_field_count += self.ast.list(fields).len();
                let inner = self.opened_scope(node);
                self.bind_enum_members(fields, inner);
            }
            AstKind::MatchKindDeclaration { fields } => {
                let fields = *fields;
                self.decl_map.insert(node, self.builtins.match_kind_decl);
                self.match_kind_field_count += self.ast.list(fields).len();
                let inner = self.opened_scope(node);
                self.bind_enum_members(fields, inner);
            }

            AstKind::ParserTypeDeclaration {
                name,
                params,
                method_protos,
            }
            | AstKind::ControlTypeDeclaration {
                name,
                params,
                method_protos,
            } => {
                let (name, params, method_protos) = (*name, *params, *method_protos);
                self.bind(node, name, current, NameSpace::Type);
                let inner = self.opened_scope(node);
                self.visit(params, inner);
                self.visit(method_protos, inner);
            }

            AstKind::ExternTypeDeclaration {
                name,
                method_protos,
            } => {
                let (name, method_protos) = (*name, *method_protos);
                self.bind(node, name, current, NameSpace::Type);
                let inner = self.opened_scope(node);
                self.visit(method_protos, inner);
            }

            AstKind::FunctionPrototype { name, params, .. } => {
                let (name, params) = (*name, *params);
                self.bind(node, name, current, NameSpace::Type);
                let inner = self.opened_scope(node);
                self.visit(params, inner);
            }

            AstKind::PackageTypeDeclaration { name, params } => {
                let (name, params) = (*name, *params);
                self.bind(node, name, current, NameSpace::Type);
                self.visit(params, current);
            }

            AstKind::TypedefDeclaration { name, .. } => {
                let name = *name;
                self.bind(node, name, current, NameSpace::Type);
            }

            AstKind::ActionDeclaration { name, params, body } => {
                let (name, params, body) = (*name, *params, *body);
                self.bind(node, name, current, NameSpace::Type);
                let inner = self.opened_scope(node);
                self.visit(params, inner);
                self.visit(body, inner);
            }

            AstKind::TableDeclaration {
                name,
                props,
                method_protos,
            } => {
                let (name, props, method_protos) = (*name, *props, *method_protos);
                self.bind(node, name, current, NameSpace::Type);
                let inner = self.opened_scope(node);
                self.visit(props, inner);
                self.visit(method_protos, inner);
            }

            AstKind::VariableDeclaration { name, init, .. } => {
                let (name, init) = (*name, *init);
                self.bind(node, name, current, NameSpace::Type);
                if let Some(init) = init {
                    self.visit(init, current);
                }
            }

            AstKind::Parameter { name, .. } => {
                let name = *name;
                self.bind(node, name, current, NameSpace::Var);
            }

            AstKind::Instantiation { name, args, .. } => {
                let (name, args) = (*name, *args);
                self.bind(node, name, current, NameSpace::Var);
                self.visit(args, current);
            }

            AstKind::ParserState { name, .. } => {
                let name = *name;
                self.bind(node, name, current, NameSpace::Var);
                let inner = self.opened_scope(node);
                self.visit_children(node, inner);
            }

            // Definitions adopt the scope their prototype opened.
            AstKind::ParserDeclaration {
                proto,
                ctor_params,
                locals,
                states,
            } => {
                let (proto, ctor_params, locals, states) = (*proto, *ctor_params, *locals, *states);
                self.visit(proto, current);
                let inner = self.opened_scope(proto);
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
                let inner = self.opened_scope(proto);
                if let Some(ctor_params) = ctor_params {
                    self.visit(ctor_params, inner);
                }
                self.visit(locals, inner);
                self.visit(apply_stmt, inner);
            }
            AstKind::FunctionDeclaration { proto, body } => {
                let (proto, body) = (*proto, *body);
                self.visit(proto, current);
                let inner = self.opened_scope(proto);
                self.visit(body, inner);
            }

            AstKind::BlockStatement { stmts } => {
                let stmts = *stmts;
                let inner = self.opened_scope(node);
                self.visit(stmts, inner);
            }

            _ => self.visit_children(node, current),
        }
    }

    fn bind_enum_members(&mut self, ident_list: AstId, scope: ScopeId) {
        for id in self.ast.list(ident_list).to_vec() {
            self.bind(id, id, scope, NameSpace::Type);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::{builtin_methods, scope_hierarchy};
    use crate::ast::AstBuilder;

    fn bind(ast: &Ast) -> (SymbolTable, NameBinding) {
        let mut symbols = SymbolTable::new();
        let scope_map = scope_hierarchy::run(ast, &mut symbols);
        let mut types = TypeTable::new();
        let binding = run(ast, &mut symbols, &scope_map, &mut types);
        (symbols, binding)
    }

    #[test]
    fn builtins_are_bound_with_types() {
        let ast = AstBuilder::new().program(vec![]);
        let (symbols, binding) = bind(&ast);
        let root = symbols.root();

        for name in ["void", "bool", "int", "bit", "varbit", "string", "error", "match_kind", "_"]
        {
            let decl = symbols
                .lookup(root, name, NameSpace::Type)
                .unwrap_or_else(|| panic!("{} bound", name));
            assert!(symbols.decl(decl).ty.is_some(), "{} carries a type", name);
        }
        assert!(symbols.lookup(root, "accept", NameSpace::Var).is_some());
        assert!(symbols.lookup(root, "reject", NameSpace::Var).is_some());
        assert_eq!(binding.error_field_count, 0);
    }

    #[test]
    fn struct_binds_in_type_namespace_with_reserved_slot() {
        let mut b = AstBuilder::new();
        let f_ty = b.bit_type(Some(8));
        let field = b.struct_field(f_ty, "x");
        let s = b.struct_decl("S", vec![field]);
        let ast = b.program(vec![s]);

        let (symbols, binding) = bind(&ast);

        let decl = binding.decl_map[&s];
        assert_eq!(symbols.decl(decl).strname.as_str(), "S");
        assert_eq!(symbols.decl(decl).namespace, NameSpace::Type);
        // The type slot is reserved but not yet populated.
        assert!(symbols.decl(decl).ty.is_none());
        assert!(binding.pending.contains_key(&s));
        // Fields got their own declarations.
        assert!(binding.decl_map.contains_key(&field));
    }

    #[test]
    fn duplicate_names_chain_within_one_scope() {
        let mut b = AstBuilder::new();
        let s1 = b.struct_decl("S", vec![]);
        let s2 = b.struct_decl("S", vec![]);
        let ast = b.program(vec![s1, s2]);

        let (symbols, binding) = bind(&ast);

        let head = binding.decl_map[&s2];
        assert_eq!(symbols.chain_len(head), 2);
        assert_eq!(symbols.decl(head).next_in_scope, Some(binding.decl_map[&s1]));
    }

    #[test]
    fn error_members_accumulate_into_the_builtin() {
        let mut b = AstBuilder::new();
        let e1 = b.error_decl(vec!["NoMatch", "Truncated"]);
        let e2 = b.error_decl(vec!["Overflow"]);
        let ast = b.program(vec![e1, e2]);

        let (_symbols, binding) = bind(&ast);

        assert_eq!(binding.error_field_count, 3);
        assert_eq!(binding.decl_map[&e1], binding.builtins.error_decl);
        assert_eq!(binding.decl_map[&e2], binding.builtins.error_decl);
    }

    #[test]
    fn parser_states_bind_as_variables_in_the_parser_scope() {
        let mut b = AstBuilder::new();
        let params = b.param_list(vec![]);
        let proto = b.parser_type_decl("P", params);
        let transition = b.transition_to("accept");
        let start = b.parser_state("start", vec![], Some(transition));
        let decl = b.parser_decl(proto, None, vec![], vec![start]);
        let mut ast = b.program(vec![decl]);
        builtin_methods::run(&mut ast);

        let mut symbols = SymbolTable::new();
        let scope_map = scope_hierarchy::run(&ast, &mut symbols);
        let mut types = TypeTable::new();
        let binding = run(&ast, &mut symbols, &scope_map, &mut types);

        let parser_scope = scope_map[&proto];
        let start_decl = symbols
            .lookup(parser_scope, "start", NameSpace::Var)
            .expect("state bound");
        assert_eq!(binding.decl_map[&start], start_decl);
    }

    #[test]
    fn variables_bind_in_the_type_namespace() {
        let mut b = AstBuilder::new();
        let ty = b.bit_type(Some(8));
        let v = b.var_decl(ty, "x", None);
        let ast = b.program(vec![v]);

        let (symbols, binding) = bind(&ast);
        let decl = binding.decl_map[&v];
        assert_eq!(symbols.decl(decl).namespace, NameSpace::Type);
    }
}
