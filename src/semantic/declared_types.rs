//! Declared-type construction.
//!
//! For every declaration the pass builds the `Type` value the declaration
//! introduces, fills the arena slot name binding reserved for it, and
//! installs the slot on the corresponding `NameDeclaration`. Type syntax
//! (base types, named references, stacks, tuples) is recorded in a
//! `type_env` so expression passes can reach the type a syntax node means.
//!
//! Named type references become transient `Nameref`s carrying the scope
//! the source text appeared in; a single resolution sweep at the end of
//! the pass rewrites them, collapses typedef chains, and compresses alias
//! links. The sweep is idempotent and leaves no `Nameref` (and no alias
//! pointing at an alias) in the arena.
//!
//! The pass also defines the built-in operator overloads as function types
//! bound in the root scope under their lexeme, which is how binary and
//! unary expressions are typed later.

use crate::ast::{Ast, AstId, AstKind};
use crate::diag;
use crate::diag::SemanticError;
use crate::ir::symbol_table::{DeclId, DeclOrigin, NameSpace, ScopeId, SymbolTable};
use crate::ir::type_table::{Type, TypeId, TypeTable};
use crate::semantic::name_binding::NameBinding;
use smol_str::SmolStr;
use std::collections::HashMap;

/// The pass output: type-syntax node → constructed type.
#[derive(Debug)]
pub(crate) struct DeclaredTypes {
    pub type_env: HashMap<AstId, TypeId>,
}

/// Runs declared-type construction and the resolution sweep.
pub(crate) fn run(
    ast: &Ast,
    symbols: &mut SymbolTable,
    scope_map: &HashMap<AstId, ScopeId>,
    binding: &NameBinding,
    types: &mut TypeTable,
) -> Result<DeclaredTypes, SemanticError> {
    let mut pass = Pass {
        ast,
        symbols,
        scope_map,
        binding,
        types,
        type_env: HashMap::new(),
        error_members: Vec::with_capacity(binding.error_field_count),
        match_kind_members: Vec::with_capacity(binding.match_kind_field_count),
    };
    pass.define_builtin_types();
    if let Some(root) = ast.root() {
        pass.visit(root);
    }
    pass.finish_builtin_enums();
    pass.resolve()?;
    Ok(DeclaredTypes {
        type_env: pass.type_env,
    })
}

struct Pass<'a> {
    ast: &'a Ast,
    symbols: &'a mut SymbolTable,
    scope_map: &'a HashMap<AstId, ScopeId>,
    binding: &'a NameBinding,
    types: &'a mut TypeTable,
    type_env: HashMap<AstId, TypeId>,
    error_members: Vec<TypeId>,
    match_kind_members: Vec<TypeId>,
}

impl Pass<'_> {
    // ------------------------------------------------------------------
    // Built-ins
    // ------------------------------------------------------------------

    /// Types `accept`/`reject` and binds the operator overloads in the
    /// root scope, keyed by lexeme.
    fn define_builtin_types(&mut self) {
        let b = self.binding.builtins;

        let accept_ty = self.types.add(Type::State);
        self.symbols.decl_mut(b.accept).ty = Some(accept_ty);
        let reject_ty = self.types.add(Type::State);
        self.symbols.decl_mut(b.reject).ty = Some(reject_ty);

        for op in ["+", "-", "*", "/"] {
            self.define_operator(op, &[b.int, b.int], b.int);
        }
        // Unary negation shares the `-` chain; operand count disambiguates.
        self.define_operator("-", &[b.int], b.int);
        for op in ["&&", "||"] {
            self.define_operator(op, &[b.bool_, b.bool_], b.bool_);
        }
        self.define_operator("!", &[b.bool_], b.bool_);
        for op in ["==", "!=", "<", ">", "<=", ">="] {
            self.define_operator(op, &[b.int, b.int], b.bool_);
        }
        for op in ["&", "|", "^", "<<", ">>", "&&&"] {
            self.define_operator(op, &[b.bit, b.bit], b.bit);
        }
        self.define_operator("~", &[b.bit], b.bit);
    }

    fn define_operator(&mut self, lexeme: &str, params: &[TypeId], ret: TypeId) {
        let params = self.types.add(Type::Product {
            members: params.to_vec(),
        });
        let f = self.types.add(Type::Function {
            name: SmolStr::new(lexeme),
            params,
            ret,
        });
        let root = self.symbols.root();
        let decl = self
            .symbols
            .bind(root, SmolStr::new(lexeme), NameSpace::Type, DeclOrigin::Builtin);
        self.symbols.decl_mut(decl).ty = Some(f);
    }

    /// Installs the accumulated member arrays on the built-in `error` and
    /// `match_kind` enumerations.
    fn finish_builtin_enums(&mut self) {
        debug_assert_eq!(self.error_members.len(), self.binding.error_field_count);
        debug_assert_eq!(
            self.match_kind_members.len(),
            self.binding.match_kind_field_count
        );
        let members = std::mem::take(&mut self.error_members);
        self.types
            .set(self.binding.builtins.error_fields, Type::Product { members });
        let members = std::mem::take(&mut self.match_kind_members);
        self.types.set(
            self.binding.builtins.match_kind_fields,
            Type::Product { members },
        );
    }

    // ------------------------------------------------------------------
    // Slot plumbing
    // ------------------------------------------------------------------

    fn decl_of(&self, node: AstId) -> DeclId {
        self.binding.decl_map[&node]
    }

    fn slot_of(&self, node: AstId) -> TypeId {
        self.binding.pending[&node]
    }

    /// Fills `node`'s reserved slot with its definition and installs it on
    /// the name declaration.
    fn fill(&mut self, node: AstId, ty: Type) -> TypeId {
        let slot = self.slot_of(node);
        self.types.set(slot, ty);
        let decl = self.decl_of(node);
        self.symbols.decl_mut(decl).ty = Some(slot);
        self.type_env.insert(node, slot);
        slot
    }

    /// Fills `node`'s slot with an alias to an existing type.
    fn fill_alias(&mut self, node: AstId, target: TypeId) -> TypeId {
        self.fill(node, Type::Alias { target })
    }

    // ------------------------------------------------------------------
    // Type syntax
    // ------------------------------------------------------------------

    /// Constructs the type a type-syntax node denotes.
    fn visit_type(&mut self, node: AstId) -> TypeId {
        let b = self.binding.builtins;
        let ty = match self.ast.kind(node) {
            AstKind::TypeRef { ty } => {
                let ty = *ty;
                self.visit_type(ty)
            }
            AstKind::BaseTypeVoid { .. } => b.void_,
            AstKind::BaseTypeBool { .. } => b.bool_,
            AstKind::BaseTypeString { .. } => b.string,
            AstKind::BaseTypeError { .. } => b.error,
            AstKind::BaseTypeInteger { size, .. } => {
                let size = *size;
                match size {
                    None => b.int,
                    Some(size) => {
                        let width = self.width_of(size);
                        self.types.add_for(Type::Int { width }, node)
                    }
                }
            }
            AstKind::BaseTypeBit { size, .. } => {
                let size = *size;
                match size {
                    None => b.bit,
                    Some(size) => {
                        let width = self.width_of(size);
                        self.types.add_for(Type::Bit { width }, node)
                    }
                }
            }
            AstKind::BaseTypeVarbit { size, .. } => {
                let size = *size;
                let width = self.width_of(size);
                self.types.add_for(Type::Varbit { width }, node)
            }
            AstKind::Name { .. } => {
                let scope = self.scope_map[&node];
                self.types.add_for(Type::Nameref { name: node, scope }, node)
            }
            AstKind::HeaderStackType { ty, size } => {
                let (ty, size) = (*ty, *size);
                let element = self.visit_type(ty);
                let size = self
                    .ast
                    .integer_value(size)
                    .expect("header stack size is an integer literal")
                    as u32;
                self.types.add_for(Type::Stack { element, size }, node)
            }
            AstKind::TupleType { type_args } => {
                let args = self.ast.list(*type_args).to_vec();
                let members: Vec<_> = args.into_iter().map(|a| self.visit_type(a)).collect();
                self.types.add_for(Type::Product { members }, node)
            }
            other => panic!("type syntax expected, found {:?}", other),
        };
        self.type_env.insert(node, ty);
        ty
    }

    /// The constant width of an `IntegerTypeSize` argument.
    fn width_of(&self, size: AstId) -> u32 {
        self.ast
            .integer_value(size)
            .expect("type width is an integer literal") as u32
    }

    /// Types each parameter, installs it on its declaration, and returns
    /// the parameter product.
    fn visit_params(&mut self, list: AstId) -> TypeId {
        let params = self.ast.list(list).to_vec();
        let mut members = Vec::with_capacity(params.len());
        for param in params {
            let AstKind::Parameter { ty, .. } = self.ast.kind(param) else {
                panic!("parameter expected in parameter list");
            };
            let ty = *ty;
            let pty = self.visit_type(ty);
            self.fill_alias(param, pty);
            members.push(pty);
        }
        self.types.add(Type::Product { members })
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    fn visit_children(&mut self, node: AstId) {
        for child in self.ast.children(node) {
            self.visit(child);
        }
    }

    fn visit(&mut self, node: AstId) {
        match self.ast.kind(node) {
            AstKind::StructTypeDeclaration { name, fields } => {
                let (name, fields) = (*name, *fields);
                let name = self.ast.name_str(name).clone();
                let fields = self.visit_record_fields(fields);
                self.fill(node, Type::Struct { name, fields });
            }
            AstKind::HeaderTypeDeclaration { name, fields } => {
                let (name, fields) = (*name, *fields);
                let name = self.ast.name_str(name).clone();
                let fields = self.visit_record_fields(fields);
                self.fill(node, Type::Header { name, fields });
            }
            AstKind::HeaderUnionDeclaration { name, fields } => {
                let (name, fields) = (*name, *fields);
                let name = self.ast.name_str(name).clone();
                let fields = self.visit_record_fields(fields);
                self.fill(node, Type::HeaderUnion { name, fields });
            }

            AstKind::EnumDeclaration { name, fields, .. } => {
                let (name, fields) = (*name, *fields);
                let enum_slot = self.slot_of(node);
                let members = self.ast.list(fields).to_vec();
                let mut field_ids = Vec::with_capacity(members.len());
                for member in members {
                    let AstKind::SpecifiedIdentifier { name, .. } = self.ast.kind(member) else {
                        panic!("enum member expected");
                    };
                    let mname = self.ast.name_str(*name).clone();
                    let field = Type::Field {
                        name: mname,
                        ty: enum_slot,
                    };
                    field_ids.push(self.fill(member, field));
                }
                let fields_product = self.types.add(Type::Product { members: field_ids });
                let name = self.ast.name_str(name).clone();
                self.fill(
                    node,
                    Type::Enum {
                        name,
                        fields: fields_product,
                    },
                );
            }

            // Append members of the built-in enumerations at the running
            // index; the pre-sized arrays are installed once at pass end.
            AstKind::ErrorDeclaration { fields } => {
                let fields = *fields;
                let error_ty = self.binding.builtins.error;
                for id in self.ast.list(fields).to_vec() {
                    let name = self.ast.name_str(id).clone();
                    let field = self.fill(id, Type::Field { name, ty: error_ty });
                    self.error_members.push(field);
                }
            }
            AstKind::MatchKindDeclaration { fields } => {
                let fields = *fields;
                let mk_ty = self.binding.builtins.match_kind;
                for id in self.ast.list(fields).to_vec() {
                    let name = self.ast.name_str(id).clone();
                    let field = self.fill(id, Type::Field { name, ty: mk_ty });
                    self.match_kind_members.push(field);
                }
            }

            AstKind::TypedefDeclaration { type_ref, name } => {
                let (type_ref, name) = (*type_ref, *name);
                let target = self.visit_type(type_ref);
                let name = self.ast.name_str(name).clone();
                self.fill(node, Type::Typedef { name, target });
            }

            AstKind::FunctionPrototype { .. } => {
                self.visit_function_prototype(node, None);
            }

            AstKind::ExternTypeDeclaration {
                name,
                method_protos,
            } => {
                let (name, method_protos) = (*name, *method_protos);
                let ename = self.ast.name_str(name).clone();
                let slot = self.slot_of(node);
                let protos = self.ast.list(method_protos).to_vec();
                let mut methods = Vec::with_capacity(protos.len());
                let mut ctors = Vec::new();
                for proto in protos {
                    let m = self.visit_function_prototype(proto, Some((&ename, slot)));
                    let AstKind::FunctionPrototype { name, .. } = self.ast.kind(proto) else {
                        unreachable!();
                    };
                    if self.ast.name_str(*name) == &ename {
                        ctors.push(m);
                    }
                    methods.push(m);
                }
                let methods = self.types.add(Type::Product { members: methods });
                let ctors = self.types.add(Type::Product { members: ctors });
                self.fill(
                    node,
                    Type::Extern {
                        name: ename,
                        methods,
                        ctors,
                    },
                );
            }

            AstKind::PackageTypeDeclaration { name, params } => {
                let (name, params) = (*name, *params);
                let params = self.visit_params(params);
                let name = self.ast.name_str(name).clone();
                self.fill(node, Type::Package { name, params });
            }

            AstKind::ParserTypeDeclaration { .. } => {
                let empty = self.types.add(Type::Product {
                    members: Vec::new(),
                });
                self.visit_parser_or_control_proto(node, empty);
            }
            AstKind::ControlTypeDeclaration { .. } => {
                let empty = self.types.add(Type::Product {
                    members: Vec::new(),
                });
                self.visit_parser_or_control_proto(node, empty);
            }

            AstKind::ParserDeclaration {
                proto,
                ctor_params,
                locals,
                states,
            } => {
                let (proto, ctor_params, locals, states) = (*proto, *ctor_params, *locals, *states);
                let ctor_product = match ctor_params {
                    Some(cp) => self.visit_params(cp),
                    None => self.types.add(Type::Product {
                        members: Vec::new(),
                    }),
                };
                self.visit_parser_or_control_proto(proto, ctor_product);
                self.visit(locals);
                self.visit(states);
            }
            AstKind::ControlDeclaration {
                proto,
                ctor_params,
                locals,
                apply_stmt,
            } => {
                let (proto, ctor_params, locals, apply_stmt) =
                    (*proto, *ctor_params, *locals, *apply_stmt);
                let ctor_product = match ctor_params {
                    Some(cp) => self.visit_params(cp),
                    None => self.types.add(Type::Product {
                        members: Vec::new(),
                    }),
                };
                self.visit_parser_or_control_proto(proto, ctor_product);
                self.visit(locals);
                self.visit(apply_stmt);
            }

            AstKind::ParserState { stmts, transition, .. } => {
                let (stmts, transition) = (*stmts, *transition);
                self.fill(node, Type::State);
                self.visit(stmts);
                if let Some(transition) = transition {
                    self.visit(transition);
                }
            }

            AstKind::TableDeclaration {
                name,
                props,
                method_protos,
            } => {
                let (name, props, method_protos) = (*name, *props, *method_protos);
                let protos = self.ast.list(method_protos).to_vec();
                let mut methods = Vec::with_capacity(protos.len());
                for proto in protos {
                    methods.push(self.visit_function_prototype(proto, None));
                }
                let methods = self.types.add(Type::Product { members: methods });
                let name = self.ast.name_str(name).clone();
                self.fill(node, Type::Table { name, methods });
                self.visit(props);
            }

            AstKind::ActionDeclaration { name, params, body } => {
                let (name, params, body) = (*name, *params, *body);
                let params = self.visit_params(params);
                let name = self.ast.name_str(name).clone();
                let ret = self.binding.builtins.void_;
                self.fill(node, Type::Function { name, params, ret });
                self.visit(body);
            }

            AstKind::FunctionDeclaration { proto, body } => {
                let (proto, body) = (*proto, *body);
                self.visit_function_prototype(proto, None);
                self.visit(body);
            }

            AstKind::VariableDeclaration { ty, init, .. } => {
                let (ty, init) = (*ty, *init);
                let vty = self.visit_type(ty);
                self.fill_alias(node, vty);
                if let Some(init) = init {
                    self.visit(init);
                }
            }

            AstKind::Instantiation { ty, args, .. } => {
                let (ty, args) = (*ty, *args);
                let ity = self.visit_type(ty);
                self.fill_alias(node, ity);
                self.visit(args);
            }

            // Cast targets are type syntax embedded in expressions; the
            // expression passes fetch them from the type environment.
            AstKind::CastExpression { ty, expr } => {
                let (ty, expr) = (*ty, *expr);
                self.visit_type(ty);
                self.visit(expr);
            }

            _ => self.visit_children(node),
        }
    }

    fn visit_record_fields(&mut self, fields: AstId) -> TypeId {
        let items = self.ast.list(fields).to_vec();
        let mut members = Vec::with_capacity(items.len());
        for field in items {
            let AstKind::StructField { ty, name } = self.ast.kind(field) else {
                panic!("record field expected");
            };
            let (ty, name) = (*ty, *name);
            let fty = self.visit_type(ty);
            let fname = self.ast.name_str(name).clone();
            members.push(self.fill(
                field,
                Type::Field {
                    name: fname,
                    ty: fty,
                },
            ));
        }
        self.types.add(Type::Product { members })
    }

    /// Types a parser or control prototype, wiring in the constructor
    /// parameter product its enclosing definition contributed.
    fn visit_parser_or_control_proto(&mut self, node: AstId, ctor_params: TypeId) {
        let (name, params, method_protos, is_parser) = match self.ast.kind(node) {
            AstKind::ParserTypeDeclaration {
                name,
                params,
                method_protos,
            } => (*name, *params, *method_protos, true),
            AstKind::ControlTypeDeclaration {
                name,
                params,
                method_protos,
            } => (*name, *params, *method_protos, false),
            other => panic!("parser or control prototype expected, found {:?}", other),
        };
        let params = self.visit_params(params);
        let protos = self.ast.list(method_protos).to_vec();
        let mut methods = Vec::with_capacity(protos.len());
        for proto in protos {
            methods.push(self.visit_function_prototype(proto, None));
        }
        let methods = self.types.add(Type::Product { members: methods });
        let name = self.ast.name_str(name).clone();
        let ty = if is_parser {
            Type::Parser {
                name,
                params,
                ctor_params,
                methods,
            }
        } else {
            Type::Control {
                name,
                params,
                ctor_params,
                methods,
            }
        };
        self.fill(node, ty);
    }

    /// Types a function prototype. Inside an extern, a prototype named
    /// after the extern is a constructor and returns the extern type.
    fn visit_function_prototype(
        &mut self,
        node: AstId,
        enclosing_extern: Option<(&SmolStr, TypeId)>,
    ) -> TypeId {
        let AstKind::FunctionPrototype {
            return_type,
            name,
            params,
        } = self.ast.kind(node)
        else {
            panic!("function prototype expected");
        };
        let (return_type, name, params) = (*return_type, *name, *params);
        let params = self.visit_params(params);
        let fname = self.ast.name_str(name).clone();
        let ret = match enclosing_extern {
            Some((ename, ety)) if &fname == ename => ety,
            _ => match return_type {
                Some(rt) => self.visit_type(rt),
                None => self.binding.builtins.void_,
            },
        };
        self.fill(
            node,
            Type::Function {
                name: fname,
                params,
                ret,
            },
        )
    }

    /// The declared name of a declaration node, for diagnostics.
    fn declared_name(&self, node: AstId) -> Option<&SmolStr> {
        let name = match self.ast.kind(node) {
            AstKind::VariableDeclaration { name, .. }
            | AstKind::TypedefDeclaration { name, .. }
            | AstKind::Instantiation { name, .. }
            | AstKind::Parameter { name, .. } => *name,
            AstKind::Name { .. } => node,
            _ => return None,
        };
        Some(self.ast.name_str(name))
    }

    // ------------------------------------------------------------------
    // Resolution sweep
    // ------------------------------------------------------------------

    /// The end-of-pass sweep over the whole arena:
    /// 1. resolve every `Nameref` through its recorded scope,
    /// 2. collapse typedef chains, reporting cycles,
    /// 3. compress alias forwarding so no alias points at an alias.
    ///
    /// Applying the sweep twice leaves the arena unchanged.
    fn resolve(&mut self) -> Result<(), SemanticError> {
        let arena_len = self.types.len();

        // 1. Namerefs.
        for idx in 0..arena_len {
            let id = TypeId::new(idx);
            let Type::Nameref { name, scope } = self.types.get(id) else {
                continue;
            };
            let (name, scope) = (*name, *scope);
            let strname = self.ast.name_str(name).clone();
            let loc = self.ast.loc(name);
            let Some(head) = self.symbols.lookup(scope, &strname, NameSpace::Type) else {
                return Err(diag::unresolved_type_reference(&strname, loc));
            };
            if self.symbols.decl(head).next_in_scope.is_some() {
                return Err(diag::ambiguous_type_reference(&strname, loc));
            }
            let target = self
                .symbols
                .decl(head)
                .ty
                .expect("declared type installed before resolution");
            self.types.set(id, Type::Alias { target });
        }

        // 2. Typedef chains.
        for idx in 0..arena_len {
            let id = TypeId::new(idx);
            let Type::Typedef { name, target } = self.types.get(id) else {
                continue;
            };
            let tname = name.clone();
            let mut cursor = *target;
            let mut seen = vec![id];
            loop {
                match self.types.get(cursor) {
                    Type::Alias { target } => cursor = *target,
                    Type::Typedef { target, .. } => {
                        if seen.contains(&cursor) {
                            let loc = self
                                .types
                                .origin(id)
                                .map(|ast| self.ast.loc(ast))
                                .unwrap_or_default();
                            return Err(diag::type_aliasing_cycle(&tname, loc));
                        }
                        seen.push(cursor);
                        cursor = *target;
                    }
                    _ => break,
                }
                if seen.contains(&cursor) {
                    let loc = self
                        .types
                        .origin(id)
                        .map(|ast| self.ast.loc(ast))
                        .unwrap_or_default();
                    return Err(diag::type_aliasing_cycle(&tname, loc));
                }
            }
            self.types.set(id, Type::Alias { target: cursor });
        }

        // 3. Alias compression. A declaration whose type names itself shows
        // up here as an alias loop; it is the same user error as a typedef
        // cycle and reported as one.
        for idx in 0..arena_len {
            let id = TypeId::new(idx);
            if !matches!(self.types.get(id), Type::Alias { .. }) {
                continue;
            }
            let mut cursor = id;
            let mut seen = Vec::new();
            while let Type::Alias { target } = self.types.get(cursor) {
                if seen.contains(&cursor) {
                    let origin = self.types.origin(id);
                    let loc = origin.map(|ast| self.ast.loc(ast)).unwrap_or_default();
                    let name = origin
                        .and_then(|ast| self.declared_name(ast))
                        .map(|n| n.to_string())
                        .unwrap_or_else(|| "<type>".to_string());
                    return Err(diag::type_aliasing_cycle(&name, loc));
                }
                seen.push(cursor);
                cursor = *target;
            }
            debug_assert!(!matches!(self.types.get(cursor), Type::Typedef { .. }));
            self.types.set(id, Type::Alias { target: cursor });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AstBuilder;
    use crate::ir::symbol_table::NameSpace;
    use crate::semantic::{builtin_methods, name_binding, scope_hierarchy};

    struct Prepared {
        ast: Ast,
        symbols: SymbolTable,
        types: TypeTable,
        binding: NameBinding,
        result: Result<DeclaredTypes, SemanticError>,
    }

    fn analyze(mut ast: Ast) -> Prepared {
        builtin_methods::run(&mut ast);
        let mut symbols = SymbolTable::new();
        let scope_map = scope_hierarchy::run(&ast, &mut symbols);
        let mut types = TypeTable::new();
        let binding = name_binding::run(&ast, &mut symbols, &scope_map, &mut types);
        let result = run(&ast, &mut symbols, &scope_map, &binding, &mut types);
        Prepared {
            ast,
            symbols,
            types,
            binding,
            result,
        }
    }

    #[test]
    fn struct_declaration_yields_a_struct_type() {
        let mut b = AstBuilder::new();
        let f_ty = b.bit_type(Some(8));
        let field = b.struct_field(f_ty, "x");
        let s = b.struct_decl("S", vec![field]);
        let ast = b.program(vec![s]);

        let p = analyze(ast);
        p.result.expect("resolves");

        let slot = p.binding.pending[&s];
        let Type::Struct { name, fields } = p.types.get(slot) else {
            panic!("struct type expected, found {:?}", p.types.get(slot));
        };
        assert_eq!(name.as_str(), "S");
        let members = p.types.product_members(*fields);
        assert_eq!(members.len(), 1);
        let Type::Field { name, ty } = p.types.get(members[0]) else {
            panic!("field expected");
        };
        assert_eq!(name.as_str(), "x");
        assert!(matches!(
            p.types.get(p.types.effective(*ty)),
            Type::Bit { width: 8 }
        ));
    }

    #[test]
    fn named_references_resolve_through_their_scope() {
        let mut b = AstBuilder::new();
        let s = b.struct_decl("S", vec![]);
        let s_ty = b.named_type("S");
        let v = b.var_decl(s_ty, "s", None);
        let ast = b.program(vec![s, v]);

        let p = analyze(ast);
        p.result.expect("resolves");

        let v_decl = p.binding.decl_map[&v];
        let vty = p.symbols.decl(v_decl).ty.expect("typed");
        let effective = p.types.effective(vty);
        assert!(matches!(p.types.get(effective), Type::Struct { name, .. } if name == "S"));
        // No nameref survives the sweep.
        for id in p.types.ids() {
            assert!(!matches!(p.types.get(id), Type::Nameref { .. }));
        }
    }

    #[test]
    fn unresolved_reference_is_fatal() {
        let mut b = AstBuilder::new();
        b.at(3, 14);
        let ty = b.named_type("Missing");
        let v = b.var_decl(ty, "v", None);
        let ast = b.program(vec![v]);

        let p = analyze(ast);
        let err = p.result.expect_err("must fail");
        assert_eq!(err.kind, crate::diag::SemanticErrorKind::UnresolvedName);
        assert_eq!(err.loc.line, 3);
    }

    #[test]
    fn duplicate_type_reference_is_ambiguous() {
        let mut b = AstBuilder::new();
        let s1 = b.struct_decl("S", vec![]);
        let s2 = b.struct_decl("S", vec![]);
        let s_ty = b.named_type("S");
        let v = b.var_decl(s_ty, "s", None);
        let ast = b.program(vec![s1, s2, v]);

        let p = analyze(ast);
        let err = p.result.expect_err("must fail");
        assert_eq!(err.kind, crate::diag::SemanticErrorKind::AmbiguousName);
    }

    #[test]
    fn typedef_chains_collapse() {
        let mut b = AstBuilder::new();
        let bit8 = b.bit_type(Some(8));
        let t1 = b.typedef_decl(bit8, "Byte");
        let byte_ref = b.named_type("Byte");
        let t2 = b.typedef_decl(byte_ref, "Octet");
        let octet_ref = b.named_type("Octet");
        let v = b.var_decl(octet_ref, "o", None);
        let ast = b.program(vec![t1, t2, v]);

        let p = analyze(ast);
        p.result.expect("resolves");

        let v_decl = p.binding.decl_map[&v];
        let vty = p.symbols.decl(v_decl).ty.expect("typed");
        assert!(matches!(
            p.types.get(p.types.effective(vty)),
            Type::Bit { width: 8 }
        ));
        // No alias points at an alias after compression.
        for id in p.types.ids() {
            if let Type::Alias { target } = p.types.get(id) {
                assert!(!matches!(p.types.get(*target), Type::Alias { .. }));
            }
        }
    }

    #[test]
    fn typedef_cycle_is_reported() {
        let mut b = AstBuilder::new();
        let a_ref = b.named_type("A");
        let t1 = b.typedef_decl(a_ref, "B");
        let b_ref = b.named_type("B");
        let t2 = b.typedef_decl(b_ref, "A");
        let ast = b.program(vec![t1, t2]);

        let p = analyze(ast);
        let err = p.result.expect_err("must fail");
        assert_eq!(err.kind, crate::diag::SemanticErrorKind::TypeAliasCycle);
    }

    #[test]
    fn extern_constructor_returns_the_extern() {
        let mut b = AstBuilder::new();
        let ctor_params = b.param_list(vec![]);
        let ctor = b.function_proto(None, "Checksum16", ctor_params);
        let get_params = b.param_list(vec![]);
        let ret = b.bit_type(Some(16));
        let get = b.function_proto(Some(ret), "get", get_params);
        let ext = b.extern_decl("Checksum16", vec![ctor, get]);
        let ast = b.program(vec![ext]);

        let p = analyze(ast);
        p.result.expect("resolves");

        let slot = p.binding.pending[&ext];
        let Type::Extern { ctors, methods, .. } = p.types.get(slot) else {
            panic!("extern expected");
        };
        assert_eq!(p.types.product_members(*methods).len(), 2);
        let ctor_members = p.types.product_members(*ctors);
        assert_eq!(ctor_members.len(), 1);
        let Type::Function { ret, .. } = p.types.get(ctor_members[0]) else {
            panic!("ctor is a function");
        };
        assert_eq!(p.types.effective(*ret), slot);
    }

    #[test]
    fn parser_prototype_carries_the_synthesized_apply() {
        let mut b = AstBuilder::new();
        let params = b.param_list(vec![]);
        let proto = b.parser_type_decl("P", params);
        let transition = b.transition_to("accept");
        let start = b.parser_state("start", vec![], Some(transition));
        let decl = b.parser_decl(proto, None, vec![], vec![start]);
        let ast = b.program(vec![decl]);

        let p = analyze(ast);
        p.result.expect("resolves");

        let slot = p.binding.pending[&proto];
        let Type::Parser { methods, .. } = p.types.get(slot) else {
            panic!("parser type expected");
        };
        let apply = p
            .types
            .product_members(*methods)
            .iter()
            .copied()
            .find(|m| matches!(p.types.get(*m), Type::Function { name, .. } if name == "apply"))
            .expect("apply present");
        let Type::Function { params, ret, .. } = p.types.get(apply) else {
            unreachable!();
        };
        assert!(p.types.product_members(*params).is_empty());
        assert!(matches!(p.types.get(p.types.effective(*ret)), Type::Void));
    }

    #[test]
    fn operator_overloads_are_bound_in_the_root_scope() {
        let ast = AstBuilder::new().program(vec![]);
        let p = analyze(ast);
        p.result.expect("resolves");

        let root = p.symbols.root();
        for op in ["+", "&&", "==", "<<", "&&&", "~", "!"] {
            let head = p
                .symbols
                .lookup(root, op, NameSpace::Type)
                .unwrap_or_else(|| panic!("operator {} bound", op));
            let ty = p.symbols.decl(head).ty.expect("typed");
            assert!(matches!(p.types.get(ty), Type::Function { .. }));
        }
        // `-` carries both the binary and the unary overload.
        let minus = p.symbols.lookup(root, "-", NameSpace::Type).unwrap();
        assert_eq!(p.symbols.chain_len(minus), 2);
    }

    #[test]
    fn error_members_fill_the_presized_product() {
        let mut b = AstBuilder::new();
        let e1 = b.error_decl(vec!["NoMatch"]);
        let e2 = b.error_decl(vec!["Truncated", "Overflow"]);
        let ast = b.program(vec![e1, e2]);

        let p = analyze(ast);
        p.result.expect("resolves");

        let members = p
            .types
            .product_members(p.binding.builtins.error_fields)
            .to_vec();
        assert_eq!(members.len(), 3);
        let names: Vec<_> = members
            .iter()
            .map(|m| match p.types.get(*m) {
                Type::Field { name, .. } => name.as_str().to_string(),
                _ => panic!("field expected"),
            })
            .collect();
        assert_eq!(names, ["NoMatch", "Truncated", "Overflow"]);
    }

    #[test]
    fn resolution_sweep_is_idempotent() {
        let mut b = AstBuilder::new();
        let bit8 = b.bit_type(Some(8));
        let t1 = b.typedef_decl(bit8, "Byte");
        let byte_ref = b.named_type("Byte");
        let v = b.var_decl(byte_ref, "x", None);
        let ast = b.program(vec![t1, v]);

        let mut p = analyze(ast);
        p.result.as_ref().expect("resolves");

        let before: Vec<Type> = p.types.ids().map(|id| p.types.get(id).clone()).collect();
        // Re-running the sweep over the resolved arena changes nothing.
        let mut fresh_symbols = SymbolTable::new();
        let scope_map = scope_hierarchy::run(&p.ast, &mut fresh_symbols);
        let mut pass = Pass {
            ast: &p.ast,
            symbols: &mut p.symbols,
            scope_map: &scope_map,
            binding: &p.binding,
            types: &mut p.types,
            type_env: HashMap::new(),
            error_members: Vec::new(),
            match_kind_members: Vec::new(),
        };
        pass.resolve().expect("second sweep succeeds");
        let after: Vec<Type> = p.types.ids().map(|id| p.types.get(id).clone()).collect();
        assert_eq!(before, after);
    }
}
