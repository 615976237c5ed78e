//! Convenience constructors for assembling ASTs.
//!
//! The semantic pipeline consumes trees produced by an external parser.
//! [`AstBuilder`] is the construction surface such a parser targets; the
//! integration tests and benchmarks use it to assemble programs directly.
//!
//! Every node created inherits the builder's current location cursor, which
//! a parser advances with [`AstBuilder::at`] as it consumes tokens.

use crate::ast::{Ast, AstId, AstKind, AstOp, ParamDirection, SourceLoc};
use smol_str::SmolStr;

/// Incremental AST constructor with a source-location cursor.
#[derive(Debug, Default)]
pub struct AstBuilder {
    ast: Ast,
    loc: SourceLoc,
}

impl AstBuilder {
    /// Creates a builder with the cursor at 1:1.
    pub fn new() -> Self {
        Self {
            ast: Ast::new(),
            loc: SourceLoc::new(1, 1),
        }
    }

    /// Moves the location cursor; subsequent nodes are stamped with it.
    pub fn at(&mut self, line: u32, column: u32) -> &mut Self {
        self.loc = SourceLoc::new(line, column);
        self
    }

    /// Appends a node with the current cursor location.
    pub fn push(&mut self, kind: AstKind) -> AstId {
        self.ast.push(kind, self.loc)
    }

    /// Finishes construction, marking `root` as the program node.
    pub fn finish(mut self, root: AstId) -> Ast {
        self.ast.set_root(root);
        self.ast
    }

    // ------------------------------------------------------------------
    // Names and literals
    // ------------------------------------------------------------------

    /// An identifier occurrence.
    pub fn name(&mut self, s: &str) -> AstId {
        self.push(AstKind::Name {
            strname: SmolStr::new(s),
        })
    }

    /// An unsuffixed integer literal.
    pub fn int_literal(&mut self, value: i64) -> AstId {
        self.push(AstKind::IntegerLiteral {
            is_signed: false,
            width: 0,
            value,
        })
    }

    /// A width-prefixed integer literal such as `8w255`.
    pub fn sized_int_literal(&mut self, is_signed: bool, width: u32, value: i64) -> AstId {
        self.push(AstKind::IntegerLiteral {
            is_signed,
            width,
            value,
        })
    }

    /// `true` or `false`.
    pub fn bool_literal(&mut self, value: bool) -> AstId {
        self.push(AstKind::BooleanLiteral { value })
    }

    /// A string literal.
    pub fn string_literal(&mut self, value: &str) -> AstId {
        self.push(AstKind::StringLiteral {
            value: SmolStr::new(value),
        })
    }

    /// `_`
    pub fn dontcare(&mut self) -> AstId {
        self.push(AstKind::Dontcare)
    }

    /// `default`
    pub fn default_(&mut self) -> AstId {
        self.push(AstKind::Default)
    }

    // ------------------------------------------------------------------
    // Type syntax
    // ------------------------------------------------------------------

    fn width_arg(&mut self, width: i64) -> AstId {
        let lit = self.int_literal(width);
        self.push(AstKind::IntegerTypeSize { size: lit })
    }

    /// `void`
    pub fn void_type(&mut self) -> AstId {
        let name = self.name("void");
        self.push(AstKind::BaseTypeVoid { name })
    }

    /// `bool`
    pub fn bool_type(&mut self) -> AstId {
        let name = self.name("bool");
        self.push(AstKind::BaseTypeBool { name })
    }

    /// `string`
    pub fn string_type(&mut self) -> AstId {
        let name = self.name("string");
        self.push(AstKind::BaseTypeString { name })
    }

    /// `error`
    pub fn error_type(&mut self) -> AstId {
        let name = self.name("error");
        self.push(AstKind::BaseTypeError { name })
    }

    /// `int` or `int<width>`.
    pub fn int_type(&mut self, width: Option<i64>) -> AstId {
        let name = self.name("int");
        let size = width.map(|w| self.width_arg(w));
        self.push(AstKind::BaseTypeInteger { name, size })
    }

    /// `bit` or `bit<width>`.
    pub fn bit_type(&mut self, width: Option<i64>) -> AstId {
        let name = self.name("bit");
        let size = width.map(|w| self.width_arg(w));
        self.push(AstKind::BaseTypeBit { name, size })
    }

    /// `varbit<width>`.
    pub fn varbit_type(&mut self, width: i64) -> AstId {
        let name = self.name("varbit");
        let size = self.width_arg(width);
        self.push(AstKind::BaseTypeVarbit { name, size })
    }

    /// A declared type referenced by name.
    pub fn named_type(&mut self, s: &str) -> AstId {
        let name = self.name(s);
        self.push(AstKind::TypeRef { ty: name })
    }

    /// `T[size]`
    pub fn header_stack_type(&mut self, element: AstId, size: i64) -> AstId {
        let size = self.int_literal(size);
        self.push(AstKind::HeaderStackType { ty: element, size })
    }

    /// `tuple<...>`
    pub fn tuple_type(&mut self, args: Vec<AstId>) -> AstId {
        let type_args = self.push(AstKind::TypeArgumentList { items: args });
        self.push(AstKind::TupleType { type_args })
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    /// A record field `ty name;`.
    pub fn struct_field(&mut self, ty: AstId, field_name: &str) -> AstId {
        let name = self.name(field_name);
        self.push(AstKind::StructField { ty, name })
    }

    /// `struct Name { fields }`
    pub fn struct_decl(&mut self, struct_name: &str, fields: Vec<AstId>) -> AstId {
        let name = self.name(struct_name);
        let fields = self.push(AstKind::StructFieldList { items: fields });
        self.push(AstKind::StructTypeDeclaration { name, fields })
    }

    /// `header Name { fields }`
    pub fn header_decl(&mut self, header_name: &str, fields: Vec<AstId>) -> AstId {
        let name = self.name(header_name);
        let fields = self.push(AstKind::StructFieldList { items: fields });
        self.push(AstKind::HeaderTypeDeclaration { name, fields })
    }

    /// `header_union Name { fields }`
    pub fn header_union_decl(&mut self, union_name: &str, fields: Vec<AstId>) -> AstId {
        let name = self.name(union_name);
        let fields = self.push(AstKind::StructFieldList { items: fields });
        self.push(AstKind::HeaderUnionDeclaration { name, fields })
    }

    /// `enum Name { members }`
    pub fn enum_decl(&mut self, enum_name: &str, members: Vec<&str>) -> AstId {
        let name = self.name(enum_name);
        let members = members
            .into_iter()
            .map(|m| {
                let name = self.name(m);
                self.push(AstKind::SpecifiedIdentifier { name, init: None })
            })
            .collect();
        let fields = self.push(AstKind::SpecifiedIdentifierList { items: members });
        self.push(AstKind::EnumDeclaration {
            type_size: None,
            name,
            fields,
        })
    }

    /// `error { ids }`
    pub fn error_decl(&mut self, ids: Vec<&str>) -> AstId {
        let fields = self.identifier_list(ids);
        self.push(AstKind::ErrorDeclaration { fields })
    }

    /// `match_kind { ids }`
    pub fn match_kind_decl(&mut self, ids: Vec<&str>) -> AstId {
        let fields = self.identifier_list(ids);
        self.push(AstKind::MatchKindDeclaration { fields })
    }

    fn identifier_list(&mut self, ids: Vec<&str>) -> AstId {
        let items = ids.into_iter().map(|s| self.name(s)).collect();
        self.push(AstKind::IdentifierList { items })
    }

    /// `typedef T Name;`
    pub fn typedef_decl(&mut self, ty: AstId, alias: &str) -> AstId {
        let name = self.name(alias);
        self.push(AstKind::TypedefDeclaration { type_ref: ty, name })
    }

    /// A formal parameter.
    pub fn param(&mut self, direction: ParamDirection, ty: AstId, param_name: &str) -> AstId {
        let name = self.name(param_name);
        self.push(AstKind::Parameter {
            direction,
            name,
            ty,
            init: None,
        })
    }

    /// An ordered parameter list.
    pub fn param_list(&mut self, params: Vec<AstId>) -> AstId {
        self.push(AstKind::ParameterList { items: params })
    }

    /// `ret name(params);`
    pub fn function_proto(
        &mut self,
        return_type: Option<AstId>,
        fn_name: &str,
        params: AstId,
    ) -> AstId {
        let name = self.name(fn_name);
        self.push(AstKind::FunctionPrototype {
            return_type,
            name,
            params,
        })
    }

    /// A function definition.
    pub fn function_decl(&mut self, proto: AstId, body: AstId) -> AstId {
        self.push(AstKind::FunctionDeclaration { proto, body })
    }

    /// `extern Name { methods }`
    pub fn extern_decl(&mut self, extern_name: &str, methods: Vec<AstId>) -> AstId {
        let name = self.name(extern_name);
        let method_protos = self.push(AstKind::MethodPrototypes { items: methods });
        self.push(AstKind::ExternTypeDeclaration {
            name,
            method_protos,
        })
    }

    /// `parser Name(params)` prototype with an empty method list.
    pub fn parser_type_decl(&mut self, parser_name: &str, params: AstId) -> AstId {
        let name = self.name(parser_name);
        let method_protos = self.push(AstKind::MethodPrototypes { items: Vec::new() });
        self.push(AstKind::ParserTypeDeclaration {
            name,
            params,
            method_protos,
        })
    }

    /// A parser definition.
    pub fn parser_decl(
        &mut self,
        proto: AstId,
        ctor_params: Option<AstId>,
        locals: Vec<AstId>,
        states: Vec<AstId>,
    ) -> AstId {
        let locals = self.push(AstKind::ParserLocalElements { items: locals });
        let states = self.push(AstKind::ParserStates { items: states });
        self.push(AstKind::ParserDeclaration {
            proto,
            ctor_params,
            locals,
            states,
        })
    }

    /// `state name { stmts transition }`
    pub fn parser_state(
        &mut self,
        state_name: &str,
        stmts: Vec<AstId>,
        transition: Option<AstId>,
    ) -> AstId {
        let name = self.name(state_name);
        let stmts = self.push(AstKind::ParserStatements { items: stmts });
        self.push(AstKind::ParserState {
            name,
            stmts,
            transition,
        })
    }

    /// `transition name;`
    pub fn transition_to(&mut self, state_name: &str) -> AstId {
        let name = self.name(state_name);
        let expr = self.push(AstKind::StateExpression { expr: name });
        self.push(AstKind::TransitionStatement { stmt: expr })
    }

    /// `transition select (exprs) { cases }`
    pub fn transition_select(&mut self, exprs: Vec<AstId>, cases: Vec<AstId>) -> AstId {
        let exprs = self.push(AstKind::SimpleExpressionList { items: exprs });
        let cases = self.push(AstKind::SelectCaseList { items: cases });
        let select = self.push(AstKind::SelectExpression { exprs, cases });
        let expr = self.push(AstKind::StateExpression { expr: select });
        self.push(AstKind::TransitionStatement { stmt: expr })
    }

    /// `keyset : state;`
    pub fn select_case(&mut self, keyset: AstId, state_name: &str) -> AstId {
        let name = self.name(state_name);
        self.push(AstKind::SelectCase { keyset, name })
    }

    /// A single-expression keyset.
    pub fn simple_keyset(&mut self, expr: AstId) -> AstId {
        self.push(AstKind::SimpleKeysetExpression { expr })
    }

    /// `control Name(params)` prototype with an empty method list.
    pub fn control_type_decl(&mut self, control_name: &str, params: AstId) -> AstId {
        let name = self.name(control_name);
        let method_protos = self.push(AstKind::MethodPrototypes { items: Vec::new() });
        self.push(AstKind::ControlTypeDeclaration {
            name,
            params,
            method_protos,
        })
    }

    /// A control definition.
    pub fn control_decl(
        &mut self,
        proto: AstId,
        ctor_params: Option<AstId>,
        locals: Vec<AstId>,
        apply_stmt: AstId,
    ) -> AstId {
        let locals = self.push(AstKind::ControlLocalDeclarations { items: locals });
        self.push(AstKind::ControlDeclaration {
            proto,
            ctor_params,
            locals,
            apply_stmt,
        })
    }

    /// `package Name(params);`
    pub fn package_decl(&mut self, package_name: &str, params: AstId) -> AstId {
        let name = self.name(package_name);
        self.push(AstKind::PackageTypeDeclaration { name, params })
    }

    /// `table name { properties }`
    pub fn table_decl(&mut self, table_name: &str, props: Vec<AstId>) -> AstId {
        let name = self.name(table_name);
        let props = self.push(AstKind::TablePropertyList { items: props });
        let method_protos = self.push(AstKind::MethodPrototypes { items: Vec::new() });
        self.push(AstKind::TableDeclaration {
            name,
            props,
            method_protos,
        })
    }

    /// `action name(params) { body }`
    pub fn action_decl(&mut self, action_name: &str, params: AstId, body: AstId) -> AstId {
        let name = self.name(action_name);
        self.push(AstKind::ActionDeclaration { name, params, body })
    }

    /// `T name;` or `T name = init;`
    pub fn var_decl(&mut self, ty: AstId, var_name: &str, init: Option<AstId>) -> AstId {
        let name = self.name(var_name);
        self.push(AstKind::VariableDeclaration {
            ty,
            name,
            init,
            is_const: false,
        })
    }

    /// `const T name = init;`
    pub fn const_decl(&mut self, ty: AstId, var_name: &str, init: AstId) -> AstId {
        let name = self.name(var_name);
        self.push(AstKind::VariableDeclaration {
            ty,
            name,
            init: Some(init),
            is_const: true,
        })
    }

    /// `Type(args) name;`
    pub fn instantiation(&mut self, ty: AstId, args: Vec<AstId>, inst_name: &str) -> AstId {
        let name = self.name(inst_name);
        let args = self.push(AstKind::ArgumentList { items: args });
        self.push(AstKind::Instantiation { name, ty, args })
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    /// `{ stmts }`
    pub fn block(&mut self, stmts: Vec<AstId>) -> AstId {
        let stmts = self.push(AstKind::StatementOrDeclList { items: stmts });
        self.push(AstKind::BlockStatement { stmts })
    }

    /// `lhs = rhs;`
    pub fn assign(&mut self, lhs: AstId, rhs: AstId) -> AstId {
        self.push(AstKind::AssignmentStatement { lhs, rhs })
    }

    /// `return;` or `return expr;`
    pub fn return_stmt(&mut self, expr: Option<AstId>) -> AstId {
        self.push(AstKind::ReturnStatement { expr })
    }

    /// `if (cond) then_stmt else else_stmt`
    pub fn if_stmt(&mut self, cond: AstId, then_stmt: AstId, else_stmt: Option<AstId>) -> AstId {
        self.push(AstKind::ConditionalStatement {
            cond,
            then_stmt,
            else_stmt,
        })
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    /// `left op right`
    pub fn binary(&mut self, op: AstOp, left: AstId, right: AstId) -> AstId {
        self.push(AstKind::BinaryExpression { op, left, right })
    }

    /// `op operand`
    pub fn unary(&mut self, op: AstOp, operand: AstId) -> AstId {
        self.push(AstKind::UnaryExpression { op, operand })
    }

    /// `callee(args)`
    pub fn call(&mut self, callee: AstId, args: Vec<AstId>) -> AstId {
        let args = self.push(AstKind::ArgumentList { items: args });
        self.push(AstKind::FunctionCall { callee, args })
    }

    /// `lhs.member`
    pub fn member(&mut self, lhs: AstId, member_name: &str) -> AstId {
        let name = self.name(member_name);
        self.push(AstKind::MemberSelector { lhs, name })
    }

    /// `(T) expr`
    pub fn cast(&mut self, ty: AstId, expr: AstId) -> AstId {
        self.push(AstKind::CastExpression { ty, expr })
    }

    /// `lhs[index]`
    pub fn subscript(&mut self, lhs: AstId, index: AstId) -> AstId {
        self.push(AstKind::ArraySubscript { lhs, index })
    }

    /// `{ e1, e2, ... }`
    pub fn expr_list(&mut self, items: Vec<AstId>) -> AstId {
        self.push(AstKind::ExpressionList { items })
    }

    // ------------------------------------------------------------------
    // Program assembly
    // ------------------------------------------------------------------

    /// Builds the `p4program` root over the given top-level declarations
    /// and finishes the arena.
    pub fn program(mut self, decls: Vec<AstId>) -> Ast {
        let decls = self.push(AstKind::DeclarationList { items: decls });
        let root = self.push(AstKind::P4Program { decls });
        self.finish(root)
    }
}
