//! AST node kinds and the node arena.
//!
//! The tree is stored as a flat arena of [`AstNode`]s addressed by [`AstId`]
//! indices. An `AstId` is the stable node identity that every analysis map
//! is keyed by. Child links are `AstId`s inside the [`AstKind`] payloads;
//! list forms own an ordered `Vec<AstId>` of their elements.
//!
//! The kind set mirrors the P4 surface grammar: program forms, parsers,
//! controls, externs, type syntax, statements, table properties, variables,
//! and expressions.

use crate::ast::SourceLoc;
use smol_str::SmolStr;

/// Unique identifier for an AST node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AstId(usize);

impl AstId {
    /// Creates a new node ID.
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    pub fn as_usize(self) -> usize {
        self.0
    }
}

/// Direction of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamDirection {
    /// No direction keyword.
    #[default]
    None,
    /// `in` parameter.
    In,
    /// `out` parameter.
    Out,
    /// `inout` parameter.
    InOut,
}

/// Operator of a unary or binary expression.
///
/// `lexeme()` yields the source spelling, which doubles as the key under
/// which the built-in operator overloads are bound in the root scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AstOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Neg,
    // Logical
    And,
    Or,
    Not,
    // Relational
    Eq,
    NotEq,
    Less,
    Greater,
    LessEq,
    GreaterEq,
    // Bitwise
    BitAnd,
    BitOr,
    BitXor,
    BitNot,
    Shl,
    Shr,
    // Keyset mask
    Mask,
}

impl AstOp {
    /// The source spelling of the operator.
    ///
    /// Unary minus shares the `-` spelling with subtraction; the two are
    /// distinguished by operand count when overloads are resolved.
    pub fn lexeme(self) -> &'static str {
        match self {
            AstOp::Add => "+",
            AstOp::Sub | AstOp::Neg => "-",
            AstOp::Mul => "*",
            AstOp::Div => "/",
            AstOp::And => "&&",
            AstOp::Or => "||",
            AstOp::Not => "!",
            AstOp::Eq => "==",
            AstOp::NotEq => "!=",
            AstOp::Less => "<",
            AstOp::Greater => ">",
            AstOp::LessEq => "<=",
            AstOp::GreaterEq => ">=",
            AstOp::BitAnd => "&",
            AstOp::BitOr => "|",
            AstOp::BitXor => "^",
            AstOp::BitNot => "~",
            AstOp::Shl => "<<",
            AstOp::Shr => ">>",
            AstOp::Mask => "&&&",
        }
    }
}

/// The tagged sum of P4 syntactic forms.
#[derive(Debug, Clone, PartialEq)]
pub enum AstKind {
    // ========================================================================
    // Program
    // ========================================================================
    /// Root of a compilation unit.
    P4Program { decls: AstId },
    /// Ordered top-level declarations.
    DeclarationList { items: Vec<AstId> },
    /// An identifier occurrence: declaration name, reference, or member.
    Name { strname: SmolStr },
    /// Ordered formal parameters.
    ParameterList { items: Vec<AstId> },
    /// A formal parameter.
    Parameter {
        direction: ParamDirection,
        name: AstId,
        ty: AstId,
        init: Option<AstId>,
    },
    /// `package Name(params);`
    PackageTypeDeclaration { name: AstId, params: AstId },
    /// `Type(args) name;`
    Instantiation { name: AstId, ty: AstId, args: AstId },

    // ========================================================================
    // Parser
    // ========================================================================
    /// A parser definition: prototype, constructor parameters, locals, states.
    ParserDeclaration {
        proto: AstId,
        ctor_params: Option<AstId>,
        locals: AstId,
        states: AstId,
    },
    /// `parser Name(params)` prototype; `method_protos` receives the
    /// synthesized `apply`.
    ParserTypeDeclaration {
        name: AstId,
        params: AstId,
        method_protos: AstId,
    },
    /// Local declarations of a parser body.
    ParserLocalElements { items: Vec<AstId> },
    /// Ordered parser states.
    ParserStates { items: Vec<AstId> },
    /// `state name { stmts transition }`
    ParserState {
        name: AstId,
        stmts: AstId,
        transition: Option<AstId>,
    },
    /// Ordered statements of a state body.
    ParserStatements { items: Vec<AstId> },
    /// A nested block inside a state.
    ParserBlockStatement { stmts: AstId },
    /// `transition <state-expression>;`
    TransitionStatement { stmt: AstId },
    /// Target of a transition: a state name or a select expression.
    StateExpression { expr: AstId },
    /// `select (exprs) { cases }`
    SelectExpression { exprs: AstId, cases: AstId },
    /// Ordered select cases.
    SelectCaseList { items: Vec<AstId> },
    /// `keyset : name;`
    SelectCase { keyset: AstId, name: AstId },
    /// `(k1, k2, ...)` keyset.
    TupleKeysetExpression { exprs: AstId },
    /// A single-expression keyset.
    SimpleKeysetExpression { expr: AstId },
    /// Ordered keyset element expressions.
    SimpleExpressionList { items: Vec<AstId> },

    // ========================================================================
    // Control
    // ========================================================================
    /// A control definition: prototype, constructor parameters, locals, body.
    ControlDeclaration {
        proto: AstId,
        ctor_params: Option<AstId>,
        locals: AstId,
        apply_stmt: AstId,
    },
    /// `control Name(params)` prototype.
    ControlTypeDeclaration {
        name: AstId,
        params: AstId,
        method_protos: AstId,
    },
    /// Local declarations of a control body.
    ControlLocalDeclarations { items: Vec<AstId> },

    // ========================================================================
    // Extern
    // ========================================================================
    /// `extern Name { methods }`
    ExternTypeDeclaration { name: AstId, method_protos: AstId },
    /// Ordered method prototypes.
    MethodPrototypes { items: Vec<AstId> },
    /// `ret name(params);` — `return_type` is `None` for constructors,
    /// whose name equals the enclosing extern's.
    FunctionPrototype {
        return_type: Option<AstId>,
        name: AstId,
        params: AstId,
    },

    // ========================================================================
    // Type syntax
    // ========================================================================
    /// A reference to a type, wrapping exactly one type form.
    TypeRef { ty: AstId },
    /// `tuple<T1, T2, ...>`
    TupleType { type_args: AstId },
    /// `T[size]`
    HeaderStackType { ty: AstId, size: AstId },
    /// `bool`
    BaseTypeBool { name: AstId },
    /// `int` or `int<N>`
    BaseTypeInteger { name: AstId, size: Option<AstId> },
    /// `bit` or `bit<N>`
    BaseTypeBit { name: AstId, size: Option<AstId> },
    /// `varbit<N>`
    BaseTypeVarbit { name: AstId, size: AstId },
    /// `string`
    BaseTypeString { name: AstId },
    /// `void`
    BaseTypeVoid { name: AstId },
    /// `error`
    BaseTypeError { name: AstId },
    /// The `<N>` width argument of a sized base type.
    IntegerTypeSize { size: AstId },
    /// Ordered type arguments.
    TypeArgumentList { items: Vec<AstId> },
    /// `header Name { fields }`
    HeaderTypeDeclaration { name: AstId, fields: AstId },
    /// `header_union Name { fields }`
    HeaderUnionDeclaration { name: AstId, fields: AstId },
    /// `struct Name { fields }`
    StructTypeDeclaration { name: AstId, fields: AstId },
    /// Ordered record fields.
    StructFieldList { items: Vec<AstId> },
    /// `T name;` inside a record.
    StructField { ty: AstId, name: AstId },
    /// `enum Name { members }`
    EnumDeclaration {
        type_size: Option<AstId>,
        name: AstId,
        fields: AstId,
    },
    /// `error { ids }` — members accumulate into the built-in `error` type.
    ErrorDeclaration { fields: AstId },
    /// `match_kind { ids }` — members accumulate into the built-in
    /// `match_kind` type.
    MatchKindDeclaration { fields: AstId },
    /// Ordered plain identifiers.
    IdentifierList { items: Vec<AstId> },
    /// Ordered enum members.
    SpecifiedIdentifierList { items: Vec<AstId> },
    /// An enum member, optionally with an initializer.
    SpecifiedIdentifier { name: AstId, init: Option<AstId> },
    /// `typedef T Name;`
    TypedefDeclaration { type_ref: AstId, name: AstId },

    // ========================================================================
    // Statements
    // ========================================================================
    /// `lhs = rhs;`
    AssignmentStatement { lhs: AstId, rhs: AstId },
    /// `;`
    EmptyStatement,
    /// `return;` or `return expr;`
    ReturnStatement { expr: Option<AstId> },
    /// `exit;`
    ExitStatement,
    /// `if (cond) stmt else stmt`
    ConditionalStatement {
        cond: AstId,
        then_stmt: AstId,
        else_stmt: Option<AstId>,
    },
    /// `Type.apply(args);`
    DirectApplication { name: AstId, args: AstId },
    /// `{ stmts }`
    BlockStatement { stmts: AstId },
    /// Ordered statements or local declarations.
    StatementOrDeclList { items: Vec<AstId> },
    /// `switch (expr) { cases }`
    SwitchStatement { expr: AstId, cases: AstId },
    /// Ordered switch cases.
    SwitchCases { items: Vec<AstId> },
    /// `label : stmt` — a fall-through case has no statement.
    SwitchCase { label: AstId, stmt: Option<AstId> },
    /// A switch label: a name or `default`.
    SwitchLabel { label: AstId },

    // ========================================================================
    // Tables
    // ========================================================================
    /// `table name { properties }`
    TableDeclaration {
        name: AstId,
        props: AstId,
        method_protos: AstId,
    },
    /// Ordered table properties.
    TablePropertyList { items: Vec<AstId> },
    /// `key = { elements }`
    KeyProperty { keys: AstId },
    /// Ordered key elements.
    KeyElementList { items: Vec<AstId> },
    /// `expr : match_kind;`
    KeyElement { expr: AstId, match_kind: AstId },
    /// `actions = { refs }`
    ActionsProperty { actions: AstId },
    /// Ordered action references.
    ActionList { items: Vec<AstId> },
    /// A reference to an action, optionally with bound arguments.
    ActionRef { name: AstId, args: Option<AstId> },
    /// `entries = { entry* }`
    EntriesProperty { entries: AstId },
    /// Ordered constant entries.
    EntriesList { items: Vec<AstId> },
    /// `keyset : action;`
    Entry { keyset: AstId, action: AstId },
    /// `name = expr;` or `const name = expr;` table property.
    SimpleProperty {
        name: AstId,
        init: AstId,
        is_const: bool,
    },
    /// `action name(params) { body }`
    ActionDeclaration {
        name: AstId,
        params: AstId,
        body: AstId,
    },

    // ========================================================================
    // Variables
    // ========================================================================
    /// `T name;`, `T name = init;`, or the `const` forms.
    VariableDeclaration {
        ty: AstId,
        name: AstId,
        init: Option<AstId>,
        is_const: bool,
    },

    // ========================================================================
    // Expressions
    // ========================================================================
    /// A function definition: prototype plus body block.
    FunctionDeclaration { proto: AstId, body: AstId },
    /// Ordered call arguments.
    ArgumentList { items: Vec<AstId> },
    /// `{ e1, e2, ... }` — also the initializer form for record values.
    ExpressionList { items: Vec<AstId> },
    /// `left op right`
    BinaryExpression { op: AstOp, left: AstId, right: AstId },
    /// `op operand`
    UnaryExpression { op: AstOp, operand: AstId },
    /// `callee(args)`
    FunctionCall { callee: AstId, args: AstId },
    /// `lhs.name`
    MemberSelector { lhs: AstId, name: AstId },
    /// `(T) expr`
    CastExpression { ty: AstId, expr: AstId },
    /// `lhs[index]`
    ArraySubscript { lhs: AstId, index: AstId },
    /// `start : end` bit-slice bounds inside a subscript.
    IndexExpression { start: AstId, end: Option<AstId> },
    /// An integer literal; `width` is nonzero for `Nw`/`Ns` prefixed forms.
    IntegerLiteral {
        is_signed: bool,
        width: u32,
        value: i64,
    },
    /// `true` or `false`.
    BooleanLiteral { value: bool },
    /// A quoted string.
    StringLiteral { value: SmolStr },
    /// `_`
    Dontcare,
    /// `default`
    Default,
}

/// A node: a kind plus the source coordinates the parser stamped it with.
#[derive(Debug, Clone, PartialEq)]
pub struct AstNode {
    pub kind: AstKind,
    pub loc: SourceLoc,
}

/// The node arena holding one parsed compilation unit.
///
/// Nodes are appended during parsing and during built-in method injection;
/// all later passes treat the tree as immutable and address nodes by id.
#[derive(Debug, Clone, Default)]
pub struct Ast {
    nodes: Vec<AstNode>,
    root: Option<AstId>,
}

impl Ast {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a node, returning its id.
    pub fn push(&mut self, kind: AstKind, loc: SourceLoc) -> AstId {
        let id = AstId(self.nodes.len());
        self.nodes.push(AstNode { kind, loc });
        id
    }

    /// Marks the root `P4Program` node.
    pub fn set_root(&mut self, root: AstId) {
        debug_assert!(matches!(self.kind(root), AstKind::P4Program { .. }));
        self.root = Some(root);
    }

    /// The root `P4Program` node, if one has been set.
    pub fn root(&self) -> Option<AstId> {
        self.root
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the arena holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Borrows a node.
    pub fn node(&self, id: AstId) -> &AstNode {
        &self.nodes[id.0]
    }

    /// Borrows a node's kind.
    pub fn kind(&self, id: AstId) -> &AstKind {
        &self.nodes[id.0].kind
    }

    /// Mutably borrows a node's kind. Only the built-in method injection
    /// pass may use this; the tree is frozen afterwards.
    pub(crate) fn kind_mut(&mut self, id: AstId) -> &mut AstKind {
        &mut self.nodes[id.0].kind
    }

    /// A node's source coordinates.
    pub fn loc(&self, id: AstId) -> SourceLoc {
        self.nodes[id.0].loc
    }

    /// The identifier text of a `Name` node.
    ///
    /// Panics if `id` is not a `Name`; callers dispatch on kind first.
    pub fn name_str(&self, id: AstId) -> &SmolStr {
        match self.kind(id) {
            AstKind::Name { strname } => strname,
            other => panic!("expected Name node, found {:?}", other),
        }
    }

    /// The ordered elements of a list-form node.
    ///
    /// Panics if `id` is not one of the list kinds.
    pub fn list(&self, id: AstId) -> &[AstId] {
        match self.kind(id) {
            AstKind::DeclarationList { items }
            | AstKind::ParameterList { items }
            | AstKind::ParserLocalElements { items }
            | AstKind::ParserStates { items }
            | AstKind::ParserStatements { items }
            | AstKind::SelectCaseList { items }
            | AstKind::SimpleExpressionList { items }
            | AstKind::ControlLocalDeclarations { items }
            | AstKind::MethodPrototypes { items }
            | AstKind::TypeArgumentList { items }
            | AstKind::StructFieldList { items }
            | AstKind::IdentifierList { items }
            | AstKind::SpecifiedIdentifierList { items }
            | AstKind::StatementOrDeclList { items }
            | AstKind::SwitchCases { items }
            | AstKind::TablePropertyList { items }
            | AstKind::KeyElementList { items }
            | AstKind::ActionList { items }
            | AstKind::EntriesList { items }
            | AstKind::ArgumentList { items }
            | AstKind::ExpressionList { items } => items,
            other => panic!("expected list node, found {:?}", other),
        }
    }

    /// The constant value of an integer literal, unwrapping the
    /// `IntegerTypeSize` width form.
    pub fn integer_value(&self, id: AstId) -> Option<i64> {
        match self.kind(id) {
            AstKind::IntegerLiteral { value, .. } => Some(*value),
            AstKind::IntegerTypeSize { size } => self.integer_value(*size),
            _ => None,
        }
    }

    /// Ordered children of a node, in source order.
    ///
    /// This is the single traversal surface the pre-order walker and the
    /// deep-clone operation are built on.
    pub fn children(&self, id: AstId) -> Vec<AstId> {
        fn opt(out: &mut Vec<AstId>, id: Option<AstId>) {
            if let Some(id) = id {
                out.push(id);
            }
        }

        let mut out = Vec::new();
        match self.kind(id) {
            AstKind::P4Program { decls } => out.push(*decls),
            AstKind::DeclarationList { items }
            | AstKind::ParameterList { items }
            | AstKind::ParserLocalElements { items }
            | AstKind::ParserStates { items }
            | AstKind::ParserStatements { items }
            | AstKind::SelectCaseList { items }
            | AstKind::SimpleExpressionList { items }
            | AstKind::ControlLocalDeclarations { items }
            | AstKind::MethodPrototypes { items }
            | AstKind::TypeArgumentList { items }
            | AstKind::StructFieldList { items }
            | AstKind::IdentifierList { items }
            | AstKind::SpecifiedIdentifierList { items }
            | AstKind::StatementOrDeclList { items }
            | AstKind::SwitchCases { items }
            | AstKind::TablePropertyList { items }
            | AstKind::KeyElementList { items }
            | AstKind::ActionList { items }
            | AstKind::EntriesList { items }
            | AstKind::ArgumentList { items }
            | AstKind::ExpressionList { items } => out.extend_from_slice(items),
            AstKind::Name { .. }
            | AstKind::EmptyStatement
            | AstKind::ExitStatement
            | AstKind::IntegerLiteral { .. }
            | AstKind::BooleanLiteral { .. }
            | AstKind::StringLiteral { .. }
            | AstKind::Dontcare
            | AstKind::Default => {}
            AstKind::Parameter {
                name, ty, init, ..
            } => {
                out.push(*name);
                out.push(*ty);
                opt(&mut out, *init);
            }
            AstKind::PackageTypeDeclaration { name, params } => {
                out.push(*name);
                out.push(*params);
            }
            AstKind::Instantiation { name, ty, args } => {
                out.push(*ty);
                out.push(*args);
                out.push(*name);
            }
            AstKind::ParserDeclaration {
                proto,
                ctor_params,
                locals,
                states,
            } => {
                out.push(*proto);
                opt(&mut out, *ctor_params);
                out.push(*locals);
                out.push(*states);
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
                out.push(*name);
                out.push(*params);
                out.push(*method_protos);
            }
            AstKind::ParserState {
                name,
                stmts,
                transition,
            } => {
                out.push(*name);
                out.push(*stmts);
                opt(&mut out, *transition);
            }
            AstKind::ParserBlockStatement { stmts } => out.push(*stmts),
            AstKind::TransitionStatement { stmt } => out.push(*stmt),
            AstKind::StateExpression { expr } => out.push(*expr),
            AstKind::SelectExpression { exprs, cases } => {
                out.push(*exprs);
                out.push(*cases);
            }
            AstKind::SelectCase { keyset, name } => {
                out.push(*keyset);
                out.push(*name);
            }
            AstKind::TupleKeysetExpression { exprs } => out.push(*exprs),
            AstKind::SimpleKeysetExpression { expr } => out.push(*expr),
            AstKind::ControlDeclaration {
                proto,
                ctor_params,
                locals,
                apply_stmt,
            } => {
                out.push(*proto);
                opt(&mut out, *ctor_params);
                out.push(*locals);
                out.push(*apply_stmt);
            }
            AstKind::ExternTypeDeclaration {
                name,
                method_protos,
            } => {
                out.push(*name);
                out.push(*method_protos);
            }
            AstKind::FunctionPrototype {
                return_type,
                name,
                params,
            } => {
                opt(&mut out, *return_type);
                out.push(*name);
                out.push(*params);
            }
            AstKind::TypeRef { ty } => out.push(*ty),
            AstKind::TupleType { type_args } => out.push(*type_args),
            AstKind::HeaderStackType { ty, size } => {
                out.push(*ty);
                out.push(*size);
            }
            AstKind::BaseTypeBool { name }
            | AstKind::BaseTypeString { name }
            | AstKind::BaseTypeVoid { name }
            | AstKind::BaseTypeError { name } => out.push(*name),
            AstKind::BaseTypeInteger { name, size } | AstKind::BaseTypeBit { name, size } => {
                out.push(*name);
                opt(&mut out, *size);
            }
            AstKind::BaseTypeVarbit { name, size } => {
                out.push(*name);
                out.push(*size);
            }
            AstKind::IntegerTypeSize { size } => out.push(*size),
            AstKind::HeaderTypeDeclaration { name, fields }
            | AstKind::HeaderUnionDeclaration { name, fields }
            | AstKind::StructTypeDeclaration { name, fields } => {
                out.push(*name);
                out.push(*fields);
            }
            AstKind::StructField { ty, name } => {
                out.push(*ty);
                out.push(*name);
            }
            AstKind::EnumDeclaration {
                type_size,
                name,
                fields,
            } => {
                opt(&mut out, *type_size);
                out.push(*name);
                out.push(*fields);
            }
            AstKind::ErrorDeclaration { fields } | AstKind::MatchKindDeclaration { fields } => {
                out.push(*fields)
            }
            AstKind::SpecifiedIdentifier { name, init } => {
                out.push(*name);
                opt(&mut out, *init);
            }
            AstKind::TypedefDeclaration { type_ref, name } => {
                out.push(*type_ref);
                out.push(*name);
            }
            AstKind::AssignmentStatement { lhs, rhs } => {
                out.push(*lhs);
                out.push(*rhs);
            }
            AstKind::ReturnStatement { expr } => opt(&mut out, *expr),
            AstKind::ConditionalStatement {
                cond,
                then_stmt,
                else_stmt,
            } => {
                out.push(*cond);
                out.push(*then_stmt);
                opt(&mut out, *else_stmt);
            }
            AstKind::DirectApplication { name, args } => {
                out.push(*name);
                out.push(*args);
            }
            AstKind::BlockStatement { stmts } => out.push(*stmts),
            AstKind::SwitchStatement { expr, cases } => {
                out.push(*expr);
                out.push(*cases);
            }
            AstKind::SwitchCase { label, stmt } => {
                out.push(*label);
                opt(&mut out, *stmt);
            }
            AstKind::SwitchLabel { label } => out.push(*label),
            AstKind::TableDeclaration {
                name,
                props,
                method_protos,
            } => {
                out.push(*name);
                out.push(*props);
                out.push(*method_protos);
            }
            AstKind::KeyProperty { keys } => out.push(*keys),
            AstKind::KeyElement { expr, match_kind } => {
                out.push(*expr);
                out.push(*match_kind);
            }
            AstKind::ActionsProperty { actions } => out.push(*actions),
            AstKind::ActionRef { name, args } => {
                out.push(*name);
                opt(&mut out, *args);
            }
            AstKind::EntriesProperty { entries } => out.push(*entries),
            AstKind::Entry { keyset, action } => {
                out.push(*keyset);
                out.push(*action);
            }
            AstKind::SimpleProperty { name, init, .. } => {
                out.push(*name);
                out.push(*init);
            }
            AstKind::ActionDeclaration { name, params, body } => {
                out.push(*name);
                out.push(*params);
                out.push(*body);
            }
            AstKind::VariableDeclaration {
                ty, name, init, ..
            } => {
                out.push(*ty);
                out.push(*name);
                opt(&mut out, *init);
            }
            AstKind::FunctionDeclaration { proto, body } => {
                out.push(*proto);
                out.push(*body);
            }
            AstKind::BinaryExpression { left, right, .. } => {
                out.push(*left);
                out.push(*right);
            }
            AstKind::UnaryExpression { operand, .. } => out.push(*operand),
            AstKind::FunctionCall { callee, args } => {
                out.push(*callee);
                out.push(*args);
            }
            AstKind::MemberSelector { lhs, name } => {
                out.push(*lhs);
                out.push(*name);
            }
            AstKind::CastExpression { ty, expr } => {
                out.push(*ty);
                out.push(*expr);
            }
            AstKind::ArraySubscript { lhs, index } => {
                out.push(*lhs);
                out.push(*index);
            }
            AstKind::IndexExpression { start, end } => {
                out.push(*start);
                opt(&mut out, *end);
            }
        }
        out
    }

    /// Recursively copies the subtree rooted at `id`, returning the fresh
    /// root. The copy shares no node with the original, so later annotation
    /// of either side cannot alias the other.
    pub fn deep_clone(&mut self, id: AstId) -> AstId {
        let loc = self.loc(id);
        let kind = self.kind(id).clone();
        let kind = self.clone_kind(kind);
        self.push(kind, loc)
    }

    fn clone_opt(&mut self, id: Option<AstId>) -> Option<AstId> {
        id.map(|id| self.deep_clone(id))
    }

    fn clone_vec(&mut self, items: Vec<AstId>) -> Vec<AstId> {
        items.into_iter().map(|id| self.deep_clone(id)).collect()
    }

    fn clone_kind(&mut self, kind: AstKind) -> AstKind {
        match kind {
            AstKind::P4Program { decls } => AstKind::P4Program {
                decls: self.deep_clone(decls),
            },
            AstKind::DeclarationList { items } => AstKind::DeclarationList {
                items: self.clone_vec(items),
            },
            AstKind::Name { strname } => AstKind::Name { strname },
            AstKind::ParameterList { items } => AstKind::ParameterList {
                items: self.clone_vec(items),
            },
            AstKind::Parameter {
                direction,
                name,
                ty,
                init,
            } => AstKind::Parameter {
                direction,
                name: self.deep_clone(name),
                ty: self.deep_clone(ty),
                init: self.clone_opt(init),
            },
            AstKind::PackageTypeDeclaration { name, params } => AstKind::PackageTypeDeclaration {
                name: self.deep_clone(name),
                params: self.deep_clone(params),
            },
            AstKind::Instantiation { name, ty, args } => AstKind::Instantiation {
                name: self.deep_clone(name),
                ty: self.deep_clone(ty),
                args: self.deep_clone(args),
            },
            AstKind::ParserDeclaration {
                proto,
                ctor_params,
                locals,
                states,
            } => AstKind::ParserDeclaration {
                proto: self.deep_clone(proto),
                ctor_params: self.clone_opt(ctor_params),
                locals: self.deep_clone(locals),
                states: self.deep_clone(states),
            },
            AstKind::ParserTypeDeclaration {
                name,
                params,
                method_protos,
            } => AstKind::ParserTypeDeclaration {
                name: self.deep_clone(name),
                params: self.deep_clone(params),
                method_protos: self.deep_clone(method_protos),
            },
            AstKind::ParserLocalElements { items } => AstKind::ParserLocalElements {
                items: self.clone_vec(items),
            },
            AstKind::ParserStates { items } => AstKind::ParserStates {
                items: self.clone_vec(items),
            },
            AstKind::ParserState {
                name,
                stmts,
                transition,
            } => AstKind::ParserState {
                name: self.deep_clone(name),
                stmts: self.deep_clone(stmts),
                transition: self.clone_opt(transition),
            },
            AstKind::ParserStatements { items } => AstKind::ParserStatements {
                items: self.clone_vec(items),
            },
            AstKind::ParserBlockStatement { stmts } => AstKind::ParserBlockStatement {
                stmts: self.deep_clone(stmts),
            },
            AstKind::TransitionStatement { stmt } => AstKind::TransitionStatement {
                stmt: self.deep_clone(stmt),
            },
            AstKind::StateExpression { expr } => AstKind::StateExpression {
                expr: self.deep_clone(expr),
            },
            AstKind::SelectExpression { exprs, cases } => AstKind::SelectExpression {
                exprs: self.deep_clone(exprs),
                cases: self.deep_clone(cases),
            },
            AstKind::SelectCaseList { items } => AstKind::SelectCaseList {
                items: self.clone_vec(items),
            },
            AstKind::SelectCase { keyset, name } => AstKind::SelectCase {
                keyset: self.deep_clone(keyset),
                name: self.deep_clone(name),
            },
            AstKind::TupleKeysetExpression { exprs } => AstKind::TupleKeysetExpression {
                exprs: self.deep_clone(exprs),
            },
            AstKind::SimpleKeysetExpression { expr } => AstKind::SimpleKeysetExpression {
                expr: self.deep_clone(expr),
            },
            AstKind::SimpleExpressionList { items } => AstKind::SimpleExpressionList {
                items: self.clone_vec(items),
            },
            AstKind::ControlDeclaration {
                proto,
                ctor_params,
                locals,
                apply_stmt,
            } => AstKind::ControlDeclaration {
                proto: self.deep_clone(proto),
                ctor_params: self.clone_opt(ctor_params),
                locals: self.deep_clone(locals),
                apply_stmt: self.deep_clone(apply_stmt),
            },
            AstKind::ControlTypeDeclaration {
                name,
                params,
                method_protos,
            } => AstKind::ControlTypeDeclaration {
                name: self.deep_clone(name),
                params: self.deep_clone(params),
                method_protos: self.deep_clone(method_protos),
            },
            AstKind::ControlLocalDeclarations { items } => AstKind::ControlLocalDeclarations {
                items: self.clone_vec(items),
            },
            AstKind::ExternTypeDeclaration {
                name,
                method_protos,
            } => AstKind::ExternTypeDeclaration {
                name: self.deep_clone(name),
                method_protos: self.deep_clone(method_protos),
            },
            AstKind::MethodPrototypes { items } => AstKind::MethodPrototypes {
                items: self.clone_vec(items),
            },
            AstKind::FunctionPrototype {
                return_type,
                name,
                params,
            } => AstKind::FunctionPrototype {
                return_type: self.clone_opt(return_type),
                name: self.deep_clone(name),
                params: self.deep_clone(params),
            },
            AstKind::TypeRef { ty } => AstKind::TypeRef {
                ty: self.deep_clone(ty),
            },
            AstKind::TupleType { type_args } => AstKind::TupleType {
                type_args: self.deep_clone(type_args),
            },
            AstKind::HeaderStackType { ty, size } => AstKind::HeaderStackType {
                ty: self.deep_clone(ty),
                size: self.deep_clone(size),
            },
            AstKind::BaseTypeBool { name } => AstKind::BaseTypeBool {
                name: self.deep_clone(name),
            },
            AstKind::BaseTypeInteger { name, size } => AstKind::BaseTypeInteger {
                name: self.deep_clone(name),
                size: self.clone_opt(size),
            },
            AstKind::BaseTypeBit { name, size } => AstKind::BaseTypeBit {
                name: self.deep_clone(name),
                size: self.clone_opt(size),
            },
            AstKind::BaseTypeVarbit { name, size } => AstKind::BaseTypeVarbit {
                name: self.deep_clone(name),
                size: self.deep_clone(size),
            },
            AstKind::BaseTypeString { name } => AstKind::BaseTypeString {
                name: self.deep_clone(name),
            },
            AstKind::BaseTypeVoid { name } => AstKind::BaseTypeVoid {
                name: self.deep_clone(name),
            },
            AstKind::BaseTypeError { name } => AstKind::BaseTypeError {
                name: self.deep_clone(name),
            },
            AstKind::IntegerTypeSize { size } => AstKind::IntegerTypeSize {
                size: self.deep_clone(size),
            },
            AstKind::TypeArgumentList { items } => AstKind::TypeArgumentList {
                items: self.clone_vec(items),
            },
            AstKind::HeaderTypeDeclaration { name, fields } => AstKind::HeaderTypeDeclaration {
                name: self.deep_clone(name),
                fields: self.deep_clone(fields),
            },
            AstKind::HeaderUnionDeclaration { name, fields } => AstKind::HeaderUnionDeclaration {
                name: self.deep_clone(name),
                fields: self.deep_clone(fields),
            },
            AstKind::StructTypeDeclaration { name, fields } => AstKind::StructTypeDeclaration {
                name: self.deep_clone(name),
                fields: self.deep_clone(fields),
            },
            AstKind::StructFieldList { items } => AstKind::StructFieldList {
                items: self.clone_vec(items),
            },
            AstKind::StructField { ty, name } => AstKind::StructField {
                ty: self.deep_clone(ty),
                name: self.deep_clone(name),
            },
            AstKind::EnumDeclaration {
                type_size,
                name,
                fields,
            } => AstKind::EnumDeclaration {
                type_size: self.clone_opt(type_size),
                name: self.deep_clone(name),
                fields: self.deep_clone(fields),
            },
            AstKind::ErrorDeclaration { fields } => AstKind::ErrorDeclaration {
                fields: self.deep_clone(fields),
            },
            AstKind::MatchKindDeclaration { fields } => AstKind::MatchKindDeclaration {
                fields: self.deep_clone(fields),
            },
            AstKind::IdentifierList { items } => AstKind::IdentifierList {
                items: self.clone_vec(items),
            },
            AstKind::SpecifiedIdentifierList { items } => AstKind::SpecifiedIdentifierList {
                items: self.clone_vec(items),
            },
            AstKind::SpecifiedIdentifier { name, init } => AstKind::SpecifiedIdentifier {
                name: self.deep_clone(name),
                init: self.clone_opt(init),
            },
            AstKind::TypedefDeclaration { type_ref, name } => AstKind::TypedefDeclaration {
                type_ref: self.deep_clone(type_ref),
                name: self.deep_clone(name),
            },
            AstKind::AssignmentStatement { lhs, rhs } => AstKind::AssignmentStatement {
                lhs: self.deep_clone(lhs),
                rhs: self.deep_clone(rhs),
            },
            AstKind::EmptyStatement => AstKind::EmptyStatement,
            AstKind::ReturnStatement { expr } => AstKind::ReturnStatement {
                expr: self.clone_opt(expr),
            },
            AstKind::ExitStatement => AstKind::ExitStatement,
            AstKind::ConditionalStatement {
                cond,
                then_stmt,
                else_stmt,
            } => AstKind::ConditionalStatement {
                cond: self.deep_clone(cond),
                then_stmt: self.deep_clone(then_stmt),
                else_stmt: self.clone_opt(else_stmt),
            },
            AstKind::DirectApplication { name, args } => AstKind::DirectApplication {
                name: self.deep_clone(name),
                args: self.deep_clone(args),
            },
            AstKind::BlockStatement { stmts } => AstKind::BlockStatement {
                stmts: self.deep_clone(stmts),
            },
            AstKind::StatementOrDeclList { items } => AstKind::StatementOrDeclList {
                items: self.clone_vec(items),
            },
            AstKind::SwitchStatement { expr, cases } => AstKind::SwitchStatement {
                expr: self.deep_clone(expr),
                cases: self.deep_clone(cases),
            },
            AstKind::SwitchCases { items } => AstKind::SwitchCases {
                items: self.clone_vec(items),
            },
            AstKind::SwitchCase { label, stmt } => AstKind::SwitchCase {
                label: self.deep_clone(label),
                stmt: self.clone_opt(stmt),
            },
            AstKind::SwitchLabel { label } => AstKind::SwitchLabel {
                label: self.deep_clone(label),
            },
            AstKind::TableDeclaration {
                name,
                props,
                method_protos,
            } => AstKind::TableDeclaration {
                name: self.deep_clone(name),
                props: self.deep_clone(props),
                method_protos: self.deep_clone(method_protos),
            },
            AstKind::TablePropertyList { items } => AstKind::TablePropertyList {
                items: self.clone_vec(items),
            },
            AstKind::KeyProperty { keys } => AstKind::KeyProperty {
                keys: self.deep_clone(keys),
            },
            AstKind::KeyElementList { items } => AstKind::KeyElementList {
                items: self.clone_vec(items),
            },
            AstKind::KeyElement { expr, match_kind } => AstKind::KeyElement {
                expr: self.deep_clone(expr),
                match_kind: self.deep_clone(match_kind),
            },
            AstKind::ActionsProperty { actions } => AstKind::ActionsProperty {
                actions: self.deep_clone(actions),
            },
            AstKind::ActionList { items } => AstKind::ActionList {
                items: self.clone_vec(items),
            },
            AstKind::ActionRef { name, args } => AstKind::ActionRef {
                name: self.deep_clone(name),
                args: self.clone_opt(args),
            },
            AstKind::EntriesProperty { entries } => AstKind::EntriesProperty {
                entries: self.deep_clone(entries),
            },
            AstKind::EntriesList { items } => AstKind::EntriesList {
                items: self.clone_vec(items),
            },
            AstKind::Entry { keyset, action } => AstKind::Entry {
                keyset: self.deep_clone(keyset),
                action: self.deep_clone(action),
            },
            AstKind::SimpleProperty {
                name,
                init,
                is_const,
            } => AstKind::SimpleProperty {
                name: self.deep_clone(name),
                init: self.deep_clone(init),
                is_const,
            },
            AstKind::ActionDeclaration { name, params, body } => AstKind::ActionDeclaration {
                name: self.deep_clone(name),
                params: self.deep_clone(params),
                body: self.deep_clone(body),
            },
            AstKind::VariableDeclaration {
                ty,
                name,
                init,
                is_const,
            } => AstKind::VariableDeclaration {
                ty: self.deep_clone(ty),
                name: self.deep_clone(name),
                init: self.clone_opt(init),
                is_const,
            },
            AstKind::FunctionDeclaration { proto, body } => AstKind::FunctionDeclaration {
                proto: self.deep_clone(proto),
                body: self.deep_clone(body),
            },
            AstKind::ArgumentList { items } => AstKind::ArgumentList {
                items: self.clone_vec(items),
            },
            AstKind::ExpressionList { items } => AstKind::ExpressionList {
                items: self.clone_vec(items),
            },
            AstKind::BinaryExpression { op, left, right } => AstKind::BinaryExpression {
                op,
                left: self.deep_clone(left),
                right: self.deep_clone(right),
            },
            AstKind::UnaryExpression { op, operand } => AstKind::UnaryExpression {
                op,
                operand: self.deep_clone(operand),
            },
            AstKind::FunctionCall { callee, args } => AstKind::FunctionCall {
                callee: self.deep_clone(callee),
                args: self.deep_clone(args),
            },
            AstKind::MemberSelector { lhs, name } => AstKind::MemberSelector {
                lhs: self.deep_clone(lhs),
                name: self.deep_clone(name),
            },
            AstKind::CastExpression { ty, expr } => AstKind::CastExpression {
                ty: self.deep_clone(ty),
                expr: self.deep_clone(expr),
            },
            AstKind::ArraySubscript { lhs, index } => AstKind::ArraySubscript {
                lhs: self.deep_clone(lhs),
                index: self.deep_clone(index),
            },
            AstKind::IndexExpression { start, end } => AstKind::IndexExpression {
                start: self.deep_clone(start),
                end: self.clone_opt(end),
            },
            AstKind::IntegerLiteral {
                is_signed,
                width,
                value,
            } => AstKind::IntegerLiteral {
                is_signed,
                width,
                value,
            },
            AstKind::BooleanLiteral { value } => AstKind::BooleanLiteral { value },
            AstKind::StringLiteral { value } => AstKind::StringLiteral { value },
            AstKind::Dontcare => AstKind::Dontcare,
            AstKind::Default => AstKind::Default,
        }
    }
}
