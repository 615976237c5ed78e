//! Symbol table: lexical scopes, namespaces, and name declarations.
//!
//! A P4 scope carries three disjoint namespaces. Within one scope a name
//! maps, per namespace, to a singly linked chain of declarations; a chain
//! longer than one is the canonical signal that the name is shadowed or
//! ambiguous there, consumed by the type-resolution sweep.

use crate::ast::AstId;
use crate::ir::type_table::TypeId;
use smol_str::SmolStr;
use std::collections::HashMap;

/// Unique identifier for a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

impl ScopeId {
    /// Creates a new scope ID.
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    pub fn as_usize(self) -> usize {
        self.0
    }
}

/// Unique identifier for a name declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclId(usize);

impl DeclId {
    /// Creates a new declaration ID.
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    pub fn as_usize(self) -> usize {
        self.0
    }
}

/// The three disjoint namespaces of a P4 scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameSpace {
    /// Value names: parameters, instantiations, parser states.
    Var,
    /// Type names, including the overloaded-operator bindings.
    Type,
    /// Reserved words, seeded once by the parser and never modified.
    Keyword,
}

impl NameSpace {
    /// Number of namespaces.
    pub const COUNT: usize = 3;

    fn index(self) -> usize {
        match self {
            NameSpace::Var => 0,
            NameSpace::Type => 1,
            NameSpace::Keyword => 2,
        }
    }
}

/// Token classes of the reserved words an embedding parser seeds the root
/// scope with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    Action,
    Actions,
    Apply,
    Bit,
    Bool,
    Const,
    Control,
    Default,
    Else,
    Entries,
    Enum,
    Error,
    Exit,
    Extern,
    False,
    Header,
    HeaderUnion,
    If,
    In,
    InOut,
    Int,
    Key,
    MatchKind,
    Out,
    Package,
    Parser,
    Return,
    Select,
    State,
    String,
    Struct,
    Switch,
    Table,
    Transition,
    True,
    Tuple,
    Typedef,
    Varbit,
    Void,
}

/// Where a name declaration comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclOrigin {
    /// Declared by an AST node.
    Ast(AstId),
    /// A reserved word seeded by the parser.
    Keyword(TokenClass),
    /// A built-in name with no syntax (`accept`, `reject`, primitive types).
    Builtin,
}

impl DeclOrigin {
    /// The declaring AST node, if the declaration has one.
    pub fn ast(self) -> Option<AstId> {
        match self {
            DeclOrigin::Ast(id) => Some(id),
            _ => None,
        }
    }
}

/// A binding of a source-level identifier within one scope and namespace.
#[derive(Debug, Clone)]
pub struct NameDeclaration {
    /// The bound identifier.
    pub strname: SmolStr,
    /// The namespace the binding lives in.
    pub namespace: NameSpace,
    /// The declaration site.
    pub origin: DeclOrigin,
    /// The declared type; empty until the declared-types pass installs it.
    pub ty: Option<TypeId>,
    /// The previously bound declaration of the same name in the same scope
    /// and namespace, if any.
    pub next_in_scope: Option<DeclId>,
}

/// Per-name chain heads, one per namespace.
#[derive(Debug, Clone, Default)]
struct NameEntry {
    ns: [Option<DeclId>; NameSpace::COUNT],
}

/// A lexical scope.
#[derive(Debug, Clone)]
pub struct Scope {
    /// Unique scope identifier.
    pub id: ScopeId,
    /// Parent scope (None for the root).
    pub parent: Option<ScopeId>,
    names: HashMap<SmolStr, NameEntry>,
}

impl Scope {
    fn new(id: ScopeId, parent: Option<ScopeId>) -> Self {
        Self {
            id,
            parent,
            names: HashMap::new(),
        }
    }

    /// The chain head for `name` in `ns`, without walking parents.
    pub fn entry(&self, name: &str, ns: NameSpace) -> Option<DeclId> {
        self.names.get(name).and_then(|e| e.ns[ns.index()])
    }
}

/// Scope tree plus the declarations bound in it.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    decls: Vec<NameDeclaration>,
}

impl SymbolTable {
    /// Creates a table holding only the empty root scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(ScopeId(0), None)],
            decls: Vec::new(),
        }
    }

    /// Creates a table whose root scope is seeded with the given reserved
    /// words in the keyword namespace. This is the shape the pipeline
    /// expects from the embedding parser.
    pub fn with_keywords<'a>(keywords: impl IntoIterator<Item = (&'a str, TokenClass)>) -> Self {
        let mut table = Self::new();
        let root = table.root();
        for (word, class) in keywords {
            table.bind(
                root,
                SmolStr::new(word),
                NameSpace::Keyword,
                DeclOrigin::Keyword(class),
            );
        }
        table
    }

    /// The root scope shared by the whole program.
    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Opens a child scope of `parent`.
    pub fn push_scope(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope::new(id, Some(parent)));
        id
    }

    /// Borrows a scope.
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    /// Number of scopes.
    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    /// Borrows a declaration.
    pub fn decl(&self, id: DeclId) -> &NameDeclaration {
        &self.decls[id.0]
    }

    /// Mutably borrows a declaration, for installing its type.
    pub fn decl_mut(&mut self, id: DeclId) -> &mut NameDeclaration {
        &mut self.decls[id.0]
    }

    /// Iterates over all declarations in binding order.
    pub fn decls(&self) -> impl Iterator<Item = (DeclId, &NameDeclaration)> {
        self.decls.iter().enumerate().map(|(i, d)| (DeclId(i), d))
    }

    /// Binds `name` in `scope`'s namespace `ns`, prepending to any existing
    /// chain for that name. Returns the new chain head.
    pub fn bind(
        &mut self,
        scope: ScopeId,
        name: SmolStr,
        ns: NameSpace,
        origin: DeclOrigin,
    ) -> DeclId {
        let prev = self.scopes[scope.0]
            .names
            .get(&name)
            .and_then(|e| e.ns[ns.index()]);
        let id = DeclId(self.decls.len());
        self.decls.push(NameDeclaration {
            strname: name.clone(),
            namespace: ns,
            origin,
            ty: None,
            next_in_scope: prev,
        });
        let entry = self.scopes[scope.0].names.entry(name).or_default();
        entry.ns[ns.index()] = Some(id);
        id
    }

    /// Looks up `name` in `ns`, walking parent scopes from `from` until a
    /// hit. Returns the chain head of the innermost scope that binds it.
    pub fn lookup(&self, from: ScopeId, name: &str, ns: NameSpace) -> Option<DeclId> {
        let mut cursor = Some(from);
        while let Some(id) = cursor {
            let scope = &self.scopes[id.0];
            if let Some(decl) = scope.entry(name, ns) {
                return Some(decl);
            }
            cursor = scope.parent;
        }
        None
    }

    /// Looks up `name` in the given scope only.
    pub fn lookup_current(&self, scope: ScopeId, name: &str, ns: NameSpace) -> Option<DeclId> {
        self.scopes[scope.0].entry(name, ns)
    }

    /// Length of the declaration chain headed by `head` within its scope.
    pub fn chain_len(&self, head: DeclId) -> usize {
        self.chain(head).count()
    }

    /// Iterates a declaration chain from its head.
    pub fn chain(&self, head: DeclId) -> impl Iterator<Item = DeclId> + '_ {
        std::iter::successors(Some(head), |id| self.decls[id.0].next_in_scope)
    }

    /// Returns true if `scope` is `ancestor` or a descendant of it.
    pub fn is_descendant_of(&self, scope: ScopeId, ancestor: ScopeId) -> bool {
        let mut cursor = Some(scope);
        while let Some(id) = cursor {
            if id == ancestor {
                return true;
            }
            cursor = self.scopes[id.0].parent;
        }
        false
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_and_lookup_in_root() {
        let mut st = SymbolTable::new();
        let root = st.root();
        st.bind(root, "h".into(), NameSpace::Type, DeclOrigin::Builtin);

        assert!(st.lookup(root, "h", NameSpace::Type).is_some());
        assert!(st.lookup(root, "h", NameSpace::Var).is_none());
        assert!(st.lookup(root, "missing", NameSpace::Type).is_none());
    }

    #[test]
    fn lookup_walks_parent_scopes() {
        let mut st = SymbolTable::new();
        let root = st.root();
        let inner = st.push_scope(root);
        st.bind(root, "hdr".into(), NameSpace::Type, DeclOrigin::Builtin);

        assert!(st.lookup(inner, "hdr", NameSpace::Type).is_some());
        assert!(st.lookup_current(inner, "hdr", NameSpace::Type).is_none());
    }

    #[test]
    fn namespaces_are_independent() {
        let mut st = SymbolTable::new();
        let root = st.root();
        let as_type = st.bind(root, "x".into(), NameSpace::Type, DeclOrigin::Builtin);
        let as_var = st.bind(root, "x".into(), NameSpace::Var, DeclOrigin::Builtin);

        assert_eq!(st.lookup(root, "x", NameSpace::Type), Some(as_type));
        assert_eq!(st.lookup(root, "x", NameSpace::Var), Some(as_var));
        assert_eq!(st.chain_len(as_type), 1);
        assert_eq!(st.chain_len(as_var), 1);
    }

    #[test]
    fn rebinding_prepends_to_the_chain() {
        let mut st = SymbolTable::new();
        let root = st.root();
        let first = st.bind(root, "S".into(), NameSpace::Type, DeclOrigin::Builtin);
        let second = st.bind(root, "S".into(), NameSpace::Type, DeclOrigin::Builtin);

        assert_eq!(st.lookup(root, "S", NameSpace::Type), Some(second));
        assert_eq!(st.decl(second).next_in_scope, Some(first));
        assert_eq!(st.chain_len(second), 2);
    }

    #[test]
    fn inner_binding_shadows_outer() {
        let mut st = SymbolTable::new();
        let root = st.root();
        let inner = st.push_scope(root);
        st.bind(root, "x".into(), NameSpace::Var, DeclOrigin::Builtin);
        let shadow = st.bind(inner, "x".into(), NameSpace::Var, DeclOrigin::Builtin);

        assert_eq!(st.lookup(inner, "x", NameSpace::Var), Some(shadow));
        // Shadowing across scopes does not lengthen either chain.
        assert_eq!(st.chain_len(shadow), 1);
    }

    #[test]
    fn keywords_are_seeded_into_the_root() {
        let st = SymbolTable::with_keywords([
            ("parser", TokenClass::Parser),
            ("state", TokenClass::State),
        ]);
        let root = st.root();
        assert!(st.lookup(root, "parser", NameSpace::Keyword).is_some());
        assert!(st.lookup(root, "parser", NameSpace::Type).is_none());
    }

    #[test]
    fn descendant_check_walks_to_root() {
        let mut st = SymbolTable::new();
        let root = st.root();
        let a = st.push_scope(root);
        let b = st.push_scope(a);
        assert!(st.is_descendant_of(b, root));
        assert!(st.is_descendant_of(b, a));
        assert!(!st.is_descendant_of(a, b));
    }
}
