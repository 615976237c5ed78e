//! The type arena: type formers, alias collapsing, equivalence, and the
//! potential-type sets the inference pass computes.
//!
//! Every type lives in the [`TypeTable`] and is referenced by a stable
//! [`TypeId`]. Cyclic shapes (a parser type reaching itself through a state
//! transition, a struct reaching its enclosing header union) are expressed
//! by ids, so no ownership cycles exist; the arena outlives the pipeline.

use crate::ast::AstId;
use crate::ir::symbol_table::ScopeId;
use smol_str::SmolStr;

/// Unique identifier for a type in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(usize);

impl TypeId {
    /// Creates a new type ID.
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    pub fn as_usize(self) -> usize {
        self.0
    }
}

/// A type former.
///
/// `Nameref` and `Typedef` are transient: the resolution sweep at the end
/// of the declared-types pass rewrites every `Nameref` into an `Alias` and
/// collapses every `Typedef` chain, so neither is reachable from a
/// `NameDeclaration` afterwards.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// A slot reserved by name binding and filled by the declared-types
    /// pass. None survive a successful pipeline run.
    Pending,
    /// `void`
    Void,
    /// `bool`
    Bool,
    /// `int` (width 0) or `int<N>`.
    Int { width: u32 },
    /// `bit` (width 0 stands for the whole width family) or `bit<N>`.
    Bit { width: u32 },
    /// `varbit<N>`.
    Varbit { width: u32 },
    /// `string`
    String,
    /// The don't-care type; compatible with everything.
    Any,
    /// A declared enumeration; `fields` is a product of `Field`s.
    Enum { name: SmolStr, fields: TypeId },
    /// The built-in `error` enumeration, accumulated across declarations.
    Error { fields: TypeId },
    /// The built-in `match_kind` enumeration, accumulated across
    /// declarations.
    MatchKind { fields: TypeId },
    /// A transparent alias introduced by `typedef`.
    Typedef { name: SmolStr, target: TypeId },
    /// A callable: `params` is a product of parameter types.
    Function {
        name: SmolStr,
        params: TypeId,
        ret: TypeId,
    },
    /// An opaque extern with a method table; `ctors` is the subset of
    /// methods named after the extern.
    Extern {
        name: SmolStr,
        methods: TypeId,
        ctors: TypeId,
    },
    /// An instantiable package.
    Package { name: SmolStr, params: TypeId },
    /// A parser type; `methods` includes the synthesized `apply`.
    Parser {
        name: SmolStr,
        params: TypeId,
        ctor_params: TypeId,
        methods: TypeId,
    },
    /// A control type; `methods` includes the synthesized `apply`.
    Control {
        name: SmolStr,
        params: TypeId,
        ctor_params: TypeId,
        methods: TypeId,
    },
    /// A table; its only method is the synthesized `apply`.
    Table { name: SmolStr, methods: TypeId },
    /// A plain record.
    Struct { name: SmolStr, fields: TypeId },
    /// A record with a validity bit.
    Header { name: SmolStr, fields: TypeId },
    /// A discriminated union of headers.
    HeaderUnion { name: SmolStr, fields: TypeId },
    /// A fixed-length array of headers.
    Stack { element: TypeId, size: u32 },
    /// A parser state label.
    State,
    /// A named member of a record or enumeration.
    Field { name: SmolStr, ty: TypeId },
    /// An unresolved type reference, pending the resolution sweep.
    Nameref { name: AstId, scope: ScopeId },
    /// A resolved type alias; after the sweep an alias never points at
    /// another alias.
    Alias { target: TypeId },
    /// An ordered n-tuple of types.
    Product { members: Vec<TypeId> },
    /// A 2-tuple, used by type constraints.
    Tuple { left: TypeId, right: TypeId },
}

/// The arena owning every type of one compilation unit.
///
/// Each slot optionally records the AST node it was constructed for, which
/// is where alias-cycle diagnostics point.
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    types: Vec<Type>,
    origins: Vec<Option<AstId>>,
}

impl TypeTable {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a type, returning its id.
    pub fn add(&mut self, ty: Type) -> TypeId {
        let id = TypeId(self.types.len());
        self.types.push(ty);
        self.origins.push(None);
        id
    }

    /// Appends a type recording the AST node it describes.
    pub fn add_for(&mut self, ty: Type, ast: AstId) -> TypeId {
        let id = self.add(ty);
        self.origins[id.0] = Some(ast);
        id
    }

    /// Reserves a `Pending` slot to be filled in place later. Name binding
    /// primes one slot per named declaration so ids stay stable for
    /// self-referential types.
    pub fn reserve(&mut self, ast: AstId) -> TypeId {
        self.add_for(Type::Pending, ast)
    }

    /// Overwrites a slot in place. Used to fill reserved slots and by the
    /// resolution sweep's rewrites.
    pub fn set(&mut self, id: TypeId, ty: Type) {
        self.types[id.0] = ty;
    }

    /// Borrows a type.
    pub fn get(&self, id: TypeId) -> &Type {
        &self.types[id.0]
    }

    /// The AST node a slot was constructed for, if recorded.
    pub fn origin(&self, id: TypeId) -> Option<AstId> {
        self.origins[id.0]
    }

    /// Number of types in the arena.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns true if the arena holds no types.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Iterates over all ids in arena order.
    pub fn ids(&self) -> impl Iterator<Item = TypeId> {
        (0..self.types.len()).map(TypeId)
    }

    // ------------------------------------------------------------------
    // Alias collapsing
    // ------------------------------------------------------------------

    /// Follows `Alias` links only. After the resolution sweep a single step
    /// suffices, but the walk tolerates pre-sweep chains.
    pub fn actual(&self, id: TypeId) -> TypeId {
        let mut id = id;
        while let Type::Alias { target } = &self.types[id.0] {
            id = *target;
        }
        id
    }

    /// Follows `Alias` and `Typedef` links to the underlying type. This is
    /// the view all type comparisons use.
    pub fn effective(&self, id: TypeId) -> TypeId {
        let mut id = id;
        loop {
            match &self.types[id.0] {
                Type::Alias { target } => id = *target,
                Type::Typedef { target, .. } => id = *target,
                _ => return id,
            }
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Returns true if the (collapsed) type is in the integer family.
    pub fn is_integer(&self, id: TypeId) -> bool {
        matches!(
            self.get(self.effective(id)),
            Type::Int { .. } | Type::Bit { .. } | Type::Varbit { .. }
        )
    }

    /// Returns true if the (collapsed) type is a width-family
    /// representative: an integer former with width 0.
    pub fn is_width_open_integer(&self, id: TypeId) -> bool {
        matches!(
            self.get(self.effective(id)),
            Type::Int { width: 0 } | Type::Bit { width: 0 } | Type::Varbit { width: 0 }
        )
    }

    /// The member product of a record or enumeration type.
    pub fn fields_of(&self, id: TypeId) -> Option<&[TypeId]> {
        let fields = match self.get(self.effective(id)) {
            Type::Struct { fields, .. }
            | Type::Header { fields, .. }
            | Type::HeaderUnion { fields, .. }
            | Type::Enum { fields, .. }
            | Type::Error { fields }
            | Type::MatchKind { fields } => *fields,
            _ => return None,
        };
        Some(self.product_members(fields))
    }

    /// The method product of a type that carries one.
    pub fn methods_of(&self, id: TypeId) -> Option<&[TypeId]> {
        let methods = match self.get(self.effective(id)) {
            Type::Extern { methods, .. }
            | Type::Parser { methods, .. }
            | Type::Control { methods, .. }
            | Type::Table { methods, .. } => *methods,
            _ => return None,
        };
        Some(self.product_members(methods))
    }

    /// The ordered members of a product type.
    ///
    /// Panics if `id` is not a `Product`; products are only ever reached
    /// through fields that the declared-types pass populated.
    pub fn product_members(&self, id: TypeId) -> &[TypeId] {
        match self.get(self.effective(id)) {
            Type::Product { members } => members,
            other => panic!("expected product type, found {:?}", other),
        }
    }

    /// Resolves a member name on a type: record fields first, then methods.
    /// The result is the member's type (the field's type, or the method's
    /// function type).
    pub fn find_member(&self, id: TypeId, member: &str) -> Option<TypeId> {
        if let Some(fields) = self.fields_of(id) {
            for &f in fields {
                if let Type::Field { name, ty } = self.get(f)
                    && name == member
                {
                    return Some(*ty);
                }
            }
        }
        if let Some(methods) = self.methods_of(id) {
            for &m in methods {
                if let Type::Function { name, .. } = self.get(self.effective(m))
                    && name == member
                {
                    return Some(m);
                }
            }
        }
        None
    }

    // ------------------------------------------------------------------
    // Equivalence and matching
    // ------------------------------------------------------------------

    /// Structural equivalence modulo alias collapsing: identical ids, or
    /// primitives of the same former and width, or products equivalent
    /// pointwise. Declared nominal types compare by identity.
    pub fn equiv(&self, a: TypeId, b: TypeId) -> bool {
        let a = self.effective(a);
        let b = self.effective(b);
        if a == b {
            return true;
        }
        match (self.get(a), self.get(b)) {
            (Type::Void, Type::Void)
            | (Type::Bool, Type::Bool)
            | (Type::String, Type::String)
            | (Type::Any, Type::Any)
            | (Type::State, Type::State) => true,
            (Type::Int { width: wa }, Type::Int { width: wb })
            | (Type::Bit { width: wa }, Type::Bit { width: wb })
            | (Type::Varbit { width: wa }, Type::Varbit { width: wb }) => wa == wb,
            (Type::Stack { element: ea, size: sa }, Type::Stack { element: eb, size: sb }) => {
                sa == sb && self.equiv(*ea, *eb)
            }
            (Type::Product { members: ma }, Type::Product { members: mb }) => {
                ma.len() == mb.len()
                    && ma.iter().zip(mb.iter()).all(|(x, y)| self.equiv(*x, *y))
            }
            (Type::Tuple { left: la, right: ra }, Type::Tuple { left: lb, right: rb }) => {
                self.equiv(*la, *lb) && self.equiv(*ra, *rb)
            }
            _ => false,
        }
    }

    /// Returns true if a value of type `found` is acceptable where
    /// `required` is expected. `Any` on either side accepts; a width-open
    /// integer accepts any member of its family.
    pub fn accepts(&self, required: TypeId, found: TypeId) -> bool {
        let required = self.effective(required);
        let found = self.effective(found);
        if self.equiv(required, found) {
            return true;
        }
        match (self.get(required), self.get(found)) {
            (Type::Any, _) | (_, Type::Any) => true,
            // A family representative takes any width of any integer former.
            (Type::Int { width: 0 }, _) if self.is_integer(found) => true,
            (Type::Bit { width: 0 }, Type::Bit { .. } | Type::Varbit { .. }) => true,
            _ => false,
        }
    }

    /// A human-readable rendering for diagnostics.
    pub fn describe(&self, id: TypeId) -> String {
        match self.get(id) {
            Type::Pending => "<pending>".to_string(),
            Type::Void => "void".to_string(),
            Type::Bool => "bool".to_string(),
            Type::Int { width: 0 } => "int".to_string(),
            Type::Int { width } => format!("int<{}>", width),
            Type::Bit { width: 0 } => "bit".to_string(),
            Type::Bit { width } => format!("bit<{}>", width),
            Type::Varbit { width: 0 } => "varbit".to_string(),
            Type::Varbit { width } => format!("varbit<{}>", width),
            Type::String => "string".to_string(),
            Type::Any => "_".to_string(),
            Type::Enum { name, .. } => format!("enum {}", name),
            Type::Error { .. } => "error".to_string(),
            Type::MatchKind { .. } => "match_kind".to_string(),
            Type::Typedef { name, .. } => format!("typedef {}", name),
            Type::Function { name, .. } => format!("function {}", name),
            Type::Extern { name, .. } => format!("extern {}", name),
            Type::Package { name, .. } => format!("package {}", name),
            Type::Parser { name, .. } => format!("parser {}", name),
            Type::Control { name, .. } => format!("control {}", name),
            Type::Table { name, .. } => format!("table {}", name),
            Type::Struct { name, .. } => format!("struct {}", name),
            Type::Header { name, .. } => format!("header {}", name),
            Type::HeaderUnion { name, .. } => format!("header_union {}", name),
            Type::Stack { element, size } => {
                format!("{}[{}]", self.describe(*element), size)
            }
            Type::State => "state".to_string(),
            Type::Field { name, .. } => format!("field {}", name),
            Type::Nameref { .. } => "<nameref>".to_string(),
            Type::Alias { target } => self.describe(*target),
            Type::Product { members } => {
                let inner: Vec<_> = members.iter().map(|m| self.describe(*m)).collect();
                format!("({})", inner.join(", "))
            }
            Type::Tuple { left, right } => {
                format!("({}, {})", self.describe(*left), self.describe(*right))
            }
        }
    }
}

/// The set of types an expression could have before context narrows the
/// choice.
///
/// Flat sets carry explicit members plus a flag admitting the whole
/// width-polymorphic integer family (the shape of an unsuffixed integer
/// literal). Compound expressions carry the product of their children's
/// sets. An empty flat set is the type-error sentinel.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TypeSet {
    /// An explicit set of candidate types.
    #[default]
    Empty,
    /// Candidate types; `wildcard_int` admits every integer width.
    Members {
        members: Vec<TypeId>,
        wildcard_int: bool,
    },
    /// The pointwise product of child expression sets.
    Product { elems: Vec<TypeSet> },
}

impl TypeSet {
    /// The empty (error-sentinel) set.
    pub fn empty() -> Self {
        TypeSet::Empty
    }

    /// A set holding exactly one type.
    pub fn singleton(ty: TypeId) -> Self {
        TypeSet::Members {
            members: vec![ty],
            wildcard_int: false,
        }
    }

    /// The set of an unsuffixed integer literal: `int` plus every width of
    /// the integer family.
    pub fn integer_literal(int_ty: TypeId) -> Self {
        TypeSet::Members {
            members: vec![int_ty],
            wildcard_int: true,
        }
    }

    /// A set over the given members.
    pub fn from_members(members: Vec<TypeId>) -> Self {
        if members.is_empty() {
            TypeSet::Empty
        } else {
            TypeSet::Members {
                members,
                wildcard_int: false,
            }
        }
    }

    /// A product of child sets.
    pub fn product(elems: Vec<TypeSet>) -> Self {
        TypeSet::Product { elems }
    }

    /// Returns true if no type can be chosen from this set.
    pub fn is_empty(&self) -> bool {
        match self {
            TypeSet::Empty => true,
            TypeSet::Members {
                members,
                wildcard_int,
            } => members.is_empty() && !wildcard_int,
            TypeSet::Product { elems } => elems.iter().any(TypeSet::is_empty),
        }
    }

    /// Returns true if the set already names exactly one type.
    pub fn is_singleton(&self) -> bool {
        matches!(self, TypeSet::Members { members, .. } if members.len() == 1)
    }

    /// The explicit members of a flat set.
    pub fn members(&self) -> &[TypeId] {
        match self {
            TypeSet::Members { members, .. } => members,
            _ => &[],
        }
    }

    /// Returns true if the set admits the whole integer-width family.
    pub fn admits_any_integer(&self) -> bool {
        matches!(
            self,
            TypeSet::Members {
                wildcard_int: true,
                ..
            }
        )
    }

    /// Membership test under pointer equality modulo alias collapsing. A
    /// product set contains the types it matches pointwise (the shape a
    /// record initializer selects).
    pub fn contains(&self, types: &TypeTable, ty: TypeId) -> bool {
        match self {
            TypeSet::Empty => false,
            TypeSet::Members {
                members,
                wildcard_int,
            } => {
                members.iter().any(|m| types.equiv(*m, ty))
                    || (*wildcard_int && types.is_integer(ty))
            }
            TypeSet::Product { .. } => match_type(types, self, ty),
        }
    }
}

/// Returns true if the potential-type set `tau` can supply a value of
/// `required`.
///
/// Flat sets match through [`TypeTable::accepts`]; a product set matches a
/// record or product type pointwise against its member types.
pub fn match_type(types: &TypeTable, tau: &TypeSet, required: TypeId) -> bool {
    let required = types.effective(required);
    match tau {
        TypeSet::Empty => false,
        TypeSet::Members {
            members,
            wildcard_int,
        } => {
            if members.iter().any(|m| types.accepts(required, *m)) {
                return true;
            }
            *wildcard_int && (types.is_integer(required) || matches!(types.get(required), Type::Any))
        }
        TypeSet::Product { elems } => {
            let targets: Vec<TypeId> = if let Some(fields) = types.fields_of(required) {
                fields
                    .iter()
                    .map(|f| match types.get(*f) {
                        Type::Field { ty, .. } => *ty,
                        _ => *f,
                    })
                    .collect()
            } else if let Type::Product { members } = types.get(required) {
                members.clone()
            } else if let Type::Tuple { left, right } = types.get(required) {
                vec![*left, *right]
            } else {
                return false;
            };
            elems.len() == targets.len()
                && elems
                    .iter()
                    .zip(targets)
                    .all(|(e, t)| match_type(types, e, t))
        }
    }
}

/// Matches a candidate callee against call arguments: the callee must be a
/// function whose parameter product matches the argument sets pointwise.
pub fn match_function_args(types: &TypeTable, callee: TypeId, args: &[TypeSet]) -> bool {
    let Type::Function { params, .. } = types.get(types.effective(callee)) else {
        return false;
    };
    let params = types.product_members(*params).to_vec();
    if params.len() != args.len() {
        return false;
    }
    if !params
        .iter()
        .zip(args)
        .all(|(p, a)| match_type(types, a, *p))
    {
        return false;
    }
    // Width-open parameters must unify on one concrete width.
    unify_integer_args(types, &params, args).is_some()
}

/// Computes the concrete integer type the width-open parameters of `params`
/// unify on, given the argument sets. Returns:
/// - `Some(None)` when no argument pins a width (all literals),
/// - `Some(Some(ty))` when the concrete integer arguments agree on `ty`,
/// - `None` when two arguments pin disjoint widths.
pub fn unify_integer_args(
    types: &TypeTable,
    params: &[TypeId],
    args: &[TypeSet],
) -> Option<Option<TypeId>> {
    let mut unified: Option<TypeId> = None;
    for (p, a) in params.iter().zip(args) {
        if !types.is_width_open_integer(*p) {
            continue;
        }
        for &m in a.members() {
            if !types.is_integer(m) || types.is_width_open_integer(m) {
                continue;
            }
            match unified {
                None => unified = Some(m),
                Some(u) if types.equiv(u, m) => {}
                Some(_) => return None,
            }
        }
    }
    Some(unified)
}

/// The result type of a call through `callee` with the given arguments:
/// the declared return type, with a width-open integer return narrowed to
/// the width the arguments unified on.
pub fn call_result(types: &TypeTable, callee: TypeId, args: &[TypeSet]) -> Option<TypeId> {
    let Type::Function { params, ret, .. } = types.get(types.effective(callee)) else {
        return None;
    };
    let (params, ret) = (*params, *ret);
    let params = types.product_members(params).to_vec();
    let unified = unify_integer_args(types, &params, args)?;
    if types.is_width_open_integer(ret)
        && let Some(u) = unified
    {
        return Some(u);
    }
    Some(ret)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TypeTable {
        TypeTable::new()
    }

    #[test]
    fn alias_chains_collapse() {
        let mut t = table();
        let b = t.add(Type::Bool);
        let a1 = t.add(Type::Alias { target: b });
        let a2 = t.add(Type::Alias { target: a1 });
        assert_eq!(t.effective(a2), b);
        assert_eq!(t.actual(a2), b);
    }

    #[test]
    fn typedefs_are_transparent_to_effective_only() {
        let mut t = table();
        let b = t.add(Type::Bit { width: 8 });
        let td = t.add(Type::Typedef {
            name: "MacAddr".into(),
            target: b,
        });
        assert_eq!(t.effective(td), b);
        assert_eq!(t.actual(td), td);
    }

    #[test]
    fn widths_distinguish_integer_types() {
        let mut t = table();
        let b8 = t.add(Type::Bit { width: 8 });
        let b8_again = t.add(Type::Bit { width: 8 });
        let b16 = t.add(Type::Bit { width: 16 });
        assert!(t.equiv(b8, b8_again));
        assert!(!t.equiv(b8, b16));
    }

    #[test]
    fn width_open_integer_accepts_the_family() {
        let mut t = table();
        let int0 = t.add(Type::Int { width: 0 });
        let b16 = t.add(Type::Bit { width: 16 });
        let boolean = t.add(Type::Bool);
        assert!(t.accepts(int0, b16));
        assert!(!t.accepts(b16, int0));
        assert!(!t.accepts(int0, boolean));
    }

    #[test]
    fn member_lookup_finds_fields_and_methods() {
        let mut t = table();
        let b8 = t.add(Type::Bit { width: 8 });
        let f = t.add(Type::Field {
            name: "x".into(),
            ty: b8,
        });
        let fields = t.add(Type::Product { members: vec![f] });
        let s = t.add(Type::Struct {
            name: "S".into(),
            fields,
        });
        assert_eq!(t.find_member(s, "x"), Some(b8));
        assert_eq!(t.find_member(s, "y"), None);
    }

    #[test]
    fn integer_literal_set_matches_every_width() {
        let mut t = table();
        let int0 = t.add(Type::Int { width: 0 });
        let b8 = t.add(Type::Bit { width: 8 });
        let set = TypeSet::integer_literal(int0);
        assert!(match_type(&t, &set, b8));
        assert!(match_type(&t, &set, int0));
        assert!(set.contains(&t, b8));
    }

    #[test]
    fn product_set_matches_struct_fields_pointwise() {
        let mut t = table();
        let int0 = t.add(Type::Int { width: 0 });
        let b8 = t.add(Type::Bit { width: 8 });
        let f = t.add(Type::Field {
            name: "x".into(),
            ty: b8,
        });
        let fields = t.add(Type::Product { members: vec![f] });
        let s = t.add(Type::Struct {
            name: "S".into(),
            fields,
        });

        let set = TypeSet::product(vec![TypeSet::integer_literal(int0)]);
        assert!(match_type(&t, &set, s));

        let wrong_arity = TypeSet::product(vec![
            TypeSet::integer_literal(int0),
            TypeSet::integer_literal(int0),
        ]);
        assert!(!match_type(&t, &wrong_arity, s));
    }

    #[test]
    fn disjoint_widths_refuse_to_unify() {
        let mut t = table();
        let int0 = t.add(Type::Int { width: 0 });
        let b8 = t.add(Type::Bit { width: 8 });
        let b16 = t.add(Type::Bit { width: 16 });
        let params_prod = t.add(Type::Product {
            members: vec![int0, int0],
        });
        let add = t.add(Type::Function {
            name: "+".into(),
            params: params_prod,
            ret: int0,
        });

        let ok = [TypeSet::singleton(b16), TypeSet::integer_literal(int0)];
        assert!(match_function_args(&t, add, &ok));
        assert_eq!(call_result(&t, add, &ok), Some(b16));

        let clash = [TypeSet::singleton(b8), TypeSet::singleton(b16)];
        assert!(!match_function_args(&t, add, &clash));
    }

    #[test]
    fn call_result_defaults_to_declared_return() {
        let mut t = table();
        let int0 = t.add(Type::Int { width: 0 });
        let boolean = t.add(Type::Bool);
        let b8 = t.add(Type::Bit { width: 8 });
        let params_prod = t.add(Type::Product {
            members: vec![int0, int0],
        });
        let eq = t.add(Type::Function {
            name: "==".into(),
            params: params_prod,
            ret: boolean,
        });

        let args = [TypeSet::singleton(b8), TypeSet::integer_literal(int0)];
        assert_eq!(call_result(&t, eq, &args), Some(boolean));
    }
}
