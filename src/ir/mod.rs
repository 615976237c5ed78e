//! The decorated program representation the pipeline produces.
//!
//! A [`TypedProgram`] enriches the AST with everything the passes compute:
//! - the scope tree and name declarations (symbol table),
//! - the type arena enumerating every declared type,
//! - the four association maps keyed by node identity
//!   (`scope_map`, `decl_map`, `potype_map`, `selected_type`).
//!
//! All maps are append-only once their producing pass has finished; a
//! back-end reads them but never mutates them.

pub mod symbol_table;
pub mod type_table;

use crate::ast::{Ast, AstId};
use std::collections::HashMap;

pub use symbol_table::{
    DeclId, DeclOrigin, NameDeclaration, NameSpace, Scope, ScopeId, SymbolTable, TokenClass,
};
pub use type_table::{Type, TypeId, TypeSet, TypeTable};

/// A fully decorated program, ready for back-end lowering.
#[derive(Debug, Clone)]
pub struct TypedProgram {
    /// The AST, augmented with the synthesized `apply` prototypes.
    ast: Ast,
    /// Scopes and name declarations.
    symbols: SymbolTable,
    /// The arena enumerating every declared type.
    types: TypeTable,
    /// Node → enclosing (or opened) scope.
    scope_map: HashMap<AstId, ScopeId>,
    /// Declaration node → its name declaration.
    decl_map: HashMap<AstId, DeclId>,
    /// Expression node → its potential types.
    potype_map: HashMap<AstId, TypeSet>,
    /// Expression node → the type selection settled on.
    selected_type: HashMap<AstId, TypeId>,
}

impl TypedProgram {
    /// Bundles the pipeline outputs.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        ast: Ast,
        symbols: SymbolTable,
        types: TypeTable,
        scope_map: HashMap<AstId, ScopeId>,
        decl_map: HashMap<AstId, DeclId>,
        potype_map: HashMap<AstId, TypeSet>,
        selected_type: HashMap<AstId, TypeId>,
    ) -> Self {
        Self {
            ast,
            symbols,
            types,
            scope_map,
            decl_map,
            potype_map,
            selected_type,
        }
    }

    /// The augmented AST.
    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    /// The scope tree and name declarations.
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// The type arena.
    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    /// Node → scope associations.
    pub fn scope_map(&self) -> &HashMap<AstId, ScopeId> {
        &self.scope_map
    }

    /// Declaration node → name declaration associations.
    pub fn decl_map(&self) -> &HashMap<AstId, DeclId> {
        &self.decl_map
    }

    /// Expression node → potential-type associations.
    pub fn potype_map(&self) -> &HashMap<AstId, TypeSet> {
        &self.potype_map
    }

    /// Expression node → selected-type associations.
    pub fn selected_type(&self) -> &HashMap<AstId, TypeId> {
        &self.selected_type
    }

    /// The name declaration created for a declaration node.
    pub fn decl_of(&self, node: AstId) -> Option<&NameDeclaration> {
        self.decl_map.get(&node).map(|id| self.symbols.decl(*id))
    }

    /// The type the pipeline selected for an expression node.
    pub fn type_of(&self, node: AstId) -> Option<TypeId> {
        self.selected_type.get(&node).copied()
    }
}
