//! The semantic analysis pipeline.
//!
//! Six ordered passes transform a parsed AST plus a keyword-seeded root
//! scope into a fully decorated [`TypedProgram`]:
//!
//! 1. **Built-in method injection** — synthesizes the implicit `apply`
//!    prototypes on parser types, control types, and tables. The only pass
//!    that mutates the AST.
//! 2. **Scope hierarchy** — opens a lexical scope per scope-introducing
//!    form and records `scope_map`.
//! 3. **Name binding** — seeds built-ins, creates a `NameDeclaration` per
//!    declaring occurrence (`decl_map`), and primes the type arena.
//! 4. **Declared types** — constructs each declaration's `Type`, then runs
//!    the resolution sweep (namerefs, typedef chains, alias compression).
//! 5. **Potential types** — computes a `TypeSet` per expression bottom-up.
//! 6. **Type selection** — walks top-down with an expected type and
//!    settles every expression on one member of its set.
//!
//! Passes run strictly in order; each reads its predecessors' outputs and
//! never mutates them. Traversal is pre-order and deterministic, which is
//! the only ordering guarantee diagnostics rely on. The first error aborts
//! the pipeline.
//!
//! # Example
//!
//! ```
//! use p4_frontend::ast::AstBuilder;
//! use p4_frontend::ir::SymbolTable;
//! use p4_frontend::semantic::SemanticAnalyzer;
//!
//! let mut b = AstBuilder::new();
//! let field_ty = b.bit_type(Some(8));
//! let field = b.struct_field(field_ty, "x");
//! let s = b.struct_decl("S", vec![field]);
//! let ast = b.program(vec![s]);
//!
//! let program = SemanticAnalyzer::new()
//!     .analyze(ast, SymbolTable::new())
//!     .expect("a well-typed program");
//! assert!(program.decl_of(s).is_some());
//! ```

mod builtin_methods;
mod declared_types;
mod name_binding;
mod potential_types;
mod scope_hierarchy;
mod type_selection;

use crate::ast::Ast;
use crate::diag::SemanticError;
use crate::ir::symbol_table::SymbolTable;
use crate::ir::type_table::TypeTable;
use crate::ir::TypedProgram;

/// Drives the six-pass pipeline over one compilation unit.
#[derive(Debug, Clone, Default)]
pub struct SemanticAnalyzer {
    source_name: Option<String>,
}

impl SemanticAnalyzer {
    /// Creates an analyzer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the file name diagnostics are prefixed with.
    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }

    /// Runs the pipeline.
    ///
    /// `symbols` is the table the embedding parser seeded: its root scope
    /// holds the language keywords in the keyword namespace (see
    /// [`SymbolTable::with_keywords`]); the pipeline adds everything else.
    pub fn analyze(
        &self,
        mut ast: Ast,
        mut symbols: SymbolTable,
    ) -> Result<TypedProgram, SemanticError> {
        builtin_methods::run(&mut ast);

        let scope_map = scope_hierarchy::run(&ast, &mut symbols);

        let mut types = TypeTable::new();
        let binding = name_binding::run(&ast, &mut symbols, &scope_map, &mut types);

        let declared = declared_types::run(&ast, &mut symbols, &scope_map, &binding, &mut types)
            .map_err(|e| self.locate(e))?;

        let potype_map =
            potential_types::run(&ast, &symbols, &mut types, &scope_map, &binding, &declared)
                .map_err(|e| self.locate(e))?;

        let selected_type = type_selection::run(&ast, &symbols, &types, &binding, &potype_map)
            .map_err(|e| self.locate(e))?;

        Ok(TypedProgram::new(
            ast,
            symbols,
            types,
            scope_map,
            binding.decl_map,
            potype_map,
            selected_type,
        ))
    }

    fn locate(&self, err: SemanticError) -> SemanticError {
        match &self.source_name {
            Some(name) => err.with_file(name.clone()),
            None => err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AstBuilder;
    use crate::diag::SemanticErrorKind;

    #[test]
    fn empty_program_analyzes() {
        let ast = AstBuilder::new().program(vec![]);
        let program = SemanticAnalyzer::new()
            .analyze(ast, SymbolTable::new())
            .expect("empty program is fine");
        assert!(program.selected_type().is_empty());
    }

    #[test]
    fn errors_carry_the_source_name() {
        let mut b = AstBuilder::new();
        b.at(2, 9);
        let ty = b.named_type("Nope");
        let v = b.var_decl(ty, "v", None);
        let ast = b.program(vec![v]);

        let err = SemanticAnalyzer::new()
            .with_source_name("switch.p4")
            .analyze(ast, SymbolTable::new())
            .expect_err("unresolved");
        assert_eq!(err.kind, SemanticErrorKind::UnresolvedName);
        assert!(err.to_string().starts_with("switch.p4:2:9: error:"));
    }
}
