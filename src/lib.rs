//! Semantic front-end for the P4 packet-processing language.
//!
//! This crate is the analysis half of a P4 compiler front-end: it accepts
//! an already-parsed syntax tree plus a keyword-seeded root scope and
//! produces a fully decorated program — scopes, resolved name
//! declarations, and a selected type for every expression — ready for a
//! back-end to lower. Lexing, parsing, file I/O, and code generation are
//! the embedder's business.
//!
//! # Analyze a program
//!
//! ```
//! use p4_frontend::analyze;
//! use p4_frontend::ast::AstBuilder;
//! use p4_frontend::ir::SymbolTable;
//!
//! // struct S { bit<8> x; } const S s = { 255 };
//! let mut b = AstBuilder::new();
//! let field_ty = b.bit_type(Some(8));
//! let field = b.struct_field(field_ty, "x");
//! let s = b.struct_decl("S", vec![field]);
//! let s_ref = b.named_type("S");
//! let lit = b.int_literal(255);
//! let init = b.expr_list(vec![lit]);
//! let c = b.const_decl(s_ref, "s", init);
//! let ast = b.program(vec![s, c]);
//!
//! let program = analyze(ast, SymbolTable::new()).expect("well-typed");
//! let lit_ty = program.type_of(lit).expect("selected");
//! assert_eq!(program.types().describe(lit_ty), "bit<8>");
//! ```
//!
//! # Inspect a failure
//!
//! ```
//! use p4_frontend::ast::AstBuilder;
//! use p4_frontend::ir::SymbolTable;
//! use p4_frontend::semantic::SemanticAnalyzer;
//!
//! // const int<8> x = true;
//! let mut b = AstBuilder::new();
//! let ty = b.int_type(Some(8));
//! b.at(1, 18);
//! let lit = b.bool_literal(true);
//! let c = b.const_decl(ty, "x", lit);
//! let ast = b.program(vec![c]);
//!
//! let err = SemanticAnalyzer::new()
//!     .with_source_name("bad.p4")
//!     .analyze(ast, SymbolTable::new())
//!     .unwrap_err();
//! assert!(err.to_string().starts_with("bad.p4:1:18: error:"));
//! ```

pub mod ast;
pub mod diag;
pub mod ir;
pub mod semantic;

// Re-export the AST construction surface.
pub use ast::{Ast, AstBuilder, AstId, AstKind, AstOp, ParamDirection, SourceLoc};

// Re-export the decorated-program types.
pub use ir::{SymbolTable, TypeId, TypeSet, TypeTable, TypedProgram};

// Re-export diagnostics.
pub use diag::{SemanticError, SemanticErrorKind};

// Re-export the pipeline driver.
pub use semantic::SemanticAnalyzer;

/// Runs the semantic pipeline with default settings.
///
/// This is the recommended entry point for embedders that do not need to
/// name the source file in diagnostics.
pub fn analyze(ast: Ast, symbols: SymbolTable) -> Result<TypedProgram, SemanticError> {
    SemanticAnalyzer::new().analyze(ast, symbols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::symbol_table::TokenClass;

    #[test]
    fn public_api_accessible() {
        let _loc = SourceLoc::new(1, 1);
        let _ast = Ast::new();
        let _symbols = SymbolTable::with_keywords([("parser", TokenClass::Parser)]);
    }

    #[test]
    fn analyze_accepts_an_empty_program() {
        let ast = AstBuilder::new().program(vec![]);
        let program = analyze(ast, SymbolTable::new()).expect("empty program");
        assert!(program.scope_map().len() >= 1);
    }
}
