//! P4 abstract syntax: node kinds, the node arena, builders, and traversal.

pub mod build;
pub mod loc;
pub mod node;
pub mod walk;

pub use build::AstBuilder;
pub use loc::SourceLoc;
pub use node::{Ast, AstId, AstKind, AstNode, AstOp, ParamDirection};
pub use walk::Preorder;
