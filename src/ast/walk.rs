//! Pre-order traversal over the node arena.
//!
//! The analysis passes use hand-written recursive visitors so they can
//! thread scope and type context; this iterator serves the callers that
//! only need to enumerate nodes, such as invariant checks.

use crate::ast::{Ast, AstId};

/// Depth-first pre-order iterator over a subtree.
pub struct Preorder<'a> {
    ast: &'a Ast,
    stack: Vec<AstId>,
}

impl<'a> Preorder<'a> {
    /// Creates an iterator rooted at `root`.
    pub fn new(ast: &'a Ast, root: AstId) -> Self {
        Self {
            ast,
            stack: vec![root],
        }
    }
}

impl Iterator for Preorder<'_> {
    type Item = AstId;

    fn next(&mut self) -> Option<AstId> {
        let id = self.stack.pop()?;
        let mut children = self.ast.children(id);
        children.reverse();
        self.stack.extend(children);
        Some(id)
    }
}

impl Ast {
    /// Pre-order traversal of the subtree rooted at `root`.
    pub fn preorder(&self, root: AstId) -> Preorder<'_> {
        Preorder::new(self, root)
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{Ast, AstKind, SourceLoc};

    #[test]
    fn preorder_visits_parent_before_children() {
        let mut ast = Ast::new();
        let lhs = ast.push(
            AstKind::Name {
                strname: "a".into(),
            },
            SourceLoc::new(1, 1),
        );
        let rhs = ast.push(
            AstKind::Name {
                strname: "b".into(),
            },
            SourceLoc::new(1, 5),
        );
        let assign = ast.push(AstKind::AssignmentStatement { lhs, rhs }, SourceLoc::new(1, 1));

        let order: Vec<_> = ast.preorder(assign).collect();
        assert_eq!(order, vec![assign, lhs, rhs]);
    }

    #[test]
    fn preorder_covers_every_reachable_node() {
        let mut ast = Ast::new();
        let items: Vec<_> = (0..4)
            .map(|i| {
                ast.push(
                    AstKind::IntegerLiteral {
                        is_signed: false,
                        width: 0,
                        value: i,
                    },
                    SourceLoc::new(1, i as u32 + 1),
                )
            })
            .collect();
        let list = ast.push(AstKind::ExpressionList { items }, SourceLoc::new(1, 1));

        assert_eq!(ast.preorder(list).count(), 5);
    }
}
