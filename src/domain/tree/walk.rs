use std::ops::ControlFlow;

/// Iterative walk over pairs of nodes taken from two trees in lockstep.
///
/// `visit` receives each pair and may push child pairs onto the work list.
/// Returning `ControlFlow::Break` stops the walk and is passed back to the caller.
/// Pairs are processed depth-first, left before right when pushed in that order.
pub(crate) fn walk_pairs<A, B, R, F>(start: (A, B), mut visit: F) -> ControlFlow<R>
where
    F: FnMut(A, B, &mut WorkList<A, B>) -> ControlFlow<R>,
{
    let mut work = WorkList { stack: vec![start] };
    while let Some((first, second)) = work.stack.pop() {
        if let ControlFlow::Break(reason) = visit(first, second, &mut work) {
            return ControlFlow::Break(reason);
        }
    }
    ControlFlow::Continue(())
}

pub(crate) struct WorkList<A, B> {
    stack: Vec<(A, B)>,
}

impl<A, B> WorkList<A, B> {
    /// Queue `left` and `right` so that `left` is visited first.
    pub(crate) fn push_children(&mut self, left: (A, B), right: (A, B)) {
        self.stack.push(right);
        self.stack.push(left);
    }
}
