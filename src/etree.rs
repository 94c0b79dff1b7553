//! Elimination tree and postordering.

use crate::{mem, Index, SymbolicSparseColMatRef};
use dyn_stack::{PodStack, SizeOverflow, StackReq};
use equator::assert;

/// Selects which matrix the elimination tree is computed for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EtreeMode {
    /// Elimination tree of $A$ itself, reading only the entries above the diagonal.
    A,
    /// Column elimination tree of $A$, i.e. the elimination tree of $A^\top A$, computed without
    /// forming the product.
    AtA,
}

/// Elimination tree stored as a parent array.
///
/// A value is either nonnegative, the index of the parent of a given node, or `-1` to signify that
/// the node is a root.
#[derive(Copy, Clone, Debug)]
pub struct EliminationTreeRef<'a, I: Index> {
    pub(crate) inner: &'a [I],
}

impl<'a, I: Index> EliminationTreeRef<'a, I> {
    /// Creates an elimination tree reference from the underlying array, after checking that every
    /// entry is either `-1` or a valid node index.
    #[inline]
    #[track_caller]
    pub fn new_checked(inner: &'a [I]) -> Self {
        let n = inner.len();
        for &p in inner {
            assert!(p.idx().map(|p| p < n).unwrap_or(true));
        }
        Self { inner }
    }

    /// Returns the raw elimination tree.
    #[inline]
    pub fn into_inner(self) -> &'a [I] {
        self.inner
    }

    /// Returns the number of nodes in the tree.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the parent of node `j`, or `None` if it is a root.
    #[inline]
    #[track_caller]
    pub fn parent(&self, j: usize) -> Option<usize> {
        self.inner[j].idx()
    }
}

/// Computes the size and alignment of the workspace required to compute the elimination tree of a
/// matrix with dimensions `(nrows, ncols)`.
#[inline]
pub fn etree_req<I: Index>(
    nrows: usize,
    ncols: usize,
    mode: EtreeMode,
) -> Result<StackReq, SizeOverflow> {
    match mode {
        EtreeMode::A => StackReq::try_new::<I>(ncols),
        EtreeMode::AtA => StackReq::try_all_of([
            StackReq::try_new::<I>(ncols)?,
            StackReq::try_new::<I>(nrows)?,
        ]),
    }
}

/// Computes the elimination tree of $A$ or $A^\top A$, depending on `mode`.
///
/// `parent` has length `A.ncols()`.
///
/// The ancestor links are updated along every traversed path, but never fully compressed.
#[track_caller]
pub fn etree<'out, I: Index>(
    parent: &'out mut [I],
    A: SymbolicSparseColMatRef<'_, I>,
    mode: EtreeMode,
    stack: PodStack<'_>,
) -> EliminationTreeRef<'out, I> {
    let m = A.nrows();
    let n = A.ncols();
    assert!(parent.len() == n);

    // highest known ancestor of each node
    let (ancestor, stack) = stack.make_raw::<I>(n);
    // last column that touched each row, in A'A mode
    let (prev, _) = stack.make_raw::<I>(if mode == EtreeMode::AtA { m } else { 0 });
    mem::fill_none(prev);

    let none = I::truncate(mem::NONE);
    for j in 0..n {
        parent[j] = none;
        ancestor[j] = none;

        for i_ in A.row_indices_of_col(j) {
            let mut i = match mode {
                EtreeMode::A => Some(i_),
                EtreeMode::AtA => prev[i_].idx(),
            };

            // traverse from i up to j
            while let Some(i_cur) = i {
                if i_cur >= j {
                    break;
                }
                let next = ancestor[i_cur];
                ancestor[i_cur] = I::truncate(j);
                if next == none {
                    parent[i_cur] = I::truncate(j);
                }
                i = next.idx();
            }

            if mode == EtreeMode::AtA {
                prev[i_] = I::truncate(j);
            }
        }
    }

    EliminationTreeRef { inner: parent }
}

/// Computes the size and alignment of the workspace required to compute the postordering of an
/// elimination tree of size `n`.
#[inline]
pub fn postorder_req<I: Index>(n: usize) -> Result<StackReq, SizeOverflow> {
    StackReq::try_all_of([StackReq::try_new::<I>(n)?; 3])
}

fn postorder_depth_first_search<I: Index>(
    post: &mut [I],
    root: usize,
    mut start_index: usize,
    stack: &mut [I],
    first_child: &mut [I],
    next_child: &[I],
) -> usize {
    let mut top = 1usize;

    stack[0] = I::truncate(root);
    while top != 0 {
        let current_node = stack[top - 1].zx();
        let first_child = &mut first_child[current_node];

        if let Some(current_child) = first_child.idx() {
            stack[top] = I::truncate(current_child);
            top += 1;
            *first_child = next_child[current_child];
        } else {
            post[start_index] = I::truncate(current_node);
            start_index += 1;
            top -= 1;
        }
    }
    start_index
}

/// Computes a postordering of the elimination tree.
///
/// `post` has length `etree.len()`.
///
/// Children are visited in increasing index order, and roots in increasing index order. The
/// traversal uses an explicit stack, so its depth is not limited by the height of the tree.
#[track_caller]
pub fn postorder<I: Index>(post: &mut [I], etree: EliminationTreeRef<'_, I>, stack: PodStack<'_>) {
    let n = etree.len();
    assert!(post.len() == n);

    if n == 0 {
        return;
    }

    let (stack_, stack) = stack.make_raw::<I>(n);
    let (first_child, stack) = stack.make_raw::<I>(n);
    let (next_child, _) = stack.make_raw::<I>(n);

    mem::fill_none(first_child);

    // scanning in reverse order makes each child list sorted in increasing order
    for j in (0..n).rev() {
        if let Some(parent) = etree.parent(j) {
            next_child[j] = first_child[parent];
            first_child[parent] = I::truncate(j);
        }
    }

    let mut start_index = 0usize;
    for root in 0..n {
        if etree.parent(root).is_none() {
            start_index = postorder_depth_first_search(
                post,
                root,
                start_index,
                stack_,
                first_child,
                next_child,
            );
        }
    }
}
