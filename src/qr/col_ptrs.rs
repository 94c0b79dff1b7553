use crate::{etree::EliminationTreeRef, mem, FaerError, Index, SymbolicSparseColMatRef};
use dyn_stack::{PodStack, SizeOverflow, StackReq};
use equator::assert;

/// Outcome of [`least_common_ancestor`] for a pair `(i, j)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Leaf {
    /// `j` is not a leaf of the row subtree of `i`.
    NotLeaf,
    /// `j` is the first leaf of the row subtree of `i`.
    First,
    /// `j` is a subsequent leaf, and `lca` is the least common ancestor of `j` and the previous
    /// leaf.
    Subsequent { lca: usize },
}

/// Determines whether `j` is a leaf of the row subtree of `i`, given the nodes visited so far in
/// postorder.
///
/// `ancestor` is a disjoint set forest whose roots are the highest ancestors processed so far. The
/// nodes traversed while looking for the root are linked to it directly.
#[inline]
pub(crate) fn least_common_ancestor<I: Index>(
    i: usize,
    j: usize,
    first: &[I],
    max_first: &mut [I],
    prev_leaf: &mut [I],
    ancestor: &mut [I],
) -> Leaf {
    if i <= j || first[j] <= max_first[i] {
        return Leaf::NotLeaf;
    }

    max_first[i] = first[j];
    let j_prev = prev_leaf[i];
    prev_leaf[i] = I::truncate(j);
    let Some(j_prev) = j_prev.idx() else {
        return Leaf::First;
    };

    let mut lca = j_prev;
    while lca != ancestor[lca].zx() {
        lca = ancestor[lca].zx();
    }

    let mut node = j_prev;
    while node != lca {
        let next = ancestor[node].zx();
        ancestor[node] = I::truncate(lca);
        node = next;
    }

    Leaf::Subsequent { lca }
}

/// Computes the size and alignment of the workspace required to compute the row pointers
/// predicted for the $R$ factor of a matrix with dimensions `(nrows, ncols)`.
#[inline]
pub fn qr_col_ptrs_req<I: Index>(nrows: usize, ncols: usize) -> Result<StackReq, SizeOverflow> {
    let n_req = StackReq::try_new::<I>(ncols)?;
    StackReq::try_all_of([
        n_req,
        n_req,
        n_req,
        n_req,
        StackReq::try_new::<I>(ncols + 1)?,
        StackReq::try_new::<I>(nrows)?,
    ])
}

/// Computes the exact column pointers of the Cholesky factor of $A^\top A$, from the structure of
/// $A^\top$. This is the transpose of the $R$ factor of the QR decomposition of $A$, so column `j`
/// of the result describes row `j` of $R$, and the total `r_row_ptrs[ncols]` is the exact number
/// of nonzeros of $R$. The column pointers of $R$ itself are written by the numeric
/// factorization.
///
/// - `r_row_ptrs` has length `AT.nrows() + 1`, i.e. `A.ncols() + 1`.
/// - `etree` is the column elimination tree of $A$.
/// - `post` is a postordering of `etree`.
///
/// # Errors
///
/// Returns [`FaerError::IndexOverflow`] if the number of nonzeros of $R$ exceeds `I::MAX`.
#[track_caller]
pub fn qr_col_ptrs<I: Index>(
    r_row_ptrs: &mut [I],
    AT: SymbolicSparseColMatRef<'_, I>,
    etree: EliminationTreeRef<'_, I>,
    post: &[I],
    stack: PodStack<'_>,
) -> Result<(), FaerError> {
    // rows of AT are the columns of A
    let n = AT.nrows();
    let m = AT.ncols();
    assert!(all(
        r_row_ptrs.len() == n + 1,
        etree.len() == n,
        post.len() == n,
    ));

    let (ancestor, stack) = stack.make_raw::<I>(n);
    let (max_first, stack) = stack.make_raw::<I>(n);
    let (prev_leaf, stack) = stack.make_raw::<I>(n);
    let (first, stack) = stack.make_raw::<I>(n);
    let (head, stack) = stack.make_raw::<I>(n + 1);
    let (next, _) = stack.make_raw::<I>(m);

    let none = I::truncate(mem::NONE);
    r_row_ptrs[0] = I::truncate(0);
    let counts = &mut r_row_ptrs[1..];

    mem::fill_none(first);
    for k in 0..n {
        let mut j = post[k].zx();
        counts[j] = I::truncate((first[j] == none) as usize);
        while first[j] == none {
            first[j] = I::truncate(k);
            match etree.parent(j) {
                Some(parent) => j = parent,
                None => break,
            }
        }
    }

    let post_inv = &mut *ancestor;
    for k in 0..n {
        post_inv[post[k].zx()] = I::truncate(k);
    }

    // bucket each row of A by the earliest postordered column it touches
    mem::fill_none(head);
    for i in 0..m {
        let k = Iterator::min(AT.row_indices_of_col(i).map(|j| post_inv[j].zx())).unwrap_or(n);
        next[i] = head[k];
        head[k] = I::truncate(i);
    }

    mem::fill_none(max_first);
    mem::fill_none(prev_leaf);
    for (i, p) in ancestor.iter_mut().enumerate() {
        *p = I::truncate(i);
    }

    for k in 0..n {
        let j = post[k].zx();
        if let Some(parent) = etree.parent(j) {
            counts[parent].decr();
        }

        let mut row = head[k].idx();
        while let Some(row_) = row {
            for i in AT.row_indices_of_col(row_) {
                match least_common_ancestor(i, j, first, max_first, prev_leaf, ancestor) {
                    Leaf::NotLeaf => {}
                    Leaf::First => counts[j].incr(),
                    Leaf::Subsequent { lca } => {
                        counts[j].incr();
                        counts[lca].decr();
                    }
                }
            }
            row = next[row_].idx();
        }

        if let Some(parent) = etree.parent(j) {
            ancestor[j] = I::truncate(parent);
        }
    }

    for j in 0..n {
        if let Some(parent) = etree.parent(j) {
            let count = counts[j];
            counts[parent] += count;
        }
    }

    let mut acc = 0usize;
    for j in 0..n {
        acc += r_row_ptrs[j + 1].zx();
        if acc > I::MAX.zx() {
            return Err(FaerError::IndexOverflow);
        }
        r_row_ptrs[j + 1] = I::truncate(acc);
    }

    Ok(())
}
