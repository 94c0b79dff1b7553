use crate::{etree::EliminationTreeRef, mem, Index, SymbolicSparseColMatRef};
use dyn_stack::{PodStack, SizeOverflow, StackReq};
use equator::assert;

/// Sizes computed by [`qr_row_perm`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RowPermInfo {
    /// Number of rows of $A$ after padding with fictitious rows. This is also the number of rows of
    /// the Householder factor $V$.
    pub nrows_ext: usize,
    /// Exact number of nonzeros of the Householder factor $V$.
    pub h_nnz: usize,
}

/// Computes the size and alignment of the workspace required to compute the row permutation of a
/// matrix with dimensions `(nrows, ncols)`.
#[inline]
pub fn qr_row_perm_req<I: Index>(nrows: usize, ncols: usize) -> Result<StackReq, SizeOverflow> {
    let n_req = StackReq::try_new::<I>(ncols)?;
    StackReq::try_all_of([StackReq::try_new::<I>(nrows)?, n_req, n_req, n_req])
}

/// Computes the row permutation used by the sparse QR factorization, along with the leftmost
/// column of each row.
///
/// Each column `j` is assigned the pivot row whose permuted index is `j`. Rows that are not
/// chosen as a pivot are moved to the queue of the parent of their column in the elimination tree.
/// A column whose queue is empty is given a new fictitious row, numbered from `A.nrows()` onwards.
/// Rows that are never chosen, including empty rows, are placed after the pivots, in increasing
/// order.
///
/// - `row_perm_inv` has length `A.nrows() + A.ncols()`. On output, its first `nrows_ext` entries
///   map each original or fictitious row to its permuted index, and the remaining entries are set
///   to `-1`.
/// - `leftmost` has length `A.nrows()`. On output, it contains the smallest column index of each
///   row, or `-1` if the row is empty.
/// - `etree` is the column elimination tree of $A$.
#[track_caller]
pub fn qr_row_perm<I: Index>(
    row_perm_inv: &mut [I],
    leftmost: &mut [I],
    A: SymbolicSparseColMatRef<'_, I>,
    etree: EliminationTreeRef<'_, I>,
    stack: PodStack<'_>,
) -> RowPermInfo {
    let m = A.nrows();
    let n = A.ncols();
    assert!(all(
        row_perm_inv.len() == m + n,
        leftmost.len() == m,
        etree.len() == n,
        m + n <= I::MAX.zx(),
    ));

    let (next, stack) = stack.make_raw::<I>(m);
    let (head, stack) = stack.make_raw::<I>(n);
    let (tail, stack) = stack.make_raw::<I>(n);
    let (queue_len, _) = stack.make_raw::<I>(n);

    mem::fill_none(head);
    mem::fill_none(tail);
    mem::fill_zero(queue_len);
    mem::fill_none(leftmost);
    mem::fill_none(row_perm_inv);

    for j in (0..n).rev() {
        for i in A.row_indices_of_col(j) {
            leftmost[i] = I::truncate(j);
        }
    }

    // scanning in reverse order leaves each queue sorted in increasing order
    for i in (0..m).rev() {
        let Some(j) = leftmost[i].idx() else {
            continue;
        };
        if queue_len[j] == I::truncate(0) {
            tail[j] = I::truncate(i);
        }
        queue_len[j].incr();
        next[i] = head[j];
        head[j] = I::truncate(i);
    }

    let zero = I::truncate(0);
    let mut h_nnz = 0usize;
    let mut nrows_ext = m;
    for j in 0..n {
        let i = match head[j].idx() {
            Some(i) => i,
            None => {
                nrows_ext += 1;
                nrows_ext - 1
            }
        };
        // V(j, j)
        h_nnz += 1;
        row_perm_inv[i] = I::truncate(j);

        queue_len[j].decr();
        if queue_len[j] <= zero {
            continue;
        }

        // the remaining rows lie below the diagonal of V(:, j), and are then handed to the parent
        let len = queue_len[j];
        h_nnz += len.zx();
        if let Some(parent) = etree.parent(j) {
            if queue_len[parent] == zero {
                tail[parent] = tail[j];
            }
            next[tail[j].zx()] = head[parent];
            head[parent] = next[i];
            queue_len[parent] += len;
        }
    }

    let mut k = n;
    for i in 0..m {
        if row_perm_inv[i] < zero {
            row_perm_inv[i] = I::truncate(k);
            k += 1;
        }
    }

    RowPermInfo { nrows_ext, h_nnz }
}
