use crate::{
    etree::EliminationTreeRef,
    householder::{happly, happly_col, house},
    mem, Index, RealScalar, SparseColMatRef, SymbolicSparseColMatRef,
};
use core::iter::zip;
use dyn_stack::{PodStack, SizeOverflow, StackReq};
use equator::assert;

/// Sparse QR factors of a matrix, borrowed from the output buffers of
/// [`factorize_numeric_qr`].
#[derive(Debug)]
pub struct QrRef<'a, I, T> {
    householder: SparseColMatRef<'a, I, T>,
    r: SparseColMatRef<'a, I, T>,
    beta: &'a [T],
}

impl<I, T> Copy for QrRef<'_, I, T> {}
impl<I, T> Clone for QrRef<'_, I, T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, I: Index, T: RealScalar> QrRef<'a, I, T> {
    /// Returns the number of rows of the factorized matrix, after padding with fictitious rows.
    #[inline]
    pub fn nrows_ext(&self) -> usize {
        self.householder.nrows()
    }

    #[inline]
    pub fn ncols(&self) -> usize {
        self.householder.ncols()
    }

    /// Returns the Householder vectors, with dimensions `(nrows_ext, ncols)`. The first entry of
    /// each column is its unit diagonal.
    #[inline]
    pub fn householder(&self) -> SparseColMatRef<'a, I, T> {
        self.householder
    }

    /// Returns the upper triangular factor, with dimensions `(ncols, ncols)`. The last entry of each
    /// column is its diagonal.
    ///
    /// $R$ is the leading `ncols` rows of the `(nrows_ext, ncols)` triangular factor. The
    /// remaining rows are structurally zero, so they are not represented.
    #[inline]
    pub fn r(&self) -> SparseColMatRef<'a, I, T> {
        self.r
    }

    /// Returns the Householder scaling factors.
    #[inline]
    pub fn beta(&self) -> &'a [T] {
        self.beta
    }

    /// Computes $Q^\top x$ in place, where `x` is indexed by the permuted rows and has length
    /// `self.nrows_ext()`.
    #[track_caller]
    pub fn apply_qt_in_place(&self, x: &mut [T]) {
        assert!(x.len() == self.nrows_ext());
        for j in 0..self.ncols() {
            happly(self.householder, j, self.beta[j].clone(), x);
        }
    }

    /// Computes $Q x$ in place, where `x` is indexed by the permuted rows and has length
    /// `self.nrows_ext()`.
    #[track_caller]
    pub fn apply_q_in_place(&self, x: &mut [T]) {
        assert!(x.len() == self.nrows_ext());
        for j in (0..self.ncols()).rev() {
            happly(self.householder, j, self.beta[j].clone(), x);
        }
    }
}

/// Computes the size and alignment of the workspace required to compute the numeric QR
/// factorization of a matrix with `ncols` columns, whose padded row count is `nrows_ext`.
#[inline]
pub fn factorize_numeric_qr_req<I: Index>(
    nrows_ext: usize,
    ncols: usize,
) -> Result<StackReq, SizeOverflow> {
    StackReq::try_all_of([
        StackReq::try_new::<I>(ncols)?,
        StackReq::try_new::<I>(nrows_ext)?,
    ])
}

/// Computes the numeric QR factorization of `A`, column by column.
///
/// For each column $j$, the reflections $H_k$ for every $k$ in the pattern of $R(:, j)$ are applied
/// to the scattered column, in topological order. The rows that remain below the diagonal form
/// $V(:, j)$, from which the reflection $H_j$ and the diagonal entry $R(j, j)$ are computed.
/// Duplicate entries of `A` are summed.
///
/// - `householder_col_ptrs` has length `A.ncols() + 1`.
/// - `householder_row_indices` and `householder_values` have length at least `h_nnz`, as computed
///   by [`qr_row_perm`](super::qr_row_perm).
/// - `r_col_ptrs` has length `A.ncols() + 1`. It is overwritten with the column pointers of $R$.
/// - `r_row_indices` and `r_values` have length at least the number of nonzeros of $R$, as
///   computed by [`qr_col_ptrs`](super::qr_col_ptrs).
/// - `beta` has length `A.ncols()`.
/// - `x` has length `nrows_ext`. It is used as dense scratch space, and is zero on output.
/// - `etree`, `leftmost`, `row_perm_inv` and `nrows_ext` are the outputs of the symbolic analysis.
///
/// The row indices of each column of $V$ and $R$ are not sorted.
#[track_caller]
pub fn factorize_numeric_qr<'out, I: Index, T: RealScalar>(
    householder_col_ptrs: &'out mut [I],
    householder_row_indices: &'out mut [I],
    householder_values: &'out mut [T],
    r_col_ptrs: &'out mut [I],
    r_row_indices: &'out mut [I],
    r_values: &'out mut [T],
    beta: &'out mut [T],
    x: &mut [T],
    A: SparseColMatRef<'_, I, T>,
    etree: EliminationTreeRef<'_, I>,
    leftmost: &[I],
    row_perm_inv: &[I],
    nrows_ext: usize,
    stack: PodStack<'_>,
) -> QrRef<'out, I, T> {
    let m = A.nrows();
    let n = A.ncols();
    assert!(all(
        householder_col_ptrs.len() == n + 1,
        r_col_ptrs.len() == n + 1,
        householder_row_indices.len() == householder_values.len(),
        r_row_indices.len() == r_values.len(),
        beta.len() == n,
        x.len() == nrows_ext,
        etree.len() == n,
        leftmost.len() == m,
        row_perm_inv.len() >= m,
        nrows_ext >= m,
        nrows_ext >= n,
    ));

    let (stack_, stack) = stack.make_raw::<I>(n);
    let (marks, _) = stack.make_raw::<I>(nrows_ext);

    mem::fill_none(marks);
    for xi in x.iter_mut() {
        *xi = T::faer_zero();
    }

    let mut r_pos = 0usize;
    let mut h_pos = 0usize;
    for j in 0..n {
        let j_ = I::truncate(j);
        r_col_ptrs[j] = I::truncate(r_pos);
        householder_col_ptrs[j] = I::truncate(h_pos);
        let h_start = h_pos;

        marks[j] = j_;
        householder_row_indices[h_pos] = j_;
        h_pos += 1;

        // scatter A(:, j) into x, and find the pattern of R(:, j) in topological order
        let mut top = n;
        for (i, value) in zip(A.row_indices_of_col(j), A.values_of_col(j)) {
            let mut node = leftmost[i].zx();
            let mut len = 0usize;
            while marks[node] != j_ {
                stack_[len] = I::truncate(node);
                len += 1;
                marks[node] = j_;
                node = etree.inner[node].zx();
            }
            stack_.copy_within(0..len, top - len);
            top -= len;

            let pi = row_perm_inv[i].zx();
            x[pi] = x[pi].clone().faer_add(value.clone());
            if pi > j && marks[pi] < j_ {
                householder_row_indices[h_pos] = I::truncate(pi);
                h_pos += 1;
                marks[pi] = j_;
            }
        }

        for k in top..n {
            let i = stack_[k].zx();
            let h_range = householder_col_ptrs[i].zx()..householder_col_ptrs[i + 1].zx();

            happly_col(
                &householder_row_indices[h_range.clone()],
                &householder_values[h_range.clone()],
                beta[i].clone(),
                x,
            );
            r_row_indices[r_pos] = I::truncate(i);
            r_values[r_pos] = core::mem::replace(&mut x[i], T::faer_zero());
            r_pos += 1;

            // the rows of V(:, i) are inherited by its parent
            if etree.parent(i) == Some(j) {
                for idx in h_range {
                    let i2 = householder_row_indices[idx];
                    if marks[i2.zx()] < j_ {
                        marks[i2.zx()] = j_;
                        householder_row_indices[h_pos] = i2;
                        h_pos += 1;
                    }
                }
            }
        }

        // gather V(:, j)
        for idx in h_start..h_pos {
            let i = householder_row_indices[idx].zx();
            householder_values[idx] = core::mem::replace(&mut x[i], T::faer_zero());
        }

        let (beta_j, r_jj) = house(&mut householder_values[h_start..h_pos]);
        beta[j] = beta_j;
        r_row_indices[r_pos] = j_;
        r_values[r_pos] = r_jj;
        r_pos += 1;
    }
    r_col_ptrs[n] = I::truncate(r_pos);
    householder_col_ptrs[n] = I::truncate(h_pos);

    let householder_col_ptrs: &'out [I] = householder_col_ptrs;
    let householder_row_indices: &'out [I] = householder_row_indices;
    let r_col_ptrs: &'out [I] = r_col_ptrs;
    let r_row_indices: &'out [I] = r_row_indices;
    let householder_values: &'out [T] = householder_values;
    let r_values: &'out [T] = r_values;
    let beta: &'out [T] = beta;

    QrRef {
        householder: SparseColMatRef::new(
            SymbolicSparseColMatRef::new_unchecked(
                nrows_ext,
                n,
                householder_col_ptrs,
                householder_row_indices,
            ),
            householder_values,
        ),
        r: SparseColMatRef::new(
            SymbolicSparseColMatRef::new_unchecked(n, n, r_col_ptrs, r_row_indices),
            r_values,
        ),
        beta,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        etree::{etree, etree_req, EtreeMode},
        qr::{qr_row_perm, qr_row_perm_req},
        sparse::tests::csc_from_cols,
    };
    use alloc::{vec, vec::Vec};
    use assert_approx_eq::assert_approx_eq;
    use dyn_stack::GlobalPodBuffer;
    use equator::assert;

    struct Factors<I> {
        nrows_ext: usize,
        row_perm_inv: Vec<I>,
        householder_col_ptrs: Vec<I>,
        householder_row_indices: Vec<I>,
        householder_values: Vec<f64>,
        r_col_ptrs: Vec<I>,
        r_row_indices: Vec<I>,
        r_values: Vec<f64>,
        beta: Vec<f64>,
    }

    /// Runs the kernels with generously sized output buffers.
    fn factorize<I: Index>(nrows: usize, cols: &[&[usize]], values: &[f64]) -> Factors<I> {
        let ncols = cols.len();
        let (col_ptrs, row_indices) = csc_from_cols::<I>(cols);
        let A = SparseColMatRef::new(
            SymbolicSparseColMatRef::new_checked(nrows, ncols, &col_ptrs, &row_indices),
            values,
        );
        let zero = I::truncate(0);

        let mut parent = vec![zero; ncols];
        let etree = etree(
            &mut parent,
            A.symbolic(),
            EtreeMode::AtA,
            PodStack::new(&mut GlobalPodBuffer::new(
                etree_req::<I>(nrows, ncols, EtreeMode::AtA).unwrap(),
            )),
        );
        let mut row_perm_inv = vec![zero; nrows + ncols];
        let mut leftmost = vec![zero; nrows];
        let info = qr_row_perm(
            &mut row_perm_inv,
            &mut leftmost,
            A.symbolic(),
            etree,
            PodStack::new(&mut GlobalPodBuffer::new(
                qr_row_perm_req::<I>(nrows, ncols).unwrap(),
            )),
        );
        let nrows_ext = info.nrows_ext;

        let mut f = Factors {
            nrows_ext,
            row_perm_inv: row_perm_inv.clone(),
            householder_col_ptrs: vec![zero; ncols + 1],
            householder_row_indices: vec![zero; info.h_nnz],
            householder_values: vec![0.0; info.h_nnz],
            r_col_ptrs: vec![zero; ncols + 1],
            r_row_indices: vec![zero; ncols * ncols],
            r_values: vec![0.0; ncols * ncols],
            beta: vec![0.0; ncols],
        };
        let mut x = vec![1.0; nrows_ext];
        factorize_numeric_qr(
            &mut f.householder_col_ptrs,
            &mut f.householder_row_indices,
            &mut f.householder_values,
            &mut f.r_col_ptrs,
            &mut f.r_row_indices,
            &mut f.r_values,
            &mut f.beta,
            &mut x,
            A,
            etree,
            &leftmost,
            &row_perm_inv,
            nrows_ext,
            PodStack::new(&mut GlobalPodBuffer::new(
                factorize_numeric_qr_req::<I>(nrows_ext, ncols).unwrap(),
            )),
        );
        assert!(x.iter().all(|&x| x == 0.0));
        f
    }

    fn qr_ref<I: Index>(f: &Factors<I>) -> QrRef<'_, I, f64> {
        let ncols = f.beta.len();
        QrRef {
            householder: SparseColMatRef::new(
                SymbolicSparseColMatRef::new_checked(
                    f.nrows_ext,
                    ncols,
                    &f.householder_col_ptrs,
                    &f.householder_row_indices,
                ),
                &f.householder_values,
            ),
            r: SparseColMatRef::new(
                SymbolicSparseColMatRef::new_checked(
                    ncols,
                    ncols,
                    &f.r_col_ptrs,
                    &f.r_row_indices,
                ),
                &f.r_values,
            ),
            beta: &f.beta,
        }
    }

    fn test_numeric_qr_small<I: Index>() {
        let I = I::truncate;
        // [[1, 0], [0, 1], [1, 1]]
        let f = factorize::<I>(3, &[&[0, 2], &[1, 2]], &[1.0, 1.0, 1.0, 1.0]);
        let qr = qr_ref(&f);

        assert!(f.householder_col_ptrs == [0, 2, 4].map(I));
        assert!(f.r_col_ptrs == [0, 1, 3].map(I));

        let V = qr.householder();
        // unit leading entries
        for j in 0..2 {
            assert!(V.row_indices_of_col_raw(j)[0] == I(j));
            assert!(V.values_of_col(j)[0] == 1.0);
        }

        // R is upper triangular with a positive diagonal
        let R = qr.r().to_dense();
        assert_approx_eq!(R[0], 2.0f64.sqrt());
        assert_approx_eq!(R[2], 1.0 / 2.0f64.sqrt());
        assert_approx_eq!(R[3], 1.5f64.sqrt());
        assert!(R[1] == 0.0);
    }

    fn test_numeric_qr_zero_column<I: Index>() {
        // the middle column is structurally empty, the last one is numerically zero
        let f = factorize::<I>(3, &[&[0, 1], &[], &[2]], &[3.0, 4.0, 0.0]);
        let qr = qr_ref(&f);
        let R = qr.r().to_dense();

        assert_approx_eq!(R[0], 5.0);
        assert!(all(R[4] == 0.0, R[8] == 0.0));
        assert!(all(f.beta[1] == 0.0, f.beta[2] == 0.0));
    }

    /// Checks that the permuted matrix is reproduced by applying Q to the columns of R.
    pub(crate) fn assert_reconstructs<I: Index>(
        qr: QrRef<'_, I, f64>,
        row_perm_inv: &[I],
        A: SparseColMatRef<'_, I, f64>,
    ) {
        let m = A.nrows();
        let n = A.ncols();
        let nrows_ext = qr.nrows_ext();
        let A = A.to_dense();
        let R = qr.r().to_dense();

        for j in 0..n {
            let mut y = vec![0.0; nrows_ext];
            y[..n].copy_from_slice(&R[j * n..(j + 1) * n]);
            qr.apply_q_in_place(&mut y);

            let mut expected = vec![0.0; nrows_ext];
            for i in 0..m {
                expected[row_perm_inv[i].zx()] = A[i + m * j];
            }
            for (y, expected) in zip(&y, &expected) {
                assert_approx_eq!(*y, *expected, 1e-10);
            }

            // and that Q^T brings it back to R
            qr.apply_qt_in_place(&mut y);
            for i in 0..nrows_ext {
                let r_ij = if i < n { R[i + n * j] } else { 0.0 };
                assert_approx_eq!(y[i], r_ij, 1e-10);
            }
        }
    }

    fn test_numeric_qr_duplicates<I: Index>() {
        let I = I::truncate;
        // [[1, 2], [1, 0]] with the (0, 0) entry split in two
        let cols: &[&[usize]] = &[&[0, 1, 0], &[0]];
        let values = [0.5, 1.0, 0.5, 2.0];
        let f = factorize::<I>(2, cols, &values);

        let (col_ptrs, row_indices) = csc_from_cols::<I>(cols);
        let A = SparseColMatRef::new(
            SymbolicSparseColMatRef::new_checked(2, 2, &col_ptrs, &row_indices),
            &values,
        );
        assert!(f.r_col_ptrs[2] == I(3));
        assert_reconstructs(qr_ref(&f), &f.row_perm_inv, A);
    }

    monomorphize_test!(test_numeric_qr_small);
    monomorphize_test!(test_numeric_qr_zero_column);
    monomorphize_test!(test_numeric_qr_duplicates);
}
