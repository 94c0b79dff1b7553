//! Compressed column storage views.
//!
//! A matrix with `nrows` rows and `ncols` columns is stored as a column pointer array of length
//! `ncols + 1` and a row index array, such that the row indices of column `j` are
//! `row_indices[col_ptrs[j]..col_ptrs[j + 1]]`. The row indices of a column need not be sorted.

use crate::{mem, windows2, Index, RealScalar};
use core::iter::zip;
use dyn_stack::{PodStack, SizeOverflow, StackReq};
use equator::assert;

/// Symbolic view over the structure of a sparse matrix in column-major format.
#[derive(Debug)]
pub struct SymbolicSparseColMatRef<'a, I> {
    nrows: usize,
    ncols: usize,
    col_ptr: &'a [I],
    row_ind: &'a [I],
}

impl<I> Copy for SymbolicSparseColMatRef<'_, I> {}
impl<I> Clone for SymbolicSparseColMatRef<'_, I> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

/// View over a sparse matrix in column-major format, with one value per structural nonzero.
#[derive(Debug)]
pub struct SparseColMatRef<'a, I, T> {
    symbolic: SymbolicSparseColMatRef<'a, I>,
    values: &'a [T],
}

impl<I, T> Copy for SparseColMatRef<'_, I, T> {}
impl<I, T> Clone for SparseColMatRef<'_, I, T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, I: Index> SymbolicSparseColMatRef<'a, I> {
    /// Creates a new symbolic matrix view after asserting its invariants.
    ///
    /// Requires:
    /// * `nrows <= I::MAX` and `ncols <= I::MAX`,
    /// * `col_ptrs` has length `ncols + 1`, starts at zero and is non-decreasing,
    /// * `col_ptrs[ncols] <= row_indices.len()`,
    /// * every row index is in `0..nrows`.
    #[inline]
    #[track_caller]
    pub fn new_checked(
        nrows: usize,
        ncols: usize,
        col_ptrs: &'a [I],
        row_indices: &'a [I],
    ) -> Self {
        assert!(all(
            ncols <= I::MAX.zx(),
            nrows <= I::MAX.zx(),
            col_ptrs.len() == ncols + 1,
        ));
        assert!(col_ptrs[0] == I::truncate(0));
        for &[c, c_next] in windows2(col_ptrs) {
            assert!(c <= c_next);
        }
        assert!(col_ptrs[ncols].zx() <= row_indices.len());

        for &i in &row_indices[..col_ptrs[ncols].zx()] {
            assert!(all(i >= I::truncate(0), i.zx() < nrows));
        }

        Self {
            nrows,
            ncols,
            col_ptr: col_ptrs,
            row_ind: row_indices,
        }
    }

    /// Creates a new symbolic matrix view without checking the row indices or the monotonicity of
    /// the column pointers.
    ///
    /// The algorithms in this crate do not perform any unsafe operation, but produce meaningless
    /// results if the structure is malformed.
    #[inline]
    #[track_caller]
    pub fn new_unchecked(
        nrows: usize,
        ncols: usize,
        col_ptrs: &'a [I],
        row_indices: &'a [I],
    ) -> Self {
        assert!(all(
            ncols <= I::MAX.zx(),
            nrows <= I::MAX.zx(),
            col_ptrs.len() == ncols + 1,
        ));
        assert!(col_ptrs[ncols].zx() <= row_indices.len());

        Self {
            nrows,
            ncols,
            col_ptr: col_ptrs,
            row_ind: row_indices,
        }
    }

    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }
    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Returns the number of structural nonzeros.
    #[inline]
    pub fn compute_nnz(&self) -> usize {
        self.col_ptr[self.ncols].zx()
    }

    #[inline]
    pub fn col_ptrs(&self) -> &'a [I] {
        self.col_ptr
    }

    #[inline]
    pub fn row_indices(&self) -> &'a [I] {
        self.row_ind
    }

    /// Returns the range that the column `j` occupies in `self.row_indices()`.
    #[inline]
    #[track_caller]
    pub fn col_range(&self, j: usize) -> core::ops::Range<usize> {
        self.col_ptr[j].zx()..self.col_ptr[j + 1].zx()
    }

    #[inline]
    #[track_caller]
    pub fn row_indices_of_col_raw(&self, j: usize) -> &'a [I] {
        &self.row_ind[self.col_range(j)]
    }

    #[inline]
    #[track_caller]
    pub fn row_indices_of_col(
        &self,
        j: usize,
    ) -> impl 'a + ExactSizeIterator + DoubleEndedIterator<Item = usize> {
        self.row_indices_of_col_raw(j).iter().map(
            #[inline(always)]
            |&i| i.zx(),
        )
    }
}

impl<'a, I: Index, T> SparseColMatRef<'a, I, T> {
    #[inline]
    #[track_caller]
    pub fn new(symbolic: SymbolicSparseColMatRef<'a, I>, values: &'a [T]) -> Self {
        assert!(symbolic.compute_nnz() <= values.len());
        Self { symbolic, values }
    }

    #[inline]
    pub fn nrows(&self) -> usize {
        self.symbolic.nrows
    }
    #[inline]
    pub fn ncols(&self) -> usize {
        self.symbolic.ncols
    }

    #[inline]
    pub fn symbolic(&self) -> SymbolicSparseColMatRef<'a, I> {
        self.symbolic
    }

    #[inline]
    pub fn values(&self) -> &'a [T] {
        self.values
    }

    #[inline]
    #[track_caller]
    pub fn values_of_col(&self, j: usize) -> &'a [T] {
        &self.values[self.symbolic.col_range(j)]
    }

    #[inline]
    #[track_caller]
    pub fn row_indices_of_col_raw(&self, j: usize) -> &'a [I] {
        self.symbolic.row_indices_of_col_raw(j)
    }

    #[inline]
    #[track_caller]
    pub fn row_indices_of_col(
        &self,
        j: usize,
    ) -> impl 'a + ExactSizeIterator + DoubleEndedIterator<Item = usize> {
        self.symbolic.row_indices_of_col(j)
    }

    /// Returns the dense column-major representation of the matrix. Duplicate entries are summed.
    pub fn to_dense(&self) -> alloc::vec::Vec<T>
    where
        T: RealScalar,
    {
        let m = self.nrows();
        let mut dense = alloc::vec![T::faer_zero(); m * self.ncols()];
        for j in 0..self.ncols() {
            for (i, v) in zip(self.row_indices_of_col(j), self.values_of_col(j)) {
                let dst = &mut dense[i + m * j];
                *dst = dst.clone().faer_add(v.clone());
            }
        }
        dense
    }
}

/// Computes the size and alignment of the workspace required to compute the structure of the
/// transpose of a matrix with dimensions `(nrows, ncols)`.
#[inline]
pub fn transpose_symbolic_req<I: Index>(
    nrows: usize,
    ncols: usize,
) -> Result<StackReq, SizeOverflow> {
    let _ = ncols;
    StackReq::try_new::<I>(nrows)
}

/// Computes the structure of the transpose of `A`, whose rows become columns.
///
/// - `new_col_ptrs` has length `A.nrows() + 1`.
/// - `new_row_indices` has length `A.compute_nnz()`.
///
/// Within each column of the output, the row indices are sorted in increasing order.
#[track_caller]
pub fn transpose_symbolic<'a, I: Index>(
    new_col_ptrs: &'a mut [I],
    new_row_indices: &'a mut [I],
    A: SymbolicSparseColMatRef<'_, I>,
    stack: PodStack<'_>,
) -> SymbolicSparseColMatRef<'a, I> {
    let m = A.nrows();
    let n = A.ncols();
    assert!(all(
        new_col_ptrs.len() == m + 1,
        new_row_indices.len() == A.compute_nnz(),
    ));

    let (col_count, _) = stack.make_raw::<I>(m);
    mem::fill_zero(col_count);

    // can't overflow because the total count is A.compute_nnz() <= I::MAX
    for j in 0..n {
        for i in A.row_indices_of_col(j) {
            col_count[i].incr();
        }
    }

    new_col_ptrs[0] = I::truncate(0);
    for i in 0..m {
        let pi = new_col_ptrs[i];
        new_col_ptrs[i + 1] = pi + col_count[i];
        col_count[i] = pi;
    }

    for j in 0..n {
        for i in A.row_indices_of_col(j) {
            let ci = &mut col_count[i];
            new_row_indices[ci.zx()] = I::truncate(j);
            ci.incr();
        }
    }

    SymbolicSparseColMatRef {
        nrows: n,
        ncols: m,
        col_ptr: new_col_ptrs,
        row_ind: new_row_indices,
    }
}
