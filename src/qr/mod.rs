//! Left-looking sparse Householder QR factorization.
//!
//! The symbolic phase computes the column elimination tree of $A$ and its postordering, predicts the
//! exact number of nonzeros of $R$ with [`qr_col_ptrs`], and computes the row permutation and the
//! number of nonzeros of $V$ with [`qr_row_perm`]. Rows are padded with fictitious zero rows when
//! needed, so that every column has its own pivot row.
//!
//! The numeric phase, [`factorize_numeric_qr`], then computes $V$, $\beta$ and $R$ such that
//! $P A = Q R$, where $P$ is the row permutation and $Q = H_0 H_1 \dots H_{n - 1}$.
//!
//! # Example
//!
//! ```
//! use faer_sparse_qr::{
//!     dyn_stack::{GlobalPodBuffer, PodStack},
//!     qr::factorize_symbolic_qr,
//!     SparseColMatRef, SymbolicSparseColMatRef,
//! };
//!
//! // [[1, 0], [0, 1], [1, 1]]
//! let col_ptrs = [0i64, 2, 4];
//! let row_indices = [0i64, 2, 1, 2];
//! let values = [1.0f64, 1.0, 1.0, 1.0];
//! let A_symbolic = SymbolicSparseColMatRef::new_checked(3, 2, &col_ptrs, &row_indices);
//! let A = SparseColMatRef::new(A_symbolic, &values);
//!
//! let symbolic = factorize_symbolic_qr(A_symbolic).unwrap();
//!
//! let mut householder_col_ptrs = vec![0i64; 3];
//! let mut householder_row_indices = vec![0i64; symbolic.len_householder()];
//! let mut householder_values = vec![0.0f64; symbolic.len_householder()];
//! let mut r_col_ptrs = vec![0i64; 3];
//! let mut r_row_indices = vec![0i64; symbolic.len_r()];
//! let mut r_values = vec![0.0f64; symbolic.len_r()];
//! let mut beta = vec![0.0f64; 2];
//! let mut x = vec![0.0f64; symbolic.nrows_ext()];
//!
//! let qr = symbolic.factorize_numeric_qr(
//!     &mut householder_col_ptrs,
//!     &mut householder_row_indices,
//!     &mut householder_values,
//!     &mut r_col_ptrs,
//!     &mut r_row_indices,
//!     &mut r_values,
//!     &mut beta,
//!     &mut x,
//!     A,
//!     PodStack::new(&mut GlobalPodBuffer::new(
//!         symbolic.factorize_numeric_qr_req().unwrap(),
//!     )),
//! );
//!
//! // the diagonal of R is positive
//! let R = qr.r().to_dense();
//! assert!((R[0] - 2.0f64.sqrt()).abs() < 1e-12);
//! assert!((R[3] - 1.5f64.sqrt()).abs() < 1e-12);
//! ```

use crate::{
    etree::{etree, etree_req, postorder, postorder_req, EliminationTreeRef, EtreeMode},
    nomem,
    sparse::{transpose_symbolic, transpose_symbolic_req},
    try_zeroed, FaerError, Index, RealScalar, SparseColMatRef, SymbolicSparseColMatRef,
};
use alloc::vec::Vec;
use dyn_stack::{GlobalPodBuffer, PodStack, SizeOverflow, StackReq};
use equator::assert;
use reborrow::*;

mod col_ptrs;
mod numeric;
mod row_perm;

pub use col_ptrs::{qr_col_ptrs, qr_col_ptrs_req};
pub use numeric::{factorize_numeric_qr, factorize_numeric_qr_req, QrRef};
pub use row_perm::{qr_row_perm, qr_row_perm_req, RowPermInfo};

/// Symbolic structure of the sparse QR factorization of a matrix.
#[derive(Debug, Clone)]
pub struct SymbolicQr<I> {
    nrows: usize,
    ncols: usize,
    nrows_ext: usize,
    etree: Vec<I>,
    postorder: Vec<I>,
    r_row_ptrs: Vec<I>,
    row_perm_inv: Vec<I>,
    leftmost: Vec<I>,
    len_householder: usize,
}

impl<I: Index> SymbolicQr<I> {
    /// Returns the number of rows of the matrix.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Returns the number of columns of the matrix.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Returns the number of rows after padding with fictitious rows.
    #[inline]
    pub fn nrows_ext(&self) -> usize {
        self.nrows_ext
    }

    /// Returns the column elimination tree.
    #[inline]
    pub fn etree(&self) -> EliminationTreeRef<'_, I> {
        EliminationTreeRef { inner: &self.etree }
    }

    #[inline]
    pub fn postorder(&self) -> &[I] {
        &self.postorder
    }

    /// Returns the row pointers of $R$, i.e. the column pointers of $R^\top$.
    #[inline]
    pub fn r_row_ptrs(&self) -> &[I] {
        &self.r_row_ptrs
    }

    /// Returns the inverse row permutation. It has length `nrows + ncols`, the first `nrows_ext`
    /// entries of which are used.
    #[inline]
    pub fn row_perm_inv(&self) -> &[I] {
        &self.row_perm_inv
    }

    /// Returns the smallest column index of each row, or `-1` for empty rows.
    #[inline]
    pub fn leftmost(&self) -> &[I] {
        &self.leftmost
    }

    /// Returns the number of nonzeros of the Householder factor $V$.
    #[inline]
    pub fn len_householder(&self) -> usize {
        self.len_householder
    }

    /// Returns the number of nonzeros of the factor $R$.
    #[inline]
    pub fn len_r(&self) -> usize {
        self.r_row_ptrs[self.ncols].zx()
    }

    /// Computes the size and alignment of the workspace required to compute the numeric
    /// factorization.
    #[inline]
    pub fn factorize_numeric_qr_req(&self) -> Result<StackReq, SizeOverflow> {
        factorize_numeric_qr_req::<I>(self.nrows_ext, self.ncols)
    }

    /// Computes the numeric QR factorization of `A`, which must have the sparsity structure used
    /// to compute `self`.
    ///
    /// - `householder_col_ptrs` and `r_col_ptrs` have length `self.ncols() + 1`.
    /// - `householder_row_indices` and `householder_values` have length
    ///   `self.len_householder()`.
    /// - `r_row_indices` and `r_values` have length `self.len_r()`.
    /// - `beta` has length `self.ncols()`.
    /// - `x` has length `self.nrows_ext()`.
    #[track_caller]
    pub fn factorize_numeric_qr<'out, T: RealScalar>(
        &self,
        householder_col_ptrs: &'out mut [I],
        householder_row_indices: &'out mut [I],
        householder_values: &'out mut [T],
        r_col_ptrs: &'out mut [I],
        r_row_indices: &'out mut [I],
        r_values: &'out mut [T],
        beta: &'out mut [T],
        x: &mut [T],
        A: SparseColMatRef<'_, I, T>,
        stack: PodStack<'_>,
    ) -> QrRef<'out, I, T> {
        assert!(all(
            A.nrows() == self.nrows,
            A.ncols() == self.ncols,
            householder_row_indices.len() == self.len_householder,
            householder_values.len() == self.len_householder,
            r_row_indices.len() == self.len_r(),
            r_values.len() == self.len_r(),
        ));

        log::trace!(
            target: "faer_sparse_qr",
            "numeric qr: {} x {}, nnz(A) = {}",
            self.nrows,
            self.ncols,
            A.symbolic().compute_nnz(),
        );

        factorize_numeric_qr(
            householder_col_ptrs,
            householder_row_indices,
            householder_values,
            r_col_ptrs,
            r_row_indices,
            r_values,
            beta,
            x,
            A,
            self.etree(),
            &self.leftmost,
            &self.row_perm_inv,
            self.nrows_ext,
            stack,
        )
    }
}

/// Computes the symbolic structure of the sparse QR factorization of `A`.
///
/// # Errors
///
/// Returns [`FaerError::IndexOverflow`] if `A.nrows() + A.ncols()`, or the number of nonzeros of
/// one of the factors, exceeds `I::MAX`. Returns [`FaerError::OutOfMemory`] if an allocation
/// fails.
pub fn factorize_symbolic_qr<I: Index>(
    A: SymbolicSparseColMatRef<'_, I>,
) -> Result<SymbolicQr<I>, FaerError> {
    let m = A.nrows();
    let n = A.ncols();
    let A_nnz = A.compute_nnz();

    match m.checked_add(n) {
        Some(len) if len <= I::MAX.zx() => {}
        _ => return Err(FaerError::IndexOverflow),
    }

    let req = || -> Result<StackReq, SizeOverflow> {
        StackReq::try_all_of([
            // transpose
            StackReq::try_new::<I>(m + 1)?,
            StackReq::try_new::<I>(A_nnz)?,
            StackReq::try_any_of([
                etree_req::<I>(m, n, EtreeMode::AtA)?,
                postorder_req::<I>(n)?,
                transpose_symbolic_req::<I>(m, n)?,
                qr_col_ptrs_req::<I>(m, n)?,
                qr_row_perm_req::<I>(m, n)?,
            ])?,
        ])
    };

    let req = req().map_err(nomem)?;
    let mut mem = GlobalPodBuffer::try_new(req).map_err(nomem)?;
    let stack = PodStack::new(&mut mem);

    let mut etree_ = try_zeroed::<I>(n)?;
    let mut post = try_zeroed::<I>(n)?;
    let mut r_row_ptrs = try_zeroed::<I>(n + 1)?;
    let mut row_perm_inv = try_zeroed::<I>(m + n)?;
    let mut leftmost = try_zeroed::<I>(m)?;

    let (AT_col_ptrs, stack) = stack.make_raw::<I>(m + 1);
    let (AT_row_indices, mut stack) = stack.make_raw::<I>(A_nnz);

    let etree = etree(&mut etree_, A, EtreeMode::AtA, stack.rb_mut());
    postorder(&mut post, etree, stack.rb_mut());

    let AT = transpose_symbolic(AT_col_ptrs, AT_row_indices, A, stack.rb_mut());
    qr_col_ptrs(&mut r_row_ptrs, AT, etree, &post, stack.rb_mut())?;

    let RowPermInfo { nrows_ext, h_nnz } =
        qr_row_perm(&mut row_perm_inv, &mut leftmost, A, etree, stack.rb_mut());
    if h_nnz > I::MAX.zx() {
        return Err(FaerError::IndexOverflow);
    }

    log::debug!(
        target: "faer_sparse_qr",
        "symbolic qr: {} x {}, nnz(A) = {}, nnz(V) = {}, nnz(R) = {}, fictitious rows = {}",
        m,
        n,
        A_nnz,
        h_nnz,
        r_row_ptrs[n].zx(),
        nrows_ext - m,
    );

    Ok(SymbolicQr {
        nrows: m,
        ncols: n,
        nrows_ext,
        etree: etree_,
        postorder: post,
        r_row_ptrs,
        row_perm_inv,
        leftmost,
        len_householder: h_nnz,
    })
}
