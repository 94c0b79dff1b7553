//! Sparse Householder QR factorization.
//!
//! Given a sparse matrix $A$ in compressed column form, this crate computes $A = QR$ where $Q$ is
//! represented implicitly by a sparse matrix $V$ of Householder vectors and a vector $\beta$ of
//! scaling coefficients, such that
//! $$ Q = (I - \beta_0 v_0 v_0^\top) \cdot (I - \beta_1 v_1 v_1^\top) \dots $$
//! and $R$ is sparse and upper triangular in the permuted row space.
//!
//! The factorization is split into a symbolic phase, which only depends on the sparsity pattern
//! of $A$, and a numeric phase:
//! - [`etree::etree`] computes the column elimination tree,
//! - [`etree::postorder`] computes a postordering of that tree,
//! - [`qr::qr_col_ptrs`] predicts the row pointers of $R$, whose total is the exact number of
//!   nonzeros of $R$,
//! - [`qr::qr_row_perm`] computes the row permutation, padding fictitious rows where needed, and
//!   the number of nonzeros of $V$,
//! - [`qr::factorize_numeric_qr`] computes $V$, $\beta$ and $R$.
//!
//! [`qr::SymbolicQr`] runs the whole symbolic phase and owns its outputs.
//!
//! None of the kernels allocate. Integer workspaces are provided through a
//! [`dyn_stack::PodStack`] whose size is given by the corresponding `*_req` function.

#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(clippy::too_many_arguments)]
#![allow(non_snake_case)]
#![forbid(elided_lifetimes_in_paths)]

extern crate alloc;

use bytemuck::Pod;

pub use dyn_stack;
pub use reborrow;

#[cfg(test)]
macro_rules! monomorphize_test {
    ($name: ident) => {
        monomorphize_test!($name, i32);
        monomorphize_test!($name, i64);
    };

    ($name: ident, $ty: ident) => {
        paste::paste! {
            #[test]
            fn [<$name _ $ty>]() {
                $name::<$ty>();
            }
        }
    };
}

pub mod etree;
pub mod householder;
pub mod qr;
pub mod scalar;
pub mod sparse;

mod mem;

pub use scalar::RealScalar;
pub use sparse::{SparseColMatRef, SymbolicSparseColMatRef};

/// Errors that can occur in sparse algorithms.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
#[non_exhaustive]
pub enum FaerError {
    /// An index exceeding the maximum value (`I::MAX` for a given index type `I`).
    IndexOverflow,
    /// Memory allocation failed.
    OutOfMemory,
}

impl core::fmt::Display for FaerError {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Debug::fmt(self, f)
    }
}

#[cfg(feature = "std")]
#[cfg_attr(docsrs, doc(cfg(feature = "std")))]
impl std::error::Error for FaerError {}

#[inline]
#[track_caller]
fn try_zeroed<I: Pod>(n: usize) -> Result<alloc::vec::Vec<I>, FaerError> {
    let mut v = alloc::vec::Vec::new();
    v.try_reserve_exact(n).map_err(nomem)?;
    v.resize(n, I::zeroed());
    Ok(v)
}

#[inline]
fn nomem<T>(_: T) -> FaerError {
    FaerError::OutOfMemory
}

#[inline]
fn windows2<I>(slice: &[I]) -> impl DoubleEndedIterator<Item = &[I; 2]> {
    slice
        .windows(2)
        .map(|window| unsafe { &*(window.as_ptr() as *const [I; 2]) })
}

mod seal {
    pub trait Seal {}

    impl Seal for i32 {}
    impl Seal for i64 {}
}

/// Signed integer type used for the sparse indices.
///
/// Negative values are reserved for the "none" sentinel, e.g. a root of the elimination tree, or a
/// row that has no nonzeros.
pub trait Index:
    seal::Seal
    + core::ops::Add<Output = Self>
    + core::ops::Sub<Output = Self>
    + core::ops::AddAssign
    + core::ops::SubAssign
    + Copy
    + Pod
    + Eq
    + Ord
    + Send
    + Sync
    + 'static
    + core::fmt::Debug
{
    const MAX: Self;

    #[must_use]
    fn truncate(value: usize) -> Self;

    /// zero extend
    #[must_use]
    fn zx(self) -> usize;

    /// Returns `None` if `self` is negative, and the zero extended value otherwise.
    #[inline]
    fn idx(self) -> Option<usize> {
        if self < Self::truncate(0) {
            None
        } else {
            Some(self.zx())
        }
    }

    #[inline]
    fn incr(&mut self) {
        *self += Self::truncate(1)
    }
    #[inline]
    fn decr(&mut self) {
        *self -= Self::truncate(1)
    }
}

macro_rules! impl_index {
    ($ty: ty, $unsigned: ty) => {
        impl Index for $ty {
            const MAX: Self = Self::MAX;

            #[inline(always)]
            fn truncate(value: usize) -> Self {
                const _: () = {
                    core::assert!(<$ty>::BITS <= usize::BITS);
                };
                value as isize as Self
            }

            #[inline(always)]
            fn zx(self) -> usize {
                self as $unsigned as usize
            }
        }
    };
}

#[cfg(any(target_pointer_width = "32", target_pointer_width = "64"))]
impl_index!(i32, u32);
#[cfg(target_pointer_width = "64")]
impl_index!(i64, u64);
