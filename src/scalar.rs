//! Scalar abstraction used by the numeric kernels.
//!
//! The kernels never branch on scalar data. Every data-dependent choice goes through
//! [`RealScalar::faer_if_else`], whose arms are both evaluated by the caller before the selection
//! is made. This keeps the algorithms valid for scalar types that describe a computation rather
//! than a value, such as a node in an expression graph.

use core::fmt::Debug;

/// Real scalar type supporting eager conditional selection.
///
/// Predicates return a scalar truth value: one when the predicate holds, zero otherwise.
pub trait RealScalar: Clone + Debug + 'static {
    /// Returns the additive identity.
    fn faer_zero() -> Self;
    /// Returns the multiplicative identity.
    fn faer_one() -> Self;
    /// Converts `value` from `f64` to `Self`.
    /// The conversion may be lossy when converting to a type with less precision.
    fn faer_from_f64(value: f64) -> Self;

    /// Returns `self + rhs`.
    fn faer_add(self, rhs: Self) -> Self;
    /// Returns `self - rhs`.
    fn faer_sub(self, rhs: Self) -> Self;
    /// Returns `self * rhs`.
    fn faer_mul(self, rhs: Self) -> Self;
    /// Returns `self / rhs`.
    fn faer_div(self, rhs: Self) -> Self;
    /// Returns `-self`.
    fn faer_neg(self) -> Self;
    /// Returns the square root of `self`.
    fn faer_sqrt(self) -> Self;

    /// Returns the truth value of `self == 0`.
    fn faer_eq_zero(self) -> Self;
    /// Returns the truth value of `self <= 0`.
    fn faer_le_zero(self) -> Self;
    /// Returns the truth value of `self < 0`.
    fn faer_lt_zero(self) -> Self;

    /// Returns `if_true` if `cond` is nonzero, and `if_false` otherwise.
    ///
    /// Both arms are evaluated before the call, so neither may be skipped by the implementation.
    fn faer_if_else(cond: Self, if_true: Self, if_false: Self) -> Self;

    /// Returns `self * self`.
    #[inline(always)]
    fn faer_abs2(self) -> Self {
        self.clone().faer_mul(self)
    }
}

macro_rules! impl_real_scalar {
    ($ty: ty) => {
        impl RealScalar for $ty {
            #[inline(always)]
            fn faer_zero() -> Self {
                0.0
            }
            #[inline(always)]
            fn faer_one() -> Self {
                1.0
            }
            #[inline(always)]
            fn faer_from_f64(value: f64) -> Self {
                value as $ty
            }

            #[inline(always)]
            fn faer_add(self, rhs: Self) -> Self {
                self + rhs
            }
            #[inline(always)]
            fn faer_sub(self, rhs: Self) -> Self {
                self - rhs
            }
            #[inline(always)]
            fn faer_mul(self, rhs: Self) -> Self {
                self * rhs
            }
            #[inline(always)]
            fn faer_div(self, rhs: Self) -> Self {
                self / rhs
            }
            #[inline(always)]
            fn faer_neg(self) -> Self {
                -self
            }
            #[inline(always)]
            fn faer_sqrt(self) -> Self {
                libm::sqrt(self as f64) as $ty
            }

            #[inline(always)]
            fn faer_eq_zero(self) -> Self {
                (self == 0.0) as u8 as $ty
            }
            #[inline(always)]
            fn faer_le_zero(self) -> Self {
                (self <= 0.0) as u8 as $ty
            }
            #[inline(always)]
            fn faer_lt_zero(self) -> Self {
                (self < 0.0) as u8 as $ty
            }

            #[inline(always)]
            fn faer_if_else(cond: Self, if_true: Self, if_false: Self) -> Self {
                if cond != 0.0 {
                    if_true
                } else {
                    if_false
                }
            }
        }
    };
}

impl_real_scalar!(f32);
impl_real_scalar!(f64);
