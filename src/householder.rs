//! Householder reflections.
//!
//! A Householder reflection is a linear transformation that describes a reflection about a
//! hyperplane that crosses the origin of the space. It is stored as a vector $v$ and a scaling
//! factor $\beta$, such that the transformation in matrix form is
//! $$H = I - \beta v v^\top.$$
//!
//! The vectors produced by [`house`] are normalized so that their leading component is one. In the
//! sparse factorization, they are stored as the columns of a sparse matrix $V$, whose leading
//! component sits on the diagonal.

use crate::{Index, RealScalar, SparseColMatRef};
use core::iter::zip;
use equator::assert;

/// Computes the Householder reflection $I - \beta v v^\top$ such that when multiplied by $x$ from
/// the left, the result is $s e_0$, where $s = \|x\|$. $\beta$ and $s$ are returned, in that
/// order.
///
/// On input, `x` contains the vector to reflect. On output, it contains $v$, with $v_0 = 1$.
///
/// When the trailing part of $x$ is zero, the reflection is the identity ($\beta = 0$) if
/// $x_0 \geq 0$, and the negation of the first component ($\beta = 2$) otherwise.
///
/// The selection between the different cases is done with [`RealScalar::faer_if_else`], after every
/// candidate has been computed. No control flow depends on the values of `x`.
///
/// # Panics
///
/// Panics if `x` is empty.
#[track_caller]
pub fn house<T: RealScalar>(x: &mut [T]) -> (T, T) {
    assert!(!x.is_empty());

    let x0 = x[0].clone();
    let mut sigma = T::faer_zero();
    for xi in &x[1..] {
        sigma = sigma.faer_add(xi.clone().faer_abs2());
    }
    let s = x0.clone().faer_abs2().faer_add(sigma.clone()).faer_sqrt();

    let sigma_is_zero = sigma.clone().faer_eq_zero();
    let x0_nonpos = x0.clone().faer_le_zero();
    let x0_neg = x0.clone().faer_lt_zero();

    // v = x - s e_0, with the leading component computed without cancellation when x0 > 0
    let v0 = T::faer_if_else(
        sigma_is_zero.clone(),
        T::faer_one(),
        T::faer_if_else(
            x0_nonpos,
            x0.clone().faer_sub(s.clone()),
            sigma.faer_neg().faer_div(x0.faer_add(s.clone())),
        ),
    );

    let beta = T::faer_if_else(
        sigma_is_zero,
        T::faer_from_f64(2.0).faer_mul(x0_neg),
        v0.clone().faer_neg().faer_div(s.clone()),
    );

    let v0_inv = T::faer_one().faer_div(v0);
    for xi in &mut x[1..] {
        *xi = xi.clone().faer_mul(v0_inv.clone());
    }
    x[0] = T::faer_one();

    (beta, s)
}

/// Applies the Householder reflection $I - \beta v v^\top$ to the dense vector `x` in place, where
/// $v$ is the sparse vector with nonzero `values` at `row_indices`.
#[track_caller]
pub fn happly_col<I: Index, T: RealScalar>(
    row_indices: &[I],
    values: &[T],
    beta: T,
    x: &mut [T],
) {
    assert!(row_indices.len() == values.len());

    let mut tau = T::faer_zero();
    for (&i, v) in zip(row_indices, values) {
        tau = tau.faer_add(v.clone().faer_mul(x[i.zx()].clone()));
    }
    let tau = beta.faer_mul(tau);

    for (&i, v) in zip(row_indices, values) {
        let xi = &mut x[i.zx()];
        *xi = xi.clone().faer_sub(v.clone().faer_mul(tau.clone()));
    }
}

/// Applies the `i`-th Householder reflection, stored in column `i` of `V`, with scaling factor
/// `beta`, to the dense vector `x` in place.
///
/// `x` has length `V.nrows()`.
#[track_caller]
pub fn happly<I: Index, T: RealScalar>(
    V: SparseColMatRef<'_, I, T>,
    i: usize,
    beta: T,
    x: &mut [T],
) {
    assert!(x.len() == V.nrows());
    happly_col(V.row_indices_of_col_raw(i), V.values_of_col(i), beta, x);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SymbolicSparseColMatRef;
    use alloc::{rc::Rc, vec::Vec};
    use assert_approx_eq::assert_approx_eq;
    use equator::assert;
    use rand::{Rng, SeedableRng};

    fn reflect(x: &[f64]) -> (Vec<f64>, f64, f64) {
        let n = x.len();
        let mut v = x.to_vec();
        let (beta, s) = house(&mut v);

        let row_indices: Vec<i32> = (0..n as i32).collect();
        let mut y = x.to_vec();
        happly_col(&row_indices, &v, beta, &mut y);
        (y, beta, s)
    }

    #[test]
    fn test_house_random() {
        let mut gen = rand::rngs::StdRng::seed_from_u64(0);
        for n in 1..12 {
            for _ in 0..10 {
                let x: Vec<f64> = (0..n).map(|_| gen.gen_range(-1.0..1.0)).collect();
                let norm = x.iter().map(|x| x * x).sum::<f64>().sqrt();

                let (y, _, s) = reflect(&x);
                assert_approx_eq!(s, norm);
                assert_approx_eq!(y[0], norm);
                for yi in &y[1..] {
                    assert_approx_eq!(*yi, 0.0);
                }
            }
        }
    }

    #[test]
    fn test_house_unit_leading_entry() {
        let mut v = [3.0f64, 4.0];
        let (beta, s) = house(&mut v);
        assert!(v[0] == 1.0);
        assert_approx_eq!(s, 5.0);
        // v = (x - 5 e0) / (3 - 5) = (1, -2)
        assert_approx_eq!(v[1], -2.0);
        assert_approx_eq!(beta, 0.4);

        let mut v = [-3.0f64, 4.0];
        let (beta, s) = house(&mut v);
        assert!(v[0] == 1.0);
        assert_approx_eq!(s, 5.0);
        assert_approx_eq!(v[1], -0.5);
        assert_approx_eq!(beta, 1.6);
    }

    #[test]
    fn test_house_degenerate() {
        let (y, beta, s) = reflect(&[0.0]);
        assert!(all(y == [0.0], beta == 0.0, s == 0.0));

        let (y, beta, s) = reflect(&[0.0, 0.0, 0.0]);
        assert!(all(y == [0.0, 0.0, 0.0], beta == 0.0, s == 0.0));

        let (y, beta, s) = reflect(&[2.5, 0.0]);
        assert!(all(y == [2.5, 0.0], beta == 0.0, s == 2.5));

        let (y, beta, s) = reflect(&[-2.5, 0.0]);
        assert!(all(y == [2.5, 0.0], beta == 2.0, s == 2.5));

        let mut v = [-1.0f32];
        let (beta, s) = house(&mut v);
        assert!(all(v == [1.0], beta == 2.0, s == 1.0));
    }

    fn test_happly_sparse<I: Index>() {
        let I = I::truncate;

        // v = e0 + 2 e3, stored as column 1 of a 5x2 matrix
        let col_ptrs = [0, 1, 3].map(I);
        let row_indices = [4, 0, 3].map(I);
        let values = [7.0f64, 1.0, 2.0];
        let V = SparseColMatRef::new(
            SymbolicSparseColMatRef::new_checked(5, 2, &col_ptrs, &row_indices),
            &values,
        );

        let beta = 0.4;
        let mut x = [1.0, 10.0, 20.0, 1.0, 30.0];
        happly(V, 1, beta, &mut x);

        // tau = 0.4 * (1 + 2) = 1.2
        assert_approx_eq!(x[0], 1.0 - 1.2);
        assert_approx_eq!(x[3], 1.0 - 2.4);
        assert!(all(x[1] == 10.0, x[2] == 20.0, x[4] == 30.0));
    }

    /// Scalar type recording the operations applied to it as an expression graph.
    #[derive(Clone, Debug)]
    struct Expr(Rc<Node>);

    #[derive(Debug)]
    enum Node {
        Const(f64),
        Var(usize),
        Add(Expr, Expr),
        Sub(Expr, Expr),
        Mul(Expr, Expr),
        Div(Expr, Expr),
        Neg(Expr),
        Sqrt(Expr),
        EqZero(Expr),
        LeZero(Expr),
        LtZero(Expr),
        IfElse(Expr, Expr, Expr),
    }

    impl Expr {
        fn new(node: Node) -> Self {
            Self(Rc::new(node))
        }

        fn eval(&self, vars: &[f64]) -> f64 {
            match &*self.0 {
                Node::Const(c) => *c,
                Node::Var(i) => vars[*i],
                Node::Add(a, b) => a.eval(vars) + b.eval(vars),
                Node::Sub(a, b) => a.eval(vars) - b.eval(vars),
                Node::Mul(a, b) => a.eval(vars) * b.eval(vars),
                Node::Div(a, b) => a.eval(vars) / b.eval(vars),
                Node::Neg(a) => -a.eval(vars),
                Node::Sqrt(a) => a.eval(vars).sqrt(),
                Node::EqZero(a) => (a.eval(vars) == 0.0) as u8 as f64,
                Node::LeZero(a) => (a.eval(vars) <= 0.0) as u8 as f64,
                Node::LtZero(a) => (a.eval(vars) < 0.0) as u8 as f64,
                Node::IfElse(c, a, b) => {
                    let (c, a, b) = (c.eval(vars), a.eval(vars), b.eval(vars));
                    if c != 0.0 {
                        a
                    } else {
                        b
                    }
                }
            }
        }
    }

    impl RealScalar for Expr {
        fn faer_zero() -> Self {
            Self::new(Node::Const(0.0))
        }
        fn faer_one() -> Self {
            Self::new(Node::Const(1.0))
        }
        fn faer_from_f64(value: f64) -> Self {
            Self::new(Node::Const(value))
        }
        fn faer_add(self, rhs: Self) -> Self {
            Self::new(Node::Add(self, rhs))
        }
        fn faer_sub(self, rhs: Self) -> Self {
            Self::new(Node::Sub(self, rhs))
        }
        fn faer_mul(self, rhs: Self) -> Self {
            Self::new(Node::Mul(self, rhs))
        }
        fn faer_div(self, rhs: Self) -> Self {
            Self::new(Node::Div(self, rhs))
        }
        fn faer_neg(self) -> Self {
            Self::new(Node::Neg(self))
        }
        fn faer_sqrt(self) -> Self {
            Self::new(Node::Sqrt(self))
        }
        fn faer_eq_zero(self) -> Self {
            Self::new(Node::EqZero(self))
        }
        fn faer_le_zero(self) -> Self {
            Self::new(Node::LeZero(self))
        }
        fn faer_lt_zero(self) -> Self {
            Self::new(Node::LtZero(self))
        }
        fn faer_if_else(cond: Self, if_true: Self, if_false: Self) -> Self {
            Self::new(Node::IfElse(cond, if_true, if_false))
        }
    }

    #[test]
    fn test_house_symbolic() {
        // a single expression graph must be valid for every input, degenerate or not
        let n = 3;
        let mut x: Vec<Expr> = (0..n).map(|i| Expr::new(Node::Var(i))).collect();
        let (beta, s) = house(&mut x);

        let points: &[[f64; 3]] = &[
            [1.0, 2.0, -2.0],
            [-1.0, 2.0, -2.0],
            [0.0, 0.5, 0.0],
            [0.0, 0.0, 0.0],
            [4.0, 0.0, 0.0],
            [-4.0, 0.0, 0.0],
        ];

        for point in points {
            let mut expected = point.to_vec();
            let (expected_beta, expected_s) = house(&mut expected);

            assert_approx_eq!(beta.eval(point), expected_beta);
            assert_approx_eq!(s.eval(point), expected_s);
            for (v, expected) in zip(&x, &expected) {
                assert_approx_eq!(v.eval(point), *expected);
            }
        }
    }

    monomorphize_test!(test_happly_sparse);
}
