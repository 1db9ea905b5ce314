use crate::{DeviceStorage, HostStorage, TensorDType, TensorError};
use half::{bf16, f16};
use num_traits::NumOps;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display, strum_macros::EnumIter,
)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Element arithmetic that reports overflow as `None` instead of panicking or wrapping.
///
/// Floats follow IEEE semantics and never fail here; integers use their checked ops,
/// which also catch `MIN / -1`.
pub trait CheckedArithmetic: TensorDType + NumOps {
    fn checked(op: BinaryOp, lhs: Self, rhs: Self) -> Option<Self>;
}

macro_rules! impl_checked_float {
    ($($t:ty),*) => {
        $(impl CheckedArithmetic for $t {
            #[inline]
            fn checked(op: BinaryOp, lhs: Self, rhs: Self) -> Option<Self> {
                Some(match op {
                    BinaryOp::Add => lhs + rhs,
                    BinaryOp::Sub => lhs - rhs,
                    BinaryOp::Mul => lhs * rhs,
                    BinaryOp::Div => lhs / rhs,
                })
            }
        })*
    };
}

macro_rules! impl_checked_int {
    ($($t:ty),*) => {
        $(impl CheckedArithmetic for $t {
            #[inline]
            fn checked(op: BinaryOp, lhs: Self, rhs: Self) -> Option<Self> {
                match op {
                    BinaryOp::Add => lhs.checked_add(rhs),
                    BinaryOp::Sub => lhs.checked_sub(rhs),
                    BinaryOp::Mul => lhs.checked_mul(rhs),
                    BinaryOp::Div => lhs.checked_div(rhs),
                }
            }
        })*
    };
}

impl_checked_float!(f16, bf16, f32, f64);
impl_checked_int!(i32, u32, i64);

impl BinaryOp {
    /// Combines every element pair, failing before any output exists.
    fn compute<T: CheckedArithmetic>(&self, lhs: &[T], rhs: &[T]) -> Result<Vec<T>, TensorError> {
        if lhs.len() != rhs.len() {
            return Err(TensorError::ShapeMismatch {
                lhs: lhs.len(),
                rhs: rhs.len(),
            });
        }
        if *self == BinaryOp::Div {
            if let Some(index) = rhs.iter().position(|r| *r == T::zero()) {
                return Err(TensorError::DivisionByZero { index });
            }
        }
        lhs.iter()
            .zip(rhs)
            .enumerate()
            .map(|(index, (&l, &r))| {
                T::checked(*self, l, r).ok_or_else(|| TensorError::ArithmeticOverflow {
                    op: self.to_string(),
                    index,
                })
            })
            .collect()
    }

    /// `result[i] = lhs[i] op rhs[i]`, on the backend of `lhs` and with its shape.
    pub fn apply<T, S>(&self, lhs: &S, rhs: &S) -> Result<S, TensorError>
    where
        T: CheckedArithmetic,
        S: DeviceStorage<T>,
    {
        if lhs.size() != rhs.size() {
            return Err(TensorError::ShapeMismatch {
                lhs: lhs.size(),
                rhs: rhs.size(),
            });
        }
        let result = self.compute(&lhs.to_vec()?, &rhs.to_vec()?)?;
        log::trace!("{} over {} elements on {}", self, result.len(), lhs.backend());
        lhs.alike(&result, lhs.shape().clone())
    }

    /// `lhs[i] = lhs[i] op rhs[i]`. On error `lhs` is left untouched.
    pub fn apply_inplace<T: CheckedArithmetic>(
        &self,
        lhs: &mut HostStorage<T>,
        rhs: &HostStorage<T>,
    ) -> Result<(), TensorError> {
        let result = self.compute(lhs.as_slice(), rhs.as_slice())?;
        lhs.as_mut_slice().copy_from_slice(&result);
        Ok(())
    }
}

macro_rules! binary_op_fn {
    ($method_name:ident, $op:expr) => {
        pub fn $method_name<T, S>(lhs: &S, rhs: &S) -> Result<S, TensorError>
        where
            T: CheckedArithmetic,
            S: DeviceStorage<T>,
        {
            $op.apply(lhs, rhs)
        }
    };
}

binary_op_fn!(add, BinaryOp::Add);
binary_op_fn!(sub, BinaryOp::Sub);
binary_op_fn!(mul, BinaryOp::Mul);
binary_op_fn!(div, BinaryOp::Div);
