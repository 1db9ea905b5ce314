use super::{BinaryOp, CheckedArithmetic};
use crate::{DeviceStorage, TensorDType, TensorError};
use num_traits::ToPrimitive;

/// Sum of every element, accumulated in the element type.
pub fn sum<T, S>(input: &S) -> Result<T, TensorError>
where
    T: CheckedArithmetic,
    S: DeviceStorage<T>,
{
    input
        .to_vec()?
        .into_iter()
        .enumerate()
        .try_fold(T::zero(), |acc, (index, x)| {
            T::checked(BinaryOp::Add, acc, x).ok_or_else(|| TensorError::ArithmeticOverflow {
                op: BinaryOp::Add.to_string(),
                index,
            })
        })
}

/// Arithmetic mean, accumulated in `f64`.
pub fn mean<T, S>(input: &S) -> Result<f64, TensorError>
where
    T: TensorDType + ToPrimitive,
    S: DeviceStorage<T>,
{
    let data = input.to_vec()?;
    let total = data
        .iter()
        .map(to_f64)
        .try_fold(0.0, |acc, x| x.map(|x| acc + x))?;
    Ok(total / data.len() as f64)
}

pub(crate) fn to_f64<T: TensorDType + ToPrimitive>(x: &T) -> Result<f64, TensorError> {
    x.to_f64().ok_or_else(|| {
        TensorError::InvalidArgument(format!("{:?} has no f64 representation", x))
    })
}
