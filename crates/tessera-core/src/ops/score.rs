use crate::{ops::reduce::to_f64, DeviceStorage, TensorDType, TensorError};
use num_traits::ToPrimitive;

/// Pairs up `predicted` and `actual` as `f64`, rejecting operands of different sizes.
fn paired<T, S>(predicted: &S, actual: &S) -> Result<Vec<(f64, f64)>, TensorError>
where
    T: TensorDType + ToPrimitive,
    S: DeviceStorage<T>,
{
    if predicted.size() != actual.size() {
        return Err(TensorError::ShapeMismatch {
            lhs: predicted.size(),
            rhs: actual.size(),
        });
    }
    let predicted = predicted.to_vec()?;
    let actual = actual.to_vec()?;
    predicted
        .iter()
        .zip(actual.iter())
        .map(|(p, a)| Ok((to_f64(p)?, to_f64(a)?)))
        .collect()
}

fn mean_of(pairs: &[(f64, f64)], f: impl Fn(f64, f64) -> f64) -> f64 {
    pairs.iter().map(|&(p, a)| f(p, a)).sum::<f64>() / pairs.len() as f64
}

/// Mean squared error.
pub fn mse<T, S>(predicted: &S, actual: &S) -> Result<f64, TensorError>
where
    T: TensorDType + ToPrimitive,
    S: DeviceStorage<T>,
{
    let pairs = paired(predicted, actual)?;
    Ok(mean_of(&pairs, |p, a| (p - a) * (p - a)))
}

/// Mean absolute error.
pub fn mae<T, S>(predicted: &S, actual: &S) -> Result<f64, TensorError>
where
    T: TensorDType + ToPrimitive,
    S: DeviceStorage<T>,
{
    let pairs = paired(predicted, actual)?;
    Ok(mean_of(&pairs, |p, a| (p - a).abs()))
}

/// Mean squared logarithmic error, `mean((ln(1 + a) - ln(1 + p))^2)`.
///
/// Both operands must be non-negative.
pub fn msle<T, S>(predicted: &S, actual: &S) -> Result<f64, TensorError>
where
    T: TensorDType + ToPrimitive,
    S: DeviceStorage<T>,
{
    let pairs = paired(predicted, actual)?;
    if let Some(index) = pairs.iter().position(|&(p, a)| p < 0.0 || a < 0.0) {
        return Err(TensorError::InvalidArgument(format!(
            "msle requires non-negative values, element {} is {:?}",
            index, pairs[index]
        )));
    }
    Ok(mean_of(&pairs, |p, a| {
        let d = a.ln_1p() - p.ln_1p();
        d * d
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HostStorage;

    fn host(data: &[f64]) -> HostStorage<f64> {
        HostStorage::from_slice(data, [data.len()]).unwrap()
    }

    #[test]
    fn mean_squared_error() -> anyhow::Result<()> {
        let predicted = host(&[3.0, -0.5, 2.0, 7.0]);
        let actual = host(&[2.5, 0.0, 2.0, 8.0]);
        assert!((mse(&predicted, &actual)? - 0.375).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn mean_absolute_error() -> anyhow::Result<()> {
        let predicted = host(&[3.0, -0.5, 2.0, 7.0]);
        let actual = host(&[2.5, 0.0, 2.0, 8.0]);
        assert!((mae(&predicted, &actual)? - 0.5).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn mean_squared_log_error() -> anyhow::Result<()> {
        let predicted = host(&[2.5, 5.0, 4.0, 8.0]);
        let actual = host(&[3.0, 5.0, 2.5, 7.0]);
        assert!((msle(&predicted, &actual)? - 0.039_730_122_984_593_8).abs() < 1e-9);
        assert!(matches!(
            msle(&host(&[-1.0]), &host(&[1.0])),
            Err(TensorError::InvalidArgument(_))
        ));
        Ok(())
    }

    #[test]
    fn scores_reject_mismatched_sizes() {
        let three = host(&[1.0, 2.0, 3.0]);
        let four = host(&[1.0, 2.0, 3.0, 4.0]);
        assert!(matches!(
            mse(&three, &four),
            Err(TensorError::ShapeMismatch { lhs: 3, rhs: 4 })
        ));
        assert!(mae(&three, &four).is_err());
        assert!(msle(&three, &four).is_err());
    }
}
