use crate::{DeviceStorage, TensorDType, TensorError};
use num_traits::Float;

/// `result[i] = f(input[i])`, on the backend of `input` and with its shape.
pub fn map<T, S>(input: &S, f: impl Fn(T) -> T) -> Result<S, TensorError>
where
    T: TensorDType,
    S: DeviceStorage<T>,
{
    let result = input.to_vec()?.into_iter().map(f).collect::<Vec<_>>();
    input.alike(&result, input.shape().clone())
}

/// Activation functions. Parameterised variants carry their parameter as `f64` and
/// cast it to the element type when applied.
#[derive(Debug, Clone, Copy, PartialEq, strum_macros::Display, strum_macros::EnumIter)]
pub enum UnaryOp {
    Relu,
    /// Gradient of ReLU: 0 for negative inputs, else 1.
    ReluDerivative,
    Sigmoid,
    /// `x` for positive inputs, `alpha * (e^x - 1)` otherwise. `alpha >= 0`.
    Elu { alpha: f64 },
    Softplus,
    /// `x * sigmoid(beta * x)`.
    Swish { beta: f64 },
    /// 1 for inputs `>= 0`, else 0.
    BinaryStep,
    /// `(x + sqrt(x^2 + beta)) / 2`. `beta >= 0`.
    Squareplus { beta: f64 },
}

impl UnaryOp {
    fn param<T: Float>(name: &str, value: f64, non_negative: bool) -> Result<T, TensorError> {
        if non_negative && !(value >= 0.0) {
            return Err(TensorError::InvalidArgument(format!(
                "{} must be non-negative, got {}",
                name, value
            )));
        }
        <T as num_traits::NumCast>::from(value).ok_or_else(|| {
            TensorError::InvalidArgument(format!("{} = {} is not representable", name, value))
        })
    }

    /// Resolves parameters once and returns the per-element function.
    fn func<T: TensorDType + Float>(&self) -> Result<Box<dyn Fn(T) -> T>, TensorError> {
        let one = T::one();
        let sigmoid = move |x: T| one / (one + (-x).exp());
        let f: Box<dyn Fn(T) -> T> = match *self {
            UnaryOp::Relu => Box::new(|x: T| x.max(T::zero())),
            UnaryOp::ReluDerivative => {
                Box::new(move |x: T| if x < T::zero() { T::zero() } else { one })
            }
            UnaryOp::Sigmoid => Box::new(sigmoid),
            UnaryOp::Elu { alpha } => {
                let alpha = Self::param::<T>("alpha", alpha, true)?;
                Box::new(move |x: T| {
                    if x > T::zero() {
                        x
                    } else {
                        alpha * x.exp_m1()
                    }
                })
            }
            // ln(1 + e^x) rewritten so e^x never overflows for large x.
            UnaryOp::Softplus => Box::new(|x: T| x.max(T::zero()) + (-x.abs()).exp().ln_1p()),
            UnaryOp::Swish { beta } => {
                let beta = Self::param::<T>("beta", beta, false)?;
                Box::new(move |x: T| x * sigmoid(beta * x))
            }
            UnaryOp::BinaryStep => Box::new(move |x: T| if x >= T::zero() { one } else { T::zero() }),
            UnaryOp::Squareplus { beta } => {
                let beta = Self::param::<T>("beta", beta, true)?;
                let two = one + one;
                Box::new(move |x: T| (x + (x * x + beta).sqrt()) / two)
            }
        };
        Ok(f)
    }

    pub fn apply<T, S>(&self, input: &S) -> Result<S, TensorError>
    where
        T: TensorDType + Float,
        S: DeviceStorage<T>,
    {
        let f = self.func::<T>()?;
        log::trace!("{} over {} elements on {}", self, input.size(), input.backend());
        map(input, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HostStorage;
    use half::bf16;
    use strum::IntoEnumIterator;

    fn host(data: &[f64]) -> HostStorage<f64> {
        HostStorage::from_slice(data, [data.len()]).unwrap()
    }

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "{:?} != {:?}", actual, expected);
        }
    }

    #[test]
    fn map_keeps_shape() -> anyhow::Result<()> {
        let input = HostStorage::from_slice(&[1, 2, 3, 4], [2, 2])?;
        let doubled = map(&input, |x| x * 2)?;
        assert_eq!(doubled.as_slice(), &[2, 4, 6, 8]);
        assert_eq!(doubled.shape(), input.shape());
        Ok(())
    }

    #[test]
    fn relu() -> anyhow::Result<()> {
        let out = UnaryOp::Relu.apply(&host(&[-1.0, 0.0, 2.5]))?;
        assert_eq!(out.as_slice(), &[0.0, 0.0, 2.5]);
        Ok(())
    }

    #[test]
    fn relu_derivative() -> anyhow::Result<()> {
        let out = UnaryOp::ReluDerivative.apply(&host(&[-2.0, -0.0, 0.0, 3.5]))?;
        assert_eq!(out.as_slice(), &[0.0, 1.0, 1.0, 1.0]);
        Ok(())
    }

    #[test]
    fn sigmoid() -> anyhow::Result<()> {
        let out = UnaryOp::Sigmoid.apply(&host(&[0.0, 1.0]))?;
        assert_close(out.as_slice(), &[0.5, 0.731_058_578_630_004_9]);
        Ok(())
    }

    #[test]
    fn elu() -> anyhow::Result<()> {
        let out = UnaryOp::Elu { alpha: 1.0 }.apply(&host(&[-1.0, 0.0, 1.0, 2.0]))?;
        assert_close(out.as_slice(), &[-0.632_120_558_828_557_7, 0.0, 1.0, 2.0]);
        assert!(matches!(
            UnaryOp::Elu { alpha: -0.5 }.apply(&host(&[1.0])),
            Err(TensorError::InvalidArgument(_))
        ));
        Ok(())
    }

    #[test]
    fn softplus() -> anyhow::Result<()> {
        let out = UnaryOp::Softplus.apply(&host(&[0.0, 1.0]))?;
        assert_close(out.as_slice(), &[std::f64::consts::LN_2, 1.313_261_687_518_222_7]);

        let wide = HostStorage::from_slice(&[100.0f32, -100.0], [2])?;
        let out = UnaryOp::Softplus.apply(&wide)?;
        assert_eq!(out[0], 100.0);
        assert!(out[1] >= 0.0 && out[1] < 1e-30);
        Ok(())
    }

    #[test]
    fn swish() -> anyhow::Result<()> {
        let out = UnaryOp::Swish { beta: 1.0 }.apply(&host(&[0.0, 1.0]))?;
        assert_close(out.as_slice(), &[0.0, 0.731_058_578_630_004_9]);
        Ok(())
    }

    #[test]
    fn binary_step() -> anyhow::Result<()> {
        let out = UnaryOp::BinaryStep.apply(&host(&[-0.1, 0.0, 3.0]))?;
        assert_eq!(out.as_slice(), &[0.0, 1.0, 1.0]);
        Ok(())
    }

    #[test]
    fn squareplus() -> anyhow::Result<()> {
        let out = UnaryOp::Squareplus { beta: 4.0 }.apply(&host(&[0.0, 1.5]))?;
        assert_close(out.as_slice(), &[1.0, 2.0]);
        assert!(UnaryOp::Squareplus { beta: -1.0 }
            .apply(&host(&[0.0]))
            .is_err());
        Ok(())
    }

    #[test]
    fn every_op_runs_on_half_precision() -> anyhow::Result<()> {
        let input = HostStorage::from_slice(&[bf16::from_f32(-1.0), bf16::from_f32(1.0)], [2])?;
        for op in UnaryOp::iter() {
            assert_eq!(op.apply(&input)?.size(), 2, "{}", op);
        }
        Ok(())
    }
}
