//! Orthogonal weight initialization.
//!
//! Produces matrices whose rows or columns (whichever are fewer) are
//! orthonormal, scaled by a gain:
//!
//! - 1.0: linear output heads (value function)
//! - sqrt(2) ≈ 1.41: hidden layers, for ReLU and tanh alike
//! - 0.01: policy heads, to start with near-zero action means
//!
//! The starting matrix is drawn from the backend RNG, so seeding the backend
//! makes the weights reproducible.

use burn::{prelude::*, tensor::Distribution};

/// Gain for hidden layers feeding a nonlinearity.
///
/// Tanh layers use it too rather than the smaller 5/3.
pub const HIDDEN_GAIN: f64 = std::f64::consts::SQRT_2;

/// Below this norm a vector is treated as linearly dependent.
const DEPENDENT_NORM: f64 = 1e-10;

/// Orthogonal weight tensor of shape `[rows, cols]` scaled by `gain`.
///
/// Starts from a standard normal matrix drawn on `device` and orthonormalizes
/// the smaller set of vectors (columns of a tall matrix, rows of a wide one)
/// with modified Gram-Schmidt on the host.
pub fn generate_orthogonal_weights<B: Backend>(
    rows: usize,
    cols: usize,
    gain: f64,
    device: &B::Device,
) -> Tensor<B, 2> {
    let random = Tensor::<B, 2>::random([rows, cols], Distribution::Normal(0.0, 1.0), device);
    let draw: Vec<f64> = random.into_data().iter::<f64>().collect();
    let values = orthogonalize(&draw, rows, cols, gain);
    Tensor::from_data(TensorData::new(values, [rows, cols]).convert::<B::FloatElem>(), device)
}

/// Orthogonalize a row-major `[rows, cols]` matrix and scale it by `gain`.
pub fn orthogonalize(draw: &[f64], rows: usize, cols: usize, gain: f64) -> Vec<f32> {
    let tall = rows >= cols;
    let (count, len) = if tall { (cols, rows) } else { (rows, cols) };
    let entry = |k: usize, i: usize| {
        let (r, c) = if tall { (i, k) } else { (k, i) };
        draw.get(r * cols + c).copied().unwrap_or_default()
    };

    let mut basis: Vec<Vec<f64>> = Vec::with_capacity(count);
    for k in 0..count {
        let candidate: Vec<f64> = (0..len).map(|i| entry(k, i)).collect();
        let vector = orthonormalize(candidate, &basis)
            .or_else(|| {
                // the draw was dependent on the basis: fall back to unit vectors
                (0..len).find_map(|j| {
                    let mut unit = vec![0.0; len];
                    unit[j] = 1.0;
                    orthonormalize(unit, &basis)
                })
            })
            .unwrap_or_else(|| vec![0.0; len]);
        basis.push(vector);
    }

    let mut out = vec![0.0_f32; rows * cols];
    for (k, vector) in basis.iter().enumerate() {
        for (i, &x) in vector.iter().enumerate() {
            let (r, c) = if tall { (i, k) } else { (k, i) };
            out[r * cols + c] = (x * gain) as f32;
        }
    }
    out
}

/// Remove the projections of `v` onto `basis` and normalize the rest.
fn orthonormalize(mut v: Vec<f64>, basis: &[Vec<f64>]) -> Option<Vec<f64>> {
    for b in basis {
        let dot: f64 = v.iter().zip(b).map(|(x, y)| x * y).sum();
        for (x, y) in v.iter_mut().zip(b) {
            *x -= dot * y;
        }
    }
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm < DEPENDENT_NORM {
        return None;
    }
    v.iter_mut().for_each(|x| *x /= norm);
    Some(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::{NdArray, NdArrayDevice};

    type TestBackend = NdArray;

    fn gram_error(weights: Tensor<TestBackend, 2>, gain: f32, tall: bool) -> f32 {
        let device = NdArrayDevice::default();
        let [rows, cols] = weights.dims();
        let product = if tall {
            weights.clone().transpose().matmul(weights)
        } else {
            weights.clone().matmul(weights.transpose())
        };
        let n = if tall { cols } else { rows };
        let identity = Tensor::<TestBackend, 2>::eye(n, &device).mul_scalar(gain * gain);
        (product - identity).abs().max().into_scalar().elem()
    }

    #[test]
    fn square_is_orthonormal() {
        let device = NdArrayDevice::default();
        let weights = generate_orthogonal_weights::<TestBackend>(6, 6, 1.0, &device);
        assert_eq!(weights.dims(), [6, 6]);
        assert!(gram_error(weights, 1.0, true) < 1e-5);
    }

    #[test]
    fn tall_has_orthonormal_columns() {
        let device = NdArrayDevice::default();
        let weights = generate_orthogonal_weights::<TestBackend>(16, 4, 1.0, &device);
        assert!(gram_error(weights, 1.0, true) < 1e-5);
    }

    #[test]
    fn wide_has_orthonormal_rows() {
        let device = NdArrayDevice::default();
        let weights = generate_orthogonal_weights::<TestBackend>(3, 12, 1.0, &device);
        assert!(gram_error(weights, 1.0, false) < 1e-5);
    }

    #[test]
    fn gain_scales_the_gram_matrix() {
        let device = NdArrayDevice::default();
        let gain = HIDDEN_GAIN as f32;
        let weights = generate_orthogonal_weights::<TestBackend>(8, 8, HIDDEN_GAIN, &device);
        assert!(gram_error(weights, gain, true) < 1e-5);
    }

    #[test]
    fn single_row_has_unit_norm() {
        let m = orthogonalize(&[3.0, 0.0, 4.0, 0.0, 0.0], 1, 5, 0.01);
        let norm = m.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 0.01).abs() < 1e-6);
        assert!((m[0] - 0.006).abs() < 1e-7 && (m[2] - 0.008).abs() < 1e-7);
    }

    #[test]
    fn dependent_columns_fall_back_to_unit_vectors() {
        // both columns of the draw point the same way
        let m = orthogonalize(&[1.0, 1.0, 0.0, 0.0], 2, 2, 1.0);
        let dot = m[0] * m[1] + m[2] * m[3];
        assert!(dot.abs() < 1e-6);
        let second = (m[1] * m[1] + m[3] * m[3]).sqrt();
        assert!((second - 1.0).abs() < 1e-6);
    }
}
