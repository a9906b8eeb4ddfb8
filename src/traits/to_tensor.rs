use burn::{
    prelude::*,
    tensor::{backend::Backend, BasicOps, TensorData},
};

/// A trait for converting items to tensors
///
/// Implemented for flat vectors (1-D), vectors of rows and [`Rows`] (2-D).
pub trait ToTensor<B: Backend, const D: usize, K: BasicOps<B>> {
    fn to_tensor(self, device: &B::Device) -> Tensor<B, D, K>;
}

/// Row-major batch stored in a single buffer, `[data.len() / width, width]`
#[derive(Debug, Clone, PartialEq)]
pub struct Rows<E> {
    pub data: Vec<E>,
    pub width: usize,
}

impl<E> Rows<E> {
    pub fn new(data: Vec<E>, width: usize) -> Self {
        Self { data, width }
    }

    pub fn n_rows(&self) -> usize {
        if self.width == 0 {
            0
        } else {
            self.data.len() / self.width
        }
    }
}

impl<B: Backend> ToTensor<B, 1, Float> for Vec<f32> {
    #[inline]
    fn to_tensor(self, device: &B::Device) -> Tensor<B, 1> {
        let len = self.len();
        Tensor::from_data(TensorData::new(self, [len]).convert::<B::FloatElem>(), device)
    }
}

impl<B: Backend> ToTensor<B, 2, Float> for Rows<f32> {
    #[inline]
    fn to_tensor(self, device: &B::Device) -> Tensor<B, 2> {
        let shape = [self.n_rows(), self.width];
        Tensor::from_data(TensorData::new(self.data, shape).convert::<B::FloatElem>(), device)
    }
}

impl<B: Backend> ToTensor<B, 2, Float> for Vec<Vec<f32>> {
    #[inline]
    fn to_tensor(self, device: &B::Device) -> Tensor<B, 2> {
        let width = self.first().map_or(0, Vec::len);
        let mut flat = Vec::with_capacity(self.len() * width);
        for row in self {
            flat.extend(row);
        }
        Rows::new(flat, width).to_tensor(device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::{NdArray, NdArrayDevice};

    #[test]
    fn test_vec_f32_to_tensor_1d() {
        let device = NdArrayDevice::default();
        let data = vec![1.0_f32, 2.0, 3.0, 4.0];
        let tensor: Tensor<NdArray, 1> = data.to_tensor(&device);

        assert_eq!(tensor.shape().dims, [4]);
        let tensor_data = tensor.to_data();
        assert_eq!(tensor_data.as_slice::<f32>().unwrap(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_rows_to_tensor_2d() {
        let device = NdArrayDevice::default();

        // three 2-dimensional states
        let rows = Rows::new(vec![1.0_f32, 2.0, 3.0, 4.0, 5.0, 6.0], 2);
        assert_eq!(rows.n_rows(), 3);
        let tensor: Tensor<NdArray, 2> = rows.to_tensor(&device);

        assert_eq!(tensor.shape().dims, [3, 2]);
        let tensor_data = tensor.to_data();
        assert_eq!(
            tensor_data.as_slice::<f32>().unwrap(),
            &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
        );
    }

    #[test]
    fn test_single_state_to_batch() {
        let device = NdArrayDevice::default();
        let state = vec![0.5_f32, -0.5, 0.25];
        let tensor: Tensor<NdArray, 2> = vec![state].to_tensor(&device);
        assert_eq!(tensor.shape().dims, [1, 3]);
    }
}
