pub mod matrix;
pub mod tensor;
pub mod dct;

pub use matrix::Matrix;
pub use tensor::Tensor;
pub use dct::dct_basis;
