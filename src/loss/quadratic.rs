use crate::math::matrix::Matrix;

pub struct QuadraticLoss;

impl QuadraticLoss {
    /// Scalar quadratic cost: sum((predicted - expected)²)
    pub fn loss(predicted: &Matrix, expected: &Matrix) -> f32 {
        predicted.data.iter().zip(&expected.data)
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }

    /// Per-output gradient: 2·(predicted - expected)
    pub fn derivative(predicted: &Matrix, expected: &Matrix) -> Matrix {
        let data = predicted.data.iter().zip(&expected.data)
            .map(|(a, b)| 2.0 * (a - b))
            .collect();
        Matrix::from_vec(predicted.rows, predicted.cols, data)
    }
}
