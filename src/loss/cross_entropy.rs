use crate::math::matrix::Matrix;

/// Categorical cross-entropy, paired with a Softmax output.
pub struct CrossEntropyLoss;

/// Keeps log() finite when a probability underflows to zero.
const EPS: f32 = 1e-12;

impl CrossEntropyLoss {
    /// L = -sum(expected[i] * log(predicted[i] + eps))
    pub fn loss(predicted: &Matrix, expected: &Matrix) -> f32 {
        predicted.data.iter().zip(&expected.data)
            .map(|(p, e)| -e * (p + EPS).ln())
            .sum()
    }

    /// ∂L/∂predicted[i] = -expected[i] / (predicted[i] + eps)
    ///
    /// This is the gradient with respect to the probabilities themselves; the
    /// graph routes it through the Softmax Jacobian separately.
    pub fn derivative(predicted: &Matrix, expected: &Matrix) -> Matrix {
        let data = predicted.data.iter().zip(&expected.data)
            .map(|(p, e)| -e / (p + EPS))
            .collect();
        Matrix::from_vec(predicted.rows, predicted.cols, data)
    }
}
