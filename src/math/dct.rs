use std::f64::consts::PI;

use crate::math::matrix::Matrix;

/// Orthonormal DCT-II basis of size `n` and its transpose.
///
/// Row `k` of the basis is `s_k * cos(pi * (2i + 1) * k / 2n)` with
/// `s_0 = sqrt(1/n)` and `s_k = sqrt(2/n)` otherwise, so `T * T^t = I`.
pub fn dct_basis(n: usize) -> (Matrix, Matrix) {
    assert!(n > 0, "DCT basis needs at least one point");

    let mut basis = Matrix::zeros(n, n);
    let nf = n as f64;
    for k in 0..n {
        let scale = if k == 0 { (1.0 / nf).sqrt() } else { (2.0 / nf).sqrt() };
        for i in 0..n {
            let angle = PI * (2.0 * i as f64 + 1.0) * k as f64 / (2.0 * nf);
            basis.data[k * n + i] = (scale * angle.cos()) as f32;
        }
    }

    let transpose = basis.transpose();
    (basis, transpose)
}
