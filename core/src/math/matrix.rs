use ndarray::{Array1, ArrayView1, ArrayView2};

pub struct MatrixHelper;

impl MatrixHelper {
    /// Weighted sum of the rows of `rows`: `weights . rows`.
    pub fn weighted_sum(rows: ArrayView2<f32>, weights: ArrayView1<f32>) -> Array1<f32> {
        weights.dot(&rows)
    }
}
