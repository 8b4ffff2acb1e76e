//! Core linear-algebra traits for kreduce.

/// Inner products & norms, as consumed by Krylov iterations.
pub trait InnerProduct<V> {
    /// Associated scalar type.
    type Scalar: Copy + PartialOrd + From<f64>;
    /// Compute dot(x, y).
    fn dot(&self, x: &V, y: &V) -> Self::Scalar;
    /// Compute ‖x‖₂.
    fn norm(&self, x: &V) -> Self::Scalar;
}

/// Uniform length queries for distributed vectors.
pub trait Indexing {
    /// Number of entries owned by this process.
    fn local_len(&self) -> usize;
    /// Number of entries across all processes.
    fn global_len(&self) -> usize;
}
