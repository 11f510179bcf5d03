use num_traits::Float;
use serde::{Deserialize, Serialize};
use std::ops::Add;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// A value with its 1-sigma error.
pub struct Uncertain<T>(pub T, pub T);

impl<T: Float> Uncertain<T> {
    /// Create a new uncertain value.
    pub fn new(value: T, uncertainty: T) -> Self {
        Uncertain(value, uncertainty)
    }

    /// Get the uncertainty of the uncertain value.
    pub fn error(&self) -> T {
        self.1
    }

    /// Widen the error to a different confidence level, e.g. 2.45 for ~95 % in 3D.
    pub fn scale_error(self, factor: T) -> Self {
        Uncertain(self.0, self.1 * factor)
    }
}

/// Independent errors add in quadrature.
impl<T: Float> Add for Uncertain<T> {
    type Output = Uncertain<T>;

    fn add(self, other: Uncertain<T>) -> Uncertain<T> {
        Uncertain(self.0 + other.0, self.1.hypot(other.1))
    }
}
