use serde::{Deserialize, Serialize};

/// An axis-aligned box of `f32` vectors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoxSpace {
    pub low: Vec<f32>,
    pub high: Vec<f32>,
}

impl BoxSpace {
    /// # Panics
    ///
    /// Panics if the bounds have different lengths or `low > high` anywhere.
    #[must_use]
    pub fn new(low: Vec<f32>, high: Vec<f32>) -> Self {
        assert_eq!(low.len(), high.len(), "bounds must have the same length");
        assert!(low.iter().zip(&high).all(|(l, h)| l <= h), "low must not exceed high");
        Self { low, high }
    }

    /// `dim` copies of `[low, high]`.
    #[must_use]
    pub fn uniform(dim: usize, low: f32, high: f32) -> Self {
        Self::new(vec![low; dim], vec![high; dim])
    }

    #[must_use]
    pub fn dim(&self) -> usize {
        self.low.len()
    }

    #[must_use]
    pub fn contains(&self, x: &[f32]) -> bool {
        x.len() == self.dim()
            && x.iter()
                .zip(self.low.iter().zip(&self.high))
                .all(|(v, (l, h))| (*l..=*h).contains(v))
    }

    /// Clamps `x` into the box, component by component.
    #[must_use]
    pub fn clip(&self, x: &[f32]) -> Vec<f32> {
        x.iter()
            .zip(self.low.iter().zip(&self.high))
            .map(|(v, (l, h))| v.clamp(*l, *h))
            .collect()
    }

    /// Uniform sample.
    pub fn sample(&self, rng: &mut fastrand::Rng) -> Vec<f32> {
        self.low
            .iter()
            .zip(&self.high)
            .map(|(l, h)| l + rng.f32() * (h - l))
            .collect()
    }
}
