use posealign_linalg::ExecutionStrategy;

/// Parameters of a Procrustes alignment.
///
/// The default fits a proper rotation and translation only: no scaling, no reflection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct ProcrustesConfig {
    /// Also fit a uniform scale factor.
    pub allow_scaling: bool,
    /// Allow the orthogonal factor to be a reflection (determinant -1).
    pub allow_reflection: bool,
    /// How batch elements are distributed over threads. Does not change the results.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub strategy: ExecutionStrategy,
}

impl ProcrustesConfig {
    /// Sets whether uniform scaling is fitted.
    pub fn with_scaling(mut self, allow_scaling: bool) -> Self {
        self.allow_scaling = allow_scaling;
        self
    }

    /// Sets whether reflections are allowed.
    pub fn with_reflection(mut self, allow_reflection: bool) -> Self {
        self.allow_reflection = allow_reflection;
        self
    }

    /// Sets the execution strategy.
    pub fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}
