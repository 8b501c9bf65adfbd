/// The loss policy of a training run, reduced to what the backward pass needs.
pub trait LossFn {
    /// The error fed back for one output element: the direction in which `prediction` should
    /// move to approach `target`.
    fn derivative(&self, target: f64, prediction: f64) -> f64;
}

impl<F> LossFn for F
where
    F: Fn(f64, f64) -> f64,
{
    fn derivative(&self, target: f64, prediction: f64) -> f64 {
        self(target, prediction)
    }
}

/// Half the squared difference between target and prediction.
#[derive(Debug, Default, Clone, Copy)]
pub struct SquaredError;

impl SquaredError {
    /// Returns a new `SquaredError`.
    pub fn new() -> Self {
        Self
    }

    pub fn value(&self, target: f64, prediction: f64) -> f64 {
        0.5 * (target - prediction).powi(2)
    }
}

impl LossFn for SquaredError {
    fn derivative(&self, target: f64, prediction: f64) -> f64 {
        target - prediction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn squared_error_points_towards_the_target() {
        let loss = SquaredError::new();
        assert_eq!(loss.value(3., 1.), 2.);
        assert_eq!(loss.derivative(3., 1.), 2.);
        assert_eq!(loss.derivative(-1., 1.), -2.);
    }

    #[test]
    fn closures_are_loss_functions() {
        let sign = |t: f64, p: f64| (t - p).signum();
        assert_eq!(sign.derivative(0., 5.), -1.);
    }
}
