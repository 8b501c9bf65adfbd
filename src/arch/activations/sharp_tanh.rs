const GAIN: f64 = 1.15;

/// A piecewise linear stand-in for `tanh`: steep on [-1, 1], shallow with `slope` outside.
#[derive(Clone, Copy, Debug)]
pub struct SharpTanh {
    slope: f64,
}

impl SharpTanh {
    pub fn new(slope: f64) -> Self {
        Self { slope }
    }

    pub fn f(&self, x: f64) -> f64 {
        if x < -1. {
            self.slope * (x + 1.) - GAIN
        } else if x > 1. {
            self.slope * (x - 1.) + GAIN
        } else {
            x * GAIN
        }
    }

    pub fn df(&self, x: f64) -> f64 {
        if x.abs() > 1. { self.slope } else { GAIN }
    }
}

impl Default for SharpTanh {
    fn default() -> Self {
        Self::new(0.05)
    }
}
