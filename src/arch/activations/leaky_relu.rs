/// Rectifier that lets a `slope` fraction of negative inputs through.
#[derive(Clone, Copy, Debug)]
pub struct LeakyRelu {
    slope: f64,
}

impl LeakyRelu {
    pub fn new(slope: f64) -> Self {
        Self { slope }
    }

    pub fn f(&self, x: f64) -> f64 {
        if x > 0. { x } else { x * self.slope }
    }

    pub fn df(&self, x: f64) -> f64 {
        if x > 0. { 1. } else { self.slope }
    }
}

impl Default for LeakyRelu {
    fn default() -> Self {
        Self::new(0.05)
    }
}
