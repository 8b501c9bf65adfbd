// Constants fitted so that a standard normal input keeps zero mean and unit variance.
const A: f64 = 0.19138;
const B: f64 = 4.50135;
const C: f64 = 0.25634;
const IB: f64 = 1. / B;
const CB: f64 = C * B;

/// Smooth odd activation with a linear tail of slope `A`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Swoop;

impl Swoop {
    pub fn new() -> Self {
        Self
    }

    pub fn f(&self, x: f64) -> f64 {
        if x >= 0. {
            A * x - (C / (IB + x) - CB)
        } else {
            A * x + (C / (IB - x) - CB)
        }
    }

    pub fn df(&self, x: f64) -> f64 {
        let dy = 1. / (IB + x.abs());
        A + C * dy * dy
    }
}
