use super::transform::{
    Backward, Forward, History, Mode, Record, Simplified, Trace, Transformation, Uniform,
};
use crate::{NetErr, Result, math::Vector};

/// Brings any transformation into the uniform shape. Called once per transform, at build time.
pub fn regularize(transformation: Transformation) -> Box<dyn Uniform> {
    match transformation {
        Transformation::Uniform(uniform) => uniform,
        Transformation::Simplified(simplified) => Box::new(Regularized { inner: simplified }),
    }
}

/// A simplified transform whose trace is the input and output of each call.
struct Regularized {
    inner: Box<dyn Simplified>,
}

impl Uniform for Regularized {
    fn size(&self) -> usize {
        self.inner.size()
    }

    fn pass_forward(&mut self, input: Vector, history: History, mode: Mode) -> Result<Forward> {
        let output = self.inner.pass_forward(input.view(), mode)?;
        let trace = Trace::new(
            history,
            Record::Sample {
                input,
                output: output.clone(),
            },
        );

        Ok(Forward { output, trace })
    }

    fn pass_back(&mut self, trace: Trace, error: Vector) -> Result<Backward> {
        let (history, record) = trace.into_parts();
        let Record::Sample { input, output } = record else {
            return Err(NetErr::ProtocolViolation {
                what: "trace was not produced by a stateless-call transform",
            });
        };

        let gradient = self.inner.pass_back(error, input.view(), output.view())?;
        Ok(Backward { history, gradient })
    }

    fn apply_learning(&mut self) {
        self.inner.apply_learning();
    }

    fn clean(&mut self) {
        self.inner.clean();
    }

    fn serialize(&self) -> Result<String> {
        self.inner.serialize()
    }
}
