use log::debug;

use super::{child_states, expect_history, open_trace, serialize_children};
use crate::{
    Result,
    arch::{
        activations::ActFn,
        layers::ActivationConfig,
        regularize::regularize,
        transform::{
            Backward, Factory, Forward, History, Mode, Record, Trace, Transformation, Uniform,
            check_size, next_trace_id,
        },
    },
    math::Vector,
};

/// Sequential composition: the output of each child is the input of the next.
pub struct Pipe {
    input_size: usize,
    children: Vec<Box<dyn Uniform>>,
}

impl Pipe {
    /// Builds every child in order, chaining output sizes into input sizes.
    ///
    /// # Arguments
    /// * `input_size` - The size of the input of the first child.
    /// * `factories` - The children, in application order. Must not be empty.
    /// * `serialized` - A JSON array with one serialized state per child.
    pub fn new(
        input_size: usize,
        factories: &[Box<dyn Factory>],
        serialized: Option<&str>,
    ) -> Result<Self> {
        let states = child_states(serialized, factories.len())?;

        let mut size = input_size;
        let mut children = Vec::with_capacity(factories.len());
        for (factory, state) in factories.iter().zip(&states) {
            let child = regularize(factory.build(size, state.as_deref())?);
            size = child.size();
            children.push(child);
        }

        debug!("built pipe of {} children: {input_size} -> {size}", children.len());
        Ok(Self {
            input_size,
            children,
        })
    }
}

impl Uniform for Pipe {
    fn size(&self) -> usize {
        self.children
            .last()
            .map_or(self.input_size, |child| child.size())
    }

    fn pass_forward(&mut self, input: Vector, history: History, mode: Mode) -> Result<Forward> {
        check_size("pipe input", input.len(), self.input_size)?;

        let id = next_trace_id();
        let mut traces = Vec::with_capacity(self.children.len());
        let mut output = input;

        for (i, child) in self.children.iter_mut().enumerate() {
            let forward = child.pass_forward(output, History::issue(id, i), mode)?;
            traces.push(forward.trace);
            output = forward.output;
        }

        let record = Record::Nested {
            id,
            children: traces,
        };
        Ok(Forward {
            output,
            trace: Trace::new(history, record),
        })
    }

    fn pass_back(&mut self, trace: Trace, error: Vector) -> Result<Backward> {
        check_size("pipe error", error.len(), self.size())?;

        let (history, id, traces) = open_trace(trace, self.children.len())?;
        let mut error = error;

        for (i, (child, trace)) in self.children.iter_mut().zip(traces).enumerate().rev() {
            let backward = child.pass_back(trace, error)?;
            expect_history(&backward.history, id, i)?;
            error = backward.gradient;
        }

        Ok(Backward {
            history,
            gradient: error,
        })
    }

    fn apply_learning(&mut self) {
        self.children
            .iter_mut()
            .for_each(|child| child.apply_learning());
    }

    fn clean(&mut self) {
        self.children.iter_mut().for_each(|child| child.clean());
    }

    fn serialize(&self) -> Result<String> {
        serialize_children(&self.children)
    }
}

/// Builds [`Pipe`] transforms. Without children it builds the identity.
pub struct PipeConfig {
    pub factories: Vec<Box<dyn Factory>>,
}

impl Factory for PipeConfig {
    fn build(&self, size: usize, serialized: Option<&str>) -> Result<Transformation> {
        if self.factories.is_empty() {
            return ActivationConfig(ActFn::identity()).build(size, serialized);
        }

        let pipe = Pipe::new(size, &self.factories, serialized)?;
        Ok(Transformation::Uniform(Box::new(pipe)))
    }
}

pub fn pipe(factories: Vec<Box<dyn Factory>>) -> Box<dyn Factory> {
    Box::new(PipeConfig { factories })
}
