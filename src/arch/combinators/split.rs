use log::debug;
use ndarray::{Array1, s};

use super::{child_states, expect_history, open_trace, serialize_children};
use crate::{
    NetErr, Result,
    arch::{
        activations::ActFn,
        layers::ActivationConfig,
        regularize::regularize,
        transform::{
            Backward, Factory, Forward, History, Mode, Record, Trace, Transformation, Uniform,
            check_size, next_trace_id,
        },
    },
    math::{self, Vector},
};

/// Parallel composition: every child sees the same input and the outputs are concatenated in
/// child order.
///
/// On the way back the error is sliced per child along the same boundaries, and the gradients
/// the children return are summed into a single gradient over the shared input.
pub struct Split {
    input_size: usize,
    children: Vec<Box<dyn Uniform>>,
    /// The end offset of each child's slice of the output.
    ends: Vec<usize>,
}

impl Split {
    /// Builds every child over the same input size.
    ///
    /// # Arguments
    /// * `input_size` - The size of the input shared by every child.
    /// * `factories` - The children, in output order. Must not be empty.
    /// * `serialized` - A JSON array with one serialized state per child.
    pub fn new(
        input_size: usize,
        factories: &[Box<dyn Factory>],
        serialized: Option<&str>,
    ) -> Result<Self> {
        let states = child_states(serialized, factories.len())?;

        let children = factories
            .iter()
            .zip(&states)
            .map(|(factory, state)| Ok(regularize(factory.build(input_size, state.as_deref())?)))
            .collect::<Result<Vec<_>>>()?;

        let sizes: Vec<usize> = children.iter().map(|child| child.size()).collect();
        let ends = math::scan(&sizes, 0, |end, size, _| end + size);

        debug!("built split of {} children: {input_size} -> {sizes:?}", children.len());
        Ok(Self {
            input_size,
            children,
            ends,
        })
    }

    fn bounds(&self, child: usize) -> (usize, usize) {
        let start = if child == 0 { 0 } else { self.ends[child - 1] };
        (start, self.ends[child])
    }
}

impl Uniform for Split {
    fn size(&self) -> usize {
        self.ends.last().copied().unwrap_or(0)
    }

    fn pass_forward(&mut self, input: Vector, history: History, mode: Mode) -> Result<Forward> {
        check_size("split input", input.len(), self.input_size)?;

        let id = next_trace_id();
        let mut traces = Vec::with_capacity(self.children.len());

        let output = math::flat_map(self.children.iter_mut(), |child, i| {
            let forward = child.pass_forward(input.clone(), History::issue(id, i), mode)?;
            traces.push(forward.trace);
            Ok::<_, NetErr>(forward.output)
        })?;

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
        check_size("split error", error.len(), self.size())?;

        let (history, id, traces) = open_trace(trace, self.children.len())?;
        let bounds: Vec<_> = (0..self.children.len()).map(|i| self.bounds(i)).collect();
        let mut gradient = Array1::zeros(self.input_size);

        for (i, (child, trace)) in self.children.iter_mut().zip(traces).enumerate() {
            let (start, end) = bounds[i];
            let slice = error.slice(s![start..end]).to_owned();

            let backward = child.pass_back(trace, slice)?;
            expect_history(&backward.history, id, i)?;
            check_size("split child gradient", backward.gradient.len(), self.input_size)?;
            gradient += &backward.gradient;
        }

        Ok(Backward { history, gradient })
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

/// Builds [`Split`] transforms. Without children it builds the identity.
pub struct SplitConfig {
    pub factories: Vec<Box<dyn Factory>>,
}

impl Factory for SplitConfig {
    fn build(&self, size: usize, serialized: Option<&str>) -> Result<Transformation> {
        if self.factories.is_empty() {
            return ActivationConfig(ActFn::identity()).build(size, serialized);
        }

        let split = Split::new(size, &self.factories, serialized)?;
        Ok(Transformation::Uniform(Box::new(split)))
    }
}

pub fn split(factories: Vec<Box<dyn Factory>>) -> Box<dyn Factory> {
    Box::new(SplitConfig { factories })
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::{
        ErrKind,
        arch::layers::{Learning, bias, dense, identity},
    };

    fn built(factory: &dyn Factory, size: usize, serialized: Option<&str>) -> Box<dyn Uniform> {
        regularize(factory.build(size, serialized).unwrap())
    }

    #[test]
    fn size_is_the_sum_of_the_children() {
        let learning = Learning::new(0.1);
        let factory = split(vec![dense(4, learning), identity(), dense(1, learning)]);
        assert_eq!(built(factory.as_ref(), 3, None).size(), 8);
    }

    #[test]
    fn gradients_are_sliced_and_summed() {
        let learning = Learning::new(0.1);
        let factory = split(vec![dense(1, learning), identity()]);
        let state = r#"["[[1.0,2.0]]","null"]"#;
        let mut transform = built(factory.as_ref(), 2, Some(state));

        let fwd = transform
            .pass_forward(array![3., 4.], History::issue(5, 1), Mode::Training)
            .unwrap();
        assert_eq!(fwd.output, array![11., 3., 4.]);

        let back = transform.pass_back(fwd.trace, array![1., 10., 100.]).unwrap();
        assert!(back.history.is(5, 1));
        assert_eq!(back.gradient, array![11., 102.]);
    }

    #[test]
    fn nested_combinators_unwind_to_the_right_invocation() {
        let learning = Learning::new(0.1);
        let inner = || split(vec![identity(), bias(learning)]);
        let factory = split(vec![inner(), inner()]);
        let mut transform = built(factory.as_ref(), 1, None);

        let fwd = transform
            .pass_forward(array![1.], History::issue(2, 0), Mode::Training)
            .unwrap();
        assert_eq!(fwd.output.len(), 4);

        let back = transform.pass_back(fwd.trace, array![1., 1., 1., 1.]).unwrap();
        assert_eq!(back.gradient, array![4.]);
    }

    /// Hands back the most recent history it was issued instead of the one its trace carries.
    struct Hoarder {
        kept: Vec<History>,
    }

    impl Uniform for Hoarder {
        fn size(&self) -> usize {
            1
        }

        fn pass_forward(&mut self, input: Vector, history: History, _mode: Mode) -> Result<Forward> {
            self.kept.push(history);
            let record = Record::Sample {
                input: input.clone(),
                output: input.clone(),
            };

            Ok(Forward {
                output: input,
                trace: Trace::new(History::issue(0, 0), record),
            })
        }

        fn pass_back(&mut self, _trace: Trace, error: Vector) -> Result<Backward> {
            let history = self.kept.pop().unwrap_or(History::issue(0, 0));
            Ok(Backward {
                history,
                gradient: error,
            })
        }

        fn apply_learning(&mut self) {}

        fn clean(&mut self) {}

        fn serialize(&self) -> Result<String> {
            Ok("null".to_string())
        }
    }

    fn hoarding_split() -> Box<dyn Uniform> {
        let hoarder = |_: usize, _: Option<&str>| -> Result<Transformation> {
            Ok(Transformation::Uniform(Box::new(Hoarder { kept: Vec::new() })))
        };
        built(split(vec![identity(), Box::new(hoarder)]).as_ref(), 1, None)
    }

    #[test]
    fn a_child_unwinding_in_order_is_accepted() {
        let mut transform = hoarding_split();
        let fwd = transform
            .pass_forward(array![1.], History::issue(1, 0), Mode::Training)
            .unwrap();
        let back = transform.pass_back(fwd.trace, array![1., 1.]).unwrap();
        assert_eq!(back.gradient, array![2.]);
    }

    #[test]
    fn a_history_from_another_invocation_is_a_protocol_violation() {
        let mut transform = hoarding_split();
        let first = transform
            .pass_forward(array![1.], History::issue(1, 0), Mode::Training)
            .unwrap();
        let _second = transform
            .pass_forward(array![2.], History::issue(1, 0), Mode::Training)
            .unwrap();

        // The hoarder answers the first trace with the history of the second invocation.
        let err = transform.pass_back(first.trace, array![1., 1.]).unwrap_err();
        assert_eq!(err.kind(), ErrKind::ProtocolViolation);
    }
}
