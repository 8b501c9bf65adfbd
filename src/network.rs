use std::rc::Rc;

use log::debug;

use crate::{
    NetErr, Result,
    arch::{
        Factory, Forward, History, Mode, NetworkSpec, Record, Trace, Uniform, regularize,
        transform::{check_size, next_trace_id},
    },
    math::Vector,
};

/// The top-level facade over one transform tree.
///
/// A network owns exactly one regularized transform and remembers the factory that built it,
/// so it can be rebuilt from its own serialized state. Its traces are stamped with an instance
/// id, so a trace can only be fed back to the network that produced it.
pub struct Network {
    instance: u64,
    input_size: usize,
    factory: Rc<dyn Factory>,
    transform: Box<dyn Uniform>,
}

impl Network {
    /// Creates a new `Network` with freshly initialized weights.
    ///
    /// # Arguments
    /// * `input_size` - The size of the input vectors.
    /// * `factory` - Builds the transform tree.
    pub fn new(input_size: usize, factory: Box<dyn Factory>) -> Result<Self> {
        Self::build(input_size, Rc::from(factory), None)
    }

    /// Creates a new `Network` restoring the weights produced by [`Network::serialize`].
    ///
    /// # Arguments
    /// * `input_size` - The size of the input vectors.
    /// * `factory` - Builds the transform tree. Must describe the same shapes as the state.
    /// * `serialized` - The serialized weights.
    pub fn with_state(input_size: usize, factory: Box<dyn Factory>, serialized: &str) -> Result<Self> {
        Self::build(input_size, Rc::from(factory), Some(serialized))
    }

    /// Creates a new `Network` out of a [`NetworkSpec`].
    pub fn from_spec(spec: NetworkSpec) -> Result<Self> {
        Self::new(spec.input_size, Box::new(spec.transform))
    }

    fn build(input_size: usize, factory: Rc<dyn Factory>, serialized: Option<&str>) -> Result<Self> {
        let transform = regularize(factory.build(input_size, serialized)?);
        debug!(
            "built network {input_size} -> {} ({})",
            transform.size(),
            if serialized.is_some() { "restored" } else { "fresh" }
        );

        Ok(Self {
            instance: next_trace_id(),
            input_size,
            factory,
            transform,
        })
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn output_size(&self) -> usize {
        self.transform.size()
    }

    /// Runs the network forward.
    ///
    /// # Returns
    /// The output and the trace needed to run the matching backward pass.
    pub fn pass_forward(&mut self, input: Vector, mode: Mode) -> Result<Forward> {
        check_size("network input", input.len(), self.input_size)?;

        let id = next_trace_id();
        let history = History::issue(id, 0);
        let Forward { output, trace } = self.transform.pass_forward(input, history, mode)?;

        let record = Record::Nested {
            id,
            children: vec![trace],
        };
        Ok(Forward {
            output,
            trace: Trace::new(History::issue(self.instance, 0), record),
        })
    }

    /// Runs the network forward in inference mode, discarding the trace.
    pub fn predict(&mut self, input: Vector) -> Result<Vector> {
        Ok(self.pass_forward(input, Mode::Inference)?.output)
    }

    /// Runs the backward pass matching `trace`, accumulating gradients in every transform.
    ///
    /// # Arguments
    /// * `trace` - A trace returned by [`Network::pass_forward`] on this network.
    /// * `error` - The error with respect to the output of that forward pass.
    ///
    /// # Returns
    /// The gradient with respect to the input, a `ProtocolViolation` if `trace` comes from
    /// another network, or `BackwardIncomplete` if the transform tree did not hand back the
    /// history this network issued.
    pub fn pass_back(&mut self, trace: Trace, error: Vector) -> Result<Vector> {
        let (owner, record) = trace.into_parts();
        if !owner.is(self.instance, 0) {
            return Err(NetErr::ProtocolViolation {
                what: "trace was produced by another network",
            });
        }

        check_size("network error", error.len(), self.output_size())?;

        let (id, trace) = match record {
            Record::Nested { id, mut children } if children.len() == 1 => match children.pop() {
                Some(trace) => (id, trace),
                None => return Err(NetErr::BackwardIncomplete),
            },
            _ => {
                return Err(NetErr::ProtocolViolation {
                    what: "trace was not produced by a network",
                });
            }
        };

        let backward = self.transform.pass_back(trace, error)?;
        if !backward.history.is(id, 0) {
            return Err(NetErr::BackwardIncomplete);
        }

        Ok(backward.gradient)
    }

    /// Runs the backward pass of every sample in `batch`, then applies learning once.
    ///
    /// Each error is scaled by `1 / batch.len()` before it is fed back, so the update follows
    /// the mean gradient of the batch. If any sample fails, the whole network is cleaned and no
    /// learning is applied, so the next batch starts from zeroed deltas.
    pub fn pass_batch_back(&mut self, batch: Vec<(Trace, Vector)>) -> Result<()> {
        let scale = 1. / batch.len().max(1) as f64;

        for (trace, mut error) in batch {
            error *= scale;
            if let Err(err) = self.pass_back(trace, error) {
                self.clean();
                return Err(err);
            }
        }

        self.transform.apply_learning();
        Ok(())
    }

    /// Resets every accumulated gradient and staged observation.
    pub fn clean(&mut self) {
        self.transform.clean();
    }

    /// Encodes the weights of the whole tree, in construction order.
    pub fn serialize(&self) -> Result<String> {
        self.transform.serialize()
    }

    /// Rebuilds this network from its own serialized weights. Accumulated gradients are not
    /// carried over.
    pub fn try_clone(&self) -> Result<Self> {
        self.rebuild(Rc::clone(&self.factory))
    }

    /// Rebuilds this network's weights into the tree described by another factory.
    ///
    /// # Returns
    /// The new network, or a configuration error if `factory` expects other shapes than the
    /// ones stored in this network.
    pub fn clone_with(&self, factory: Box<dyn Factory>) -> Result<Self> {
        self.rebuild(Rc::from(factory))
    }

    fn rebuild(&self, factory: Rc<dyn Factory>) -> Result<Self> {
        let state = self.serialize()?;
        Self::build(self.input_size, factory, Some(&state))
    }
}
