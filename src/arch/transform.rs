use std::sync::atomic::{AtomicU64, Ordering};

use ndarray::ArrayView1;

use crate::{Result, math::Vector};

static NEXT_TRACE: AtomicU64 = AtomicU64::new(1);

/// Returns an identifier no other trace in this process carries.
pub(crate) fn next_trace_id() -> u64 {
    NEXT_TRACE.fetch_add(1, Ordering::Relaxed)
}

/// Whether a forward pass is part of training or plain inference.
///
/// The mode is chosen by the caller of every forward pass and flows down the whole transform
/// tree, so transforms never read a shared training flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Training,
    Inference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Token {
    trace: u64,
    child: usize,
}

/// The caller context a transform receives on its forward pass and must hand back, untouched,
/// at the end of the matching backward pass.
///
/// Histories are minted by the combinators and the network facade only. They can't be cloned,
/// so a transform can return a given history at most once.
#[derive(Debug, PartialEq, Eq)]
pub struct History {
    token: Token,
}

impl History {
    /// A history for the `child`-th callee of the invocation identified by `trace`.
    pub(crate) fn issue(trace: u64, child: usize) -> Self {
        Self {
            token: Token { trace, child },
        }
    }

    /// Whether this history was issued for the `child`-th callee of invocation `trace`.
    pub(crate) fn is(&self, trace: u64, child: usize) -> bool {
        self.token == (Token { trace, child })
    }
}

/// What a transform remembers about one forward pass.
#[derive(Debug)]
pub enum Record {
    /// The input and output of a stateless-call transform.
    Sample { input: Vector, output: Vector },
    /// The elements kept by a dropout pass, `None` when the pass ran in inference mode.
    Mask(Option<Vec<bool>>),
    /// The traces of the children of a combinator, tagged with the invocation id.
    Nested { id: u64, children: Vec<Trace> },
}

/// The record of one forward invocation, consumed by exactly one backward invocation.
#[derive(Debug)]
pub struct Trace {
    history: History,
    record: Record,
}

impl Trace {
    /// Creates a new `Trace`.
    ///
    /// # Arguments
    /// * `history` - The history received by the forward pass.
    /// * `record` - Whatever the backward pass will need.
    pub fn new(history: History, record: Record) -> Self {
        Self { history, record }
    }

    /// The history this trace will hand back.
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Splits the trace into its history and record.
    pub fn into_parts(self) -> (History, Record) {
        (self.history, self.record)
    }
}

/// The result of a forward pass.
#[derive(Debug)]
pub struct Forward {
    pub output: Vector,
    pub trace: Trace,
}

/// The result of a backward pass: the caller's history and the gradient with respect to the
/// input of the transform.
#[derive(Debug)]
pub struct Backward {
    pub history: History,
    pub gradient: Vector,
}

/// A transform with an implicit trace: the adapter remembers the input and output of each call.
pub trait Simplified {
    /// The size of the output.
    fn size(&self) -> usize;

    /// Maps `input` to an output of `size()` elements.
    fn pass_forward(&mut self, input: ArrayView1<f64>, mode: Mode) -> Result<Vector>;

    /// Maps the error on the output back to an error on the input.
    ///
    /// # Arguments
    /// * `error` - The error with respect to `output`.
    /// * `input` - The input of the forward pass being replayed.
    /// * `output` - The output of the forward pass being replayed.
    fn pass_back(
        &mut self,
        error: Vector,
        input: ArrayView1<f64>,
        output: ArrayView1<f64>,
    ) -> Result<Vector>;

    fn apply_learning(&mut self) {}

    fn clean(&mut self) {}

    fn serialize(&self) -> Result<String> {
        Ok("null".to_string())
    }
}

/// A transform that manages its own trace.
pub trait Uniform {
    /// The size of the output.
    fn size(&self) -> usize;

    /// Runs the transform forward.
    ///
    /// # Arguments
    /// * `input` - The input vector.
    /// * `history` - The caller's context, to be stored in the returned trace.
    /// * `mode` - Whether the pass is part of training.
    fn pass_forward(&mut self, input: Vector, history: History, mode: Mode) -> Result<Forward>;

    /// Replays the backward pass of the forward pass that produced `trace`.
    ///
    /// # Returns
    /// The history stored in `trace` and the gradient with respect to the input.
    fn pass_back(&mut self, trace: Trace, error: Vector) -> Result<Backward>;

    /// Commits what was accumulated since the last commit.
    fn apply_learning(&mut self);

    /// Discards accumulated gradients.
    fn clean(&mut self);

    /// Encodes the trainable state as a string.
    fn serialize(&self) -> Result<String>;
}

/// Either shape of transform, as produced by a [`Factory`].
pub enum Transformation {
    Simplified(Box<dyn Simplified>),
    Uniform(Box<dyn Uniform>),
}

impl Transformation {
    /// The size of the output.
    pub fn size(&self) -> usize {
        match self {
            Transformation::Simplified(t) => t.size(),
            Transformation::Uniform(t) => t.size(),
        }
    }
}

/// Builds a transform for a given input size, optionally restoring serialized state.
pub trait Factory {
    /// # Arguments
    /// * `size` - The size of the input the transform will receive.
    /// * `serialized` - State previously produced by the transform's `serialize`.
    fn build(&self, size: usize, serialized: Option<&str>) -> Result<Transformation>;
}

impl<F> Factory for F
where
    F: Fn(usize, Option<&str>) -> Result<Transformation>,
{
    fn build(&self, size: usize, serialized: Option<&str>) -> Result<Transformation> {
        self(size, serialized)
    }
}

/// Parses a serialized state, treating the `null` marker as absent.
pub(crate) fn parse_state<T>(serialized: Option<&str>) -> Result<Option<T>>
where
    T: serde::de::DeserializeOwned,
{
    match serialized {
        None => Ok(None),
        Some(s) if s.trim() == "null" => Ok(None),
        Some(s) => Ok(Some(serde_json::from_str(s)?)),
    }
}

/// Fails unless `got == expected`.
pub(crate) fn check_size(what: &'static str, got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(crate::NetErr::SizeMismatch {
            what,
            got,
            expected,
        });
    }

    Ok(())
}
