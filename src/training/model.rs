use std::{
    cell::{Cell, Ref, RefCell},
    time::Instant,
};

use log::{debug, info, warn};

use super::{LossFn, throttle::LogThrottle};
use crate::{
    Result,
    arch::{Forward, Mode, transform::check_size},
    math::{self, Vector},
    network::Network,
};

/// One training example.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub input: Vector,
    pub output: Vector,
}

/// Supplies the batch of samples for each epoch.
pub trait BatchSource {
    /// # Arguments
    /// * `epoch` - The epoch about to run, starting at 1.
    fn batch(&mut self, epoch: usize) -> Vec<Sample>;
}

impl<F> BatchSource for F
where
    F: FnMut(usize) -> Vec<Sample>,
{
    fn batch(&mut self, epoch: usize) -> Vec<Sample> {
        self(epoch)
    }
}

/// How a call to [`Model::train`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainOutcome {
    /// Every requested epoch ran.
    Completed { epoch: usize },
    /// `cancel_training` stopped the run at an epoch boundary.
    Cancelled { epoch: usize },
    /// Another run was still active, so this one never started.
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Idle,
    Running,
    Cancelling,
}

/// Marks a model as training for as long as it lives, including when the training future is
/// dropped before completion.
struct ActiveRun<'a> {
    state: &'a Cell<RunState>,
}

impl<'a> ActiveRun<'a> {
    fn start(state: &'a Cell<RunState>) -> Option<Self> {
        if state.get() != RunState::Idle {
            return None;
        }

        state.set(RunState::Running);
        Some(Self { state })
    }
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        self.state.set(RunState::Idle);
    }
}

/// Drives a [`Network`] over the batches of a [`BatchSource`].
///
/// A model is meant to be shared by reference on a single thread: training only borrows it,
/// so the caller can cancel, inspect or predict between epochs while a run is suspended.
pub struct Model<B: BatchSource, L: LossFn> {
    network: RefCell<Network>,
    source: RefCell<B>,
    loss_fn: L,

    epoch: Cell<usize>,
    state: Cell<RunState>,
}

impl<B: BatchSource, L: LossFn> Model<B, L> {
    /// Returns a new `Model`.
    ///
    /// # Arguments
    /// * `network` - The network that will be trained.
    /// * `source` - Supplies the samples of each epoch.
    /// * `loss_fn` - Turns a target and a prediction into the error fed back.
    pub fn new(network: Network, source: B, loss_fn: L) -> Self {
        Self {
            network: RefCell::new(network),
            source: RefCell::new(source),
            loss_fn,
            epoch: Cell::new(0),
            state: Cell::new(RunState::Idle),
        }
    }

    /// The number of epochs run so far.
    pub fn epoch(&self) -> usize {
        self.epoch.get()
    }

    pub fn is_training(&self) -> bool {
        self.state.get() != RunState::Idle
    }

    /// Borrows the network. Must not be held across an await on a running `train`.
    pub fn network(&self) -> Ref<'_, Network> {
        self.network.borrow()
    }

    pub fn predict(&self, input: Vector) -> Result<Vector> {
        self.network.borrow_mut().predict(input)
    }

    pub fn into_network(self) -> Network {
        self.network.into_inner()
    }

    /// Asks the active run to stop at the next epoch boundary. Does nothing when idle.
    pub fn cancel_training(&self) {
        if self.state.get() == RunState::Running {
            self.state.set(RunState::Cancelling);
        }
    }

    /// Runs `epochs` more epochs, yielding to the runtime between two epochs.
    ///
    /// `log` receives the current epoch at most once every 10 epochs and once a second, and
    /// always once when the run ends.
    ///
    /// # Returns
    /// How the run ended, or the first error raised by the network. A run started while
    /// another is active is rejected without touching the network.
    pub async fn train<F>(&self, epochs: usize, mut log: F) -> Result<TrainOutcome>
    where
        F: FnMut(usize),
    {
        let Some(_run) = ActiveRun::start(&self.state) else {
            warn!("train called on a model which is already training");
            return Ok(TrainOutcome::Rejected);
        };

        let final_epoch = self.epoch.get() + epochs;
        let mut throttle = LogThrottle::default();
        info!("training from epoch {} to {final_epoch}", self.epoch.get());

        let outcome = loop {
            let epoch = self.epoch.get();
            if epoch >= final_epoch {
                break TrainOutcome::Completed { epoch };
            }
            if self.state.get() == RunState::Cancelling {
                break TrainOutcome::Cancelled { epoch };
            }

            self.train_epoch(epoch + 1)?;

            let epoch = epoch + 1;
            if epoch < final_epoch {
                if throttle.should_log(epoch, Instant::now()) {
                    log(epoch);
                }
                tokio::task::yield_now().await;
            }
        };

        info!("training stopped: {outcome:?}");
        log(self.epoch.get());
        Ok(outcome)
    }

    fn train_epoch(&self, epoch: usize) -> Result<()> {
        let samples = self.source.borrow_mut().batch(epoch);
        let mut network = self.network.borrow_mut();
        debug!("epoch {epoch}: {} samples", samples.len());

        let batch = samples
            .into_iter()
            .map(|Sample { input, output: target }| {
                let Forward { output, trace } = network.pass_forward(input, Mode::Training)?;
                check_size("target", target.len(), output.len())?;

                let error = math::row_zip(
                    target.view(),
                    output.view(),
                    |t, p, _| self.loss_fn.derivative(t, p),
                    None,
                );
                Ok((trace, error))
            })
            .collect::<Result<Vec<_>>>()?;

        network.pass_batch_back(batch)?;
        self.epoch.set(epoch);
        Ok(())
    }
}
