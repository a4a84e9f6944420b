//! Training Loop
//!
//! Drives repeated forward → backward → update cycles over windows pulled
//! from a [`DataSource`], carrying the hidden state from one window into the
//! next until the smoothed loss crosses a convergence threshold.
//!
//! ## One Iteration
//!
//! ```text
//! window = source.next_window()          (None → stop: exhausted)
//! if window.restart: h_prev = 0
//! trace  = forward(inputs, h_prev)
//! grads, loss = backward(trace, targets)
//! smooth_loss = s * smooth_loss + (1 - s) * loss / T
//! params -= lr * grads                   (or Adagrad)
//! h_prev = h[T-1]
//! if smooth_loss <= threshold: converged
//! ```
//!
//! The loss is divided by the window length before smoothing, so the
//! threshold means the same thing whatever window size the source uses.
//!
//! ## Session State
//!
//! Everything that survives between iterations (hidden state, smoothed
//! loss, iteration count, convergence flag) lives in a [`TrainingSession`]
//! owned by the [`Trainer`]. The session is serializable, which is what
//! makes a run resumable from a [`ModelSnapshot`].
//!
//! ## Example
//!
//! ```rust
//! use char_rnn::{RnnConfig, SequenceReader, Trainer, TrainingConfig};
//!
//! let tokens: Vec<usize> = (0..64).map(|i| i % 4).collect();
//! let mut reader = SequenceReader::new(tokens, 8)?.with_max_epochs(2);
//!
//! let config = RnnConfig::new(8, 4, 8, 0.1)?;
//! let mut trainer = Trainer::new(config, TrainingConfig::default())?;
//! let outcome = trainer.run(&mut reader)?;
//! assert_eq!(outcome.iterations, trainer.session().iteration);
//! # Ok::<(), char_rnn::RnnError>(())
//! ```

use crate::backward::{backward, DEFAULT_GRAD_CLIP};
use crate::checkpoint::ModelSnapshot;
use crate::error::{Result, RnnError};
use crate::forward::forward;
use crate::gradients::compute_grad_norm;
use crate::model::{RnnConfig, RnnParams};
use crate::optimizer::{Optimizer, OptimizerKind};
use crate::tensor::Tensor;
use crate::training_logger::TrainingLogger;
use serde::{Deserialize, Serialize};

/// One window of training data
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Window {
    /// Input token indices
    pub inputs: Vec<usize>,
    /// `targets[t]` is the token expected after `inputs[t]`
    pub targets: Vec<usize>,
    /// Zero the hidden state before this window (sequence boundary)
    pub restart: bool,
}

impl Window {
    pub fn new(inputs: Vec<usize>, targets: Vec<usize>, restart: bool) -> Self {
        Self {
            inputs,
            targets,
            restart,
        }
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    fn validate(&self) -> Result<()> {
        if self.inputs.len() != self.targets.len() {
            return Err(RnnError::LengthMismatch {
                inputs: self.inputs.len(),
                targets: self.targets.len(),
            });
        }
        if self.inputs.is_empty() {
            return Err(RnnError::EmptyWindow);
        }
        Ok(())
    }
}

/// Pull-style source of training windows
///
/// Returning `None` means the data is exhausted. Any
/// `FnMut() -> Option<Window>` closure is a data source.
pub trait DataSource {
    fn next_window(&mut self) -> Option<Window>;
}

impl<F> DataSource for F
where
    F: FnMut() -> Option<Window>,
{
    fn next_window(&mut self) -> Option<Window> {
        self()
    }
}

/// Training hyperparameters
///
/// Model shape and learning rate live in [`RnnConfig`]; this holds how the
/// loop itself behaves.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Stop once the smoothed per-token loss is at or below this
    pub threshold: f64,
    /// Element-wise gradient clip
    pub grad_clip: f64,
    /// Decay of the smoothed loss moving average
    pub smoothing: f64,
    /// Optional cap on iterations per [`Trainer::run`] call
    pub max_iterations: Option<usize>,
    /// Log progress every N iterations (0 disables)
    pub log_every: usize,
    /// Update rule
    pub optimizer: OptimizerKind,
    /// Seed for parameter initialization
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            threshold: 0.01,
            grad_clip: DEFAULT_GRAD_CLIP,
            smoothing: 0.999,
            max_iterations: None,
            log_every: 100,
            optimizer: OptimizerKind::Sgd,
            seed: 42,
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() {
            return Err(RnnError::InvalidConfig(format!(
                "threshold must be finite, got {}",
                self.threshold
            )));
        }
        if self.grad_clip.is_nan() || self.grad_clip <= 0.0 {
            return Err(RnnError::InvalidConfig(format!(
                "grad_clip must be positive, got {}",
                self.grad_clip
            )));
        }
        if !(0.0..1.0).contains(&self.smoothing) {
            return Err(RnnError::InvalidConfig(format!(
                "smoothing must lie in [0, 1), got {}",
                self.smoothing
            )));
        }
        Ok(())
    }
}

/// Whether the session can still make progress
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Running,
    Converged,
}

/// State carried across training iterations
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingSession {
    /// Hidden state entering the next window
    pub hidden: Tensor,
    /// Moving average of the per-token loss
    pub smooth_loss: f64,
    /// Iterations completed so far
    pub iteration: usize,
    pub state: SessionState,
}

impl TrainingSession {
    /// Fresh session: zero hidden state and the loss of a uniform guess,
    /// `-ln(1 / input_size)`
    pub fn new(config: &RnnConfig) -> Self {
        Self {
            hidden: Tensor::zeros(vec![config.hidden_size]),
            smooth_loss: -(1.0 / config.input_size as f64).ln(),
            iteration: 0,
            state: SessionState::Running,
        }
    }

    pub fn reset_hidden(&mut self) {
        self.hidden = Tensor::zeros(self.hidden.shape.clone());
    }

    pub fn is_converged(&self) -> bool {
        self.state == SessionState::Converged
    }
}

/// Metrics of a single iteration
#[derive(Clone, Debug, PartialEq)]
pub struct StepReport {
    pub iteration: usize,
    /// Window loss divided by window length
    pub loss: f64,
    pub smooth_loss: f64,
    pub grad_norm: f64,
    pub converged: bool,
}

/// Why [`Trainer::run`] returned
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The smoothed loss reached the threshold
    Converged,
    /// The data source ran dry first
    Exhausted,
    /// `max_iterations` was reached first
    IterationLimit,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrainOutcome {
    pub reason: StopReason,
    /// Iterations performed by this `run` call
    pub iterations: usize,
    pub smooth_loss: f64,
}

impl TrainOutcome {
    pub fn converged(&self) -> bool {
        self.reason == StopReason::Converged
    }
}

/// Training loop controller
///
/// Owns the parameters, the optimizer, the session and an optional CSV
/// logger. Parameters are only ever mutated by the update at the end of
/// [`Trainer::step`].
pub struct Trainer {
    config: RnnConfig,
    training: TrainingConfig,
    params: RnnParams,
    optimizer: Optimizer,
    session: TrainingSession,
    logger: Option<TrainingLogger>,
}

impl Trainer {
    /// New trainer with freshly initialized parameters seeded from
    /// `training.seed`
    pub fn new(config: RnnConfig, training: TrainingConfig) -> Result<Self> {
        config.validate()?;
        let params =
            RnnParams::initialize_seeded(config.hidden_size, config.input_size, training.seed)?;
        Self::with_params(config, params, training)
    }

    /// New trainer around existing parameters and a fresh session
    pub fn with_params(
        config: RnnConfig,
        params: RnnParams,
        training: TrainingConfig,
    ) -> Result<Self> {
        config.validate()?;
        training.validate()?;
        params.ensure_shapes(&config)?;

        let optimizer = Optimizer::new(training.optimizer, &params);
        let session = TrainingSession::new(&config);
        Ok(Self {
            config,
            training,
            params,
            optimizer,
            session,
            logger: None,
        })
    }

    /// Resume from a snapshot
    ///
    /// The snapshot's optimizer state is kept when it matches
    /// `training.optimizer`; otherwise a fresh optimizer is created.
    pub fn from_snapshot(snapshot: ModelSnapshot, training: TrainingConfig) -> Result<Self> {
        snapshot.validate()?;
        training.validate()?;

        let optimizer = if snapshot.optimizer.kind() == training.optimizer {
            snapshot.optimizer
        } else {
            Optimizer::new(training.optimizer, &snapshot.params)
        };
        Ok(Self {
            config: snapshot.config,
            training,
            params: snapshot.params,
            optimizer,
            session: snapshot.session,
            logger: None,
        })
    }

    /// Attach a CSV logger, written every `log_every` iterations
    pub fn with_logger(mut self, logger: TrainingLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn config(&self) -> &RnnConfig {
        &self.config
    }

    pub fn training_config(&self) -> &TrainingConfig {
        &self.training
    }

    pub fn params(&self) -> &RnnParams {
        &self.params
    }

    pub fn session(&self) -> &TrainingSession {
        &self.session
    }

    /// Capture parameters, optimizer state and session for checkpointing
    pub fn snapshot(&self) -> ModelSnapshot {
        ModelSnapshot {
            config: self.config.clone(),
            params: self.params.clone(),
            optimizer: self.optimizer.clone(),
            session: self.session.clone(),
            vocab: None,
        }
    }

    /// Run exactly one training iteration on `window`
    ///
    /// # Errors
    ///
    /// Configuration errors (mismatched or empty window), out-of-range
    /// tokens, and non-finite gradients abort the iteration. In every error
    /// case neither the parameters nor the session are modified. A failure
    /// to write the progress log comes after the update, so it is reported
    /// as a warning and the step still succeeds.
    pub fn step(&mut self, window: &Window) -> Result<StepReport> {
        window.validate()?;

        let h_prev = if window.restart {
            tracing::debug!(iteration = self.session.iteration, "hidden state reset");
            Tensor::zeros(vec![self.config.hidden_size])
        } else {
            self.session.hidden.clone()
        };

        let trace = forward(&self.params, &window.inputs, &h_prev)?;
        let output = backward(&self.params, &trace, &window.targets, self.training.grad_clip)?;

        let loss = output.loss / window.len() as f64;
        let s = self.training.smoothing;
        self.session.smooth_loss = s * self.session.smooth_loss + (1.0 - s) * loss;

        self.optimizer
            .step(&mut self.params, &output.grads, self.config.learning_rate);

        self.session.hidden = trace.last_hidden().clone();
        self.session.iteration += 1;
        if self.session.smooth_loss <= self.training.threshold {
            self.session.state = SessionState::Converged;
        }

        let report = StepReport {
            iteration: self.session.iteration,
            loss,
            smooth_loss: self.session.smooth_loss,
            grad_norm: compute_grad_norm(&output.grads),
            converged: self.session.is_converged(),
        };

        if self.training.log_every > 0 && report.iteration % self.training.log_every == 0 {
            if let Err(error) = self.log_progress(&report) {
                tracing::warn!(
                    iteration = report.iteration,
                    %error,
                    "failed to write training log"
                );
            }
        }

        Ok(report)
    }

    fn log_progress(&mut self, report: &StepReport) -> Result<()> {
        match self.logger.as_mut() {
            Some(logger) => logger.log(
                report.iteration,
                self.config.learning_rate,
                report.loss,
                report.smooth_loss,
                report.grad_norm,
            ),
            None => {
                tracing::info!(
                    iteration = report.iteration,
                    loss = report.loss,
                    smooth_loss = report.smooth_loss,
                    grad_norm = report.grad_norm,
                    "training progress"
                );
                Ok(())
            }
        }
    }

    /// Train until converged, exhausted, or the iteration cap is hit
    pub fn run<S>(&mut self, source: &mut S) -> Result<TrainOutcome>
    where
        S: DataSource + ?Sized,
    {
        let mut iterations = 0;

        let reason = loop {
            if self.session.is_converged() {
                break StopReason::Converged;
            }
            if let Some(max) = self.training.max_iterations {
                if iterations >= max {
                    break StopReason::IterationLimit;
                }
            }
            let Some(window) = source.next_window() else {
                break StopReason::Exhausted;
            };
            self.step(&window)?;
            iterations += 1;
        };

        let outcome = TrainOutcome {
            reason,
            iterations,
            smooth_loss: self.session.smooth_loss,
        };

        match reason {
            StopReason::Converged => tracing::info!(
                iterations,
                smooth_loss = outcome.smooth_loss,
                "training converged"
            ),
            StopReason::Exhausted | StopReason::IterationLimit => tracing::warn!(
                iterations,
                smooth_loss = outcome.smooth_loss,
                threshold = self.training.threshold,
                ?reason,
                "training stopped before convergence"
            ),
        }

        Ok(outcome)
    }
}
