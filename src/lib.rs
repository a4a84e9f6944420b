//! char-rnn: Educational Character-Level RNN
//!
//! A vanilla recurrent neural network trained with hand-written
//! backpropagation through time, implemented from scratch in Rust. Every
//! gradient is computed explicitly so you can follow exactly how the loss
//! flows back through each timestep.
//!
//! # Modules
//!
//! - [`tensor`] - Dense vectors and matrices
//! - [`activation`] - Softmax and tanh
//! - [`model`] - Configuration and the parameter store
//! - [`forward`] - Forward pass over one window
//! - [`backward`] - Backpropagation through time
//! - [`gradients`] - Clipping and gradient diagnostics
//! - [`optimizer`] - SGD and Adagrad updates
//! - [`train`] - Training loop, session state and the data-source trait
//! - [`data`] - Windowed reader over a token stream
//! - [`vocab`] - Character vocabulary
//! - [`checkpoint`] - Model snapshots
//! - [`training_logger`] - CSV and console metric logging
//!
//! # Example
//!
//! ```rust,no_run
//! use char_rnn::{CharVocab, RnnConfig, SequenceReader, Trainer, TrainingConfig};
//!
//! let text = std::fs::read_to_string("input.txt")?;
//! let vocab = CharVocab::from_text(&text);
//! let tokens = vocab.encode(&text)?;
//!
//! let config = RnnConfig::new(100, vocab.size(), 25, 0.1)?;
//! let mut reader = SequenceReader::new(tokens, config.seq_length)?;
//! let mut trainer = Trainer::new(config, TrainingConfig::default())?;
//!
//! let outcome = trainer.run(&mut reader)?;
//! println!("stopped after {} iterations: {:?}", outcome.iterations, outcome.reason);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod activation;
pub mod backward;
pub mod checkpoint;
pub mod data;
pub mod error;
pub mod forward;
pub mod gradients;
pub mod model;
pub mod optimizer;
pub mod tensor;
pub mod train;
pub mod training_logger;
pub mod vocab;

// Re-export main types for convenience
pub use activation::{softmax, tanh_backward, tanh_forward};
pub use backward::{backward, cross_entropy, BackwardOutput, DEFAULT_GRAD_CLIP, PROB_EPSILON};
pub use checkpoint::ModelSnapshot;
pub use data::SequenceReader;
pub use error::{Result, RnnError};
pub use forward::{forward, ForwardTrace};
pub use model::{RnnConfig, RnnGradients, RnnParams};
pub use optimizer::{AdagradOptimizer, Optimizer, OptimizerKind};
pub use tensor::Tensor;
pub use train::{
    DataSource, SessionState, StepReport, StopReason, TrainOutcome, Trainer, TrainingConfig,
    TrainingSession, Window,
};
pub use training_logger::TrainingLogger;
pub use vocab::CharVocab;
