//! Model Snapshots
//!
//! A snapshot holds everything needed to resume training or to run the
//! model elsewhere:
//!
//! - Model configuration
//! - The five parameter tensors
//! - Optimizer state (Adagrad memory, if used)
//! - Training session (carried hidden state, smoothed loss, iteration)
//! - Optionally the character vocabulary the token indices refer to
//!
//! Snapshots are stored as JSON. Loading validates every tensor shape
//! against the stored configuration, so a truncated or hand-edited file is
//! rejected instead of panicking later inside a matrix product.
//!
//! ## Example
//!
//! ```rust,no_run
//! use char_rnn::{ModelSnapshot, RnnConfig, Trainer, TrainingConfig};
//!
//! let trainer = Trainer::new(RnnConfig::tiny(27), TrainingConfig::default())?;
//! trainer.snapshot().save("checkpoint.json")?;
//!
//! let snapshot = ModelSnapshot::load("checkpoint.json")?;
//! let resumed = Trainer::from_snapshot(snapshot, TrainingConfig::default())?;
//! # Ok::<(), char_rnn::RnnError>(())
//! ```

use crate::error::{Result, RnnError};
use crate::model::{RnnConfig, RnnParams};
use crate::optimizer::Optimizer;
use crate::train::TrainingSession;
use crate::vocab::CharVocab;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub config: RnnConfig,
    pub params: RnnParams,
    pub optimizer: Optimizer,
    pub session: TrainingSession,
    #[serde(default)]
    pub vocab: Option<CharVocab>,
}

impl ModelSnapshot {
    /// Attach the vocabulary the model was trained on
    pub fn with_vocab(mut self, vocab: CharVocab) -> Self {
        self.vocab = Some(vocab);
        self
    }

    /// Write the snapshot as JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        tracing::info!("Saving snapshot to {}", path.display());

        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Read and validate a snapshot
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!("Loading snapshot from {}", path.display());

        let reader = BufReader::new(File::open(path)?);
        let snapshot: ModelSnapshot = serde_json::from_reader(reader)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Check that every tensor agrees with the configuration
    pub fn validate(&self) -> Result<()> {
        self.config.validate()?;
        self.params.ensure_shapes(&self.config)?;
        self.session
            .hidden
            .ensure_shape("hidden state", &[self.config.hidden_size])?;

        if let Optimizer::Adagrad(state) = &self.optimizer {
            let (h, i) = (self.config.hidden_size, self.config.input_size);
            state.mem_u.ensure_shape("Adagrad memory U", &[h, i])?;
            state.mem_w.ensure_shape("Adagrad memory W", &[h, h])?;
            state.mem_v.ensure_shape("Adagrad memory V", &[i, h])?;
            state.mem_b.ensure_shape("Adagrad memory b", &[h])?;
            state.mem_c.ensure_shape("Adagrad memory c", &[i])?;
        }

        if let Some(vocab) = &self.vocab {
            if vocab.size() != self.config.input_size {
                return Err(RnnError::InvalidConfig(format!(
                    "vocabulary has {} tokens but input_size is {}",
                    vocab.size(),
                    self.config.input_size
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::train::{Trainer, TrainingConfig, Window};

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("char_rnn_{}_{}.json", name, std::process::id()))
    }

    #[test]
    fn test_save_and_load() {
        let config = RnnConfig::new(4, 3, 2, 0.1).unwrap();
        let mut trainer = Trainer::new(config, TrainingConfig::default()).unwrap();
        trainer
            .step(&Window::new(vec![0, 1], vec![1, 2], true))
            .unwrap();

        let path = temp_path("save_load");
        let snapshot = trainer.snapshot().with_vocab(CharVocab::from_text("abc"));
        snapshot.save(&path).unwrap();
        let loaded = ModelSnapshot::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded.config, snapshot.config);
        assert_eq!(loaded.params, snapshot.params);
        assert_eq!(loaded.session, snapshot.session);
        assert_eq!(loaded.vocab.unwrap().encode("cab").unwrap(), vec![2, 0, 1]);
    }

    #[test]
    fn test_rejects_inconsistent_shapes() {
        let config = RnnConfig::new(4, 3, 2, 0.1).unwrap();
        let trainer = Trainer::new(config, TrainingConfig::default()).unwrap();

        let mut snapshot = trainer.snapshot();
        snapshot.config.hidden_size = 5;
        assert!(matches!(
            snapshot.validate(),
            Err(RnnError::ShapeMismatch { .. })
        ));

        let mut snapshot = trainer.snapshot();
        snapshot.vocab = Some(CharVocab::from_text("ab"));
        assert!(matches!(
            snapshot.validate(),
            Err(RnnError::InvalidConfig(_))
        ));
    }
}
