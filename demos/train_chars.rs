//! Train a Character-Level RNN on a Text File
//!
//! Builds a vocabulary from the input text, slides `seq-length` windows over
//! it and trains until the smoothed loss reaches the threshold.
//!
//! ## Usage
//!
//! ```bash
//! # Built-in phrase, default settings
//! cargo run --release --example train_chars
//!
//! # Your own corpus with Adagrad
//! cargo run --release --example train_chars -- \
//!     --data input.txt --hidden 100 --seq-length 25 --optimizer adagrad
//!
//! # Resume a previous run
//! cargo run --release --example train_chars -- --resume data/char_rnn.json
//! ```
//!
//! Set `RUST_LOG=char_rnn=debug` to see hidden-state resets.

use char_rnn::{
    CharVocab, ModelSnapshot, OptimizerKind, RnnConfig, SequenceReader, Trainer,
    TrainingConfig, TrainingLogger,
};
use clap::{Parser, ValueEnum};
use std::fs;
use tracing_subscriber::EnvFilter;

const DEFAULT_TEXT: &str = "hello world, hello rnn. ";

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Update {
    Sgd,
    Adagrad,
}

impl From<Update> for OptimizerKind {
    fn from(update: Update) -> Self {
        match update {
            Update::Sgd => OptimizerKind::Sgd,
            Update::Adagrad => OptimizerKind::Adagrad,
        }
    }
}

#[derive(Parser)]
#[command(name = "train_chars", about = "Character-level RNN training")]
struct Args {
    /// Training text (a short built-in phrase is repeated when omitted)
    #[arg(long)]
    data: Option<String>,

    /// Hidden state size
    #[arg(long, default_value_t = 100)]
    hidden: usize,

    /// Window length for truncated BPTT
    #[arg(long, default_value_t = 25)]
    seq_length: usize,

    /// Learning rate
    #[arg(long, default_value_t = 0.1)]
    lr: f64,

    /// Stop once the smoothed per-token loss is at or below this
    #[arg(long, default_value_t = 0.01)]
    threshold: f64,

    /// Iteration cap
    #[arg(long)]
    max_iters: Option<usize>,

    /// Log every N iterations
    #[arg(long, default_value_t = 100)]
    log_every: usize,

    /// Update rule
    #[arg(long, value_enum, default_value_t = Update::Sgd)]
    optimizer: Update,

    /// Initialization seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// CSV metrics file
    #[arg(long, default_value = "data/char_rnn_log.csv")]
    log_file: String,

    /// Where to write the final snapshot
    #[arg(long, default_value = "data/char_rnn.json")]
    checkpoint: String,

    /// Snapshot to resume from
    #[arg(long)]
    resume: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let args = Args::parse();

    let text = match &args.data {
        Some(path) => fs::read_to_string(path).map_err(|e| format!("{}: {}", path, e))?,
        None => DEFAULT_TEXT.repeat(8),
    };

    let training = TrainingConfig {
        threshold: args.threshold,
        max_iterations: args.max_iters,
        log_every: args.log_every,
        optimizer: args.optimizer.into(),
        seed: args.seed,
        ..TrainingConfig::default()
    };

    let (mut trainer, vocab) = match &args.resume {
        Some(path) => {
            let snapshot = ModelSnapshot::load(path)?;
            let vocab = snapshot
                .vocab
                .clone()
                .ok_or_else(|| format!("{} has no vocabulary", path))?;
            (Trainer::from_snapshot(snapshot, training)?, vocab)
        }
        None => {
            let vocab = CharVocab::from_text(&text);
            let config = RnnConfig::new(args.hidden, vocab.size(), args.seq_length, args.lr)?;
            (Trainer::new(config, training)?, vocab)
        }
    };

    let tokens = vocab.encode(&text)?;
    tracing::info!(
        chars = tokens.len(),
        vocab = vocab.size(),
        hidden = trainer.config().hidden_size,
        seq_length = trainer.config().seq_length,
        "starting training"
    );

    if let Some(dir) = std::path::Path::new(&args.log_file).parent() {
        fs::create_dir_all(dir)?;
    }
    if let Some(dir) = std::path::Path::new(&args.checkpoint).parent() {
        fs::create_dir_all(dir)?;
    }

    let mut reader = SequenceReader::new(tokens, trainer.config().seq_length)?;
    trainer = trainer.with_logger(TrainingLogger::new(&args.log_file)?);

    let outcome = trainer.run(&mut reader)?;
    println!(
        "{:?} after {} iterations (smooth loss {:.4})",
        outcome.reason, outcome.iterations, outcome.smooth_loss
    );

    trainer.snapshot().with_vocab(vocab).save(&args.checkpoint)?;
    println!("Snapshot written to {}", args.checkpoint);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimizer_flag() {
        let args = Args::try_parse_from(["train_chars", "--optimizer", "adagrad"]).unwrap();
        assert_eq!(OptimizerKind::from(args.optimizer), OptimizerKind::Adagrad);

        let args = Args::try_parse_from(["train_chars"]).unwrap();
        assert_eq!(OptimizerKind::from(args.optimizer), OptimizerKind::Sgd);

        assert!(Args::try_parse_from(["train_chars", "--optimizer", "adam"]).is_err());
    }
}
