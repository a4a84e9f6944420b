//! Training Logger
//!
//! Records training metrics to a CSV file and echoes them through
//! `tracing`, so a run can be plotted afterwards and watched live.
//!
//! ## Example
//!
//! ```rust,no_run
//! use char_rnn::TrainingLogger;
//!
//! let mut logger = TrainingLogger::new("training_log.csv")?;
//! logger.log(100, 0.1, 1.2, 1.35, 0.8)?;
//! # Ok::<(), char_rnn::RnnError>(())
//! ```
//!
//! ## CSV Format
//!
//! - `step`: Training iteration
//! - `elapsed_seconds`: Time since the logger was created
//! - `learning_rate`: Step size used
//! - `loss`: Per-token cross-entropy of the latest window
//! - `smooth_loss`: Exponential moving average of `loss`
//! - `perplexity`: `exp(loss)`
//! - `grad_norm`: L2 norm of the clipped gradients
//!
//! ## Perplexity
//!
//! ```text
//! perplexity = exp(loss)
//! ```
//!
//! A uniform guess over a vocabulary of `V` symbols has perplexity `V`;
//! a perfect predictor has perplexity 1.

use crate::error::Result;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Instant;

/// CSV + console logger for training metrics
pub struct TrainingLogger {
    log_file: File,
    start_time: Instant,
    last_log_time: Instant,
}

impl TrainingLogger {
    /// Create the CSV file and write its header
    pub fn new(log_path: impl AsRef<Path>) -> Result<Self> {
        let mut log_file = File::create(log_path.as_ref())?;
        writeln!(
            log_file,
            "step,elapsed_seconds,learning_rate,loss,smooth_loss,perplexity,grad_norm"
        )?;

        let now = Instant::now();
        Ok(Self {
            log_file,
            start_time: now,
            last_log_time: now,
        })
    }

    /// Logger over a read-only handle, so every `log` call fails
    #[cfg(test)]
    pub(crate) fn read_only(log_path: impl AsRef<Path>) -> Result<Self> {
        let now = Instant::now();
        Ok(Self {
            log_file: File::open(log_path.as_ref())?,
            start_time: now,
            last_log_time: now,
        })
    }

    /// Append one row and echo it to the console
    pub fn log(
        &mut self,
        step: usize,
        learning_rate: f64,
        loss: f64,
        smooth_loss: f64,
        grad_norm: f64,
    ) -> Result<()> {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        let perplexity = loss.exp();

        writeln!(
            self.log_file,
            "{},{:.2},{:.6},{:.6},{:.6},{:.4},{:.6}",
            step, elapsed, learning_rate, loss, smooth_loss, perplexity, grad_norm
        )?;

        // Flush every row so a crashed run still leaves its history behind
        self.log_file.flush()?;

        let step_time = self.last_log_time.elapsed().as_secs_f64();
        tracing::info!(
            "Step {:6} | Time: {:7.1}s (+{:.1}s) | LR: {:.4} | Loss: {:.4} | Smooth: {:.4} | Perplexity: {:.2} | Grad: {:.3}",
            step,
            elapsed,
            step_time,
            learning_rate,
            loss,
            smooth_loss,
            perplexity,
            grad_norm
        );

        self.last_log_time = Instant::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_header_and_rows() {
        let path = std::env::temp_dir().join(format!(
            "char_rnn_logger_{}.csv",
            std::process::id()
        ));
        {
            let mut logger = TrainingLogger::new(&path).unwrap();
            logger.log(1, 0.1, 1.0, 1.3, 0.5).unwrap();
            logger.log(2, 0.1, 0.0, 1.2, 0.25).unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("step,elapsed_seconds"));
        assert!(lines[1].starts_with("1,"));
        // exp(0) = 1 for the second row's perplexity
        assert!(lines[2].contains(",1.0000,"));

        std::fs::remove_file(&path).unwrap();
    }
}
