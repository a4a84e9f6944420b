//! Windowed Token Reader
//!
//! A default [`DataSource`] that slides non-overlapping windows over a
//! token stream. Targets are the inputs shifted by one position:
//!
//! ```text
//! Tokens:      [a, b, c, d, e, f, g, h, i]
//! seq_length:  4
//!
//! Window 1:  inputs [a, b, c, d]  targets [b, c, d, e]  restart
//! Window 2:  inputs [e, f, g, h]  targets [f, g, h, i]
//! Window 3:  wraps back to the start                    restart
//! ```
//!
//! The first window and every wrap-around are flagged `restart`, since the
//! hidden state left at the end of the stream says nothing about its
//! beginning. Tokens at the tail that do not fill a whole window are skipped.

use crate::error::{Result, RnnError};
use crate::train::{DataSource, Window};

/// Cycles over a token stream in windows of `seq_length`
pub struct SequenceReader {
    tokens: Vec<usize>,
    seq_length: usize,
    position: usize,
    epoch: usize,
    max_epochs: Option<usize>,
    started: bool,
}

impl SequenceReader {
    /// Create a reader over `tokens`
    ///
    /// Streams shorter than `seq_length + 1` produce windows of
    /// `tokens.len() - 1` instead.
    ///
    /// # Errors
    ///
    /// [`RnnError::InvalidConfig`] if `seq_length` is zero or the stream has
    /// fewer than two tokens (no input/target pair).
    pub fn new(tokens: Vec<usize>, seq_length: usize) -> Result<Self> {
        if seq_length == 0 {
            return Err(RnnError::InvalidConfig("seq_length must be positive".into()));
        }
        if tokens.len() < 2 {
            return Err(RnnError::InvalidConfig(format!(
                "need at least 2 tokens to form a window, got {}",
                tokens.len()
            )));
        }
        Ok(Self {
            tokens,
            seq_length,
            position: 0,
            epoch: 0,
            max_epochs: None,
            started: false,
        })
    }

    /// Report exhaustion after `max_epochs` full passes
    pub fn with_max_epochs(mut self, max_epochs: usize) -> Self {
        self.max_epochs = Some(max_epochs);
        self
    }

    /// Completed passes over the stream
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    /// Length of every window this reader produces
    pub fn window_length(&self) -> usize {
        self.seq_length.min(self.tokens.len() - 1)
    }

    /// Number of windows in one pass
    pub fn windows_per_epoch(&self) -> usize {
        (self.tokens.len() - 1) / self.window_length()
    }

    /// Start over from the first window and epoch zero
    pub fn reset(&mut self) {
        self.position = 0;
        self.epoch = 0;
        self.started = false;
    }

    fn exhausted(&self) -> bool {
        self.max_epochs.is_some_and(|max| self.epoch >= max)
    }
}

impl DataSource for SequenceReader {
    fn next_window(&mut self) -> Option<Window> {
        if self.exhausted() {
            return None;
        }

        let len = self.window_length();
        let mut restart = false;

        if !self.started {
            self.started = true;
            restart = true;
        } else if self.position + len + 1 > self.tokens.len() {
            self.epoch += 1;
            self.position = 0;
            restart = true;
            if self.exhausted() {
                return None;
            }
        }

        let start = self.position;
        let inputs = self.tokens[start..start + len].to_vec();
        let targets = self.tokens[start + 1..start + len + 1].to_vec();
        self.position += len;

        Some(Window::new(inputs, targets, restart))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows_and_wraparound() {
        let mut reader = SequenceReader::new((0..9).collect(), 4).unwrap();

        let w1 = reader.next_window().unwrap();
        assert_eq!(w1.inputs, vec![0, 1, 2, 3]);
        assert_eq!(w1.targets, vec![1, 2, 3, 4]);
        assert!(w1.restart);

        let w2 = reader.next_window().unwrap();
        assert_eq!(w2.inputs, vec![4, 5, 6, 7]);
        assert_eq!(w2.targets, vec![5, 6, 7, 8]);
        assert!(!w2.restart);

        let w3 = reader.next_window().unwrap();
        assert_eq!(w3.inputs, vec![0, 1, 2, 3]);
        assert!(w3.restart);
        assert_eq!(reader.epoch(), 1);
    }

    #[test]
    fn test_max_epochs_exhausts_for_good() {
        let mut reader = SequenceReader::new((0..9).collect(), 4)
            .unwrap()
            .with_max_epochs(1);
        assert_eq!(reader.windows_per_epoch(), 2);

        assert!(reader.next_window().is_some());
        assert!(reader.next_window().is_some());
        assert!(reader.next_window().is_none());
        assert!(reader.next_window().is_none());

        reader.reset();
        assert!(reader.next_window().unwrap().restart);
    }

    #[test]
    fn test_short_stream_shrinks_window() {
        let mut reader = SequenceReader::new(vec![3, 1, 2], 10).unwrap();
        assert_eq!(reader.window_length(), 2);
        let w = reader.next_window().unwrap();
        assert_eq!(w.inputs, vec![3, 1]);
        assert_eq!(w.targets, vec![1, 2]);
    }

    #[test]
    fn test_rejects_degenerate_streams() {
        assert!(SequenceReader::new(vec![1], 4).is_err());
        assert!(SequenceReader::new(vec![1, 2, 3], 0).is_err());
    }
}
