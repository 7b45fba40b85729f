//! Paced reveal of reply text.
//!
//! Text fragments are queued as they arrive and drained into the sink
//! either whole or one character at a time. Draining never reorders or
//! drops characters; it only decides when each piece becomes visible.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// How queued text is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevealPacing {
    /// Each fragment is appended as soon as it arrives.
    #[default]
    Immediate,
    /// One character at a time with a delay between characters.
    PerChar {
        /// Delay before each character.
        delay: Duration,
        /// Release whitespace without waiting.
        skip_whitespace: bool,
    },
}

impl RevealPacing {
    /// A typing effect: 15ms per character, spaces undelayed.
    #[must_use]
    pub fn typing() -> Self {
        Self::PerChar {
            delay: Duration::from_millis(15),
            skip_whitespace: true,
        }
    }

    /// Per-character pacing with a custom delay.
    #[must_use]
    pub fn per_char(delay: Duration) -> Self {
        Self::PerChar {
            delay,
            skip_whitespace: true,
        }
    }
}

/// FIFO of text waiting to be revealed.
///
/// [`next_step`](Self::next_step) is cancel-safe: dropping it mid-wait
/// keeps both the text and the pending deadline, so it can sit in a
/// `tokio::select!` loop.
#[derive(Debug)]
pub struct RevealQueue {
    pacing: RevealPacing,
    pending: VecDeque<String>,
    next_at: Option<Instant>,
}

impl RevealQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new(pacing: RevealPacing) -> Self {
        Self {
            pacing,
            pending: VecDeque::new(),
            next_at: None,
        }
    }

    /// The pacing in use.
    #[must_use]
    pub fn pacing(&self) -> RevealPacing {
        self.pacing
    }

    /// Queue a fragment.
    pub fn push(&mut self, text: &str) {
        if !text.is_empty() {
            self.pending.push_back(text.to_owned());
        }
    }

    /// Check if nothing is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of characters waiting.
    #[must_use]
    pub fn pending_chars(&self) -> usize {
        self.pending.iter().map(|s| s.chars().count()).sum()
    }

    /// Drop everything queued and any pending timer.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.next_at = None;
    }

    /// Wait for the next piece of text to be due and return it.
    ///
    /// Returns `None` if the queue is empty.
    pub async fn next_step(&mut self) -> Option<String> {
        let delay = self.peek_delay()?;

        if !delay.is_zero() {
            let deadline = *self.next_at.get_or_insert_with(|| Instant::now() + delay);
            tokio::time::sleep_until(deadline).await;
        }

        self.next_at = None;
        self.take_step()
    }

    /// Drain everything that is immediately due, without waiting.
    ///
    /// With [`RevealPacing::Immediate`] this is the whole queue.
    pub fn take_ready(&mut self) -> String {
        let mut out = String::new();
        while matches!(self.peek_delay(), Some(d) if d.is_zero()) {
            match self.take_step() {
                Some(step) => out.push_str(&step),
                None => break,
            }
        }
        out
    }

    fn peek_delay(&self) -> Option<Duration> {
        let front = self.pending.front()?;
        match self.pacing {
            RevealPacing::Immediate => Some(Duration::ZERO),
            RevealPacing::PerChar {
                delay,
                skip_whitespace,
            } => {
                let ch = front.chars().next()?;
                if skip_whitespace && ch.is_whitespace() {
                    Some(Duration::ZERO)
                } else {
                    Some(delay)
                }
            }
        }
    }

    fn take_step(&mut self) -> Option<String> {
        match self.pacing {
            RevealPacing::Immediate => self.pending.pop_front(),
            RevealPacing::PerChar { .. } => {
                let front = self.pending.front_mut()?;
                let ch = front.chars().next()?;
                front.replace_range(..ch.len_utf8(), "");
                if front.is_empty() {
                    self.pending.pop_front();
                }
                Some(ch.to_string())
            }
        }
    }
}
