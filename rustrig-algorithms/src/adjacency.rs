//! Longest run of adjacent channels, with a small gap tolerance.
//!
//! Channels are sorted and walked pairwise, wrapping from the last channel back
//! to the first so the final run is always closed. A step of one channel
//! extends the run, a repeated channel is neutral, and a gap of two up to
//! `max_gap` channels extends the run while tolerance budget remains. Anything
//! else breaks the run and refills the budget.
//!
//! The budget check happens before the gap's cost is spent, so the last bridged
//! gap may overdraw it.

pub use rustrig_core::ToleranceRule;
use rustrig_core::Channel;

/// Widest gap that can be bridged.
pub const DEFAULT_MAX_GAP: u32 = 5;

/// Relation between one channel and the next in sorted order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    /// Same channel again.
    Repeat,
    /// Neighbouring channel.
    Adjacent,
    /// Gap bridged by spending tolerance.
    Bridged {
        /// Channel distance.
        gap: u32,
    },
    /// The run ended.
    Break {
        /// Length of the run that ended.
        run: u16,
        /// Whether that run is the longest so far.
        longest: bool,
    },
}

/// Walks sorted channel lists and measures adjacent runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdjacencyScanner {
    /// Tolerance budget per run.
    pub tolerance: u32,
    /// Cost charged for each bridged gap.
    pub rule: ToleranceRule,
    /// Widest bridgeable gap.
    pub max_gap: u32,
}

impl Default for AdjacencyScanner {
    fn default() -> Self {
        Self::new(3, ToleranceRule::GapWidth)
    }
}

impl AdjacencyScanner {
    /// Creates a scanner with the default maximum gap.
    #[must_use]
    pub fn new(tolerance: u32, rule: ToleranceRule) -> Self {
        Self {
            tolerance,
            rule,
            max_gap: DEFAULT_MAX_GAP,
        }
    }

    /// Sets the widest bridgeable gap.
    #[must_use]
    pub fn with_max_gap(mut self, max_gap: u32) -> Self {
        self.max_gap = max_gap;
        self
    }

    /// Length of the longest run among `channels`, in any order.
    ///
    /// Returns 0 for an empty list and for a list on a single channel.
    pub fn longest_run(&self, channels: impl IntoIterator<Item = Channel>) -> u16 {
        let mut sorted: Vec<Channel> = channels.into_iter().collect();
        sorted.sort_unstable();
        self.walk(&sorted, |_, _, _| {})
    }

    /// Walks `sorted` pairwise and returns the longest run.
    ///
    /// `visit(i, next, link)` is called once per position, where `next` is
    /// `i + 1` wrapped to 0 on the last position.
    pub fn walk(&self, sorted: &[Channel], mut visit: impl FnMut(usize, usize, Link)) -> u16 {
        let n = sorted.len();
        let mut run: u16 = 1;
        let mut longest: u16 = 0;
        let mut spent: u32 = 0;

        for i in 0..n {
            let next = (i + 1) % n;
            let gap = i64::from(sorted[next]) - i64::from(sorted[i]);

            let link = match u32::try_from(gap) {
                Ok(0) => Link::Repeat,
                Ok(1) => {
                    run = run.saturating_add(1);
                    Link::Adjacent
                }
                Ok(gap) if gap <= self.max_gap && spent < self.tolerance => {
                    run = run.saturating_add(1);
                    spent = spent.saturating_add(self.rule.cost(gap));
                    Link::Bridged { gap }
                }
                _ => {
                    let closed = run;
                    let is_longest = closed > longest;
                    if is_longest {
                        longest = closed;
                    }
                    run = 1;
                    spent = 0;
                    Link::Break {
                        run: closed,
                        longest: is_longest,
                    }
                }
            };
            visit(i, next, link);
        }

        longest
    }
}
