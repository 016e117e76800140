//! Sliding time window with an ADC aggregate and per-channel hit counts.
//!
//! The window is the shared state machine behind every windowed maker. It holds
//! elements ordered by start time and keeps two aggregates in step with them:
//!
//! - the summed ADC contribution of every resident element;
//! - a channel -> hit-count map whose size is the number of distinct channels hit.
//!
//! Entries leave the channel map the moment their count drops to zero, so
//! [`SlidingWindow::n_channels_hit`] is always the map size.

use crate::activity::Activity;
use crate::primitive::{Channel, Primitive, Timestamp};
use std::collections::HashMap;

/// Something that can live in a [`SlidingWindow`].
pub trait WindowElement {
    /// Whether elements are guaranteed to arrive in start-time order.
    ///
    /// Ordered elements are appended; unordered ones are inserted at their
    /// start-time position.
    const ORDERED_DELIVERY: bool;

    /// Start time used for window admission and eviction.
    fn time_start(&self) -> Timestamp;

    /// Contribution to the window's ADC aggregate.
    fn adc_contribution(&self) -> u64;

    /// Calls `f` once per channel hit contributed by this element.
    fn for_each_channel(&self, f: impl FnMut(Channel));
}

impl WindowElement for Primitive {
    const ORDERED_DELIVERY: bool = true;

    #[inline]
    fn time_start(&self) -> Timestamp {
        self.time_start
    }

    #[inline]
    fn adc_contribution(&self) -> u64 {
        u64::from(self.adc_integral)
    }

    #[inline]
    fn for_each_channel(&self, mut f: impl FnMut(Channel)) {
        f(self.channel);
    }
}

impl WindowElement for Activity {
    const ORDERED_DELIVERY: bool = false;

    #[inline]
    fn time_start(&self) -> Timestamp {
        self.time_start
    }

    #[inline]
    fn adc_contribution(&self) -> u64 {
        self.adc_integral
    }

    fn for_each_channel(&self, f: impl FnMut(Channel)) {
        self.channels().for_each(f);
    }
}

/// Time-bounded buffer of elements with running aggregates.
#[derive(Debug, Clone)]
pub struct SlidingWindow<T> {
    time_start: Timestamp,
    adc_integral: u64,
    channel_states: HashMap<Channel, u32>,
    inputs: Vec<T>,
}

impl<T> Default for SlidingWindow<T> {
    fn default() -> Self {
        Self {
            time_start: 0,
            adc_integral: 0,
            channel_states: HashMap::new(),
            inputs: Vec::new(),
        }
    }
}

impl<T: WindowElement> SlidingWindow<T> {
    /// Creates an empty window.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the window holds no elements.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Number of resident elements.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// Start time of the earliest resident element.
    #[inline]
    #[must_use]
    pub fn time_start(&self) -> Timestamp {
        self.time_start
    }

    /// Summed ADC contribution of the resident elements.
    #[inline]
    #[must_use]
    pub fn adc_integral(&self) -> u64 {
        self.adc_integral
    }

    /// Number of distinct channels hit.
    #[inline]
    #[must_use]
    pub fn n_channels_hit(&self) -> usize {
        self.channel_states.len()
    }

    /// Hit count recorded for `channel` (0 if absent).
    #[must_use]
    pub fn channel_hits(&self, channel: Channel) -> u32 {
        self.channel_states.get(&channel).copied().unwrap_or(0)
    }

    /// Distinct channels currently hit, in no particular order.
    pub fn channels(&self) -> impl Iterator<Item = Channel> + '_ {
        self.channel_states.keys().copied()
    }

    /// Resident elements, ordered by start time.
    #[inline]
    #[must_use]
    pub fn inputs(&self) -> &[T] {
        &self.inputs
    }

    /// Earliest resident element.
    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.inputs.first()
    }

    /// Latest resident element.
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.inputs.last()
    }

    /// Whether an element starting at `time` still fits inside `window_length`.
    #[inline]
    #[must_use]
    pub fn admits(&self, time: Timestamp, window_length: Timestamp) -> bool {
        time.saturating_sub(self.time_start) < window_length
    }

    /// Adds an element, keeping start-time order.
    pub fn add(&mut self, input: T) {
        self.adc_integral += input.adc_contribution();
        let states = &mut self.channel_states;
        input.for_each_channel(|channel| *states.entry(channel).or_insert(0) += 1);

        if T::ORDERED_DELIVERY {
            self.inputs.push(input);
        } else {
            let time = input.time_start();
            let at = self.inputs.partition_point(|e| e.time_start() <= time);
            self.inputs.insert(at, input);
        }
        self.time_start = self.inputs[0].time_start();
    }

    /// Evicts every element that is `window_length` or more older than `input`,
    /// then adds `input`.
    ///
    /// Falls back to [`reset`](Self::reset) if eviction empties the window.
    pub fn slide(&mut self, input: T, window_length: Timestamp) {
        let incoming = input.time_start();
        let n_evict = self
            .inputs
            .iter()
            .take_while(|e| incoming.saturating_sub(e.time_start()) >= window_length)
            .count();

        let Self {
            adc_integral,
            channel_states,
            inputs,
            ..
        } = self;
        for evicted in inputs.drain(..n_evict) {
            let contribution = evicted.adc_contribution();
            debug_assert!(*adc_integral >= contribution, "ADC aggregate underflow");
            *adc_integral = adc_integral.saturating_sub(contribution);
            evicted.for_each_channel(|channel| release_channel(channel_states, channel));
        }

        if self.inputs.is_empty() {
            self.reset(input);
        } else {
            self.time_start = self.inputs[0].time_start();
            self.add(input);
        }
    }

    /// Discards all state and seeds the window with `input`.
    pub fn reset(&mut self, input: T) {
        self.clear();
        self.add(input);
    }

    /// Discards all state.
    pub fn clear(&mut self) {
        self.channel_states.clear();
        self.inputs.clear();
        self.adc_integral = 0;
        self.time_start = 0;
    }
}

fn release_channel(states: &mut HashMap<Channel, u32>, channel: Channel) {
    let Some(count) = states.get_mut(&channel) else {
        if cfg!(debug_assertions) {
            panic!("channel {channel} released without a matching add");
        }
        return;
    };
    *count -= 1;
    if *count == 0 {
        states.remove(&channel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::ActivityAlgorithm;
    use std::collections::HashSet;

    fn assert_invariants<T: WindowElement>(window: &SlidingWindow<T>) {
        let adc: u64 = window.inputs().iter().map(WindowElement::adc_contribution).sum();
        assert_eq!(window.adc_integral(), adc);

        let mut distinct = HashSet::new();
        for e in window.inputs() {
            e.for_each_channel(|c| {
                distinct.insert(c);
            });
        }
        assert_eq!(window.n_channels_hit(), distinct.len());
        assert!(window.channels().all(|c| window.channel_hits(c) > 0));

        let starts: Vec<_> = window.inputs().iter().map(WindowElement::time_start).collect();
        assert!(starts.windows(2).all(|w| w[0] <= w[1]));
        if let Some(first) = window.first() {
            assert_eq!(window.time_start(), first.time_start());
        }
    }

    fn activity(channels: &[Channel], time_start: Timestamp, adc: u32) -> Activity {
        let inputs: Vec<_> = channels
            .iter()
            .map(|&c| Primitive::new(c, time_start, adc))
            .collect();
        Activity {
            time_start,
            adc_integral: u64::from(adc) * inputs.len() as u64,
            algorithm: ActivityAlgorithm::HorizontalMuon,
            inputs,
            ..Activity::default()
        }
    }

    #[test]
    fn test_add_accumulates() {
        let mut window = SlidingWindow::new();
        window.reset(Primitive::new(10, 0, 100));
        window.add(Primitive::new(11, 5, 50));
        window.add(Primitive::new(10, 7, 25));

        assert_eq!(window.len(), 3);
        assert_eq!(window.adc_integral(), 175);
        assert_eq!(window.n_channels_hit(), 2);
        assert_eq!(window.channel_hits(10), 2);
        assert_invariants(&window);
    }

    #[test]
    fn test_slide_evicts_old_elements() {
        let mut window = SlidingWindow::new();
        window.reset(Primitive::new(1, 0, 10));
        window.add(Primitive::new(2, 10, 20));
        window.add(Primitive::new(1, 20, 30));
        window.add(Primitive::new(3, 30, 40));

        window.slide(Primitive::new(4, 40, 50), 25);

        // 40 - 10 = 30 >= 25, 40 - 20 = 20 < 25.
        let starts: Vec<_> = window.inputs().iter().map(|tp| tp.time_start).collect();
        assert_eq!(starts, vec![20, 30, 40]);
        assert_eq!(window.time_start(), 20);
        assert_eq!(window.adc_integral(), 120);
        assert_eq!(window.channel_hits(2), 0);
        assert_eq!(window.channel_hits(1), 1);
        assert!(!window.channels().any(|c| c == 2));
        for tp in window.inputs() {
            assert!(40 - tp.time_start < 25);
        }
        assert_invariants(&window);
    }

    #[test]
    fn test_slide_that_empties_window_resets() {
        let mut window = SlidingWindow::new();
        window.reset(Primitive::new(1, 0, 10));
        window.add(Primitive::new(2, 5, 10));

        window.slide(Primitive::new(9, 1000, 77), 100);

        assert_eq!(window.len(), 1);
        assert_eq!(window.time_start(), 1000);
        assert_eq!(window.adc_integral(), 77);
        assert_eq!(window.n_channels_hit(), 1);
        assert_invariants(&window);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let seed = Primitive::new(5, 300, 42);
        let mut busy = SlidingWindow::new();
        busy.reset(Primitive::new(1, 0, 10));
        for t in 1..20 {
            busy.add(Primitive::new(t as Channel, t, 10));
        }
        busy.reset(seed);

        let mut fresh = SlidingWindow::new();
        fresh.reset(seed);

        assert_eq!(busy.inputs(), fresh.inputs());
        assert_eq!(busy.adc_integral(), 42);
        assert_eq!(busy.n_channels_hit(), 1);
        assert_eq!(busy.time_start(), 300);
        assert_invariants(&busy);
    }

    #[test]
    fn test_invariants_hold_over_stream() {
        let mut window = SlidingWindow::new();
        let window_length = 50;
        for i in 0..200_i64 {
            let tp = Primitive::new((i * 7 % 13) as Channel, i * 3, (i % 11) as u32 + 1);
            if window.is_empty() {
                window.reset(tp);
            } else if window.admits(tp.time_start, window_length) {
                window.add(tp);
            } else {
                window.slide(tp, window_length);
                for e in window.inputs() {
                    assert!(tp.time_start - e.time_start < window_length);
                }
            }
            assert_invariants(&window);
        }
    }

    #[test]
    fn test_clear() {
        let mut window = SlidingWindow::new();
        window.reset(Primitive::new(1, 0, 10));
        window.add(Primitive::new(2, 1, 10));
        window.clear();

        assert!(window.is_empty());
        assert_eq!(window.adc_integral(), 0);
        assert_eq!(window.n_channels_hit(), 0);
    }

    #[test]
    fn test_activities_are_inserted_in_time_order() {
        let mut window = SlidingWindow::new();
        window.reset(activity(&[1, 2], 100, 10));
        window.add(activity(&[3], 300, 10));
        window.add(activity(&[2, 4], 200, 10));
        window.add(activity(&[5], 50, 10));

        let starts: Vec<_> = window.inputs().iter().map(|ta| ta.time_start).collect();
        assert_eq!(starts, vec![50, 100, 200, 300]);
        assert_eq!(window.time_start(), 50);
        assert_eq!(window.n_channels_hit(), 5);
        assert_eq!(window.channel_hits(2), 2);
        assert_invariants(&window);

        window.slide(activity(&[6], 260, 10), 200);
        let starts: Vec<_> = window.inputs().iter().map(|ta| ta.time_start).collect();
        assert_eq!(starts, vec![100, 200, 260, 300]);
        assert_eq!(window.channel_hits(5), 0);
        assert_invariants(&window);
    }
}
