//! Generic windowed maker.
//!
//! Every windowed algorithm shares one state machine:
//!
//! 1. an empty window is seeded with the input;
//! 2. an input inside the window length is added;
//! 3. otherwise the policy evaluates the full window: if a condition fires the
//!    output is built, the window reset onto the input; if not the window slides.
//!
//! The policy decides what fires and what gets built. The maker owns the window,
//! statistics, prescale and the optional debug sink.

use rustrig_core::{
    Activity, ActivityAlgorithm, ActivityType, Channel, Error, EventSink, Maker, MakerEvent,
    MakerStatistics, Primitive, Result, SlidingWindow, Timestamp, TrackRecord, TriggerConfig,
    WindowElement, WindowRecord,
};
use std::fmt;

/// Condition that fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Summed ADC above threshold.
    AdcSum,
    /// Distinct channel count above threshold.
    Multiplicity,
    /// Longest adjacent run above threshold.
    Adjacency,
    /// Incoming time over threshold above threshold.
    TimeOverThreshold,
    /// Adjacency plus a charge profile peaked at a track end.
    BraggPeak,
    /// The window filled with no other condition enabled.
    WindowFull,
    /// Emitted on arrival.
    Passthrough,
}

impl TriggerReason {
    /// Short name used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AdcSum => "adc",
            Self::Multiplicity => "n_channels",
            Self::Adjacency => "adjacency",
            Self::TimeOverThreshold => "tot",
            Self::BraggPeak => "bragg_peak",
            Self::WindowFull => "window_full",
            Self::Passthrough => "passthrough",
        }
    }
}

impl fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fired trigger and what was measured on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Fired {
    /// Condition that fired.
    pub reason: TriggerReason,
    /// Adjacency, when it was computed.
    pub adjacency: Option<u16>,
    /// Track examined by a charge-shape check.
    pub track: Option<TrackRecord>,
}

impl Fired {
    /// A trigger with nothing measured beyond its reason.
    #[must_use]
    pub fn new(reason: TriggerReason) -> Self {
        Self {
            reason,
            adjacency: None,
            track: None,
        }
    }

    /// Attaches the adjacency that was computed.
    #[must_use]
    pub fn with_adjacency(mut self, adjacency: u16) -> Self {
        self.adjacency = Some(adjacency);
        self
    }

    /// Attaches the examined track.
    #[must_use]
    pub fn with_track(mut self, track: TrackRecord) -> Self {
        self.track = Some(track);
        self
    }
}

/// Window payload that can be summarised in a [`WindowRecord`].
pub trait Describe {
    /// Channel the element is filed under.
    fn lead_channel(&self) -> Channel;
    /// Summed time over threshold of the underlying primitives.
    fn tot_sum(&self) -> Timestamp;
}

impl Describe for Primitive {
    fn lead_channel(&self) -> Channel {
        self.channel
    }

    fn tot_sum(&self) -> Timestamp {
        self.time_over_threshold
    }
}

impl Describe for Activity {
    fn lead_channel(&self) -> Channel {
        self.channel_start
    }

    fn tot_sum(&self) -> Timestamp {
        self.inputs.iter().map(|tp| tp.time_over_threshold).sum()
    }
}

/// The algorithm-specific half of a windowed maker.
pub trait TriggerPolicy<T>: Send {
    /// Element produced.
    type Output;

    /// Algorithm name.
    fn name(&self) -> &'static str;

    /// Adopts a validated configuration.
    fn configure(&mut self, config: &TriggerConfig) -> Result<()>;

    /// Configuration in use.
    fn config(&self) -> &TriggerConfig;

    /// Emit every input on arrival instead of windowing.
    fn passthrough(&self) -> bool {
        false
    }

    /// Checks a full window before `incoming` is admitted.
    fn evaluate(&self, window: &SlidingWindow<T>, incoming: &T) -> Option<Fired>;

    /// Checks the window left over at end of stream.
    fn evaluate_flush(&self, window: &SlidingWindow<T>) -> Option<Fired> {
        let _ = window;
        None
    }

    /// Builds the output for a fired window. `None` for an empty window.
    fn construct(&self, window: &SlidingWindow<T>) -> Option<Self::Output>;

    /// Debug event for a received input, if the policy reports inputs.
    fn input_event(&self, input: &T) -> Option<MakerEvent> {
        let _ = input;
        None
    }
}

/// A [`Maker`] driving a [`SlidingWindow`] with a [`TriggerPolicy`].
pub struct WindowedMaker<T, P> {
    policy: P,
    window: SlidingWindow<T>,
    stats: MakerStatistics,
    sink: Option<Box<dyn EventSink>>,
}

impl<T, P> fmt::Debug for WindowedMaker<T, P>
where
    T: fmt::Debug,
    P: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowedMaker")
            .field("policy", &self.policy)
            .field("window", &self.window)
            .field("stats", &self.stats)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl<T, P> WindowedMaker<T, P>
where
    T: WindowElement + Describe + Clone + Send,
    P: TriggerPolicy<T>,
{
    /// Wraps a policy with an empty window.
    #[must_use]
    pub fn new(policy: P) -> Self {
        Self {
            policy,
            window: SlidingWindow::new(),
            stats: MakerStatistics::default(),
            sink: None,
        }
    }

    /// Routes debug events to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// The current window.
    #[must_use]
    pub fn window(&self) -> &SlidingWindow<T> {
        &self.window
    }

    /// The trigger policy.
    #[must_use]
    pub fn policy(&self) -> &P {
        &self.policy
    }

    fn emit(&mut self, fired: Fired, output: &mut Vec<P::Output>) {
        self.stats.triggers_fired += 1;
        if let Some(adjacency) = fired.adjacency {
            self.stats.max_adjacency = self.stats.max_adjacency.max(adjacency);
        }

        let prescale = self.policy.config().prescale.max(1);
        if (self.stats.triggers_fired - 1) % prescale != 0 {
            self.stats.triggers_prescaled += 1;
            log::trace!(
                "{}: {} trigger prescaled away",
                self.policy.name(),
                fired.reason
            );
            return;
        }

        let Some(built) = self.policy.construct(&self.window) else {
            return;
        };
        log::debug!(
            "{}: {} trigger at {}, adc {}, {} channels, {} inputs",
            self.policy.name(),
            fired.reason,
            self.window.time_start(),
            self.window.adc_integral(),
            self.window.n_channels_hit(),
            self.window.len()
        );

        if let Some(sink) = self.sink.as_mut() {
            sink.record(MakerEvent::Window(window_record(
                self.policy.name(),
                &self.window,
                fired.adjacency,
            )));
            if let Some(track) = fired.track {
                sink.record(MakerEvent::Track(track));
            }
        }

        output.push(built);
        self.stats.outputs_emitted += 1;
    }
}

impl<T, P> Maker for WindowedMaker<T, P>
where
    T: WindowElement + Describe + Clone + Send,
    P: TriggerPolicy<T>,
{
    type Input = T;
    type Output = P::Output;

    fn name(&self) -> &'static str {
        self.policy.name()
    }

    fn configure(&mut self, config: &TriggerConfig) -> Result<()> {
        if self.stats.inputs_processed > 0 {
            return Err(Error::ConfigLocked {
                maker: self.policy.name(),
                processed: self.stats.inputs_processed,
            });
        }
        config.validate()?;
        self.policy.configure(config)
    }

    fn process(&mut self, input: &T, output: &mut Vec<P::Output>) {
        self.stats.inputs_processed += 1;
        if let Some(sink) = self.sink.as_mut() {
            if let Some(event) = self.policy.input_event(input) {
                sink.record(event);
            }
        }

        if self.window.is_empty() {
            self.window.reset(input.clone());
            if self.policy.passthrough() {
                self.emit(Fired::new(TriggerReason::Passthrough), output);
                self.window.clear();
            }
            return;
        }

        let window_length = self.policy.config().window_length;
        if self.window.admits(input.time_start(), window_length) {
            self.window.add(input.clone());
        } else if let Some(fired) = self.policy.evaluate(&self.window, input) {
            self.emit(fired, output);
            self.window.reset(input.clone());
        } else {
            self.window.slide(input.clone(), window_length);
        }
    }

    fn flush(&mut self, output: &mut Vec<P::Output>) {
        if self.window.is_empty() {
            return;
        }
        if let Some(fired) = self.policy.evaluate_flush(&self.window) {
            self.emit(fired, output);
        }
        self.window.clear();
        if let Some(sink) = self.sink.as_mut() {
            sink.flush();
        }
    }

    fn statistics(&self) -> MakerStatistics {
        self.stats
    }

    fn attach_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sink = Some(sink);
    }
}

fn window_record<T: WindowElement + Describe>(
    maker: &'static str,
    window: &SlidingWindow<T>,
    adjacency: Option<u16>,
) -> WindowRecord {
    WindowRecord {
        maker,
        time_start: window.time_start(),
        time_end: window.last().map_or(window.time_start(), WindowElement::time_start),
        adc_integral: window.adc_integral(),
        n_channels_hit: window.n_channels_hit(),
        n_inputs: window.len(),
        first_channel: window.first().map_or(0, Describe::lead_channel),
        last_channel: window.last().map_or(0, Describe::lead_channel),
        adjacency,
        tot_sum: window.inputs().iter().map(Describe::tot_sum).sum(),
    }
}

/// Builds an activity from a primitive window.
///
/// Peak fields come from the primitive with the largest peak ADC, the first one
/// on ties. With `end_includes_tot` the end time covers the last primitive's
/// time over threshold.
pub(crate) fn activity_from_window(
    window: &SlidingWindow<Primitive>,
    algorithm: ActivityAlgorithm,
    end_includes_tot: bool,
) -> Option<Activity> {
    let first = window.first()?;
    let last = window.last()?;
    let peak = window
        .inputs()
        .iter()
        .reduce(|best, tp| if tp.adc_peak > best.adc_peak { tp } else { best })?;

    let time_end = if end_includes_tot {
        last.time_start + last.time_over_threshold
    } else {
        last.time_start
    };

    Some(Activity {
        time_start: window.time_start(),
        time_end,
        time_peak: peak.time_peak,
        time_activity: peak.time_peak,
        channel_start: first.channel,
        channel_end: last.channel,
        channel_peak: peak.channel,
        adc_integral: window.adc_integral(),
        adc_peak: peak.adc_peak,
        detid: last.detid,
        kind: ActivityType::Tpc,
        algorithm,
        version: 0,
        inputs: window.inputs().to_vec(),
    })
}
