//! Maker traits and per-instance statistics.

use crate::activity::Activity;
use crate::candidate::Candidate;
use crate::config::TriggerConfig;
use crate::error::Result;
use crate::primitive::Primitive;
use crate::sink::EventSink;

/// Counters owned by a single maker instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MakerStatistics {
    /// Inputs consumed.
    pub inputs_processed: u64,
    /// Trigger conditions that fired, before prescaling.
    pub triggers_fired: u64,
    /// Outputs handed to the caller.
    pub outputs_emitted: u64,
    /// Fired triggers dropped by the prescale.
    pub triggers_prescaled: u64,
    /// Largest adjacency seen in a fired window.
    pub max_adjacency: u16,
}

/// Incremental, single-threaded stream processor.
///
/// `process` is called once per input and appends any outputs to the caller's
/// vector; it never clears it.
pub trait Maker: Send {
    /// Element consumed.
    type Input;
    /// Element produced.
    type Output;

    /// Algorithm name.
    fn name(&self) -> &'static str;

    /// Replaces the configuration.
    ///
    /// Fails once the maker has consumed input, or if the configuration is
    /// out of range.
    fn configure(&mut self, config: &TriggerConfig) -> Result<()>;

    /// Consumes one input.
    fn process(&mut self, input: &Self::Input, output: &mut Vec<Self::Output>);

    /// Handles end of stream. The default does nothing.
    fn flush(&mut self, output: &mut Vec<Self::Output>) {
        let _ = output;
    }

    /// Counters accumulated so far.
    fn statistics(&self) -> MakerStatistics;

    /// Routes debug events to `sink`. Makers without debug output drop it.
    fn attach_sink(&mut self, sink: Box<dyn EventSink>) {
        drop(sink);
    }
}

/// Maker turning primitives into activities.
pub trait ActivityMaker: Maker<Input = Primitive, Output = Activity> {}

impl<M: Maker<Input = Primitive, Output = Activity>> ActivityMaker for M {}

/// Maker turning activities into candidates.
pub trait CandidateMaker: Maker<Input = Activity, Output = Candidate> {}

impl<M: Maker<Input = Activity, Output = Candidate>> CandidateMaker for M {}
