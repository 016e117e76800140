//! rustrig-algorithms: Trigger activity and candidate makers.
//!
//! This crate provides the makers that turn a stream of primitives into
//! activities and activities into candidates:
//! - **Horizontal muon** - geometry based thresholds over a sliding window
//! - **Michel electron** - adjacency plus an end-peaked charge profile
//! - **ADC simple window** - window ADC sum only
//! - **Prescale** / **Bundle** - counter based pass-through and grouping
//! - **Supernova** - count of busy activities over a long trailing window
//!
//! All windowed makers share [`WindowedMaker`], parameterised by a
//! [`TriggerPolicy`]. Makers are looked up by name in a [`MakerRegistry`].
//!
#![warn(missing_docs)]

pub mod adjacency;
pub mod bragg;
mod bundle;
mod horizontal_muon;
mod michel_electron;
mod pipeline;
mod prescale;
mod registry;
mod supernova;
pub mod windowed;

pub use adjacency::{AdjacencyScanner, Link, ToleranceRule, DEFAULT_MAX_GAP};
pub use bragg::{BraggPeak, BraggPeakDetector, TrackHit};
pub use bundle::BundleCandidateMaker;
pub use horizontal_muon::{
    CandidateWindowTrigger, GeometryTrigger, HorizontalMuonActivityMaker,
    HorizontalMuonCandidateMaker,
};
pub use michel_electron::{MichelElectronActivityMaker, ShapeTrigger};
pub use pipeline::{run_chain, run_partitions, ChainOutput, ChainSpec};
pub use prescale::{PrescaleActivityMaker, PrescaleCandidateMaker};
pub use supernova::{SupernovaCandidateMaker, BURST_WINDOW};
pub use registry::{ActivityMakerConstructor, CandidateMakerConstructor, MakerRegistry};
pub use windowed::{Describe, Fired, TriggerPolicy, TriggerReason, WindowedMaker};

// Re-export core maker traits
pub use rustrig_core::{ActivityMaker, CandidateMaker, Maker, MakerStatistics, TriggerConfig};
