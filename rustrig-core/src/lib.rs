//! rustrig-core: Core types and traits for streaming trigger processing.
//!
//! This crate provides the record types that flow through the trigger chain
//! (primitives, activities, candidates), the sliding window shared by all
//! windowed makers, the maker traits, configuration, and the debug event sink.
//!

pub mod activity;
pub mod candidate;
pub mod config;
pub mod error;
pub mod maker;
pub mod primitive;
pub mod sink;
pub mod window;

pub use activity::{Activity, ActivityAlgorithm, ActivityType, Version};
pub use candidate::{Candidate, CandidateAlgorithm, CandidateType, WHOLE_DETECTOR};
pub use config::{ToleranceRule, TriggerConfig};
pub use error::{Error, RejectedKey, RejectedKeys, Result};
pub use maker::{ActivityMaker, CandidateMaker, Maker, MakerStatistics};
pub use primitive::{Channel, DetId, Primitive, Timestamp};
pub use sink::{EventSink, MakerEvent, MemorySink, TrackHitRecord, TrackRecord, WindowRecord};
pub use window::{SlidingWindow, WindowElement};
