//! rustrig-io: Memory-mapped file I/O for rustrig.
//!
//! This crate reads primitive text files through memory-mapped files via
//! memmap2, and writes activities, candidates and maker debug events as CSV.
//!

mod error;
mod reader;
mod sink;
mod writer;

pub use error::{Error, Result};
pub use reader::{MappedFileReader, PrimitiveFileReader, PrimitiveSummary, PRIMITIVE_COLUMNS};
pub use sink::{CsvEventSink, PRIMITIVE_CSV_HEADER, TRACK_CSV_HEADER, WINDOW_CSV_HEADER};
pub use writer::{TriggerFileWriter, ACTIVITY_CSV_HEADER, CANDIDATE_CSV_HEADER};
