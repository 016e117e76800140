//! Memory-mapped primitive readers.
//!
//! Primitive files are plain text, one primitive per line, eight
//! whitespace-separated integer columns:
//!
//! ```text
//! time_start time_over_threshold time_peak channel adc_integral adc_peak detid type
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. Extra columns are ignored.

use crate::{Error, Result};
use memmap2::Mmap;
use rayon::prelude::*;
use rustrig_core::{Channel, Primitive, Timestamp};
use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of columns in a primitive line.
pub const PRIMITIVE_COLUMNS: usize = 8;

/// A memory-mapped file reader.
///
/// Uses memmap2 to access file contents without loading the entire file into
/// memory. Empty files are not mapped.
pub struct MappedFileReader {
    mmap: Option<Mmap>,
    path: PathBuf,
}

impl MappedFileReader {
    /// Opens a file for memory-mapped reading.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or memory-mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        let mmap = if file.metadata()?.len() == 0 {
            None
        } else {
            // SAFETY: The file is opened read-only and we assume it is not modified concurrently.
            // This is the standard safety contract for memory mapping.
            #[allow(unsafe_code)]
            let mmap = unsafe { Mmap::map(&file)? };
            Some(mmap)
        };
        Ok(Self {
            mmap,
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Returns the file contents as a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Returns true if the file is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Path the reader was opened with.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Aggregate figures for a primitive file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PrimitiveSummary {
    /// Number of primitives.
    pub n_primitives: usize,
    /// Earliest start time.
    pub first_time: Timestamp,
    /// Latest start time.
    pub last_time: Timestamp,
    /// Distinct channels.
    pub n_channels: usize,
    /// Lowest channel.
    pub min_channel: Channel,
    /// Highest channel.
    pub max_channel: Channel,
    /// Summed ADC integral.
    pub adc_total: u64,
    /// Distinct detector ids, sorted.
    pub detids: Vec<u16>,
}

impl PrimitiveSummary {
    /// Summarises time-ordered primitives.
    #[must_use]
    pub fn from_primitives(primitives: &[Primitive]) -> Self {
        let channels: BTreeSet<Channel> = primitives.iter().map(|tp| tp.channel).collect();
        let detids: BTreeSet<u16> = primitives.iter().map(|tp| tp.detid).collect();
        Self {
            n_primitives: primitives.len(),
            first_time: primitives.first().map_or(0, |tp| tp.time_start),
            last_time: primitives.last().map_or(0, |tp| tp.time_start),
            n_channels: channels.len(),
            min_channel: channels.first().copied().unwrap_or(0),
            max_channel: channels.last().copied().unwrap_or(0),
            adc_total: primitives.iter().map(|tp| u64::from(tp.adc_integral)).sum(),
            detids: detids.into_iter().collect(),
        }
    }

    /// Time span covered.
    #[must_use]
    pub fn duration(&self) -> Timestamp {
        self.last_time - self.first_time
    }
}

/// A primitive text-file reader with memory-mapped I/O.
pub struct PrimitiveFileReader {
    reader: MappedFileReader,
}

impl PrimitiveFileReader {
    /// Opens a primitive file for reading.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or memory-mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            reader: MappedFileReader::open(path)?,
        })
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn file_size(&self) -> usize {
        self.reader.len()
    }

    /// Path of the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.reader.path()
    }

    /// Reads every primitive, in file order.
    ///
    /// Lines are parsed in parallel; the first malformed line is reported.
    ///
    /// # Errors
    /// Returns an error if the file is not UTF-8 or a line is malformed.
    pub fn read_primitives(&self) -> Result<Vec<Primitive>> {
        let text = std::str::from_utf8(self.reader.as_bytes()).map_err(|err| {
            Error::InvalidFormat(format!(
                "{} is not valid UTF-8: {err}",
                self.reader.path().display()
            ))
        })?;
        let lines: Vec<&str> = text.lines().collect();

        let parsed: Vec<(usize, std::result::Result<Primitive, String>)> = lines
            .par_iter()
            .enumerate()
            .filter_map(|(i, line)| parse_line(line).map(|outcome| (i + 1, outcome)))
            .collect();

        parsed
            .into_iter()
            .map(|(line, outcome)| {
                outcome.map_err(|reason| Error::Parse {
                    path: self.reader.path().to_path_buf(),
                    line,
                    reason,
                })
            })
            .collect()
    }

    /// Reads every primitive, stably sorted by start time.
    ///
    /// Windowed makers expect primitives in start-time order.
    ///
    /// # Errors
    /// Returns an error if the file is not UTF-8 or a line is malformed.
    pub fn read_time_ordered(&self) -> Result<Vec<Primitive>> {
        let mut primitives = self.read_primitives()?;
        if !primitives.windows(2).all(|w| w[0].time_start <= w[1].time_start) {
            log::debug!(
                "{}: primitives out of order, sorting",
                self.reader.path().display()
            );
            primitives.par_sort_by_key(|tp| tp.time_start);
        }
        Ok(primitives)
    }

    /// Reads the file and summarises it.
    ///
    /// # Errors
    /// Returns an error if the file cannot be parsed.
    pub fn summary(&self) -> Result<PrimitiveSummary> {
        Ok(PrimitiveSummary::from_primitives(&self.read_time_ordered()?))
    }
}

/// Parses one line. `None` for blank and comment lines.
fn parse_line(line: &str) -> Option<std::result::Result<Primitive, String>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < PRIMITIVE_COLUMNS {
        return Some(Err(format!(
            "expected {PRIMITIVE_COLUMNS} columns, found {}",
            fields.len()
        )));
    }

    Some(parse_fields(&fields))
}

fn parse_fields(fields: &[&str]) -> std::result::Result<Primitive, String> {
    Ok(Primitive {
        time_start: field(fields, 0, "time_start")?,
        time_over_threshold: field(fields, 1, "time_over_threshold")?,
        time_peak: field(fields, 2, "time_peak")?,
        channel: field(fields, 3, "channel")?,
        adc_integral: field(fields, 4, "adc_integral")?,
        adc_peak: field(fields, 5, "adc_peak")?,
        detid: field(fields, 6, "detid")?,
        kind: field(fields, 7, "type")?,
    })
}

fn field<T: FromStr>(fields: &[&str], index: usize, name: &str) -> std::result::Result<T, String> {
    fields[index]
        .parse()
        .map_err(|_| format!("invalid {name} `{}`", fields[index]))
}
