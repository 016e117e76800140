//! CSV destination for maker debug events.
//!
//! One sink writes three files into a directory, each named after a prefix:
//! `<prefix>_windows.csv`, `<prefix>_tracks.csv` and `<prefix>_primitives.csv`.
//! Track files hold one row per hit.

use crate::Result;
use rustrig_core::{EventSink, MakerEvent, Primitive, TrackRecord, WindowRecord};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Header of the window CSV.
pub const WINDOW_CSV_HEADER: &str = "maker,time_start,time_end,length,adc_integral,n_channels_hit,n_inputs,first_channel,last_channel,adjacency,tot_sum";

/// Header of the track CSV.
pub const TRACK_CSV_HEADER: &str =
    "maker,track,start_channel,end_channel,start_time,end_time,channel,time_start,adc,running_means";

/// Header of the primitive CSV.
pub const PRIMITIVE_CSV_HEADER: &str =
    "maker,time_start,time_over_threshold,time_peak,channel,adc_integral,adc_peak,detid";

/// [`EventSink`] writing CSV files.
///
/// Write errors cannot be returned through [`EventSink::record`]; the first one
/// is logged and further events are dropped.
pub struct CsvEventSink {
    windows: BufWriter<File>,
    tracks: BufWriter<File>,
    primitives: BufWriter<File>,
    n_tracks: u64,
    failed: bool,
}

impl CsvEventSink {
    /// Creates the three files in `dir` and writes their headers.
    pub fn create<P: AsRef<Path>>(dir: P, prefix: &str) -> Result<Self> {
        let dir = dir.as_ref();
        let mut windows = open(dir, prefix, "windows")?;
        let mut tracks = open(dir, prefix, "tracks")?;
        let mut primitives = open(dir, prefix, "primitives")?;
        writeln!(windows, "{WINDOW_CSV_HEADER}")?;
        writeln!(tracks, "{TRACK_CSV_HEADER}")?;
        writeln!(primitives, "{PRIMITIVE_CSV_HEADER}")?;
        Ok(Self {
            windows,
            tracks,
            primitives,
            n_tracks: 0,
            failed: false,
        })
    }

    /// Paths of the files a sink with `prefix` writes into `dir`.
    #[must_use]
    pub fn paths(dir: &Path, prefix: &str) -> [PathBuf; 3] {
        ["windows", "tracks", "primitives"].map(|kind| dir.join(format!("{prefix}_{kind}.csv")))
    }

    fn write_event(&mut self, event: &MakerEvent) -> io::Result<()> {
        match event {
            MakerEvent::Window(record) => write_window(&mut self.windows, record),
            MakerEvent::Track(record) => {
                let index = self.n_tracks;
                self.n_tracks += 1;
                write_track(&mut self.tracks, index, record)
            }
            MakerEvent::Primitive { maker, primitive } => {
                write_primitive(&mut self.primitives, maker, primitive)
            }
        }
    }

    fn flush_all(&mut self) -> io::Result<()> {
        self.windows.flush()?;
        self.tracks.flush()?;
        self.primitives.flush()
    }
}

impl EventSink for CsvEventSink {
    fn record(&mut self, event: MakerEvent) {
        if self.failed {
            return;
        }
        if let Err(err) = self.write_event(&event) {
            log::error!("debug event sink: {err}; further events are dropped");
            self.failed = true;
        }
    }

    fn flush(&mut self) {
        if let Err(err) = self.flush_all() {
            log::error!("debug event sink: flush failed: {err}");
            self.failed = true;
        }
    }
}

impl Drop for CsvEventSink {
    fn drop(&mut self) {
        let _ = self.flush_all();
    }
}

fn open(dir: &Path, prefix: &str, kind: &str) -> Result<BufWriter<File>> {
    let file = File::create(dir.join(format!("{prefix}_{kind}.csv")))?;
    Ok(BufWriter::new(file))
}

fn write_window(out: &mut impl Write, r: &WindowRecord) -> io::Result<()> {
    writeln!(
        out,
        "{},{},{},{},{},{},{},{},{},{},{}",
        r.maker,
        r.time_start,
        r.time_end,
        r.length(),
        r.adc_integral,
        r.n_channels_hit,
        r.n_inputs,
        r.first_channel,
        r.last_channel,
        r.adjacency.map_or_else(String::new, |a| a.to_string()),
        r.tot_sum
    )
}

fn write_track(out: &mut impl Write, index: u64, r: &TrackRecord) -> io::Result<()> {
    for hit in &r.hits {
        let means: Vec<String> = hit.running_means.iter().map(|m| format!("{m:.3}")).collect();
        writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{}",
            r.maker,
            index,
            r.start_channel,
            r.end_channel,
            r.start_time,
            r.end_time,
            hit.channel,
            hit.time_start,
            hit.adc,
            means.join(";")
        )?;
    }
    Ok(())
}

fn write_primitive(out: &mut impl Write, maker: &str, tp: &Primitive) -> io::Result<()> {
    writeln!(
        out,
        "{},{},{},{},{},{},{},{}",
        maker,
        tp.time_start,
        tp.time_over_threshold,
        tp.time_peak,
        tp.channel,
        tp.adc_integral,
        tp.adc_peak,
        tp.detid
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustrig_core::TrackHitRecord;
    use tempfile::tempdir;

    #[test]
    fn test_events_land_in_their_files() {
        let dir = tempdir().unwrap();
        let mut sink = CsvEventSink::create(dir.path(), "p0").unwrap();

        sink.record(MakerEvent::Window(WindowRecord {
            maker: "horizontal_muon",
            time_start: 100,
            time_end: 160,
            adc_integral: 600,
            n_channels_hit: 6,
            n_inputs: 6,
            first_channel: 0,
            last_channel: 5,
            adjacency: Some(6),
            tot_sum: 12,
        }));
        sink.record(MakerEvent::Track(TrackRecord {
            maker: "michel_electron",
            start_channel: 7,
            end_channel: 8,
            start_time: 1,
            end_time: 2,
            widths: vec![4],
            hits: vec![
                TrackHitRecord {
                    channel: 7,
                    time_start: 1,
                    adc: 10,
                    running_means: vec![12.5],
                },
                TrackHitRecord {
                    channel: 8,
                    time_start: 2,
                    adc: 15,
                    running_means: vec![12.5],
                },
            ],
        }));
        sink.record(MakerEvent::Primitive {
            maker: "horizontal_muon",
            primitive: Primitive::new(3, 50, 9),
        });
        sink.flush();

        let [windows, tracks, primitives] = CsvEventSink::paths(dir.path(), "p0");
        let windows = std::fs::read_to_string(windows).unwrap();
        assert_eq!(
            windows.lines().nth(1),
            Some("horizontal_muon,100,160,60,600,6,6,0,5,6,12")
        );

        let tracks = std::fs::read_to_string(tracks).unwrap();
        assert_eq!(tracks.lines().count(), 3);
        assert!(tracks.contains("michel_electron,0,7,8,1,2,8,2,15,12.500"));

        let primitives = std::fs::read_to_string(primitives).unwrap();
        assert_eq!(
            primitives.lines().nth(1),
            Some("horizontal_muon,50,0,50,3,9,0,0")
        );
    }
}
