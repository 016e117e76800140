//! File writers for trigger records.

use crate::Result;
use rustrig_core::{Activity, Candidate, Primitive};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Header of the activity CSV.
pub const ACTIVITY_CSV_HEADER: &str = "time_start,time_end,time_peak,time_activity,channel_start,channel_end,channel_peak,adc_integral,adc_peak,detid,algorithm,n_primitives";

/// Header of the candidate CSV.
pub const CANDIDATE_CSV_HEADER: &str =
    "time_start,time_end,time_candidate,detid,type,algorithm,n_activities,regions";

/// Writer for primitives, activities and candidates.
pub struct TriggerFileWriter {
    writer: BufWriter<File>,
}

impl TriggerFileWriter {
    /// Creates a new file writer.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        Ok(Self { writer })
    }

    /// Writes activities as CSV.
    pub fn write_activities_csv(&mut self, activities: &[Activity]) -> Result<()> {
        writeln!(self.writer, "{ACTIVITY_CSV_HEADER}")?;

        for ta in activities {
            writeln!(
                self.writer,
                "{},{},{},{},{},{},{},{},{},{},{},{}",
                ta.time_start,
                ta.time_end,
                ta.time_peak,
                ta.time_activity,
                ta.channel_start,
                ta.channel_end,
                ta.channel_peak,
                ta.adc_integral,
                ta.adc_peak,
                ta.detid,
                ta.algorithm.as_str(),
                ta.inputs.len()
            )?;
        }

        self.writer.flush()?;
        Ok(())
    }

    /// Writes candidates as CSV. Regions are `;`-separated.
    pub fn write_candidates_csv(&mut self, candidates: &[Candidate]) -> Result<()> {
        writeln!(self.writer, "{CANDIDATE_CSV_HEADER}")?;

        for tc in candidates {
            let regions: Vec<String> = tc.regions.iter().map(ToString::to_string).collect();
            writeln!(
                self.writer,
                "{},{},{},{},{:?},{},{},{}",
                tc.time_start,
                tc.time_end,
                tc.time_candidate,
                tc.detid,
                tc.kind,
                tc.algorithm.as_str(),
                tc.inputs.len(),
                regions.join(";")
            )?;
        }

        self.writer.flush()?;
        Ok(())
    }

    /// Writes primitives in the whitespace-separated text format read by
    /// [`PrimitiveFileReader`](crate::PrimitiveFileReader).
    pub fn write_primitives_text(&mut self, primitives: &[Primitive]) -> Result<()> {
        for tp in primitives {
            writeln!(
                self.writer,
                "{} {} {} {} {} {} {} {}",
                tp.time_start,
                tp.time_over_threshold,
                tp.time_peak,
                tp.channel,
                tp.adc_integral,
                tp.adc_peak,
                tp.detid,
                tp.kind
            )?;
        }

        self.writer.flush()?;
        Ok(())
    }

    /// Flushes the writer.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustrig_core::{ActivityAlgorithm, CandidateAlgorithm, CandidateType};
    use tempfile::NamedTempFile;

    #[test]
    fn test_write_activities_csv() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = TriggerFileWriter::create(file.path()).unwrap();

        let ta = Activity::from_primitive(
            &Primitive::new(42, 1000, 900)
                .with_time_over_threshold(20)
                .with_adc_peak(60)
                .with_detid(3),
            ActivityAlgorithm::Prescale,
        );
        writer.write_activities_csv(&[ta]).unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines[0], ACTIVITY_CSV_HEADER);
        assert_eq!(lines[1], "1000,1020,1000,0,42,42,42,900,60,3,prescale,1");
    }

    #[test]
    fn test_write_candidates_csv() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = TriggerFileWriter::create(file.path()).unwrap();

        let inputs = vec![
            Activity::from_primitive(&Primitive::new(1, 10, 1).with_detid(4), ActivityAlgorithm::Prescale),
            Activity::from_primitive(&Primitive::new(2, 20, 1).with_detid(2), ActivityAlgorithm::Prescale),
        ];
        let mut tc = Candidate::from_activities(inputs, CandidateType::Bundle, CandidateAlgorithm::Bundle);
        tc.time_start = 10;
        tc.time_end = 20;
        tc.time_candidate = 10;
        writer.write_candidates_csv(&[tc]).unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        assert!(content.starts_with(CANDIDATE_CSV_HEADER));
        assert!(content.contains("10,20,10,2,Bundle,bundle,2,2;4"));
    }
}
