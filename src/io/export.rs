//! CSV export for control-loop tick records.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::sim::types::StepResult;

/// Column header for tick-record CSV export.
const HEADER: &str = "loop,timestep,time_min,previous_value,new_value,adjustment,\
                      direction,request_count,ignored_count,max_evaluated,ceiling,rejected,held";

/// Exports one or more loops' tick records to a CSV file.
///
/// # Arguments
///
/// * `loops` - `(label, records)` pairs, written in order
/// * `path` - Output file path
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(loops: &[(&str, &[StepResult])], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(loops, buf)
}

/// Writes tick records as CSV to any writer.
///
/// Produces identical bytes for identical inputs. Absent optional values
/// are written as empty fields.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(loops: &[(&str, &[StepResult])], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for (label, results) in loops {
        for r in *results {
            wtr.write_record(&[
                (*label).to_string(),
                r.timestep.to_string(),
                format!("{:.2}", r.time_min),
                format!("{:.4}", r.previous_value),
                format!("{:.4}", r.new_value),
                format!("{:.4}", r.adjustment),
                r.direction.to_string(),
                r.request_count.to_string(),
                r.ignored_count.to_string(),
                r.max_evaluated.map(|v| format!("{v:.4}")).unwrap_or_default(),
                r.ceiling.map(|v| format!("{v:.4}")).unwrap_or_default(),
                r.rejected.to_string(),
                r.held.to_string(),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}
