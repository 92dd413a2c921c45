use fs_err::File;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

use super::error::RepairError;
use super::records::{Timetable, TimetableFiles};

/// Overwrites every file in `files` with its (possibly repaired) timetables.
pub fn write_timetable_files(files: &TimetableFiles, indent: usize) -> Result<(), RepairError> {
    for (path, timetables) in &files.0 {
        write_json_file(path, timetables, indent)?;
    }
    info!("Wrote {} files", files.0.len());
    Ok(())
}

pub fn write_json_file(
    path: &Path,
    timetables: &[Timetable],
    indent: usize,
) -> Result<(), RepairError> {
    info!("Writing to {}", path.display());
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_pretty_json(&mut writer, timetables, indent).map_err(|source| RepairError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush()?;
    Ok(())
}

/// Pretty-prints with `indent` spaces per level. Non-ASCII text is written
/// as-is and there is no trailing newline.
fn write_pretty_json<W: Write>(
    writer: W,
    timetables: &[Timetable],
    indent: usize,
) -> Result<(), serde_json::Error> {
    let indent = " ".repeat(indent);
    let formatter = PrettyFormatter::with_indent(indent.as_bytes());
    let mut serializer = Serializer::with_formatter(writer, formatter);
    timetables.serialize(&mut serializer)
}
