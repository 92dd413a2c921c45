use std::path::PathBuf;
use thiserror::Error;

use super::records::TimetableId;

#[derive(Error, Debug)]
pub enum RepairError {
    #[error("Unsupported file pattern {pattern:?}: {reason}")]
    Pattern { pattern: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not parse timetables in {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Could not write timetables to {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid config file {path:?}: {source}")]
    Config {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Timetable {id} is missing its arrival time but has no next train")]
    NoNextTrain { id: TimetableId },

    #[error("Next train {next_id} of timetable {id} was not found in any loaded file")]
    NextTrainNotFound {
        id: TimetableId,
        next_id: TimetableId,
    },

    #[error("First stop of timetable {next_id} (next train of {id}) has no departure time")]
    MissingDeparture {
        id: TimetableId,
        next_id: TimetableId,
    },
}
