use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::error::RepairError;
use super::records::{Timetable, TimetableFiles, TimetableId};

/// Lookup from timetable id to its record across every loaded file.
pub struct TimetableIndex<'a> {
    timetables: HashMap<&'a TimetableId, &'a Timetable>,
}

impl<'a> TimetableIndex<'a> {
    /// Indexes every record. When an id is repeated the first record in path
    /// then file order is kept.
    pub fn build(files: &'a TimetableFiles) -> Self {
        let mut timetables = HashMap::with_capacity(files.record_count());
        for (path, timetable) in files.iter_records() {
            if timetables.contains_key(timetable.id()) {
                warn!(
                    "Duplicate timetable {} in {}, keeping the first one",
                    timetable.id(),
                    path.display()
                );
                continue;
            }
            timetables.insert(timetable.id(), timetable);
        }
        TimetableIndex { timetables }
    }

    pub fn get(&self, id: &TimetableId) -> Option<&'a Timetable> {
        self.timetables.get(id).copied()
    }
}

/// An arrival time copied onto a record's final stop.
#[derive(Debug, Clone, PartialEq)]
pub struct Repair {
    pub path: PathBuf,
    pub index: usize,
    pub id: TimetableId,
    pub next_id: TimetableId,
    pub arrival: Value,
}

#[derive(Debug, Default, PartialEq)]
pub struct RepairReport {
    pub repairs: Vec<Repair>,
}

impl RepairReport {
    pub fn is_empty(&self) -> bool {
        self.repairs.is_empty()
    }

    pub fn counts_by_file(&self) -> BTreeMap<&PathBuf, usize> {
        let mut counts = BTreeMap::new();
        for repair in &self.repairs {
            *counts.entry(&repair.path).or_insert(0) += 1;
        }
        counts
    }

    pub fn log(&self) {
        if self.is_empty() {
            info!("All timetables already have a final arrival time");
            return;
        }
        for repair in &self.repairs {
            debug!(
                "{} #{} {}: final arrival {} from {}",
                repair.path.display(),
                repair.index,
                repair.id,
                repair.arrival,
                repair.next_id
            );
        }
        for (path, count) in self.counts_by_file() {
            info!("{}: {count} arrival times filled", path.display());
        }
        info!("Repaired {} timetables", self.repairs.len());
    }
}

/// Fills the missing arrival time on the final stop of every timetable with
/// the first departure time of its next train (`nt[0]`).
///
/// Repairs are worked out against the loaded records before any is applied,
/// so on error `files` is left unchanged.
pub fn repair_arrival_gaps(files: &mut TimetableFiles) -> Result<RepairReport, RepairError> {
    let repairs = plan_repairs(files)?;
    for repair in &repairs {
        if let Some(timetable) = files
            .0
            .get_mut(&repair.path)
            .and_then(|timetables| timetables.get_mut(repair.index))
        {
            timetable.set_final_arrival(repair.arrival.clone());
        }
    }
    Ok(RepairReport { repairs })
}

fn plan_repairs(files: &TimetableFiles) -> Result<Vec<Repair>, RepairError> {
    let index = TimetableIndex::build(files);
    let mut repairs = Vec::new();

    for (path, timetables) in &files.0 {
        for (i, timetable) in timetables.iter().enumerate() {
            if !timetable.is_missing_final_arrival() {
                continue;
            }
            let id = timetable.id().clone();
            let next_id = timetable
                .next_train_id()
                .ok_or_else(|| RepairError::NoNextTrain { id: id.clone() })?;
            let next_timetable = index.get(&next_id).ok_or_else(|| {
                RepairError::NextTrainNotFound {
                    id: id.clone(),
                    next_id: next_id.clone(),
                }
            })?;
            let arrival = next_timetable
                .first_departure()
                .cloned()
                .ok_or_else(|| RepairError::MissingDeparture {
                    id: id.clone(),
                    next_id: next_id.clone(),
                })?;

            repairs.push(Repair {
                path: path.clone(),
                index: i,
                id,
                next_id,
                arrival,
            });
        }
    }
    Ok(repairs)
}
