use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Key of the timetable identifier.
const ID: &str = "id";
/// Key of the stop event list.
const STOPS: &str = "tt";
/// Key of the next train identifiers.
const NEXT_TRAINS: &str = "nt";
/// Key of a stop's departure time.
const DEPARTURE: &str = "d";
/// Key of a stop's arrival time.
const ARRIVAL: &str = "a";

/// Identifier of one train run's timetable, e.g. `JR-East.Tsurumi.403H.Weekday`.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize)]
pub struct TimetableId(pub String);

impl fmt::Display for TimetableId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One scheduled train run: an ordered list of stop events (`tt`) and an
/// optional link to the run continuing the same train (`nt`).
///
/// Only `id`, `tt`, `nt` and the stop times `d`/`a` are interpreted. Every
/// other field is kept as-is, and key order is preserved on output.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct Timetable {
    id: TimetableId,
    fields: Map<String, Value>,
}

impl TryFrom<Map<String, Value>> for Timetable {
    type Error = String;

    fn try_from(fields: Map<String, Value>) -> Result<Self, Self::Error> {
        let id = match fields.get(ID) {
            Some(Value::String(id)) => TimetableId(id.clone()),
            Some(_) => return Err("timetable \"id\" must be a string".to_string()),
            None => return Err("timetable is missing \"id\"".to_string()),
        };
        match fields.get(STOPS) {
            Some(Value::Array(stops)) if stops.is_empty() => {
                return Err(format!("timetable {id} has no stops in \"tt\""));
            }
            Some(Value::Array(stops)) if stops.iter().all(Value::is_object) => {}
            Some(_) => return Err(format!("\"tt\" of timetable {id} must be a list of stops")),
            None => return Err(format!("timetable {id} is missing \"tt\"")),
        }
        if let Some(next_trains) = fields.get(NEXT_TRAINS) {
            let all_strings = next_trains
                .as_array()
                .is_some_and(|ids| ids.iter().all(Value::is_string));
            if !all_strings {
                return Err(format!("\"nt\" of timetable {id} must be a list of ids"));
            }
        }
        Ok(Timetable { id, fields })
    }
}

impl Serialize for Timetable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

impl Timetable {
    pub fn id(&self) -> &TimetableId {
        &self.id
    }

    fn stops(&self) -> &[Value] {
        self.fields
            .get(STOPS)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The continuation run, the first entry of `nt`.
    pub fn next_train_id(&self) -> Option<TimetableId> {
        self.fields
            .get(NEXT_TRAINS)?
            .as_array()?
            .first()?
            .as_str()
            .map(|id| TimetableId(id.to_string()))
    }

    /// Departure time at the first stop.
    pub fn first_departure(&self) -> Option<&Value> {
        self.stops().first()?.get(DEPARTURE)
    }

    /// True when the final stop has no arrival time recorded.
    pub fn is_missing_final_arrival(&self) -> bool {
        self.stops()
            .last()
            .and_then(Value::as_object)
            .is_some_and(|stop| !stop.contains_key(ARRIVAL))
    }

    /// Sets the arrival time of the final stop, appending the key after the
    /// stop's existing fields.
    pub fn set_final_arrival(&mut self, arrival: Value) {
        let last_stop = self
            .fields
            .get_mut(STOPS)
            .and_then(Value::as_array_mut)
            .and_then(|stops| stops.last_mut())
            .and_then(Value::as_object_mut);
        if let Some(stop) = last_stop {
            stop.insert(ARRIVAL.to_string(), arrival);
        }
    }

    #[cfg(test)]
    pub fn final_arrival(&self) -> Option<&Value> {
        self.stops().last()?.get(ARRIVAL)
    }
}

/// All loaded timetable files, keyed by path and iterated in path order.
/// Passed from the loader through the repairer to the writer.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TimetableFiles(pub BTreeMap<PathBuf, Vec<Timetable>>);

impl TimetableFiles {
    pub fn record_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    /// Every record with its path, in path then file order.
    pub fn iter_records(&self) -> impl Iterator<Item = (&PathBuf, &Timetable)> {
        self.0
            .iter()
            .flat_map(|(path, timetables)| timetables.iter().map(move |tt| (path, tt)))
    }
}
