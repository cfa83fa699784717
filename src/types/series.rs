//! Observations and chronologically ordered series.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PipelineError, Result};

/// Date format used on the ingestion boundary and in snapshots.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Record keys that never carry a feature value.
const NON_FEATURE_KEYS: [&str; 2] = ["date", "location"];

/// One dated reading: a mapping from feature name to value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
}

impl Observation {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            location: None,
            values: BTreeMap::new(),
        }
    }

    /// Builder-style setter for a single feature value.
    #[must_use]
    pub fn with(mut self, feature: &str, value: f64) -> Self {
        self.values.insert(feature.to_string(), value);
        self
    }

    pub fn get(&self, feature: &str) -> Option<f64> {
        self.values.get(feature).copied()
    }

    /// Value of `feature`, or `MissingFeature` when absent.
    pub fn require(&self, feature: &str) -> Result<f64> {
        self.get(feature).ok_or_else(|| PipelineError::MissingFeature {
            feature: feature.to_string(),
        })
    }

    /// Build an observation from a loosely typed JSON record.
    ///
    /// Numbers are kept, numeric-looking strings become numbers, anything
    /// else (other than `date` / `location`) is dropped.
    pub fn from_record(index: usize, record: &serde_json::Map<String, Value>) -> Result<Self> {
        let raw_date = record
            .get("date")
            .and_then(Value::as_str)
            .ok_or_else(|| PipelineError::InvalidRecord {
                index,
                reason: "missing 'date' field".to_string(),
            })?;
        let date = parse_date(raw_date).ok_or_else(|| PipelineError::InvalidRecord {
            index,
            reason: format!("unparseable date '{raw_date}'"),
        })?;

        let location = record
            .get("location")
            .and_then(Value::as_str)
            .map(str::to_string);

        let values = record
            .iter()
            .filter(|(key, _)| !NON_FEATURE_KEYS.contains(&key.as_str()))
            .filter_map(|(key, value)| numeric_value(value).map(|v| (key.clone(), v)))
            .collect();

        Ok(Self {
            date,
            location,
            values,
        })
    }
}

/// Parse `YYYY-MM-DD`, also accepting a full RFC 3339 timestamp.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, DATE_FORMAT).ok().or_else(|| {
        chrono::DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.date_naive())
    })
}

fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Chronologically ordered sequence of observations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Series {
    observations: Vec<Observation>,
}

impl Series {
    /// Build a series, sorting by date. The sort is stable, so duplicate
    /// dates keep their input order.
    pub fn new(mut observations: Vec<Observation>) -> Self {
        observations.sort_by_key(|o| o.date);
        Self { observations }
    }

    /// Build a series from loosely typed JSON records.
    pub fn from_records(records: &[Value]) -> Result<Self> {
        let observations = records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                let map = record.as_object().ok_or_else(|| PipelineError::InvalidRecord {
                    index,
                    reason: "record is not an object".to_string(),
                })?;
                Observation::from_record(index, map)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(observations))
    }

    /// Build a single-feature series with consecutive daily dates.
    pub fn from_values(feature: &str, start: NaiveDate, values: &[f64]) -> Self {
        let observations = values
            .iter()
            .zip(start.iter_days())
            .map(|(&v, date)| Observation::new(date).with(feature, v))
            .collect();
        Self { observations }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn get(&self, index: usize) -> Option<&Observation> {
        self.observations.get(index)
    }

    pub fn last(&self) -> Option<&Observation> {
        self.observations.last()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.last().map(|o| o.date)
    }

    /// Every feature name present in any observation, sorted.
    pub fn available_features(&self) -> Vec<String> {
        self.observations
            .iter()
            .flat_map(|o| o.values.keys())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Preferred prediction target: `pm25`, then `aqi`, then the first
    /// available feature.
    pub fn default_target(&self) -> Option<String> {
        let features = self.available_features();
        ["pm25", "aqi"]
            .iter()
            .find(|t| features.iter().any(|f| f == *t))
            .map(|t| (*t).to_string())
            .or_else(|| features.into_iter().next())
    }

    /// All values of one feature, failing on the first observation that
    /// lacks it.
    pub fn values(&self, feature: &str) -> Result<Vec<f64>> {
        self.observations.iter().map(|o| o.require(feature)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn test_new_sorts_chronologically() {
        let series = Series::new(vec![
            Observation::new(date("2024-01-03")).with("pm25", 3.0),
            Observation::new(date("2024-01-01")).with("pm25", 1.0),
            Observation::new(date("2024-01-02")).with("pm25", 2.0),
        ]);
        assert_eq!(series.values("pm25").unwrap(), vec![1.0, 2.0, 3.0]);
        assert_eq!(series.last_date(), Some(date("2024-01-03")));
    }

    #[test]
    fn test_from_records_converts_numeric_strings() {
        let records = vec![json!({
            "date": "2020-01-01",
            "location": "Sample City",
            "pm25": 40,
            "o3": "0.035",
            "co": "1.2",
            "note": "n/a",
        })];
        let series = Series::from_records(&records).unwrap();
        let obs = &series.observations()[0];
        assert_eq!(obs.location.as_deref(), Some("Sample City"));
        assert_eq!(obs.get("pm25"), Some(40.0));
        assert!((obs.get("o3").unwrap() - 0.035).abs() < 1e-12);
        assert_eq!(obs.get("note"), None);
        assert_eq!(series.available_features(), vec!["co", "o3", "pm25"]);
    }

    #[test]
    fn test_from_records_rejects_missing_date() {
        let records = vec![json!({"pm25": 10})];
        let err = Series::from_records(&records).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRecord { index: 0, .. }));
    }

    #[test]
    fn test_default_target_prefers_pm25_then_aqi() {
        let d = date("2024-01-01");
        let with_pm = Series::new(vec![Observation::new(d).with("aqi", 1.0).with("pm25", 2.0)]);
        assert_eq!(with_pm.default_target().as_deref(), Some("pm25"));

        let with_aqi = Series::new(vec![Observation::new(d).with("aqi", 1.0).with("no2", 2.0)]);
        assert_eq!(with_aqi.default_target().as_deref(), Some("aqi"));

        let other = Series::new(vec![Observation::new(d).with("no2", 2.0)]);
        assert_eq!(other.default_target().as_deref(), Some("no2"));
    }

    #[test]
    fn test_observation_serializes_flat() {
        let obs = Observation::new(date("2024-02-01")).with("pm10", 12.5);
        let json = serde_json::to_value(&obs).unwrap();
        assert_eq!(json, json!({"date": "2024-02-01", "pm10": 12.5}));
    }

    #[test]
    fn test_parse_date_accepts_rfc3339() {
        assert_eq!(parse_date("2024-03-05T10:00:00Z"), Some(date("2024-03-05")));
        assert_eq!(parse_date("not a date"), None);
    }
}
