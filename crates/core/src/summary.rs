//! Fetch statistics.
//!
//! A [`FetchSummary`] is accumulated while a backend produces items. It keeps
//! counters plus min/max/last watermarks over update times and offsets, which
//! is what a supervisor needs to monitor a run or resume it later.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::item::{Item, epoch_seconds};

/// Statistics of a fetch run, in the order items were observed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchSummary {
    pub fetched: u64,
    pub skipped: u64,
    pub min_updated_on: Option<DateTime<Utc>>,
    pub max_updated_on: Option<DateTime<Utc>>,
    pub last_updated_on: Option<DateTime<Utc>>,
    pub last_uuid: Option<String>,
    pub min_offset: Option<i64>,
    pub max_offset: Option<i64>,
    pub last_offset: Option<i64>,
    /// Backend-specific data set when the fetch finishes.
    pub extras: Option<JsonValue>,
}

impl FetchSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for a fetched item.
    pub fn update(&mut self, item: &Item) {
        self.fetched += 1;
        self.last_uuid = Some(item.uuid.clone());

        if let Some(updated_on) = item.updated_on_datetime() {
            self.min_updated_on = Some(min_of(self.min_updated_on, updated_on));
            self.max_updated_on = Some(max_of(self.max_updated_on, updated_on));
            self.last_updated_on = Some(updated_on);
        }

        if let Some(offset) = item.offset {
            self.min_offset = Some(min_of(self.min_offset, offset));
            self.max_offset = Some(max_of(self.max_offset, offset));
            self.last_offset = Some(offset);
        }
    }

    /// Account for a record the backend filtered out.
    pub fn skip(&mut self) {
        self.skipped += 1;
    }

    pub fn set_extras(&mut self, extras: JsonValue) {
        self.extras = Some(extras);
    }

    /// Flat representation with timestamps as epoch seconds.
    pub fn to_mapping(&self) -> Map<String, JsonValue> {
        let mut map = Map::new();
        map.insert("fetched".into(), self.fetched.into());
        map.insert("skipped".into(), self.skipped.into());
        map.insert("min_updated_on".into(), timestamp_value(self.min_updated_on));
        map.insert("max_updated_on".into(), timestamp_value(self.max_updated_on));
        map.insert("last_updated_on".into(), timestamp_value(self.last_updated_on));
        map.insert(
            "last_uuid".into(),
            self.last_uuid.clone().map_or(JsonValue::Null, JsonValue::String),
        );
        map.insert("min_offset".into(), self.min_offset.into());
        map.insert("max_offset".into(), self.max_offset.into());
        map.insert("last_offset".into(), self.last_offset.into());
        map.insert(
            "extras".into(),
            self.extras.clone().unwrap_or(JsonValue::Null),
        );
        map
    }
}

fn min_of<T: Ord + Copy>(current: Option<T>, value: T) -> T {
    current.map_or(value, |c| c.min(value))
}

fn max_of<T: Ord + Copy>(current: Option<T>, value: T) -> T {
    current.map_or(value, |c| c.max(value))
}

fn timestamp_value(at: Option<DateTime<Utc>>) -> JsonValue {
    at.map(epoch_seconds)
        .and_then(serde_json::Number::from_f64)
        .map_or(JsonValue::Null, JsonValue::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn item(uuid: &str, updated_on: f64, offset: Option<i64>) -> Item {
        let item = Item::new("test", "0.1.0", "item", "origin", uuid, updated_on, json!({}));
        match offset {
            Some(o) => item.with_offset(o),
            None => item,
        }
    }

    #[test]
    fn empty_summary_has_no_watermarks() {
        let summary = FetchSummary::new();
        let map = summary.to_mapping();

        assert_eq!(map["fetched"], json!(0));
        assert_eq!(map["skipped"], json!(0));
        assert_eq!(map["min_updated_on"], JsonValue::Null);
        assert_eq!(map["last_uuid"], JsonValue::Null);
        assert_eq!(map["extras"], JsonValue::Null);
    }

    #[test]
    fn watermarks_follow_observation_order() {
        let mut summary = FetchSummary::new();
        summary.update(&item("a", 200.0, Some(5)));
        summary.update(&item("b", 100.0, Some(9)));
        summary.update(&item("c", 150.0, Some(7)));
        summary.skip();

        assert_eq!(summary.fetched, 3);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.last_uuid.as_deref(), Some("c"));
        assert_eq!(summary.min_updated_on.unwrap().timestamp(), 100);
        assert_eq!(summary.max_updated_on.unwrap().timestamp(), 200);
        assert_eq!(summary.last_updated_on.unwrap().timestamp(), 150);
        assert_eq!(summary.min_offset, Some(5));
        assert_eq!(summary.max_offset, Some(9));
        assert_eq!(summary.last_offset, Some(7));
    }

    #[test]
    fn items_without_offset_leave_offsets_untouched() {
        let mut summary = FetchSummary::new();
        summary.update(&item("a", 10.0, None));

        assert_eq!(summary.min_offset, None);
        assert_eq!(summary.last_offset, None);
    }

    #[test]
    fn mapping_renders_timestamps_as_epoch_seconds() {
        let mut summary = FetchSummary::new();
        summary.update(&item("a", 1_600_000_000.25, Some(1)));
        summary.set_extras(json!({"pages": 3}));

        let map = summary.to_mapping();
        assert_eq!(map["max_updated_on"].as_f64(), Some(1_600_000_000.25));
        assert_eq!(map["last_offset"], json!(1));
        assert_eq!(map["extras"], json!({"pages": 3}));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: for any item sequence, min <= last <= max holds for both
        /// update times and offsets, and every item is counted.
        #[test]
        fn last_watermark_lies_between_min_and_max(
            entries in prop::collection::vec((0i64..2_000_000_000i64, -1000i64..1000i64), 1..50)
        ) {
            let mut summary = FetchSummary::new();
            for (idx, (secs, offset)) in entries.iter().enumerate() {
                summary.update(&item(&idx.to_string(), *secs as f64, Some(*offset)));
            }

            let min = summary.min_updated_on.unwrap();
            let max = summary.max_updated_on.unwrap();
            let last = summary.last_updated_on.unwrap();
            prop_assert!(min <= last && last <= max);

            let (min_o, max_o, last_o) = (
                summary.min_offset.unwrap(),
                summary.max_offset.unwrap(),
                summary.last_offset.unwrap(),
            );
            prop_assert!(min_o <= last_o && last_o <= max_o);
            prop_assert_eq!(summary.fetched, entries.len() as u64);
        }
    }
}
