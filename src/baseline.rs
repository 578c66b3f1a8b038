// 📏 Baseline Index - Reference-year value per canonical entity
//
// Built once per dataset load. Entities without a numeric value at the
// baseline year are absent, and stay "no data" for every later year.

use crate::records::TemperatureRecord;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct BaselineIndex {
    year: i32,
    values: HashMap<String, f64>,
}

impl BaselineIndex {
    /// Filter records to `baseline_year`, dropping null/NaN values
    ///
    /// If the table carries two baseline rows for one entity, the first wins.
    pub fn build(records: &[TemperatureRecord], baseline_year: i32) -> Self {
        let mut values = HashMap::new();

        for record in records.iter().filter(|r| r.year == baseline_year) {
            if let Some(value) = record.numeric_value() {
                values.entry(record.entity.clone()).or_insert(value);
            }
        }

        BaselineIndex {
            year: baseline_year,
            values,
        }
    }

    pub fn get(&self, entity: &str) -> Option<f64> {
        self.values.get(entity).copied()
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.values.contains_key(entity)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Canonical entity names (the resolver's known set)
    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}
