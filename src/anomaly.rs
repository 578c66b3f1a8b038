// 🌡️ Anomaly Provider - (entity, year) → delta vs baseline
//
// Formula:
//   delta(entity, year) = record(entity, year) - baseline(entity)
//
// Every delta is computed once at build time and stored in a fixed-width
// per-entity row indexed by `year - MIN_YEAR`, so a lookup is one hash probe
// plus one slice index.

use crate::baseline::BaselineIndex;
use crate::records::TemperatureRecord;
use crate::{MAX_YEAR, MIN_YEAR, YEAR_SPAN};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct AnomalyProvider {
    rows: HashMap<String, Box<[Option<f64>]>>,
    count: usize,
}

impl AnomalyProvider {
    /// One pass over all records
    ///
    /// Records for entities without a baseline, outside the year range, or
    /// without a numeric value are skipped. Duplicate (entity, year) rows keep
    /// the first value.
    pub fn build(records: &[TemperatureRecord], baseline: &BaselineIndex) -> Self {
        let mut rows: HashMap<String, Box<[Option<f64>]>> = HashMap::new();
        let mut count = 0;

        for record in records {
            let Some(slot) = year_slot(record.year) else {
                continue;
            };
            let Some(base) = baseline.get(&record.entity) else {
                continue;
            };
            let Some(value) = record.numeric_value() else {
                continue;
            };

            let row = rows
                .entry(record.entity.clone())
                .or_insert_with(|| vec![None; YEAR_SPAN].into_boxed_slice());

            if row[slot].is_none() {
                row[slot] = Some(value - base);
                count += 1;
            }
        }

        AnomalyProvider { rows, count }
    }

    /// Anomaly for an entity at a year, or `None` for "no data"
    ///
    /// Years outside `[MIN_YEAR, MAX_YEAR]` are "no data", never an error.
    pub fn delta(&self, entity: &str, year: i32) -> Option<f64> {
        let slot = year_slot(year)?;
        self.rows.get(entity).and_then(|row| row[slot])
    }

    /// Every stored delta, in no particular order (the color scale sample)
    pub fn sample(&self) -> Vec<f64> {
        self.rows
            .values()
            .flat_map(|row| row.iter().flatten().copied())
            .collect()
    }

    /// Year-ordered series for one entity
    pub fn series(&self, entity: &str) -> Vec<(i32, f64)> {
        match self.rows.get(entity) {
            Some(row) => row
                .iter()
                .enumerate()
                .filter_map(|(slot, delta)| delta.map(|d| (MIN_YEAR + slot as i32, d)))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn has_entity(&self, entity: &str) -> bool {
        self.rows.contains_key(entity)
    }

    /// Number of entities with at least one delta
    pub fn entity_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of stored (entity, year) deltas
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

fn year_slot(year: i32) -> Option<usize> {
    if (MIN_YEAR..=MAX_YEAR).contains(&year) {
        Some((year - MIN_YEAR) as usize)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BASELINE_YEAR;

    fn records() -> Vec<TemperatureRecord> {
        vec![
            TemperatureRecord::new("United States", 1900, Some(10.0)),
            TemperatureRecord::new("United States", 1950, Some(10.25)),
            TemperatureRecord::new("United States", 2000, Some(11.5)),
            TemperatureRecord::new("United States", 2010, None),
            TemperatureRecord::new("France", 1900, Some(9.0)),
            TemperatureRecord::new("France", 2000, Some(8.5)),
            // No baseline: data only from 1950 onwards
            TemperatureRecord::new("South Sudan", 1950, Some(27.0)),
            TemperatureRecord::new("South Sudan", 2015, Some(28.4)),
        ]
    }

    fn provider() -> AnomalyProvider {
        let records = records();
        let baseline = BaselineIndex::build(&records, BASELINE_YEAR);
        AnomalyProvider::build(&records, &baseline)
    }

    #[test]
    fn test_delta_is_record_minus_baseline() {
        let provider = provider();

        assert_eq!(provider.delta("United States", 2000), Some(1.5));
        assert_eq!(provider.delta("United States", 1950), Some(0.25));
        assert_eq!(provider.delta("United States", 1900), Some(0.0));
        assert_eq!(provider.delta("France", 2000), Some(-0.5));
    }

    #[test]
    fn test_delta_matches_formula_for_every_record() {
        let records = records();
        let baseline = BaselineIndex::build(&records, BASELINE_YEAR);
        let provider = AnomalyProvider::build(&records, &baseline);

        for record in &records {
            let expected = match (record.numeric_value(), baseline.get(&record.entity)) {
                (Some(value), Some(base)) => Some(value - base),
                _ => None,
            };
            assert_eq!(provider.delta(&record.entity, record.year), expected);
        }
    }

    #[test]
    fn test_missing_values_are_no_data() {
        let provider = provider();

        assert_eq!(provider.delta("United States", 2010), None);
        assert_eq!(provider.delta("United States", 1975), None);
        assert_eq!(provider.delta("Atlantis", 2000), None);
    }

    #[test]
    fn test_entity_without_baseline_has_no_deltas() {
        let provider = provider();

        for year in MIN_YEAR..=MAX_YEAR {
            assert_eq!(provider.delta("South Sudan", year), None);
        }
        assert!(!provider.has_entity("South Sudan"));
    }

    #[test]
    fn test_out_of_range_year_is_no_data() {
        let provider = provider();

        assert_eq!(provider.delta("United States", 1899), None);
        assert_eq!(provider.delta("United States", 2016), None);
        assert_eq!(provider.delta("United States", i32::MIN), None);
    }

    #[test]
    fn test_sample_and_series() {
        let provider = provider();

        let mut sample = provider.sample();
        sample.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(sample, vec![-0.5, 0.0, 0.0, 0.25, 1.5]);

        assert_eq!(
            provider.series("United States"),
            vec![(1900, 0.0), (1950, 0.25), (2000, 1.5)]
        );
        assert!(provider.series("Atlantis").is_empty());
        assert_eq!(provider.entity_count(), 2);
        assert_eq!(provider.len(), 5);
    }
}
