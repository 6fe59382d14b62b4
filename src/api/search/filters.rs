//! Filter combination generation.
//!
//! A query can be narrowed on page, device and country. Each dimension takes a
//! list of candidate values; one query is issued per element of the Cartesian
//! product of the non-empty lists. Dimensions without values never appear in a
//! combination, and when every list is empty a single unfiltered combination
//! is produced.

use super::structs::{Dimension, DimensionFilter};

/// Fixed order of the filterable dimensions inside every combination.
pub const FILTER_ORDER: [Dimension; 3] = [Dimension::Page, Dimension::Device, Dimension::Country];

/// Candidate values for each filterable dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterDimensions {
    pages: Vec<String>,
    devices: Vec<String>,
    countries: Vec<String>,
}

impl FilterDimensions {
    /// Builds the set, dropping repeated values so no combination is produced twice.
    pub fn new(pages: Vec<String>, devices: Vec<String>, countries: Vec<String>) -> Self {
        Self {
            pages: dedup(pages),
            devices: dedup(devices),
            countries: dedup(countries),
        }
    }

    pub fn values(&self, dimension: Dimension) -> &[String] {
        match dimension {
            Dimension::Page => &self.pages,
            Dimension::Device => &self.devices,
            Dimension::Country => &self.countries,
            Dimension::Query => &[],
        }
    }

    /// Number of combinations [`combinations`](Self::combinations) will yield.
    pub fn combination_count(&self) -> usize {
        FILTER_ORDER
            .iter()
            .map(|d| self.values(*d).len())
            .filter(|len| *len > 0)
            .product()
    }

    /// Lazily walks the product. Each call starts a fresh walk.
    pub fn combinations(&self) -> FilterCombinations<'_> {
        let axes: Vec<(Dimension, &[String])> = FILTER_ORDER
            .iter()
            .map(|d| (*d, self.values(*d)))
            .filter(|(_, values)| !values.is_empty())
            .collect();
        FilterCombinations {
            cursor: vec![0; axes.len()],
            remaining: self.combination_count(),
            axes,
        }
    }
}

/// One concrete equality filter per non-empty dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCombination {
    filters: Vec<DimensionFilter>,
}

impl FilterCombination {
    pub fn filters(&self) -> &[DimensionFilter] {
        &self.filters
    }

    pub fn into_filters(self) -> Vec<DimensionFilter> {
        self.filters
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Value assigned to `dimension`, looked up by name rather than position.
    pub fn value_of(&self, dimension: Dimension) -> Option<&str> {
        self.filters
            .iter()
            .find(|f| f.dimension == dimension)
            .map(|f| f.expression.as_str())
    }

    /// Human readable `dimension=value` list for log lines.
    pub fn describe(&self) -> String {
        if self.filters.is_empty() {
            return "unfiltered".to_string();
        }
        self.filters
            .iter()
            .map(|f| format!("{}={}", f.dimension, f.expression))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone)]
pub struct FilterCombinations<'a> {
    axes: Vec<(Dimension, &'a [String])>,
    cursor: Vec<usize>,
    remaining: usize,
}

impl Iterator for FilterCombinations<'_> {
    type Item = FilterCombination;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let filters = self
            .axes
            .iter()
            .zip(&self.cursor)
            .map(|((dimension, values), idx)| DimensionFilter::equals(*dimension, &values[*idx]))
            .collect();
        self.remaining -= 1;

        // odometer: last axis spins fastest
        for axis in (0..self.axes.len()).rev() {
            self.cursor[axis] += 1;
            if self.cursor[axis] < self.axes[axis].1.len() {
                break;
            }
            self.cursor[axis] = 0;
        }
        Some(FilterCombination { filters })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for FilterCombinations<'_> {}

fn dedup(values: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(values.len());
    for value in values {
        if !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_cartesian_product_count_and_uniqueness() {
        let dims = FilterDimensions::new(
            strings(&["https://example.com/a", "https://example.com/b"]),
            strings(&["desktop", "mobile", "tablet"]),
            strings(&["gbr", "usa"]),
        );
        let combos: Vec<_> = dims.combinations().collect();
        assert_eq!(combos.len(), 12);
        assert_eq!(dims.combination_count(), 12);

        let unique: HashSet<Vec<String>> = combos
            .iter()
            .map(|c| c.filters().iter().map(|f| f.expression.clone()).collect())
            .collect();
        assert_eq!(unique.len(), 12);

        for combo in &combos {
            assert_eq!(combo.filters().len(), 3);
            let order: Vec<_> = combo.filters().iter().map(|f| f.dimension).collect();
            assert_eq!(order, FILTER_ORDER.to_vec());
        }
    }

    #[test]
    fn test_empty_dimensions_are_omitted() {
        let dims = FilterDimensions::new(Vec::new(), strings(&["desktop", "mobile"]), Vec::new());
        let combos: Vec<_> = dims.combinations().collect();
        assert_eq!(combos.len(), 2);
        for combo in &combos {
            assert!(combo.value_of(Dimension::Page).is_none());
            assert!(combo.value_of(Dimension::Country).is_none());
        }
        assert_eq!(combos[0].value_of(Dimension::Device), Some("desktop"));
        assert_eq!(combos[1].value_of(Dimension::Device), Some("mobile"));
    }

    #[test]
    fn test_all_empty_yields_single_unfiltered_combination() {
        let dims = FilterDimensions::default();
        let combos: Vec<_> = dims.combinations().collect();
        assert_eq!(combos.len(), 1);
        assert!(combos[0].is_empty());
        assert_eq!(combos[0].describe(), "unfiltered");
    }

    #[test]
    fn test_combinations_are_restartable() {
        let dims = FilterDimensions::new(strings(&["p"]), strings(&["desktop"]), strings(&["fra"]));
        let first: Vec<_> = dims.combinations().collect();
        let second: Vec<_> = dims.combinations().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_duplicate_values_collapse() {
        let dims = FilterDimensions::new(Vec::new(), strings(&["desktop", "desktop"]), Vec::new());
        assert_eq!(dims.combinations().count(), 1);
    }

    #[test]
    fn test_iteration_order_last_axis_fastest() {
        let dims = FilterDimensions::new(Vec::new(), strings(&["desktop", "mobile"]), strings(&["gbr", "usa"]));
        let described: Vec<_> = dims.combinations().map(|c| c.describe()).collect();
        assert_eq!(
            described,
            vec![
                "device=desktop, country=gbr",
                "device=desktop, country=usa",
                "device=mobile, country=gbr",
                "device=mobile, country=usa",
            ]
        );
    }
}
