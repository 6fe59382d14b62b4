//! Flattening of API rows into CSV records.
//!
//! Column layout: the requested dimension keys in request order, then
//! clicks, impressions, ctr and position, then page, country, device, label
//! and the query day. Context columns fall back to sentinels when the query
//! was not filtered on that dimension, so they always sit at fixed positions.

use crate::api::search::filters::FilterCombination;
use crate::api::search::structs::{Dimension, ResponseRow};
use chrono::NaiveDate;

pub const ALL_PAGES: &str = "gsc_property";
pub const WORLDWIDE: &str = "worldwide";
pub const ALL_DEVICES: &str = "all_devices";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterContext {
    pub page: String,
    pub country: String,
    pub device: String,
}

impl Default for FilterContext {
    fn default() -> Self {
        Self {
            page: ALL_PAGES.to_string(),
            country: WORLDWIDE.to_string(),
            device: ALL_DEVICES.to_string(),
        }
    }
}

impl FilterContext {
    pub fn from_combination(combination: &FilterCombination) -> Self {
        let mut context = Self::default();
        if let Some(page) = combination.value_of(Dimension::Page) {
            context.page = page.to_string();
        }
        if let Some(country) = combination.value_of(Dimension::Country) {
            context.country = country.to_string();
        }
        if let Some(device) = combination.value_of(Dimension::Device) {
            context.device = device.to_string();
        }
        context
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputRow {
    pub keys: Vec<String>,
    pub clicks: f64,
    pub impressions: f64,
    pub ctr: f64,
    pub position: f64,
    pub context: FilterContext,
    pub label: String,
    pub day: NaiveDate,
}

impl OutputRow {
    pub fn new(row: ResponseRow, context: &FilterContext, label: &str, day: NaiveDate) -> Self {
        Self {
            keys: row.keys,
            clicks: row.clicks,
            impressions: row.impressions,
            ctr: row.ctr,
            position: row.position,
            context: context.clone(),
            label: label.to_string(),
            day,
        }
    }

    pub fn to_record(&self) -> Vec<String> {
        let mut record = Vec::with_capacity(self.keys.len() + 9);
        record.extend(self.keys.iter().cloned());
        record.push(self.clicks.to_string());
        record.push(self.impressions.to_string());
        record.push(self.ctr.to_string());
        record.push(self.position.to_string());
        record.push(self.context.page.clone());
        record.push(self.context.country.clone());
        record.push(self.context.device.clone());
        record.push(self.label.clone());
        record.push(self.day.format("%Y-%m-%d").to_string());
        record
    }
}

/// Shapes every row fetched under `combination`, preserving API order.
pub fn shape_rows(
    rows: Vec<ResponseRow>,
    combination: &FilterCombination,
    label: &str,
    day: NaiveDate,
) -> Vec<OutputRow> {
    let context = FilterContext::from_combination(combination);
    rows.into_iter()
        .map(|row| OutputRow::new(row, &context, label, day))
        .collect()
}
