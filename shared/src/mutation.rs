//! Field-level edit rules for plots
//!
//! Single-plot updates append to list fields and shallow-merge object fields. Bulk
//! updates apply one field set to many plots and replace list fields instead. Bulk
//! operations skip plot numbers the farm does not have and only fail when nothing
//! matched.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::models::{
    Activity, ActivityInput, Crop, CropHealth, CropStage, IrrigationSchedule, IrrigationType,
    PestAlert, Plot,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MutationError {
    #[error("Plot {0} not found")]
    PlotNotFound(u32),

    #[error("None of the requested plots exist: {0:?}")]
    NoPlotsFound(Vec<u32>),
}

/// How list-valued fields of a patch combine with what is already stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMerge {
    Append,
    Replace,
}

/// Editable plot fields; anything else in a request body is ignored
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlotPatch {
    #[serde(default)]
    pub crop: Option<CropPatch>,
    #[serde(default)]
    pub soil_health: Option<SoilHealthPatch>,
    #[serde(default)]
    pub irrigation: Option<IrrigationPatch>,
    #[serde(default)]
    pub pest_alerts: Option<Vec<PestAlert>>,
    #[serde(default)]
    pub activities: Option<Vec<Activity>>,
}

impl PlotPatch {
    pub fn is_empty(&self) -> bool {
        self.crop.is_none()
            && self.soil_health.is_none()
            && self.irrigation.is_none()
            && self.pest_alerts.is_none()
            && self.activities.is_none()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropPatch {
    pub name: Option<String>,
    pub variety: Option<String>,
    #[serde(default, deserialize_with = "deserialize_date_text")]
    pub planted_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_date_text")]
    pub expected_harvest_date: Option<DateTime<Utc>>,
    pub stage: Option<CropStage>,
    pub health: Option<CropHealth>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoilHealthPatch {
    pub ph: Option<Decimal>,
    pub nitrogen: Option<Decimal>,
    pub phosphorus: Option<Decimal>,
    pub potassium: Option<Decimal>,
    pub organic_matter: Option<Decimal>,
    pub moisture: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_date_text")]
    pub last_tested: Option<DateTime<Utc>>,
    pub recommendations: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrrigationPatch {
    #[serde(rename = "type")]
    pub irrigation_type: Option<IrrigationType>,
    #[serde(default, deserialize_with = "deserialize_date_text")]
    pub last_watered: Option<DateTime<Utc>>,
    pub water_requirement: Option<Decimal>,
    pub schedule: Option<IrrigationSchedule>,
}

/// Plot numbers a bulk operation touched and the ones it skipped
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BulkOutcome {
    pub touched: Vec<u32>,
    pub skipped: Vec<u32>,
}

/// Parse date-shaped text: RFC 3339, `YYYY-MM-DDTHH:MM[:SS]` or `YYYY-MM-DD` (UTC midnight)
pub fn parse_date_text(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Some(parsed.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.and_utc())
}

fn deserialize_date_text<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let text: Option<String> = Option::deserialize(deserializer)?;
    match text {
        None => Ok(None),
        Some(text) => parse_date_text(&text)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("'{}' is not a date", text))),
    }
}

/// Merge a patch into one plot
pub fn apply_patch(plot: &mut Plot, patch: &PlotPatch, lists: ListMerge) {
    if let Some(crop_patch) = &patch.crop {
        let crop = plot.crop.get_or_insert_with(Crop::empty);
        merge_crop(crop, crop_patch);
    }

    if let Some(soil) = &patch.soil_health {
        let target = &mut plot.soil_health;
        merge_field(&mut target.ph, &soil.ph);
        merge_field(&mut target.nitrogen, &soil.nitrogen);
        merge_field(&mut target.phosphorus, &soil.phosphorus);
        merge_field(&mut target.potassium, &soil.potassium);
        merge_field(&mut target.organic_matter, &soil.organic_matter);
        merge_field(&mut target.moisture, &soil.moisture);
        merge_field(&mut target.last_tested, &soil.last_tested);
        if let Some(recommendations) = &soil.recommendations {
            target.recommendations = recommendations.clone();
        }
    }

    if let Some(irrigation) = &patch.irrigation {
        let target = &mut plot.irrigation;
        merge_field(&mut target.irrigation_type, &irrigation.irrigation_type);
        merge_field(&mut target.last_watered, &irrigation.last_watered);
        merge_field(&mut target.water_requirement, &irrigation.water_requirement);
        merge_field(&mut target.schedule, &irrigation.schedule);
    }

    if let Some(alerts) = &patch.pest_alerts {
        merge_list(&mut plot.pest_alerts, alerts, lists);
    }
    if let Some(activities) = &patch.activities {
        merge_list(&mut plot.activities, activities, lists);
    }
}

fn merge_crop(crop: &mut Crop, patch: &CropPatch) {
    if let Some(name) = &patch.name {
        crop.name = name.clone();
    }
    merge_field(&mut crop.variety, &patch.variety);
    merge_field(&mut crop.planted_date, &patch.planted_date);
    merge_field(&mut crop.expected_harvest_date, &patch.expected_harvest_date);
    if let Some(stage) = patch.stage {
        crop.stage = stage;
    }
    if let Some(health) = patch.health {
        crop.health = health;
    }
}

fn merge_field<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
    if let Some(value) = value {
        *target = Some(value.clone());
    }
}

fn merge_list<T: Clone>(target: &mut Vec<T>, items: &[T], lists: ListMerge) {
    match lists {
        ListMerge::Append => target.extend_from_slice(items),
        ListMerge::Replace => *target = items.to_vec(),
    }
}

/// Update one plot, appending list fields
pub fn update_plot<'a>(
    plots: &'a mut [Plot],
    plot_number: u32,
    patch: &PlotPatch,
) -> Result<&'a Plot, MutationError> {
    let plot = find_plot(plots, plot_number)?;
    apply_patch(plot, patch, ListMerge::Append);
    Ok(plot)
}

/// Apply the same patch to every listed plot that exists, replacing list fields
pub fn bulk_update(
    plots: &mut [Plot],
    plot_numbers: &[u32],
    patch: &PlotPatch,
) -> Result<BulkOutcome, MutationError> {
    for_each_listed(plots, plot_numbers, |plot| {
        apply_patch(plot, patch, ListMerge::Replace)
    })
}

/// Reset every listed plot to an empty crop with no alerts, logging the clear
pub fn bulk_clear(
    plots: &mut [Plot],
    plot_numbers: &[u32],
    now: DateTime<Utc>,
) -> Result<BulkOutcome, MutationError> {
    for_each_listed(plots, plot_numbers, |plot| {
        plot.crop = Some(Crop::empty());
        plot.pest_alerts.clear();
        plot.activities.push(Activity::bulk_clear(now));
    })
}

/// Append one entry to a plot's activity log
pub fn add_activity(
    plots: &mut [Plot],
    plot_number: u32,
    input: ActivityInput,
    now: DateTime<Utc>,
) -> Result<Activity, MutationError> {
    let plot = find_plot(plots, plot_number)?;
    let activity = input.into_activity(now);
    plot.activities.push(activity.clone());
    Ok(activity)
}

fn find_plot(plots: &mut [Plot], plot_number: u32) -> Result<&mut Plot, MutationError> {
    plots
        .iter_mut()
        .find(|plot| plot.plot_number == plot_number)
        .ok_or(MutationError::PlotNotFound(plot_number))
}

// Repeated numbers in a request are applied once, in first-seen order.
fn for_each_listed<F>(
    plots: &mut [Plot],
    plot_numbers: &[u32],
    mut apply: F,
) -> Result<BulkOutcome, MutationError>
where
    F: FnMut(&mut Plot),
{
    let mut seen = HashSet::new();
    let mut outcome = BulkOutcome::default();

    for &plot_number in plot_numbers {
        if !seen.insert(plot_number) {
            continue;
        }
        match plots.iter_mut().find(|plot| plot.plot_number == plot_number) {
            Some(plot) => {
                apply(plot);
                outcome.touched.push(plot_number);
            }
            None => outcome.skipped.push(plot_number),
        }
    }

    if outcome.touched.is_empty() {
        return Err(MutationError::NoPlotsFound(outcome.skipped));
    }
    Ok(outcome)
}
