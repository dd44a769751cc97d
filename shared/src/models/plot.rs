//! Farm plot models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Crop name carried by an uncultivated plot
pub const EMPTY_CROP_NAME: &str = "Empty";

/// Description of the audit entry appended by a bulk clear
pub const BULK_CLEAR_DESCRIPTION: &str = "Plot cleared (bulk operation)";

/// One cell of a farm's grid
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Plot {
    /// Row-major position within the grid, starting at 1
    pub plot_number: u32,
    /// Area in acres
    pub size: Decimal,
    #[serde(default)]
    pub crop: Option<Crop>,
    #[serde(default)]
    pub soil_health: SoilHealth,
    #[serde(default)]
    pub irrigation: Irrigation,
    #[serde(default)]
    pub pest_alerts: Vec<PestAlert>,
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl Plot {
    /// A freshly introduced plot with no agronomic history
    pub fn new_default(plot_number: u32, size: Decimal) -> Self {
        Self {
            plot_number,
            size,
            crop: Some(Crop::empty()),
            soil_health: SoilHealth::neutral(),
            irrigation: Irrigation::manual_default(),
            pest_alerts: Vec::new(),
            activities: Vec::new(),
            is_active: true,
        }
    }

    /// Whether something other than fallow ground is growing here
    pub fn is_cultivated(&self) -> bool {
        self.crop
            .as_ref()
            .map(|crop| crop.stage != CropStage::Fallow)
            .unwrap_or(false)
    }

    /// Whether the plot carries any record worth keeping
    pub fn has_history(&self) -> bool {
        self.is_cultivated() || !self.pest_alerts.is_empty() || !self.activities.is_empty()
    }

    pub fn active_alert_count(&self) -> usize {
        self.pest_alerts
            .iter()
            .filter(|alert| alert.status == AlertStatus::Active)
            .count()
    }
}

/// Crop currently assigned to a plot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Crop {
    pub name: String,
    #[serde(default)]
    pub variety: Option<String>,
    #[serde(default)]
    pub planted_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expected_harvest_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stage: CropStage,
    #[serde(default)]
    pub health: CropHealth,
}

impl Crop {
    /// Canonical state of an uncultivated plot
    pub fn empty() -> Self {
        Self {
            name: EMPTY_CROP_NAME.to_string(),
            variety: None,
            planted_date: None,
            expected_harvest_date: None,
            stage: CropStage::Fallow,
            health: CropHealth::Good,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name == EMPTY_CROP_NAME && self.stage == CropStage::Fallow
    }
}

/// Growth stage of a crop
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CropStage {
    Planted,
    Growing,
    Flowering,
    ReadyToHarvest,
    Harvested,
    #[default]
    Fallow,
}

impl std::fmt::Display for CropStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CropStage::Planted => write!(f, "planted"),
            CropStage::Growing => write!(f, "growing"),
            CropStage::Flowering => write!(f, "flowering"),
            CropStage::ReadyToHarvest => write!(f, "ready_to_harvest"),
            CropStage::Harvested => write!(f, "harvested"),
            CropStage::Fallow => write!(f, "fallow"),
        }
    }
}

/// Observed crop health
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CropHealth {
    Excellent,
    #[default]
    Good,
    Fair,
    Poor,
    Critical,
}

impl CropHealth {
    /// Excellent and good both count towards the farm health percentage
    pub fn is_healthy(&self) -> bool {
        matches!(self, CropHealth::Excellent | CropHealth::Good)
    }
}

/// Soil measurements for a plot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SoilHealth {
    #[serde(default)]
    pub ph: Option<Decimal>,
    /// Nitrogen in kg/ha
    #[serde(default)]
    pub nitrogen: Option<Decimal>,
    #[serde(default)]
    pub phosphorus: Option<Decimal>,
    #[serde(default)]
    pub potassium: Option<Decimal>,
    /// Organic matter percentage
    #[serde(default)]
    pub organic_matter: Option<Decimal>,
    /// Moisture percentage
    #[serde(default)]
    pub moisture: Option<Decimal>,
    #[serde(default)]
    pub last_tested: Option<DateTime<Utc>>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl SoilHealth {
    /// Untested soil: neutral pH and half saturation
    pub fn neutral() -> Self {
        Self {
            ph: Some(Decimal::new(70, 1)),
            moisture: Some(Decimal::from(50)),
            ..Self::default()
        }
    }
}

/// Irrigation setup for a plot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Irrigation {
    #[serde(rename = "type", default)]
    pub irrigation_type: Option<IrrigationType>,
    #[serde(default)]
    pub last_watered: Option<DateTime<Utc>>,
    /// Litres per watering
    #[serde(default)]
    pub water_requirement: Option<Decimal>,
    #[serde(default)]
    pub schedule: Option<IrrigationSchedule>,
}

impl Irrigation {
    /// Manual watering twice a day, every other day
    pub fn manual_default() -> Self {
        Self {
            irrigation_type: Some(IrrigationType::Manual),
            last_watered: None,
            water_requirement: None,
            schedule: Some(IrrigationSchedule {
                frequency: 2,
                duration: 30,
                times: vec!["06:00".to_string(), "18:00".to_string()],
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IrrigationType {
    Manual,
    Drip,
    Sprinkler,
    Flood,
    Furrow,
    Rainfed,
}

/// Recurring irrigation plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IrrigationSchedule {
    /// Days between waterings
    pub frequency: u32,
    /// Minutes per watering
    pub duration: u32,
    /// Times of day, "HH:MM"
    #[serde(default)]
    pub times: Vec<String>,
}

/// Pest or disease observation on a plot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PestAlert {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(rename = "type")]
    pub pest_type: String,
    pub severity: AlertSeverity,
    #[serde(default = "Utc::now")]
    pub detected_date: DateTime<Utc>,
    #[serde(default)]
    pub status: AlertStatus,
    #[serde(default)]
    pub treatment: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    #[default]
    Active,
    Treated,
    Resolved,
}

/// Entry in a plot's activity log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    #[serde(default = "Utc::now")]
    pub date: DateTime<Utc>,
    pub description: String,
    #[serde(default)]
    pub cost: Option<Decimal>,
    #[serde(default)]
    pub materials: Vec<String>,
    #[serde(default)]
    pub labor_hours: Option<Decimal>,
    #[serde(default)]
    pub weather: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Activity {
    pub fn new(activity_type: ActivityType, description: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            activity_type,
            date,
            description: description.into(),
            cost: None,
            materials: Vec::new(),
            labor_hours: None,
            weather: None,
            notes: None,
        }
    }

    /// Audit record left behind by a bulk clear
    pub fn bulk_clear(date: DateTime<Utc>) -> Self {
        Self::new(ActivityType::Other, BULK_CLEAR_DESCRIPTION, date)
    }
}

/// Activity as submitted by a client; the date falls back to the time of recording
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityInput {
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    pub description: String,
    #[serde(default)]
    pub cost: Option<Decimal>,
    #[serde(default)]
    pub materials: Vec<String>,
    #[serde(default)]
    pub labor_hours: Option<Decimal>,
    #[serde(default)]
    pub weather: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ActivityInput {
    pub fn into_activity(self, now: DateTime<Utc>) -> Activity {
        Activity {
            id: Uuid::new_v4(),
            activity_type: self.activity_type,
            date: self.date.unwrap_or(now),
            description: self.description,
            cost: self.cost,
            materials: self.materials,
            labor_hours: self.labor_hours,
            weather: self.weather,
            notes: self.notes,
        }
    }
}

/// Kinds of farming actions that can be logged
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Planting,
    Watering,
    Fertilizing,
    Pesticide,
    Harvesting,
    Weeding,
    Pruning,
    SoilTesting,
    Other,
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivityType::Planting => write!(f, "planting"),
            ActivityType::Watering => write!(f, "watering"),
            ActivityType::Fertilizing => write!(f, "fertilizing"),
            ActivityType::Pesticide => write!(f, "pesticide"),
            ActivityType::Harvesting => write!(f, "harvesting"),
            ActivityType::Weeding => write!(f, "weeding"),
            ActivityType::Pruning => write!(f, "pruning"),
            ActivityType::SoilTesting => write!(f, "soil_testing"),
            ActivityType::Other => write!(f, "other"),
        }
    }
}
