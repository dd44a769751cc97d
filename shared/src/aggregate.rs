//! Read-only rollups over a farm's plots for stats and dashboards

use chrono::{DateTime, Datelike, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::Plot;

/// Farm health below this percentage triggers the soil-testing suggestion
pub const HEALTH_WARNING_PERCENT: u32 = 70;

/// Soil tests older than this many days trigger the re-test suggestion
pub const SOIL_TEST_MAX_AGE_DAYS: i64 = 180;

const MAX_RECOMMENDATIONS: usize = 3;

pub const SOIL_TESTING_RECOMMENDATION: &str =
    "Crop health is below 70%. Schedule soil testing to check nutrient levels.";
pub const PEST_MANAGEMENT_RECOMMENDATION: &str =
    "Active pest alerts found. Apply integrated pest management on affected plots.";
pub const IRRIGATION_SETUP_RECOMMENDATION: &str =
    "Some plots have no irrigation schedule. Set one up to keep watering consistent.";
pub const SOIL_RETEST_RECOMMENDATION: &str =
    "Soil on some plots was last tested over 6 months ago. Re-test before the next sowing.";
pub const GENERAL_RECOMMENDATIONS: [&str; 3] = [
    "Monitor crop growth stages and plan upcoming harvests.",
    "Keep activity logs up to date for accurate farm records.",
    "Check the weather forecast before scheduling irrigation.",
];

/// Indian cropping season
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Season {
    Kharif,
    Rabi,
    Summer,
}

impl Season {
    /// Season for a calendar month (1-12).
    ///
    /// November falls in both the Kharif (6-11) and Rabi (11, 1-3) ranges; Kharif is
    /// checked first and wins. December falls in neither and is Summer.
    pub fn for_month(month: u32) -> Self {
        if (6..=11).contains(&month) {
            Season::Kharif
        } else if month == 11 || (1..=3).contains(&month) {
            Season::Rabi
        } else {
            Season::Summer
        }
    }
}

impl std::fmt::Display for Season {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Season::Kharif => write!(f, "Kharif"),
            Season::Rabi => write!(f, "Rabi"),
            Season::Summer => write!(f, "Summer"),
        }
    }
}

/// Season label such as "Kharif 2024" for a point in time
pub fn season_label(now: DateTime<Utc>) -> String {
    format!("{} {}", Season::for_month(now.month()), now.year())
}

/// Rollups computed from a plot collection
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FarmAggregateView {
    pub total_plots: usize,
    pub total_area: Decimal,
    pub active_crops_count: usize,
    pub health_percentage: u32,
    pub active_pest_alerts_count: usize,
    pub current_season: String,
    pub recommendations: Vec<String>,
}

impl FarmAggregateView {
    pub fn compute<'a, I>(plots: I, total_area: Decimal, now: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = &'a Plot>,
    {
        let plots: Vec<&Plot> = plots.into_iter().collect();
        let total_plots = plots.len();

        let active_crops_count = plots.iter().filter(|plot| plot.is_cultivated()).count();
        let healthy = plots
            .iter()
            .filter(|plot| {
                plot.crop
                    .as_ref()
                    .map(|crop| crop.health.is_healthy())
                    .unwrap_or(false)
            })
            .count();
        let health_percentage = rounded_percentage(healthy, total_plots);
        let active_pest_alerts_count = plots.iter().map(|plot| plot.active_alert_count()).sum();

        let stale_before = now - Duration::days(SOIL_TEST_MAX_AGE_DAYS);
        let signals = Signals {
            low_health: total_plots > 0 && health_percentage < HEALTH_WARNING_PERCENT,
            active_pests: active_pest_alerts_count > 0,
            missing_schedule: plots.iter().any(|plot| plot.irrigation.schedule.is_none()),
            stale_soil_test: plots.iter().any(|plot| {
                plot.soil_health
                    .last_tested
                    .map(|tested| tested < stale_before)
                    .unwrap_or(false)
            }),
        };

        Self {
            total_plots,
            total_area,
            active_crops_count,
            health_percentage,
            active_pest_alerts_count,
            current_season: season_label(now),
            recommendations: signals.recommendations(),
        }
    }
}

struct Signals {
    low_health: bool,
    active_pests: bool,
    missing_schedule: bool,
    stale_soil_test: bool,
}

impl Signals {
    fn recommendations(&self) -> Vec<String> {
        let triggered: Vec<String> = [
            (self.low_health, SOIL_TESTING_RECOMMENDATION),
            (self.active_pests, PEST_MANAGEMENT_RECOMMENDATION),
            (self.missing_schedule, IRRIGATION_SETUP_RECOMMENDATION),
            (self.stale_soil_test, SOIL_RETEST_RECOMMENDATION),
        ]
        .into_iter()
        .filter(|(fired, _)| *fired)
        .map(|(_, text)| text.to_string())
        .take(MAX_RECOMMENDATIONS)
        .collect();

        if triggered.is_empty() {
            GENERAL_RECOMMENDATIONS.iter().map(|text| text.to_string()).collect()
        } else {
            triggered
        }
    }
}

// Half rounds up.
fn rounded_percentage(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    ((200 * part + whole) / (2 * whole)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertSeverity, AlertStatus, Crop, CropHealth, CropStage, PestAlert};
    use chrono::TimeZone;
    use uuid::Uuid;

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    fn growing(plot_number: u32, health: CropHealth) -> Plot {
        let mut plot = Plot::new_default(plot_number, Decimal::ONE);
        plot.crop = Some(Crop {
            name: "Soybean".to_string(),
            variety: None,
            planted_date: None,
            expected_harvest_date: None,
            stage: CropStage::Growing,
            health,
        });
        plot
    }

    fn alert(status: AlertStatus) -> PestAlert {
        PestAlert {
            id: Uuid::new_v4(),
            pest_type: "armyworm".to_string(),
            severity: AlertSeverity::High,
            detected_date: at(2024, 7, 1),
            status,
            treatment: None,
            notes: None,
        }
    }

    #[test]
    fn test_season_months() {
        assert_eq!(Season::for_month(6), Season::Kharif);
        assert_eq!(Season::for_month(10), Season::Kharif);
        assert_eq!(Season::for_month(1), Season::Rabi);
        assert_eq!(Season::for_month(3), Season::Rabi);
        assert_eq!(Season::for_month(4), Season::Summer);
        assert_eq!(Season::for_month(5), Season::Summer);
    }

    #[test]
    fn test_november_resolves_to_kharif() {
        assert_eq!(Season::for_month(11), Season::Kharif);
        assert_eq!(season_label(at(2024, 11, 15)), "Kharif 2024");
    }

    #[test]
    fn test_december_resolves_to_summer() {
        assert_eq!(season_label(at(2024, 12, 20)), "Summer 2024");
    }

    #[test]
    fn test_counts_and_health() {
        let mut plots = vec![
            growing(1, CropHealth::Excellent),
            growing(2, CropHealth::Good),
            growing(3, CropHealth::Poor),
            Plot::new_default(4, Decimal::ONE),
        ];
        plots[2].pest_alerts = vec![alert(AlertStatus::Active), alert(AlertStatus::Resolved)];
        plots[0].pest_alerts = vec![alert(AlertStatus::Active)];

        let view = FarmAggregateView::compute(&plots, Decimal::from(4), at(2024, 8, 1));

        assert_eq!(view.total_plots, 4);
        assert_eq!(view.active_crops_count, 3);
        // Excellent, good and the fallow plot's default "good" health
        assert_eq!(view.health_percentage, 75);
        assert_eq!(view.active_pest_alerts_count, 2);
        assert_eq!(view.current_season, "Kharif 2024");
        assert_eq!(view.recommendations, vec![PEST_MANAGEMENT_RECOMMENDATION]);
    }

    #[test]
    fn test_health_percentage_rounds() {
        let plots = vec![
            growing(1, CropHealth::Good),
            growing(2, CropHealth::Fair),
            growing(3, CropHealth::Fair),
        ];
        let view = FarmAggregateView::compute(&plots, Decimal::from(3), at(2024, 2, 1));
        assert_eq!(view.health_percentage, 33);

        let plots = vec![growing(1, CropHealth::Good), growing(2, CropHealth::Good), growing(3, CropHealth::Fair)];
        let view = FarmAggregateView::compute(&plots, Decimal::from(3), at(2024, 2, 1));
        assert_eq!(view.health_percentage, 67);
    }

    #[test]
    fn test_recommendations_capped_at_three_in_rule_order() {
        let mut plots = vec![growing(1, CropHealth::Critical), growing(2, CropHealth::Poor)];
        plots[0].pest_alerts.push(alert(AlertStatus::Active));
        plots[1].irrigation.schedule = None;
        plots[1].soil_health.last_tested = Some(at(2023, 1, 1));

        let view = FarmAggregateView::compute(&plots, Decimal::from(2), at(2024, 8, 1));
        assert_eq!(
            view.recommendations,
            vec![
                SOIL_TESTING_RECOMMENDATION,
                PEST_MANAGEMENT_RECOMMENDATION,
                IRRIGATION_SETUP_RECOMMENDATION,
            ]
        );
    }

    #[test]
    fn test_stale_soil_test_triggers_retest() {
        let mut plots = vec![growing(1, CropHealth::Good)];
        plots[0].soil_health.last_tested = Some(at(2024, 1, 10));
        let view = FarmAggregateView::compute(&plots, Decimal::ONE, at(2024, 9, 1));
        assert_eq!(view.recommendations, vec![SOIL_RETEST_RECOMMENDATION]);

        plots[0].soil_health.last_tested = Some(at(2024, 8, 1));
        let view = FarmAggregateView::compute(&plots, Decimal::ONE, at(2024, 9, 1));
        assert_eq!(view.recommendations.len(), 3);
        assert_eq!(view.recommendations[0], GENERAL_RECOMMENDATIONS[0]);
    }

    #[test]
    fn test_empty_collection() {
        let plots: Vec<Plot> = Vec::new();
        let view = FarmAggregateView::compute(&plots, Decimal::ZERO, at(2024, 4, 1));
        assert_eq!(view.total_plots, 0);
        assert_eq!(view.health_percentage, 0);
        assert_eq!(view.current_season, "Summer 2024");
        assert_eq!(view.recommendations.len(), 3);
    }
}
