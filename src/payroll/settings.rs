use serde::{Deserialize, Serialize};

use super::domain::DisciplineId;

/// One row of the off-peak schedule: a class counts as off-peak when its
/// venue name contains `venue_contains` and it starts exactly at `starts_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffPeakSlot {
    pub venue_contains: String,
    pub starts_at: String,
}

/// Engine constants for one studio deployment. Passed explicitly into the
/// metrics calculator, importer, and payment assembler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayrollSettings {
    pub weeks_per_period: u32,
    pub retention_rate: f64,
    pub cover_rate: f64,
    pub capital_city: String,
    /// Discipline whose consecutive-slot bookings count toward the
    /// back-to-back metric.
    pub reference_discipline: DisciplineId,
    /// Token joining two instructor names on a shared class ("vs").
    pub pairing_token: String,
    pub disciplines: Vec<DisciplineId>,
    pub off_peak: Vec<OffPeakSlot>,
}

impl PayrollSettings {
    pub fn is_off_peak(&self, venue: &str, starts_at: &str) -> bool {
        self.off_peak.iter().any(|slot| {
            venue.to_lowercase().contains(&slot.venue_contains.to_lowercase())
                && slot.starts_at == starts_at
        })
    }

    pub fn knows_discipline(&self, discipline: &DisciplineId) -> bool {
        self.disciplines.iter().any(|known| known == discipline)
    }
}

impl Default for PayrollSettings {
    fn default() -> Self {
        Self {
            weeks_per_period: 4,
            retention_rate: 0.10,
            cover_rate: 80.0,
            capital_city: "Santiago".to_string(),
            reference_discipline: DisciplineId("cycling".to_string()),
            pairing_token: "vs".to_string(),
            disciplines: vec![
                DisciplineId("cycling".to_string()),
                DisciplineId("functional".to_string()),
                DisciplineId("yoga".to_string()),
                DisciplineId("running".to_string()),
            ],
            off_peak: vec![
                OffPeakSlot {
                    venue_contains: "Centro".to_string(),
                    starts_at: "07:00".to_string(),
                },
                OffPeakSlot {
                    venue_contains: "Centro".to_string(),
                    starts_at: "08:00".to_string(),
                },
                OffPeakSlot {
                    venue_contains: "Vitacura".to_string(),
                    starts_at: "06:00".to_string(),
                },
            ],
        }
    }
}
