// Reviewable records and the record-type descriptors the engine is generic over

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::ReportStatus;
use crate::error::WorkflowError;

pub type RecordId = i64;

/// Describes one concrete report type. Every report type shares the same
/// review columns; only the table and permission module differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordType {
    /// Stable identifier used by callers and in cache keys.
    pub key: &'static str,
    pub table: &'static str,
    /// Prefix of the coarse permissions, e.g. `reforestation` for `reforestation.edit`.
    pub permission_module: &'static str,
    pub status_column: &'static str,
    /// Column used to group derived caches (reporting year).
    pub grouping_column: &'static str,
}

impl RecordType {
    const fn report(key: &'static str, table: &'static str) -> Self {
        Self {
            key,
            table,
            permission_module: key,
            status_column: "status",
            grouping_column: "year",
        }
    }

    pub fn all() -> &'static [RecordType] {
        &RECORD_TYPES
    }

    pub fn from_key(key: &str) -> Result<&'static RecordType, WorkflowError> {
        RECORD_TYPES
            .iter()
            .find(|record_type| record_type.key == key)
            .ok_or_else(|| WorkflowError::UnknownRecordType(key.to_string()))
    }
}

pub const REFORESTATION: RecordType = RecordType::report("reforestation", "reforestation_reports");
pub const URBAN_GREENING: RecordType = RecordType::report("urban_greening", "urban_greening_reports");
pub const MANGROVE_REHABILITATION: RecordType =
    RecordType::report("mangrove_rehabilitation", "mangrove_rehabilitation_reports");
pub const FOREST_FIRE: RecordType = RecordType::report("forest_fire", "forest_fire_reports");
pub const TIMBER_PRODUCTION: RecordType =
    RecordType::report("timber_production", "timber_production_reports");
pub const NON_TIMBER_PRODUCTION: RecordType =
    RecordType::report("non_timber_production", "non_timber_production_reports");
pub const ECONOMIC_VALUE: RecordType = RecordType::report("economic_value", "economic_value_reports");
pub const NURSERY_STOCK: RecordType = RecordType::report("nursery_stock", "nursery_stock_reports");
pub const SOCIAL_FORESTRY: RecordType = RecordType::report("social_forestry", "social_forestry_reports");
pub const FARMER_GROUPS: RecordType = RecordType::report("farmer_groups", "farmer_group_reports");
pub const ECOTOURISM_VISITS: RecordType =
    RecordType::report("ecotourism_visits", "ecotourism_visit_reports");
pub const NON_TAX_REVENUE: RecordType = RecordType::report("non_tax_revenue", "non_tax_revenue_reports");

static RECORD_TYPES: [RecordType; 12] = [
    REFORESTATION,
    URBAN_GREENING,
    MANGROVE_REHABILITATION,
    FOREST_FIRE,
    TIMBER_PRODUCTION,
    NON_TIMBER_PRODUCTION,
    ECONOMIC_VALUE,
    NURSERY_STOCK,
    SOCIAL_FORESTRY,
    FARMER_GROUPS,
    ECOTOURISM_VISITS,
    NON_TAX_REVENUE,
];

/// Review-relevant columns of a report row. Report-specific payload columns
/// are not the workflow's concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewableRecord {
    pub id: RecordId,
    /// Reporting year, the grouping key for derived caches.
    pub year: i32,
    pub status: ReportStatus,
    pub rejection_note: Option<String>,
    pub approved_by_kasi_at: Option<DateTime<Utc>>,
    pub approved_by_cdk_at: Option<DateTime<Utc>>,
    pub created_by: String,
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
}

impl ReviewableRecord {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Optional caller-supplied data accompanying an action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraData {
    pub rejection_note: Option<String>,
}

impl ExtraData {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_rejection_note(note: impl Into<String>) -> Self {
        Self {
            rejection_note: Some(note.into()),
        }
    }

    /// The note trimmed, or `None` when absent or blank.
    pub fn rejection_note(&self) -> Option<&str> {
        self.rejection_note
            .as_deref()
            .map(str::trim)
            .filter(|note| !note.is_empty())
    }
}
