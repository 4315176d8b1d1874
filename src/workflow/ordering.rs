// Listing order with the reviewer's own pending stage as a tie-break

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

use super::principal::{Principal, Role};
use super::record::ReviewableRecord;
use super::status::ReportStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    CreatedAt,
    UpdatedAt,
    Year,
    Status,
    Id,
}

impl SortColumn {
    pub fn column_name(&self) -> &'static str {
        match self {
            SortColumn::CreatedAt => "created_at",
            SortColumn::UpdatedAt => "updated_at",
            SortColumn::Year => "year",
            SortColumn::Status => "status",
            SortColumn::Id => "id",
        }
    }
}

impl FromStr for SortColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created_at" => Ok(SortColumn::CreatedAt),
            "updated_at" => Ok(SortColumn::UpdatedAt),
            "year" => Ok(SortColumn::Year),
            "status" => Ok(SortColumn::Status),
            "id" => Ok(SortColumn::Id),
            other => Err(format!("unsupported sort column: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Caller-chosen primary sort. The default is most recent first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: SortColumn,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            column: SortColumn::CreatedAt,
            direction: SortDirection::Desc,
        }
    }
}

impl SortSpec {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderTerm {
    By(SortColumn, SortDirection),
    /// Rows in this status sort before all others.
    StatusFirst(ReportStatus),
}

/// The stage a reviewer acts on. `kacdk` wins when an actor holds both roles.
pub fn pending_stage_for(actor: &Principal) -> Option<ReportStatus> {
    if actor.has_role(Role::Kacdk) {
        Some(ReportStatus::WaitingCdk)
    } else if actor.has_role(Role::Kasi) {
        Some(ReportStatus::WaitingKasi)
    } else {
        None
    }
}

/// Order terms for a listing: the primary sort, then the reviewer's pending
/// stage when the primary sort is the default, then id for stable paging.
pub fn order_terms(actor: &Principal, sort: SortSpec) -> Vec<OrderTerm> {
    let mut terms = vec![OrderTerm::By(sort.column, sort.direction)];

    if sort.is_default() {
        if let Some(stage) = pending_stage_for(actor) {
            terms.push(OrderTerm::StatusFirst(stage));
        }
    }

    if sort.column != SortColumn::Id {
        terms.push(OrderTerm::By(SortColumn::Id, SortDirection::Desc));
    }
    terms
}

fn compare_column(a: &ReviewableRecord, b: &ReviewableRecord, column: SortColumn) -> Ordering {
    match column {
        SortColumn::CreatedAt => a.created_at.cmp(&b.created_at),
        SortColumn::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        SortColumn::Year => a.year.cmp(&b.year),
        SortColumn::Status => a.status.as_str().cmp(b.status.as_str()),
        SortColumn::Id => a.id.cmp(&b.id),
    }
}

pub fn compare(a: &ReviewableRecord, b: &ReviewableRecord, terms: &[OrderTerm]) -> Ordering {
    terms
        .iter()
        .map(|term| match term {
            OrderTerm::By(column, SortDirection::Asc) => compare_column(a, b, *column),
            OrderTerm::By(column, SortDirection::Desc) => compare_column(b, a, *column),
            OrderTerm::StatusFirst(status) => (b.status == *status).cmp(&(a.status == *status)),
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

pub fn sort_records(records: &mut [ReviewableRecord], terms: &[OrderTerm]) {
    records.sort_by(|a, b| compare(a, b, terms));
}

/// Render terms as an SQL `ORDER BY` clause. Column names come from closed
/// enums, so nothing caller-supplied reaches the SQL text.
pub fn to_sql(terms: &[OrderTerm], status_column: &str) -> String {
    if terms.is_empty() {
        return String::new();
    }

    let parts: Vec<String> = terms
        .iter()
        .map(|term| match term {
            OrderTerm::By(SortColumn::Status, direction) => {
                format!("{status_column} {}", direction_sql(*direction))
            }
            OrderTerm::By(column, direction) => {
                format!("{} {}", column.column_name(), direction_sql(*direction))
            }
            OrderTerm::StatusFirst(status) => format!(
                "CASE WHEN {status_column} = '{}' THEN 0 ELSE 1 END",
                status.as_str()
            ),
        })
        .collect();

    format!(" ORDER BY {}", parts.join(", "))
}

fn direction_sql(direction: SortDirection) -> &'static str {
    match direction {
        SortDirection::Asc => "ASC",
        SortDirection::Desc => "DESC",
    }
}
