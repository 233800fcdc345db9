//! Excellon drill file types.

use serde::Serialize;

use crate::geometry::Point;

/// How a drill record removes material.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrillKind {
    /// A single plunge at the record position.
    Plunge,
    /// A routed segment from the record position to `end`.
    Route {
        /// End of the segment.
        end: Point,
    },
}

/// One drill record. Coordinates and diameter are millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrillRecord {
    /// Tool number that produced the record.
    pub tool: u32,
    /// Tool diameter.
    pub diameter: f64,
    /// Plunge position, or route segment start.
    pub position: Point,
    /// Plunge or route.
    pub kind: DrillKind,
}

/// Excellon tool definition from the tool table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolDefinition {
    /// Tool number (T1, T2, etc.).
    pub number: u32,
    /// Drill diameter in millimetres.
    pub diameter: f64,
}

/// Unit system for Excellon files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExcellonUnits {
    /// Metric (millimeters).
    Metric,
    /// Imperial (inches).
    Imperial,
}

impl ExcellonUnits {
    /// Factor converting a value in these units to millimetres.
    pub const fn to_mm(self) -> f64 {
        match self {
            Self::Metric => 1.0,
            Self::Imperial => 25.4,
        }
    }
}

/// Per-line outcome totals. Every non-blank, non-comment line lands in
/// exactly one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineCounters {
    /// Parsed and applied.
    pub succeeded: u32,
    /// Parse error; the line was skipped and the file continued.
    pub failed: u32,
    /// Recognised but not applicable.
    pub skipped: u32,
}

impl LineCounters {
    /// Sum of all buckets.
    pub const fn total(&self) -> u32 {
        self.succeeded
            .saturating_add(self.failed)
            .saturating_add(self.skipped)
    }

    /// Add another set of counters.
    pub fn absorb(&mut self, other: Self) {
        self.succeeded = self.succeeded.saturating_add(other.succeeded);
        self.failed = self.failed.saturating_add(other.failed);
        self.skipped = self.skipped.saturating_add(other.skipped);
    }
}

/// Result of Excellon parsing for a single file.
#[derive(Debug, Clone)]
pub struct ExcellonResult {
    /// Drill records in file order.
    pub records: Vec<DrillRecord>,
    /// Tool definitions, sorted by number.
    pub tools: Vec<ToolDefinition>,
    /// Unit system specified in the file.
    pub units: ExcellonUnits,
    /// Parser warnings encountered while processing the file.
    pub warnings: Vec<String>,
    /// Line outcome totals.
    pub counters: LineCounters,
}
