//! Event DTOs for scheduling, bulk upload and betting overrides.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::Event;
use crate::service::{BulkEventRow, BulkRejection, BulkUploadReport, EventView};

/// Request body for `POST /events`. Date and time are league-local.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEventRequest {
    /// Event name (max 100 chars).
    pub name: String,
    /// Local date, `YYYY-MM-DD`.
    pub date: String,
    /// Local time, `HH:MM`.
    pub time: String,
}

/// Request body for `PATCH /events/{id}`. `date` and `time` travel
/// together.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateEventRequest {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New local date, `YYYY-MM-DD`.
    #[serde(default)]
    pub date: Option<String>,
    /// New local time, `HH:MM`.
    #[serde(default)]
    pub time: Option<String>,
}

/// Request body for `POST /events/{id}/reopen`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReopenRequest {
    /// Why betting is reopened; logged with the admin id.
    pub reason: String,
}

/// Event as returned by the API.
#[derive(Debug, Serialize, ToSchema)]
pub struct EventDto {
    /// Event identifier.
    pub event_id: uuid::Uuid,
    /// Event name.
    pub name: String,
    /// Scheduled start.
    pub starts_at: DateTime<Utc>,
    /// Instant betting closes.
    pub closes_at: DateTime<Utc>,
    /// `scheduled`, `betting_closed` or `resulted`.
    pub status: String,
    /// Whether predictions may currently change.
    pub betting_open: bool,
    /// Whether a result has been entered.
    pub has_result: bool,
    /// Number of predictions placed.
    pub predictions_count: usize,
    /// Whether the pre-event reminder went out.
    pub reminder_sent: bool,
}

impl From<EventView> for EventDto {
    fn from(view: EventView) -> Self {
        Self {
            event_id: *view.event.id.as_uuid(),
            name: view.event.name,
            starts_at: view.event.starts_at,
            closes_at: view.closes_at,
            status: view.status.as_str().to_string(),
            betting_open: view.betting_open,
            has_result: view.has_result,
            predictions_count: view.predictions_count,
            reminder_sent: view.event.reminder_sent,
        }
    }
}

/// One row of a bulk upload.
#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkRowDto {
    /// Event name.
    pub name: String,
    /// Local date, `YYYY-MM-DD`.
    pub date: String,
    /// Local time, `HH:MM`.
    pub time: String,
}

/// Request body for `POST /events/bulk`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkUploadRequest {
    /// Split rows.
    pub rows: Vec<BulkRowDto>,
    /// Lines the uploader could not split into three fields.
    #[serde(default)]
    pub unparsed_lines: Vec<String>,
}

impl BulkUploadRequest {
    /// Converts the body into service rows.
    #[must_use]
    pub fn into_parts(self) -> (Vec<BulkEventRow>, Vec<String>) {
        let rows = self
            .rows
            .into_iter()
            .map(|r| BulkEventRow {
                name: r.name,
                date: r.date,
                time: r.time,
            })
            .collect();
        (rows, self.unparsed_lines)
    }
}

/// An event created by a bulk upload.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedEventDto {
    /// Event identifier.
    pub event_id: uuid::Uuid,
    /// Event name.
    pub name: String,
    /// Scheduled start.
    pub starts_at: DateTime<Utc>,
}

impl From<Event> for CreatedEventDto {
    fn from(event: Event) -> Self {
        Self {
            event_id: *event.id.as_uuid(),
            name: event.name,
            starts_at: event.starts_at,
        }
    }
}

/// A rejected bulk row.
#[derive(Debug, Serialize, ToSchema)]
pub struct BulkRejectionDto {
    /// Original input.
    pub input: String,
    /// Why it was rejected.
    pub reason: String,
}

impl From<BulkRejection> for BulkRejectionDto {
    fn from(r: BulkRejection) -> Self {
        Self {
            input: r.input,
            reason: r.reason,
        }
    }
}

/// Response body for `POST /events/bulk`.
#[derive(Debug, Serialize, ToSchema)]
pub struct BulkUploadResponse {
    /// Number of events created.
    pub accepted: usize,
    /// Number of rows rejected.
    pub rejected: usize,
    /// Created events.
    pub events: Vec<CreatedEventDto>,
    /// Rejected rows with reasons.
    pub rejections: Vec<BulkRejectionDto>,
}

impl From<BulkUploadReport> for BulkUploadResponse {
    fn from(report: BulkUploadReport) -> Self {
        Self {
            accepted: report.accepted.len(),
            rejected: report.rejections.len(),
            events: report.accepted.into_iter().map(Into::into).collect(),
            rejections: report.rejections.into_iter().map(Into::into).collect(),
        }
    }
}
