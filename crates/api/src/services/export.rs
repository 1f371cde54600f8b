//! Export assembly: CSV rows from the raw log or the archive.
//!
//! The two ownership scopes produce structurally different rows. MY_ACTIVITY
//! reads raw activity records and is bounded by the 30-day retention window;
//! ALL flattens archive timelines and has no retention bound.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use domain::models::archive::ArchiveDay;
use persistence::repositories::{ActivityRepository, ArchiveRepository, ExportFilter};
use shared::validation::ACTIVITY_RETENTION_DAYS;

use crate::error::ApiError;

/// Export ownership scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExportOwnership {
    All,
    MyActivity,
}

/// Row shape of the produced file, reported back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportShape {
    /// Per-event rows from the raw log.
    Detail,
    /// Per-bucket rows flattened out of archive timelines.
    Aggregate,
}

impl ExportShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportShape::Detail => "detail",
            ExportShape::Aggregate => "aggregate",
        }
    }
}

/// Export request body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub ownership: ExportOwnership,
    pub device_type: Option<String>,
    pub activity_type: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// A produced export file.
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub shape: ExportShape,
    pub csv: String,
}

/// Service assembling export files.
#[derive(Clone)]
pub struct ExportService {
    pool: PgPool,
}

impl ExportService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn export(
        &self,
        workspace_id: Uuid,
        caller_id: Uuid,
        request: ExportRequest,
    ) -> Result<ExportFile, ApiError> {
        let now = Utc::now();
        let end_date = request.end_date.unwrap_or_else(|| now.date_naive());
        let start_date = request
            .start_date
            .unwrap_or_else(|| end_date - Duration::days(ACTIVITY_RETENTION_DAYS));

        if start_date > end_date {
            return Err(ApiError::Validation(
                "startDate must not be after endDate".to_string(),
            ));
        }

        match request.ownership {
            ExportOwnership::MyActivity => {
                self.export_my_activity(workspace_id, caller_id, request, start_date, end_date, now)
                    .await
            }
            ExportOwnership::All => {
                self.export_all(workspace_id, request, start_date, end_date)
                    .await
            }
        }
    }

    /// MY_ACTIVITY: per-event rows from the raw log, silently clamped to the
    /// retention floor regardless of the requested start.
    async fn export_my_activity(
        &self,
        workspace_id: Uuid,
        caller_id: Uuid,
        request: ExportRequest,
        start_date: NaiveDate,
        end_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<ExportFile, ApiError> {
        let retention_floor = now - Duration::days(ACTIVITY_RETENTION_DAYS);
        let requested_start = start_date
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always valid")
            .and_utc();
        let start = requested_start.max(retention_floor);
        let end = (end_date + Duration::days(1))
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always valid")
            .and_utc();

        let filter = ExportFilter {
            user_id: Some(caller_id),
            device_type: request.device_type,
            activity_type: request.activity_type,
        };
        let activities = ActivityRepository::new(self.pool.clone());
        let rows = activities
            .export_rows(workspace_id, &filter, start, end)
            .await?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(["timestamp", "type", "deviceType", "title", "points"])
            .map_err(csv_error)?;
        for row in rows {
            writer
                .write_record([
                    row.created_at.to_rfc3339(),
                    row.activity_type.clone(),
                    row.device_type.clone().unwrap_or_default(),
                    row.title.clone(),
                    row.points.to_string(),
                ])
                .map_err(csv_error)?;
        }

        Ok(ExportFile {
            shape: ExportShape::Detail,
            csv: finish_csv(writer)?,
        })
    }

    /// ALL: per-bucket rows flattened out of archive day documents across the
    /// full requested range.
    async fn export_all(
        &self,
        workspace_id: Uuid,
        request: ExportRequest,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<ExportFile, ApiError> {
        let archives = ArchiveRepository::new(self.pool.clone());
        let entities = archives
            .find_range(workspace_id, start_date, end_date)
            .await?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record([
                "date",
                "hour",
                "type",
                "deviceType",
                "count",
                "points",
                "uniqueUsers",
            ])
            .map_err(csv_error)?;

        for entity in entities {
            let doc: ArchiveDay = entity.into();
            for bucket in doc.timeline {
                if let Some(ref wanted) = request.activity_type {
                    if bucket.activity_type.as_str() != wanted {
                        continue;
                    }
                }
                if let Some(ref wanted) = request.device_type {
                    let bucket_type = bucket.device_type.map(|t| t.as_str()).unwrap_or("");
                    if bucket_type != wanted {
                        continue;
                    }
                }
                writer
                    .write_record([
                        doc.day.to_string(),
                        bucket.hour.to_string(),
                        bucket.activity_type.as_str().to_string(),
                        bucket
                            .device_type
                            .map(|t| t.as_str().to_string())
                            .unwrap_or_default(),
                        bucket.count.to_string(),
                        bucket.points.to_string(),
                        bucket.user_ids.len().to_string(),
                    ])
                    .map_err(csv_error)?;
            }
        }

        Ok(ExportFile {
            shape: ExportShape::Aggregate,
            csv: finish_csv(writer)?,
        })
    }
}

fn finish_csv(writer: csv::Writer<Vec<u8>>) -> Result<String, ApiError> {
    let bytes = writer
        .into_inner()
        .map_err(|e| ApiError::Internal(format!("CSV assembly failed: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| ApiError::Internal(format!("CSV assembly failed: {}", e)))
}

fn csv_error(err: csv::Error) -> ApiError {
    ApiError::Internal(format!("CSV assembly failed: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ownership_parses_wire_names() {
        let all: ExportOwnership = serde_json::from_str(r#""ALL""#).unwrap();
        assert_eq!(all, ExportOwnership::All);
        let mine: ExportOwnership = serde_json::from_str(r#""MY_ACTIVITY""#).unwrap();
        assert_eq!(mine, ExportOwnership::MyActivity);
        assert!(serde_json::from_str::<ExportOwnership>(r#""EVERYTHING""#).is_err());
    }

    #[test]
    fn test_shape_labels() {
        assert_eq!(ExportShape::Detail.as_str(), "detail");
        assert_eq!(ExportShape::Aggregate.as_str(), "aggregate");
    }

    #[test]
    fn test_export_request_parses() {
        let req: ExportRequest = serde_json::from_str(
            r#"{"ownership":"MY_ACTIVITY","deviceType":"BIN","startDate":"2024-05-01"}"#,
        )
        .unwrap();
        assert_eq!(req.ownership, ExportOwnership::MyActivity);
        assert_eq!(req.device_type.as_deref(), Some("BIN"));
        assert_eq!(req.start_date, NaiveDate::from_ymd_opt(2024, 5, 1));
        assert!(req.end_date.is_none());
    }
}
