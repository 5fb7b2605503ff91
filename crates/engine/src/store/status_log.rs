use dwp_common::StatusChangeEntry;

use super::{StoreClient, StoreError};

impl StoreClient {
    /// Inserts one liveness transition into `log_dwp_uptime`.
    /// Skipped (with a diagnostic) if the device id is absent from
    /// `ins_dwp_devices` -- the in-memory liveness state is still
    /// updated by the caller regardless.
    pub async fn log_status_change(&self, entry: &StatusChangeEntry) -> Result<(), StoreError> {
        let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM ins_dwp_devices WHERE id = $1")
            .bind(entry.device_id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        if exists.is_none() {
            tracing::warn!(device_id = %entry.device_id, "skipping status log for unknown device");
            return Ok(());
        }

        sqlx::query(
            r#"
            INSERT INTO log_dwp_uptime
                (ins_dwp_device_id, status, logged_at, message, duration_seconds, created_at, updated_at)
            VALUES ($1, $2, NOW(), $3, $4, NOW(), NOW())
            "#,
        )
        .bind(entry.device_id.0)
        .bind(entry.new_status.as_db_str())
        .bind(&entry.message)
        .bind(entry.duration_in_previous_state_seconds)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(())
    }
}
