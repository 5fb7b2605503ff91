use dwp_common::CycleRecord;

use super::{StoreClient, StoreError};

impl StoreClient {
    /// Persists one accepted cycle to `ins_dwp_counts`. The running
    /// per-line `count` is derived from the most recent row for that
    /// line rather than tracked in memory, so it survives restarts.
    pub async fn save_cycle(&self, cycle: &CycleRecord) -> Result<(), StoreError> {
        let latest: Option<(i32,)> = sqlx::query_as(
            r#"
            SELECT count FROM ins_dwp_counts
            WHERE line = $1
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(&cycle.line)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        let next_count = latest.map(|(c,)| c + 1).unwrap_or(1);

        sqlx::query(
            r#"
            INSERT INTO ins_dwp_counts
                (line, mechine, count, incremental, position, pv, duration, std_error)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&cycle.line)
        .bind(cycle.machine_id as i64)
        .bind(next_count)
        .bind(1i32)
        .bind(cycle.position.to_string())
        .bind(cycle.pv_json())
        .bind(cycle.duration_s)
        .bind(cycle.sensor_validity.as_json())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(())
    }
}
