//! `SQLite` implementation of [`DeviceStateStore`].

use std::future::Future;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use fluxhub_app::ports::DeviceStateStore;
use fluxhub_domain::device::{DeviceState, DeviceStatus};
use fluxhub_domain::error::FluxHubError;
use fluxhub_domain::id::DeviceId;

use crate::error::StorageError;

/// Wrapper for converting database rows into domain [`DeviceState`].
struct Wrapper(DeviceState);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        let started_at: Option<String> = row.try_get("started_at")?;
        let flux_capacitance: i32 = row.try_get("flux_capacitance")?;
        let gravitational_integrity: f64 = row.try_get("gravitational_integrity")?;

        let status =
            DeviceStatus::from_str(&status).map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        let started_at = started_at
            .map(|raw| DateTime::parse_from_rfc3339(&raw).map(|at| at.with_timezone(&Utc)))
            .transpose()
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))?;

        let state = DeviceState {
            status,
            started_at,
            flux_capacitance,
            gravitational_integrity,
        };
        state
            .validate()
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))?;

        Ok(Self(state))
    }
}

const UPSERT: &str = "INSERT INTO device_states (id, status, started_at, flux_capacitance, gravitational_integrity) \
     VALUES (?, ?, ?, ?, ?) \
     ON CONFLICT(id) DO UPDATE SET \
     status = excluded.status, \
     started_at = excluded.started_at, \
     flux_capacitance = excluded.flux_capacitance, \
     gravitational_integrity = excluded.gravitational_integrity";
const SELECT_BY_ID: &str = "SELECT * FROM device_states WHERE id = ?";
const DELETE_BY_ID: &str = "DELETE FROM device_states WHERE id = ?";

/// `SQLite`-backed device state store.
pub struct SqliteDeviceStateStore {
    pool: SqlitePool,
}

impl SqliteDeviceStateStore {
    /// Create a new store using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl DeviceStateStore for SqliteDeviceStateStore {
    fn save(
        &self,
        id: &DeviceId,
        state: &DeviceState,
    ) -> impl Future<Output = Result<(), FluxHubError>> + Send {
        let pool = self.pool.clone();
        let id = id.to_string();
        let state = *state;
        async move {
            sqlx::query(UPSERT)
                .bind(id)
                .bind(state.status.to_string())
                .bind(state.started_at.map(|at| at.to_rfc3339()))
                .bind(state.flux_capacitance)
                .bind(state.gravitational_integrity)
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(())
        }
    }

    fn load(
        &self,
        id: &DeviceId,
    ) -> impl Future<Output = Result<Option<DeviceState>, FluxHubError>> + Send {
        let pool = self.pool.clone();
        let id = id.to_string();
        async move {
            let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
                .bind(id)
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(row.map(|w| w.0))
        }
    }

    fn delete(&self, id: &DeviceId) -> impl Future<Output = Result<(), FluxHubError>> + Send {
        let pool = self.pool.clone();
        let id = id.to_string();
        async move {
            sqlx::query(DELETE_BY_ID)
                .bind(id)
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(())
        }
    }
}
