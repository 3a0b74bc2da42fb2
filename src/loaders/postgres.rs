use crate::error::Result;
use crate::loaders::StagingStore;
use crate::models::{StgLocation, StgWeatherDaily};
use crate::utils::constants::DEFAULT_INSERT_CHUNK_SIZE;
use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::PgConnection;

/// Staging tables. Migrations own the DDL.
pub mod schema {
    diesel::table! {
        staging.stg_weather_daily (dt, location_id) {
            dt -> Date,
            location_id -> Text,
            date -> Nullable<Date>,
            temp_min_c -> Nullable<Double>,
            temp_max_c -> Nullable<Double>,
            temp_avg_c -> Nullable<Double>,
            precip_mm -> Nullable<Double>,
            humidity_avg -> Nullable<Double>,
            wind_max_kph -> Nullable<Double>,
            condition_code -> Nullable<Integer>,
            condition_text -> Nullable<Text>,
            ingested_at -> Nullable<Timestamptz>,
        }
    }

    diesel::table! {
        staging.stg_locations (location_id) {
            dt -> Date,
            location_id -> Text,
            name -> Nullable<Text>,
            region -> Nullable<Text>,
            country -> Nullable<Text>,
            lat -> Nullable<Double>,
            lon -> Nullable<Double>,
            tz_id -> Nullable<Text>,
            local_time -> Nullable<Timestamp>,
            ingested_at -> Nullable<Timestamptz>,
        }
    }
}

/// Postgres staging store over a single connection.
pub struct PgStagingStore {
    conn: PgConnection,
    chunk_size: usize,
}

impl PgStagingStore {
    pub fn connect(database_url: &str) -> Result<Self> {
        let conn = PgConnection::establish(database_url)?;
        Ok(Self {
            conn,
            chunk_size: DEFAULT_INSERT_CHUNK_SIZE,
        })
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

impl StagingStore for PgStagingStore {
    fn replace_daily_partition(&mut self, dt: NaiveDate, rows: &[StgWeatherDaily]) -> Result<usize> {
        use schema::stg_weather_daily::dsl as D;

        let chunk_size = self.chunk_size;
        let inserted = self.conn.transaction::<usize, diesel::result::Error, _>(|conn| {
            let deleted = diesel::delete(D::stg_weather_daily.filter(D::dt.eq(dt))).execute(conn)?;
            tracing::debug!(message = "staging daily rows deleted", dt = %dt, rows = deleted);

            let mut inserted = 0;
            for chunk in rows.chunks(chunk_size) {
                inserted += diesel::insert_into(D::stg_weather_daily)
                    .values(chunk)
                    .execute(conn)?;
            }
            Ok(inserted)
        })?;

        Ok(inserted)
    }

    fn replace_locations(&mut self, rows: &[StgLocation]) -> Result<usize> {
        use schema::stg_locations::dsl as L;

        let chunk_size = self.chunk_size;
        let inserted = self.conn.transaction::<usize, diesel::result::Error, _>(|conn| {
            diesel::delete(L::stg_locations).execute(conn)?;

            let mut inserted = 0;
            for chunk in rows.chunks(chunk_size) {
                inserted += diesel::insert_into(L::stg_locations)
                    .values(chunk)
                    .execute(conn)?;
            }
            Ok(inserted)
        })?;

        Ok(inserted)
    }
}
