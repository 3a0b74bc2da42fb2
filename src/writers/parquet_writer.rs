use crate::error::{ProcessingError, Result};
use crate::models::{DailyObservationRow, LocationRow};
use crate::utils::constants::{
    COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_SNAPPY, COMPRESSION_ZSTD,
    DEFAULT_ROW_GROUP_SIZE, UTC_OFFSET_TZ,
};
use arrow::array::*;
use arrow::compute::concat_batches;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use arrow::util::display::array_value_to_string;
use bytes::Bytes;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use parquet::file::reader::{FileReader, SerializedFileReader};
use std::fmt::Write as _;
use std::sync::Arc;

/// `NaiveDate::num_days_from_ce` of 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Encodes silver row collections as in-memory Parquet and reads them back.
#[derive(Debug, Clone)]
pub struct ParquetWriter {
    compression: Compression,
    row_group_size: usize,
}

impl ParquetWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            COMPRESSION_SNAPPY => Compression::SNAPPY,
            COMPRESSION_GZIP => Compression::GZIP(GzipLevel::default()),
            COMPRESSION_LZ4 => Compression::LZ4,
            COMPRESSION_ZSTD => Compression::ZSTD(ZstdLevel::default()),
            COMPRESSION_NONE => Compression::UNCOMPRESSED,
            _ => {
                return Err(ProcessingError::Config(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size.max(1);
        self
    }

    /// Arrow schema of `silver/weather_daily`
    pub fn daily_schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("dt", DataType::Date32, false),
            Field::new("location_id", DataType::Utf8, true),
            Field::new("date", DataType::Date32, true),
            Field::new("temp_min_c", DataType::Float64, true),
            Field::new("temp_max_c", DataType::Float64, true),
            Field::new("temp_avg_c", DataType::Float64, true),
            Field::new("precip_mm", DataType::Float64, true),
            Field::new("snow_cm", DataType::Float64, true),
            Field::new("humidity_avg", DataType::Float64, true),
            Field::new("wind_max_kph", DataType::Float64, true),
            Field::new("condition_code", DataType::Int64, true),
            Field::new("condition_text", DataType::Utf8, true),
            Field::new("ingested_at", utc_timestamp_type(), true),
        ]))
    }

    /// Arrow schema of `silver/locations`
    pub fn locations_schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("dt", DataType::Date32, false),
            Field::new("location_id", DataType::Utf8, true),
            Field::new("name", DataType::Utf8, true),
            Field::new("region", DataType::Utf8, true),
            Field::new("country", DataType::Utf8, true),
            Field::new("lat", DataType::Float64, true),
            Field::new("lon", DataType::Float64, true),
            Field::new("tz_id", DataType::Utf8, true),
            Field::new(
                "local_time",
                DataType::Timestamp(TimeUnit::Microsecond, None),
                true,
            ),
            Field::new("ingested_at", utc_timestamp_type(), true),
        ]))
    }

    pub fn daily_rows_to_batch(rows: &[DailyObservationRow]) -> Result<RecordBatch> {
        let dts: Vec<i32> = rows.iter().map(|r| days_since_epoch(r.dt)).collect();
        let location_ids: Vec<Option<String>> = rows.iter().map(|r| r.location_id.clone()).collect();
        let dates: Vec<Option<i32>> = rows.iter().map(|r| r.date.map(days_since_epoch)).collect();
        let float_column = |f: fn(&DailyObservationRow) -> Option<f64>| -> ArrayRef {
            Arc::new(Float64Array::from(rows.iter().map(f).collect::<Vec<_>>()))
        };
        let codes: Vec<Option<i64>> = rows.iter().map(|r| r.condition_code).collect();
        let texts: Vec<Option<String>> = rows.iter().map(|r| r.condition_text.clone()).collect();
        let ingested: Vec<Option<i64>> = rows.iter().map(|r| r.ingested_at.map(utc_micros)).collect();

        let batch = RecordBatch::try_new(
            Self::daily_schema(),
            vec![
                Arc::new(Date32Array::from(dts)),
                Arc::new(StringArray::from(location_ids)),
                Arc::new(Date32Array::from(dates)),
                float_column(|r| r.temp_min_c),
                float_column(|r| r.temp_max_c),
                float_column(|r| r.temp_avg_c),
                float_column(|r| r.precip_mm),
                float_column(|r| r.snow_cm),
                float_column(|r| r.humidity_avg),
                float_column(|r| r.wind_max_kph),
                Arc::new(Int64Array::from(codes)),
                Arc::new(StringArray::from(texts)),
                Arc::new(TimestampMicrosecondArray::from(ingested).with_timezone(UTC_OFFSET_TZ)),
            ],
        )?;

        Ok(batch)
    }

    pub fn location_rows_to_batch(rows: &[LocationRow]) -> Result<RecordBatch> {
        let dts: Vec<i32> = rows.iter().map(|r| days_since_epoch(r.dt)).collect();
        let text_column = |f: fn(&LocationRow) -> Option<String>| -> ArrayRef {
            Arc::new(StringArray::from(rows.iter().map(f).collect::<Vec<_>>()))
        };
        let lats: Vec<Option<f64>> = rows.iter().map(|r| r.lat).collect();
        let lons: Vec<Option<f64>> = rows.iter().map(|r| r.lon).collect();
        let local_times: Vec<Option<i64>> =
            rows.iter().map(|r| r.local_time.map(naive_micros)).collect();
        let ingested: Vec<Option<i64>> = rows.iter().map(|r| r.ingested_at.map(utc_micros)).collect();

        let batch = RecordBatch::try_new(
            Self::locations_schema(),
            vec![
                Arc::new(Date32Array::from(dts)),
                text_column(|r| r.location_id.clone()),
                text_column(|r| r.name.clone()),
                text_column(|r| r.region.clone()),
                text_column(|r| r.country.clone()),
                Arc::new(Float64Array::from(lats)),
                Arc::new(Float64Array::from(lons)),
                text_column(|r| r.tz_id.clone()),
                Arc::new(TimestampMicrosecondArray::from(local_times)),
                Arc::new(TimestampMicrosecondArray::from(ingested).with_timezone(UTC_OFFSET_TZ)),
            ],
        )?;

        Ok(batch)
    }

    pub fn write_daily_rows(&self, rows: &[DailyObservationRow]) -> Result<Bytes> {
        self.write_batch(&Self::daily_rows_to_batch(rows)?)
    }

    pub fn write_location_rows(&self, rows: &[LocationRow]) -> Result<Bytes> {
        self.write_batch(&Self::location_rows_to_batch(rows)?)
    }

    /// Encode a batch as a complete Parquet file
    pub fn write_batch(&self, batch: &RecordBatch) -> Result<Bytes> {
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut buffer = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buffer, batch.schema(), Some(props))?;
        writer.write(batch)?;
        writer.close()?;

        Ok(Bytes::from(buffer))
    }

    /// Decode a whole Parquet file into a single batch
    pub fn read_batch(&self, bytes: Bytes) -> Result<RecordBatch> {
        let builder = ParquetRecordBatchReaderBuilder::try_new(bytes)?;
        let schema = builder.schema().clone();
        let reader = builder.build()?;

        let batches = reader.collect::<std::result::Result<Vec<_>, ArrowError>>()?;
        Ok(concat_batches(&schema, &batches)?)
    }

    /// First `limit` rows rendered as strings
    pub fn read_sample(&self, bytes: Bytes, limit: usize) -> Result<TableSample> {
        let batch = self.read_batch(bytes)?;
        let columns = batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();

        let mut rows = Vec::new();
        for row in 0..batch.num_rows().min(limit) {
            let mut values = Vec::with_capacity(batch.num_columns());
            for column in batch.columns() {
                if column.is_null(row) {
                    values.push("null".to_string());
                } else {
                    values.push(array_value_to_string(column, row)?);
                }
            }
            rows.push(values);
        }

        Ok(TableSample {
            columns,
            rows,
            total_rows: batch.num_rows(),
        })
    }

    /// Footer metadata of an encoded silver file: row layout and per-column null counts
    pub fn get_file_info(&self, bytes: Bytes) -> Result<ParquetFileInfo> {
        let file_size = bytes.len() as u64;
        let reader = SerializedFileReader::new(bytes)?;
        let metadata = reader.metadata();

        let row_group_sizes: Vec<i64> = metadata.row_groups().iter().map(|rg| rg.num_rows()).collect();
        let compression = metadata
            .row_groups()
            .first()
            .and_then(|rg| rg.columns().first())
            .map(|c| c.compression())
            .unwrap_or(self.compression);

        let columns = metadata
            .file_metadata()
            .schema_descr()
            .columns()
            .iter()
            .enumerate()
            .map(|(idx, descr)| {
                // Unknown as soon as one row group lacks statistics for the column
                let null_count = metadata.row_groups().iter().try_fold(0u64, |acc, rg| {
                    rg.column(idx)
                        .statistics()
                        .and_then(|stats| stats.null_count_opt())
                        .map(|n| acc + n)
                });
                ColumnInfo {
                    name: descr.name().to_string(),
                    null_count,
                }
            })
            .collect();

        Ok(ParquetFileInfo {
            total_rows: metadata.file_metadata().num_rows(),
            row_group_sizes,
            file_size,
            compression,
            columns,
        })
    }
}

impl Default for ParquetWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn utc_timestamp_type() -> DataType {
    DataType::Timestamp(TimeUnit::Microsecond, Some(UTC_OFFSET_TZ.into()))
}

fn days_since_epoch(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

fn utc_micros(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_micros()
}

fn naive_micros(ts: NaiveDateTime) -> i64 {
    ts.and_utc().timestamp_micros()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    pub null_count: Option<u64>,
}

#[derive(Debug)]
pub struct ParquetFileInfo {
    pub total_rows: i64,
    pub row_group_sizes: Vec<i64>,
    pub file_size: u64,
    pub compression: Compression,
    pub columns: Vec<ColumnInfo>,
}

impl ParquetFileInfo {
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn summary(&self) -> String {
        let mut out = format!(
            "{} rows in {} row group(s) {:?}, {:.1} KiB, {:?}\n",
            self.total_rows,
            self.row_group_sizes.len(),
            self.row_group_sizes,
            self.file_size as f64 / 1024.0,
            self.compression,
        );
        for column in &self.columns {
            let nulls = column
                .null_count
                .map(|n| n.to_string())
                .unwrap_or_else(|| "?".to_string());
            let _ = writeln!(out, "  {:<16} nulls={}", column.name, nulls);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableSample {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub total_rows: usize,
}

impl TableSample {
    /// One `column=value` line per row
    pub fn render(&self) -> String {
        let mut out = format!("Sample ({} of {} rows):\n", self.rows.len(), self.total_rows);
        for (i, row) in self.rows.iter().enumerate() {
            let fields: Vec<String> = self
                .columns
                .iter()
                .zip(row)
                .map(|(c, v)| format!("{}={}", c, v))
                .collect();
            let _ = writeln!(out, "  {:>3}. {}", i + 1, fields.join(" "));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::AsArray;
    use arrow::datatypes::Float64Type;
    use chrono::TimeZone;

    fn dt() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    fn daily_row(id: &str, avg: f64) -> DailyObservationRow {
        DailyObservationRow::builder(dt())
            .location_id(id)
            .date(dt())
            .temperatures(avg - 3.0, avg, avg + 3.0)
            .humidity_avg(80.0)
            .condition(1003, "Partly cloudy")
            .ingested_at(Utc.with_ymd_and_hms(2025, 1, 2, 6, 0, 0).unwrap())
            .build()
    }

    #[test]
    fn test_daily_rows_survive_parquet() -> Result<()> {
        let writer = ParquetWriter::new();
        let mut sparse = daily_row("paris", 2.0);
        sparse.temp_avg_c = None;

        let bytes = writer.write_daily_rows(&[daily_row("london", 5.0), sparse])?;
        let batch = writer.read_batch(bytes)?;

        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.schema().fields(), ParquetWriter::daily_schema().fields());

        let avg = batch
            .column_by_name("temp_avg_c")
            .unwrap()
            .as_primitive::<Float64Type>();
        assert_eq!(avg.value(0), 5.0);
        assert!(avg.is_null(1));

        let dates = batch.column_by_name("date").unwrap().as_primitive::<arrow::datatypes::Date32Type>();
        assert_eq!(dates.value_as_date(0), Some(dt()));

        Ok(())
    }

    #[test]
    fn test_location_rows_keep_naive_local_time() -> Result<()> {
        let writer = ParquetWriter::new();
        let mut row = LocationRow::empty(dt(), Some("london".to_string()));
        row.local_time = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(13, 45, 0);

        let batch = writer.read_batch(writer.write_location_rows(&[row])?)?;
        let local = batch
            .column_by_name("local_time")
            .unwrap()
            .as_primitive::<arrow::datatypes::TimestampMicrosecondType>();

        assert_eq!(
            local.value_as_datetime(0).map(|t| t.to_string()).as_deref(),
            Some("2025-01-01 13:45:00")
        );
        assert_eq!(
            batch.schema().field_with_name("local_time")?.data_type(),
            &DataType::Timestamp(TimeUnit::Microsecond, None)
        );
        Ok(())
    }

    #[test]
    fn test_different_compressions() -> Result<()> {
        let compressions = ["snappy", "gzip", "lz4", "zstd", "none"];

        for compression in &compressions {
            let writer = ParquetWriter::new().with_compression(compression)?;
            let result = writer.write_daily_rows(&[daily_row("london", 5.0)]);
            assert!(result.is_ok(), "Failed with compression: {}", compression);
        }

        assert!(ParquetWriter::new().with_compression("brotli-ish").is_err());
        Ok(())
    }

    #[test]
    fn test_file_info_and_sample() -> Result<()> {
        let writer = ParquetWriter::new().with_row_group_size(2);
        let rows: Vec<_> = ["a", "b", "c"].iter().map(|id| daily_row(id, 1.0)).collect();
        let bytes = writer.write_daily_rows(&rows)?;

        let info = writer.get_file_info(bytes.clone())?;
        assert_eq!(info.total_rows, 3);
        assert_eq!(info.row_group_sizes, vec![2, 1]);
        assert_eq!(info.column("temp_avg_c").and_then(|c| c.null_count), Some(0));
        assert_eq!(info.column("precip_mm").and_then(|c| c.null_count), Some(3));
        assert!(info.summary().starts_with("3 rows in 2 row group(s)"));

        let sample = writer.read_sample(bytes, 2)?;
        assert_eq!(sample.total_rows, 3);
        assert_eq!(sample.rows.len(), 2);
        assert!(sample.render().contains("location_id=a"));
        Ok(())
    }

    #[test]
    fn test_empty_rows_write_valid_file() -> Result<()> {
        let writer = ParquetWriter::new();
        let batch = writer.read_batch(writer.write_daily_rows(&[])?)?;
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(batch.num_columns(), 13);
        Ok(())
    }
}
