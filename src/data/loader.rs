use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{
    Array, AsArray, Float32Array, Float64Array, Int32Array, Int64Array, LargeListArray,
    LargeStringArray, ListArray, StringArray, TimestampMicrosecondArray,
    TimestampMillisecondArray, TimestampNanosecondArray, TimestampSecondArray,
};
use arrow::datatypes::{DataType, TimeUnit};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use log::info;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use super::codec;
use super::model::{RawReading, SensorId};

/// Extensions `load_inputs` picks up when scanning a directory.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["csv", "json", "parquet", "pq"];

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load readings from a single file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – columns `Date, Sensor, Sensor_pack, Base, Temperature,
///   Humidity, Spectrum`, spectrum as `"[1.0;2.0;...]"`
/// * `.json`    – `[{ "Date": ..., "Sensor": ..., "Spectrum": ... }, ...]`,
///   spectrum either as text or as a number array
/// * `.parquet` – same columns; spectrum as Utf8 or List<Float>
pub fn load_file(path: &Path) -> Result<Vec<RawReading>> {
    let ext = extension_of(path);
    let readings = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    info!("Read {} readings from {}", readings.len(), path.display());
    Ok(readings)
}

/// Load every input path; directories contribute their supported files
/// (non-recursive, sorted by name).
pub fn load_inputs(paths: &[PathBuf]) -> Result<Vec<RawReading>> {
    let files = discover_files(paths)?;
    if files.is_empty() {
        bail!("No .csv, .json or .parquet files found in the given inputs");
    }

    let mut readings = Vec::new();
    for file in &files {
        readings.extend(load_file(file)?);
    }
    Ok(readings)
}

fn discover_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(path)
                .with_context(|| format!("listing {}", path.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && SUPPORTED_EXTENSIONS.contains(&extension_of(p).as_str()))
                .collect();
            found.sort();
            files.extend(found);
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            bail!("Input {} does not exist", path.display());
        }
    }
    Ok(files)
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Parse a source timestamp into UTC.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS[.f]` with an optional `±HH:MM`
/// offset, naive forms (taken as UTC), and plain epoch seconds.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Ok(dt.with_timezone(&Utc));
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(secs) = s.parse::<f64>() {
        return epoch_seconds_to_utc(secs);
    }
    bail!("'{s}' is not a recognised timestamp")
}

fn epoch_seconds_to_utc(secs: f64) -> Result<DateTime<Utc>> {
    if !secs.is_finite() {
        bail!("epoch value {secs} is not finite");
    }
    let micros = (secs * 1e6).round() as i64;
    Utc.timestamp_micros(micros)
        .single()
        .with_context(|| format!("epoch value {secs} is out of range"))
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Sensor")]
    sensor: String,
    #[serde(rename = "Sensor_pack")]
    sensor_pack: f64,
    #[serde(rename = "Base")]
    base: f64,
    #[serde(rename = "Temperature")]
    temperature: f64,
    #[serde(rename = "Humidity")]
    humidity: f64,
    #[serde(rename = "Spectrum")]
    spectrum: String,
}

fn load_csv(path: &Path) -> Result<Vec<RawReading>> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let mut readings = Vec::new();

    for (row_no, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("CSV row {row_no}"))?;
        let timestamp =
            parse_timestamp(&row.date).with_context(|| format!("CSV row {row_no}: Date"))?;
        let spectrum =
            codec::decode(&row.spectrum).with_context(|| format!("CSV row {row_no}: Spectrum"))?;

        readings.push(RawReading {
            timestamp,
            sensor: SensorId::new(row.sensor),
            sensor_pack: row.sensor_pack,
            base: row.base,
            temperature: row.temperature,
            humidity: row.humidity,
            spectrum,
        });
    }

    Ok(readings)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, e.g. `df.to_json(orient='records')`:
///
/// ```json
/// [
///   { "Date": "2024-12-25 10:00:00+00:00", "Sensor": 20,
///     "Sensor_pack": 1, "Base": 3, "Temperature": 21.5, "Humidity": 60,
///     "Spectrum": "[0.1;0.2;0.3]" },
///   ...
/// ]
/// ```
#[derive(Debug, Deserialize)]
struct JsonRow {
    #[serde(alias = "Date", alias = "timestamp")]
    date: JsonValue,
    #[serde(alias = "Sensor")]
    sensor: JsonValue,
    #[serde(alias = "Sensor_pack")]
    sensor_pack: f64,
    #[serde(alias = "Base")]
    base: f64,
    #[serde(alias = "Temperature")]
    temperature: f64,
    #[serde(alias = "Humidity")]
    humidity: f64,
    #[serde(alias = "Spectrum")]
    spectrum: SpectrumField,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SpectrumField {
    Text(String),
    Values(Vec<f64>),
}

fn load_json(path: &Path) -> Result<Vec<RawReading>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let rows: Vec<JsonRow> = serde_json::from_str(&text).context("parsing JSON records")?;

    rows.into_iter()
        .enumerate()
        .map(|(i, row)| {
            let timestamp = match &row.date {
                JsonValue::String(s) => parse_timestamp(s),
                JsonValue::Number(n) => n
                    .as_f64()
                    .context("epoch is not representable")
                    .and_then(epoch_seconds_to_utc),
                other => bail!("unexpected Date value {other}"),
            }
            .with_context(|| format!("Row {i}: Date"))?;

            let sensor = match &row.sensor {
                JsonValue::String(s) => SensorId::new(s.as_str()),
                JsonValue::Number(n) => SensorId::new(n.to_string()),
                other => bail!("Row {i}: unexpected Sensor value {other}"),
            };

            let spectrum = match row.spectrum {
                SpectrumField::Text(s) => {
                    codec::decode(&s).with_context(|| format!("Row {i}: Spectrum"))?
                }
                SpectrumField::Values(v) => v,
            };

            Ok(RawReading {
                timestamp,
                sensor,
                sensor_pack: row.sensor_pack,
                base: row.base,
                temperature: row.temperature,
                humidity: row.humidity,
                spectrum,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Column names looked up in Parquet files (first match wins).
const DATE_COLUMNS: &[&str] = &["Date", "timestamp"];
const SENSOR_COLUMNS: &[&str] = &["Sensor", "sensor"];

/// Load a Parquet file of readings.
///
/// Expected schema:
/// - `Date`: Utf8 timestamp text, Int64 epoch seconds, or Timestamp
/// - `Sensor`: Utf8 or integer
/// - `Sensor_pack`, `Base`, `Temperature`, `Humidity`: any numeric type
/// - `Spectrum`: Utf8 `"[..;..]"` or List/LargeList of Float64/Float32
fn load_parquet(path: &Path) -> Result<Vec<RawReading>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut readings = Vec::new();
    let mut row_offset = 0usize;

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        let find = |names: &[&str]| -> Result<usize> {
            names
                .iter()
                .find_map(|n| schema.index_of(n).ok())
                .with_context(|| format!("Parquet file missing '{}' column", names[0]))
        };

        let date_col = batch.column(find(DATE_COLUMNS)?);
        let sensor_col = batch.column(find(SENSOR_COLUMNS)?);
        let pack_col = batch.column(find(&["Sensor_pack", "sensor_pack"])?);
        let base_col = batch.column(find(&["Base", "base"])?);
        let temp_col = batch.column(find(&["Temperature", "temperature"])?);
        let hum_col = batch.column(find(&["Humidity", "humidity"])?);
        let spec_col = batch.column(find(&["Spectrum", "spectrum"])?);

        for row in 0..batch.num_rows() {
            let ctx = || format!("Row {}", row_offset + row);
            readings.push(RawReading {
                timestamp: extract_timestamp(date_col, row).with_context(ctx)?,
                sensor: extract_sensor(sensor_col, row).with_context(ctx)?,
                sensor_pack: extract_f64(pack_col, row).with_context(ctx)?,
                base: extract_f64(base_col, row).with_context(ctx)?,
                temperature: extract_f64(temp_col, row).with_context(ctx)?,
                humidity: extract_f64(hum_col, row).with_context(ctx)?,
                spectrum: extract_spectrum(spec_col, row).with_context(ctx)?,
            });
        }
        row_offset += batch.num_rows();
    }

    Ok(readings)
}

// -- Parquet / Arrow helpers --

fn extract_str(col: &Arc<dyn Array>, row: usize) -> Option<&str> {
    match col.data_type() {
        DataType::Utf8 => col.as_any().downcast_ref::<StringArray>().map(|a| a.value(row)),
        DataType::LargeUtf8 => col
            .as_any()
            .downcast_ref::<LargeStringArray>()
            .map(|a| a.value(row)),
        _ => None,
    }
}

fn extract_timestamp(col: &Arc<dyn Array>, row: usize) -> Result<DateTime<Utc>> {
    if col.is_null(row) {
        bail!("null Date");
    }
    if let Some(s) = extract_str(col, row) {
        return parse_timestamp(s);
    }
    let any = col.as_any();
    let micros = match col.data_type() {
        DataType::Int64 => {
            let arr = any.downcast_ref::<Int64Array>().context("expected Int64Array")?;
            return epoch_seconds_to_utc(arr.value(row) as f64);
        }
        DataType::Timestamp(TimeUnit::Second, _) => any
            .downcast_ref::<TimestampSecondArray>()
            .map(|a| a.value(row) * 1_000_000),
        DataType::Timestamp(TimeUnit::Millisecond, _) => any
            .downcast_ref::<TimestampMillisecondArray>()
            .map(|a| a.value(row) * 1_000),
        DataType::Timestamp(TimeUnit::Microsecond, _) => any
            .downcast_ref::<TimestampMicrosecondArray>()
            .map(|a| a.value(row)),
        DataType::Timestamp(TimeUnit::Nanosecond, _) => any
            .downcast_ref::<TimestampNanosecondArray>()
            .map(|a| a.value(row) / 1_000),
        other => bail!("Date column has unsupported type {other:?}"),
    }
    .context("timestamp column downcast failed")?;

    Utc.timestamp_micros(micros)
        .single()
        .with_context(|| format!("timestamp {micros}µs out of range"))
}

fn extract_sensor(col: &Arc<dyn Array>, row: usize) -> Result<SensorId> {
    if col.is_null(row) {
        bail!("null Sensor");
    }
    if let Some(s) = extract_str(col, row) {
        return Ok(SensorId::new(s));
    }
    match col.data_type() {
        DataType::Int32 => {
            let arr = col.as_any().downcast_ref::<Int32Array>().context("expected Int32Array")?;
            Ok(SensorId::from(arr.value(row) as i64))
        }
        DataType::Int64 => {
            let arr = col.as_any().downcast_ref::<Int64Array>().context("expected Int64Array")?;
            Ok(SensorId::from(arr.value(row)))
        }
        other => bail!("Sensor column has unsupported type {other:?}"),
    }
}

fn extract_f64(col: &Arc<dyn Array>, row: usize) -> Result<f64> {
    if col.is_null(row) {
        bail!("null value in numeric column");
    }
    let any = col.as_any();
    let value = match col.data_type() {
        DataType::Float64 => any.downcast_ref::<Float64Array>().map(|a| a.value(row)),
        DataType::Float32 => any.downcast_ref::<Float32Array>().map(|a| a.value(row) as f64),
        DataType::Int64 => any.downcast_ref::<Int64Array>().map(|a| a.value(row) as f64),
        DataType::Int32 => any.downcast_ref::<Int32Array>().map(|a| a.value(row) as f64),
        other => bail!("expected a numeric column, got {other:?}"),
    };
    value.context("numeric column downcast failed")
}

/// Spectrum stored either as source text or as a float list.
fn extract_spectrum(col: &Arc<dyn Array>, row: usize) -> Result<Vec<f64>> {
    if col.is_null(row) {
        bail!("null Spectrum");
    }
    if let Some(s) = extract_str(col, row) {
        return Ok(codec::decode(s)?);
    }

    let values_array = match col.data_type() {
        DataType::List(_) => col
            .as_any()
            .downcast_ref::<ListArray>()
            .context("expected ListArray")?
            .value(row),
        DataType::LargeList(_) => col
            .as_any()
            .downcast_ref::<LargeListArray>()
            .context("expected LargeListArray")?
            .value(row),
        other => bail!("Expected Utf8, List or LargeList Spectrum column, got {other:?}"),
    };

    // Null list entries would become the tensor's missing marker; refuse them.
    if values_array.null_count() > 0 {
        bail!("Spectrum list contains nulls");
    }
    let values: Vec<f64> =
        if let Some(f64_arr) = values_array.as_primitive_opt::<arrow::datatypes::Float64Type>() {
            f64_arr.values().to_vec()
        } else if let Some(f32_arr) =
            values_array.as_primitive_opt::<arrow::datatypes::Float32Type>()
        {
            f32_arr.values().iter().map(|v| *v as f64).collect()
        } else {
            bail!(
                "List inner type is {:?}, expected Float64 or Float32",
                values_array.data_type()
            )
        };
    if let Some(ch) = values.iter().position(|v| !v.is_finite()) {
        bail!("Spectrum channel {ch} is {}", values[ch]);
    }
    Ok(values)
}
