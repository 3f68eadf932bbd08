use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};
use parquet::arrow::ArrowWriter;

use hive_spectra::data::codec;

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// Hive hum: a few harmonic peaks whose strength follows the time of day.
fn generate_spectrum(
    channels: usize,
    peaks: &[(f64, f64, f64)],
    activity: f64,
    noise_level: f64,
    rng: &mut SimpleRng,
) -> Vec<f64> {
    (0..channels)
        .map(|ch| {
            let x = ch as f64;
            let signal: f64 = peaks
                .iter()
                .map(|&(mu, sigma, amp)| gaussian(x, mu, sigma, amp * activity))
                .sum();
            (signal + rng.gauss(0.0, noise_level)).max(0.0) + 1e-3
        })
        .collect()
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Daytime foraging raises the hum; peaks around 14:00 UTC.
fn diurnal_activity(ts: DateTime<Utc>) -> f64 {
    let hour = ts.hour() as f64 + ts.minute() as f64 / 60.0;
    0.6 + 0.4 * ((hour - 14.0) / 24.0 * 2.0 * std::f64::consts::PI).cos()
}

struct Row {
    date: String,
    sensor: i64,
    sensor_pack: f64,
    base: f64,
    temperature: f64,
    humidity: f64,
    spectrum: String,
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    // (sensor, pack, spectrum length, peaks as (channel, width, amplitude))
    let sensors: [(i64, f64, usize, Vec<(f64, f64, f64)>); 4] = [
        (20, 1.0, 256, vec![(40.0, 6.0, 1.0), (80.0, 8.0, 0.5), (120.0, 10.0, 0.25)]),
        (21, 1.0, 256, vec![(42.0, 5.0, 0.9), (84.0, 7.0, 0.6)]),
        (46, 2.0, 240, vec![(38.0, 6.0, 1.2), (76.0, 9.0, 0.4)]),
        (109, 3.0, 200, vec![(45.0, 4.0, 0.7), (90.0, 6.0, 0.7), (135.0, 8.0, 0.3)]),
    ];

    let start = Utc
        .with_ymd_and_hms(2024, 12, 20, 0, 0, 0)
        .single()
        .context("invalid start date")?;
    let end = start + Duration::days(7);

    let mut rows = Vec::new();
    for (sensor, pack, channels, peaks) in &sensors {
        // Irregular reporting: 10–40 minutes between readings, per sensor.
        let mut ts = start + Duration::seconds(rng.range(0.0, 600.0) as i64);
        while ts < end {
            let activity = diurnal_activity(ts);
            let spectrum = generate_spectrum(*channels, peaks, activity, 0.02, &mut rng);
            rows.push(Row {
                date: ts.format("%Y-%m-%d %H:%M:%S%:z").to_string(),
                sensor: *sensor,
                sensor_pack: *pack,
                base: 1.0 + (*sensor % 7) as f64,
                temperature: 18.0 + 10.0 * activity + rng.gauss(0.0, 0.5),
                humidity: 60.0 - 10.0 * activity + rng.gauss(0.0, 1.0),
                spectrum: codec::encode(&spectrum),
            });
            ts += Duration::seconds(rng.range(600.0, 2400.0) as i64);
        }
    }

    // CSV, in the layout the loader expects
    let csv_path = "sample_data.csv";
    let mut writer = csv::Writer::from_path(csv_path).context("creating CSV output")?;
    writer.write_record([
        "Date",
        "Sensor",
        "Sensor_pack",
        "Base",
        "Temperature",
        "Humidity",
        "Spectrum",
    ])?;
    for row in &rows {
        writer.write_record([
            row.date.clone(),
            row.sensor.to_string(),
            row.sensor_pack.to_string(),
            row.base.to_string(),
            format!("{:.2}", row.temperature),
            format!("{:.2}", row.humidity),
            row.spectrum.clone(),
        ])?;
    }
    writer.flush()?;

    // Parquet, same columns
    let schema = Arc::new(Schema::new(vec![
        Field::new("Date", DataType::Utf8, false),
        Field::new("Sensor", DataType::Int64, false),
        Field::new("Sensor_pack", DataType::Float64, false),
        Field::new("Base", DataType::Float64, false),
        Field::new("Temperature", DataType::Float64, false),
        Field::new("Humidity", DataType::Float64, false),
        Field::new("Spectrum", DataType::Utf8, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(
                rows.iter().map(|r| r.date.as_str()).collect::<Vec<_>>(),
            )),
            Arc::new(Int64Array::from(rows.iter().map(|r| r.sensor).collect::<Vec<_>>())),
            Arc::new(Float64Array::from(
                rows.iter().map(|r| r.sensor_pack).collect::<Vec<_>>(),
            )),
            Arc::new(Float64Array::from(rows.iter().map(|r| r.base).collect::<Vec<_>>())),
            Arc::new(Float64Array::from(
                rows.iter().map(|r| r.temperature).collect::<Vec<_>>(),
            )),
            Arc::new(Float64Array::from(
                rows.iter().map(|r| r.humidity).collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(
                rows.iter().map(|r| r.spectrum.as_str()).collect::<Vec<_>>(),
            )),
        ],
    )
    .context("building record batch")?;

    let parquet_path = "sample_data.parquet";
    let file = std::fs::File::create(parquet_path).context("creating parquet output")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch)?;
    writer.close()?;

    println!(
        "Wrote {} readings from {} sensors to {csv_path} and {parquet_path}",
        rows.len(),
        sensors.len()
    );
    Ok(())
}
