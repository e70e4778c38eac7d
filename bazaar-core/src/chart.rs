//! Optional per-commodity chart series persisted for the live display.
//!
//! Not a stable format: JSON-lines of timestamped points, one `.dat` file
//! per commodity, appended to by the host binary and tailed by a viewer.

use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub timestamp_ms: i64,
    pub value: f64,
}

pub fn chart_path(dir: &Path, commodity: &str) -> PathBuf {
    dir.join(format!("{commodity}.dat"))
}

pub fn append_point(dir: &Path, commodity: &str, point: ChartPoint) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(chart_path(dir, commodity))?;
    writeln!(file, "{}", serde_json::to_string(&point)?)?;
    Ok(())
}

/// Missing files read as an empty series rather than an error -- a viewer
/// started before the host binary has written its first point is normal.
pub fn read_series(dir: &Path, commodity: &str) -> io::Result<Vec<ChartPoint>> {
    let path = chart_path(dir, commodity);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let reader = BufReader::new(File::open(path)?);
    let mut points = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        if let Ok(point) = serde_json::from_str(&line) {
            points.push(point);
        }
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_a_temp_dir() {
        let dir = std::env::temp_dir().join(format!("bazaarbot-chart-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        append_point(&dir, "wood", ChartPoint { timestamp_ms: 0, value: 10.0 }).unwrap();
        append_point(&dir, "wood", ChartPoint { timestamp_ms: 5, value: 12.0 }).unwrap();
        let series = read_series(&dir, "wood").unwrap();
        assert_eq!(series, vec![
            ChartPoint { timestamp_ms: 0, value: 10.0 },
            ChartPoint { timestamp_ms: 5, value: 12.0 },
        ]);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = std::env::temp_dir().join("bazaarbot-chart-test-missing");
        assert_eq!(read_series(&dir, "ghost").unwrap(), Vec::new());
    }
}
