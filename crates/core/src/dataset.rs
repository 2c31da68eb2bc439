//! Input datasets: the FDA device index and the curated known-device list.

use crate::models::{DeviceRecord, KnownDevice};
use anyhow::{bail, Context};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// The FDA AI/ML-enabled device index. Loading failure is the one fatal
/// error in the pipeline: without it there is nothing to process.
#[derive(Debug, Clone, Default)]
pub struct DeviceIndex {
    records: Vec<DeviceRecord>,
}

fn find_col(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

fn cell(record: &csv::StringRecord, col: Option<usize>) -> String {
    col.and_then(|i| record.get(i))
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

impl DeviceIndex {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        let index = match ext.as_str() {
            "xlsx" | "xls" => Self::load_xlsx(path)?,
            _ => Self::load_csv(path)?,
        };
        if index.records.is_empty() {
            bail!("device index {} holds no records", path.display());
        }
        info!(count = index.records.len(), "device index loaded");
        Ok(index)
    }

    fn load_csv(path: &Path) -> anyhow::Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("opening device index {}", path.display()))?;
        let headers = reader.headers()?.clone();

        let submission = find_col(&headers, "Submission Number")
            .with_context(|| "device index lacks a Submission Number column")?;
        let device = find_col(&headers, "Device");
        let company = find_col(&headers, "Company");
        let category = find_col(&headers, "Panel (lead)");
        let date = find_col(&headers, "Date of Final Decision");

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            let number = cell(&row, Some(submission));
            if number.is_empty() {
                continue;
            }
            records.push(DeviceRecord {
                submission_number: number,
                device: cell(&row, device),
                company: cell(&row, company),
                category: cell(&row, category),
                decision_date: cell(&row, date),
            });
        }
        Ok(Self { records })
    }

    #[cfg(feature = "xlsx")]
    fn load_xlsx(path: &Path) -> anyhow::Result<Self> {
        use calamine::{open_workbook_auto, Reader};

        let mut workbook = open_workbook_auto(path)
            .with_context(|| format!("opening device index {}", path.display()))?;
        let sheet = workbook
            .sheet_names()
            .first()
            .cloned()
            .with_context(|| "device index workbook has no sheets")?;
        let range = workbook
            .worksheet_range(&sheet)
            .with_context(|| format!("reading sheet {sheet}"))?
            .with_context(|| format!("reading sheet {sheet}"))?;

        let mut rows = range.rows();
        let headers: Vec<String> = rows
            .next()
            .with_context(|| "device index sheet is empty")?
            .iter()
            .map(|c| c.to_string().trim().to_string())
            .collect();
        let col = |name: &str| headers.iter().position(|h| h == name);
        let submission = col("Submission Number")
            .with_context(|| "device index lacks a Submission Number column")?;
        let device = col("Device");
        let company = col("Company");
        let category = col("Panel (lead)");
        let date = col("Date of Final Decision");

        let pick = |row: &[calamine::DataType], i: Option<usize>| -> String {
            i.and_then(|i| row.get(i))
                .map(|c| c.to_string().trim().to_string())
                .unwrap_or_default()
        };

        let mut records = Vec::new();
        for row in rows {
            let number = pick(row, Some(submission));
            if number.is_empty() {
                continue;
            }
            records.push(DeviceRecord {
                submission_number: number,
                device: pick(row, device),
                company: pick(row, company),
                category: pick(row, category),
                decision_date: pick(row, date),
            });
        }
        Ok(Self { records })
    }

    #[cfg(not(feature = "xlsx"))]
    fn load_xlsx(path: &Path) -> anyhow::Result<Self> {
        bail!(
            "{} is a spreadsheet but xlsx support is not compiled in",
            path.display()
        )
    }

    pub fn find(&self, submission_number: &str) -> Option<&DeviceRecord> {
        self.records
            .iter()
            .find(|r| r.submission_number == submission_number)
    }

    pub fn records(&self) -> &[DeviceRecord] {
        &self.records
    }
}

/// Supplementary curated list keyed by submission number. Absence is
/// normal; a broken file degrades to an empty list.
#[derive(Debug, Clone, Default)]
pub struct KnownDevices {
    map: HashMap<String, KnownDevice>,
}

fn optional_field(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("not available") {
        None
    } else {
        Some(value.to_string())
    }
}

impl KnownDevices {
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(known) => {
                info!(count = known.map.len(), "known-device list loaded");
                known
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "known-device list unavailable");
                Self::default()
            }
        }
    }

    fn try_load(path: &Path) -> anyhow::Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.clone();
        let submission = find_col(&headers, "Submission Number")
            .with_context(|| "known-device list lacks a Submission Number column")?;
        let algorithm = find_col(&headers, "AI_Algo");
        let description = find_col(&headers, "Desc");

        let mut map = HashMap::new();
        for row in reader.records() {
            let row = row?;
            let number = cell(&row, Some(submission));
            if number.is_empty() {
                continue;
            }
            map.insert(
                number,
                KnownDevice {
                    algorithm: optional_field(&cell(&row, algorithm)),
                    description: optional_field(&cell(&row, description)),
                },
            );
        }
        Ok(Self { map })
    }

    pub fn get(&self, submission_number: &str) -> Option<&KnownDevice> {
        self.map.get(submission_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn loads_device_index_by_header_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.csv");
        fs::write(
            &path,
            "Date of Final Decision,Submission Number,Device,Company,Panel (lead)\n\
             2020-03-01,K000001,RetinaScan,Acme Medical,Radiology\n\
             ,,,,\n\
             2021-07-15,K000002,CardioNet,Beta Health,Cardiovascular\n",
        )
        .unwrap();

        let index = DeviceIndex::load(&path).unwrap();
        assert_eq!(index.records().len(), 2);
        let record = index.find("K000001").unwrap();
        assert_eq!(record.device, "RetinaScan");
        assert_eq!(record.decision_date, "2020-03-01");
        assert!(index.find("K999999").is_none());
    }

    #[test]
    fn empty_index_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.csv");
        fs::write(&path, "Submission Number,Device\n").unwrap();
        assert!(DeviceIndex::load(&path).is_err());
    }

    #[test]
    fn missing_submission_column_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.csv");
        fs::write(&path, "Device,Company\nRetinaScan,Acme\n").unwrap();
        assert!(DeviceIndex::load(&path).is_err());
    }

    #[test]
    fn known_devices_treat_not_available_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("known.csv");
        fs::write(
            &path,
            "Submission Number,AI_Algo,Name of device,Desc\n\
             K000001,Not Available,RetinaScan,Detects retinopathy in fundus images\n\
             K000002,XGBoost,CardioNet,\n",
        )
        .unwrap();

        let known = KnownDevices::load(&path);
        let first = known.get("K000001").unwrap();
        assert!(first.algorithm.is_none());
        assert!(first.description.as_deref().unwrap().contains("retinopathy"));
        let second = known.get("K000002").unwrap();
        assert_eq!(second.algorithm.as_deref(), Some("XGBoost"));
        assert!(second.description.is_none());
    }

    #[test]
    fn missing_known_device_file_degrades_to_empty() {
        let known = KnownDevices::load(Path::new("/nonexistent/known.csv"));
        assert!(known.get("K000001").is_none());
    }
}
