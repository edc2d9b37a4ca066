use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use sgp4::{Constants, Elements};

use crate::predict::error::PredictError;
use crate::predict::types::SatelliteInfo;

const DATED_SUFFIX: &str = "-active_satellites.txt";

pub struct TleEntry {
    pub info: SatelliteInfo,
    pub elements: Elements,
    pub constants: Constants,
}

pub struct TleLoader {
    tle_dir: PathBuf,
    satellites: HashMap<u32, TleEntry>,
}

impl TleLoader {
    pub fn new(tle_dir: PathBuf) -> Self {
        Self {
            tle_dir,
            satellites: HashMap::new(),
        }
    }

    /// Load all TLE files from the directory
    pub fn load_all(&mut self) -> Result<(), PredictError> {
        self.ensure_dir()?;
        self.satellites.clear();

        let entries = fs::read_dir(&self.tle_dir)?;
        for entry in entries {
            let path = entry?.path();

            if !path.is_file() {
                continue;
            }
            let Some(ext) = path.extension() else {
                continue;
            };
            if ext != "tle" && ext != "txt" {
                continue;
            }

            match parse_tle_file(&path) {
                Ok(entries) => self.insert_all(entries),
                Err(e) => {
                    log::warn!("Failed to parse TLE file {}: {}", path.display(), e);
                }
            }
        }

        self.finish()
    }

    /// Load the snapshot for `date` (`YYYYMMDD-active_satellites.txt`), falling back to the
    /// latest dated snapshot and finally to every TLE file in the directory.
    pub fn load_for_date(&mut self, date: NaiveDate) -> Result<(), PredictError> {
        self.ensure_dir()?;

        let exact = self
            .tle_dir
            .join(format!("{}{}", date.format("%Y%m%d"), DATED_SUFFIX));
        let chosen = if exact.is_file() {
            Some(exact)
        } else {
            self.latest_dated_file()?
        };

        let Some(path) = chosen else {
            log::info!(
                "No dated TLE snapshot in {}, loading every TLE file",
                self.tle_dir.display()
            );
            return self.load_all();
        };

        log::info!("Loading TLE snapshot {}", path.display());
        self.satellites.clear();
        let entries = parse_tle_file(&path)?;
        self.insert_all(entries);
        self.finish()
    }

    pub fn len(&self) -> usize {
        self.satellites.len()
    }

    #[allow(dead_code)]
    pub fn get(&self, norad_id: u32) -> Option<&TleEntry> {
        self.satellites.get(&norad_id)
    }

    pub fn into_entries(self) -> HashMap<u32, TleEntry> {
        self.satellites
    }

    fn ensure_dir(&self) -> Result<(), PredictError> {
        if !self.tle_dir.is_dir() {
            return Err(PredictError::DirectoryNotFound(
                self.tle_dir.display().to_string(),
            ));
        }
        Ok(())
    }

    fn latest_dated_file(&self) -> Result<Option<PathBuf>, PredictError> {
        let mut dated = Vec::new();
        for entry in fs::read_dir(&self.tle_dir)? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if is_dated_snapshot(name) && path.is_file() {
                dated.push(path);
            }
        }
        dated.sort();
        Ok(dated.pop())
    }

    fn insert_all(&mut self, entries: Vec<TleEntry>) {
        for tle_entry in entries {
            self.satellites.insert(tle_entry.info.norad_id, tle_entry);
        }
    }

    fn finish(&self) -> Result<(), PredictError> {
        if self.satellites.is_empty() {
            return Err(PredictError::NoSatellites);
        }
        log::info!("Loaded {} satellites", self.satellites.len());
        Ok(())
    }
}

fn is_dated_snapshot(name: &str) -> bool {
    name.strip_suffix(DATED_SUFFIX)
        .map(|stem| stem.len() == 8 && stem.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(false)
}

/// Parse a single TLE file (may contain multiple satellites)
fn parse_tle_file(path: &Path) -> Result<Vec<TleEntry>, PredictError> {
    let content = fs::read_to_string(path)?;
    let filename = path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();

    let invalid = |message: String| PredictError::InvalidTle {
        file: filename.clone(),
        message,
    };

    let mut results = Vec::new();
    for (name, line1, line2) in parse_multi_tle(&content) {
        let elements = Elements::from_tle(name.clone(), line1.as_bytes(), line2.as_bytes())
            .map_err(|e| invalid(e.to_string()))?;
        let constants =
            Constants::from_elements(&elements).map_err(|e| invalid(e.to_string()))?;

        let norad_id = u32::try_from(elements.norad_id)
            .map_err(|_| invalid(format!("NORAD id {} out of range", elements.norad_id)))?;
        let sat_name = name.unwrap_or_else(|| format!("NORAD {}", norad_id));

        results.push(TleEntry {
            info: SatelliteInfo {
                name: sat_name,
                norad_id,
                tle_source: filename.clone(),
            },
            elements,
            constants,
        });
    }

    Ok(results)
}

/// Parse multi-satellite TLE content
fn parse_multi_tle(content: &str) -> Vec<(Option<String>, String, String)> {
    let lines: Vec<&str> = content
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    let mut result = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if lines[i].starts_with("1 ") && i + 1 < lines.len() && lines[i + 1].starts_with("2 ") {
            // 2-line TLE (no name)
            result.push((None, lines[i].to_string(), lines[i + 1].to_string()));
            i += 2;
        } else if i + 2 < lines.len()
            && lines[i + 1].starts_with("1 ")
            && lines[i + 2].starts_with("2 ")
        {
            // 3-line TLE (with name)
            result.push((
                Some(lines[i].to_string()),
                lines[i + 1].to_string(),
                lines[i + 2].to_string(),
            ));
            i += 3;
        } else {
            i += 1;
        }
    }

    result
}
