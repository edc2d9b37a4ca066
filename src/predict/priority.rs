use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::predict::error::PredictError;

/// Ranking of one tracked object. Lower `priority` is more important.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorityEntry {
    pub priority: i64,
    pub name: String,
    pub norad_id: u32,
    pub cospar_id: String,
}

/// Static priority ranking, keyed by NORAD id.
#[derive(Debug, Clone, Default)]
pub struct PriorityTable {
    entries: HashMap<u32, PriorityEntry>,
}

impl PriorityTable {
    pub fn from_file(path: &Path) -> Result<Self, PredictError> {
        let file = File::open(path)?;
        let table = Self::from_reader(file)?;
        if table.is_empty() {
            return Err(PredictError::NoPriorities(path.display().to_string()));
        }
        log::info!(
            "Loaded {} priority entries from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    /// Reads `priority;name;cospar_id;norad_id` rows. Comment lines, `UNKNOWN` ids and
    /// unparseable rows are skipped.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, PredictError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .comment(Some(b'#'))
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut entries = HashMap::new();
        for (line, result) in csv_reader.records().enumerate() {
            let record = match result {
                Ok(r) => r,
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => {
                    log::debug!("Skipping priority row {}: {}", line + 1, e);
                    continue;
                }
            };

            match parse_row(&record) {
                Some(entry) => {
                    entries.insert(entry.norad_id, entry);
                }
                None => log::debug!("Skipping priority row {}: {:?}", line + 1, record),
            }
        }

        Ok(Self { entries })
    }

    pub fn get(&self, norad_id: u32) -> Option<&PriorityEntry> {
        self.entries.get(&norad_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ordered by `(priority, name)`.
    pub fn ordered(&self) -> Vec<&PriorityEntry> {
        let mut ordered: Vec<_> = self.entries.values().collect();
        ordered.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.name.cmp(&b.name)));
        ordered
    }
}

impl FromIterator<PriorityEntry> for PriorityTable {
    fn from_iter<I: IntoIterator<Item = PriorityEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|e| (e.norad_id, e)).collect(),
        }
    }
}

fn parse_row(record: &csv::StringRecord) -> Option<PriorityEntry> {
    if record.len() < 4 {
        return None;
    }
    let norad = record.get(3)?;
    if norad.eq_ignore_ascii_case("unknown") {
        return None;
    }
    Some(PriorityEntry {
        priority: record.get(0)?.parse().ok()?,
        name: record.get(1)?.to_string(),
        cospar_id: record.get(2)?.to_string(),
        norad_id: norad.parse().ok()?,
    })
}
