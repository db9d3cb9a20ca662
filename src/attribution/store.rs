use super::AttributionError;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Team, caption and photographer for one submitted file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributionEntry {
    pub team_name: String,
    pub caption: String,
    pub photographer: String,
}

#[derive(Debug, Deserialize)]
struct AttributionRecord {
    #[serde(default)]
    filename: String,
    #[serde(default)]
    team_name: String,
    #[serde(default)]
    caption: String,
    #[serde(default)]
    photographer: String,
}

/// Attribution entries keyed by lower-cased bare file name.
///
/// Directory components are dropped from keys, so two submissions sharing a
/// file name in different folders share one entry.
#[derive(Debug, Default, Clone)]
pub struct AttributionStore {
    entries: HashMap<String, AttributionEntry>,
}

impl AttributionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the rows of `csv_path` into the store and return how many
    /// entries it now holds. A file that cannot be read or parsed leaves the
    /// store untouched and returns 0.
    pub fn load(&mut self, csv_path: &Path) -> usize {
        match read_entries(csv_path) {
            Ok(rows) => {
                let row_count = rows.len();
                // later rows overwrite earlier ones
                self.entries.extend(rows);
                info!(
                    "Loaded {} attribution rows from {:?} ({} files known)",
                    row_count,
                    csv_path,
                    self.entries.len()
                );
                self.entries.len()
            }
            Err(e) => {
                warn!("Failed to load attribution CSV {:?}: {}", csv_path, e);
                0
            }
        }
    }

    /// Entry for `filename` (any path is reduced to its file name). Unknown
    /// files resolve to empty fields.
    pub fn lookup(&self, filename: &str) -> AttributionEntry {
        self.entries
            .get(&normalize_key(filename))
            .cloned()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn read_entries(csv_path: &Path) -> Result<Vec<(String, AttributionEntry)>, AttributionError> {
    let file = std::fs::File::open(csv_path)?;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(file);

    let mut rows = Vec::new();
    for record in reader.deserialize::<AttributionRecord>() {
        let record = record?;
        let key = normalize_key(&record.filename);
        if key.is_empty() {
            debug!("Skipping attribution row without a filename");
            continue;
        }
        rows.push((
            key,
            AttributionEntry {
                team_name: record.team_name,
                caption: record.caption,
                photographer: record.photographer,
            },
        ));
    }

    Ok(rows)
}

fn normalize_key(filename: &str) -> String {
    let bare = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim();
    bare.to_lowercase()
}
