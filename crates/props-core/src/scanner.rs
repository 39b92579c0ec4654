//! Directory scanner for discovering and grouping `.properties` bundles

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// File extension of property files
pub const PROPERTIES_EXTENSION: &str = "properties";

/// A bundle of property files sharing a base name, one per locale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bundle {
    /// Base name of the bundle (e.g., "messages")
    pub name: String,
    /// Members of this bundle: base file first, then locales alphabetically
    pub members: Vec<BundleMember>,
}

impl Bundle {
    /// Get the base file (no locale suffix) if it exists
    pub fn base_file(&self) -> Option<&BundleMember> {
        self.members.iter().find(|m| m.locale.is_none())
    }

    /// Paths of all members, in member order
    pub fn paths(&self) -> Vec<&Path> {
        self.members.iter().map(|m| m.path.as_path()).collect()
    }
}

/// A member of a bundle (single property file)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleMember {
    /// Full path to the file
    pub path: PathBuf,
    /// Locale (e.g., "de_CH" for "messages_de_CH.properties"), None for the base file
    pub locale: Option<String>,
}

/// Result of scanning directories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// Root directories that were scanned
    pub roots: Vec<PathBuf>,
    /// Discovered bundles, sorted by name
    pub bundles: Vec<Bundle>,
    /// Total number of files found
    pub total_files: usize,
}

impl ScanResult {
    /// Find a bundle by name
    pub fn find_bundle(&self, name: &str) -> Option<&Bundle> {
        self.bundles.iter().find(|b| b.name == name)
    }
}

/// Scan one or more directories for property files and group them into bundles
pub fn scan_directory<P: AsRef<Path>>(roots: &[P]) -> Result<ScanResult> {
    let mut file_map: BTreeMap<String, Vec<BundleMember>> = BTreeMap::new();
    let mut total_files = 0;

    for root in roots {
        let root = root.as_ref();
        debug!(root = %root.display(), "scanning for property files");

        for entry in WalkDir::new(root).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => return Err(e.into()),
                Err(e) => {
                    warn!("skipping unreadable entry: {}", e);
                    continue;
                }
            };
            let path = entry.path();

            if !entry.file_type().is_file()
                || path.extension().map_or(true, |ext| ext != PROPERTIES_EXTENSION)
            {
                continue;
            }

            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                let (bundle_name, locale) = extract_bundle_info(stem);
                file_map.entry(bundle_name).or_default().push(BundleMember {
                    path: path.to_path_buf(),
                    locale,
                });
                total_files += 1;
            }
        }
    }

    let bundles = file_map
        .into_iter()
        .map(|(name, mut members)| {
            members.sort_by(|a, b| a.locale.cmp(&b.locale).then_with(|| a.path.cmp(&b.path)));
            Bundle { name, members }
        })
        .collect();

    Ok(ScanResult {
        roots: roots.iter().map(|r| r.as_ref().to_path_buf()).collect(),
        bundles,
        total_files,
    })
}

/// Split a file stem into bundle name and locale suffix
///
/// Examples:
/// - "messages" -> ("messages", None)
/// - "messages_de" -> ("messages", Some("de"))
/// - "messages_de_CH" -> ("messages", Some("de_CH"))
/// - "app_labels_en_US_POSIX" -> ("app_labels", Some("en_US_POSIX"))
/// - "app_labels" -> ("app_labels", None)
fn extract_bundle_info(stem: &str) -> (String, Option<String>) {
    let parts: Vec<&str> = stem.split('_').collect();

    // Longest locale first, so "_de_CH" is not read as base "x_de" + "CH"
    for take in (1..=3).rev() {
        if parts.len() > take {
            let (base, locale) = parts.split_at(parts.len() - take);
            if is_locale(locale) {
                return (base.join("_"), Some(locale.join("_")));
            }
        }
    }

    (stem.to_string(), None)
}

fn is_locale(parts: &[&str]) -> bool {
    let Some((language, rest)) = parts.split_first() else {
        return false;
    };
    if language.len() != 2 || !language.chars().all(|c| c.is_ascii_lowercase()) {
        return false;
    }
    match rest {
        [] => true,
        [country] => is_country(country),
        [country, variant] => {
            is_country(country)
                && !variant.is_empty()
                && variant.chars().all(|c| c.is_ascii_alphanumeric())
        }
        _ => false,
    }
}

/// Two-letter region code or three-digit area code
fn is_country(s: &str) -> bool {
    (s.len() == 2 && s.chars().all(|c| c.is_ascii_uppercase()))
        || (s.len() == 3 && s.chars().all(|c| c.is_ascii_digit()))
}
