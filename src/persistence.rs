use crate::error::{RentLedgerError, Result};
use crate::store::RentalStore;
use log::{error, info};
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::Path;

/// What to do when the data file exists but cannot be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecoveryPolicy {
    /// Log the problem and continue with an empty store.
    #[default]
    ResetOnCorruption,
    /// Return `DataCorruption` to the caller.
    Strict,
}

#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(RentalStore),
    /// No data file yet; start empty.
    Missing,
    /// The file was unreadable as rental data and was ignored.
    Recovered { reason: String },
}

impl LoadOutcome {
    pub fn into_store(self) -> RentalStore {
        match self {
            Self::Loaded(store) => store,
            Self::Missing | Self::Recovered { .. } => RentalStore::new(),
        }
    }
}

pub fn load_store(path: &Path, policy: RecoveryPolicy) -> Result<LoadOutcome> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == IoErrorKind::NotFound => {
            info!("No rental data at {}; starting with an empty store", path.display());
            return Ok(LoadOutcome::Missing);
        }
        Err(e) if e.kind() == IoErrorKind::InvalidData => {
            // Not valid UTF-8.
            return recover(path, policy, e.to_string());
        }
        Err(e) => return Err(e.into()),
    };

    match RentalStore::deserialize(&content) {
        Ok(store) => {
            info!(
                "Loaded {} building(s) and {} tenant(s) from {}",
                store.building_names().count(),
                store.tenant_count(),
                path.display()
            );
            Ok(LoadOutcome::Loaded(store))
        }
        Err(e) => recover(path, policy, e.to_string()),
    }
}

fn recover(path: &Path, policy: RecoveryPolicy, reason: String) -> Result<LoadOutcome> {
    match policy {
        RecoveryPolicy::Strict => Err(RentLedgerError::DataCorruption(format!(
            "{}: {}",
            path.display(),
            reason
        ))),
        RecoveryPolicy::ResetOnCorruption => {
            error!(
                "Rental data at {} is unreadable ({}); starting with an empty store",
                path.display(),
                reason
            );
            Ok(LoadOutcome::Recovered { reason })
        }
    }
}

/// Writes the store as pretty JSON via a sibling `.tmp` file renamed over
/// `path`. A failed write leaves the existing file intact.
pub fn save_store(store: &RentalStore, path: &Path) -> Result<()> {
    let content = store.serialize()?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = Path::new(&tmp_name);

    fs::write(tmp_path, content)?;
    fs::rename(tmp_path, path)?;

    info!(
        "Saved {} tenant(s) to {}",
        store.tenant_count(),
        path.display()
    );
    Ok(())
}
