//! Reference data fixtures: `{"habitats": [...], "species": [...], "branches": [...]}`.

use crate::error::{SpawnError, SpawnErrorExt};
use crate::model::ReferenceData;
use fauna_kernel::prelude::ResourceGuard;
use std::path::Path;

/// Reads and validates a JSON fixture.
///
/// # Errors
/// [`SpawnError::Io`], [`SpawnError::Fixture`] for unreadable or malformed files,
/// [`SpawnError::Validation`] for invalid records.
pub fn load(path: impl AsRef<Path>) -> Result<ReferenceData, SpawnError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).context(path.display().to_string())?;
    let data: ReferenceData = serde_json::from_str(&raw).context(path.display().to_string())?;
    validate(&data)?;
    Ok(data)
}

/// Checks ids, branch capacities and coordinates.
///
/// # Errors
/// [`SpawnError::Validation`] naming the first offending record.
pub fn validate(data: &ReferenceData) -> Result<(), SpawnError> {
    for habitat in &data.habitats {
        ResourceGuard::verify(&habitat.id, "habitats.id")?;
    }
    for species in &data.species {
        ResourceGuard::verify(&species.id, "species.id")?;
    }

    for branch in &data.branches {
        ResourceGuard::verify(&branch.id, "branches.id")?;
        if branch.capacity == 0 {
            return Err(SpawnError::invalid("branches.capacity", format!("branch {} has no capacity", branch.id)));
        }
        if !(-90.0..=90.0).contains(&branch.latitude) {
            return Err(SpawnError::invalid("branches.latitude", format!("branch {} is off the map", branch.id)));
        }
        if !(-180.0..=180.0).contains(&branch.longitude) {
            return Err(SpawnError::invalid("branches.longitude", format!("branch {} is off the map", branch.id)));
        }
    }
    Ok(())
}
