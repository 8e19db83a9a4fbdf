use super::validate::{validate_catalogue_file, validate_catalogue_json};
use crate::model::Catalogue;
use crate::{CatalogueError, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

/// Serialises a catalogue as pretty-printed JSON with a trailing newline
pub fn to_json(catalogue: &Catalogue) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(catalogue)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Writes a catalogue to `path` and validates the file that landed on disk
///
/// The document is validated before anything touches `path`, then written to
/// a sibling temporary file and renamed into place, so a reader never sees a
/// partial or invalid catalogue.
pub fn write_catalogue(catalogue: &Catalogue, path: &Path) -> Result<()> {
    let write_err = |source| CatalogueError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let bytes = to_json(catalogue)?;
    validate_catalogue_json(&bytes)?;

    let tmp = path.with_extension("json.tmp");
    {
        let mut file = fs::File::create(&tmp).map_err(write_err)?;
        file.write_all(&bytes).map_err(write_err)?;
        file.sync_all().map_err(write_err)?;
    }
    fs::rename(&tmp, path).map_err(write_err)?;

    validate_catalogue_file(path)?;

    tracing::info!(
        path = %path.display(),
        total = catalogue.total,
        "Wrote catalogue"
    );
    Ok(())
}
