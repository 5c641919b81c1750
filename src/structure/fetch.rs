use std::path::PathBuf;
use std::time::Duration;

use crate::error::BiovisError;
use crate::options::FetchOptions;

/// Largest response body accepted from the archive.
const MAX_DOWNLOAD_BYTES: u64 = 256 * 1024 * 1024;

/// Normalize and validate a PDB identifier: four ASCII alphanumerics,
/// returned upper-cased.
///
/// # Errors
///
/// [`BiovisError::Fetch`] if the identifier is malformed.
pub fn normalize_pdb_id(id: &str) -> Result<String, BiovisError> {
    let trimmed = id.trim();
    if trimmed.len() == 4 && trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(trimmed.to_ascii_uppercase())
    } else {
        Err(BiovisError::Fetch(format!(
            "'{trimmed}' is not a valid PDB ID (expected 4 letters or digits)"
        )))
    }
}

/// Download URL for a normalized identifier.
#[must_use]
pub fn download_url(options: &FetchOptions, id: &str) -> String {
    format!("{}/{id}.pdb", options.base_url.trim_end_matches('/'))
}

/// Cache location for a normalized identifier.
#[must_use]
pub fn cache_path(options: &FetchOptions, id: &str) -> PathBuf {
    options.cache_dir.join(format!("{id}.pdb"))
}

/// Make `id` available as a local PDB file, downloading it unless it is
/// already cached. Returns the cached path.
///
/// # Errors
///
/// [`BiovisError::Fetch`] for malformed identifiers, network failures,
/// HTTP error statuses, timeouts, and cache write failures. No retry.
pub fn fetch_structure(id: &str, options: &FetchOptions) -> Result<PathBuf, BiovisError> {
    let id = normalize_pdb_id(id)?;
    let local = cache_path(options, &id);
    if local.is_file() {
        log::info!("using cached {}", local.display());
        return Ok(local);
    }

    let url = download_url(options, &id);
    log::info!("downloading {id} from {url}");
    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(options.timeout_secs.max(1))))
        .build()
        .into();
    let content = agent
        .get(&url)
        .call()
        .map_err(|e| BiovisError::Fetch(format!("failed to download {id}: {e}")))?
        .body_mut()
        .with_config()
        .limit(MAX_DOWNLOAD_BYTES)
        .read_to_string()
        .map_err(|e| BiovisError::Fetch(format!("failed to read {id}: {e}")))?;

    std::fs::create_dir_all(&options.cache_dir).map_err(|e| {
        BiovisError::Fetch(format!(
            "cannot create {}: {e}",
            options.cache_dir.display()
        ))
    })?;
    // Written under a temporary name so an interrupted write is never reused.
    let partial = local.with_extension("pdb.part");
    std::fs::write(&partial, &content)
        .and_then(|()| std::fs::rename(&partial, &local))
        .map_err(|e| BiovisError::Fetch(format!("cannot save {}: {e}", local.display())))?;

    log::info!("downloaded {id} to {}", local.display());
    Ok(local)
}
