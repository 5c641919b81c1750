use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
/// Remote structure retrieval settings.
pub struct FetchOptions {
    /// Base URL; `<base_url>/<ID>.pdb` is requested.
    pub base_url: String,
    /// Directory downloaded files are written to before parsing.
    pub cache_dir: PathBuf,
    /// Overall request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            base_url: "https://files.rcsb.org/download".into(),
            cache_dir: PathBuf::from("assets/models"),
            timeout_secs: 30,
        }
    }
}
