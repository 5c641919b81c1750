use serde::{Deserialize, Serialize};

use crate::geometry::StlFormat;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
/// Surface export settings.
pub struct ExportOptions {
    /// STL encoding written by "Export Surface".
    pub format: StlFormat,
}
