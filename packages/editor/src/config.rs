//! Editor tuning knobs

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    /// Maximum undo steps kept (0 = unlimited)
    pub history_limit: usize,

    /// Merge distance used when vector results are normalized
    pub vector_epsilon: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: 100,
            vector_epsilon: vellum_vn::DEFAULT_EPSILON,
        }
    }
}
