use serde::{Deserialize, Serialize};

/// A portrait style template.
///
/// Template order is significant: the final URL list is the concatenation of
/// per-template results in the order templates were submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    /// Display name shown in the template gallery.
    pub name: String,
    /// Opaque style key understood by the generation service
    /// (e.g. "f_idcard_male").
    pub style_code: String,
}

impl Template {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        style_code: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            style_code: style_code.into(),
        }
    }
}
