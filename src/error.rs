use thiserror::Error;

/// Error kinds of a render pass.
///
/// Only `Load` is ever returned to a caller as a failure, and even then it is
/// confined to the layer whose source failed. The other kinds describe degraded
/// but recoverable situations and end up as notices on the rendered page.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// The source could not be read, parsed, or held no features.
    #[error("Could not load {source_name}: {reason}")]
    Load { source_name: String, reason: String },

    /// A feature lacks an attribute that a filter, style or tooltip refers to.
    #[error("Attribute '{0}' is missing")]
    MissingAttribute(String),

    /// A filter matched no feature of the layer.
    #[error("No data in layer '{0}' for the selected filter")]
    EmptyResult(String),

    /// A centroid was requested for a collection without geometries.
    #[error("Cannot compute the center of an empty dataset")]
    EmptyDataset,
}

impl DashboardError {
    pub fn load(source_name: impl Into<String>, reason: impl ToString) -> Self {
        DashboardError::Load {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }
}
