use thiserror::Error;

/// Errors from the numeric evaluators
///
/// A missing attribute is not an error, queries return `Ok(None)` for that.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("invalid geometry: length {length} must be finite and greater than zero")]
    InvalidGeometry { length: f64 },

    #[error("spiral integration exceeded {steps} steps")]
    StepLimit { steps: usize },

    #[error("tolerance configuration error: {0}")]
    Config(String),
}

impl GeometryError {
    /// Err if the length can't bound a segment
    pub fn check_length(length: f64) -> Result<(), Self> {
        // written this way so NaN fails too
        if length > 0.0 && length.is_finite() {
            Ok(())
        } else {
            Err(Self::InvalidGeometry { length })
        }
    }
}

/// Errors from reading an OpenDRIVE document
#[derive(Debug, Error)]
pub enum XodrError {
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("xml attribute error: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("root element is '{0}', expected 'OpenDRIVE'")]
    UnexpectedRoot(String),

    #[error("document has no root element")]
    EmptyDocument,
}
