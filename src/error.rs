//! Kernel failure taxonomy.
//!
//! Every serializer reports kernel-level failures as `Err(KernelError)`.
//! STEP transfer and write status failures are not errors: they are
//! reported by status code (see `export::step`).

/// Result type for kernel operations.
pub type Result<T> = std::result::Result<T, KernelError>;

#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    #[error("{entity} #{index} is referenced but not present in the topology store")]
    DanglingReference { entity: &'static str, index: usize },

    #[error("Non-finite geometry: {0}")]
    NonFiniteGeometry(String),

    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("Construction failed: {0}")]
    Construction(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Invalid interchange settings: {0}")]
    InvalidSettings(String),

    #[error("Writer output is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl KernelError {
    /// Stable category name, reported through the failure bridge.
    pub fn kind(&self) -> &'static str {
        match self {
            KernelError::DanglingReference { .. } => "DanglingReference",
            KernelError::NonFiniteGeometry(_) => "NonFiniteGeometry",
            KernelError::DegenerateGeometry(_) => "DegenerateGeometry",
            KernelError::Construction(_) => "ConstructionError",
            KernelError::NotSupported(_) => "NotSupported",
            KernelError::InvalidSettings(_) => "InvalidSettings",
            KernelError::Encoding(_) => "EncodingError",
            KernelError::Io(_) => "IoError",
            KernelError::Json(_) => "JsonError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = KernelError::DanglingReference {
            entity: "Edge",
            index: 7,
        };
        assert_eq!(err.kind(), "DanglingReference");
        assert!(err.to_string().contains("Edge #7"));
    }

    #[test]
    fn io_errors_convert() {
        let err: KernelError = std::io::Error::other("sink closed").into();
        assert_eq!(err.kind(), "IoError");
        assert!(err.to_string().contains("sink closed"));
    }
}
