use thiserror::Error;

#[derive(Debug, Error)]
pub enum KioskError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Server overloaded: {0} jobs already queued")]
    Overloaded(usize),

    #[error("Unknown background: {0}")]
    InvalidBackground(String),

    #[error("Generation failed: {0}")]
    ExternalGeneration(String),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl From<std::io::Error> for KioskError {
    fn from(err: std::io::Error) -> Self {
        KioskError::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for KioskError {
    fn from(err: serde_json::Error) -> Self {
        KioskError::ExternalGeneration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display() {
        let err = KioskError::Validation("image field missing".to_string());
        assert_eq!(err.to_string(), "Validation error: image field missing");
    }

    #[test]
    fn test_rate_limited_display() {
        let err = KioskError::RateLimited("kiosk-1".to_string());
        assert_eq!(err.to_string(), "Rate limited: kiosk-1");
    }

    #[test]
    fn test_overloaded_display() {
        let err = KioskError::Overloaded(12);
        assert_eq!(err.to_string(), "Server overloaded: 12 jobs already queued");
    }

    #[test]
    fn test_invalid_background_display() {
        let err = KioskError::InvalidBackground("bg-z".to_string());
        assert_eq!(err.to_string(), "Unknown background: bg-z");
    }

    #[test]
    fn test_external_generation_display() {
        let err = KioskError::ExternalGeneration("upstream returned 502".to_string());
        assert_eq!(err.to_string(), "Generation failed: upstream returned 502");
    }

    #[test]
    fn test_persistence_display() {
        let err = KioskError::Persistence("disk full".to_string());
        assert_eq!(err.to_string(), "Persistence error: disk full");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: KioskError = io_err.into();
        match err {
            KioskError::Persistence(msg) => assert!(msg.contains("file missing")),
            other => panic!("Expected Persistence, got: {:?}", other),
        }
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<String>("not valid json").unwrap_err();
        let err: KioskError = json_err.into();
        match err {
            KioskError::ExternalGeneration(_) => {}
            other => panic!("Expected ExternalGeneration, got: {:?}", other),
        }
    }
}
