//! Error taxonomy of the tracking core

use thiserror::Error;

/// Failure reported by an external collaborator (tracking, search, route,
/// publish or credential services)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CollaboratorError {
    /// Credentials or client session are not ready yet
    #[error("session is not authenticated yet")]
    Unauthenticated,

    /// Network or service failure
    #[error("{service} unavailable: {reason}")]
    Unavailable {
        service: &'static str,
        reason: String,
    },
}

impl CollaboratorError {
    pub fn unavailable(service: &'static str, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            service,
            reason: reason.into(),
        }
    }
}

/// Crate level error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackingError {
    /// Session not ready. Ticks treat this as a no-op, never as a failure.
    #[error("session is not authenticated yet")]
    Unauthenticated,

    #[error("{service} unavailable: {reason}")]
    CollaboratorUnavailable {
        service: &'static str,
        reason: String,
    },

    #[error("invalid coordinate: longitude {longitude}, latitude {latitude}")]
    InvalidCoordinate { longitude: f64, latitude: f64 },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<CollaboratorError> for TrackingError {
    fn from(e: CollaboratorError) -> Self {
        match e {
            CollaboratorError::Unauthenticated => TrackingError::Unauthenticated,
            CollaboratorError::Unavailable { service, reason } => {
                TrackingError::CollaboratorUnavailable { service, reason }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collaborator_errors_classify() {
        assert_eq!(
            TrackingError::Unauthenticated,
            CollaboratorError::Unauthenticated.into()
        );

        let err: TrackingError = CollaboratorError::unavailable("route", "timeout").into();
        assert_eq!(
            TrackingError::CollaboratorUnavailable {
                service: "route",
                reason: "timeout".to_string()
            },
            err
        );
        assert_eq!("route unavailable: timeout", err.to_string());
    }
}
