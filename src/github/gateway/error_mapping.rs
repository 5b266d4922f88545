//! Maps transport failures into resource-scoped intake errors.

use crate::github::error::{IntakeError, Resource};
use crate::github::transport::TransportError;

pub(super) fn map_transport_error(resource: Resource, error: TransportError) -> IntakeError {
    match error {
        TransportError::Authentication { status, message } => IntakeError::Authentication {
            resource,
            message: format!("GitHub returned {status}: {message}"),
        },
        TransportError::NotFound { message } => IntakeError::NotFound { resource, message },
        TransportError::RateLimited {
            reset_at,
            attempts,
            message,
        } => IntakeError::RateLimited {
            resource,
            reset_at,
            message: match reset_at {
                Some(reset) => format!("{message} (gave up after {attempts} attempts; resets at {reset})"),
                None => format!("{message} (gave up after {attempts} attempts)"),
            },
        },
        TransportError::Transient { attempts, message } => IntakeError::Transient {
            resource,
            attempts,
            message,
        },
        TransportError::Api { status, body } => IntakeError::Api {
            resource,
            status,
            message: body,
        },
        TransportError::Decode { message } => IntakeError::MalformedResponse {
            resource,
            field: "<body>".to_owned(),
            message,
        },
        TransportError::InvalidRequest { message } => IntakeError::Configuration { message },
    }
}
