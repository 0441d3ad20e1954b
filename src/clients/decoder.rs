use crate::errors::{OrderServiceError, INSUFFICIENT_QUANTITY};
use crate::models::ErrorResponse;

// ============================================================================
// Remote Error Translation
// ============================================================================
//
// Single boundary where a non-success response from the product or payment
// service becomes a typed error. Runs before the breaker/fallback layer sees
// the failure, so the fallback can tell a decoded business error apart from
// an outage.
//
// ============================================================================

/// Translate a non-success response into a typed error
pub fn translate(status: u16, body: &[u8]) -> OrderServiceError {
    let error = match serde_json::from_slice::<ErrorResponse>(body) {
        Ok(error) => error,
        Err(e) => {
            tracing::warn!(
                status = status,
                error = %e,
                "Undecodable error body from remote service"
            );
            return OrderServiceError::internal();
        }
    };

    tracing::debug!(
        status = status,
        error_code = %error.error_code,
        "Decoded remote error"
    );

    let ErrorResponse {
        error_code,
        error_message: message,
    } = error;

    if error_code == INSUFFICIENT_QUANTITY {
        OrderServiceError::InsufficientResource {
            message,
            error_code,
            status,
        }
    } else if status == 404 {
        OrderServiceError::NotFound {
            message,
            error_code,
        }
    } else {
        OrderServiceError::RemoteDomain {
            message,
            error_code,
            status,
        }
    }
}
