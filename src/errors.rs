use crate::domain::order::OrderError;
use crate::models::ErrorResponse;

// ============================================================================
// Service Error Taxonomy
// ============================================================================
//
// Every failure that can cross the orchestration boundary. Each variant knows
// its wire code and HTTP status so the API layer and the remote error
// translator agree on one representation.
//
// ============================================================================

pub const ORDER_NOT_FOUND: &str = "ORDER_NOT_FOUND";
pub const INSUFFICIENT_QUANTITY: &str = "INSUFFICIENT_QUANTITY";
pub const INTERNAL_SERVER_ERROR: &str = "INTERNAL_SERVER_ERROR";
pub const INVALID_REQUEST: &str = "INVALID_REQUEST";
pub const ORDER_STORE_ERROR: &str = "ORDER_STORE_ERROR";

/// Remote subsystem an error or call belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dependency {
    ProductService,
    PaymentService,
}

impl Dependency {
    /// Label used for breakers, metrics and health components
    pub fn name(&self) -> &'static str {
        match self {
            Dependency::ProductService => "product-service",
            Dependency::PaymentService => "payment-service",
        }
    }

    pub fn offline_code(&self) -> &'static str {
        match self {
            Dependency::ProductService => "PRODUCT_SERVICE_OFFLINE",
            Dependency::PaymentService => "PAYMENT_SERVICE_OFFLINE",
        }
    }
}

impl std::fmt::Display for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dependency::ProductService => write!(f, "Product service"),
            Dependency::PaymentService => write!(f, "Payment service"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrderServiceError {
    /// Order or remote record absent
    #[error("{message}")]
    NotFound { message: String, error_code: String },

    /// Requested quantity exceeds what the inventory holds
    #[error("{message}")]
    InsufficientResource {
        message: String,
        error_code: String,
        status: u16,
    },

    /// Breaker open or dependency unreachable
    #[error("{dependency} is offline!")]
    ServiceUnavailable { dependency: Dependency },

    /// Structured error decoded from a dependency's response
    #[error("{message}")]
    RemoteDomain {
        message: String,
        error_code: String,
        status: u16,
    },

    /// Undecodable failure
    #[error("{message}")]
    Internal { message: String },

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Order store failure: {0}")]
    Storage(String),
}

impl OrderServiceError {
    pub fn order_not_found(order_id: i64) -> Self {
        OrderServiceError::NotFound {
            message: format!("No order found with id {}", order_id),
            error_code: ORDER_NOT_FOUND.to_string(),
        }
    }

    pub fn unavailable(dependency: Dependency) -> Self {
        OrderServiceError::ServiceUnavailable { dependency }
    }

    pub fn internal() -> Self {
        OrderServiceError::Internal {
            message: "Internal server error!".to_string(),
        }
    }

    pub fn storage(err: impl std::fmt::Display) -> Self {
        OrderServiceError::Storage(err.to_string())
    }

    pub fn error_code(&self) -> &str {
        match self {
            OrderServiceError::NotFound { error_code, .. }
            | OrderServiceError::InsufficientResource { error_code, .. }
            | OrderServiceError::RemoteDomain { error_code, .. } => error_code,
            OrderServiceError::ServiceUnavailable { dependency } => dependency.offline_code(),
            OrderServiceError::Internal { .. } => INTERNAL_SERVER_ERROR,
            OrderServiceError::InvalidRequest(_) => INVALID_REQUEST,
            OrderServiceError::Storage(_) => ORDER_STORE_ERROR,
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            OrderServiceError::NotFound { .. } => 404,
            OrderServiceError::InsufficientResource { status, .. }
            | OrderServiceError::RemoteDomain { status, .. } => *status,
            OrderServiceError::InvalidRequest(_) => 400,
            OrderServiceError::ServiceUnavailable { .. }
            | OrderServiceError::Internal { .. }
            | OrderServiceError::Storage(_) => 500,
        }
    }

    /// True for the "dependency is down" class of errors
    pub fn is_unavailable(&self) -> bool {
        matches!(self, OrderServiceError::ServiceUnavailable { .. })
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error_code: self.error_code().to_string(),
            error_message: self.to_string(),
        }
    }
}

impl From<OrderError> for OrderServiceError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::InvalidQuantity(_) | OrderError::InvalidAmount(_) => {
                OrderServiceError::InvalidRequest(err.to_string())
            }
            OrderError::InvalidStatusTransition { .. } => OrderServiceError::Internal {
                message: err.to_string(),
            },
        }
    }
}
