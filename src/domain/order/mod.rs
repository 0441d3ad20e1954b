// ============================================================================
// Order Domain - Placement and Retrieval
// ============================================================================
//
// - Value objects (OrderId, OrderStatus, PaymentMode)
// - Errors (OrderError enum)
// - Aggregate (OrderDraft / Order and their status rule)
// - Orchestrator (placement workflow)
// - Reader (aggregated read path)
// - Service (facade used by the API)
//
// ============================================================================

pub mod value_objects;
pub mod errors;
pub mod aggregate;
pub mod orchestrator;
pub mod reader;
pub mod service;

// Re-export for convenience
pub use value_objects::*;
pub use errors::*;
pub use aggregate::*;
pub use orchestrator::OrderOrchestrator;
pub use reader::AggregationReader;
pub use service::OrderService;
