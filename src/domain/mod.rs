// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Order records and the workflows that place and read them. Remote services
// and storage are reached only through the traits in `clients` and `store`.
//
// ============================================================================

pub mod order;
