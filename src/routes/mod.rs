/// Router Module Index
///
/// Organizes the application's routing logic into security-segregated
/// modules, so access control is visible at the module level rather than
/// scattered across individual route registrations.

/// Routes accessible to all clients (anonymous, read-only).
pub mod public;

/// Routes whose handlers extract and verify a bearer credential and check a
/// named permission before touching the store.
pub mod protected;
