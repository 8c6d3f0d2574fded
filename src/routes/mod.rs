/// Router Module Index
///
/// Routes are split by access level so that protection is applied once, as a
/// layer on the whole sub-router, rather than per handler.

/// Routes open to anonymous callers: reads, sign-in flow and token rotation.
pub mod public;

/// Content writes. Wrapped in authentication plus the admin role gate.
pub mod authenticated;
