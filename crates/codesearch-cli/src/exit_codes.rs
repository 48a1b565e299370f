//! Exit codes for the `codesearch` binary.
//! Client failures exit with `ClientError::exit_code()` (2-7), so 1 only
//! ever means fetch-missing had nothing to do.

pub const SUCCESS: i32 = 0;
pub const NOTHING_RESOLVED: i32 = 1; // fetch-missing found nothing to resolve
pub const INTERNAL_ERROR: i32 = 2; // Usage errors and unexpected failures
pub const FETCH_FAILED: i32 = 5; // fetch-missing left descriptors in place
