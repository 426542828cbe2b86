//! Exit code registry for the `nasiya` binary.
//!
//! Service managers and scripts key off these, so they are part of the
//! shell contract.
//!
//! | Range   | Domain     | Description                                 |
//! |---------|------------|---------------------------------------------|
//! | 0       | Universal  | Success                                     |
//! | 1       | Universal  | General error (unspecified)                 |
//! | 2       | Universal  | CLI usage error (bad args)                  |
//! | 10-19   | startup    | Configuration and credentials               |
//! | 20-29   | upstream   | Spreadsheet and chat transport unreachable  |

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error. clap exits with this on bad arguments.
#[allow(dead_code)]
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Startup (10-19)
// =============================================================================

/// Config file unreadable or invalid, or a required value missing.
pub const EXIT_CONFIG: u8 = 10;

/// Service-account key missing, unreadable or unusable.
pub const EXIT_CREDENTIALS: u8 = 11;

// =============================================================================
// Upstream (20-29)
// =============================================================================

/// Spreadsheet could not be read at startup (network, auth, permissions).
pub const EXIT_SHEETS: u8 = 20;

/// Chat transport unreachable or refused the bot token.
pub const EXIT_TRANSPORT: u8 = 21;
