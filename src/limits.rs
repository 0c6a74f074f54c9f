//! Hard limits. Everything here is a guard against runaway input, not a
//! tunable.

/// Display names are truncated to this many characters before writing.
pub const MAX_DISPLAY_NAME_LEN: usize = 10;

/// Sync keys longer than this are rejected outright.
pub const MAX_SYNC_KEY_LEN: usize = 64;

/// Upper bound on concurrently loaded sync partitions.
pub const MAX_PARTITIONS: usize = 64;

/// A restore batch (backup import or roster seed) may not exceed this many
/// document writes.
pub const MAX_BATCH_EVENTS: usize = 10_000;
