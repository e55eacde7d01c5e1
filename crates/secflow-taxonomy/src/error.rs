//! Errors raised by symbol allocation and taxonomy versioning.

use thiserror::Error;

use secflow_core::{AccountId, ConfigError, SecflowError, Sector, SequenceNumber, Symbol};

/// Errors from the sector allocator and the versioned taxonomy.
#[derive(Error, Debug)]
pub enum TaxonomyError {
    /// The sector's reserved symbol range is exhausted.
    ///
    /// Recoverable: grow the range with `upgrade_capacity` and retry.
    #[error("sector {sector} exhausted its {capacity} reserved symbols")]
    CapacityExceeded {
        /// The exhausted sector.
        sector: Sector,
        /// Capacity of the sector's range.
        capacity: u32,
    },

    /// The sector has no reserved range.
    #[error("sector {0} has no reserved symbol range")]
    UnknownSector(Sector),

    /// The symbol lies in no sector's range.
    #[error("symbol {0} lies in no sector range")]
    UnrangedSymbol(Symbol),

    /// A capacity change would narrow a range, invalidating issued symbols.
    #[error("cannot shrink {sector} from {current} to {requested} symbols")]
    RangeShrink {
        /// The sector being reconfigured.
        sector: Sector,
        /// Current capacity.
        current: u32,
        /// Requested capacity.
        requested: u32,
    },

    /// A grown range would overlap another sector's range.
    #[error("growing {sector} would overlap the range of {other}")]
    RangeOverlap {
        /// The sector being grown.
        sector: Sector,
        /// The sector whose range would be overlapped.
        other: Sector,
    },

    /// A symbol range failed validation.
    #[error("invalid range for {sector}: {source}")]
    InvalidRange {
        /// The sector being configured.
        sector: Sector,
        /// Underlying validation failure.
        source: SecflowError,
    },

    /// A snapshot was configured at or below the latest published number.
    #[error("snapshot sequence {requested} must be greater than latest {latest}")]
    NonMonotonicSequence {
        /// Requested sequence number.
        requested: SequenceNumber,
        /// Latest published sequence number.
        latest: SequenceNumber,
    },

    /// The account appears in no snapshot at or before the sequence number.
    #[error("account {account} is unmapped at sequence {sequence_number}")]
    UnmappedAccount {
        /// The account looked up.
        account: AccountId,
        /// The sequence number of the lookup.
        sequence_number: SequenceNumber,
    },

    /// No snapshot is in force at the sequence number.
    #[error("no taxonomy snapshot is in force at sequence {0}")]
    NoSnapshot(SequenceNumber),

    /// Allocator configuration was invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Fingerprinting a snapshot failed.
    #[error("fingerprint error: {0}")]
    Fingerprint(#[from] SecflowError),
}
