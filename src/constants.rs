//! Application constants for the CSV to BUFR encoder
//!
//! Sentinel values, well-known message keys, environment variable names
//! and defaults used throughout the crate.

// =============================================================================
// Missing Value Handling
// =============================================================================

/// Cell contents that are treated as a missing value
pub const MISSING_SENTINELS: &[&str] = &["NA", "NaN", "NAN", "None", ""];

// =============================================================================
// Well-known Message Keys
// =============================================================================

/// Header key carrying the unexpanded descriptor sequence
pub const UNEXPANDED_DESCRIPTORS_KEY: &str = "unexpandedDescriptors";

/// Header key carrying the master table version
pub const MASTER_TABLE_VERSION_KEY: &str = "masterTablesVersionNumber";

/// Replication factor keys, in the order they are applied to a new message
pub const SHORT_REPLICATION_KEY: &str = "inputShortDelayedDescriptorReplicationFactor";
pub const NORMAL_REPLICATION_KEY: &str = "inputDelayedDescriptorReplicationFactor";
pub const EXTENDED_REPLICATION_KEY: &str = "inputExtendedDelayedDescriptorReplicationFactor";

/// Keys used to derive the characteristic date/time of a message
pub mod datetime_keys {
    pub const YEAR: &str = "typicalYear";
    pub const MONTH: &str = "typicalMonth";
    pub const DAY: &str = "typicalDay";
    pub const HOUR: &str = "typicalHour";
    pub const MINUTE: &str = "typicalMinute";
}

/// Keys used to locate the observing station
pub const LATITUDE_KEY: &str = "#1#latitude";
pub const LONGITUDE_KEY: &str = "#1#longitude";

/// Keys surfaced in result properties
pub const ORIGINATING_CENTRE_KEY: &str = "bufrHeaderCentre";
pub const DATA_CATEGORY_KEY: &str = "dataCategory";

// =============================================================================
// WIGOS Station Identifier
// =============================================================================

/// Template key holding the station identifier expression
pub const WIGOS_IDENTIFIER_FIELD: &str = "wigos_station_identifier";

/// Message keys of the four identifier components
pub mod wigos_keys {
    pub const SERIES: &str = "#1#wigosIdentifierSeries";
    pub const ISSUER: &str = "#1#wigosIssuerOfIdentifier";
    pub const ISSUE_NUMBER: &str = "#1#wigosIssueNumber";
    pub const LOCAL: &str = "#1#wigosLocalIdentifierCharacter";
}

/// Derived row columns populated from the station identifier
pub mod wigos_columns {
    pub const SERIES: &str = "_wsi_series";
    pub const ISSUER: &str = "_wsi_issuer";
    pub const ISSUE_NUMBER: &str = "_wsi_issue_number";
    pub const LOCAL: &str = "_wsi_local";
}

/// Prefix of every row identifier
pub const IDENTIFIER_PREFIX: &str = "WIGOS";

// =============================================================================
// Templates and Environment
// =============================================================================

/// Environment variable pointing at a user template directory
pub const TEMPLATES_ENV_VAR: &str = "CSV2BUFR_TEMPLATES";

/// Environment variable toggling nullification of invalid values
pub const NULLIFY_INVALID_ENV_VAR: &str = "CSV2BUFR_NULLIFY_INVALID";

/// Environment variable selecting the non-ASCII row policy
pub const NON_ASCII_ENV_VAR: &str = "CSV2BUFR_NON_ASCII";

/// Application directory name below the user data directory
pub const APP_DIR_NAME: &str = "csv2bufr";

/// Template file extension
pub const TEMPLATE_EXTENSION: &str = "json";

/// Output file extensions
pub const BUFR_EXTENSION: &str = "bufr4";
pub const JSON_EXTENSION: &str = "json";

// =============================================================================
// CSV Defaults
// =============================================================================

pub const DEFAULT_DELIMITER: char = ',';
pub const DEFAULT_QUOTECHAR: char = '"';

/// Python-style quoting mode that disables quote handling
pub const QUOTE_NONE: &str = "QUOTE_NONE";

// =============================================================================
// Template Skeletons
// =============================================================================

/// Master table version used when creating a template without one
pub const DEFAULT_MASTER_TABLE_VERSION: i64 = 37;

/// Column expected to hold the station identifier in generated templates
pub const DEFAULT_WSI_COLUMN: &str = "wsi";
