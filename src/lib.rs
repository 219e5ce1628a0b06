//! csv2bufr Library
//!
//! Template-driven conversion of tabular weather observations into WMO BUFR
//! edition 4 messages, one message per CSV data row.
//!
//! This library provides tools for:
//! - Describing a conversion as a JSON template of value expressions
//! - Resolving, validating and scaling each field of a data row
//! - Encoding the resulting key/value state through a pluggable codec
//! - Reporting per-row status, warnings, errors and discovery metadata
//!
//! ```no_run
//! use csv2bufr::{Template, Transform, TransformConfig};
//!
//! # fn main() -> csv2bufr::Result<()> {
//! let template = Template::from_file(std::path::Path::new("aws-template.json"))?;
//! let csv = std::fs::read_to_string("observations.csv")?;
//! for result in Transform::new(&template)
//!     .with_config(TransformConfig::default())
//!     .run(&csv)?
//! {
//!     let result = result?;
//!     println!("{} {:?}", result.identifier, result.status);
//! }
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod constants;
pub mod diagnostics;
pub mod error;
pub mod expression;
pub mod message;
pub mod models;
pub mod template;
pub mod transform;
pub mod validation;

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use codec::{Bufr4Codec, Codec};
pub use config::{NonAsciiPolicy, TransformConfig, ValidationPolicy};
pub use error::{Csv2BufrError, Result};
pub use expression::Expr;
pub use models::{RowResult, RowStatus, Value};
pub use template::{Template, TemplateStore};
pub use transform::{RowResults, Transform, transform};
