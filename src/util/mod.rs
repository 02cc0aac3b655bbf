//! Utility functions shared by the stores and the command-line front end.
//!
//! - **Base URL validation**: HTTPS enforcement for the API endpoint
//! - **Text processing**: control-character stripping for names and titles,
//!   and Unicode-aware truncation for terminal output
//!
//! # Examples
//!
//! ```
//! use taskflow::util::{clean_text, truncate_to_width};
//!
//! assert_eq!(clean_text("  Errands\x07 "), "Errands");
//! assert_eq!(truncate_to_width("Buy milk and eggs", 10), "Buy mil...");
//! ```

mod text;
mod url_validator;

pub use text::{clean_text, display_width, strip_control_chars, truncate_to_width};
pub use url_validator::{validate_base_url, UrlValidationError};
