//! Output generation.
//!
//! # Submodules
//!
//! - [`json`]: Writes reports and article lists to dated JSON files
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! └── 2025-05-06/
//!     ├── report_143012.json
//!     └── election_articles.json
//! ```

pub mod json;
