//! Output generation for the dashboard layer.
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! ├── 2025-11-26/
//! │   └── feed.json
//! └── latest.json
//! ```

pub mod json;
