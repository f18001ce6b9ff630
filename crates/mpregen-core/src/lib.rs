//! mpregen Core
//!
//! Shared types for the genhdr regeneration pipeline: the extracted build
//! configuration, the marker categories, and the fixed genhdr file layout.

pub mod category;
pub mod config;
pub mod layout;

pub use category::Category;
pub use config::{ArchProfile, BuildConfig, MacroDefinition};
pub use layout::GenhdrLayout;
