//! Asset selection module
//!
//! This module decides which file of a release is downloaded for a package,
//! based on the package's `release_asset_filter`.

mod picker;

pub use picker::AssetFilter;
