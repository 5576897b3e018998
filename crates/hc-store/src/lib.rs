//! Persistence for `hc-core` hypercubes: the versioned `.hcube` container,
//! TOML config loading, and a directory-backed catalog.

pub mod catalog;
pub mod config;
pub mod container;
pub mod error;

pub use catalog::{Catalog, default_base_dir};
pub use config::{load_config, parse_config};
pub use container::{
    DEFAULT_COMPRESSION_LEVEL, FORMAT_TAG, decode, decode_with_config, encode, export_json,
    import_json, load, load_matching, save,
};
pub use error::{Result, StoreError};
