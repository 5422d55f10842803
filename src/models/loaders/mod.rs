pub mod toml_loader;

pub use toml_loader::{load_catalog_or_builtin, load_section_catalog, parse_section_catalog};
