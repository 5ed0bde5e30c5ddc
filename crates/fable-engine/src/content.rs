//! Content loading.
//!
//! The catalog is TOML. Without a configured path the built-in content
//! shipped with the binary is used.

use std::fs;
use std::path::Path;

use fable_battle::Catalog;
use fable_common::ConfigError;
use tracing::info;

/// Built-in content.
pub const DEFAULT_CONTENT: &str = include_str!("../content/default.toml");

/// Parses a catalog. `origin` names the source in errors.
pub fn parse_catalog(source: &str, origin: &str) -> Result<Catalog, ConfigError> {
    toml::from_str(source).map_err(|e| ConfigError::Parse {
        path: origin.to_owned(),
        message: e.to_string(),
    })
}

/// Loads the catalog at `path`, or the built-in one.
pub fn load_catalog(path: Option<&Path>) -> Result<Catalog, ConfigError> {
    let catalog = match path {
        Some(path) => {
            let source = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?;
            parse_catalog(&source, &path.display().to_string())?
        },
        None => parse_catalog(DEFAULT_CONTENT, "<built-in>")?,
    };
    info!(
        "Content: {} actors, {} weapons, {} abilities, {} modifiers, {} teams",
        catalog.actors.len(),
        catalog.weapons.len(),
        catalog.abilities.len(),
        catalog.modifiers.len(),
        catalog.teams.len()
    );
    Ok(catalog)
}
