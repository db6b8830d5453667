//! Crate-wide error type.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised while loading data or building a scene.
#[derive(Debug, Error)]
pub enum GridvizError {
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("fetch of {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("cannot read \"{path}\": {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {source_name}: {source}")]
    Csv {
        source_name: String,
        #[source]
        source: csv::Error,
    },

    #[error("malformed JSON in {source_name}: {source}")]
    Json {
        source_name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid GeoJSON in {source_name}: {source}")]
    GeoJson {
        source_name: String,
        #[source]
        source: geojson::Error,
    },

    #[error("{source_name}: missing column \"{column}\"")]
    MissingColumn { source_name: String, column: String },

    #[error(transparent)]
    Lookup(#[from] LookupMiss),

    #[error("{}", join_config_errors(.0))]
    Config(Vec<ConfigError>),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// No value exists for an entity at a timestep.
///
/// Raised instead of substituting a default when the metric table is
/// incomplete for a rendered entity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no value for \"{entity}\" at timestep {timestep}")]
pub struct LookupMiss {
    pub timestep: usize,
    pub entity: String,
}

fn join_config_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

pub type Result<T> = std::result::Result<T, GridvizError>;
