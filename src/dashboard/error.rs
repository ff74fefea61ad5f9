use thiserror::Error;

/// Why the registry could not produce a unit for a descriptor. Neither case is
/// fatal: the renderer shows a placeholder instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("dynamic widget '{plugin}' has no cdn_url")]
    MissingLocation { plugin: String },
    #[error("unknown widget type '{widget_type}'")]
    UnknownType { widget_type: String },
}

/// Failure while obtaining a unit's code. Cached per URL for the process
/// lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("failed to fetch '{url}': {reason}")]
    Fetch { url: String, reason: String },
    #[error("bundle '{url}' could not be linked: {reason}")]
    Link { url: String, reason: String },
    #[error("loading '{url}' crashed: {reason}")]
    Crashed { url: String, reason: String },
    #[error("loading '{url}' could not be started: {reason}")]
    Spawn { url: String, reason: String },
}

impl LoadError {
    pub fn fetch(url: &str, reason: impl std::fmt::Display) -> Self {
        LoadError::Fetch {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn link(url: &str, reason: impl std::fmt::Display) -> Self {
        LoadError::Link {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Errors raised while assembling the host capability bundle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("library '{0}' is already published")]
    DuplicateLibrary(String),
    #[error("stateful library '{0}' must be published before plugins run")]
    MissingLibrary(String),
}
