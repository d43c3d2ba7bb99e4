use thiserror::Error;

/// Top-level error type surfaced by the binary.
#[derive(Error, Debug)]
pub enum AppenderError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::app::ConfigError),

    #[error("Logging setup error: {0}")]
    Logging(#[from] crate::app::InitializationError),

    #[error("Document mapping error: {0}")]
    Mapping(#[from] crate::document::MappingError),

    #[error("Engine error: {0}")]
    Engine(#[from] crate::engine::EngineError),

    #[error("Transport error: {0}")]
    Transport(#[from] crate::sender::ConnectionError),

    #[error("Input error: {0}")]
    Input(#[from] std::io::Error),
}
