use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] stubwire_config::Error),

    #[error("failed to read mappings from {}: {source}", path.display())]
    ReadMappings {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Mappings(#[from] stubwire_messaging::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
