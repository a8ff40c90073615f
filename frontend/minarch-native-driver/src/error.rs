use minarch_config::ConfigError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Failed to load emulator module '{path}': {source}")]
    CoreLoad {
        path: String,
        #[source]
        source: libloading::Error,
    },
    #[error("Emulator module '{path}' is missing required symbol {name}: {source}")]
    MissingSymbol {
        name: &'static str,
        path: String,
        #[source]
        source: libloading::Error,
    },
    #[error("Emulator module refused to load game '{path}'")]
    LoadGame { path: String },
    #[error("Failed to read ROM file at '{path}': {source}")]
    RomRead {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("{0}")]
    Archive(#[from] ArchiveError),
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("Failed to create directory '{path}': {source}")]
    CreateDir {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("I/O error opening save state file '{path}': {source}")]
    StateFileOpen {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("I/O error writing save state file '{path}': {source}")]
    StateFileWrite {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Emulator module failed to serialize state")]
    StateSerialize,
    #[error("Emulator module rejected state data from '{path}'")]
    StateRestore { path: String },
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("I/O error reading archive file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Error reading .zip archive '{path}': {source}")]
    Zip {
        path: String,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("Encrypted entry '{name}' in .zip archive '{path}'")]
    Encrypted { path: String, name: String },
    #[error("No supported files found in .zip archive '{path}'")]
    NoSupportedFiles { path: String },
}

pub type DriverResult<T> = Result<T, DriverError>;
