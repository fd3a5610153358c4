pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong between a config path and a validated
/// `Config`: the file itself, the TOML in it, or a value that passed parsing
/// but cannot run the service (including unresolvable `env:` key references).
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Failed to read config file at {path:?}.")]
	ReadConfig { path: std::path::PathBuf, source: std::io::Error },
	#[error("Failed to parse config file at {path:?}.")]
	ParseConfig { path: std::path::PathBuf, source: toml::de::Error },
	#[error("{message}")]
	Validation { message: String },
}
