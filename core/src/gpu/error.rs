use std::sync::Arc;

pub type GraphicsResult<T> = Result<T, GraphicsError>;

#[derive(thiserror::Error, Debug, Clone)]
pub enum GraphicsError {
  #[error("Out of memory")]
  OutOfMemory,
  #[error("{api} call failed: {code}")]
  Backend {
    api: &'static str,
    code: String
  },
  #[error("Unsupported: {0}")]
  Unsupported(String),
  #[error("Invalid shader metadata at line {line}: {message}")]
  ShaderMetadata {
    line: usize,
    message: String
  },
  #[error("Invalid usage: {0}")]
  InvalidUsage(String),
  #[error("No suitable adapter found")]
  NoSuitableAdapter,
  #[error("Invalid config: {0}")]
  Config(String),
  #[error(transparent)]
  Io(Arc<std::io::Error>)
}

impl From<std::io::Error> for GraphicsError {
  fn from(error: std::io::Error) -> Self {
    Self::Io(Arc::new(error))
  }
}

impl From<serde_json::Error> for GraphicsError {
  fn from(error: serde_json::Error) -> Self {
    Self::ShaderMetadata {
      line: error.line(),
      message: error.to_string()
    }
  }
}

impl From<toml::de::Error> for GraphicsError {
  fn from(error: toml::de::Error) -> Self {
    Self::Config(error.to_string())
  }
}
