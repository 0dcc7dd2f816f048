use thiserror::Error;

use crate::doc::ShapeError;
use crate::engine::EngineError;
use crate::host::HostError;
use crate::ops::TableOpError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Host(#[from] HostError),
    #[error(transparent)]
    TableOp(#[from] TableOpError),
    #[error("invalid document: {0}")]
    Document(#[from] ShapeError),
    #[error("invalid overlay config: {0}")]
    Config(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
