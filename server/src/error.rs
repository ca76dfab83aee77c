use shared::BuildingKind;
use std::io;
use thiserror::Error;

/// Failures that abort a server operation.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to read local address: {0}")]
    LocalAddr(#[source] io::Error),
    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl ServerError {
    pub fn bind(addr: impl Into<String>, source: io::Error) -> Self {
        ServerError::Bind {
            addr: addr.into(),
            source,
        }
    }
}

/// Business-rule rejections. The display text is sent verbatim as a `STATUS` notice.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("Not enough money to build road!")]
    RoadUnaffordable,
    #[error("Not enough money to build {}! Cost: {cost:.2}", .kind.name())]
    BuildingUnaffordable { kind: BuildingKind, cost: f64 },
    #[error("Unknown building type!")]
    UnknownBuildingKind,
    #[error("Bus route needs at least 2 nodes!")]
    TooFewNodes,
    #[error("Bus route must be fully on roads!")]
    RouteOffRoad,
    #[error("No deletable object found here.")]
    NothingToDelete,
}
