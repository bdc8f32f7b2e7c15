use std::any::Any;

use herald_error::{ErrorExt, StatusCode};
use thiserror::Error;
use tokio::sync::broadcast;

/// Ошибка при ожидании следующего сообщения потока.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecvError {
    #[error("message stream is closed")]
    Closed,

    #[error("receiver lagged behind by {0} messages")]
    Lagged(u64),
}

/// Ошибка при неблокирующем чтении потока.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TryRecvError {
    #[error("no messages available")]
    Empty,

    #[error("message stream is closed")]
    Closed,

    #[error("receiver lagged behind by {0} messages")]
    Lagged(u64),
}

// === Преобразования ===

impl From<broadcast::error::RecvError> for RecvError {
    fn from(err: broadcast::error::RecvError) -> Self {
        match err {
            broadcast::error::RecvError::Closed => RecvError::Closed,
            broadcast::error::RecvError::Lagged(n) => RecvError::Lagged(n),
        }
    }
}

impl From<broadcast::error::TryRecvError> for TryRecvError {
    fn from(err: broadcast::error::TryRecvError) -> Self {
        match err {
            broadcast::error::TryRecvError::Empty => TryRecvError::Empty,
            broadcast::error::TryRecvError::Closed => TryRecvError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => TryRecvError::Lagged(n),
        }
    }
}

impl ErrorExt for RecvError {
    fn status_code(&self) -> StatusCode {
        match self {
            RecvError::Closed => StatusCode::StreamClosed,
            RecvError::Lagged(_) => StatusCode::StreamLagged,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ErrorExt for TryRecvError {
    fn status_code(&self) -> StatusCode {
        match self {
            TryRecvError::Empty => StatusCode::StreamEmpty,
            TryRecvError::Closed => StatusCode::StreamClosed,
            TryRecvError::Lagged(_) => StatusCode::StreamLagged,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        vec![
            ("error_type", "stream".to_string()),
            ("status_code", self.status_code().to_string()),
        ]
    }
}
