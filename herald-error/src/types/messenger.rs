use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибки нарушения контракта мессенджера.
///
/// Все варианты — локальные синхронные ошибки, возникающие в месте
/// неправильного вызова; внутри мессенджера они не повторяются.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessengerError {
    #[error("required argument `{argument}` is missing")]
    NullArgument { argument: &'static str },

    #[error("recipient {recipient} is already registered for {message_type} on channel {token}")]
    DuplicateRegistration {
        recipient: String,
        message_type: &'static str,
        token: String,
    },

    #[error("no reply was received for the request message")]
    NoReply,

    #[error("a reply has already been provided for the request message")]
    AlreadyReplied,
}

impl MessengerError {
    pub fn null_argument(argument: &'static str) -> Self {
        Self::NullArgument { argument }
    }
}

impl ErrorExt for MessengerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NullArgument { .. } => StatusCode::InvalidArgs,
            Self::DuplicateRegistration { .. } => StatusCode::AlreadyExists,
            Self::NoReply => StatusCode::NoReply,
            Self::AlreadyReplied => StatusCode::AlreadyReplied,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        let mut tags = vec![
            ("error_type", "messenger".to_string()),
            ("status_code", self.status_code().to_string()),
        ];

        if let Self::DuplicateRegistration { message_type, .. } = self {
            tags.push(("message_type", message_type.to_string()));
        }

        tags
    }
}
