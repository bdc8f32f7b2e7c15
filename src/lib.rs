/// Settings loading: messenger tuning and logging, with `HERALD_` overrides.
pub mod config;
/// Stream errors for observed message types.
pub mod error;
/// Flexible logging (formatting, filters, file sink).
pub mod logging;
/// Ready-made property and value change messages.
pub mod messages;
/// Messenger core: recipients, tokens, registry, dispatch.
pub mod messenger;
/// Message types as async streams.
pub mod observable;
/// Request messages with single and collection replies.
pub mod request;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// Error crate, re-exported for handlers and macros.
pub use herald_error;
/// Contract errors and the handler error type.
pub use herald_error::{HeraldResult, MessengerError, StackError, StatusCode};

/// config
pub use config::{MessengerConfig, Settings};
/// Stream errors.
pub use error::{RecvError, TryRecvError};
/// Logging setup.
pub use logging::{init_logging, LogFormat, LoggingConfig, LoggingHandle};
/// Change notifications.
pub use messages::{PropertyChangedMessage, ValueChangedMessage};
/// Messenger API.
pub use messenger::{
    AsRecipientId, HandlerResult, Messenger, MessengerStatsSnapshot, Recipient, RecipientId,
    RegistrationBuilder, StrongMessenger, StrongRefs, Token, WeakMessenger, WeakRefs,
};
/// Observable streams.
pub use observable::{MessageListener, MessageStream};
/// Request messages.
pub use request::{
    AsyncCollectionRequestMessage, AsyncRequestMessage, CollectionRequestMessage, RequestMessage,
};
