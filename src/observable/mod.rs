//! Тип сообщения как асинхронный поток.
//!
//! `observe` регистрирует в мессенджере служебного получателя, который
//! пересылает копии сообщений в `tokio::sync::broadcast`. Отписка
//! выполняется `dispose()` или при drop потока.

mod stream;

pub use stream::{MessageListener, MessageStream};
