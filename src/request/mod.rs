//! Сообщения-запросы: полезная нагрузка плюс слот для ответа, который
//! заполняют обработчики во время `send`.
//!
//! Реестр не знает о запросах; это обычные сообщения, чей тип задаётся
//! парой (тип ответа, тип нагрузки). Слоты защищены мьютексом, поэтому
//! отвечать можно из обработчика в любом потоке.

pub mod collection;
pub mod deferred;
pub mod deferred_collection;
pub mod single;

pub use collection::CollectionRequestMessage;
pub use deferred::AsyncRequestMessage;
pub use deferred_collection::AsyncCollectionRequestMessage;
pub use single::RequestMessage;
