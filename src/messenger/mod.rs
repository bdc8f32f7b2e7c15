//! Внутрипроцессный мессенджер.
//!
//! - `handle`: сильные и слабые ссылки на получателей.
//! - `token`: токены каналов.
//! - `registry`: потокобезопасный индекс регистраций.
//! - `dispatch`: `Messenger` — регистрация, отписка, рассылка.
//! - `recipient`: регистрация через трейт `Recipient<M>`.
//! - `stats`: счётчики рассылки.

mod dispatch;
pub mod handle;
pub mod recipient;
pub mod registry;
pub mod stats;
pub mod token;

use herald_error::StackError;

pub use dispatch::*;
pub use handle::*;
pub use recipient::*;
pub use registry::{Registry, RouteKey, Scope};
pub use stats::*;
pub use token::*;

/// Результат обработчика сообщения.
///
/// Ошибка обработчика останавливает текущую рассылку и возвращается
/// вызывающему `send` без изменений.
pub type HandlerResult = Result<(), StackError>;

/// Мессенджер, владеющий своими получателями.
pub type StrongMessenger = Messenger<StrongRefs>;

/// Мессенджер, не продлевающий жизнь получателей.
pub type WeakMessenger = Messenger<WeakRefs>;
