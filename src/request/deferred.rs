use std::{
    fmt,
    future::{Future, IntoFuture},
};

use futures::{
    future::{self, BoxFuture},
    FutureExt,
};
use herald_error::MessengerError;
use parking_lot::Mutex;

/// Запрос с одним отложенным ответом.
///
/// Обработчик отвечает future, а не значением. Ошибки `AlreadyReplied` и
/// `NoReply` проверяются в момент вызова `reply` и `into_response`, а не при
/// разрешении future.
pub struct AsyncRequestMessage<T, P = ()> {
    payload: P,
    slot: Mutex<Option<BoxFuture<'static, T>>>,
}

impl<T: Send + 'static, P> AsyncRequestMessage<T, P> {
    pub fn new(payload: P) -> Self {
        Self {
            payload,
            slot: Mutex::new(None),
        }
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn reply<F>(
        &self,
        response: F,
    ) -> Result<(), MessengerError>
    where
        F: Future<Output = T> + Send + 'static,
    {
        let mut slot = self.slot.lock();
        if slot.is_some() {
            return Err(MessengerError::AlreadyReplied);
        }
        *slot = Some(response.boxed());
        Ok(())
    }

    /// Ответ уже готовым значением.
    pub fn reply_value(
        &self,
        value: T,
    ) -> Result<(), MessengerError> {
        self.reply(future::ready(value))
    }

    pub fn has_received_response(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Future ответа. Без ответа сразу возвращает `NoReply`.
    pub fn into_response(self) -> Result<BoxFuture<'static, T>, MessengerError> {
        self.slot.into_inner().ok_or(MessengerError::NoReply)
    }
}

impl<T: Send + 'static> AsyncRequestMessage<T, ()> {
    pub fn empty() -> Self {
        Self::new(())
    }
}

impl<T: Send + 'static, P: Default> Default for AsyncRequestMessage<T, P> {
    fn default() -> Self {
        Self::new(P::default())
    }
}

/// `request.await` вместо `request.into_response()?.await`.
impl<T: Send + 'static, P> IntoFuture for AsyncRequestMessage<T, P> {
    type Output = Result<T, MessengerError>;
    type IntoFuture = BoxFuture<'static, Result<T, MessengerError>>;

    fn into_future(self) -> Self::IntoFuture {
        match self.into_response() {
            Ok(response) => response.map(Ok).boxed(),
            Err(err) => future::ready(Err(err)).boxed(),
        }
    }
}

impl<T, P: fmt::Debug> fmt::Debug for AsyncRequestMessage<T, P> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("AsyncRequestMessage")
            .field("payload", &self.payload)
            .field("replied", &self.slot.lock().is_some())
            .finish()
    }
}
