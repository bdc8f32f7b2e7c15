use std::fmt;

use herald_error::MessengerError;
use parking_lot::Mutex;

/// Запрос с ровно одним ответом.
///
/// Состояния слота: не отвечен → отвечен. Второй `reply` возвращает
/// `AlreadyReplied`, чтение до первого ответа возвращает `NoReply`.
///
/// Нагрузка `P` различает разные запросы с одинаковым типом ответа:
/// `RequestMessage<User, CurrentUserQuery>` и `RequestMessage<User,
/// UserByIdQuery>` — разные типы сообщений.
pub struct RequestMessage<T, P = ()> {
    payload: P,
    slot: Mutex<Option<T>>,
}

impl<T, P> RequestMessage<T, P> {
    pub fn new(payload: P) -> Self {
        Self {
            payload,
            slot: Mutex::new(None),
        }
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn reply(
        &self,
        value: T,
    ) -> Result<(), MessengerError> {
        let mut slot = self.slot.lock();
        if slot.is_some() {
            return Err(MessengerError::AlreadyReplied);
        }
        *slot = Some(value);
        Ok(())
    }

    pub fn has_received_response(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Копия ответа.
    pub fn response(&self) -> Result<T, MessengerError>
    where
        T: Clone,
    {
        self.slot.lock().clone().ok_or(MessengerError::NoReply)
    }

    /// Забирает ответ, поглощая запрос.
    pub fn into_response(self) -> Result<T, MessengerError> {
        self.slot.into_inner().ok_or(MessengerError::NoReply)
    }
}

impl<T> RequestMessage<T, ()> {
    /// Запрос без нагрузки.
    pub fn empty() -> Self {
        Self::new(())
    }
}

impl<T, P: Default> Default for RequestMessage<T, P> {
    fn default() -> Self {
        Self::new(P::default())
    }
}

impl<T: fmt::Debug, P: fmt::Debug> fmt::Debug for RequestMessage<T, P> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("RequestMessage")
            .field("payload", &self.payload)
            .field("response", &*self.slot.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use herald_error::StatusCode;

    use super::*;
    use crate::messenger::StrongMessenger;

    #[derive(Debug, Clone, PartialEq)]
    struct User {
        name: &'static str,
    }

    struct CurrentUserQuery;

    struct Session;

    #[test]
    fn test_single_reply_then_read() {
        let request = RequestMessage::<u32>::empty();
        assert!(!request.has_received_response());
        request.reply(7).unwrap();
        assert!(request.has_received_response());
        assert_eq!(request.response().unwrap(), 7);
        assert_eq!(request.into_response().unwrap(), 7);
    }

    #[test]
    fn test_second_reply_is_rejected() {
        let request = RequestMessage::<u32>::empty();
        request.reply(1).unwrap();
        assert_eq!(request.reply(2), Err(MessengerError::AlreadyReplied));
        // первый ответ сохраняется
        assert_eq!(request.response().unwrap(), 1);
    }

    #[test]
    fn test_read_without_reply() {
        let request = RequestMessage::<String, ()>::default();
        assert_eq!(request.response(), Err(MessengerError::NoReply));
        assert_eq!(request.into_response(), Err(MessengerError::NoReply));
    }

    #[test]
    fn test_request_through_messenger() {
        let messenger = StrongMessenger::new();
        let session = Arc::new(Session);
        messenger
            .register(
                &session,
                |_: &Session, request: &RequestMessage<User, CurrentUserQuery>| {
                    request.reply(User { name: "ann" })?;
                    Ok(())
                },
            )
            .unwrap();

        let user = messenger
            .send(RequestMessage::<User, CurrentUserQuery>::new(CurrentUserQuery))
            .unwrap()
            .into_response()
            .unwrap();
        assert_eq!(user, User { name: "ann" });
    }

    #[test]
    fn test_two_handlers_replying_fail_the_send() {
        let messenger = StrongMessenger::new();
        let first = Arc::new(Session);
        let second = Arc::new(Session);
        for recipient in [&first, &second] {
            messenger
                .register(recipient, |_: &Session, request: &RequestMessage<u8>| {
                    request.reply(1)?;
                    Ok(())
                })
                .unwrap();
        }

        let err = messenger.send(RequestMessage::<u8>::empty()).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::AlreadyReplied);
    }
}
