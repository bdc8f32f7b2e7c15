//! Регистрация через трейт `Recipient<M>`: получатель объявляет по одной
//! реализации на каждый тип сообщения, который он обрабатывает, а
//! [`register_recipients!`](crate::register_recipients) регистрирует их все
//! одним вызовом.

use std::sync::Arc;

use herald_error::MessengerError;

use super::{HandlerResult, Messenger, ReferencePolicy, Token};

/// Получатель сообщений типа `M`.
pub trait Recipient<M: 'static>: Send + Sync + 'static {
    fn receive(
        &self,
        message: &M,
    ) -> HandlerResult;
}

impl<P: ReferencePolicy> Messenger<P> {
    /// Регистрирует `R::receive` как обработчик `M` на канале без токена.
    pub fn register_recipient<M, R>(
        &self,
        recipient: &Arc<R>,
    ) -> Result<(), MessengerError>
    where
        M: 'static,
        R: Recipient<M>,
    {
        self.register_recipient_with_token::<M, R>(recipient, Token::DEFAULT)
    }

    pub fn register_recipient_with_token<M, R>(
        &self,
        recipient: &Arc<R>,
        token: impl Into<Token>,
    ) -> Result<(), MessengerError>
    where
        M: 'static,
        R: Recipient<M>,
    {
        self.register_with_token(recipient, token, |recipient: &R, message: &M| {
            recipient.receive(message)
        })
    }
}

/// Регистрирует реализации `Recipient<M>` получателя для каждого
/// перечисленного типа сообщения.
///
/// Останавливается на первой ошибке; уже выполненные регистрации не
/// откатываются.
///
/// ```ignore
/// register_recipients!(messenger, &view, [UserLoggedIn, ThemeChanged])?;
/// register_recipients!(messenger, &view, [Refresh], token = "sidebar")?;
/// ```
#[macro_export]
macro_rules! register_recipients {
    ($messenger:expr, $recipient:expr, [$($message:ty),+ $(,)?]) => {
        $crate::register_recipients!(
            $messenger,
            $recipient,
            [$($message),+],
            token = $crate::messenger::Token::DEFAULT
        )
    };
    ($messenger:expr, $recipient:expr, [$($message:ty),+ $(,)?], token = $token:expr) => {{
        let messenger = &$messenger;
        let recipient = $recipient;
        let token: $crate::messenger::Token = ::std::convert::Into::into($token);
        ::std::result::Result::<(), $crate::herald_error::MessengerError>::Ok(())
            $(.and_then(|()| {
                messenger.register_recipient_with_token::<$message, _>(recipient, token.clone())
            }))+
    }};
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use herald_error::{bail, StatusCode};

    use super::*;
    use crate::messenger::{StrongMessenger, WeakMessenger};

    #[derive(Debug)]
    struct LoggedIn(&'static str);

    struct LoggedOut;

    #[derive(Default)]
    struct SessionView {
        events: Mutex<Vec<String>>,
    }

    impl Recipient<LoggedIn> for SessionView {
        fn receive(
            &self,
            message: &LoggedIn,
        ) -> HandlerResult {
            if message.0.is_empty() {
                bail!(StatusCode::InvalidArgs, "empty user name");
            }
            self.events.lock().unwrap().push(format!("in:{}", message.0));
            Ok(())
        }
    }

    impl Recipient<LoggedOut> for SessionView {
        fn receive(
            &self,
            _: &LoggedOut,
        ) -> HandlerResult {
            self.events.lock().unwrap().push("out".to_string());
            Ok(())
        }
    }

    #[test]
    fn test_register_recipient_dispatches_to_receive() {
        let messenger = StrongMessenger::new();
        let view = Arc::new(SessionView::default());
        messenger.register_recipient::<LoggedIn, _>(&view).unwrap();

        messenger.send(LoggedIn("ann")).unwrap();
        assert_eq!(*view.events.lock().unwrap(), vec!["in:ann".to_string()]);

        let err = messenger.send(LoggedIn("")).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::InvalidArgs);
    }

    #[test]
    fn test_macro_registers_every_listed_type() {
        let messenger = WeakMessenger::new();
        let view = Arc::new(SessionView::default());
        register_recipients!(messenger, &view, [LoggedIn, LoggedOut]).unwrap();

        assert!(messenger.is_registered::<LoggedIn>(&view));
        assert!(messenger.is_registered::<LoggedOut>(&view));

        messenger.send(LoggedIn("bob")).unwrap();
        messenger.send(LoggedOut).unwrap();
        assert_eq!(
            *view.events.lock().unwrap(),
            vec!["in:bob".to_string(), "out".to_string()]
        );
    }

    #[test]
    fn test_macro_with_token() {
        let messenger = StrongMessenger::new();
        let view = Arc::new(SessionView::default());
        register_recipients!(messenger, &view, [LoggedOut], token = "admin").unwrap();

        messenger.send(LoggedOut).unwrap();
        assert!(view.events.lock().unwrap().is_empty());

        messenger
            .send_with_token(LoggedOut, &Token::from("admin"))
            .unwrap();
        assert_eq!(view.events.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_macro_stops_on_duplicate() {
        let messenger = StrongMessenger::new();
        let view = Arc::new(SessionView::default());
        messenger.register_recipient::<LoggedIn, _>(&view).unwrap();

        let err = register_recipients!(messenger, &view, [LoggedIn, LoggedOut]).unwrap_err();
        assert!(matches!(err, MessengerError::DuplicateRegistration { .. }));
        assert!(!messenger.is_registered::<LoggedOut>(&view));
    }
}
