//! Готовые типы сообщений для уведомлений об изменении свойств.
//!
//! Компонент наблюдаемых свойств рассылает их через `send`, когда
//! отслеживаемое поле меняется и запрошена широковещательная рассылка.

use std::borrow::Cow;

use crate::messenger::{AsRecipientId, RecipientId};

/// Свойство `property_name` объекта `sender` изменилось с `old_value` на
/// `new_value`.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyChangedMessage<T> {
    sender: RecipientId,
    property_name: Cow<'static, str>,
    old_value: T,
    new_value: T,
}

impl<T> PropertyChangedMessage<T> {
    pub fn new(
        sender: &impl AsRecipientId,
        property_name: impl Into<Cow<'static, str>>,
        old_value: T,
        new_value: T,
    ) -> Self {
        Self {
            sender: sender.recipient_id(),
            property_name: property_name.into(),
            old_value,
            new_value,
        }
    }

    /// Идентичность объекта, чьё свойство изменилось.
    pub fn sender(&self) -> RecipientId {
        self.sender
    }

    pub fn property_name(&self) -> &str {
        &self.property_name
    }

    pub fn old_value(&self) -> &T {
        &self.old_value
    }

    pub fn new_value(&self) -> &T {
        &self.new_value
    }
}

/// Новое значение без сведений об источнике.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ValueChangedMessage<T> {
    value: T,
}

impl<T> ValueChangedMessage<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::messenger::{HandlerResult, StrongMessenger};

    struct Settings {
        theme: Mutex<String>,
    }

    #[derive(Default)]
    struct Audit {
        changes: Mutex<Vec<String>>,
    }

    impl Settings {
        fn set_theme(
            self: &Arc<Self>,
            messenger: &StrongMessenger,
            theme: &str,
        ) -> HandlerResult {
            let old = std::mem::replace(&mut *self.theme.lock().unwrap(), theme.to_string());
            messenger.send(PropertyChangedMessage::new(
                self,
                "theme",
                old,
                theme.to_string(),
            ))?;
            Ok(())
        }
    }

    #[test]
    fn test_property_change_broadcast() {
        let messenger = StrongMessenger::new();
        let settings = Arc::new(Settings {
            theme: Mutex::new("light".to_string()),
        });
        let audit = Arc::new(Audit::default());
        let expected_sender = RecipientId::of(&*settings);

        messenger
            .register(
                &audit,
                move |audit: &Audit, msg: &PropertyChangedMessage<String>| {
                    assert_eq!(msg.sender(), expected_sender);
                    audit.changes.lock().unwrap().push(format!(
                        "{}: {} -> {}",
                        msg.property_name(),
                        msg.old_value(),
                        msg.new_value()
                    ));
                    Ok(())
                },
            )
            .unwrap();

        settings.set_theme(&messenger, "dark").unwrap();
        assert_eq!(
            *audit.changes.lock().unwrap(),
            vec!["theme: light -> dark".to_string()]
        );
    }

    #[test]
    fn test_value_changed_is_typed_by_payload() {
        let messenger = StrongMessenger::new();
        let audit = Arc::new(Audit::default());
        messenger
            .register(&audit, |audit: &Audit, msg: &ValueChangedMessage<u32>| {
                audit.changes.lock().unwrap().push(msg.value().to_string());
                Ok(())
            })
            .unwrap();

        messenger.send(ValueChangedMessage::new(5u32)).unwrap();
        // другой тип значения — другой тип сообщения
        messenger.send(ValueChangedMessage::new(5i64)).unwrap();
        assert_eq!(*audit.changes.lock().unwrap(), vec!["5".to_string()]);
    }
}
