use std::{
    any::{Any, TypeId},
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

/// Значение, пригодное для токена канала.
///
/// Реализуется автоматически для любого `Hash + Eq + Debug` типа.
trait TokenValue: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn dyn_eq(
        &self,
        other: &dyn TokenValue,
    ) -> bool;
    fn dyn_hash(
        &self,
        state: &mut dyn Hasher,
    );
    fn dyn_fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result;
}

impl<T> TokenValue for T
where
    T: Hash + Eq + fmt::Debug + Send + Sync + 'static,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(
        &self,
        other: &dyn TokenValue,
    ) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }

    fn dyn_hash(
        &self,
        mut state: &mut dyn Hasher,
    ) {
        TypeId::of::<T>().hash(&mut state);
        self.hash(&mut state);
    }

    fn dyn_fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Токен канала: разделяет регистрации одного типа сообщения на независимые
/// группы доставки.
///
/// `Token::DEFAULT` — неявный канал "без токена". Два токена равны, только
/// если совпадают и тип значения, и само значение: `Token::of(1u8)` и
/// `Token::of(1u32)` — разные каналы.
#[derive(Clone, Default)]
pub struct Token(Option<Arc<dyn TokenValue>>);

impl Token {
    pub const DEFAULT: Token = Token(None);

    pub fn of<T>(value: T) -> Self
    where
        T: Hash + Eq + fmt::Debug + Send + Sync + 'static,
    {
        Token(Some(Arc::new(value)))
    }

    pub fn is_default(&self) -> bool {
        self.0.is_none()
    }

    /// Значение токена, если это токен типа `T`.
    pub fn value<T: 'static>(&self) -> Option<&T> {
        self.0
            .as_ref()
            .and_then(|value| value.as_any().downcast_ref::<T>())
    }
}

impl PartialEq for Token {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        match (&self.0, &other.0) {
            (None, None) => true,
            (Some(a), Some(b)) => a.dyn_eq(b.as_ref()),
            _ => false,
        }
    }
}

impl Eq for Token {}

impl Hash for Token {
    fn hash<H: Hasher>(
        &self,
        state: &mut H,
    ) {
        match &self.0 {
            None => state.write_u8(0),
            Some(value) => {
                state.write_u8(1);
                value.dyn_hash(state);
            }
        }
    }
}

impl fmt::Debug for Token {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match &self.0 {
            None => f.write_str("default"),
            Some(value) => value.dyn_fmt(f),
        }
    }
}

impl From<&'static str> for Token {
    fn from(value: &'static str) -> Self {
        Token::of(value)
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Token::of(value)
    }
}
