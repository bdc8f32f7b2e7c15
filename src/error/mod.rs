pub mod stream;

pub use stream::{RecvError, TryRecvError};
