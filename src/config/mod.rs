mod settings;

pub use settings::{MessengerConfig, Settings, ENV_PREFIX};
