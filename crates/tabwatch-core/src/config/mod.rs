mod settings;

pub use settings::{
    AlertOption, Command, Config, ConfigAction, ConfigError, DemoScenario, MonitorSettings,
    NotificationSettings, PolicyUpdate, RetrySettings, Settings, MAX_DELAY_SECS,
};
