mod settings;

pub use settings::{
    BackoffSettings, DispatchConfig, LogStoreConfig, RenderConfig, Settings, SmtpSettings,
    TelemetryConfig, TransportConfig,
};
