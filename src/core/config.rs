mod parsing;
mod settings;
mod types;

pub(crate) use types::{ConfigError, Environment, Settings};
#[allow(unused_imports)]
pub(crate) use types::{
    ApiSettings, CorsSettings, ReportSettings, RuntimeSettings, TelemetrySettings,
    UpstreamSettings,
};
