use super::parsing::{
    env_optional, env_or_default, is_http_url, parse_bool, parse_cors_origins, parse_environment,
    parse_tag_order, parse_u32, parse_u64, DEFAULT_TAG_ORDER,
};
use super::types::{
    ApiSettings, ConfigError, CorsSettings, ReportSettings, RuntimeSettings, ServerHost,
    ServerPort, ServerSettings, Settings, TelemetrySettings, UpstreamSettings,
};

const MAX_UPSTREAM_RETRIES: u32 = 10;

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("MARKING_HOST", "0.0.0.0");
        let port = env_or_default("MARKING_PORT", "8080");

        let environment = parse_environment(env_optional("MARKING_ENV"));

        let project_name = env_or_default("PROJECT_NAME", "Exam Marking API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let base_url = env_or_default("UPSTREAM_BASE_URL", "http://localhost:4000");
        let api_token = env_optional("UPSTREAM_API_TOKEN");
        let timeout_seconds = parse_u64(
            "UPSTREAM_TIMEOUT_SECONDS",
            env_or_default("UPSTREAM_TIMEOUT_SECONDS", "30"),
        )?;
        let max_retries =
            parse_u32("UPSTREAM_MAX_RETRIES", env_or_default("UPSTREAM_MAX_RETRIES", "3"))?;
        let page_size = parse_u32("MARKS_PAGE_SIZE", env_or_default("MARKS_PAGE_SIZE", "10"))?;

        let tag_order = parse_tag_order(&env_or_default("REPORT_TAG_ORDER", DEFAULT_TAG_ORDER));

        let log_level = env_or_default("MARKING_LOG_LEVEL", "info");
        let json = env_optional("MARKING_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment },
            api: ApiSettings { project_name, version, api_v1_str },
            cors: CorsSettings { origins: cors_origins },
            upstream: UpstreamSettings {
                base_url: base_url.trim_end_matches('/').to_string(),
                api_token,
                timeout_seconds,
                max_retries,
                page_size,
            },
            report: ReportSettings { tag_order },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn upstream(&self) -> &UpstreamSettings {
        &self.upstream
    }

    pub(crate) fn report(&self) -> &ReportSettings {
        &self.report
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !is_http_url(&self.upstream.base_url) {
            return Err(ConfigError::InvalidUrl {
                field: "UPSTREAM_BASE_URL",
                value: self.upstream.base_url.clone(),
            });
        }

        if self.upstream.max_retries > MAX_UPSTREAM_RETRIES {
            return Err(ConfigError::InvalidValue {
                field: "UPSTREAM_MAX_RETRIES",
                value: self.upstream.max_retries.to_string(),
            });
        }

        if self.upstream.page_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "MARKS_PAGE_SIZE",
                value: "0".to_string(),
            });
        }

        if self.report.tag_order.iter().any(|tag| tag.is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "REPORT_TAG_ORDER",
                value: self.report.tag_order.join(","),
            });
        }

        if self.runtime.environment.is_production() && self.upstream.api_token.is_none() {
            tracing::warn!("UPSTREAM_API_TOKEN is not set; upstream calls are unauthenticated");
        }

        Ok(())
    }
}
