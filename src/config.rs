use serde::{Deserialize, Serialize};
use std::env;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub loterie: LoterieConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 允许跨域的来源，留空表示不限制
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// 与宿主商城共享的 JWT 密钥（令牌由商城签发）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expires_in: i64, // seconds
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoterieConfig {
    /// 展示金额的货币代码
    #[serde(default = "default_currency")]
    pub currency: String,
    /// 设置文档首次创建时的默认分页大小
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    #[serde(default = "default_history_limit")]
    pub draw_history_limit: usize,
    #[serde(default = "default_report_limit")]
    pub report_limit: usize,
    #[serde(default = "default_audit_log_limit")]
    pub audit_log_limit: usize,
}

fn default_currency() -> String {
    "EUR".to_string()
}

fn default_page_size() -> u32 {
    25
}

fn default_history_limit() -> usize {
    20
}

fn default_report_limit() -> usize {
    20
}

fn default_audit_log_limit() -> usize {
    200
}

impl Default for LoterieConfig {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            default_page_size: default_page_size(),
            draw_history_limit: default_history_limit(),
            report_limit: default_report_limit(),
            audit_log_limit: default_audit_log_limit(),
        }
    }
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => {
                toml::from_str(&config_str).map_err(|e| format!("解析配置文件失败: {e}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let database_url = get_env("DATABASE_URL")
                    .ok_or("缺少 DATABASE_URL 环境变量，且未找到配置文件 config.toml")?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                        allowed_origins: Vec::new(),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    jwt: JwtConfig {
                        secret: get_env("JWT_SECRET")
                            .unwrap_or_else(|| "change-me-in-production".to_string()),
                        access_token_expires_in: get_env_parse("JWT_ACCESS_EXPIRES_IN", 7200i64),
                    },
                    loterie: LoterieConfig::default(),
                }
            }
            Err(e) => {
                return Err(format!("无法读取配置文件 {config_path}: {e}").into());
            }
        };

        // 环境变量覆盖（即便文件存在时也覆盖）
        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(v) = get_env("SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(p) = get_env("SERVER_PORT").and_then(|v| v.parse().ok()) {
            self.server.port = p;
        }
        if let Some(v) = get_env("CORS_ALLOWED_ORIGINS") {
            self.server.allowed_origins = v
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if let Some(v) = get_env("DATABASE_URL") {
            self.database.url = v;
        }
        if let Some(mc) = get_env("DB_MAX_CONNECTIONS").and_then(|v| v.parse().ok()) {
            self.database.max_connections = mc;
        }
        if let Some(v) = get_env("JWT_SECRET") {
            self.jwt.secret = v;
        }
        if let Some(n) = get_env("JWT_ACCESS_EXPIRES_IN").and_then(|v| v.parse().ok()) {
            self.jwt.access_token_expires_in = n;
        }
        if let Some(v) = get_env("LOTERIE_CURRENCY") {
            self.loterie.currency = v;
        }
        if let Some(n) = get_env("LOTERIE_DEFAULT_PAGE_SIZE").and_then(|v| v.parse().ok()) {
            self.loterie.default_page_size = n;
        }
        if let Some(n) = get_env("LOTERIE_DRAW_HISTORY_LIMIT").and_then(|v| v.parse().ok()) {
            self.loterie.draw_history_limit = n;
        }
        if let Some(n) = get_env("LOTERIE_REPORT_LIMIT").and_then(|v| v.parse().ok()) {
            self.loterie.report_limit = n;
        }
        if let Some(n) = get_env("LOTERIE_AUDIT_LOG_LIMIT").and_then(|v| v.parse().ok()) {
            self.loterie.audit_log_limit = n;
        }
    }

    fn validate(&self) -> AppResult<()> {
        if self.loterie.default_page_size == 0 {
            return Err(AppError::ConfigError(
                "loterie.default_page_size 必须大于 0".to_string(),
            ));
        }
        if self.loterie.draw_history_limit == 0
            || self.loterie.report_limit == 0
            || self.loterie.audit_log_limit == 0
        {
            return Err(AppError::ConfigError(
                "loterie 保留条数上限必须大于 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn get_env(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loterie_section_defaults_when_missing() {
        let raw = r#"
            [server]
            host = "127.0.0.1"
            port = 9000

            [database]
            url = "postgres://localhost/loterie"
            max_connections = 5

            [jwt]
            secret = "s3cret"
            access_token_expires_in = 3600
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.loterie.default_page_size, 25);
        assert_eq!(config.loterie.report_limit, 20);
        assert_eq!(config.loterie.draw_history_limit, 20);
        assert_eq!(config.loterie.audit_log_limit, 200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_limits_rejected() {
        let raw = r#"
            [server]
            host = "127.0.0.1"
            port = 9000

            [database]
            url = "postgres://localhost/loterie"
            max_connections = 5

            [jwt]
            secret = "s3cret"
            access_token_expires_in = 3600

            [loterie]
            audit_log_limit = 0
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert!(config.validate().is_err());
    }
}
