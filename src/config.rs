// src/config.rs
use super::error::ConfigError;
use std::time::Duration;
use url::Url;

pub const MEMORY_DATABASE: &str = "memory";

#[derive(Clone, Debug)]
pub struct Config {
    pub listen_addr: String,
    /// `sqlite:` URL，或者 `memory` 表示不落盘
    pub database_url: String,
    pub viber_api_url: String,
    pub viber_token: String,
    pub bot_name: String,
    pub bot_avatar: String,
    /// 配置后启动时向 Viber 注册 webhook
    pub webhook_url: Option<String>,
    pub verify_signatures: bool,
    /// 管理员的 Viber id，收到每条用户消息的副本
    pub admin_id: Option<String>,
    /// 服务消息接口 (`{SERVER_ADDR}sendservicemessage`)
    pub service_endpoint: Option<Url>,
    pub service_secret: String,
    /// 1 = 逐个发送；大于 1 时为并发上限
    pub fanout_concurrency: usize,
    pub http_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
            database_url: "sqlite:./data/inventories.db".to_string(),
            viber_api_url: "https://chatapi.viber.com/pa".to_string(),
            viber_token: String::new(),
            bot_name: "Описи".to_string(),
            bot_avatar: "http://viber.com/avatar.jpg".to_string(),
            webhook_url: None,
            verify_signatures: true,
            admin_id: None,
            service_endpoint: None,
            service_secret: String::new(),
            fanout_concurrency: 1,
            http_timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意 key/value 来源构建配置，空字符串视为未设置。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let viber_token = get("TOKEN").ok_or(ConfigError::Missing("TOKEN"))?;

        let service_endpoint = match get("SERVER_ADDR") {
            Some(base) => Some(
                Url::parse(&format!("{}sendservicemessage", base)).map_err(|source| {
                    ConfigError::InvalidUrl {
                        var: "SERVER_ADDR",
                        source,
                    }
                })?,
            ),
            None => None,
        };

        let fanout_concurrency = match get("FANOUT_CONCURRENCY") {
            Some(v) => parse_number("FANOUT_CONCURRENCY", &v)?,
            None => defaults.fanout_concurrency,
        };
        let http_timeout = match get("HTTP_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(parse_number("HTTP_TIMEOUT_SECS", &v)?),
            None => defaults.http_timeout,
        };
        let verify_signatures = match get("VERIFY_SIGNATURE") {
            Some(v) => match v.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: "VERIFY_SIGNATURE",
                        value: v,
                    })
                }
            },
            None => defaults.verify_signatures,
        };

        Ok(Self {
            listen_addr: get("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            database_url: get("DATABASE_URL").unwrap_or(defaults.database_url),
            viber_api_url: get("VIBER_API_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.viber_api_url),
            viber_token,
            bot_name: get("BOT_NAME").unwrap_or(defaults.bot_name),
            bot_avatar: get("BOT_AVATAR").unwrap_or(defaults.bot_avatar),
            webhook_url: get("WEBHOOK_URL"),
            verify_signatures,
            admin_id: get("ADMIN_ID"),
            service_endpoint,
            service_secret: get("SECRET").unwrap_or_default(),
            fanout_concurrency,
            http_timeout,
        })
    }
}

fn parse_number<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        var,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn token_is_required() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("TOKEN")));
    }

    #[test]
    fn defaults_fill_unset_values() {
        let config = Config::from_lookup(lookup(&[("TOKEN", "abc")])).unwrap();
        assert_eq!(config.viber_token, "abc");
        assert_eq!(config.fanout_concurrency, 1);
        assert!(config.service_endpoint.is_none());
        assert!(config.verify_signatures);
        assert_eq!(config.bot_name, "Описи");
    }

    #[test]
    fn service_endpoint_is_appended_to_server_addr() {
        let config = Config::from_lookup(lookup(&[
            ("TOKEN", "abc"),
            ("SERVER_ADDR", "http://alerts.local:8080/"),
            ("FANOUT_CONCURRENCY", "4"),
        ]))
        .unwrap();
        assert_eq!(
            config.service_endpoint.unwrap().as_str(),
            "http://alerts.local:8080/sendservicemessage"
        );
        assert_eq!(config.fanout_concurrency, 4);
    }

    #[test]
    fn bad_numbers_are_rejected() {
        let err = Config::from_lookup(lookup(&[("TOKEN", "abc"), ("FANOUT_CONCURRENCY", "many")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                var: "FANOUT_CONCURRENCY",
                ..
            }
        ));
    }
}
