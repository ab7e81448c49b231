//! Client configuration.

use mysqlx_protocol::DEFAULT_MAX_FRAME_SIZE;

use crate::error::Error;

/// Default X Protocol port.
pub const DEFAULT_PORT: u16 = 33060;

/// Authentication mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMechanism {
    /// Cleartext credentials in `AuthenticateStart`. Only safe over TLS.
    Plain,
    /// Challenge/response with a SHA1 scramble.
    #[default]
    Mysql41,
}

impl AuthMechanism {
    /// Mechanism name sent in `AuthenticateStart`.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::Mysql41 => "MYSQL41",
        }
    }

    /// Parse a mechanism name, ignoring case.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("plain") {
            Some(Self::Plain)
        } else if value.eq_ignore_ascii_case("mysql41") {
            Some(Self::Mysql41)
        } else {
            None
        }
    }
}

/// Configuration for a session.
///
/// This struct is marked `#[non_exhaustive]` to allow adding new fields
/// in future releases without breaking semver. Use [`Config::default()`]
/// or [`Config::from_connection_string()`] to construct instances.
#[derive(Clone)]
#[non_exhaustive]
pub struct Config {
    /// Server hostname or IP address.
    pub host: String,

    /// Server port (default: 33060).
    pub port: u16,

    /// User name.
    pub user: String,

    /// Password.
    pub password: String,

    /// Default schema.
    pub schema: Option<String>,

    /// Authentication mechanism.
    pub auth_mechanism: AuthMechanism,

    /// Rows delivered to a row callback before the stream is suspended.
    /// 0 means unbounded.
    pub prefetch_rows: u64,

    /// Largest inbound frame accepted, in bytes.
    pub max_frame_size: usize,

    /// Ask the server for compact column metadata.
    pub compact_metadata: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            user: String::new(),
            password: String::new(),
            schema: None,
            auth_mechanism: AuthMechanism::default(),
            prefetch_rows: 0,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            compact_metadata: false,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("schema", &self.schema)
            .field("auth_mechanism", &self.auth_mechanism)
            .field("prefetch_rows", &self.prefetch_rows)
            .field("max_frame_size", &self.max_frame_size)
            .field("compact_metadata", &self.compact_metadata)
            .finish()
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("yes") || value == "1" {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") || value.eq_ignore_ascii_case("no") || value == "0"
    {
        Some(false)
    } else {
        None
    }
}

impl Config {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a connection string into configuration.
    ///
    /// ```text
    /// host=db.local;port=33060;user=app;password=secret;schema=shop;auth=mysql41
    /// ```
    pub fn from_connection_string(conn_str: &str) -> Result<Self, Error> {
        let mut config = Self::default();

        for part in conn_str.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| Error::Config(format!("invalid key-value: {part}")))?;

            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "host" | "server" => {
                    // host:port
                    if let Some((host, port)) = value.rsplit_once(':') {
                        config.host = host.to_string();
                        config.port = port
                            .parse()
                            .map_err(|_| Error::Config(format!("invalid port: {port}")))?;
                    } else {
                        config.host = value.to_string();
                    }
                }
                "port" => {
                    config.port = value
                        .parse()
                        .map_err(|_| Error::Config(format!("invalid port: {value}")))?;
                }
                "user" | "uid" => config.user = value.to_string(),
                "password" | "pwd" => config.password = value.to_string(),
                "schema" | "database" => {
                    config.schema = (!value.is_empty()).then(|| value.to_string());
                }
                "auth" => {
                    config.auth_mechanism = AuthMechanism::parse(value).ok_or_else(|| {
                        Error::Config(format!(
                            "invalid auth mechanism: {value}. Supported values: plain, mysql41"
                        ))
                    })?;
                }
                "prefetch" => {
                    config.prefetch_rows = value
                        .parse()
                        .map_err(|_| Error::Config(format!("invalid prefetch: {value}")))?;
                }
                "max_frame_size" => {
                    config.max_frame_size = value
                        .parse()
                        .map_err(|_| Error::Config(format!("invalid max_frame_size: {value}")))?;
                }
                "compact_metadata" => {
                    config.compact_metadata = parse_bool(value).ok_or_else(|| {
                        Error::Config(format!("invalid compact_metadata: {value}"))
                    })?;
                }
                _ => {
                    // Ignore unknown options for forward compatibility
                    tracing::debug!(key = key, "ignoring unknown connection string option");
                }
            }
        }

        Ok(config)
    }

    /// Set the server host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the server port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set user and password.
    #[must_use]
    pub fn credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }

    /// Set the default schema.
    #[must_use]
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Set the authentication mechanism.
    #[must_use]
    pub fn auth_mechanism(mut self, mechanism: AuthMechanism) -> Self {
        self.auth_mechanism = mechanism;
        self
    }

    /// Set the prefetch bound for row callbacks. 0 means unbounded.
    #[must_use]
    pub fn prefetch_rows(mut self, rows: u64) -> Self {
        self.prefetch_rows = rows;
        self
    }

    /// Set the largest inbound frame accepted.
    #[must_use]
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Request compact column metadata.
    #[must_use]
    pub fn compact_metadata(mut self, enabled: bool) -> Self {
        self.compact_metadata = enabled;
        self
    }

    /// Prefetch bound as an option; `None` means unbounded.
    #[must_use]
    pub fn prefetch(&self) -> Option<u64> {
        (self.prefetch_rows > 0).then_some(self.prefetch_rows)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_string_parsing() {
        let config = Config::from_connection_string(
            "host=db.local;user=app;password=secret;schema=shop;auth=PLAIN;",
        )
        .unwrap();

        assert_eq!(config.host, "db.local");
        assert_eq!(config.port, 33060);
        assert_eq!(config.user, "app");
        assert_eq!(config.password, "secret");
        assert_eq!(config.schema.as_deref(), Some("shop"));
        assert_eq!(config.auth_mechanism, AuthMechanism::Plain);
    }

    #[test]
    fn test_connection_string_with_port() {
        let config = Config::from_connection_string("server=localhost:33070").unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 33070);

        let config = Config::from_connection_string("port=3307").unwrap();
        assert_eq!(config.port, 3307);
    }

    #[test]
    fn test_connection_string_tuning() {
        let config = Config::from_connection_string(
            "prefetch=50;max_frame_size=1024;compact_metadata=yes",
        )
        .unwrap();
        assert_eq!(config.prefetch(), Some(50));
        assert_eq!(config.max_frame_size, 1024);
        assert!(config.compact_metadata);
        assert_eq!(Config::default().prefetch(), None);
    }

    #[test]
    fn test_connection_string_errors() {
        for bad in ["host", "port=abc", "auth=kerberos", "prefetch=-1", "compact_metadata=maybe"] {
            assert!(
                matches!(Config::from_connection_string(bad), Err(Error::Config(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let config = Config::from_connection_string("ssl-mode=required;user=x").unwrap();
        assert_eq!(config.user, "x");
    }

    #[test]
    fn test_builder_and_redacted_debug() {
        let config = Config::new()
            .host("h")
            .port(1)
            .credentials("u", "hunter2")
            .schema("s")
            .auth_mechanism(AuthMechanism::Plain)
            .prefetch_rows(3)
            .max_frame_size(10)
            .compact_metadata(true);
        assert_eq!(config.prefetch(), Some(3));
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert_eq!(AuthMechanism::Mysql41.name(), "MYSQL41");
    }
}
