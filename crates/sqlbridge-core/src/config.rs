//! Database connection parameters

use serde::Serialize;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 3306;
pub const DEFAULT_USER: &str = "root";
pub const DEFAULT_PASSWORD: &str = "root@123";
pub const DEFAULT_DATABASE: &str = "test01";
pub const DEFAULT_CHARSET: &str = "utf8mb4";

/// Placeholder shown instead of an empty password
const EMPTY_PASSWORD_MARKER: &str = "Empty";

/// Parameters for opening sessions against one database.
///
/// Immutable once built: every `with_*` method consumes and returns the
/// configuration. The password is masked in `Debug` output and in
/// [`DatabaseConfig::masked`].
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    host: String,
    port: u16,
    user: String,
    password: String,
    database: String,
    charset: String,
    autocommit: bool,
}

impl DatabaseConfig {
    /// Create a configuration with the built-in defaults
    pub fn new() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            user: DEFAULT_USER.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            charset: DEFAULT_CHARSET.to_string(),
            autocommit: true,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    pub fn with_autocommit(mut self, autocommit: bool) -> Self {
        self.autocommit = autocommit;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// The clear-text password. Only drivers should call this.
    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn charset(&self) -> &str {
        &self.charset
    }

    pub fn autocommit(&self) -> bool {
        self.autocommit
    }

    /// Check that the settings can plausibly open a session.
    ///
    /// An empty password is allowed but reported with a warning.
    pub fn validate(&self) -> crate::Result<()> {
        if self.password.is_empty() {
            tracing::warn!(
                user = %self.user,
                "database password is empty, make sure this is intended"
            );
        }
        if self.host.trim().is_empty() {
            return Err(crate::DbError::Configuration("host must not be empty".into()));
        }
        if self.user.trim().is_empty() {
            return Err(crate::DbError::Configuration("user must not be empty".into()));
        }
        if self.charset.is_empty()
            || !self
                .charset
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(crate::DbError::Configuration(format!(
                "invalid charset '{}'",
                self.charset
            )));
        }
        Ok(())
    }

    /// A view that is safe to log or return to callers
    pub fn masked(&self) -> MaskedDatabaseConfig {
        MaskedDatabaseConfig {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password: mask_password(&self.password),
            database: self.database.clone(),
            charset: self.charset.clone(),
            autocommit: self.autocommit,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &mask_password(&self.password))
            .field("database", &self.database)
            .field("charset", &self.charset)
            .field("autocommit", &self.autocommit)
            .finish()
    }
}

/// Serializable configuration with the password replaced by a placeholder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaskedDatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub charset: String,
    pub autocommit: bool,
}

/// One `*` per password character, or `Empty` for no password
pub fn mask_password(password: &str) -> String {
    if password.is_empty() {
        EMPTY_PASSWORD_MARKER.to_string()
    } else {
        "*".repeat(password.chars().count())
    }
}
