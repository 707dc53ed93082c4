use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Store {
    pub url: String,
    pub service_key: String,
}

impl Store {
    pub fn is_configured(&self) -> bool {
        !self.url.is_empty() && !self.service_key.is_empty()
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub store: Store,
}

impl Settings {
    /// Reads the optional TOML file, then layers `REFERRAL_*` environment
    /// variables on top (`REFERRAL_STORE__URL`, `REFERRAL_STORE__SERVICE_KEY`).
    /// Missing or empty store settings are a startup error; the request path
    /// re-checks them at admission time.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("REFERRAL").separator("__"))
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        if !settings.store.is_configured() {
            return Err(ConfigError::Message(
                "store.url and store.service_key must be set".to_string(),
            ));
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use speculoos::prelude::*;

    #[test]
    fn environment_settings() {
        std::env::set_var("REFERRAL_STORE__URL", "http://localhost:54321");
        std::env::set_var("REFERRAL_STORE__SERVICE_KEY", "service-role-key");

        let settings = Settings::load("does-not-exist.toml").unwrap();
        assert_that!(settings.store.url).is_equal_to("http://localhost:54321".to_string());
        assert_that!(settings.store.service_key).is_equal_to("service-role-key".to_string());
        assert_that!(settings.server.host).is_equal_to("0.0.0.0".to_string());
        assert_that!(settings.server.port).is_equal_to(8080);
        assert!(settings.store.is_configured());

        std::env::set_var("REFERRAL_STORE__SERVICE_KEY", "");
        let settings = Settings::load("does-not-exist.toml");
        assert_that!(settings.is_err()).is_true();

        std::env::remove_var("REFERRAL_STORE__URL");
        std::env::remove_var("REFERRAL_STORE__SERVICE_KEY");
    }
}
