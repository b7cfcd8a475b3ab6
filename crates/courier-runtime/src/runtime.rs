//! Runtime assembly.
//!
//! The runtime loads configuration, installs logging and freezes the handler
//! registry into a ready [`Broker`].
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use courier_core::prelude::*;
//! use courier_runtime::CourierRuntime;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = HandlerRegistry::new().named_request(
//!     "cart_add",
//!     |_: &mut Payload| -> HandlerResult { Ok(()) },
//!     [Declaration::request_intercept(["commerce:CART_ADD"])],
//! )?;
//!
//! let runtime = CourierRuntime::builder()
//!     .config_file("config/courier.toml")
//!     .profile("production")
//!     .registry(registry)
//!     .build()?;
//!
//! let output = runtime.handle_invocation(r#"{"eventType":"X","eventTime":0}"#, "req-1")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use courier_core::{Broker, BrokerResult, HandlerRegistry};
use figment::Provider;
use tracing::{debug, info};

use crate::config::{ConfigLoader, CourierConfig, validate_config};
use crate::error::{LoggingError, RuntimeResult};
use crate::logging;

/// A configured broker plus the configuration it was built from.
#[derive(Debug)]
pub struct CourierRuntime {
    config: CourierConfig,
    broker: Broker,
}

impl CourierRuntime {
    /// Creates a runtime builder.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from an already loaded configuration.
    ///
    /// Logging is initialized from `config.logging` unless a global subscriber
    /// is already installed.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the log file cannot
    /// be opened.
    pub fn from_config(config: CourierConfig, registry: HandlerRegistry) -> RuntimeResult<Self> {
        Self::assemble(config, registry, true)
    }

    fn assemble(
        config: CourierConfig,
        registry: HandlerRegistry,
        init_logging: bool,
    ) -> RuntimeResult<Self> {
        validate_config(&config)?;

        if init_logging {
            match logging::init_from_config(&config.logging) {
                Ok(()) => {}
                Err(LoggingError::Init(_)) => debug!("Global subscriber already installed"),
                Err(err) => return Err(err.into()),
            }
        }

        let handlers = registry.len();
        let broker = Broker::new(config.broker.clone(), registry.build());

        info!(
            handlers,
            passthrough = config.broker.passthrough,
            propagate_exceptions = config.broker.propagate_exceptions,
            namespace = %config.broker.namespace,
            "Courier runtime ready"
        );

        Ok(Self { config, broker })
    }

    /// Returns the loaded configuration.
    pub fn config(&self) -> &CourierConfig {
        &self.config
    }

    /// Returns the broker.
    pub fn broker(&self) -> &Broker {
        &self.broker
    }

    /// Handles one raw envelope.
    ///
    /// # Errors
    ///
    /// See [`Broker::handle`].
    pub fn handle(&self, raw: &str) -> BrokerResult<String> {
        self.broker.handle(raw)
    }

    /// Handles one raw envelope tagged with the host's invocation id.
    ///
    /// # Errors
    ///
    /// See [`Broker::handle`].
    pub fn handle_invocation(&self, raw: &str, request_id: &str) -> BrokerResult<String> {
        self.broker.handle_invocation(raw, request_id)
    }
}

/// Builder for [`CourierRuntime`].
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    registry: HandlerRegistry,
    init_logging: bool,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder searching the current directory.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
            registry: HandlerRegistry::new(),
            init_logging: true,
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "local", "production").
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Enables loading environment variables (enabled by default).
    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges additional configuration programmatically.
    ///
    /// Only the keys `provider` sets override files and the environment.
    pub fn merge<T: Provider>(mut self, provider: T) -> Self {
        self.config_loader = self.config_loader.merge(provider);
        self
    }

    /// Sets the handlers the broker dispatches to.
    pub fn registry(mut self, registry: HandlerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Leaves the global subscriber alone, for hosts that install their own.
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    /// Loads configuration and builds the runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or is invalid, or
    /// logging cannot be initialized.
    pub fn build(self) -> RuntimeResult<CourierRuntime> {
        let config = self.config_loader.load()?;
        CourierRuntime::assemble(config, self.registry, self.init_logging)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::{Declaration, HandlerResult, Payload};
    use figment::Jail;
    use figment::providers::Serialized;

    use crate::config::ConfigError;
    use crate::error::RuntimeError;

    fn registry() -> HandlerRegistry {
        HandlerRegistry::new()
            .named_request(
                "echo",
                |payload: &mut Payload| -> HandlerResult {
                    payload.body_mut().insert("echo".into(), true.into());
                    Ok(())
                },
                [Declaration::sync_event(["shop:PING"])],
            )
            .unwrap()
    }

    #[test]
    fn test_builds_from_searched_config_file() {
        Jail::expect_with(|jail| {
            jail.create_file("courier.toml", "[broker]\nnamespace = \"shop\"\n")?;

            let runtime = CourierRuntime::builder()
                .search_path(jail.directory())
                .without_env()
                .without_logging()
                .registry(registry())
                .build()
                .unwrap();
            assert_eq!(runtime.config().broker.namespace, "shop");

            let output = runtime
                .handle_invocation(
                    r#"{"version": 2, "typeId": 5, "eventName": "PING", "currentUserId": "u"}"#,
                    "req-1",
                )
                .unwrap();
            assert!(output.contains(r#""echo":true"#));
            Ok(())
        });
    }

    #[test]
    fn test_env_enables_passthrough() {
        Jail::expect_with(|jail| {
            jail.set_env("COURIER_BROKER__PASSTHROUGH", "true");

            let runtime = CourierRuntime::builder()
                .search_path(jail.directory())
                .without_logging()
                .build()
                .unwrap();
            assert!(runtime.config().broker.passthrough);
            assert!(runtime.handle(r#"{"key": "pagebuilder:X"}"#).is_ok());
            Ok(())
        });
    }

    #[test]
    fn test_merge_overrides_only_given_keys() {
        Jail::expect_with(|jail| {
            jail.set_env("COURIER_BROKER__PASSTHROUGH", "true");

            let runtime = CourierRuntime::builder()
                .search_path(jail.directory())
                .merge(Serialized::default("broker.namespace", "shop"))
                .without_logging()
                .build()
                .unwrap();
            assert_eq!(runtime.config().broker.namespace, "shop");
            assert!(runtime.config().broker.passthrough);
            Ok(())
        });
    }

    #[test]
    fn test_rejects_invalid_namespace() {
        Jail::expect_with(|jail| {
            jail.set_env("COURIER_BROKER__NAMESPACE", "bad:ns");

            let err = CourierRuntime::builder()
                .search_path(jail.directory())
                .without_logging()
                .build()
                .unwrap_err();
            assert!(matches!(
                err,
                RuntimeError::Config(ConfigError::ValidationError { .. })
            ));
            Ok(())
        });
    }
}
