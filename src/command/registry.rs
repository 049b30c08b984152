//! Command registry - maps command names to handlers

use super::handlers::{self, HandlerContext};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Result of invoking a named command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Handler ran and applied the command
    Success,
    /// Handler ran but could not apply the command
    Error { message: String },
    /// No handler is registered under this name
    Unsupported,
}

/// A command handler. Handlers only touch the device flags, so they are
/// synchronous and callable from any task.
pub type CommandHandler = Box<dyn Fn(&HandlerContext<'_>) -> CommandOutcome + Send + Sync>;

/// Name-to-handler table, populated once at startup
#[derive(Default)]
pub struct CommandRegistry {
    handlers: HashMap<String, CommandHandler>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the station's built-in commands
    pub fn with_default_handlers() -> Self {
        let mut registry = Self::new();
        registry.register(handlers::TURN_ON_AIR, handlers::handle_turn_on_air);
        registry.register(handlers::TURN_OFF_AIR, handlers::handle_turn_off_air);
        registry
    }

    /// Associate `name` with `handler`, replacing any earlier registration
    pub fn register<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&HandlerContext<'_>) -> CommandOutcome + Send + Sync + 'static,
    {
        let name = name.into();
        if self.handlers.insert(name.clone(), Box::new(handler)).is_some() {
            warn!("[CMD] Handler for {} replaced", name);
        }
    }

    /// Look up and run the handler for `name`
    pub fn invoke(&self, name: &str, ctx: &HandlerContext<'_>) -> CommandOutcome {
        match self.handlers.get(name) {
            Some(handler) => {
                debug!("[CMD] Executing {}", name);
                handler(ctx)
            }
            None => CommandOutcome::Unsupported,
        }
    }

    /// Registered command names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Registered names as a JSON array, suitable as announcement metadata
    pub fn supported_commands_metadata(&self) -> String {
        let names = self
            .names()
            .into_iter()
            .map(|name| serde_json::Value::String(name.to_owned()))
            .collect();
        serde_json::Value::Array(names).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stream_station_shared::DeviceFlags;

    fn ctx(flags: &DeviceFlags) -> HandlerContext<'_> {
        HandlerContext {
            device_id: "lyons_creek_1",
            flags,
        }
    }

    #[test]
    fn test_turn_off_air() {
        let registry = CommandRegistry::with_default_handlers();
        let flags = DeviceFlags::new();

        let outcome = registry.invoke("TurnOffAir", &ctx(&flags));
        assert_eq!(outcome, CommandOutcome::Success);
        assert!(!flags.air_temp_enabled());
    }

    #[test]
    fn test_turn_on_air() {
        let registry = CommandRegistry::with_default_handlers();
        let flags = DeviceFlags::new();
        flags.set_air_temp_enabled(false);

        let outcome = registry.invoke("TurnOnAir", &ctx(&flags));
        assert_eq!(outcome, CommandOutcome::Success);
        assert!(flags.air_temp_enabled());
    }

    #[test]
    fn test_unknown_command_is_unsupported() {
        let registry = CommandRegistry::with_default_handlers();
        let flags = DeviceFlags::new();
        flags.set_air_temp_enabled(false);

        let outcome = registry.invoke("NoSuchCommand", &ctx(&flags));
        assert_eq!(outcome, CommandOutcome::Unsupported);
        // State untouched
        assert!(!flags.air_temp_enabled());
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let registry = CommandRegistry::with_default_handlers();
        let flags = DeviceFlags::new();
        assert_eq!(
            registry.invoke("turnoffair", &ctx(&flags)),
            CommandOutcome::Unsupported
        );
        assert!(flags.air_temp_enabled());
    }

    #[test]
    fn test_failing_handler_reports_error() {
        let mut registry = CommandRegistry::new();
        registry.register("Calibrate", |_ctx: &HandlerContext<'_>| CommandOutcome::Error {
            message: "probe not submerged".into(),
        });
        let flags = DeviceFlags::new();

        let outcome = registry.invoke("Calibrate", &ctx(&flags));
        assert!(matches!(outcome, CommandOutcome::Error { .. }));
    }

    #[test]
    fn test_metadata_lists_sorted_names() {
        let registry = CommandRegistry::with_default_handlers();
        assert_eq!(registry.names(), vec!["TurnOffAir", "TurnOnAir"]);
        assert_eq!(
            registry.supported_commands_metadata(),
            r#"["TurnOffAir","TurnOnAir"]"#
        );
    }
}
