//! Named button commands.
//!
//! Buttons in a schema refer to commands by name. Every name must be
//! registered before the form is linked, so a typo fails at startup rather
//! than on the first click.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::document::FormDocument;
use crate::errors::CommandError;

/// What a command gets to work with.
pub struct CommandContext<'a> {
    pub form: &'a mut FormDocument,
    pub button: &'a str,
    /// The field named by the button, if any.
    pub field: Option<&'a str>,
    pub params: &'a Value,
}

pub type CommandFn = Arc<dyn Fn(&mut CommandContext<'_>) -> Result<(), CommandError> + Send + Sync>;

#[derive(Clone, Default)]
pub struct CommandRegistry {
    commands: IndexMap<String, CommandFn>,
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.commands.keys()).finish()
    }
}

pub const PULL_VALUES: &str = "pull_values";
pub const RESET_DEFAULTS: &str = "reset_defaults";

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `pull_values` logs the current values (only the button's field if it
    /// names one); `reset_defaults` restores every declared default.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .register(PULL_VALUES, |ctx| {
                match ctx.field {
                    Some(field) => {
                        let value = ctx.form.try_get(field)?;
                        tracing::info!(field, value = ?value, "pulled value");
                    }
                    None => {
                        for (field, value) in ctx.form.values() {
                            tracing::info!(%field, %value, "pulled value");
                        }
                    }
                }
                Ok(())
            })
            .register(RESET_DEFAULTS, |ctx| {
                ctx.form.reset_defaults();
                Ok(())
            });
        registry
    }

    /// Register `command` under `name`, replacing an earlier registration.
    pub fn register<F>(&mut self, name: impl Into<String>, command: F) -> &mut Self
    where
        F: Fn(&mut CommandContext<'_>) -> Result<(), CommandError> + Send + Sync + 'static,
    {
        self.commands.insert(name.into(), Arc::new(command));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<CommandFn> {
        self.commands.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }
}

impl FormDocument {
    /// Run the command bound to `button`. Failures are reported to the form
    /// status and returned.
    pub fn press(&mut self, button: &str) -> Result<(), CommandError> {
        let result = self.run_button(button);
        if let Err(err) = &result {
            self.report(err);
        }
        result
    }

    fn run_button(&mut self, button: &str) -> Result<(), CommandError> {
        let spec = self
            .buttons()
            .find(|spec| spec.name == button)
            .cloned()
            .ok_or_else(|| CommandError::UnknownButton(button.to_string()))?;
        let command = self
            .commands
            .get(&spec.command)
            .ok_or_else(|| CommandError::UnknownCommand(spec.command.clone()))?;

        tracing::info!(button, command = %spec.command, "running command");
        let mut ctx = CommandContext {
            form: self,
            button: &spec.name,
            field: spec.field.as_deref(),
            params: &spec.params,
        };
        command(&mut ctx)
    }
}
