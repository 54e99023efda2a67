use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::application::errors::BotError;
use crate::domain::entities::InboundMessage;
use crate::domain::traits::ReplySink;

/// Result of a command handler: `Ok(false)` means the arguments did not
/// match the command's grammar and nothing was done.
pub type HandlerResult = Result<bool, BotError>;

/// A handler attached to one or more trigger tokens
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, message: &InboundMessage, sink: &dyn ReplySink) -> HandlerResult;
}

/// A handler invoked for every non-empty inbound line
#[async_trait]
pub trait PassiveHandler: Send + Sync {
    async fn observe(&self, message: &InboundMessage, sink: &dyn ReplySink) -> Result<(), BotError>;
}

/// Represents a bot command
pub struct Command {
    pub module: String,
    pub triggers: Vec<String>,
    pub help: Option<String>,
    pub handler: Arc<dyn CommandHandler>,
}

impl Command {
    pub fn new(module: impl Into<String>, handler: Arc<dyn CommandHandler>) -> Self {
        Self {
            module: module.into(),
            triggers: Vec::new(),
            help: None,
            handler,
        }
    }

    pub fn with_triggers<I, S>(mut self, triggers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.triggers.extend(triggers.into_iter().map(Into::into));
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn matches(&self, token: &str) -> bool {
        self.triggers.iter().any(|t| t == token)
    }
}

/// A command paired with the sink its replies go through
pub struct CommandRegistration {
    pub command: Command,
    pub sink: Arc<dyn ReplySink>,
}

/// A passive handler paired with its sink
pub struct PassiveRegistration {
    pub module: String,
    pub handler: Arc<dyn PassiveHandler>,
    pub sink: Arc<dyn ReplySink>,
}

/// Help lines grouped by module, in registration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HelpIndex {
    modules: Vec<String>,
    lines: HashMap<String, Vec<String>>,
}

impl HelpIndex {
    pub fn add(&mut self, module: &str, line: &str) {
        if module.is_empty() || line.is_empty() {
            return;
        }
        if !self.lines.contains_key(module) {
            self.modules.push(module.to_string());
        }
        self.lines.entry(module.to_string()).or_default().push(line.to_string());
    }

    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    pub fn lines(&self, module: &str) -> Option<&[String]> {
        self.lines.get(module).map(Vec::as_slice)
    }
}

/// Trigger-token map plus the ordered passive handlers
#[derive(Default)]
pub struct HandlerRegistry {
    commands: Vec<Arc<CommandRegistration>>,
    triggers: HashMap<String, Arc<CommandRegistration>>,
    passive: Vec<Arc<PassiveRegistration>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command; a token already taken is silently rebound
    /// to the newest registration.
    pub fn register_command(&mut self, command: Command, sink: Arc<dyn ReplySink>) {
        let registration = Arc::new(CommandRegistration { command, sink });
        for trigger in &registration.command.triggers {
            if let Some(previous) = self.triggers.insert(trigger.clone(), registration.clone()) {
                tracing::debug!(
                    "Trigger {} rebound from module {} to {}",
                    trigger,
                    previous.command.module,
                    registration.command.module
                );
            }
        }
        self.commands.push(registration);
    }

    pub fn register_passive(
        &mut self,
        module: impl Into<String>,
        handler: Arc<dyn PassiveHandler>,
        sink: Arc<dyn ReplySink>,
    ) {
        self.passive.push(Arc::new(PassiveRegistration {
            module: module.into(),
            handler,
            sink,
        }));
    }

    pub fn command(&self, token: &str) -> Option<Arc<CommandRegistration>> {
        self.triggers.get(token).cloned()
    }

    pub fn passive(&self) -> &[Arc<PassiveRegistration>] {
        &self.passive
    }

    pub fn commands(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter().map(|r| &r.command)
    }

    pub fn help_index(&self) -> HelpIndex {
        let mut index = HelpIndex::default();
        for command in self.commands() {
            if let Some(help) = &command.help {
                index.add(&command.module, help);
            }
        }
        index
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }
}
