//! Message dispatcher - Routes inbound lines to handlers

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::application::services::MembershipTracker;
use crate::domain::entities::{CommandRegistration, HandlerRegistry, InboundMessage, PassiveRegistration};

/// Tasks spawned for one inbound line
#[derive(Debug, Default)]
pub struct DispatchHandle {
    command_matched: bool,
    tasks: Vec<JoinHandle<()>>,
}

impl DispatchHandle {
    /// Whether the first token matched a registered trigger
    pub fn command_matched(&self) -> bool {
        self.command_matched
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for every spawned handler to finish.
    /// Dropping the handle instead leaves the tasks running.
    pub async fn wait(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!("Handler task failed: {}", e);
            }
        }
    }
}

/// Message dispatcher - first-token command lookup plus passive fan-out
pub struct MessageDispatcher {
    registry: Arc<HandlerRegistry>,
    membership: Arc<MembershipTracker>,
}

impl MessageDispatcher {
    pub fn new(registry: Arc<HandlerRegistry>, membership: Arc<MembershipTracker>) -> Self {
        Self { registry, membership }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Dispatch one message. Never waits on a handler: the command path
    /// (membership check included) and each passive handler run as
    /// their own task.
    pub fn dispatch(&self, message: InboundMessage) -> DispatchHandle {
        if message.text.is_empty() {
            return DispatchHandle::default();
        }

        let message = Arc::new(message);
        let mut handle = DispatchHandle::default();

        let trigger = message.first_token().map(str::to_string);
        if let Some(registration) = trigger.as_deref().and_then(|t| self.registry.command(t)) {
            handle.command_matched = true;
            let span = tracing::debug_span!(
                "command",
                id = %message.id,
                sender = %message.sender,
                trigger = trigger.as_deref().unwrap_or_default(),
                module = %registration.command.module,
            );
            let task = run_command(registration, self.membership.clone(), message.clone());
            handle.tasks.push(tokio::spawn(task.instrument(span)));
        }

        for passive in self.registry.passive() {
            let span = tracing::debug_span!(
                "passive",
                id = %message.id,
                sender = %message.sender,
                module = %passive.module,
            );
            let task = run_passive(passive.clone(), message.clone());
            handle.tasks.push(tokio::spawn(task.instrument(span)));
        }

        handle
    }
}

async fn run_command(
    registration: Arc<CommandRegistration>,
    membership: Arc<MembershipTracker>,
    message: Arc<InboundMessage>,
) {
    if !membership.ensure_member(&message.sender).await {
        tracing::debug!("Sender is not in {}, skipping command", membership.channel());
        return;
    }

    match registration
        .command
        .handler
        .handle(&message, registration.sink.as_ref())
        .await
    {
        Ok(true) => tracing::debug!("Command handled"),
        Ok(false) => tracing::debug!("Command not applicable"),
        Err(e) => tracing::warn!("Command failed: {}", e),
    }
}

async fn run_passive(registration: Arc<PassiveRegistration>, message: Arc<InboundMessage>) {
    if let Err(e) = registration
        .handler
        .observe(&message, registration.sink.as_ref())
        .await
    {
        tracing::warn!("Passive handler failed: {}", e);
    }
}
