//! Memos left for users who are away

use std::sync::Arc;

use async_trait::async_trait;

use super::ModuleContext;
use crate::application::errors::BotError;
use crate::application::messaging::ReplyMode;
use crate::domain::entities::{Command, CommandHandler, HandlerRegistry, HandlerResult, InboundMessage, OutboundReply, PassiveHandler};
use crate::domain::traits::ReplySink;
use crate::infrastructure::database::Database;

pub const MODULE: &str = "memo";

pub fn install(registry: &mut HandlerRegistry, ctx: &ModuleContext) {
    let sink = ctx.sink(ReplyMode::Reply);

    registry.register_command(
        Command::new(MODULE, Arc::new(LeaveMemo { db: ctx.db.clone() }))
            .with_triggers(["!memo", "!m"])
            .with_help("!memo/!m <nick> <message> => Leave a memo for another user"),
        sink.clone(),
    );
    registry.register_command(
        Command::new(MODULE, Arc::new(MemoStatus { db: ctx.db.clone() }))
            .with_triggers(["!memostat", "!ms"])
            .with_help("!memostat/!ms => Get the list of the unread memos (List only the memos you left)"),
        sink.clone(),
    );
    registry.register_passive(MODULE, Arc::new(DeliverMemos { db: ctx.db.clone() }), sink);
}

struct LeaveMemo {
    db: Arc<Database>,
}

#[async_trait]
impl CommandHandler for LeaveMemo {
    async fn handle(&self, message: &InboundMessage, sink: &dyn ReplySink) -> HandlerResult {
        let fields = message.fields();
        if fields.len() < 3 {
            return Ok(false);
        }

        let user_to = fields[1];
        self.db.add_memo(user_to, &message.sender, &fields[2..].join(" "))?;
        tracing::info!("Memo for {} saved by {}", user_to, message.sender);

        sink.send(OutboundReply::new(
            format!("{}: memo for {} saved", message.sender, user_to),
            message.sender.as_str(),
        ))
        .await;
        Ok(true)
    }
}

struct MemoStatus {
    db: Arc<Database>,
}

#[async_trait]
impl CommandHandler for MemoStatus {
    async fn handle(&self, message: &InboundMessage, sink: &dyn ReplySink) -> HandlerResult {
        let memos = self.db.memos_from(&message.sender)?;
        if memos.is_empty() {
            sink.send(OutboundReply::new("No memo saved", message.sender.as_str())).await;
            return Ok(true);
        }

        for memo in memos {
            sink.send(OutboundReply::new(
                format!("Memo for {}: \"{}\" ({})", memo.user_to, memo.message, memo.date),
                message.sender.as_str(),
            ))
            .await;
        }
        Ok(true)
    }
}

/// Hands pending memos to their recipient the next time they speak
struct DeliverMemos {
    db: Arc<Database>,
}

#[async_trait]
impl PassiveHandler for DeliverMemos {
    async fn observe(&self, message: &InboundMessage, sink: &dyn ReplySink) -> Result<(), BotError> {
        for memo in self.db.memos_for(&message.sender)? {
            // Claimed by a concurrent delivery
            if !self.db.delete_memo(memo.id)? {
                continue;
            }
            sink.send(OutboundReply::new(
                format!(
                    "{}: memo from {} => \"{}\" ({})",
                    message.sender, memo.user_from, memo.message, memo.date
                ),
                message.sender.as_str(),
            ))
            .await;
        }
        Ok(())
    }
}
