use std::sync::Arc;

use async_trait::async_trait;

use super::ModuleContext;
use crate::application::messaging::ReplyMode;
use crate::domain::entities::{Command, CommandHandler, HandlerRegistry, HandlerResult, HelpIndex, InboundMessage, OutboundReply};
use crate::domain::traits::ReplySink;

pub const MODULE: &str = "help";

/// Register `!h`/`!help` over every help line registered so far
pub fn install(registry: &mut HandlerRegistry, ctx: &ModuleContext) {
    let index = registry.help_index();
    registry.register_command(
        Command::new(MODULE, Arc::new(HelpCommand { index })).with_triggers(["!h", "!help"]),
        ctx.sink(ReplyMode::Reply),
    );
}

struct HelpCommand {
    index: HelpIndex,
}

impl HelpCommand {
    fn usage(&self) -> String {
        format!(
            "You need to specify a module for which you want help. Currently loaded modules are \"{}\".",
            self.index.modules().join(", ")
        )
    }
}

#[async_trait]
impl CommandHandler for HelpCommand {
    async fn handle(&self, message: &InboundMessage, sink: &dyn ReplySink) -> HandlerResult {
        let fields = message.fields();
        let lines = match fields.as_slice() {
            [_, module] => self.index.lines(module),
            _ => None,
        };

        match lines {
            Some(lines) => {
                for line in lines {
                    sink.send(OutboundReply::new(line.as_str(), message.sender.as_str())).await;
                }
            }
            None => {
                sink.send(OutboundReply::new(self.usage(), message.sender.as_str())).await;
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSink;

    fn help() -> HelpCommand {
        let mut index = HelpIndex::default();
        index.add("memo", "!memo/!m <nick> <message>");
        index.add("memo", "!memostat/!ms");
        index.add("xkcd", "!xkcd");
        HelpCommand { index }
    }

    #[tokio::test]
    async fn test_module_help_goes_to_sender() {
        let sink = RecordingSink::new();
        help()
            .handle(&InboundMessage::in_channel("alice", "#goxxx", "!help memo"), &sink)
            .await
            .unwrap();

        let replies = sink.replies();
        assert_eq!(replies.len(), 2);
        assert!(replies.iter().all(|r| r.target == "alice"));
        assert_eq!(replies[1].text, "!memostat/!ms");
    }

    #[tokio::test]
    async fn test_usage_lists_modules() {
        for text in ["!h", "!h nope", "!h memo xkcd"] {
            let sink = RecordingSink::new();
            help()
                .handle(&InboundMessage::in_channel("alice", "#goxxx", text), &sink)
                .await
                .unwrap();
            assert_eq!(
                sink.texts(),
                vec!["You need to specify a module for which you want help. Currently loaded modules are \"memo, xkcd\".".to_string()]
            );
        }
    }
}
