//! Tagged picture links

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::{require_admin, ModuleContext, URL_REGEX};
use crate::application::messaging::ReplyMode;
use crate::application::services::MembershipTracker;
use crate::domain::entities::{Command, CommandHandler, HandlerRegistry, HandlerResult, InboundMessage, OutboundReply};
use crate::domain::traits::ReplySink;
use crate::infrastructure::database::Database;

pub const MODULE: &str = "pictures";

const MAX_PICTURES_PER_TAG: usize = 5;
const EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];
const NSFW_MARKER: &str = "#nsfw";

static SANITIZE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[%?_$:@]").expect("valid sanitize pattern"));

pub fn install(registry: &mut HandlerRegistry, ctx: &ModuleContext) {
    let sink = ctx.sink(ReplyMode::Reply);

    registry.register_command(
        Command::new(MODULE, Arc::new(FindPicture { db: ctx.db.clone() }))
            .with_triggers(["!p", "!pic"])
            .with_help("!p/!pic <search terms> => Search in the database for pictures matching <search terms>"),
        sink.clone(),
    );
    registry.register_command(
        Command::new(MODULE, Arc::new(AddPicture { db: ctx.db.clone() }))
            .with_triggers(["!ap", "!addpic"])
            .with_help("!ap/!addpic <url> <tag> [#NSFW] => Add a picture in the database for <tag> (<url> must have an image extension)"),
        sink.clone(),
    );
    registry.register_command(
        Command::new(
            MODULE,
            Arc::new(RemovePicture {
                db: ctx.db.clone(),
                membership: ctx.membership.clone(),
            }),
        )
        .with_triggers(["!rmpic"])
        .with_help("!rmpic <url> <tag> => Remove a picture in the database for <tag> (Admin only command)"),
        sink,
    );
}

/// Strip `%?_$:@`, lowercase and trim
pub fn sanitize_tag(tag: &str) -> String {
    SANITIZE_REGEX.replace_all(tag, "").to_lowercase().trim().to_string()
}

fn has_image_extension(url: &str) -> bool {
    let file = url.rsplit('/').next().unwrap_or(url);
    file.rsplit_once('.')
        .is_some_and(|(_, ext)| EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

struct FindPicture {
    db: Arc<Database>,
}

#[async_trait]
impl CommandHandler for FindPicture {
    async fn handle(&self, message: &InboundMessage, sink: &dyn ReplySink) -> HandlerResult {
        let fields = message.fields();
        if fields.len() < 2 {
            return Ok(false);
        }

        let target = message.reply_target();
        let tag = sanitize_tag(&fields[1..].join(" "));
        if tag.is_empty() {
            sink.send(OutboundReply::new(
                "Picture command: No data remaining for the tag value after sanitization.",
                target,
            ))
            .await;
            return Ok(true);
        }

        let pictures = self.db.pictures_like(&tag)?;
        if pictures.is_empty() {
            sink.send(OutboundReply::new(format!("No picture found for tag \"{}\"", tag), target))
                .await;
            return Ok(true);
        }

        for picture in pictures {
            let text = if picture.nsfw {
                format!("Picture for \"{}\" (#NSFW) : {}", picture.tag, picture.url)
            } else {
                format!("Picture for \"{}\" : {}", picture.tag, picture.url)
            };
            sink.send(OutboundReply::new(text, target)).await;
        }
        Ok(true)
    }
}

struct AddPicture {
    db: Arc<Database>,
}

#[async_trait]
impl CommandHandler for AddPicture {
    async fn handle(&self, message: &InboundMessage, sink: &dyn ReplySink) -> HandlerResult {
        let fields = message.fields();
        if fields.len() < 3 {
            return Ok(false);
        }

        let target = message.reply_target();
        let url = fields[1];
        if !URL_REGEX.is_match(url) || !has_image_extension(url) {
            sink.send(OutboundReply::new(
                "Incorrect format for the \"Add Picture\" command (see !help)",
                target,
            ))
            .await;
            return Ok(true);
        }

        let mut tag = sanitize_tag(&fields[2..].join(" "));
        let nsfw = fields.last().is_some_and(|last| sanitize_tag(last) == NSFW_MARKER);
        if nsfw {
            tag = tag.trim_end_matches(NSFW_MARKER).trim().to_string();
        }
        if tag.is_empty() {
            sink.send(OutboundReply::new(
                "Picture command: No data remaining for the tag value after sanitization.",
                target,
            ))
            .await;
            return Ok(true);
        }

        if self.db.picture_count(&tag)? >= MAX_PICTURES_PER_TAG {
            sink.send(OutboundReply::new(
                format!("There is already too much pictures for the tag \"{}\"", tag),
                target,
            ))
            .await;
            return Ok(true);
        }
        if self.db.picture_exists(&tag, url)? {
            sink.send(OutboundReply::new(
                format!("This picture is already present for the tag \"{}\"", tag),
                target,
            ))
            .await;
            return Ok(true);
        }

        self.db.add_picture(&tag, url, &message.sender, nsfw)?;
        tracing::info!("Picture {} added for {} by {}", url, tag, message.sender);
        sink.send(OutboundReply::new(
            format!("Picture \"{}\" added for tag \"{}\"", url, tag),
            target,
        ))
        .await;
        Ok(true)
    }
}

struct RemovePicture {
    db: Arc<Database>,
    membership: Arc<MembershipTracker>,
}

#[async_trait]
impl CommandHandler for RemovePicture {
    async fn handle(&self, message: &InboundMessage, sink: &dyn ReplySink) -> HandlerResult {
        let fields = message.fields();
        if fields.len() < 3 {
            return Ok(false);
        }
        if !require_admin(&self.membership, message, sink).await {
            return Ok(true);
        }

        let url = fields[1];
        let tag = fields[2..].join(" ").to_lowercase();
        if self.db.delete_picture(&tag, url)? {
            sink.send(OutboundReply::new(
                format!("Picture \"{}\" removed for tag \"{}\"", url, tag),
                message.reply_target(),
            ))
            .await;
        }
        Ok(true)
    }
}
