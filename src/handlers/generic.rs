//! Generic commands: ABOUT, HELP, SEEN.
//!
//! SEEN is fed by an after trigger that records the last command every
//! nickname ran, so it only knows about users who have talked to the bot.

use super::command;
use super::helpers::{INCORRECT_USAGE, humanize_secs};
use crate::db::Database;
use crate::error::{BoxError, HandlerError, HandlerResult};
use crate::kernel::{
    CommandHandler, Context, HelpEntry, Invocation, Kernel, Phase, Plugin, Trigger, TriggerResult,
};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use straybot_proto::irc_eq;
use tracing::{debug, warn};

/// Id of the after trigger that feeds SEEN.
pub const SEEN_TRIGGER_ID: &str = "generic;seen";

/// Target stored for private-message sightings.
const PRIVATE_TARGET: &str = "private";

/// Built-in commands every deployment has.
pub struct GenericPlugin {
    db: Database,
}

impl GenericPlugin {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl Plugin for GenericPlugin {
    fn name(&self) -> &str {
        "generic"
    }

    fn commands(&self) -> Vec<(String, Arc<dyn CommandHandler>)> {
        vec![
            command("about", AboutHandler),
            command("help", HelpHandler),
            command(
                "seen",
                SeenHandler {
                    db: self.db.clone(),
                },
            ),
        ]
    }

    fn help(&self) -> Vec<HelpEntry> {
        vec![
            HelpEntry::new("about", "Tells you what I am."),
            HelpEntry::new(
                "help",
                "Lists my commands, or explains one. Usage: help [command]",
            ),
            HelpEntry::new(
                "seen",
                "Tells you when a user last gave me a command. Usage: seen nickname",
            ),
        ]
    }

    fn setup(&self, kernel: &Kernel) -> Result<(), BoxError> {
        kernel.triggers().register(
            Phase::After,
            SEEN_TRIGGER_ID,
            SeenTrigger {
                db: self.db.clone(),
            },
        );
        Ok(())
    }
}

/// Handler for ABOUT.
pub struct AboutHandler;

#[async_trait]
impl CommandHandler for AboutHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        ctx.reply("I'm a bot!").await?;
        Ok(format!("{} asked about me.", ctx.nick()))
    }
}

/// Handler for HELP.
///
/// `help [command]`
///
/// Admin-only entries are invisible to everybody else, including in the
/// command listing.
pub struct HelpHandler;

#[async_trait]
impl CommandHandler for HelpHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let table = ctx.kernel.handlers().snapshot();
        let admin = ctx.is_admin();
        let prefix = ctx.kernel.pattern().prefix();
        let visible = |command: &str| {
            admin
                || table
                    .help_for(command)
                    .is_none_or(|entry| !entry.is_admin_only())
        };

        let requested = ctx.invocation.words().next().map(|word| {
            word.strip_prefix(prefix)
                .filter(|rest| !rest.is_empty())
                .unwrap_or(word)
        });

        let Some(command) = requested else {
            let commands: Vec<&str> = table
                .commands()
                .into_iter()
                .filter(|command| visible(*command))
                .collect();
            ctx.reply(&format!(
                "Commands: {}. Use {prefix}help <command> for details.",
                commands.join(", ")
            ))
            .await?;
            return Ok(format!("{} asked for help.", ctx.nick()));
        };

        match table.help_for(command).filter(|_| visible(command)) {
            Some(entry) => ctx.reply(&format!("{command}: {}", entry.text)).await?,
            None => {
                ctx.reply(&format!("No help is available for {command}."))
                    .await?
            }
        }
        Ok(format!("{} asked for help on {command}.", ctx.nick()))
    }
}

/// Handler for SEEN.
///
/// `seen <nickname>`
pub struct SeenHandler {
    db: Database,
}

#[async_trait]
impl CommandHandler for SeenHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let Some(nick) = ctx.invocation.words().next() else {
            ctx.reply(INCORRECT_USAGE).await?;
            return Ok(format!("Bad seen arguments: {}", ctx.args()));
        };

        let reply = match self.db.seen().find(nick).await {
            Ok(Some(record)) => {
                let ago = humanize_secs(Utc::now().timestamp() - record.seen_at);
                let place = if record.target == PRIVATE_TARGET {
                    "a private message".to_string()
                } else {
                    record.target
                };
                format!(
                    "{} was last seen {ago} ago using {}{} in {place}.",
                    record.display_nick,
                    ctx.kernel.pattern().prefix(),
                    record.command
                )
            }
            Ok(None) => format!("I haven't seen {nick}."),
            Err(e) => {
                ctx.reply("Sorry, I can't remember anyone right now.").await?;
                return Err(HandlerError::Internal(format!(
                    "seen lookup failed: {e}"
                )));
            }
        };

        ctx.reply(&reply).await?;
        Ok(format!("{} asked when {nick} was last seen.", ctx.nick()))
    }
}

/// Records every settled invocation for SEEN.
///
/// The write happens on a spawned task so the dispatch never waits on the
/// database.
struct SeenTrigger {
    db: Database,
}

impl Trigger for SeenTrigger {
    fn check(&self, invocation: &Invocation) -> TriggerResult {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("No runtime, sighting not recorded");
            return Ok(true);
        };

        let db = self.db.clone();
        let nickname = invocation.user.nickname.clone();
        let command = invocation.command.clone();
        let target = if irc_eq(&invocation.reply_target, &nickname) {
            PRIVATE_TARGET.to_string()
        } else {
            invocation.reply_target.clone()
        };
        let seen_at = Utc::now().timestamp();

        runtime.spawn(async move {
            if let Err(e) = db.seen().touch(&nickname, &command, &target, seen_at).await {
                warn!(error = %e, nick = %nickname, "Failed to record sighting");
            }
        });
        Ok(true)
    }
}
