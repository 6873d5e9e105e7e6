//! Admin commands: THROTTLE, IGNORE, RELOAD, TRIGGERS.
//!
//! Every command here answers non-admins with a refusal and logs the
//! attempt. THROTTLE and IGNORE manage before triggers keyed
//! `<command>;<n|h>;<value>`, so adding the same target twice replaces the
//! first trigger and `-n`/`-h` removes it.

use super::command;
use super::helpers::{INCORRECT_USAGE, NOT_AUTHORIZED};
use crate::error::{HandlerError, HandlerResult};
use crate::kernel::{
    CommandHandler, Context, HelpEntry, Invocation, Phase, Plugin, Trigger, TriggerResult, UserRef,
};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use straybot_proto::irc_eq;

/// Commands a throttled user may send back to back.
const THROTTLE_BURST: u32 = 3;

/// Time to earn back one throttled command (3 per 10 seconds).
const THROTTLE_REFILL: Duration = Duration::from_millis(3_334);

/// Which users a throttle or ignore applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Nickname, compared case-insensitively.
    Nick(String),
    /// Hostname, compared ASCII case-insensitively.
    Host(String),
}

impl Selector {
    pub fn matches(&self, user: &UserRef) -> bool {
        match self {
            Self::Nick(nick) => irc_eq(&user.nickname, nick),
            Self::Host(host) => user.host.eq_ignore_ascii_case(host),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Nick(_) => "n",
            Self::Host(_) => "h",
        }
    }

    fn value(&self) -> &str {
        match self {
            Self::Nick(v) | Self::Host(v) => v,
        }
    }
}

/// Parsed `[-](n|h) <value>` arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetArgs {
    pub remove: bool,
    pub selector: Selector,
}

impl TargetArgs {
    pub fn parse(args: &str) -> Option<Self> {
        let mut words = args.split_whitespace();
        let flag = words.next()?;
        let value = words.next()?.to_string();

        let (remove, kind) = match flag.strip_prefix('-') {
            Some(kind) => (true, kind),
            None => (false, flag),
        };
        let selector = match kind {
            "n" => Selector::Nick(value),
            "h" => Selector::Host(value),
            _ => return None,
        };
        Some(Self { remove, selector })
    }

    /// Trigger id for `command` (`throttle` or `ignore`).
    pub fn trigger_id(&self, command: &str) -> String {
        format!(
            "{command};{};{}",
            self.selector.kind(),
            self.selector.value()
        )
    }
}

/// Limits one user to a short burst of commands.
pub struct ThrottleTrigger {
    selector: Selector,
    limiter: DefaultDirectRateLimiter,
}

impl ThrottleTrigger {
    /// `None` only if the throttle constants are out of range.
    pub fn new(selector: Selector) -> Option<Self> {
        let quota = Quota::with_period(THROTTLE_REFILL)?.allow_burst(NonZeroU32::new(THROTTLE_BURST)?);
        Some(Self {
            selector,
            limiter: RateLimiter::direct(quota),
        })
    }
}

impl Trigger for ThrottleTrigger {
    fn check(&self, invocation: &Invocation) -> TriggerResult {
        if !self.selector.matches(&invocation.user) {
            return Ok(true);
        }
        Ok(self.limiter.check().is_ok())
    }
}

/// Drops every command from one user.
pub struct IgnoreTrigger {
    selector: Selector,
}

impl Trigger for IgnoreTrigger {
    fn check(&self, invocation: &Invocation) -> TriggerResult {
        Ok(!self.selector.matches(&invocation.user))
    }
}

/// Operator commands.
pub struct AdminPlugin;

impl Plugin for AdminPlugin {
    fn name(&self) -> &str {
        "admin"
    }

    fn commands(&self) -> Vec<(String, Arc<dyn CommandHandler>)> {
        vec![
            command("throttle", ThrottleHandler),
            command("ignore", IgnoreHandler),
            command("reload", ReloadHandler),
            command("triggers", TriggersHandler),
        ]
    }

    fn help(&self) -> Vec<HelpEntry> {
        vec![
            HelpEntry::admin(
                "throttle",
                "Prevents a user from sending more than 3 commands in a short period of time. \
                 Usage: throttle [-]n nickname or throttle [-]h host",
            ),
            HelpEntry::admin(
                "ignore",
                "Ignores a user's command requests. \
                 Usage: ignore [-]n nickname or ignore [-]h host",
            ),
            HelpEntry::admin("reload", "Reloads the internal modules."),
            HelpEntry::admin("triggers", "Lists the installed triggers."),
        ]
    }
}

/// Handler for THROTTLE.
///
/// `throttle [-](n|h) <value>`
pub struct ThrottleHandler;

#[async_trait]
impl CommandHandler for ThrottleHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        if !ctx.is_admin() {
            ctx.reply(NOT_AUTHORIZED).await?;
            return Ok(format!("{} tried to throttle.", ctx.nick()));
        }
        let Some(target) = TargetArgs::parse(ctx.args()) else {
            ctx.reply(INCORRECT_USAGE).await?;
            return Ok(format!("Bad throttle arguments: {}", ctx.args()));
        };

        let id = target.trigger_id("throttle");
        if target.remove {
            ctx.kernel.triggers().remove(Phase::Before, &id);
            ctx.reply("Throttle trigger successfully removed.").await?;
            return Ok(format!("{} removed throttle: {}", ctx.nick(), ctx.args()));
        }

        let trigger = ThrottleTrigger::new(target.selector)
            .ok_or_else(|| HandlerError::Internal("throttle quota out of range".into()))?;
        ctx.kernel.triggers().register(Phase::Before, &id, trigger);
        ctx.reply("Throttle trigger successfully added.").await?;
        Ok(format!("{} added throttle trigger: {}", ctx.nick(), ctx.args()))
    }
}

/// Handler for IGNORE.
///
/// `ignore [-](n|h) <value>`
pub struct IgnoreHandler;

#[async_trait]
impl CommandHandler for IgnoreHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        if !ctx.is_admin() {
            ctx.reply(NOT_AUTHORIZED).await?;
            return Ok(format!("{} tried to ignore.", ctx.nick()));
        }
        let Some(target) = TargetArgs::parse(ctx.args()) else {
            ctx.reply(INCORRECT_USAGE).await?;
            return Ok(format!("Bad ignore arguments: {}", ctx.args()));
        };

        let id = target.trigger_id("ignore");
        if target.remove {
            ctx.kernel.triggers().remove(Phase::Before, &id);
            ctx.reply("Ignore trigger successfully removed.").await?;
            return Ok(format!("{} removed ignore: {}", ctx.nick(), ctx.args()));
        }

        ctx.kernel.triggers().register(
            Phase::Before,
            &id,
            IgnoreTrigger {
                selector: target.selector,
            },
        );
        ctx.reply("Ignore trigger successfully added.").await?;
        Ok(format!("{} added ignore: {}", ctx.nick(), ctx.args()))
    }
}

/// Handler for RELOAD.
///
/// Rebuilds the handler table from the plugin catalog. A failed reload keeps
/// the current commands.
pub struct ReloadHandler;

#[async_trait]
impl CommandHandler for ReloadHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        if !ctx.is_admin() {
            ctx.reply(NOT_AUTHORIZED).await?;
            return Ok(format!("{} tried to reload the modules.", ctx.nick()));
        }

        match ctx.kernel.reload() {
            Ok(_) => {
                ctx.reply("Done.").await?;
                Ok(format!("{} reloaded my modules.", ctx.nick()))
            }
            Err(e) => {
                ctx.reply("Reload failed, keeping the current modules.").await?;
                Err(e.into())
            }
        }
    }
}

/// Handler for TRIGGERS.
pub struct TriggersHandler;

#[async_trait]
impl CommandHandler for TriggersHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        if !ctx.is_admin() {
            ctx.reply(NOT_AUTHORIZED).await?;
            return Ok(format!("{} tried to list triggers.", ctx.nick()));
        }

        let triggers = ctx.kernel.triggers();
        let listing = |phase: Phase| {
            let ids = triggers.ids(phase);
            if ids.is_empty() {
                "none".to_string()
            } else {
                ids.join(", ")
            }
        };
        ctx.reply(&format!(
            "Before: {} | After: {}",
            listing(Phase::Before),
            listing(Phase::After)
        ))
        .await?;
        Ok(format!("{} listed the triggers.", ctx.nick()))
    }
}
