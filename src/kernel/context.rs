//! Handler context and the handler contract.

use super::Kernel;
use super::invocation::{Invocation, UserRef};
use crate::error::{HandlerResult, TransportError};
use crate::logger::Logger;
use async_trait::async_trait;

/// What a handler sees while it runs.
pub struct Context<'a> {
    pub kernel: &'a Kernel,
    pub invocation: &'a Invocation,
}

impl<'a> Context<'a> {
    pub fn new(kernel: &'a Kernel, invocation: &'a Invocation) -> Self {
        Self { kernel, invocation }
    }

    #[inline]
    pub fn user(&self) -> &UserRef {
        &self.invocation.user
    }

    #[inline]
    pub fn nick(&self) -> &str {
        &self.invocation.user.nickname
    }

    #[inline]
    pub fn args(&self) -> &str {
        &self.invocation.args
    }

    #[inline]
    pub fn reply_target(&self) -> &str {
        &self.invocation.reply_target
    }

    /// Send `text` to the reply target.
    pub async fn reply(&self, text: &str) -> Result<(), TransportError> {
        self.kernel.say(self.reply_target(), text).await
    }

    /// Send `text` to an arbitrary target.
    pub async fn say(&self, target: &str, text: &str) -> Result<(), TransportError> {
        self.kernel.say(target, text).await
    }

    /// Whether the sender matches an admin hostmask.
    pub fn is_admin(&self) -> bool {
        self.kernel.is_admin(self.user())
    }

    pub fn logger(&self) -> &Logger {
        self.kernel.logger()
    }
}

/// A chat command implementation.
///
/// `Ok` carries the outcome line for the Info log (empty means nothing is
/// logged); `Err` is logged at Error together with the command and arguments.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult;
}
