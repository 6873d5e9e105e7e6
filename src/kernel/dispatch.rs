//! Per-line dispatch pipeline.
//!
//! ```text
//! parse -> before triggers -> handler -> after triggers -> outcome log
//! ```
//!
//! Nothing escapes [`Kernel::handle`]: trigger faults, handler errors and
//! handler panics all end up in the outcome log.

use super::Kernel;
use super::context::Context;
use super::invocation::{Invocation, UserRef, reply_target};
use super::triggers::{Evaluation, Phase};
use crate::error::{HandlerError, panic_message};
use crate::telemetry::{CommandTimer, spans};
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use tracing::{Instrument, debug};

/// How a line was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The line is not a command.
    NotCommand,
    /// A before trigger refused the invocation.
    Denied,
    /// No handler is registered under the command name.
    Unknown,
    /// The handler returned an outcome.
    Completed,
    /// The handler failed or panicked.
    Failed,
}

impl Kernel {
    /// Process one chat line from `sender` addressed to `destination`.
    pub async fn handle(&self, line: &str, sender: UserRef, destination: &str) -> Dispatch {
        let Some((command, args)) = self.pattern().parse(line) else {
            return Dispatch::NotCommand;
        };

        let invocation = Invocation {
            command: command.to_string(),
            args: args.to_string(),
            reply_target: reply_target(destination, &self.nickname(), &sender.nickname),
            user: sender,
        };

        let span = spans::command(
            &invocation.command,
            &invocation.user.nickname,
            &invocation.reply_target,
        );
        self.run(&invocation).instrument(span).await
    }

    async fn run(&self, invocation: &Invocation) -> Dispatch {
        let before = self.triggers().evaluate(Phase::Before, invocation);
        self.log_faults(&before);
        if !before.passed() {
            crate::metrics::record_denied(Phase::Before.as_str());
            debug!(denied_by = ?before.denials, "Invocation denied");
            return Dispatch::Denied;
        }

        let (result, status) = match self.handlers().get(&invocation.command) {
            Some(handler) => {
                let _timer = CommandTimer::new(invocation.command.as_str());
                let ctx = Context::new(self, invocation);
                let result = AssertUnwindSafe(handler.handle(&ctx))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|payload| {
                        Err(HandlerError::Panicked(panic_message(payload.as_ref())))
                    });
                let status = if result.is_ok() {
                    Dispatch::Completed
                } else {
                    Dispatch::Failed
                };
                (result, status)
            }
            None => {
                crate::metrics::record_unknown_command();
                let outcome = format!(
                    "{} attempted nonexistent command: {}",
                    invocation.user.nickname, invocation.command
                );
                (Ok(outcome), Dispatch::Unknown)
            }
        };

        let after = self.triggers().evaluate(Phase::After, invocation);
        self.log_faults(&after);

        match result {
            Ok(outcome) => {
                if !outcome.is_empty() {
                    self.logger().info(&outcome);
                }
            }
            Err(e) => {
                crate::metrics::record_command_error(&invocation.command, e.error_code());
                debug!(error = %e, "Command failed");
                self.logger().error(&format!(
                    "Command '{}' failed (args: '{}'): {}",
                    invocation.command, invocation.args, e
                ));
            }
        }

        status
    }

    fn log_faults(&self, evaluation: &Evaluation) {
        for fault in &evaluation.faults {
            self.logger().error(&fault.to_string());
        }
    }
}
