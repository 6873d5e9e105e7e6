//! Schedules: MLS, NHL.
//!
//! Schedules change through the day, so these go straight to the source on
//! every request instead of through the cache.

use super::helpers::bold;
use crate::cache::{FetchError, RemoteFetch};
use crate::error::HandlerResult;
use crate::kernel::{CommandHandler, Context, HelpEntry, Plugin};
use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, Utc};
use chrono_tz::America::New_York;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const NO_GAMES: &str = "No games found.";
const UNAVAILABLE: &str = "Sorry, the schedule is unavailable right now.";

/// The schedule day (US Eastern) at instant `now`.
pub fn schedule_day(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&New_York).date_naive()
}

pub fn schedule_today() -> NaiveDate {
    schedule_day(Utc::now())
}

/// Source key layout for a schedule day.
const DATE_KEY_FORMAT: &str = "%Y%m%d";

/// One MLS fixture. Scores are absent until kickoff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MlsGame {
    pub home: String,
    pub away: String,
    #[serde(default)]
    pub home_score: Option<u32>,
    #[serde(default)]
    pub away_score: Option<u32>,
    /// Kickoff time, or `FT`/`HT` and the like once underway.
    pub status: String,
}

impl MlsGame {
    /// `HOME 2 AWAY 1 (FT)` with the leader bolded, or `HOME vs AWAY (7:30 PM)`.
    pub fn line(&self) -> String {
        match (self.home_score, self.away_score) {
            (Some(home_score), Some(away_score)) => {
                let mut home = format!("{} {home_score}", self.home);
                let mut away = format!("{} {away_score}", self.away);
                if home_score > away_score {
                    home = bold(&home);
                } else if away_score > home_score {
                    away = bold(&away);
                }
                format!("{home} {away} ({})", self.status)
            }
            _ => format!("{} vs {} ({})", self.home, self.away, self.status),
        }
    }
}

/// One NHL game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NhlGame {
    pub away: String,
    pub home: String,
    /// Start time in Eastern time, e.g. `7:00 PM`.
    pub start_time: String,
    #[serde(default)]
    pub broadcasts: Vec<String>,
}

impl NhlGame {
    /// `AWY @ HOM (7:00 PM ET) [CBC, NBCSN]`
    pub fn line(&self) -> String {
        let mut line = format!("{} @ {} ({} ET)", self.away, self.home, self.start_time);
        if !self.broadcasts.is_empty() {
            line.push_str(&format!(" [{}]", self.broadcasts.join(", ")));
        }
        line
    }
}

/// Parse an `YYYYMMDD` argument.
pub fn parse_date(word: &str) -> Option<NaiveDate> {
    if word.len() != 8 || !word.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(word, DATE_KEY_FORMAT).ok()
}

/// Fetch the games for `date` and render one line per game.
///
/// `Ok(None)` means the source has nothing for that day.
async fn day_lines<F, G>(
    fetcher: &F,
    date: NaiveDate,
    line: impl Fn(&G) -> String,
) -> Result<Option<String>, FetchError>
where
    F: RemoteFetch<Value = Vec<G>>,
{
    let key = date.format(DATE_KEY_FORMAT).to_string();
    match fetcher.fetch(&key).await {
        Ok(fetched) if fetched.value.is_empty() => Ok(None),
        Ok(fetched) => Ok(Some(
            fetched.value.iter().map(line).collect::<Vec<_>>().join("\n"),
        )),
        Err(FetchError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Handler for MLS.
///
/// `mls [YYYYMMDD]`
pub struct MlsHandler<F> {
    fetcher: F,
}

#[async_trait]
impl<F> CommandHandler for MlsHandler<F>
where
    F: RemoteFetch<Value = Vec<MlsGame>> + 'static,
{
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let date = match ctx.invocation.words().next() {
            None => schedule_today(),
            Some(word) => match parse_date(word) {
                Some(date) => date,
                None => {
                    ctx.reply(&format!(
                        "The date specified is incorrectly formatted. Your request should look like {}mls [YYYYMMDD]",
                        ctx.kernel.pattern().prefix()
                    ))
                    .await?;
                    return Ok(format!(
                        "{} asked for the MLS schedule for '{}', but the date was badly formatted.",
                        ctx.nick(),
                        ctx.args()
                    ));
                }
            },
        };

        match day_lines(&self.fetcher, date, MlsGame::line).await {
            Ok(schedule) => {
                ctx.reply(schedule.as_deref().unwrap_or(NO_GAMES)).await?;
                Ok(format!("{} asked for the MLS schedule.", ctx.nick()))
            }
            Err(e) => {
                ctx.reply(UNAVAILABLE).await?;
                Err(e.into())
            }
        }
    }
}

/// Handler for NHL.
///
/// `nhl [tomorrow]`
pub struct NhlHandler<F> {
    fetcher: F,
}

#[async_trait]
impl<F> CommandHandler for NhlHandler<F>
where
    F: RemoteFetch<Value = Vec<NhlGame>> + 'static,
{
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let today = schedule_today();
        let date = if ctx.args().trim().eq_ignore_ascii_case("tomorrow") {
            today.checked_add_days(Days::new(1)).unwrap_or(today)
        } else {
            today
        };

        match day_lines(&self.fetcher, date, NhlGame::line).await {
            Ok(schedule) => {
                ctx.reply(schedule.as_deref().unwrap_or(NO_GAMES)).await?;
                Ok(format!("{} asked for the NHL schedule.", ctx.nick()))
            }
            Err(e) => {
                ctx.reply(UNAVAILABLE).await?;
                Err(e.into())
            }
        }
    }
}

/// MLS, backed by the `mls` source.
pub struct MlsPlugin<F> {
    handler: Arc<MlsHandler<F>>,
}

impl<F> MlsPlugin<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            handler: Arc::new(MlsHandler { fetcher }),
        }
    }
}

impl<F> Plugin for MlsPlugin<F>
where
    F: RemoteFetch<Value = Vec<MlsGame>> + 'static,
{
    fn name(&self) -> &str {
        "mls"
    }

    fn commands(&self) -> Vec<(String, Arc<dyn CommandHandler>)> {
        let handler: Arc<dyn CommandHandler> = self.handler.clone();
        vec![("mls".to_string(), handler)]
    }

    fn help(&self) -> Vec<HelpEntry> {
        vec![HelpEntry::new(
            "mls",
            "Shows the MLS schedule for today or a given day. Usage: mls [YYYYMMDD]",
        )]
    }
}

/// NHL, backed by the `nhl` source.
pub struct NhlPlugin<F> {
    handler: Arc<NhlHandler<F>>,
}

impl<F> NhlPlugin<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            handler: Arc::new(NhlHandler { fetcher }),
        }
    }
}

impl<F> Plugin for NhlPlugin<F>
where
    F: RemoteFetch<Value = Vec<NhlGame>> + 'static,
{
    fn name(&self) -> &str {
        "nhl"
    }

    fn commands(&self) -> Vec<(String, Arc<dyn CommandHandler>)> {
        let handler: Arc<dyn CommandHandler> = self.handler.clone();
        vec![("nhl".to_string(), handler)]
    }

    fn help(&self) -> Vec<HelpEntry> {
        vec![HelpEntry::new(
            "nhl",
            "Shows today's NHL games. Usage: nhl [tomorrow]",
        )]
    }
}
