//! Player stats: STATS.
//!
//! A lookup runs in two cache-through stages. The search relation maps the
//! lowercased query to the candidate players; the best candidate's id then
//! keys the stats relation. Both stages hit the remote sources only once per
//! key for the lifetime of the database.

use super::helpers::{INCORRECT_USAGE, bold, ordinal, percent};
use crate::cache::{CacheError, CacheThrough, FetchError, PersistentStore, RemoteFetch};
use crate::error::HandlerResult;
use crate::kernel::{CommandHandler, Context, HelpEntry, Plugin};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Relation holding search query -> candidate players.
pub const PLAYER_SEARCH: &str = "player_search";
/// Relation holding player id -> profile and seasons.
pub const PLAYER_STATS: &str = "player_stats";

const NOT_FOUND_REPLY: &str =
    "Sorry, no player was found with that query. Make sure you spelled everything right!";
const FAILURE_REPLY: &str =
    "Sorry, there was an error processing your request. It's possible the stats source is broken.";

/// One search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerMatch {
    /// Key into the stats relation.
    pub id: String,
    pub name: String,
    pub first_season: i32,
    pub last_season: i32,
}

impl PlayerMatch {
    fn years_active(&self) -> i32 {
        self.last_season - self.first_season
    }

    fn surname(&self) -> &str {
        self.name.split_whitespace().last().unwrap_or_default()
    }
}

/// Pick the player a query most likely means.
///
/// A one-word query is taken as a surname, so exact surname matches rank
/// first. Ties go to the most recently active player, then to the longest
/// career, then to the source's order.
pub fn best_match<'a>(query: &str, candidates: &'a [PlayerMatch]) -> Option<&'a PlayerMatch> {
    let mut words = query.split_whitespace();
    let surname = match (words.next(), words.next()) {
        (Some(only), None) => Some(only),
        _ => None,
    };

    candidates.iter().min_by_key(|candidate| {
        let surname_hit = surname.is_some_and(|s| candidate.surname().eq_ignore_ascii_case(s));
        (
            Reverse(surname_hit),
            Reverse(candidate.last_season),
            Reverse(candidate.years_active()),
        )
    })
}

/// Profile and per-season numbers for one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub profile: Profile,
    /// Oldest first.
    #[serde(default)]
    pub seasons: Vec<Season>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    #[serde(default)]
    pub number: String,
    pub position: String,
    #[serde(default)]
    pub team: String,
    /// Feet and inches as `6-2`.
    #[serde(default)]
    pub height: String,
    #[serde(default)]
    pub weight: String,
    #[serde(default)]
    pub birthday: String,
    #[serde(default)]
    pub birthplace: String,
    #[serde(default)]
    pub draft: Option<Draft>,
}

impl Profile {
    pub fn is_goalie(&self) -> bool {
        self.position.eq_ignore_ascii_case("G")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub year: u16,
    pub round: u32,
    pub overall: u32,
    pub team: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
    /// Label such as `2013-14`.
    pub season: String,
    pub team: String,
    /// Stat columns by lowercase key (`gp`, `g`, `sv`, ...).
    #[serde(default)]
    pub stats: BTreeMap<String, serde_json::Value>,
}

impl Season {
    /// Column as printed; `-` when missing.
    fn text(&self, key: &str) -> String {
        match self.stats.get(key) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Null) | None => "-".to_string(),
            Some(other) => other.to_string(),
        }
    }

    /// Column as a number; NaN when missing or not numeric.
    fn number(&self, key: &str) -> f64 {
        match self.stats.get(key) {
            Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
            Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(f64::NAN),
            _ => f64::NAN,
        }
    }
}

fn format_draft(draft: Option<&Draft>) -> String {
    match draft {
        None => "Undrafted".to_string(),
        Some(d) => format!(
            "Drafted {} by the {}, {} round ({} pick)",
            d.year,
            d.team,
            ordinal(d.round),
            ordinal(d.overall)
        ),
    }
}

/// `name | team pos number | height weight | draft | birth`
pub fn profile_line(profile: &Profile) -> String {
    [
        bold(&profile.name),
        format!("{} {} {}", profile.team, profile.position, profile.number)
            .trim()
            .to_string(),
        format!(
            "{}\" {}lbs",
            profile.height.replacen('-', "'", 1),
            profile.weight
        ),
        format_draft(profile.draft.as_ref()),
        format!("Born on {} in {}", profile.birthday, profile.birthplace),
    ]
    .join(" | ")
}

/// Current-season line, goalie or skater columns.
pub fn season_line(season: &Season, goalie: bool) -> String {
    let mut fields = vec![season.season.clone(), season.team.to_uppercase()];
    let column = |label: &str, key: &str| format!("{label} {}", season.text(key));

    if goalie {
        fields.extend([
            column("GP", "gp"),
            column("GS", "gs"),
            column("MIN", "min"),
            column("W", "w"),
            column("L", "l"),
            column("OTL", "otl"),
            column("GA", "ga"),
            column("GAA", "gaa"),
            column("SA", "sa"),
            column("SV", "sv"),
            format!("SV% {}", percent(season.number("sv"), season.number("sa"))),
            column("SO", "so"),
        ]);
    } else {
        let (won, lost) = (season.number("fw"), season.number("fl"));
        fields.extend([
            column("GP", "gp"),
            column("G", "g"),
            column("A", "a"),
            column("P", "p"),
            column("+/-", "pm"),
            column("PIM", "pim"),
            column("HITS", "hit"),
            column("BLKS", "blk"),
            column("FW", "fw"),
            column("FL", "fl"),
            format!("FO% {}", percent(won, won + lost)),
            column("PPG", "ppg"),
            column("PPA", "ppa"),
            column("SHG", "shg"),
            column("SHA", "sha"),
            column("GWG", "gwg"),
            column("SOG", "sog"),
            format!("PCT {}", percent(season.number("g"), season.number("sog"))),
        ]);
    }
    fields.join(" | ")
}

/// Render the full reply: profile line, then the latest season.
pub fn format_stats(stats: &PlayerStats) -> String {
    let profile = profile_line(&stats.profile);
    match stats.seasons.last() {
        Some(season) => format!(
            "{profile}\n{}",
            season_line(season, stats.profile.is_goalie())
        ),
        None => format!("{profile}\nNo regular season stats on record."),
    }
}

/// Handler for STATS.
///
/// `stats <player name>`
pub struct StatsHandler<S: RemoteFetch, P: RemoteFetch> {
    search: CacheThrough<S>,
    stats: CacheThrough<P>,
}

impl<S, P> StatsHandler<S, P>
where
    S: RemoteFetch<Value = Vec<PlayerMatch>>,
    P: RemoteFetch<Value = PlayerStats>,
{
    pub fn new(store: Arc<dyn PersistentStore>, search: S, stats: P) -> Self {
        Self {
            search: CacheThrough::new(PLAYER_SEARCH, Arc::clone(&store), search),
            stats: CacheThrough::new(PLAYER_STATS, store, stats),
        }
    }

    /// Resolve a free-text query to a player's stats.
    pub async fn lookup(&self, query: &str) -> Result<PlayerStats, CacheError> {
        let candidates = self.search.resolve(query).await?.value;
        let player = best_match(query, &candidates)
            .ok_or_else(|| FetchError::NotFound(query.to_string()))?;
        Ok(self.stats.resolve(&player.id).await?.value)
    }
}

#[async_trait]
impl<S, P> CommandHandler for StatsHandler<S, P>
where
    S: RemoteFetch<Value = Vec<PlayerMatch>> + 'static,
    P: RemoteFetch<Value = PlayerStats> + 'static,
{
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let query = ctx.args().trim();
        if query.is_empty() {
            ctx.reply(INCORRECT_USAGE).await?;
            return Ok(format!("Bad stats arguments: {}", ctx.args()));
        }

        match self.lookup(query).await {
            Ok(stats) => {
                ctx.reply(&format_stats(&stats)).await?;
                Ok(format!(
                    "{} asked for the regular season stats for {}",
                    ctx.nick(),
                    stats.profile.name
                ))
            }
            Err(e) if e.is_not_found() => {
                ctx.reply(NOT_FOUND_REPLY).await?;
                Ok(format!(
                    "{} asked for the stats of an unknown player: {query}",
                    ctx.nick()
                ))
            }
            Err(e) => {
                ctx.reply(FAILURE_REPLY).await?;
                Err(e.into())
            }
        }
    }
}

/// STATS, backed by the player search and player stats sources.
pub struct StatsPlugin<S: RemoteFetch, P: RemoteFetch> {
    handler: Arc<StatsHandler<S, P>>,
}

impl<S, P> StatsPlugin<S, P>
where
    S: RemoteFetch<Value = Vec<PlayerMatch>>,
    P: RemoteFetch<Value = PlayerStats>,
{
    pub fn new(store: Arc<dyn PersistentStore>, search: S, stats: P) -> Self {
        Self {
            handler: Arc::new(StatsHandler::new(store, search, stats)),
        }
    }
}

impl<S, P> Plugin for StatsPlugin<S, P>
where
    S: RemoteFetch<Value = Vec<PlayerMatch>> + 'static,
    P: RemoteFetch<Value = PlayerStats> + 'static,
{
    fn name(&self) -> &str {
        "stats"
    }

    fn commands(&self) -> Vec<(String, Arc<dyn CommandHandler>)> {
        let handler: Arc<dyn CommandHandler> = self.handler.clone();
        vec![("stats".to_string(), handler)]
    }

    fn help(&self) -> Vec<HelpEntry> {
        vec![HelpEntry::new(
            "stats",
            "Shows a player's profile and current regular season stats. Usage: stats player name",
        )]
    }
}
