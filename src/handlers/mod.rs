//! Built-in command plugins.
//!
//! - [`generic`]: ABOUT, HELP, SEEN
//! - [`admin`]: THROTTLE, IGNORE, RELOAD, TRIGGERS
//! - [`stats`]: STATS (needs the `players` and `player_stats` sources)
//! - [`schedules`]: MLS, NHL (need the `mls` and `nhl` sources)

pub mod admin;
pub mod generic;
pub mod helpers;
pub mod schedules;
pub mod stats;

pub use admin::AdminPlugin;
pub use generic::GenericPlugin;
pub use schedules::{MlsGame, MlsPlugin, NhlGame, NhlPlugin};
pub use stats::{PlayerMatch, PlayerStats, StatsPlugin};

use crate::cache::{HttpJsonFetcher, PersistentStore, SourceError};
use crate::config::Config;
use crate::db::Database;
use crate::kernel::{CommandHandler, Plugin, PluginDescriptor};
use std::sync::Arc;
use tracing::{info, warn};

/// Player search source: query -> candidate list.
pub const SOURCE_PLAYERS: &str = "players";
/// Player stats source: player id -> profile and seasons.
pub const SOURCE_PLAYER_STATS: &str = "player_stats";
/// MLS schedule source: `YYYYMMDD` -> games.
pub const SOURCE_MLS: &str = "mls";
/// NHL schedule source: `YYYYMMDD` -> games.
pub const SOURCE_NHL: &str = "nhl";

/// Pair a command name with its handler for [`Plugin::commands`].
pub(crate) fn command(
    name: &str,
    handler: impl CommandHandler + 'static,
) -> (String, Arc<dyn CommandHandler>) {
    (name.to_string(), Arc::new(handler))
}

/// Build the plugin catalog for a configuration.
///
/// `generic` and `admin` are always present. Source-backed plugins are
/// included only when their sources are configured; a configured source
/// with an unusable URL is an error.
pub fn catalog(config: &Config, db: &Database) -> Result<Vec<PluginDescriptor>, SourceError> {
    let mut catalog = Vec::new();

    let generic_db = db.clone();
    catalog.push(PluginDescriptor::new("generic", move || -> Box<dyn Plugin> {
        Box::new(GenericPlugin::new(generic_db.clone()))
    }));
    catalog.push(PluginDescriptor::new("admin", || -> Box<dyn Plugin> {
        Box::new(AdminPlugin)
    }));

    let sources = &config.sources;
    match (sources.get(SOURCE_PLAYERS), sources.get(SOURCE_PLAYER_STATS)) {
        (Some(search), Some(stats)) => {
            let store: Arc<dyn PersistentStore> = Arc::new(db.clone());
            let search = HttpJsonFetcher::<Vec<PlayerMatch>>::new(search)?;
            let stats = HttpJsonFetcher::<PlayerStats>::new(stats)?;
            catalog.push(PluginDescriptor::new("stats", move || -> Box<dyn Plugin> {
                Box::new(StatsPlugin::new(
                    Arc::clone(&store),
                    search.clone(),
                    stats.clone(),
                ))
            }));
        }
        (None, None) => {}
        _ => warn!(
            "stats needs both the {SOURCE_PLAYERS} and {SOURCE_PLAYER_STATS} sources, not loading it"
        ),
    }

    if let Some(source) = sources.get(SOURCE_MLS) {
        let fetcher = HttpJsonFetcher::<Vec<MlsGame>>::new(source)?;
        catalog.push(PluginDescriptor::new("mls", move || -> Box<dyn Plugin> {
            Box::new(MlsPlugin::new(fetcher.clone()))
        }));
    }

    if let Some(source) = sources.get(SOURCE_NHL) {
        let fetcher = HttpJsonFetcher::<Vec<NhlGame>>::new(source)?;
        catalog.push(PluginDescriptor::new("nhl", move || -> Box<dyn Plugin> {
            Box::new(NhlPlugin::new(fetcher.clone()))
        }));
    }

    info!(
        plugins = ?catalog.iter().map(PluginDescriptor::name).collect::<Vec<_>>(),
        "Plugin catalog built"
    );
    Ok(catalog)
}
