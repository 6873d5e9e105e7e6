//! STATS, MLS and NHL against fake remote sources.

mod common;

use chrono::Days;
use common::{BrokenFetcher, Harness, StaticFetcher, user};
use std::sync::Arc;
use straybot::Dispatch;
use straybot::cache::{PersistentStore, RemoteFetch};
use straybot::db::Database;
use straybot::handlers::helpers::INCORRECT_USAGE;
use straybot::handlers::schedules::schedule_today;
use straybot::handlers::stats::{Profile, Season, format_stats};
use straybot::handlers::{MlsGame, MlsPlugin, NhlGame, NhlPlugin, PlayerMatch, PlayerStats, StatsPlugin};
use straybot::kernel::{Plugin, PluginDescriptor};

fn kessel() -> PlayerStats {
    PlayerStats {
        profile: Profile {
            name: "Phil Kessel".into(),
            number: "81".into(),
            position: "RW".into(),
            team: "Toronto Maple Leafs".into(),
            height: "6-0".into(),
            weight: "202".into(),
            birthday: "Oct 2, 1987".into(),
            birthplace: "Madison, WI".into(),
            draft: None,
        },
        seasons: vec![Season {
            season: "2013-14".into(),
            team: "tor".into(),
            stats: serde_json::from_value(serde_json::json!({ "gp": 82, "g": 37, "sog": 305 }))
                .unwrap(),
        }],
    }
}

fn kessel_search() -> Vec<PlayerMatch> {
    vec![
        PlayerMatch {
            id: "8473548".into(),
            name: "Phil Kessel".into(),
            first_season: 2006,
            last_season: 2014,
        },
        PlayerMatch {
            id: "8476000".into(),
            name: "Amanda Kessel".into(),
            first_season: 2010,
            last_season: 2012,
        },
    ]
}

async fn stats_harness<S, P>(search: S, stats: P) -> Harness
where
    S: RemoteFetch<Value = Vec<PlayerMatch>> + Clone + 'static,
    P: RemoteFetch<Value = PlayerStats> + Clone + 'static,
{
    let db = Database::new(":memory:").await.unwrap();
    let store: Arc<dyn PersistentStore> = Arc::new(db);
    let descriptor = PluginDescriptor::new("stats", move || -> Box<dyn Plugin> {
        Box::new(StatsPlugin::new(
            Arc::clone(&store),
            search.clone(),
            stats.clone(),
        ))
    });
    Harness::new(vec![descriptor])
}

fn day_key(offset: u64) -> String {
    let today = schedule_today();
    let day = today.checked_add_days(Days::new(offset)).unwrap();
    day.format("%Y%m%d").to_string()
}

#[tokio::test]
async fn stats_are_fetched_once_per_player() {
    let search = StaticFetcher::new().with("kessel", kessel_search());
    let stats = StaticFetcher::new().with("8473548", kessel());
    let harness = stats_harness(search.clone(), stats.clone()).await;

    assert_eq!(harness.say(&user("bob"), "#leafs", ",stats Kessel").await, Dispatch::Completed);
    assert_eq!(harness.say(&user("bob"), "#leafs", ",stats  kessel ").await, Dispatch::Completed);

    let expected = format_stats(&kessel());
    assert_eq!(harness.sink.to("#leafs"), vec![expected.clone(), expected]);
    assert_eq!((search.calls(), stats.calls()), (1, 1));
    assert_eq!(
        harness
            .info_containing("bob asked for the regular season stats for Phil Kessel")
            .len(),
        2
    );
}

#[tokio::test]
async fn stats_survive_a_reload() {
    let search = StaticFetcher::new().with("kessel", kessel_search());
    let stats = StaticFetcher::new().with("8473548", kessel());
    let harness = stats_harness(search.clone(), stats.clone()).await;

    harness.say(&user("bob"), "#leafs", ",stats kessel").await;
    harness.kernel.reload().unwrap();
    harness.say(&user("bob"), "#leafs", ",stats kessel").await;

    assert_eq!(harness.sink.to("#leafs").len(), 2);
    assert_eq!((search.calls(), stats.calls()), (1, 1));
}

#[tokio::test]
async fn unknown_players_get_a_hint() {
    let search = StaticFetcher::new().with("nobody", Vec::new());
    let stats = StaticFetcher::<PlayerStats>::new();
    let harness = stats_harness(search.clone(), stats.clone()).await;

    for query in ["nobody", "gretzky"] {
        assert_eq!(
            harness
                .say(&user("bob"), "#leafs", &format!(",stats {query}"))
                .await,
            Dispatch::Completed
        );
    }

    assert_eq!(
        harness.sink.to("#leafs"),
        vec![
            "Sorry, no player was found with that query. Make sure you spelled everything right!";
            2
        ]
    );
    assert_eq!(
        harness
            .info_containing("bob asked for the stats of an unknown player: gretzky")
            .len(),
        1
    );
    assert_eq!(stats.calls(), 0);
}

#[tokio::test]
async fn broken_stats_source_is_reported_and_retried() {
    let search = StaticFetcher::new().with("kessel", kessel_search());
    let stats = BrokenFetcher::<PlayerStats>::new();
    let harness = stats_harness(search.clone(), stats.clone()).await;

    for _ in 0..2 {
        assert_eq!(
            harness.say(&user("bob"), "#leafs", ",stats kessel").await,
            Dispatch::Failed
        );
    }

    assert_eq!(
        harness.sink.last().unwrap().1,
        "Sorry, there was an error processing your request. It's possible the stats source is broken."
    );
    assert_eq!(
        harness
            .errors_containing("Command 'stats' failed (args: 'kessel'): connection reset")
            .len(),
        2
    );
    // The search stage was stored; the failed stats stage was not.
    assert_eq!((search.calls(), stats.calls()), (1, 2));
}

#[tokio::test]
async fn stats_needs_a_query() {
    let harness = stats_harness(
        StaticFetcher::<Vec<PlayerMatch>>::new(),
        StaticFetcher::<PlayerStats>::new(),
    )
    .await;

    harness.say(&user("bob"), "#leafs", ",stats").await;
    assert_eq!(harness.sink.to("#leafs"), vec![INCORRECT_USAGE]);
}

#[tokio::test]
async fn mls_schedule_for_a_given_day() {
    let games = vec![
        MlsGame {
            home: "Portland".into(),
            away: "Seattle".into(),
            home_score: Some(2),
            away_score: Some(1),
            status: "FT".into(),
        },
        MlsGame {
            home: "Toronto".into(),
            away: "Montreal".into(),
            home_score: None,
            away_score: None,
            status: "7:30 PM ET".into(),
        },
    ];
    let fetcher = StaticFetcher::new().with("20140412", games);
    let harness = Harness::new(vec![PluginDescriptor::new("mls", move || -> Box<dyn Plugin> {
        Box::new(MlsPlugin::new(fetcher.clone()))
    })]);

    harness.say(&user("bob"), "#soccer", ",mls 20140412").await;
    harness.say(&user("bob"), "#soccer", ",mls 20140413").await;
    harness.say(&user("bob"), "#soccer", ",mls 2014-04-12").await;

    assert_eq!(
        harness.sink.to("#soccer"),
        vec![
            "\x02Portland 2\x0F Seattle 1 (FT)\nToronto vs Montreal (7:30 PM ET)",
            "No games found.",
            "The date specified is incorrectly formatted. Your request should look like ,mls [YYYYMMDD]",
        ]
    );
    assert_eq!(
        harness
            .info_containing("bob asked for the MLS schedule for '2014-04-12', but the date was badly formatted.")
            .len(),
        1
    );
}

#[tokio::test]
async fn nhl_schedule_today_and_tomorrow() {
    let game = |away: &str, home: &str| NhlGame {
        away: away.into(),
        home: home.into(),
        start_time: "7:00 PM".into(),
        broadcasts: vec!["CBC".into()],
    };
    let fetcher = StaticFetcher::new()
        .with(&day_key(0), vec![game("MTL", "TOR")])
        .with(&day_key(1), vec![game("BOS", "DET"), game("NYR", "PIT")]);
    let harness = Harness::new(vec![PluginDescriptor::new("nhl", move || -> Box<dyn Plugin> {
        Box::new(NhlPlugin::new(fetcher.clone()))
    })]);

    harness.say(&user("bob"), "#hockey", ",nhl").await;
    harness.say(&user("bob"), "#hockey", ",nhl Tomorrow").await;

    assert_eq!(
        harness.sink.to("#hockey"),
        vec![
            "MTL @ TOR (7:00 PM ET) [CBC]",
            "BOS @ DET (7:00 PM ET) [CBC]\nNYR @ PIT (7:00 PM ET) [CBC]",
        ]
    );
    assert_eq!(harness.info_containing("bob asked for the NHL schedule.").len(), 2);
}

#[tokio::test]
async fn schedule_source_outage() {
    let fetcher = BrokenFetcher::<Vec<NhlGame>>::new();
    let harness = Harness::new(vec![PluginDescriptor::new("nhl", move || -> Box<dyn Plugin> {
        Box::new(NhlPlugin::new(fetcher.clone()))
    })]);

    assert_eq!(harness.say(&user("bob"), "#hockey", ",nhl").await, Dispatch::Failed);
    assert_eq!(
        harness.sink.to("#hockey"),
        vec!["Sorry, the schedule is unavailable right now."]
    );
    assert_eq!(
        harness
            .errors_containing("Command 'nhl' failed (args: ''): fetch failed: connection reset")
            .len(),
        1
    );
}
