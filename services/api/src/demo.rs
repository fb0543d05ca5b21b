use crate::infra::{InMemoryContestDirectory, InMemorySubmissionStore, SimulatedMetricsSource};
use chrono::{DateTime, Utc};
use clap::Args;
use contest_engine::contests::leaderboard::{
    ContentItemId, EntrantId, LeaderboardService, MetricSample, PageRequest, RankChange,
    RefreshConfig, RefreshEvent, ScoreCalculator, ScoringConfig, ServiceError, SortSpec,
    StandingsPage, StandingsSnapshot, SubmissionPayload, SubmissionStore,
};
use contest_engine::contests::roster::{RosterImporter, RosterSummary};
use contest_engine::contests::{Contest, ContestId, ContestStatus, ContestWindow};
use contest_engine::error::AppError;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Milliseconds between refresh cycles. Defaults to 1000.
    #[arg(long)]
    pub(crate) cadence_ms: Option<u64>,
    /// Number of standings snapshots to render before concluding. Defaults to 4.
    #[arg(long)]
    pub(crate) rounds: Option<u32>,
    /// Optional roster CSV export to seed the demo contest.
    #[arg(long)]
    pub(crate) roster_csv: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// View count reported for the submission.
    #[arg(long)]
    pub(crate) views: i64,
    /// Like count reported for the submission.
    #[arg(long)]
    pub(crate) likes: i64,
    /// Comment count reported for the submission.
    #[arg(long)]
    pub(crate) comments: i64,
    /// Share count reported for the submission.
    #[arg(long)]
    pub(crate) shares: i64,
    /// Content duration in seconds, when known.
    #[arg(long)]
    pub(crate) duration_secs: Option<u32>,
    /// Hours since the content was posted. Defaults to 0 (just now).
    #[arg(long)]
    pub(crate) posted_hours_ago: Option<i64>,
}

pub(crate) fn run_submission_score(args: ScoreArgs) -> Result<(), AppError> {
    let ScoreArgs {
        views,
        likes,
        comments,
        shares,
        duration_secs,
        posted_hours_ago,
    } = args;

    let now = Utc::now();
    let submitted_at = now - chrono::Duration::hours(posted_hours_ago.unwrap_or(0));
    let payload = SubmissionPayload {
        item_id: ContentItemId("preview".to_string()),
        entrant_id: EntrantId("preview".to_string()),
        display_name: None,
        handle: None,
        submitted_at: Some(submitted_at),
        duration_secs,
        metrics: MetricSample {
            views,
            likes,
            comments,
            shares,
        },
    };

    let item = match payload.into_item(now) {
        Ok(item) => item,
        Err(err) => {
            println!("Submission rejected: {}", err);
            return Ok(());
        }
    };

    let calculator = ScoreCalculator::new(ScoringConfig::default());
    let scores = calculator.score_item(&item, now);

    println!("Submission scoring preview");
    println!(
        "- {} profile | engagement {:.1} | quality {:.1} | virality {:.1}",
        scores.profile.label(),
        scores.engagement_score,
        scores.quality_score,
        scores.virality_score
    );
    println!("- Final score: {}", scores.final_score);
    println!("Component breakdown:");
    for component in &scores.components {
        println!(
            "  - {}: {:.1} x {:.2} = {:.1} ({})",
            component.factor.label(),
            component.value,
            component.weight,
            component.weighted,
            component.notes
        );
    }

    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        cadence_ms,
        rounds,
        roster_csv,
    } = args;

    let cadence = Duration::from_millis(cadence_ms.unwrap_or(1000));
    let rounds = rounds.unwrap_or(4).max(1);

    println!("Live contest standings demo");

    let store = Arc::new(InMemorySubmissionStore::default());
    let source = Arc::new(SimulatedMetricsSource::default());
    let directory = Arc::new(InMemoryContestDirectory::default());
    let refresh = RefreshConfig {
        refresh_interval: cadence,
        pulse_interval: Some(cadence * 2),
        ..RefreshConfig::default()
    };
    let service = Arc::new(LeaderboardService::new(
        store.clone(),
        source.clone(),
        directory.clone(),
        ScoringConfig::default(),
        refresh,
    ));

    let (contest_id, roster, imported) =
        seed_demo_contest(roster_csv, &store, &source, &directory)?;
    if imported {
        println!("Data source: roster CSV import");
    } else {
        println!("Data source: built-in demo roster");
    }
    println!(
        "- Contest {} seeded with {} entrants and {} submissions",
        contest_id, roster.entrants, roster.items
    );

    let mut events = service.subscribe(&contest_id).await?;
    service.go_live(&contest_id).await?;

    let mut seen = 0;
    while seen < rounds {
        match events.recv().await {
            Some(RefreshEvent::Standings(snapshot)) => {
                seen += 1;
                render_snapshot(seen, &snapshot);
            }
            Some(RefreshEvent::CycleFailed { reason, .. }) => {
                println!("Refresh cycle failed: {}", reason);
            }
            None => {
                println!("Event stream closed before the demo finished");
                break;
            }
        }
    }

    service.conclude(&contest_id).await?;

    let page = service
        .standings(&contest_id, PageRequest::default(), SortSpec::default())
        .await?;
    render_final(&page);

    Ok(())
}

/// Registers a live demo contest and fills it from either the provided
/// roster export or the built-in one, then primes the synthetic feed with
/// each submission's counters so the first fetch continues from them.
pub(crate) fn seed_demo_contest(
    roster_csv: Option<PathBuf>,
    store: &InMemorySubmissionStore,
    source: &SimulatedMetricsSource,
    directory: &InMemoryContestDirectory,
) -> Result<(ContestId, RosterSummary, bool), AppError> {
    let now = Utc::now();
    let contest_id = ContestId("creator-cup".to_string());
    directory.upsert(Contest {
        id: contest_id.clone(),
        name: "Creator Cup Invitational".to_string(),
        window: ContestWindow {
            starts_at: now - chrono::Duration::hours(1),
            ends_at: now + chrono::Duration::hours(47),
        },
        status: ContestStatus::Live,
        prize_tiers: 3,
    });

    let (summary, imported) = match roster_csv {
        Some(path) => (RosterImporter::from_path(path, store, &contest_id)?, true),
        None => (
            RosterImporter::from_reader(demo_roster_csv(now).as_bytes(), store, &contest_id)?,
            false,
        ),
    };

    for item in store.items(&contest_id).map_err(ServiceError::from)? {
        let sample = MetricSample {
            views: item.metrics.views as i64,
            likes: item.metrics.likes as i64,
            comments: item.metrics.comments as i64,
            shares: item.metrics.shares as i64,
        };
        source.prime(item.id, item.entrant_id, sample);
    }

    Ok((contest_id, summary, imported))
}

fn demo_roster_csv(now: DateTime<Utc>) -> String {
    let posted = |hours: i64| (now - chrono::Duration::hours(hours)).to_rfc3339();
    let rows = [
        ("mara", "Mara Quinn", "@maraquinn", "clip-101", 3, 90, 48_000, 3_100, 520, 180),
        ("theo", "Theo Park", "@theopark", "clip-102", 7, 45, 110_000, 4_200, 390, 140),
        ("isla", "Isla Moreno", "@islamoreno", "clip-103", 12, 150, 26_000, 2_400, 610, 210),
        ("theo", "Theo Park", "@theopark", "clip-104", 1, 60, 18_000, 1_500, 260, 90),
        ("ravi", "Ravi Patel", "@ravipatel", "clip-105", 20, 210, 64_000, 1_900, 170, 60),
    ];

    let mut csv = String::from(
        "Entrant ID,Display Name,Handle,Item ID,Submitted At,Duration Secs,Views,Likes,Comments,Shares\n",
    );
    for (entrant, name, handle, item, hours_ago, duration, views, likes, comments, shares) in rows {
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},{},{},{}\n",
            entrant,
            name,
            handle,
            item,
            posted(hours_ago),
            duration,
            views,
            likes,
            comments,
            shares
        ));
    }
    csv
}

fn render_snapshot(round: u32, snapshot: &StandingsSnapshot) {
    println!(
        "\nRefresh {} ({} UTC)",
        round,
        snapshot.computed_at.format("%H:%M:%S")
    );
    for entry in &snapshot.entries {
        println!(
            "  #{} {} | score {} | {} views | {} submissions | {}",
            entry.rank,
            entry.entrant.display_name,
            entry.scores.final_score,
            entry.totals.views,
            entry.submissions,
            change_label(entry.change)
        );
    }
}

fn render_final(page: &StandingsPage) {
    println!(
        "\nFinal standings for {} ({} entrants)",
        page.contest_id, page.total_entrants
    );
    if page.refresh.is_degraded() {
        println!("Note: the last refresh cycle failed; showing the last good snapshot");
    }
    for entry in &page.entries {
        let prize = match entry.prize_tier {
            Some(tier) => format!(" | prize tier {}", tier),
            None => String::new(),
        };
        println!(
            "  #{} {} | score {}{}",
            entry.rank, entry.entrant.display_name, entry.scores.final_score, prize
        );
    }
    if page.winners.is_empty() {
        println!("Winners: none declared");
    } else {
        println!("Winners:");
        for winner in &page.winners {
            match page.entries.iter().find(|entry| entry.entrant.id == *winner) {
                Some(entry) => println!(
                    "  - #{} {} ({})",
                    entry.rank, entry.entrant.display_name, entry.entrant.handle
                ),
                None => println!("  - {}", winner.0),
            }
        }
    }
}

fn change_label(change: RankChange) -> String {
    match change {
        RankChange::Up(places) => format!("up {}", places),
        RankChange::Down(places) => format!("down {}", places),
        RankChange::Same => "steady".to_string(),
        RankChange::New => "new".to_string(),
    }
}
