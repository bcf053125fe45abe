//! tier-runner: headless evaluation runner for the partner tier engine.
//!
//! Usage:
//!   tier-runner ingest ledger.json [--db tiers.db]
//!   tier-runner calculate [--db tiers.db] [--data-dir ./data] [--partner ID]
//!   tier-runner distribution [--db tiers.db] [--data-dir ./data]

use anyhow::{bail, Result};
use std::env;
use tiering_core::{
    config::TierTable,
    engine::TierEngine,
    ledger::load_ledger,
    statistics::TierStatistics,
    store::{TierDistribution, TierStore},
};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("help");
    let db = flag_value(&args, "--db").unwrap_or("tiers.db");
    let data_dir = flag_value(&args, "--data-dir").unwrap_or("./data");

    if command == "help" {
        print_usage();
        return Ok(());
    }

    let store = TierStore::open(db)?;
    store.migrate()?;
    let table = TierTable::load(data_dir)?;
    let engine = TierEngine::new(table, store);

    match command {
        "ingest" => {
            let path = match args.get(2).filter(|a| !a.starts_with("--")) {
                Some(p) => p,
                None => bail!("ingest needs a ledger file: tier-runner ingest ledger.json"),
            };
            let records = load_ledger(path)?;
            let count = engine.ingest(&records)?;
            println!("Ingested {count} commission record(s) from {path}");
        }
        "calculate" => match flag_value(&args, "--partner") {
            Some(partner_id) => {
                let stats = engine.evaluate_partner(partner_id)?;
                print_statistics(&stats);
            }
            None => {
                let summary = engine.evaluate_all()?;
                println!("=== EVALUATION SUMMARY ===");
                println!("  evaluation: {}", summary.evaluation_id);
                println!("  evaluated:  {}", summary.evaluated);
                println!("  unranked:   {}", summary.unranked);
                println!("  moved up:   {}", summary.promotions);
                println!("  moved down: {}", summary.demotions);
                println!();
                print_distribution(&engine.distribution()?);
            }
        },
        "distribution" => {
            println!("=== TIER BANDS ===");
            for band in engine.table().bands() {
                let range = match band.max_avg_commission {
                    Some(max) => format!("${:.2} to ${:.2}", band.min_avg_commission, max),
                    None => format!("${:.2}+", band.min_avg_commission),
                };
                println!(
                    "  {:<9} {range:<22} {:.1}% reward",
                    band.tier_name.to_string(),
                    band.reward_percentage,
                );
            }
            println!();
            print_distribution(&engine.distribution()?);
            let movements = engine.movements()?;
            if !movements.is_empty() {
                println!();
                println!("=== TIER MOVEMENT ===");
                for (status, count) in movements {
                    println!("  {:<8} {count}", status.as_str());
                }
            }
        }
        other => {
            print_usage();
            bail!("unknown command '{other}'");
        }
    }

    Ok(())
}

fn print_statistics(stats: &TierStatistics) {
    println!("=== PARTNER TIER ===");
    println!("  partner:     {}", stats.partner_id);
    println!(
        "  tier:        {} ({:.1}% reward)",
        stats.current_tier, stats.reward_percentage
    );
    println!(
        "  3-month avg: ${:.2} over {} month(s)",
        stats.three_month_avg_commission, stats.months_in_average
    );
    println!(
        "  reward:      ${:.2} on current month ${:.2}",
        stats.reward_amount, stats.current_month_commission
    );
    match stats.previous_tier {
        Some(prev) => println!("  status:      {} (was {prev})", stats.status.as_str()),
        None => println!("  status:      {}", stats.status.as_str()),
    }
    match (stats.next_tier, stats.next_tier_threshold) {
        (Some(next), Some(threshold)) => {
            println!(
                "  next tier:   {next} at ${threshold:.2} | ${:.2} to go, {:.1}% of the way",
                stats.amount_to_next_tier, stats.progress_to_next_tier_pct
            );
        }
        _ => println!("  next tier:   none (top of the programme)"),
    }
}

fn print_distribution(rows: &[TierDistribution]) {
    println!("=== TIER DISTRIBUTION ===");
    if rows.is_empty() {
        println!("  (no partners evaluated yet)");
        return;
    }
    for row in rows {
        println!(
            "  {:<9} {:>4} partner(s) | avg ${:.2} | range ${:.2} to ${:.2}",
            row.tier.to_string(),
            row.partner_count,
            row.avg_commission,
            row.min_commission,
            row.max_commission,
        );
    }
}

fn print_usage() {
    println!("tier-runner: partner tier evaluation");
    println!();
    println!("  tier-runner ingest ledger.json [--db tiers.db]");
    println!("  tier-runner calculate [--db tiers.db] [--data-dir ./data] [--partner ID]");
    println!("  tier-runner distribution [--db tiers.db] [--data-dir ./data]");
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
