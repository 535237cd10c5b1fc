//! Income snapshot, performance, and tips commands

use anyhow::Result;
use chrono::Utc;
use gigsense_core::analysis::{analyze_performance, build_snapshot};
use gigsense_core::db::Database;
use gigsense_core::models::{StabilityRating, TipPriority, TrendDirection};
use gigsense_core::tips::{generate_tips, TipContext};
use rand::rngs::StdRng;
use rand::SeedableRng;

pub fn cmd_analyze(db: &Database, user_id: &str) -> Result<()> {
    let transactions = db.transactions_for_user(user_id)?;
    if transactions.is_empty() {
        println!("No transactions yet. Import a statement first:");
        println!("  gigsense import --file statement.csv");
        return Ok(());
    }

    let snapshot = build_snapshot(user_id, &transactions, Utc::now());
    db.save_snapshot(&snapshot)?;

    println!(
        "📊 Income Snapshot ({} to {})",
        snapshot.start_date, snapshot.end_date
    );
    println!("   ─────────────────────────────");
    println!("   Total income: ${:.2}", snapshot.total_income);

    if snapshot.by_platform.is_empty() {
        println!("   (no income payments found)");
    } else {
        println!("   By platform:");
        for platform in &snapshot.by_platform {
            println!(
                "     {:<12} ${:>10.2}  ({} payment(s))",
                platform.platform, platform.total, platform.count
            );
        }
    }

    let stability = &snapshot.stability;
    let icon = match stability.rating {
        StabilityRating::Stable => "🟢",
        StabilityRating::Moderate => "🟡",
        StabilityRating::Variable => "🔴",
    };
    println!();
    println!(
        "{} Stability: {:.0}/100 ({})",
        icon, stability.score, stability.rating
    );
    println!("   Weekly average: ${:.2}", stability.weekly_average);
    println!("   Variability: {:.1}%", stability.variability_pct);

    let report = analyze_performance(&transactions, Utc::now().date_naive());
    if !report.platforms.is_empty() {
        println!();
        println!("📈 Platform Performance");
        println!("   ─────────────────────────────");
        for metrics in &report.platforms {
            println!(
                "   {:<12} ${:>10.2} total, ${:.2}/trip, consistency {:.0}/100",
                metrics.platform,
                metrics.total_earnings,
                metrics.avg_per_transaction,
                metrics.consistency_score
            );
            match metrics.trend {
                TrendDirection::Stable => println!("      Trend: stable"),
                _ => println!(
                    "      Trend: {} ({:+.1}% vs prior 14 days)",
                    metrics.trend, metrics.trend_pct
                ),
            }
            if !metrics.best_days.is_empty() {
                println!("      Best days: {}", metrics.best_days.join(", "));
            }
            if !metrics.best_hours.is_empty() {
                println!("      Best hours: {}", metrics.best_hours.join(", "));
            }
        }

        // Superlatives only mean something with platforms to compare
        if report.platforms.len() > 1 {
            println!();
            if let Some(ref name) = report.top_earner {
                println!("   🏆 Top earner: {}", name);
            }
            if let Some(ref name) = report.most_consistent {
                println!("   🎯 Most consistent: {}", name);
            }
            if let Some(ref name) = report.best_per_trip {
                println!("   💪 Best per trip: {}", name);
            }
        }
    }

    Ok(())
}

pub fn cmd_tips(db: &Database, user_id: &str, seed: Option<u64>) -> Result<()> {
    let profile = db.ensure_profile(user_id, None)?;

    // Prefer the stored snapshot; fall back to a live computation
    let snapshot = match db.get_snapshot(user_id)? {
        Some(snapshot) => snapshot,
        None => {
            let transactions = db.transactions_for_user(user_id)?;
            if transactions.is_empty() {
                println!("No income data yet. Import a statement first:");
                println!("  gigsense import --file statement.csv");
                return Ok(());
            }
            build_snapshot(user_id, &transactions, Utc::now())
        }
    };

    let platforms: Vec<String> = snapshot
        .by_platform
        .iter()
        .map(|p| p.platform.clone())
        .collect();

    let ctx = TipContext {
        total_income: snapshot.total_income,
        platforms: &platforms,
        stability: &snapshot.stability,
        has_tax_profile: profile.has_tax_profile,
        has_benefits: profile.has_benefits,
        city: profile.city.as_deref(),
    };

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let tips = generate_tips(&ctx, &mut rng);

    if tips.is_empty() {
        println!("✅ No tips right now. Keep earning!");
        return Ok(());
    }

    println!("💡 Tips ({} found)", tips.len());
    println!("   ─────────────────────────────");
    for tip in &tips {
        let icon = match tip.priority {
            TipPriority::High => "🔴",
            TipPriority::Medium => "🟡",
            TipPriority::Low => "🟢",
        };
        println!("   {} {} [{}]", icon, tip.title, tip.category);
        println!("      {}", tip.description);
        if let Some(ref action) = tip.action {
            println!("      Action: {}", action);
        }
    }

    Ok(())
}
