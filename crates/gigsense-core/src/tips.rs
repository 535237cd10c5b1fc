//! Recommendation engine
//!
//! Derives a short, prioritized list of actionable tips from the analysis
//! outputs plus a few profile facts. Every rule fires independently; the
//! result is stable-sorted by priority and truncated, so ties keep the order
//! the rules ran in. The city tip pool draw takes the RNG from the caller so
//! tests can seed it.

use rand::Rng;

use crate::models::{StabilityRating, StabilityReport, Tip, TipCategory, TipPriority};
use crate::platforms::{city_benchmark, pairing_for};

/// Maximum tips returned per request
pub const MAX_TIPS: usize = 5;

/// Everything the rules look at, borrowed from the caller's snapshot and
/// profile
#[derive(Debug)]
pub struct TipContext<'a> {
    pub total_income: f64,
    pub platforms: &'a [String],
    pub stability: &'a StabilityReport,
    pub has_tax_profile: bool,
    pub has_benefits: bool,
    pub city: Option<&'a str>,
}

fn has_platform(platforms: &[String], names: &[&str]) -> bool {
    platforms
        .iter()
        .any(|p| names.iter().any(|n| p.as_str() == *n))
}

/// Generate the prioritized tip list for a user
pub fn generate_tips(ctx: &TipContext, rng: &mut impl Rng) -> Vec<Tip> {
    let mut tips: Vec<Tip> = Vec::new();

    // Shaky week-to-week income: diversify
    if ctx.stability.score < 60.0 {
        tips.push(Tip {
            id: "diversify-income".to_string(),
            title: "Smooth out your income".to_string(),
            description: format!(
                "Your income stability score is {:.0}/100. Adding a second platform \
                 fills the slow weeks on your main one.",
                ctx.stability.score
            ),
            category: TipCategory::Stability,
            priority: TipPriority::High,
            action: Some("Compare delivery and rideshare platforms in your area".to_string()),
            link: None,
        });
    }

    // All eggs in one basket: suggest a complement
    if ctx.platforms.len() == 1 {
        let platform = &ctx.platforms[0];
        let pair = pairing_for(platform).join(" or ");
        tips.push(Tip {
            id: "pair-platform".to_string(),
            title: format!("Pair {} with a second app", platform),
            description: format!(
                "Workers on {} commonly add {} to fill dead time between requests \
                 and protect against deactivation risk.",
                platform, pair
            ),
            category: TipCategory::Earnings,
            priority: TipPriority::High,
            action: Some(format!("Sign up for {}", pair)),
            link: None,
        });
    }

    // Flat 30% self-employment set-aside, annualized then split by quarter
    if ctx.has_tax_profile && ctx.total_income > 0.0 {
        let quarterly = ctx.stability.weekly_average * 52.0 * 0.30 / 4.0;
        tips.push(Tip {
            id: "tax-set-aside".to_string(),
            title: "Quarterly tax set-aside".to_string(),
            description: format!(
                "At your current pace, put aside about ${:.0} each quarter \
                 (30% of estimated annual income) for self-employment taxes.",
                quarterly
            ),
            category: TipCategory::Taxes,
            priority: TipPriority::High,
            action: Some("Open a separate savings account for taxes".to_string()),
            link: Some(
                "https://www.irs.gov/businesses/small-businesses-self-employed/self-employed-individuals-tax-center"
                    .to_string(),
            ),
        });
    }

    if !ctx.has_benefits && ctx.total_income > 2000.0 {
        tips.push(Tip {
            id: "health-coverage".to_string(),
            title: "Look into health coverage".to_string(),
            description: "You're earning steadily without benefits enrollment. Marketplace \
                          plans often cost less than expected with the self-employed deduction."
                .to_string(),
            category: TipCategory::Benefits,
            priority: TipPriority::Medium,
            action: Some("Check marketplace plans for your income bracket".to_string()),
            link: Some("https://www.healthcare.gov".to_string()),
        });
    }

    // Local market guidance only applies to rideshare work in a known city
    if let Some(bench) = ctx.city.and_then(city_benchmark) {
        if has_platform(ctx.platforms, &["Uber", "Lyft"]) {
            tips.push(Tip {
                id: "city-benchmark".to_string(),
                title: format!("{} drivers average ${:.2}/hour", bench.city, bench.avg_hourly),
                description: format!(
                    "Typical gross earnings for rideshare drivers in {} run about \
                     ${:.2}/hour. Compare your own trips against that before \
                     committing to a schedule.",
                    bench.city, bench.avg_hourly
                ),
                category: TipCategory::Local,
                priority: TipPriority::Medium,
                action: None,
                link: None,
            });
            tips.push(Tip {
                id: "city-hotspots".to_string(),
                title: format!("Where {} pays best", bench.city),
                description: format!("Busiest pickup zones: {}.", bench.hotspots),
                category: TipCategory::Local,
                priority: TipPriority::Medium,
                action: None,
                link: None,
            });

            let pick = bench.tips[rng.gen_range(0..bench.tips.len())];
            tips.push(Tip {
                id: "city-insider".to_string(),
                title: format!("{} insider tip", bench.city),
                description: pick.to_string(),
                category: TipCategory::Local,
                priority: TipPriority::Low,
                action: None,
                link: None,
            });
        }
    }

    if ctx.total_income >= 5000.0 {
        tips.push(Tip {
            id: "income-milestone".to_string(),
            title: "Top 20% of gig earners".to_string(),
            description: format!(
                "${:.0} in the covered window puts you in the top 20% of gig workers. \
                 Keep records of what's working.",
                ctx.total_income
            ),
            category: TipCategory::Milestone,
            priority: TipPriority::Low,
            action: None,
            link: None,
        });
    }

    match ctx.stability.rating {
        StabilityRating::Stable => tips.push(Tip {
            id: "stability-praise".to_string(),
            title: "Rock-steady income".to_string(),
            description: "Your week-to-week earnings barely move. That consistency makes \
                          budgeting and loan applications much easier."
                .to_string(),
            category: TipCategory::Stability,
            priority: TipPriority::Low,
            action: None,
            link: None,
        }),
        StabilityRating::Variable => tips.push(Tip {
            id: "stability-warning".to_string(),
            title: "Income swings are high".to_string(),
            description: "Your earnings vary a lot week to week. Build a buffer of 2-4 weeks \
                          of expenses before taking on fixed commitments."
                .to_string(),
            category: TipCategory::Stability,
            priority: TipPriority::Medium,
            action: Some("Set up an automatic transfer on payout days".to_string()),
            link: None,
        }),
        StabilityRating::Moderate => {}
    }

    if has_platform(ctx.platforms, &["Uber", "Lyft", "DoorDash"]) {
        tips.push(Tip {
            id: "mileage-deduction".to_string(),
            title: "Track your mileage".to_string(),
            description: "Driving platforms qualify for the standard mileage deduction. \
                          Untracked miles are the most common money left on the table at \
                          tax time."
                .to_string(),
            category: TipCategory::Deductions,
            priority: TipPriority::Medium,
            action: Some("Start a mileage log or app this week".to_string()),
            link: None,
        });
    }

    // Stable sort: ties keep rule order
    tips.sort_by_key(|t| t.priority.rank());
    tips.truncate(MAX_TIPS);
    tips
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn stability(score: f64, weekly_average: f64) -> StabilityReport {
        StabilityReport {
            score,
            rating: crate::analysis::rating_for(score),
            weekly_average,
            variability_pct: 100.0 - score,
        }
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn test_low_stability_triggers_diversification() {
        let platforms = vec!["Uber".to_string(), "Lyft".to_string()];
        let stab = stability(58.0, 400.0);
        let ctx = TipContext {
            total_income: 1600.0,
            platforms: &platforms,
            stability: &stab,
            has_tax_profile: false,
            has_benefits: true,
            city: None,
        };

        let tips = generate_tips(&ctx, &mut rng());
        assert_eq!(tips[0].id, "diversify-income");
        assert_eq!(tips[0].priority, TipPriority::High);
    }

    #[test]
    fn test_single_platform_gets_pairing() {
        let platforms = vec!["Uber".to_string()];
        let stab = stability(80.0, 400.0);
        let ctx = TipContext {
            total_income: 1600.0,
            platforms: &platforms,
            stability: &stab,
            has_tax_profile: false,
            has_benefits: true,
            city: None,
        };

        let tips = generate_tips(&ctx, &mut rng());
        let pairing = tips.iter().find(|t| t.id == "pair-platform").unwrap();
        assert!(pairing.description.contains("DoorDash or Instacart"));
    }

    #[test]
    fn test_unmapped_platform_uses_default_pairing() {
        let platforms = vec!["Other".to_string()];
        let stab = stability(80.0, 400.0);
        let ctx = TipContext {
            total_income: 1600.0,
            platforms: &platforms,
            stability: &stab,
            has_tax_profile: false,
            has_benefits: true,
            city: None,
        };

        let tips = generate_tips(&ctx, &mut rng());
        let pairing = tips.iter().find(|t| t.id == "pair-platform").unwrap();
        assert!(pairing.description.contains("DoorDash or Uber"));
    }

    #[test]
    fn test_tax_estimate_annualized_then_quartered() {
        let platforms = vec!["Uber".to_string(), "Lyft".to_string()];
        let stab = stability(80.0, 1000.0);
        let ctx = TipContext {
            total_income: 4000.0,
            platforms: &platforms,
            stability: &stab,
            has_tax_profile: true,
            has_benefits: true,
            city: None,
        };

        let tips = generate_tips(&ctx, &mut rng());
        let tax = tips.iter().find(|t| t.id == "tax-set-aside").unwrap();
        // 1000/wk * 52 * 0.30 / 4 = 3900
        assert!(tax.description.contains("$3900"));
        assert_eq!(tax.priority, TipPriority::High);
    }

    #[test]
    fn test_no_tax_tip_without_income() {
        let platforms: Vec<String> = vec![];
        let stab = stability(0.0, 0.0);
        let ctx = TipContext {
            total_income: 0.0,
            platforms: &platforms,
            stability: &stab,
            has_tax_profile: true,
            has_benefits: true,
            city: None,
        };

        let tips = generate_tips(&ctx, &mut rng());
        assert!(tips.iter().all(|t| t.id != "tax-set-aside"));
    }

    #[test]
    fn test_benefits_nudge_needs_income_above_2000() {
        let platforms = vec!["Uber".to_string(), "Lyft".to_string()];
        let stab = stability(80.0, 500.0);

        let at_threshold = TipContext {
            total_income: 2000.0,
            platforms: &platforms,
            stability: &stab,
            has_tax_profile: false,
            has_benefits: false,
            city: None,
        };
        let tips = generate_tips(&at_threshold, &mut rng());
        assert!(tips.iter().all(|t| t.id != "health-coverage"));

        let above = TipContext {
            total_income: 2000.01,
            ..at_threshold
        };
        let tips = generate_tips(&above, &mut rng());
        assert!(tips.iter().any(|t| t.id == "health-coverage"));
    }

    #[test]
    fn test_city_tips_only_for_rideshare() {
        let stab = stability(80.0, 500.0);

        // DoorDash-only worker in Austin: no rideshare, no city tips
        let delivery = vec!["DoorDash".to_string()];
        let ctx = TipContext {
            total_income: 1000.0,
            platforms: &delivery,
            stability: &stab,
            has_tax_profile: false,
            has_benefits: true,
            city: Some("Austin"),
        };
        let tips = generate_tips(&ctx, &mut rng());
        assert!(tips.iter().all(|t| t.category != TipCategory::Local));

        // Uber worker in an unknown city: also no city tips
        let rideshare = vec!["Uber".to_string(), "Lyft".to_string()];
        let ctx = TipContext {
            total_income: 1000.0,
            platforms: &rideshare,
            stability: &stab,
            has_tax_profile: false,
            has_benefits: true,
            city: Some("Springfield"),
        };
        let tips = generate_tips(&ctx, &mut rng());
        assert!(tips.iter().all(|t| t.category != TipCategory::Local));

        // Uber worker in Austin: benchmark, hotspots, and one pool tip
        let ctx = TipContext {
            total_income: 1000.0,
            platforms: &rideshare,
            stability: &stab,
            has_tax_profile: false,
            has_benefits: true,
            city: Some("Austin"),
        };
        let tips = generate_tips(&ctx, &mut rng());
        assert!(tips.iter().any(|t| t.id == "city-benchmark"));
        assert!(tips.iter().any(|t| t.id == "city-hotspots"));
        assert!(tips.iter().any(|t| t.id == "city-insider"));
    }

    #[test]
    fn test_city_insider_tip_is_seeded_and_from_pool() {
        let platforms = vec!["Uber".to_string()];
        let stab = stability(80.0, 500.0);
        let ctx = TipContext {
            total_income: 1000.0,
            platforms: &platforms,
            stability: &stab,
            has_tax_profile: false,
            has_benefits: true,
            city: Some("Austin"),
        };

        let first = generate_tips(&ctx, &mut StdRng::seed_from_u64(7));
        let second = generate_tips(&ctx, &mut StdRng::seed_from_u64(7));
        let a = first.iter().find(|t| t.id == "city-insider").unwrap();
        let b = second.iter().find(|t| t.id == "city-insider").unwrap();
        assert_eq!(a.description, b.description);

        let pool = crate::platforms::city_benchmark("Austin").unwrap().tips;
        assert!(pool.contains(&a.description.as_str()));
    }

    #[test]
    fn test_milestone_at_5000() {
        let platforms = vec!["Uber".to_string(), "Lyft".to_string()];
        let stab = stability(80.0, 1250.0);

        let below = TipContext {
            total_income: 4999.99,
            platforms: &platforms,
            stability: &stab,
            has_tax_profile: false,
            has_benefits: true,
            city: None,
        };
        assert!(generate_tips(&below, &mut rng())
            .iter()
            .all(|t| t.id != "income-milestone"));

        let at = TipContext {
            total_income: 5000.0,
            ..below
        };
        assert!(generate_tips(&at, &mut rng())
            .iter()
            .any(|t| t.id == "income-milestone"));
    }

    #[test]
    fn test_praise_and_warning_are_exclusive() {
        let platforms = vec!["Upwork".to_string(), "Fiverr".to_string()];

        let stable = stability(90.0, 800.0);
        let ctx = TipContext {
            total_income: 1000.0,
            platforms: &platforms,
            stability: &stable,
            has_tax_profile: false,
            has_benefits: true,
            city: None,
        };
        let tips = generate_tips(&ctx, &mut rng());
        assert!(tips.iter().any(|t| t.id == "stability-praise"));
        assert!(tips.iter().all(|t| t.id != "stability-warning"));

        let variable = stability(30.0, 800.0);
        let ctx = TipContext {
            stability: &variable,
            ..ctx
        };
        let tips = generate_tips(&ctx, &mut rng());
        assert!(tips.iter().any(|t| t.id == "stability-warning"));
        assert!(tips.iter().all(|t| t.id != "stability-praise"));
    }

    #[test]
    fn test_mileage_tip_for_driving_platforms() {
        let driving = vec!["DoorDash".to_string(), "Grubhub".to_string()];
        let stab = stability(80.0, 300.0);
        let ctx = TipContext {
            total_income: 1200.0,
            platforms: &driving,
            stability: &stab,
            has_tax_profile: false,
            has_benefits: true,
            city: None,
        };
        assert!(generate_tips(&ctx, &mut rng())
            .iter()
            .any(|t| t.id == "mileage-deduction"));

        let freelance = vec!["Upwork".to_string(), "Fiverr".to_string()];
        let ctx = TipContext {
            platforms: &freelance,
            ..ctx
        };
        assert!(generate_tips(&ctx, &mut rng())
            .iter()
            .all(|t| t.id != "mileage-deduction"));
    }

    #[test]
    fn test_priority_order_and_truncation() {
        // Rideshare worker in Austin with praise: pairing (high), then
        // benchmark/hotspots/mileage (medium), then insider/praise (low).
        // Six candidates, so the list truncates to five and praise drops.
        let platforms = vec!["Uber".to_string()];
        let stab = stability(90.0, 750.0);
        let ctx = TipContext {
            total_income: 3000.0,
            platforms: &platforms,
            stability: &stab,
            has_tax_profile: false,
            has_benefits: true,
            city: Some("Austin"),
        };

        let tips = generate_tips(&ctx, &mut rng());
        assert_eq!(tips.len(), MAX_TIPS);

        let ids: Vec<&str> = tips.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "pair-platform",
                "city-benchmark",
                "city-hotspots",
                "mileage-deduction",
                "city-insider",
            ]
        );

        let ranks: Vec<u8> = tips.iter().map(|t| t.priority.rank()).collect();
        let mut sorted = ranks.clone();
        sorted.sort();
        assert_eq!(ranks, sorted);
    }
}
