//! User profile commands

use anyhow::Result;
use gigsense_core::db::Database;

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

pub fn cmd_profile_show(db: &Database, user_id: &str) -> Result<()> {
    let profile = db.ensure_profile(user_id, None)?;

    println!("👤 Profile: {}", profile.user_id);
    println!("   ─────────────────────────────");
    println!(
        "   Email: {}",
        profile.email.as_deref().unwrap_or("(not set)")
    );
    println!(
        "   City: {}",
        profile.city.as_deref().unwrap_or("(not set)")
    );
    println!("   Weekly report: {}", yes_no(profile.weekly_report));
    println!("   Tax profile: {}", yes_no(profile.has_tax_profile));
    println!("   Benefits: {}", yes_no(profile.has_benefits));

    Ok(())
}

pub fn cmd_profile_set(
    db: &Database,
    user_id: &str,
    email: Option<&str>,
    city: Option<&str>,
    weekly_report: Option<bool>,
    tax_profile: Option<bool>,
    benefits: Option<bool>,
) -> Result<()> {
    if email.is_none()
        && city.is_none()
        && weekly_report.is_none()
        && tax_profile.is_none()
        && benefits.is_none()
    {
        anyhow::bail!(
            "Nothing to update. Pass at least one of --email, --city, \
             --weekly-report, --tax-profile, --benefits."
        );
    }

    db.ensure_profile(user_id, None)?;
    db.update_profile(user_id, email, city, weekly_report, tax_profile, benefits)?;

    println!("✅ Profile updated");
    println!();
    cmd_profile_show(db, user_id)
}
