//! User profile operations

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::UserProfile;

fn row_to_profile(row: &rusqlite::Row) -> rusqlite::Result<UserProfile> {
    let weekly_report: i64 = row.get(4)?;
    let has_tax_profile: i64 = row.get(5)?;
    let has_benefits: i64 = row.get(6)?;
    let created_at_str: String = row.get(7)?;

    Ok(UserProfile {
        id: row.get(0)?,
        user_id: row.get(1)?,
        email: row.get(2)?,
        city: row.get(3)?,
        weekly_report: weekly_report != 0,
        has_tax_profile: has_tax_profile != 0,
        has_benefits: has_benefits != 0,
        created_at: parse_datetime(&created_at_str),
    })
}

const PROFILE_COLUMNS: &str =
    "id, user_id, email, city, weekly_report, has_tax_profile, has_benefits, created_at";

impl Database {
    /// Create a profile if none exists for this user, then return it
    pub fn ensure_profile(&self, user_id: &str, email: Option<&str>) -> Result<UserProfile> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO profiles (user_id, email) VALUES (?, ?)
             ON CONFLICT(user_id) DO NOTHING",
            params![user_id, email],
        )?;

        let profile = conn.query_row(
            &format!("SELECT {} FROM profiles WHERE user_id = ?", PROFILE_COLUMNS),
            params![user_id],
            row_to_profile,
        )?;

        Ok(profile)
    }

    /// Get a profile by user id
    pub fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let conn = self.conn()?;
        let profile = conn
            .query_row(
                &format!("SELECT {} FROM profiles WHERE user_id = ?", PROFILE_COLUMNS),
                params![user_id],
                row_to_profile,
            )
            .optional()?;

        Ok(profile)
    }

    /// Update profile fields; None leaves the current value in place
    pub fn update_profile(
        &self,
        user_id: &str,
        email: Option<&str>,
        city: Option<&str>,
        weekly_report: Option<bool>,
        has_tax_profile: Option<bool>,
        has_benefits: Option<bool>,
    ) -> Result<UserProfile> {
        let conn = self.conn()?;

        conn.execute(
            "UPDATE profiles SET
                email = COALESCE(?, email),
                city = COALESCE(?, city),
                weekly_report = COALESCE(?, weekly_report),
                has_tax_profile = COALESCE(?, has_tax_profile),
                has_benefits = COALESCE(?, has_benefits)
             WHERE user_id = ?",
            params![
                email,
                city,
                weekly_report.map(|b| b as i64),
                has_tax_profile.map(|b| b as i64),
                has_benefits.map(|b| b as i64),
                user_id,
            ],
        )?;

        let profile = conn.query_row(
            &format!("SELECT {} FROM profiles WHERE user_id = ?", PROFILE_COLUMNS),
            params![user_id],
            row_to_profile,
        )?;

        Ok(profile)
    }

    /// Profiles opted in to the weekly summary email
    pub fn list_report_optins(&self) -> Result<Vec<UserProfile>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM profiles WHERE weekly_report = 1 ORDER BY user_id",
            PROFILE_COLUMNS
        ))?;

        let profiles = stmt
            .query_map([], row_to_profile)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(profiles)
    }
}
