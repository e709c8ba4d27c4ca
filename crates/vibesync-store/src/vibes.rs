//! Vibe profiles: one row per user, replaced in place.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use vibesync_shared::validation::ValidVibe;
use vibesync_shared::vibe_score::VibeScore;
use vibesync_shared::{Mood, UserId};

use crate::database::{parse_enum, parse_json, parse_ts, parse_uuid, trunc_ms, ts, Database};
use crate::error::Result;
use crate::models::VibeProfile;

const PROFILE_COLUMNS: &str = "user_id, emoji, description, energy_level, current_intent,
    context_tag, interaction_boundary, feeling_options, vibe_availability, personality_prompt,
    mood, energy, positivity, intent, is_active, last_updated";

impl Database {
    /// Create or replace `user`'s profile. Returns the stored profile and
    /// whether it replaced an existing one.
    pub fn upsert_vibe_profile(
        &self,
        user: UserId,
        vibe: &ValidVibe,
        score: &VibeScore,
        now: DateTime<Utc>,
    ) -> Result<(VibeProfile, bool)> {
        let now = trunc_ms(now);
        let existed = self.get_vibe_profile(user)?.is_some();

        self.conn().execute(
            "INSERT INTO vibe_profiles (
                user_id, emoji, description, energy_level, current_intent, context_tag,
                interaction_boundary, feeling_options, vibe_availability, personality_prompt,
                mood, energy, positivity, intent, is_active, last_updated
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, 1, ?15)
             ON CONFLICT(user_id) DO UPDATE SET
                emoji = excluded.emoji,
                description = excluded.description,
                energy_level = excluded.energy_level,
                current_intent = excluded.current_intent,
                context_tag = excluded.context_tag,
                interaction_boundary = excluded.interaction_boundary,
                feeling_options = excluded.feeling_options,
                vibe_availability = excluded.vibe_availability,
                personality_prompt = excluded.personality_prompt,
                mood = excluded.mood,
                energy = excluded.energy,
                positivity = excluded.positivity,
                intent = excluded.intent,
                is_active = 1,
                last_updated = excluded.last_updated",
            params![
                user.to_string(),
                vibe.emoji,
                vibe.description,
                vibe.energy_level,
                serde_json::to_string(&vibe.current_intent)?,
                vibe.context_tag,
                vibe.interaction_boundary,
                serde_json::to_string(&vibe.feeling_options)?,
                vibe.vibe_availability,
                vibe.personality_prompt,
                score.mood.as_str(),
                score.energy,
                score.positivity,
                score.intent,
                ts(now),
            ],
        )?;

        let profile = VibeProfile {
            user,
            emoji: vibe.emoji.clone(),
            description: vibe.description.clone(),
            energy_level: vibe.energy_level,
            current_intent: vibe.current_intent.clone(),
            context_tag: vibe.context_tag.clone(),
            interaction_boundary: vibe.interaction_boundary.clone(),
            feeling_options: vibe.feeling_options.clone(),
            vibe_availability: vibe.vibe_availability.clone(),
            personality_prompt: vibe.personality_prompt.clone(),
            vibe_score: score.clone(),
            is_active: true,
            last_updated: now,
        };
        Ok((profile, existed))
    }

    /// The user's profile, active or not.
    pub fn get_vibe_profile(&self, user: UserId) -> Result<Option<VibeProfile>> {
        Ok(self
            .conn()
            .query_row(
                &format!("SELECT {PROFILE_COLUMNS} FROM vibe_profiles WHERE user_id = ?1"),
                params![user.to_string()],
                row_to_profile,
            )
            .optional()?)
    }

    pub fn get_active_vibe_profile(&self, user: UserId) -> Result<Option<VibeProfile>> {
        Ok(self.get_vibe_profile(user)?.filter(|p| p.is_active))
    }

    /// Every active profile, oldest update first.
    pub fn list_active_profiles(&self) -> Result<Vec<VibeProfile>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {PROFILE_COLUMNS} FROM vibe_profiles
             WHERE is_active = 1
             ORDER BY last_updated ASC, user_id ASC"
        ))?;
        let rows = stmt.query_map([], row_to_profile)?;

        let mut profiles = Vec::new();
        for row in rows {
            profiles.push(row?);
        }
        Ok(profiles)
    }
}

fn row_to_profile(row: &rusqlite::Row<'_>) -> rusqlite::Result<VibeProfile> {
    let user: String = row.get(0)?;
    let current_intent: String = row.get(4)?;
    let feeling_options: String = row.get(7)?;
    let mood: String = row.get(10)?;
    let last_updated: String = row.get(15)?;
    let is_active: i64 = row.get(14)?;

    Ok(VibeProfile {
        user: UserId(parse_uuid(0, &user)?),
        emoji: row.get(1)?,
        description: row.get(2)?,
        energy_level: row.get(3)?,
        current_intent: parse_json(4, &current_intent)?,
        context_tag: row.get(5)?,
        interaction_boundary: row.get(6)?,
        feeling_options: parse_json(7, &feeling_options)?,
        vibe_availability: row.get(8)?,
        personality_prompt: row.get(9)?,
        vibe_score: VibeScore {
            mood: parse_enum::<Mood>(10, &mood)?,
            energy: row.get(11)?,
            positivity: row.get(12)?,
            intent: row.get(13)?,
        },
        is_active: is_active != 0,
        last_updated: parse_ts(15, &last_updated)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vibesync_shared::validation::VibeSubmission;
    use vibesync_shared::vibe_score::{calculate_vibe_score, VibeInput};

    fn vibe(level: i64) -> ValidVibe {
        VibeSubmission {
            emoji: Some("😌".into()),
            description: Some("quiet evening tea".into()),
            energy_level: Some(level),
            current_intent: Some(vec!["Chill conversation".into()]),
            context_tag: None,
            interaction_boundary: Some("Slow replies".into()),
            ..Default::default()
        }
        .validate()
        .unwrap()
    }

    fn score(v: &ValidVibe) -> VibeScore {
        calculate_vibe_score(&VibeInput {
            emoji: &v.emoji,
            description: &v.description,
            energy_level: v.energy_level,
            current_intent: &v.current_intent,
            context_tag: v.context_tag.as_deref(),
        })
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("vibes.db")).unwrap();
        let now = Utc::now();
        let user = db.create_user("u", "h", now).unwrap().id;

        let first = vibe(3);
        let (_, existed) = db.upsert_vibe_profile(user, &first, &score(&first), now).unwrap();
        assert!(!existed);

        let second = vibe(8);
        let (stored, existed) = db.upsert_vibe_profile(user, &second, &score(&second), now).unwrap();
        assert!(existed);

        let loaded = db.get_active_vibe_profile(user).unwrap().unwrap();
        assert_eq!(loaded, stored);
        assert_eq!(loaded.energy_level, 8);
        assert_eq!(db.list_active_profiles().unwrap().len(), 1);
    }
}
