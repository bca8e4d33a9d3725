//! crates/skill_exchange_core/src/matching.rs
//!
//! The match engine: a deterministic, pure scoring function over profile
//! pairs, plus the thin service that feeds it from the profile store.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::{Availability, Profile, SkillLevel};
use crate::ports::{PortError, PortResult, ProfileStore};

/// Ranked output is capped at this many candidates.
pub const MAX_MATCHES: usize = 10;

const SKILL_OVERLAP_WEIGHT: f64 = 5.0;
const AVAILABILITY_BONUS: f64 = 3.0;
const LEVEL_COMPAT_BONUS: f64 = 2.0;
const RATING_WEIGHT: f64 = 0.2;
const TOKEN_WEIGHT: f64 = 0.1;
const DEFAULT_RATING: f64 = 5.0;

/// One ranked candidate, carrying the profile fields a client needs to
/// render the match. `score` is rounded to 2 decimal places for output.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub user_id: Uuid,
    pub score: f64,
    pub skills_offer: Vec<String>,
    pub skills_learn: Vec<String>,
    pub availability: Availability,
    pub level: SkillLevel,
    pub bio: String,
    pub rating: Option<f64>,
    pub tokens: Option<i64>,
}

/// Compatibility score between a requester and one candidate.
///
/// Skill overlap counts in both directions at 5 points per skill, exact
/// availability match is worth 3, a level gap of at most one step is worth
/// 2, and the candidate's reputation contributes 0.2 per rating point
/// (missing rating counts as 5) plus 0.1 per token.
pub fn match_score(requester: &Profile, candidate: &Profile) -> f64 {
    let offer_overlap = requester
        .skills_offer
        .iter()
        .filter(|skill| candidate.skills_learn.contains(skill))
        .count();
    let reverse_overlap = candidate
        .skills_offer
        .iter()
        .filter(|skill| requester.skills_learn.contains(skill))
        .count();

    let mut score = SKILL_OVERLAP_WEIGHT * (offer_overlap + reverse_overlap) as f64;

    if requester.availability == candidate.availability {
        score += AVAILABILITY_BONUS;
    }

    let level_gap = (requester.level.ordinal() - candidate.level.ordinal()).abs();
    if level_gap <= 1 {
        score += LEVEL_COMPAT_BONUS;
    }

    score += RATING_WEIGHT * candidate.rating.unwrap_or(DEFAULT_RATING);
    score += TOKEN_WEIGHT * candidate.tokens.unwrap_or(0) as f64;

    score
}

/// Scores, filters, ranks and caps the candidate pool.
///
/// Candidates with a non-positive score are dropped. Ranking is by the
/// unrounded score, descending; the sort is stable so equal scores keep
/// their input order. The reported score is rounded only at the end.
pub fn compute_matches(requester: &Profile, candidates: &[Profile]) -> Vec<MatchResult> {
    let mut scored: Vec<(f64, &Profile)> = candidates
        .iter()
        .map(|candidate| (match_score(requester, candidate), candidate))
        .filter(|(score, _)| *score > 0.0)
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    scored.truncate(MAX_MATCHES);

    scored
        .into_iter()
        .map(|(score, profile)| MatchResult {
            user_id: profile.user_id,
            score: (score * 100.0).round() / 100.0,
            skills_offer: profile.skills_offer.clone(),
            skills_learn: profile.skills_learn.clone(),
            availability: profile.availability,
            level: profile.level,
            bio: profile.bio.clone(),
            rating: profile.rating,
            tokens: profile.tokens,
        })
        .collect()
}

/// Feeds the pure engine from the profile store and owns the
/// profile-required precondition.
pub struct MatchService {
    profiles: Arc<dyn ProfileStore>,
}

impl MatchService {
    pub fn new(profiles: Arc<dyn ProfileStore>) -> Self {
        Self { profiles }
    }

    /// Ranked matches for the requesting user.
    ///
    /// Fails with [`PortError::ProfileRequired`] when the requester has no
    /// profile yet. An empty candidate pool yields an empty list, not an
    /// error.
    pub async fn find_matches(&self, user_id: Uuid) -> PortResult<Vec<MatchResult>> {
        let requester = match self.profiles.get_profile(user_id).await {
            Ok(profile) => profile,
            Err(PortError::NotFound(_)) => return Err(PortError::ProfileRequired),
            Err(e) => return Err(e),
        };
        let candidates = self.profiles.list_other_profiles(user_id).await?;
        Ok(compute_matches(&requester, &candidates))
    }
}
