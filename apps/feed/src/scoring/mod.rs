//! Match scoring: pluggable, trait-based scorer that measures a user profile
//! against one opportunity's requirements.
//!
//! Default: `RuleBasedScorer` (pure, deterministic, no I/O).
//!
//! `AppState` holds an `Arc<dyn MatchScorer>`. The score is an advisory badge:
//! nothing in the feed filters or sorts on it.

pub mod checks;

use serde::{Deserialize, Serialize};

use crate::models::opportunity::Opportunity;
use crate::models::profile::UserProfile;

// ────────────────────────────────────────────────────────────────────────────
// Output data models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Partial,
    Fail,
    Unknown,
}

impl CheckStatus {
    /// Numeric weight used by the overall mean.
    pub fn weight(&self) -> u32 {
        match self {
            CheckStatus::Pass => 100,
            CheckStatus::Partial => 60,
            CheckStatus::Unknown => 50,
            CheckStatus::Fail => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    Skills,
    Location,
    GraduationYear,
    WorkAuthorization,
    ExperienceLevel,
    Resume,
}

/// Outcome of a single criterion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckOutcome {
    pub criterion: Criterion,
    pub status: CheckStatus,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<u32>,
}

/// Computed, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchResult {
    pub overall_score: u32, // 0 – 100
    pub checks: Vec<CheckOutcome>,
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// Implement this to swap scoring backends without touching the loader or
/// the HTTP layer. Implementations must be pure.
pub trait MatchScorer: Send + Sync {
    fn score(&self, opportunity: &Opportunity, profile: &UserProfile) -> MatchResult;
}

// ────────────────────────────────────────────────────────────────────────────
// RuleBasedScorer
// ────────────────────────────────────────────────────────────────────────────

/// Six independent checks, averaged with equal weight.
///
/// Algorithm:
/// 1. Run each check in fixed order: skills, location, graduation year,
///    work authorization, experience level, resume.
/// 2. A check that cannot be evaluated is reported as `unknown`; the skills
///    check is omitted outright when the opportunity lists no required skills.
/// 3. overall = round(mean(weight(status))) over the checks present.
pub struct RuleBasedScorer;

impl MatchScorer for RuleBasedScorer {
    fn score(&self, opportunity: &Opportunity, profile: &UserProfile) -> MatchResult {
        let checks: Vec<CheckOutcome> = [
            checks::skills(opportunity, profile),
            Some(checks::location(opportunity, profile)),
            Some(checks::graduation_year(opportunity, profile)),
            Some(checks::work_authorization(opportunity, profile)),
            Some(checks::experience_level(opportunity, profile)),
            Some(checks::resume(profile)),
        ]
        .into_iter()
        .flatten()
        .collect();

        MatchResult {
            overall_score: overall_score(&checks),
            checks,
        }
    }
}

/// Unweighted mean of the status weights, rounded. Empty input scores 0.
pub fn overall_score(checks: &[CheckOutcome]) -> u32 {
    if checks.is_empty() {
        return 0;
    }
    let sum: u32 = checks.iter().map(|c| c.status.weight()).sum();
    (sum as f64 / checks.len() as f64).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::opportunity::fixtures::opportunity;
    use crate::models::opportunity::WorkArrangement;
    use crate::models::profile::WorkExperience;

    fn outcome(status: CheckStatus) -> CheckOutcome {
        CheckOutcome {
            criterion: Criterion::Resume,
            status,
            reason: String::new(),
            percentage: None,
        }
    }

    fn complete_profile() -> UserProfile {
        UserProfile {
            id: 7,
            skills: vec!["React.js".to_string(), "TypeScript".to_string()],
            graduation_year: Some(2026),
            location: Some("Austin".to_string()),
            work_authorized: true,
            work_experiences: vec![WorkExperience {
                company: "Initech".to_string(),
                title: "Intern".to_string(),
            }],
            resume_filename: Some("cv.pdf".to_string()),
            ..UserProfile::default()
        }
    }

    #[test]
    fn test_overall_score_is_mean_of_weights() {
        let checks = vec![
            outcome(CheckStatus::Pass),
            outcome(CheckStatus::Partial),
            outcome(CheckStatus::Unknown),
            outcome(CheckStatus::Fail),
        ];
        // (100 + 60 + 50 + 0) / 4 = 52.5 → 53
        assert_eq!(overall_score(&checks), 53);
    }

    #[test]
    fn test_overall_score_empty_is_zero() {
        assert_eq!(overall_score(&[]), 0);
    }

    #[test]
    fn test_skills_check_omitted_when_nothing_required() {
        let result = RuleBasedScorer.score(&opportunity(1), &complete_profile());
        assert_eq!(result.checks.len(), 5);
        assert!(result.checks.iter().all(|c| c.criterion != Criterion::Skills));
    }

    #[test]
    fn test_fully_qualified_profile_scores_100() {
        let mut opp = opportunity(1);
        opp.required_skills = vec!["React".to_string(), "TypeScript".to_string()];
        let result = RuleBasedScorer.score(&opp, &complete_profile());
        assert_eq!(result.checks.len(), 6);
        assert_eq!(result.overall_score, 100);
    }

    #[test]
    fn test_empty_profile_degrades_without_failing_everything() {
        let mut opp = opportunity(1);
        opp.experience_level = Some("senior".to_string());
        let result = RuleBasedScorer.score(&opp, &UserProfile::default());
        let statuses: Vec<CheckStatus> = result.checks.iter().map(|c| c.status).collect();
        assert_eq!(
            statuses,
            vec![
                CheckStatus::Unknown, // location: user has none
                CheckStatus::Unknown, // graduation year
                CheckStatus::Unknown, // work authorization
                CheckStatus::Partial, // experience
                CheckStatus::Fail,    // resume
            ]
        );
        // (50 + 50 + 50 + 60 + 0) / 5 = 42
        assert_eq!(result.overall_score, 42);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let mut opp = opportunity(3);
        opp.required_skills = vec!["Rust".to_string(), "SQL".to_string(), "Go".to_string()];
        opp.work_arrangement = WorkArrangement::Hybrid;
        let profile = complete_profile();

        let first = serde_json::to_vec(&RuleBasedScorer.score(&opp, &profile)).unwrap();
        let second = serde_json::to_vec(&RuleBasedScorer.score(&opp, &profile)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_checks_keep_fixed_order() {
        let mut opp = opportunity(1);
        opp.required_skills = vec!["Rust".to_string()];
        let result = RuleBasedScorer.score(&opp, &complete_profile());
        let order: Vec<Criterion> = result.checks.iter().map(|c| c.criterion).collect();
        assert_eq!(
            order,
            vec![
                Criterion::Skills,
                Criterion::Location,
                Criterion::GraduationYear,
                Criterion::WorkAuthorization,
                Criterion::ExperienceLevel,
                Criterion::Resume,
            ]
        );
    }
}
