//! The individual eligibility checks. Each one is a pure function of the
//! opportunity and the profile; missing input degrades to `Unknown`.

use crate::models::opportunity::Opportunity;
use crate::models::profile::UserProfile;
use crate::scoring::{CheckOutcome, CheckStatus, Criterion};

pub const DEFAULT_GRADUATION_YEAR_MIN: i32 = 2024;
pub const DEFAULT_GRADUATION_YEAR_MAX: i32 = 2028;

const SKILLS_PASS_PCT: u32 = 70;
const SKILLS_PARTIAL_PCT: u32 = 40;

const ENTRY_LEVEL_MARKERS: &[&str] = &["entry", "intern", "junior"];
const OPEN_LOCATION_MARKERS: &[&str] = &["anywhere", "remote"];

/// Case-insensitive containment in either direction, so "React" and
/// "React.js" match each other regardless of which side lists which.
fn skills_overlap(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim().to_lowercase(), b.trim().to_lowercase());
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.contains(&b) || b.contains(&a)
}

/// `None` when the opportunity requires no skills; the check is then left out
/// of the overall score entirely.
pub fn skills(opportunity: &Opportunity, profile: &UserProfile) -> Option<CheckOutcome> {
    let required: Vec<&str> = opportunity
        .required_skills
        .iter()
        .map(|s| s.as_str())
        .filter(|s| !s.trim().is_empty())
        .collect();
    if required.is_empty() {
        return None;
    }

    let matched = required
        .iter()
        .filter(|req| profile.skills.iter().any(|us| skills_overlap(req, us)))
        .count();
    let percentage = ((matched as f64 / required.len() as f64) * 100.0).round() as u32;

    let status = if percentage >= SKILLS_PASS_PCT {
        CheckStatus::Pass
    } else if percentage >= SKILLS_PARTIAL_PCT {
        CheckStatus::Partial
    } else {
        CheckStatus::Fail
    };

    Some(CheckOutcome {
        criterion: Criterion::Skills,
        status,
        reason: format!("{matched} of {} required skills", required.len()),
        percentage: Some(percentage),
    })
}

/// Never `Fail`: a location mismatch is not disqualifying.
pub fn location(opportunity: &Opportunity, profile: &UserProfile) -> CheckOutcome {
    let make = |status, reason: String| CheckOutcome {
        criterion: Criterion::Location,
        status,
        reason,
        percentage: None,
    };

    if opportunity.is_remote() {
        return make(CheckStatus::Pass, "Remote friendly".to_string());
    }

    let job_location = opportunity.location_label();
    let user_location = profile
        .location
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty());

    let (Some(job_location), Some(user_location)) = (job_location, user_location) else {
        return make(CheckStatus::Unknown, "Location not specified".to_string());
    };

    let job = job_location.to_lowercase();
    let user = user_location.to_lowercase();
    let matches = job.contains(&user)
        || user.contains(&job)
        || OPEN_LOCATION_MARKERS.iter().any(|m| job.contains(m));

    if matches {
        make(CheckStatus::Pass, job_location)
    } else {
        make(
            CheckStatus::Partial,
            format!("{job_location} (you are in {user_location})"),
        )
    }
}

pub fn graduation_year(opportunity: &Opportunity, profile: &UserProfile) -> CheckOutcome {
    let min = opportunity
        .graduation_year_min
        .unwrap_or(DEFAULT_GRADUATION_YEAR_MIN);
    let max = opportunity
        .graduation_year_max
        .unwrap_or(DEFAULT_GRADUATION_YEAR_MAX);

    let status = match profile.graduation_year {
        None => CheckStatus::Unknown,
        Some(year) if (min..=max).contains(&year) => CheckStatus::Pass,
        Some(_) => CheckStatus::Fail,
    };

    CheckOutcome {
        criterion: Criterion::GraduationYear,
        status,
        reason: format!("{min} - {max}"),
        percentage: None,
    }
}

/// Authorization data is usually incomplete, so this never hard-fails.
pub fn work_authorization(opportunity: &Opportunity, profile: &UserProfile) -> CheckOutcome {
    let (status, reason) = if opportunity.open_to_international {
        (CheckStatus::Pass, "Open to all")
    } else if profile.work_authorized {
        (CheckStatus::Pass, "Authorized to work")
    } else {
        (CheckStatus::Unknown, "Authorization required")
    };

    CheckOutcome {
        criterion: Criterion::WorkAuthorization,
        status,
        reason: reason.to_string(),
        percentage: None,
    }
}

pub fn experience_level(opportunity: &Opportunity, profile: &UserProfile) -> CheckOutcome {
    let level = opportunity
        .experience_level
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty());
    let has_experience = !profile.work_experiences.is_empty();
    let is_entry_level = level.is_some_and(|l| {
        let l = l.to_lowercase();
        ENTRY_LEVEL_MARKERS.iter().any(|m| l.contains(m))
    });

    let status = if is_entry_level || has_experience {
        CheckStatus::Pass
    } else if level.is_none() {
        CheckStatus::Unknown
    } else {
        CheckStatus::Partial
    };

    CheckOutcome {
        criterion: Criterion::ExperienceLevel,
        status,
        reason: level.unwrap_or("Not specified").to_string(),
        percentage: None,
    }
}

pub fn resume(profile: &UserProfile) -> CheckOutcome {
    let (status, reason) = if profile.has_resume() {
        (CheckStatus::Pass, "Ready to submit")
    } else {
        (CheckStatus::Fail, "Upload required")
    };

    CheckOutcome {
        criterion: Criterion::Resume,
        status,
        reason: reason.to_string(),
        percentage: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::opportunity::fixtures::opportunity;
    use crate::models::opportunity::WorkArrangement;
    use crate::models::profile::WorkExperience;

    fn with_skills(required: &[&str], user: &[&str]) -> (Opportunity, UserProfile) {
        let mut opp = opportunity(1);
        opp.required_skills = required.iter().map(|s| s.to_string()).collect();
        let profile = UserProfile {
            skills: user.iter().map(|s| s.to_string()).collect(),
            ..UserProfile::default()
        };
        (opp, profile)
    }

    #[test]
    fn test_skills_containment_is_symmetric() {
        let (opp, profile) = with_skills(&["React"], &["React.js"]);
        let forward = skills(&opp, &profile).unwrap();
        let (opp, profile) = with_skills(&["React.js"], &["React"]);
        let backward = skills(&opp, &profile).unwrap();

        assert_eq!(forward.status, CheckStatus::Pass);
        assert_eq!(forward.status, backward.status);
        assert_eq!(forward.percentage, backward.percentage);
    }

    #[test]
    fn test_skills_thresholds() {
        let required = ["a1", "b2", "c3", "d4", "e5", "f6", "g7", "h8", "i9", "j0"];
        let cases = [(7, CheckStatus::Pass), (4, CheckStatus::Partial), (3, CheckStatus::Fail)];
        for (n, expected) in cases {
            let (opp, profile) = with_skills(&required, &required[..n]);
            let check = skills(&opp, &profile).unwrap();
            assert_eq!(check.status, expected, "{n} of 10 matched");
            assert_eq!(check.percentage, Some(n as u32 * 10));
        }
    }

    #[test]
    fn test_skills_case_insensitive() {
        let (opp, profile) = with_skills(&["PostgreSQL"], &["postgresql"]);
        assert_eq!(skills(&opp, &profile).unwrap().status, CheckStatus::Pass);
    }

    #[test]
    fn test_blank_skills_never_match() {
        let (opp, profile) = with_skills(&["Rust", "  "], &[""]);
        let check = skills(&opp, &profile).unwrap();
        assert_eq!(check.reason, "0 of 1 required skills");
        assert_eq!(check.status, CheckStatus::Fail);
    }

    #[test]
    fn test_skills_omitted_when_none_required() {
        let (opp, profile) = with_skills(&[], &["Rust"]);
        assert!(skills(&opp, &profile).is_none());
    }

    #[test]
    fn test_location_remote_always_passes() {
        let mut opp = opportunity(1);
        opp.work_arrangement = WorkArrangement::Remote;
        let check = location(&opp, &UserProfile::default());
        assert_eq!(check.status, CheckStatus::Pass);
    }

    #[test]
    fn test_location_mismatch_is_partial_not_fail() {
        let profile = UserProfile {
            location: Some("Lagos".to_string()),
            ..UserProfile::default()
        };
        assert_eq!(location(&opportunity(1), &profile).status, CheckStatus::Partial);
    }

    #[test]
    fn test_location_containment_either_way() {
        let mut opp = opportunity(1);
        opp.location = Some("Austin".to_string());
        let profile = UserProfile {
            location: Some("Austin, TX".to_string()),
            ..UserProfile::default()
        };
        assert_eq!(location(&opp, &profile).status, CheckStatus::Pass);
    }

    #[test]
    fn test_location_anywhere_marker() {
        let mut opp = opportunity(1);
        opp.location = Some("Anywhere (US timezones)".to_string());
        let profile = UserProfile {
            location: Some("Berlin".to_string()),
            ..UserProfile::default()
        };
        assert_eq!(location(&opp, &profile).status, CheckStatus::Pass);
    }

    #[test]
    fn test_graduation_default_window() {
        let opp = opportunity(1);
        let year = |y| UserProfile {
            graduation_year: y,
            ..UserProfile::default()
        };
        assert_eq!(graduation_year(&opp, &year(Some(2024))).status, CheckStatus::Pass);
        assert_eq!(graduation_year(&opp, &year(Some(2028))).status, CheckStatus::Pass);
        assert_eq!(graduation_year(&opp, &year(Some(2029))).status, CheckStatus::Fail);
        assert_eq!(graduation_year(&opp, &year(None)).status, CheckStatus::Unknown);
        assert_eq!(graduation_year(&opp, &year(None)).reason, "2024 - 2028");
    }

    #[test]
    fn test_graduation_window_from_opportunity() {
        let mut opp = opportunity(1);
        opp.graduation_year_min = Some(2026);
        let profile = UserProfile {
            graduation_year: Some(2025),
            ..UserProfile::default()
        };
        let check = graduation_year(&opp, &profile);
        assert_eq!(check.status, CheckStatus::Fail);
        assert_eq!(check.reason, "2026 - 2028");
    }

    #[test]
    fn test_work_authorization_never_fails() {
        let mut opp = opportunity(1);
        opp.work_authorization = vec!["US Citizens".to_string()];
        let unauthorized = UserProfile::default();
        assert_eq!(
            work_authorization(&opp, &unauthorized).status,
            CheckStatus::Unknown
        );

        opp.open_to_international = true;
        assert_eq!(work_authorization(&opp, &unauthorized).status, CheckStatus::Pass);
    }

    #[test]
    fn test_experience_level() {
        let mut opp = opportunity(1);
        opp.experience_level = Some("Junior Engineer".to_string());
        let novice = UserProfile::default();
        assert_eq!(experience_level(&opp, &novice).status, CheckStatus::Pass);

        opp.experience_level = Some("Senior".to_string());
        assert_eq!(experience_level(&opp, &novice).status, CheckStatus::Partial);

        let experienced = UserProfile {
            work_experiences: vec![WorkExperience {
                company: "Globex".to_string(),
                title: "Engineer".to_string(),
            }],
            ..UserProfile::default()
        };
        assert_eq!(experience_level(&opp, &experienced).status, CheckStatus::Pass);

        opp.experience_level = None;
        assert_eq!(experience_level(&opp, &novice).status, CheckStatus::Unknown);
    }

    #[test]
    fn test_resume_presence() {
        let mut profile = UserProfile::default();
        assert_eq!(resume(&profile).status, CheckStatus::Fail);
        profile.resume_url = Some("https://files.example/cv.pdf".to_string());
        assert_eq!(resume(&profile).status, CheckStatus::Pass);
    }
}
