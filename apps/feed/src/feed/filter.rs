//! Preference filtering, split between what the source can express as a
//! WHERE clause and what has to run on the fetched candidates.

use crate::models::opportunity::{Opportunity, OpportunityId};
use crate::models::preferences::Preferences;
use crate::store::OpportunityFilter;

/// Type, arrangement, level and salary floor go to the source.
pub fn source_filter(
    prefs: &Preferences,
    exclude_ids: Vec<OpportunityId>,
    limit: usize,
) -> OpportunityFilter {
    OpportunityFilter {
        active: true,
        exclude_ids,
        types: prefs.opportunity_types.clone(),
        arrangements: prefs.work_arrangements.clone(),
        levels: prefs
            .job_levels
            .iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect(),
        salary_min: prefs.salary_min.filter(|s| *s > 0.0),
        limit,
    }
}

/// Industry and location substring matches, applied after retrieval.
pub fn matches_client_side(prefs: &Preferences, opp: &Opportunity) -> bool {
    matches_industry(&prefs.preferred_industries, opp)
        && matches_location(&prefs.preferred_locations, opp)
}

fn normalized(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}

fn matches_industry(industries: &[String], opp: &Opportunity) -> bool {
    let wanted = normalized(industries);
    if wanted.is_empty() {
        return true;
    }
    // Listings without an industry are not hidden by an industry preference.
    let Some(industry) = opp.industry.as_deref().map(str::to_lowercase) else {
        return true;
    };
    wanted
        .iter()
        .any(|w| industry.contains(w.as_str()) || w.contains(industry.as_str()))
}

fn matches_location(locations: &[String], opp: &Opportunity) -> bool {
    let wanted = normalized(locations);
    if wanted.is_empty() || opp.is_remote() {
        return true;
    }
    let Some(label) = opp.location_label().map(|l| l.to_lowercase()) else {
        return true;
    };
    wanted.iter().any(|w| label.contains(w.as_str()))
}
