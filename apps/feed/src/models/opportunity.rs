use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::scoring::MatchResult;

pub type OpportunityId = i64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityType {
    Job,
    Internship,
    Scholarship,
    Grant,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WorkArrangement {
    Remote,
    Hybrid,
    Onsite,
}

impl OpportunityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpportunityType::Job => "job",
            OpportunityType::Internship => "internship",
            OpportunityType::Scholarship => "scholarship",
            OpportunityType::Grant => "grant",
        }
    }
}

impl WorkArrangement {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkArrangement::Remote => "remote",
            WorkArrangement::Hybrid => "hybrid",
            WorkArrangement::Onsite => "onsite",
        }
    }
}

impl FromStr for OpportunityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "job" => Ok(OpportunityType::Job),
            "internship" => Ok(OpportunityType::Internship),
            "scholarship" => Ok(OpportunityType::Scholarship),
            "grant" => Ok(OpportunityType::Grant),
            other => Err(format!("unknown opportunity type '{other}'")),
        }
    }
}

impl FromStr for WorkArrangement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "remote" => Ok(WorkArrangement::Remote),
            "hybrid" => Ok(WorkArrangement::Hybrid),
            "onsite" | "on-site" | "on_site" => Ok(WorkArrangement::Onsite),
            other => Err(format!("unknown work arrangement '{other}'")),
        }
    }
}

impl fmt::Display for OpportunityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for WorkArrangement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A listing as served by the employer-side system. Read-only on this side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Opportunity {
    pub id: OpportunityId,
    pub title: String,
    pub company_name: Option<String>,
    pub industry: Option<String>,

    pub location: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,

    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub salary_currency: String,
    pub salary_period: String,

    pub opportunity_type: OpportunityType,
    pub work_arrangement: WorkArrangement,
    pub experience_level: Option<String>,
    pub education_requirement: Option<String>,

    pub required_skills: Vec<String>,
    pub preferred_skills: Vec<String>,
    pub work_authorization: Vec<String>,
    pub open_to_international: bool,
    pub graduation_year_min: Option<i32>,
    pub graduation_year_max: Option<i32>,

    pub application_deadline: Option<NaiveDate>,
    pub is_active: bool,
}

impl Opportunity {
    pub fn is_remote(&self) -> bool {
        self.work_arrangement == WorkArrangement::Remote
    }

    /// Display location: the free-text field if set, else "city, state, country".
    pub fn location_label(&self) -> Option<String> {
        if let Some(loc) = self.location.as_deref().map(str::trim) {
            if !loc.is_empty() {
                return Some(loc.to_string());
            }
        }
        let parts: Vec<&str> = [&self.city, &self.state, &self.country]
            .into_iter()
            .filter_map(|p| p.as_deref().map(str::trim))
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

/// Row shape of the `opportunities` table. Enum columns are TEXT.
#[derive(Debug, Clone, FromRow)]
pub struct OpportunityRow {
    pub id: i64,
    pub title: String,
    pub company_name: Option<String>,
    pub industry: Option<String>,
    pub location: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub salary_currency: String,
    pub salary_period: String,
    pub opportunity_type: String,
    pub work_arrangement: String,
    pub experience_level: Option<String>,
    pub education_requirement: Option<String>,
    pub required_skills: Vec<String>,
    pub preferred_skills: Vec<String>,
    pub work_authorization: Vec<String>,
    pub open_to_international: bool,
    pub graduation_year_min: Option<i32>,
    pub graduation_year_max: Option<i32>,
    pub application_deadline: Option<NaiveDate>,
    pub is_active: bool,
}

impl TryFrom<OpportunityRow> for Opportunity {
    type Error = String;

    fn try_from(row: OpportunityRow) -> Result<Self, Self::Error> {
        Ok(Opportunity {
            id: row.id,
            title: row.title,
            company_name: row.company_name,
            industry: row.industry,
            location: row.location,
            city: row.city,
            state: row.state,
            country: row.country,
            salary_min: row.salary_min,
            salary_max: row.salary_max,
            salary_currency: row.salary_currency,
            salary_period: row.salary_period,
            opportunity_type: row.opportunity_type.parse()?,
            work_arrangement: row.work_arrangement.parse()?,
            experience_level: row.experience_level,
            education_requirement: row.education_requirement,
            required_skills: row.required_skills,
            preferred_skills: row.preferred_skills,
            work_authorization: row.work_authorization,
            open_to_international: row.open_to_international,
            graduation_year_min: row.graduation_year_min,
            graduation_year_max: row.graduation_year_max,
            application_deadline: row.application_deadline,
            is_active: row.is_active,
        })
    }
}

/// An opportunity as it sits in the card stack, annotated with its match result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedCard {
    #[serde(flatten)]
    pub opportunity: Opportunity,
    pub match_result: MatchResult,
}

impl FeedCard {
    pub fn id(&self) -> OpportunityId {
        self.opportunity.id
    }
}
