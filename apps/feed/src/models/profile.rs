use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

pub type UserId = i64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkExperience {
    pub company: String,
    pub title: String,
}

/// The scoring input for one user. Edited elsewhere; read-only here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub id: UserId,
    pub skills: Vec<String>,
    pub graduation_year: Option<i32>,
    pub location: Option<String>,
    pub work_authorized: bool,
    pub work_experiences: Vec<WorkExperience>,
    pub resume_filename: Option<String>,
    pub resume_url: Option<String>,
    pub has_transcript: bool,
    pub headline: Option<String>,
    pub bio: Option<String>,
}

impl UserProfile {
    pub fn has_resume(&self) -> bool {
        [&self.resume_filename, &self.resume_url]
            .into_iter()
            .any(|v| v.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct UserProfileRow {
    pub user_id: i64,
    pub skills: Vec<String>,
    pub graduation_year: Option<i32>,
    pub location: Option<String>,
    pub work_authorized: bool,
    pub work_experiences: Json<Vec<WorkExperience>>,
    pub resume_filename: Option<String>,
    pub resume_url: Option<String>,
    pub has_transcript: bool,
    pub headline: Option<String>,
    pub bio: Option<String>,
}

impl From<UserProfileRow> for UserProfile {
    fn from(row: UserProfileRow) -> Self {
        UserProfile {
            id: row.user_id,
            skills: row.skills,
            graduation_year: row.graduation_year,
            location: row.location,
            work_authorized: row.work_authorized,
            work_experiences: row.work_experiences.0,
            resume_filename: row.resume_filename,
            resume_url: row.resume_url,
            has_transcript: row.has_transcript,
            headline: row.headline,
            bio: row.bio,
        }
    }
}
