//! Postgres backend.
//!
//! Tables: `opportunities`, `user_profiles`, `user_preferences` and
//! `user_swipes`, the last with `UNIQUE (user_id, opportunity_id)`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;

use crate::models::opportunity::{Opportunity, OpportunityId, OpportunityRow};
use crate::models::preferences::{Preferences, PreferencesRow};
use crate::models::profile::{UserId, UserProfile, UserProfileRow};
use crate::models::swipe::{Swipe, SwipeId, SwipeRow, SwipeUpsert};
use crate::store::{OpportunityFilter, OpportunityStore, StoreError};

const OPPORTUNITY_COLUMNS: &str = "id, title, company_name, industry, location, city, state, \
    country, salary_min, salary_max, salary_currency, salary_period, opportunity_type, \
    work_arrangement, experience_level, education_requirement, required_skills, \
    preferred_skills, work_authorization, open_to_international, graduation_year_min, \
    graduation_year_max, application_deadline, is_active";

const SWIPE_COLUMNS: &str = "id, user_id, opportunity_id, action, created_at, updated_at";

#[derive(Clone)]
pub struct PgOpportunityStore {
    pool: PgPool,
}

impl PgOpportunityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn to_opportunity(row: OpportunityRow) -> Result<Opportunity, StoreError> {
    let id = row.id;
    Opportunity::try_from(row).map_err(|e| StoreError::Malformed(format!("opportunity {id}: {e}")))
}

fn to_swipe(row: SwipeRow) -> Result<Swipe, StoreError> {
    let id = row.id;
    Swipe::try_from(row).map_err(|e| StoreError::Malformed(format!("swipe {id}: {e}")))
}

#[async_trait]
impl OpportunityStore for PgOpportunityStore {
    async fn list_opportunities(
        &self,
        filter: &OpportunityFilter,
    ) -> Result<Vec<Opportunity>, StoreError> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {OPPORTUNITY_COLUMNS} FROM opportunities WHERE TRUE"));

        if filter.active {
            qb.push(" AND is_active = TRUE");
        }
        if !filter.exclude_ids.is_empty() {
            qb.push(" AND NOT (id = ANY(")
                .push_bind(filter.exclude_ids.clone())
                .push("))");
        }
        if !filter.types.is_empty() {
            let types: Vec<String> = filter.types.iter().map(|t| t.to_string()).collect();
            qb.push(" AND opportunity_type = ANY(").push_bind(types).push(")");
        }
        if !filter.arrangements.is_empty() {
            let arrangements: Vec<String> =
                filter.arrangements.iter().map(|a| a.to_string()).collect();
            qb.push(" AND work_arrangement = ANY(")
                .push_bind(arrangements)
                .push(")");
        }
        if !filter.levels.is_empty() {
            let levels: Vec<String> = filter.levels.iter().map(|l| l.to_lowercase()).collect();
            qb.push(" AND LOWER(experience_level) = ANY(")
                .push_bind(levels)
                .push(")");
        }
        if let Some(floor) = filter.salary_min {
            qb.push(" AND (COALESCE(salary_max, salary_min) IS NULL OR COALESCE(salary_max, salary_min) >= ")
                .push_bind(floor)
                .push(")");
        }
        qb.push(" ORDER BY id LIMIT ").push_bind(filter.limit as i64);

        let rows = qb
            .build_query_as::<OpportunityRow>()
            .fetch_all(&self.pool)
            .await?;
        debug!("Fetched {} opportunity rows", rows.len());

        rows.into_iter().map(to_opportunity).collect()
    }

    async fn get_opportunity(&self, id: OpportunityId) -> Result<Opportunity, StoreError> {
        let row = sqlx::query_as::<_, OpportunityRow>(&format!(
            "SELECT {OPPORTUNITY_COLUMNS} FROM opportunities WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("opportunity {id}")))?;

        to_opportunity(row)
    }

    async fn list_swipes(&self, user_id: UserId) -> Result<Vec<Swipe>, StoreError> {
        let rows = sqlx::query_as::<_, SwipeRow>(&format!(
            "SELECT {SWIPE_COLUMNS} FROM user_swipes WHERE user_id = $1 ORDER BY updated_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(to_swipe).collect()
    }

    async fn find_swipe(
        &self,
        user_id: UserId,
        opportunity_id: OpportunityId,
    ) -> Result<Option<Swipe>, StoreError> {
        let row = sqlx::query_as::<_, SwipeRow>(&format!(
            "SELECT {SWIPE_COLUMNS} FROM user_swipes WHERE user_id = $1 AND opportunity_id = $2"
        ))
        .bind(user_id)
        .bind(opportunity_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(to_swipe).transpose()
    }

    async fn count_swipes_since(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        Ok(sqlx::query_scalar(
            "SELECT COUNT(*) FROM user_swipes WHERE user_id = $1 AND created_at >= $2",
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn upsert_swipe(&self, record: &SwipeUpsert) -> Result<Swipe, StoreError> {
        let row = sqlx::query_as::<_, SwipeRow>(&format!(
            r#"
            INSERT INTO user_swipes (user_id, opportunity_id, action, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            ON CONFLICT (user_id, opportunity_id)
            DO UPDATE SET action = EXCLUDED.action, updated_at = EXCLUDED.updated_at
            RETURNING {SWIPE_COLUMNS}
            "#
        ))
        .bind(record.user_id)
        .bind(record.opportunity_id)
        .bind(record.action.as_str())
        .bind(record.updated_at)
        .fetch_one(&self.pool)
        .await?;

        to_swipe(row)
    }

    async fn delete_swipe(&self, user_id: UserId, swipe_id: SwipeId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM user_swipes WHERE id = $1 AND user_id = $2")
            .bind(swipe_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_preferences(&self, user_id: UserId) -> Result<Preferences, StoreError> {
        let row = sqlx::query_as::<_, PreferencesRow>(
            r#"
            SELECT user_id, opportunity_types, work_arrangements, job_levels, salary_min,
                   preferred_industries, preferred_locations
            FROM user_preferences
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        // No row yet means the user never set any filter.
        Ok(row.map(Preferences::from).unwrap_or_default())
    }

    async fn get_profile(&self, user_id: UserId) -> Result<UserProfile, StoreError> {
        let row = sqlx::query_as::<_, UserProfileRow>(
            r#"
            SELECT user_id, skills, graduation_year, location, work_authorized,
                   work_experiences, resume_filename, resume_url, has_transcript,
                   headline, bio
            FROM user_profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("profile for user {user_id}")))?;

        Ok(UserProfile::from(row))
    }
}
