use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::Result;
use crate::middleware::AuthUser;
use crate::models::Stats;
use crate::repositories::DateRange;
use crate::state::AppState;
use crate::validation::validate_date_range;

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
}

pub async fn index(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<StatsQuery>,
) -> Result<Json<Stats>> {
    validate_date_range(query.from, query.to)?;

    let sessions_this_week = state
        .workout_repo
        .count_sessions_this_week(&auth_user.id)
        .await?;
    let sessions_this_month = state
        .workout_repo
        .count_sessions_this_month(&auth_user.id)
        .await?;
    let range = state
        .workout_repo
        .range_totals(
            &auth_user.id,
            DateRange {
                from: query.from,
                to: query.to,
            },
        )
        .await?;

    Ok(Json(Stats {
        sessions_this_week,
        sessions_this_month,
        range,
    }))
}
