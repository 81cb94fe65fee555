use async_graphql::{Context, Object, ID};

use crate::{
    app_state::AppState,
    auth::caller_from_context,
    errors::{AppError, AppResult},
    graphql::helpers::parse_id,
    models::dto::response::{
        QuizAttemptDto, QuizForTaking, SimilarityMatchDto, TextComparisonDto, TimerStatusDto,
        UserProgressDto,
    },
};

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// The caller's profile and XP total.
    async fn me(&self, ctx: &Context<'_>) -> AppResult<UserProgressDto> {
        let state = ctx.data::<AppState>()?;
        let caller = caller_from_context(ctx)?;

        let user = state
            .users
            .find_by_id(&caller.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id '{}' not found", caller.user_id)))?;
        Ok(user.into())
    }

    /// The quiz in presentation order with answer keys removed.
    async fn quiz_for_taking(&self, ctx: &Context<'_>, id: ID) -> AppResult<QuizForTaking> {
        let state = ctx.data::<AppState>()?;
        let caller = caller_from_context(ctx)?;

        let presented = state
            .quiz_service
            .quiz_for_taking(&caller, parse_id(&id)?)
            .await?;
        Ok(presented.into())
    }

    async fn my_quiz_attempts(
        &self,
        ctx: &Context<'_>,
        quiz_id: ID,
    ) -> AppResult<Vec<QuizAttemptDto>> {
        let state = ctx.data::<AppState>()?;
        let caller = caller_from_context(ctx)?;

        let attempts = state
            .quiz_service
            .my_attempts(&caller, parse_id(&quiz_id)?)
            .await?;
        Ok(attempts.into_iter().map(QuizAttemptDto::from).collect())
    }

    /// Null until the caller starts the quiz.
    async fn quiz_timer(&self, ctx: &Context<'_>, quiz_id: ID) -> AppResult<Option<TimerStatusDto>> {
        let state = ctx.data::<AppState>()?;
        let caller = caller_from_context(ctx)?;

        let status = state
            .quiz_service
            .timer_status(&caller, parse_id(&quiz_id)?)
            .await?;
        Ok(status.map(TimerStatusDto::from))
    }

    /// Up to the configured number of most similar submissions to the same
    /// assignment. Teacher only.
    async fn similar_submissions(
        &self,
        ctx: &Context<'_>,
        submission_id: ID,
    ) -> AppResult<Vec<SimilarityMatchDto>> {
        let state = ctx.data::<AppState>()?;
        let caller = caller_from_context(ctx)?;

        let matches = state
            .similarity_service
            .similar_submissions(&caller, parse_id(&submission_id)?)
            .await?;
        Ok(matches.into_iter().map(SimilarityMatchDto::from).collect())
    }

    async fn compare_submissions(
        &self,
        ctx: &Context<'_>,
        first_id: ID,
        second_id: ID,
    ) -> AppResult<TextComparisonDto> {
        let state = ctx.data::<AppState>()?;
        let caller = caller_from_context(ctx)?;

        let comparison = state
            .similarity_service
            .compare_submissions(&caller, parse_id(&first_id)?, parse_id(&second_id)?)
            .await?;
        Ok(comparison.into())
    }
}
