use async_graphql::{Context, Object, ID};

use crate::{
    app_state::AppState,
    auth::caller_from_context,
    errors::AppResult,
    graphql::helpers::parse_id,
    models::{
        domain::QuizAnswer,
        dto::{
            request::{CreateQuizInput, SubmitQuizAttemptInput, SubmitSubmissionInput},
            response::{AttemptResultDto, SubmissionDto, TimerStatusDto},
        },
    },
};

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Returns the id of the new quiz.
    async fn create_quiz(&self, ctx: &Context<'_>, input: CreateQuizInput) -> AppResult<ID> {
        let state = ctx.data::<AppState>()?;
        let caller = caller_from_context(ctx)?;

        let quiz = state.quiz_service.create_quiz(&caller, input).await?;
        Ok(ID(quiz.id))
    }

    /// Policy rejections come back as `accepted: false` with a reason, not as errors.
    async fn submit_quiz_attempt(
        &self,
        ctx: &Context<'_>,
        input: SubmitQuizAttemptInput,
    ) -> AppResult<AttemptResultDto> {
        let state = ctx.data::<AppState>()?;
        let caller = caller_from_context(ctx)?;

        let graded = state
            .quiz_service
            .submit_quiz_attempt(&caller, parse_id(&input.quiz_id)?, input.answers)
            .await?;
        Ok(graded.into())
    }

    async fn start_quiz_timer(&self, ctx: &Context<'_>, quiz_id: ID) -> AppResult<TimerStatusDto> {
        let state = ctx.data::<AppState>()?;
        let caller = caller_from_context(ctx)?;

        let status = state
            .quiz_service
            .start_timer(&caller, parse_id(&quiz_id)?)
            .await?;
        Ok(status.into())
    }

    async fn save_quiz_answer(
        &self,
        ctx: &Context<'_>,
        quiz_id: ID,
        question_index: u32,
        answer: QuizAnswer,
    ) -> AppResult<TimerStatusDto> {
        let state = ctx.data::<AppState>()?;
        let caller = caller_from_context(ctx)?;

        let status = state
            .quiz_service
            .save_answer(&caller, parse_id(&quiz_id)?, question_index, answer)
            .await?;
        Ok(status.into())
    }

    /// Submits the answers saved before the deadline after an auto-submit
    /// failed.
    async fn retry_auto_submit(
        &self,
        ctx: &Context<'_>,
        quiz_id: ID,
    ) -> AppResult<AttemptResultDto> {
        let state = ctx.data::<AppState>()?;
        let caller = caller_from_context(ctx)?;

        let graded = state
            .quiz_service
            .retry_auto_submit(&caller, parse_id(&quiz_id)?)
            .await?;
        Ok(graded.into())
    }

    async fn submit_submission(
        &self,
        ctx: &Context<'_>,
        input: SubmitSubmissionInput,
    ) -> AppResult<SubmissionDto> {
        let state = ctx.data::<AppState>()?;
        let caller = caller_from_context(ctx)?;

        let submission = state.similarity_service.submit(&caller, input).await?;
        Ok(submission.into())
    }
}
