use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use validator::Validate;

use crate::{
    auth::{require_class_member, require_class_teacher, CallerIdentity},
    errors::{AppError, AppResult},
    models::{
        domain::{Classroom, Quiz, QuizAnswer, QuizAttempt},
        dto::request::CreateQuizInput,
    },
    repositories::{ClassroomRepository, QuizAttemptRepository, QuizRepository},
    services::{
        attempt_session::{AttemptSession, SessionRegistry, SessionState, SharedSession},
        quiz_attempt_service::{AttemptResult, QuizAttemptService, RejectionReason},
        quiz_randomizer::prepare_quiz_for_presentation,
    },
};

const AUTO_SUBMIT_FAILED: &str = "could not auto-submit, try again";

/// A quiz in the order one student sees it, answer keys still attached.
#[derive(Clone, Debug)]
pub struct PresentedQuiz {
    pub quiz: Quiz,
    pub attempts_used: u32,
    pub attempts_left: Option<u32>,
    pub advertised_xp: i64,
    pub closed: bool,
}

#[derive(Clone, Debug)]
pub struct GradedAttempt {
    pub result: AttemptResult,
    /// One entry per presented question; empty unless the quiz shows explanations.
    pub explanations: Vec<Option<String>>,
    pub auto_submitted: bool,
}

#[derive(Clone, Debug)]
pub struct TimerStatus {
    pub quiz_id: String,
    pub state: SessionState,
    pub deadline: Option<DateTime<Utc>>,
    pub remaining: Option<Duration>,
    /// Present after a failed auto-submit; the saved answers are still there
    /// for `retry_auto_submit`.
    pub auto_submit_error: Option<String>,
}

impl TimerStatus {
    fn of(session: &AttemptSession, now: DateTime<Utc>) -> Self {
        TimerStatus {
            quiz_id: session.quiz_id().to_string(),
            state: session.state(),
            deadline: session.deadline(),
            remaining: session.remaining(now),
            auto_submit_error: session.auto_submit_error().map(str::to_string),
        }
    }
}

#[derive(Clone)]
pub struct QuizService {
    quizzes: Arc<dyn QuizRepository>,
    attempts: Arc<dyn QuizAttemptRepository>,
    classrooms: Arc<dyn ClassroomRepository>,
    grader: Arc<QuizAttemptService>,
    sessions: Arc<SessionRegistry>,
}

impl QuizService {
    pub fn new(
        quizzes: Arc<dyn QuizRepository>,
        attempts: Arc<dyn QuizAttemptRepository>,
        classrooms: Arc<dyn ClassroomRepository>,
        grader: QuizAttemptService,
    ) -> Self {
        Self {
            quizzes,
            attempts,
            classrooms,
            grader: Arc::new(grader),
            sessions: Arc::new(SessionRegistry::new()),
        }
    }

    pub async fn create_quiz(
        &self,
        caller: &CallerIdentity,
        input: CreateQuizInput,
    ) -> AppResult<Quiz> {
        input.validate()?;

        let classroom = self.load_classroom(&input.class_id).await?;
        require_class_teacher(&classroom, caller)?;

        let quiz = self.quizzes.create(input.into_quiz(&caller.user_id)).await?;
        log::info!(
            "Created quiz {} with {} questions in class {}",
            quiz.id,
            quiz.questions.len(),
            quiz.class_id
        );
        Ok(quiz)
    }

    pub async fn quiz_for_taking(
        &self,
        caller: &CallerIdentity,
        quiz_id: &str,
    ) -> AppResult<PresentedQuiz> {
        let quiz = self.load_quiz_for_member(caller, quiz_id).await?;
        let attempts_used = self.prior_attempts(&caller.user_id, &quiz.id).await?;

        Ok(PresentedQuiz {
            attempts_left: quiz
                .effective_max_attempts()
                .map(|max| max.saturating_sub(attempts_used)),
            advertised_xp: quiz.advertised_xp(self.grader.default_xp_per_question()),
            closed: quiz.is_closed_at(self.grader.now()),
            quiz: present(&quiz),
            attempts_used,
        })
    }

    pub async fn my_attempts(
        &self,
        caller: &CallerIdentity,
        quiz_id: &str,
    ) -> AppResult<Vec<QuizAttempt>> {
        let quiz = self.load_quiz_for_member(caller, quiz_id).await?;
        self.attempts
            .find_by_user_and_quiz(&caller.user_id, &quiz.id)
            .await
    }

    /// Grades and stores a manual submission. When the student has a live
    /// session for the quiz, the submission races any pending auto-submit
    /// through that session and only one of them is recorded.
    pub async fn submit_quiz_attempt(
        &self,
        caller: &CallerIdentity,
        quiz_id: &str,
        answers: Vec<QuizAnswer>,
    ) -> AppResult<GradedAttempt> {
        let quiz = self.load_quiz_for_member(caller, quiz_id).await?;
        let student_id = caller.user_id.as_str();

        let Some(session) = self.sessions.get(&quiz.id, student_id).await else {
            return self.record(&quiz, student_id, answers, false).await;
        };

        // untimed retakes do not need a fresh session
        if !quiz.is_timed() && session.lock().await.is_completed() {
            self.sessions.remove(&quiz.id, student_id).await;
            return self.record(&quiz, student_id, answers, false).await;
        }

        let outcome = SessionRegistry::submit_once(&session, |_| {
            self.record(&quiz, student_id, answers, false)
        })
        .await?;

        match outcome {
            Some(graded) => Ok(graded),
            None => {
                log::info!(
                    "Duplicate submission of quiz {} by {} rejected",
                    quiz.id,
                    student_id
                );
                self.duplicate(&quiz, student_id).await
            }
        }
    }

    /// Opens a session for the caller and starts it. Timed quizzes also get a
    /// background task that submits the saved answers at the deadline.
    pub async fn start_timer(
        &self,
        caller: &CallerIdentity,
        quiz_id: &str,
    ) -> AppResult<TimerStatus> {
        let quiz = self.load_quiz_for_member(caller, quiz_id).await?;
        let now = self.grader.now();

        let prior = self.prior_attempts(&caller.user_id, &quiz.id).await?;
        if let Err(reason) = QuizAttemptService::check_policy(&quiz, prior, now) {
            return Err(AppError::BadRequest(reason.message().to_string()));
        }

        let session = self.sessions.open(&quiz, &caller.user_id).await;
        let mut guard = session.lock().await;
        if guard.state() == SessionState::InProgress {
            return Ok(TimerStatus::of(&guard, now));
        }

        if let Some(secs) = quiz.time_limit_secs.filter(|_| quiz.is_timed()) {
            guard.arm(Duration::seconds(i64::from(secs)))?;
        }
        guard.start(now)?;

        if let Some(remaining) = guard.remaining(now) {
            log::info!(
                "Started {}s timer on quiz {} for {}",
                remaining.num_seconds(),
                quiz.id,
                caller.user_id
            );
            self.spawn_auto_submit(quiz, caller.user_id.clone(), Arc::clone(&session), remaining);
        }

        Ok(TimerStatus::of(&guard, now))
    }

    /// The caller's live session on the quiz, if they started one.
    pub async fn timer_status(
        &self,
        caller: &CallerIdentity,
        quiz_id: &str,
    ) -> AppResult<Option<TimerStatus>> {
        let quiz = self.load_quiz_for_member(caller, quiz_id).await?;
        let Some(session) = self.sessions.get(&quiz.id, &caller.user_id).await else {
            return Ok(None);
        };

        let guard = session.lock().await;
        Ok(Some(TimerStatus::of(&guard, self.grader.now())))
    }

    pub async fn save_answer(
        &self,
        caller: &CallerIdentity,
        quiz_id: &str,
        question_index: u32,
        answer: QuizAnswer,
    ) -> AppResult<TimerStatus> {
        let session = self
            .sessions
            .get(quiz_id, &caller.user_id)
            .await
            .ok_or_else(|| AppError::BadRequest("Start the quiz before saving answers".to_string()))?;

        let now = self.grader.now();
        let mut guard = session.lock().await;
        if guard.is_expired(now) {
            return Err(AppError::BadRequest("Time is up for this attempt".to_string()));
        }
        guard.record_answer(question_index as usize, answer)?;

        Ok(TimerStatus::of(&guard, now))
    }

    /// Submits whatever the student saved in their live session. `Ok(None)`
    /// means the attempt had already been submitted.
    pub async fn auto_submit(
        &self,
        quiz_id: &str,
        student_id: &str,
    ) -> AppResult<Option<GradedAttempt>> {
        let quiz = self.load_quiz(quiz_id).await?;
        let session = self.sessions.get(quiz_id, student_id).await.ok_or_else(|| {
            AppError::NotFound(format!(
                "No open attempt on quiz {} for {}",
                quiz_id, student_id
            ))
        })?;
        self.auto_submit_session(&quiz, student_id, &session).await
    }

    /// Submits the saved answers of a timed attempt whose deadline passed but
    /// whose auto-submit failed.
    pub async fn retry_auto_submit(
        &self,
        caller: &CallerIdentity,
        quiz_id: &str,
    ) -> AppResult<GradedAttempt> {
        let quiz = self.load_quiz_for_member(caller, quiz_id).await?;
        let student_id = caller.user_id.as_str();
        let session = self
            .sessions
            .get(&quiz.id, student_id)
            .await
            .ok_or_else(|| AppError::BadRequest("No timed attempt to submit".to_string()))?;

        {
            let guard = session.lock().await;
            let due = guard.auto_submit_error().is_some() || guard.is_expired(self.grader.now());
            if !guard.is_completed() && !due {
                return Err(AppError::BadRequest(
                    "The attempt is still running; submit it instead".to_string(),
                ));
            }
        }

        match self.auto_submit_session(&quiz, student_id, &session).await? {
            Some(graded) => Ok(graded),
            None => self.duplicate(&quiz, student_id).await,
        }
    }

    async fn auto_submit_session(
        &self,
        quiz: &Quiz,
        student_id: &str,
        session: &SharedSession,
    ) -> AppResult<Option<GradedAttempt>> {
        let outcome = SessionRegistry::submit_once(session, |answers| {
            self.record(quiz, student_id, answers, true)
        })
        .await;

        match outcome {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                log::warn!(
                    "Auto-submit of quiz {} for {} failed: {}",
                    quiz.id,
                    student_id,
                    err
                );
                session
                    .lock()
                    .await
                    .record_auto_submit_failure(AUTO_SUBMIT_FAILED);
                Err(AppError::AutoSubmitFailed(AUTO_SUBMIT_FAILED.to_string()))
            }
        }
    }

    fn spawn_auto_submit(
        &self,
        quiz: Quiz,
        student_id: String,
        session: SharedSession,
        delay: Duration,
    ) {
        let service = self.clone();
        let delay = delay.to_std().unwrap_or_default();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match service.auto_submit_session(&quiz, &student_id, &session).await {
                Ok(Some(graded)) => log::info!(
                    "Auto-submitted quiz {} for {}: {}/{}",
                    quiz.id,
                    student_id,
                    graded.result.score,
                    graded.result.total_questions
                ),
                Ok(None) => log::debug!(
                    "Quiz {} for {} was submitted before the deadline",
                    quiz.id,
                    student_id
                ),
                Err(err) => log::error!("{}", err),
            }
        });
    }

    /// One read-count/score/write cycle, re-run once if another writer took
    /// the same attempt number in between.
    async fn record(
        &self,
        quiz: &Quiz,
        student_id: &str,
        answers: Vec<QuizAnswer>,
        auto_submitted: bool,
    ) -> AppResult<GradedAttempt> {
        let presented = present(quiz);

        match self
            .record_once(&presented, student_id, &answers, auto_submitted)
            .await
        {
            Err(err) if err.is_conflict() => {
                log::warn!(
                    "Attempt number for quiz {} by {} was taken concurrently, retrying",
                    quiz.id,
                    student_id
                );
                self.record_once(&presented, student_id, &answers, auto_submitted)
                    .await
            }
            other => other,
        }
    }

    async fn record_once(
        &self,
        presented: &Quiz,
        student_id: &str,
        answers: &[QuizAnswer],
        auto_submitted: bool,
    ) -> AppResult<GradedAttempt> {
        let prior = self.prior_attempts(student_id, &presented.id).await?;
        let result = self.grader.score_attempt(presented, prior, answers);

        if let Some(reason) = result.reason {
            log::info!(
                "Attempt on quiz {} by {} rejected: {:?}",
                presented.id,
                student_id,
                reason
            );
            return Ok(GradedAttempt {
                result,
                explanations: Vec::new(),
                auto_submitted,
            });
        }

        let attempt = QuizAttemptService::create_attempt(
            &presented.id,
            student_id,
            &result,
            answers.to_vec(),
            auto_submitted,
            self.grader.now(),
        )?;
        let attempt = self.attempts.record_attempt(attempt).await?;
        log::info!(
            "Recorded attempt {} on quiz {} by {}: {}/{}, {} XP",
            attempt.attempt_number,
            presented.id,
            student_id,
            attempt.score,
            attempt.total_questions,
            attempt.xp_awarded
        );

        let explanations = if presented.show_explanations {
            presented
                .questions
                .iter()
                .map(|question| question.explanation.clone())
                .collect()
        } else {
            Vec::new()
        };

        Ok(GradedAttempt {
            result,
            explanations,
            auto_submitted,
        })
    }

    async fn duplicate(&self, quiz: &Quiz, student_id: &str) -> AppResult<GradedAttempt> {
        let prior = self.prior_attempts(student_id, &quiz.id).await?;
        Ok(GradedAttempt {
            result: AttemptResult::rejected(RejectionReason::DuplicateSubmission, quiz, prior),
            explanations: Vec::new(),
            auto_submitted: false,
        })
    }

    async fn prior_attempts(&self, student_id: &str, quiz_id: &str) -> AppResult<u32> {
        let count = self.attempts.count_user_attempts(student_id, quiz_id).await?;
        attempt_counter(count, quiz_id, student_id)
    }

    async fn load_quiz(&self, id: &str) -> AppResult<Quiz> {
        self.quizzes
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quiz with id '{}' not found", id)))
    }

    async fn load_classroom(&self, id: &str) -> AppResult<Classroom> {
        self.classrooms
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Class with id '{}' not found", id)))
    }

    async fn load_quiz_for_member(&self, caller: &CallerIdentity, quiz_id: &str) -> AppResult<Quiz> {
        let quiz = self.load_quiz(quiz_id).await?;
        let classroom = self.load_classroom(&quiz.class_id).await?;
        require_class_member(&classroom, caller)?;
        Ok(quiz)
    }
}

/// Every student sees the same order for a given quiz: the quiz id is the seed.
fn present(quiz: &Quiz) -> Quiz {
    prepare_quiz_for_presentation(quiz, &quiz.id)
}

fn attempt_counter(count: usize, quiz_id: &str, student_id: &str) -> AppResult<u32> {
    u32::try_from(count).map_err(|_| {
        AppError::InternalError(format!(
            "{} attempts on quiz {} by {} exceeds the attempt counter",
            count, quiz_id, student_id
        ))
    })
}
