use std::{collections::HashMap, future::Future, sync::Arc};

use async_graphql::Enum;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{Quiz, QuizAnswer},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Enum)]
pub enum SessionState {
    NotStarted,
    TimerArmed,
    InProgress,
    Completed,
}

/// In-memory progress of one student through one quiz.
#[derive(Clone, Debug)]
pub struct AttemptSession {
    quiz_id: String,
    student_id: String,
    state: SessionState,
    time_limit: Option<Duration>,
    deadline: Option<DateTime<Utc>>,
    answers: Vec<QuizAnswer>,
    auto_submit_error: Option<String>,
}

impl AttemptSession {
    pub fn new(quiz: &Quiz, student_id: &str) -> Self {
        AttemptSession {
            quiz_id: quiz.id.clone(),
            student_id: student_id.to_string(),
            state: SessionState::NotStarted,
            time_limit: None,
            deadline: None,
            answers: vec![QuizAnswer::default(); quiz.questions.len()],
            auto_submit_error: None,
        }
    }

    pub fn quiz_id(&self) -> &str {
        &self.quiz_id
    }

    pub fn student_id(&self) -> &str {
        &self.student_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    pub fn is_completed(&self) -> bool {
        self.state == SessionState::Completed
    }

    /// Set when the deadline passed but the saved answers could not be
    /// stored. Cleared once the attempt completes.
    pub fn auto_submit_error(&self) -> Option<&str> {
        self.auto_submit_error.as_deref()
    }

    pub fn record_auto_submit_failure(&mut self, message: impl Into<String>) {
        if self.state == SessionState::InProgress {
            self.auto_submit_error = Some(message.into());
        }
    }

    /// NotStarted -> TimerArmed. The countdown does not run until `start`.
    pub fn arm(&mut self, time_limit: Duration) -> AppResult<()> {
        if self.state != SessionState::NotStarted {
            return Err(self.invalid_transition("arm the timer"));
        }
        if time_limit <= Duration::zero() {
            return Err(AppError::BadRequest(
                "Time limit must be positive".to_string(),
            ));
        }
        self.time_limit = Some(time_limit);
        self.state = SessionState::TimerArmed;
        Ok(())
    }

    /// TimerArmed -> InProgress with a deadline, or NotStarted -> InProgress
    /// for untimed quizzes.
    pub fn start(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        match self.state {
            SessionState::TimerArmed => {
                self.deadline = self.time_limit.map(|limit| now + limit);
            }
            SessionState::NotStarted => {}
            _ => return Err(self.invalid_transition("start")),
        }
        self.state = SessionState::InProgress;
        Ok(())
    }

    pub fn record_answer(&mut self, question_index: usize, answer: QuizAnswer) -> AppResult<()> {
        if self.state != SessionState::InProgress {
            return Err(self.invalid_transition("answer"));
        }
        let slot = self.answers.get_mut(question_index).ok_or_else(|| {
            AppError::BadRequest(format!("Question index {} is out of range", question_index))
        })?;
        *slot = answer;
        Ok(())
    }

    pub fn answers(&self) -> &[QuizAnswer] {
        &self.answers
    }

    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.deadline
            .map(|deadline| (deadline - now).max(Duration::zero()))
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.deadline.map(|deadline| now >= deadline).unwrap_or(false)
    }

    /// InProgress -> Completed. Completing twice is a duplicate submission.
    pub fn complete(&mut self) -> AppResult<()> {
        match self.state {
            SessionState::InProgress => {
                self.state = SessionState::Completed;
                self.auto_submit_error = None;
                Ok(())
            }
            SessionState::Completed => Err(AppError::Conflict(format!(
                "Attempt for quiz {} by {} was already submitted",
                self.quiz_id, self.student_id
            ))),
            _ => Err(self.invalid_transition("complete")),
        }
    }

    fn invalid_transition(&self, action: &str) -> AppError {
        AppError::BadRequest(format!(
            "Cannot {} a quiz attempt in state {:?}",
            action, self.state
        ))
    }
}

pub type SharedSession = Arc<Mutex<AttemptSession>>;

/// Live sessions keyed by (quiz id, student id).
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<(String, String), SharedSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the open session for the pair, replacing a completed one with a
    /// fresh session.
    ///
    /// The map lock is never held while waiting on a session, since a
    /// submission keeps its session locked for the whole write.
    pub async fn open(&self, quiz: &Quiz, student_id: &str) -> SharedSession {
        let key = (quiz.id.clone(), student_id.to_string());

        let seen = self.sessions.lock().await.get(&key).cloned();
        if let Some(existing) = &seen {
            if !existing.lock().await.is_completed() {
                return Arc::clone(existing);
            }
        }

        let mut sessions = self.sessions.lock().await;
        if let Some(current) = sessions.get(&key) {
            // a concurrent open already replaced the session we saw
            let replaced = seen
                .as_ref()
                .map_or(true, |stale| !Arc::ptr_eq(stale, current));
            if replaced {
                return Arc::clone(current);
            }
        }

        let session = Arc::new(Mutex::new(AttemptSession::new(quiz, student_id)));
        sessions.insert(key, Arc::clone(&session));
        session
    }

    pub async fn get(&self, quiz_id: &str, student_id: &str) -> Option<SharedSession> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(&(quiz_id.to_string(), student_id.to_string()))
            .cloned()
    }

    /// Runs `persist` with the session's saved answers while holding the
    /// session lock, then marks the session completed. Returns `None` when
    /// another submission already completed it. A failed `persist` leaves the
    /// session in progress with its answers intact.
    pub async fn submit_once<F, Fut, T>(session: &SharedSession, persist: F) -> AppResult<Option<T>>
    where
        F: FnOnce(Vec<QuizAnswer>) -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let mut guard = session.lock().await;
        match guard.state() {
            SessionState::Completed => return Ok(None),
            SessionState::InProgress => {}
            _ => return Err(guard.invalid_transition("submit")),
        }

        let value = persist(guard.answers().to_vec()).await?;
        guard.complete()?;
        Ok(Some(value))
    }

    pub async fn remove(&self, quiz_id: &str, student_id: &str) {
        let mut sessions = self.sessions.lock().await;
        sessions.remove(&(quiz_id.to_string(), student_id.to_string()));
    }
}
