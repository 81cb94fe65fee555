use std::sync::Arc;

use validator::Validate;

use crate::{
    auth::{require_class_member, require_class_teacher, CallerIdentity},
    errors::{AppError, AppResult},
    models::{
        domain::{Classroom, Submission},
        dto::request::SubmitSubmissionInput,
    },
    repositories::{AssignmentRepository, ClassroomRepository, SubmissionRepository},
    services::text_fingerprint::{jaccard_similarity, shingle, DEFAULT_SHINGLE_SIZE},
};

pub const DEFAULT_TOP_K: usize = 3;
pub const OVERLAP_SAMPLE_LIMIT: usize = 10;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimilarityCandidate {
    pub id: String,
    pub text: Option<String>,
}

impl From<&Submission> for SimilarityCandidate {
    fn from(submission: &Submission) -> Self {
        SimilarityCandidate {
            id: submission.id.clone(),
            text: submission.content.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SimilarityMatch {
    pub id: String,
    pub score: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextComparison {
    pub score: f64,
    /// Shingles found in both texts, in the order they appear in the first text.
    pub overlap: Vec<String>,
}

/// Ranks `candidates` by similarity to `target`, highest first, keeping the
/// first `top_k`. Candidates without text are skipped rather than scored 0;
/// whitespace-only text is still text and scores 0.
pub fn compare_one(
    target: Option<&str>,
    candidates: &[SimilarityCandidate],
    shingle_size: usize,
    top_k: usize,
) -> Vec<SimilarityMatch> {
    let target = match target {
        Some(text) if !text.is_empty() => text,
        _ => return Vec::new(),
    };

    let target_shingles = shingle(target, shingle_size);
    let mut matches: Vec<SimilarityMatch> = candidates
        .iter()
        .filter_map(|candidate| {
            let text = candidate.text.as_deref().filter(|t| !t.is_empty())?;
            Some(SimilarityMatch {
                id: candidate.id.clone(),
                score: jaccard_similarity(&target_shingles, &shingle(text, shingle_size)),
            })
        })
        .collect();

    // sort_by is stable: equal scores keep candidate order
    matches.sort_by(|a, b| b.score.total_cmp(&a.score));
    matches.truncate(top_k);
    matches
}

pub fn compare_submission_pair(
    text_a: &str,
    text_b: &str,
    shingle_size: usize,
    sample_limit: usize,
) -> TextComparison {
    let a = shingle(text_a, shingle_size);
    let b = shingle(text_b, shingle_size);

    let overlap = a
        .iter()
        .filter(|s| b.contains(s))
        .take(sample_limit)
        .map(str::to_string)
        .collect();

    TextComparison {
        score: jaccard_similarity(&a, &b),
        overlap,
    }
}

pub fn rank_similar_to(target: Option<&str>, candidates: &[SimilarityCandidate]) -> Vec<SimilarityMatch> {
    compare_one(target, candidates, DEFAULT_SHINGLE_SIZE, DEFAULT_TOP_K)
}

pub fn compare_texts(text_a: &str, text_b: &str) -> TextComparison {
    compare_submission_pair(text_a, text_b, DEFAULT_SHINGLE_SIZE, OVERLAP_SAMPLE_LIMIT)
}

#[derive(Clone, Copy, Debug)]
pub struct SimilaritySettings {
    pub shingle_size: usize,
    pub top_k: usize,
    pub sample_limit: usize,
}

impl Default for SimilaritySettings {
    fn default() -> Self {
        SimilaritySettings {
            shingle_size: DEFAULT_SHINGLE_SIZE,
            top_k: DEFAULT_TOP_K,
            sample_limit: OVERLAP_SAMPLE_LIMIT,
        }
    }
}

/// Loads submissions, enforces class access and runs the comparisons.
pub struct SimilarityService {
    submissions: Arc<dyn SubmissionRepository>,
    assignments: Arc<dyn AssignmentRepository>,
    classrooms: Arc<dyn ClassroomRepository>,
    settings: SimilaritySettings,
}

impl SimilarityService {
    pub fn new(
        submissions: Arc<dyn SubmissionRepository>,
        assignments: Arc<dyn AssignmentRepository>,
        classrooms: Arc<dyn ClassroomRepository>,
        settings: SimilaritySettings,
    ) -> Self {
        Self {
            submissions,
            assignments,
            classrooms,
            settings,
        }
    }

    pub async fn submit(
        &self,
        caller: &CallerIdentity,
        input: SubmitSubmissionInput,
    ) -> AppResult<Submission> {
        input.validate()?;
        let assignment_id = input.assignment_id.trim();
        let content = input.content;

        let classroom = self.classroom_for_assignment(assignment_id).await?;
        require_class_member(&classroom, caller)?;

        let previous = self
            .submissions
            .count_by_student_and_assignment(&caller.user_id, assignment_id)
            .await?;
        let number = u32::try_from(previous + 1).map_err(|_| {
            AppError::InternalError(format!(
                "Submission count for {} on assignment {} overflowed",
                caller.user_id, assignment_id
            ))
        })?;
        let submission = Submission::new(assignment_id, &caller.user_id, content, Some(number));

        let submission = self.submissions.create(submission).await?;
        log::info!(
            "Stored submission {} for assignment {} by {}",
            submission.id,
            assignment_id,
            caller.user_id
        );
        Ok(submission)
    }

    pub async fn similar_submissions(
        &self,
        caller: &CallerIdentity,
        submission_id: &str,
    ) -> AppResult<Vec<SimilarityMatch>> {
        let target = self.load_submission(submission_id).await?;
        let classroom = self.classroom_for_assignment(&target.assignment_id).await?;
        require_class_teacher(&classroom, caller)?;

        let candidates: Vec<SimilarityCandidate> = self
            .submissions
            .find_by_assignment(&target.assignment_id)
            .await?
            .iter()
            .filter(|s| s.id != target.id)
            .map(SimilarityCandidate::from)
            .collect();

        let matches = compare_one(
            target.content.as_deref(),
            &candidates,
            self.settings.shingle_size,
            self.settings.top_k,
        );
        log::debug!(
            "Similarity report for {}: {} candidates, {} matches",
            submission_id,
            candidates.len(),
            matches.len()
        );
        Ok(matches)
    }

    pub async fn compare_submissions(
        &self,
        caller: &CallerIdentity,
        first_id: &str,
        second_id: &str,
    ) -> AppResult<TextComparison> {
        let first = self.load_submission(first_id).await?;
        let second = self.load_submission(second_id).await?;

        if first.assignment_id != second.assignment_id {
            return Err(AppError::BadRequest(
                "Submissions belong to different assignments".to_string(),
            ));
        }

        let classroom = self.classroom_for_assignment(&first.assignment_id).await?;
        require_class_teacher(&classroom, caller)?;

        Ok(compare_submission_pair(
            first.content.as_deref().unwrap_or_default(),
            second.content.as_deref().unwrap_or_default(),
            self.settings.shingle_size,
            self.settings.sample_limit,
        ))
    }

    async fn load_submission(&self, id: &str) -> AppResult<Submission> {
        self.submissions
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Submission with id '{}' not found", id)))
    }

    async fn classroom_for_assignment(&self, id: &str) -> AppResult<Classroom> {
        let assignment = self
            .assignments
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Assignment with id '{}' not found", id)))?;
        self.classrooms
            .find_by_id(&assignment.class_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Class with id '{}' not found", assignment.class_id))
            })
    }
}
