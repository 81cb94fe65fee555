//! Per-quiz deterministic shuffling of questions and options.
//!
//! The order depends only on the seed (the quiz id), so every student sees the
//! same order and reloading never produces a different one.

use crate::models::domain::{Quiz, QuizQuestion, QuizQuestionType};

const QUESTION_SUFFIX: &str = "questions";

/// Maps a seed and an item key to an orderable rank. Items are presented in
/// ascending rank order.
pub trait RankStrategy: Send + Sync {
    fn rank(&self, seed: &str, item_key: &str) -> u64;
}

/// 32-bit polynomial rolling hash (`h = h * 31 + unit`) over the UTF-16 code
/// units of `"{seed}:{item_key}"`.
#[derive(Clone, Copy, Debug, Default)]
pub struct PolynomialHashRank;

impl RankStrategy for PolynomialHashRank {
    fn rank(&self, seed: &str, item_key: &str) -> u64 {
        u64::from(string_hash(&format!("{}:{}", seed, item_key)))
    }
}

/// FNV-1a followed by the splitmix64 finalizer. Spreads near-identical keys
/// much further apart than the polynomial hash.
#[derive(Clone, Copy, Debug, Default)]
pub struct SplitMixRank;

impl RankStrategy for SplitMixRank {
    fn rank(&self, seed: &str, item_key: &str) -> u64 {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in seed.bytes().chain(std::iter::once(b':')).chain(item_key.bytes()) {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        splitmix64(hash)
    }
}

pub fn string_hash(input: &str) -> u32 {
    input
        .encode_utf16()
        .fold(0u32, |hash, unit| hash.wrapping_mul(31).wrapping_add(u32::from(unit)))
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

#[derive(Clone, Debug, Default)]
pub struct QuizRandomizer<R: RankStrategy = PolynomialHashRank> {
    strategy: R,
}

impl<R: RankStrategy> QuizRandomizer<R> {
    pub fn with_strategy(strategy: R) -> Self {
        Self { strategy }
    }

    /// Orders `items` by the rank of `"{seed}:{seed_suffix}:{key}:{index}"`.
    /// Each entry keeps the item's original index. Equal ranks keep input order.
    pub fn deterministic_shuffle<T, F>(
        &self,
        items: Vec<T>,
        seed: &str,
        seed_suffix: &str,
        key_fn: F,
    ) -> Vec<(usize, T)>
    where
        F: Fn(&T, usize) -> String,
    {
        let mut ranked: Vec<(u64, usize, T)> = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let item_key = format!("{}:{}:{}", seed_suffix, key_fn(&item, index), index);
                (self.strategy.rank(seed, &item_key), index, item)
            })
            .collect();

        ranked.sort_by_key(|(rank, _, _)| *rank);
        ranked
            .into_iter()
            .map(|(_, index, item)| (index, item))
            .collect()
    }

    /// Returns a copy of `quiz` with options and/or questions shuffled as its
    /// flags ask. `correct_option` follows the originally correct option by
    /// position, so duplicate option texts are handled.
    pub fn prepare_for_presentation(&self, quiz: &Quiz, seed: &str) -> Quiz {
        let mut questions = quiz.questions.clone();

        if quiz.randomize_options {
            questions = questions
                .into_iter()
                .enumerate()
                .map(|(index, question)| self.shuffle_options(question, seed, index))
                .collect();
        }

        if quiz.randomize_questions {
            questions = self
                .deterministic_shuffle(questions, seed, QUESTION_SUFFIX, |question, _| {
                    format!(
                        "{}|{}",
                        question.prompt,
                        question
                            .correct_option
                            .map(|c| c.to_string())
                            .unwrap_or_default()
                    )
                })
                .into_iter()
                .map(|(_, question)| question)
                .collect();
        }

        let mut presented = quiz.clone();
        presented.questions = questions;
        presented
    }

    fn shuffle_options(&self, mut question: QuizQuestion, seed: &str, index: usize) -> QuizQuestion {
        // True/false keeps its fixed True, False layout.
        if question.kind() != QuizQuestionType::Mcq || question.options.is_empty() {
            return question;
        }

        let options = std::mem::take(&mut question.options);
        let shuffled =
            self.deterministic_shuffle(options, seed, &format!("options:{}", index), |text, _| {
                text.clone()
            });

        question.correct_option = question.correct_option.and_then(|correct| {
            shuffled
                .iter()
                .position(|(original, _)| *original == correct as usize)
                .map(|position| position as u32)
        });
        question.options = shuffled.into_iter().map(|(_, option)| option).collect();
        question
    }
}

pub fn prepare_quiz_for_presentation(quiz: &Quiz, seed: &str) -> Quiz {
    QuizRandomizer::<PolynomialHashRank>::default().prepare_for_presentation(quiz, seed)
}
