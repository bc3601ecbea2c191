use models::{QuizAnswer, QuizQuestion};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// One (question, chosen answer) pair as submitted by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    pub question_id: i64,
    pub answer_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreSummary {
    /// Truncated percentage, 0-100.
    pub score: i64,
    pub correct_count: usize,
    pub total_questions: usize,
    pub passed: bool,
}

/// Scores a submission against the quiz's question/answer set and compares
/// score >= passing_score.
///
/// A submitted pair counts as correct only when the question belongs to the
/// quiz and the chosen answer belongs to that question and is flagged
/// correct. Unknown question or answer ids are skipped without error. A
/// question counts at most once, so duplicated pairs cannot inflate the
/// score past 100.
pub fn score_submission(
    questions: &[QuizQuestion],
    answers: &[QuizAnswer],
    submitted: &[SubmittedAnswer],
    passing_score: i64,
) -> ScoreSummary {
    let total_questions = questions.len();
    let mut counted: Vec<i64> = Vec::with_capacity(submitted.len());
    let mut correct_count = 0;

    for pair in submitted {
        let Some(question) = questions.iter().find(|q| q.id == pair.question_id) else {
            trace!(question_id = pair.question_id, "skipping unknown question");
            continue;
        };
        if counted.contains(&question.id) {
            continue;
        }

        let chosen = answers
            .iter()
            .find(|a| a.id == pair.answer_id && a.question_id == question.id);
        match chosen {
            Some(answer) if answer.is_correct => {
                counted.push(question.id);
                correct_count += 1;
            }
            Some(_) => {}
            None => {
                trace!(
                    question_id = pair.question_id,
                    answer_id = pair.answer_id,
                    "skipping answer not belonging to question"
                );
            }
        }
    }

    // A quiz with no questions scores 0 by convention rather than dividing
    // by zero.
    let score = if total_questions == 0 {
        0
    } else {
        (correct_count * 100 / total_questions) as i64
    };

    ScoreSummary {
        score,
        correct_count,
        total_questions,
        passed: score >= passing_score,
    }
}
