//! Locally simulated backend for anonymous trial sessions.
//!
//! No network. Questions come from a fixed bank per difficulty tier,
//! avoiding repeats within a session; grades are synthetic but react to
//! answer length, and the final verdict is derived from the real mean
//! score. With a fixed seed the whole interview is reproducible.

use std::cell::RefCell;

use indoc::indoc;
use rand::prelude::*;
use rand_pcg::Mcg128Xsl64;

use crate::difficulty::Difficulty;
use crate::error::RemoteError;
use crate::session::{FinalSummary, Insights, Recommendation, Verdict, FALLBACK_ANSWER};

use super::{Evaluation, FinalizeRequest, GradeRequest, InterviewService, NextQuestionRequest};

/// Shown in place of an AI summary when a trial interview completes.
pub const TRIAL_SUMMARY: &str =
    "Interview completed in trial mode. Sign up to get AI-powered insights!";

const EASY_QUESTIONS: &[&str] = &[
    "What is the difference between let, const, and var in JavaScript?",
    "What does the HTTP status code 404 mean, and when would an API return it?",
    "What is the purpose of a primary key in a relational database?",
    "In CSS, what is the difference between margin and padding?",
    "What is the difference between == and === in JavaScript?",
    "What does REST stand for, and what makes an API RESTful?",
];

const MEDIUM_QUESTIONS: &[&str] = &[
    "How would you prevent SQL injection in a web application backed by a relational database?",
    "Explain how JWT-based authentication works between a single-page app and an API.",
    "What is the N+1 query problem, and how would you fix it in an ORM?",
    "How does the browser event loop handle promises versus setTimeout callbacks?",
    "Describe how you would paginate a large result set in a REST API.",
    "What are database transactions, and when would you need one in a typical web app?",
];

const HARD_QUESTIONS: &[&str] = &[
    "Design a rate limiter for a public API. What storage and algorithm would you use, and how does it behave under burst traffic?",
    "How would you scale a WebSocket-based notification service to a million concurrent clients?",
    "Walk through how you would migrate a production database schema without downtime.",
    "Design the caching strategy for a read-heavy product catalog, including invalidation.",
    "How would you diagnose and fix a memory leak in a long-running Node.js service?",
    "Design an idempotent payment submission endpoint. What failure modes must it survive?",
];

const EASY_TAGS: &[&str] = &["fundamentals", "web-basics", "javascript"];
const MEDIUM_TAGS: &[&str] = &["backend", "api-design", "databases"];
const HARD_TAGS: &[&str] = &["system-design", "scalability", "debugging"];

pub struct TrialInterviewClient {
    rng: RefCell<Mcg128Xsl64>,
}

impl TrialInterviewClient {
    /// `None` seeds from entropy; a fixed seed reproduces the session.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => Mcg128Xsl64::seed_from_u64(seed),
            None => Mcg128Xsl64::from_entropy(),
        };
        Self {
            rng: RefCell::new(rng),
        }
    }

    fn bank(difficulty: Difficulty) -> &'static [&'static str] {
        match difficulty {
            Difficulty::Easy => EASY_QUESTIONS,
            Difficulty::Medium => MEDIUM_QUESTIONS,
            Difficulty::Hard => HARD_QUESTIONS,
        }
    }

    fn tags(difficulty: Difficulty) -> &'static [&'static str] {
        match difficulty {
            Difficulty::Easy => EASY_TAGS,
            Difficulty::Medium => MEDIUM_TAGS,
            Difficulty::Hard => HARD_TAGS,
        }
    }

    fn feedback_for(score: f64) -> &'static str {
        if score >= 8.5 {
            "Strong answer. You covered the core concept clearly and touched on the tradeoffs."
        } else if score >= 7.0 {
            "Good answer. The main idea is right; a concrete example would make it stronger."
        } else if score >= 5.5 {
            "Reasonable answer, but it stays at the surface. Dig into how this works underneath."
        } else if score > 2.0 {
            "The answer misses the core of the question. Review this topic and try restating it in your own words."
        } else {
            "No answer arrived before the countdown expired."
        }
    }
}

impl InterviewService for TrialInterviewClient {
    async fn next_question(&self, request: NextQuestionRequest) -> Result<String, RemoteError> {
        let bank = Self::bank(request.difficulty);
        let mut rng = self.rng.borrow_mut();
        // Prefer a question the candidate has not seen this session.
        let fresh: Vec<&str> = bank
            .iter()
            .copied()
            .filter(|q| !request.history.iter().any(|r| r.question == *q))
            .collect();
        let question = fresh
            .choose(&mut *rng)
            .copied()
            .or_else(|| bank.choose(&mut *rng).copied())
            .unwrap_or("Tell me about a project you are proud of.");
        Ok(question.to_string())
    }

    async fn grade_answer(&self, request: GradeRequest) -> Result<Evaluation, RemoteError> {
        let mut rng = self.rng.borrow_mut();
        let answer = request.answer.trim();
        let score: f64 = if answer.is_empty() || request.answer == FALLBACK_ANSWER {
            2.0
        } else if answer.len() < 20 {
            rng.gen_range(4.0..=6.0)
        } else {
            rng.gen_range(6.0..=9.0)
        };
        let score = (score * 10.0).round() / 10.0;

        let tier = question_tier(&request.question);
        let skill_tags = Self::tags(tier)
            .choose_multiple(&mut *rng, 2)
            .map(|t| t.to_string())
            .collect();

        Ok(Evaluation {
            score,
            feedback: Self::feedback_for(score).to_string(),
            skill_tags,
        })
    }

    async fn finalize(&self, request: FinalizeRequest) -> Result<FinalSummary, RemoteError> {
        let total: f64 = request.history.iter().filter_map(|r| r.score).sum();
        let mean = if request.history.is_empty() {
            0.0
        } else {
            total / request.history.len() as f64
        };
        let final_score = (mean * 100.0).round() / 100.0;
        let verdict = Verdict::for_mean_score(final_score);

        Ok(FinalSummary {
            summary: TRIAL_SUMMARY.to_string(),
            // Per-answer insights are an account feature; trial mode
            // withholds them.
            insights: Insights::default(),
            recommendation: Recommendation {
                verdict,
                justification: indoc! {"
                    Scores in trial mode are generated locally. Create an account and
                    retake the interview to get an AI-reviewed recommendation."}
                .to_string(),
            },
            final_score,
        })
    }
}

/// Which bank a question came from, so grading can tag it consistently.
fn question_tier(question: &str) -> Difficulty {
    if HARD_QUESTIONS.contains(&question) {
        Difficulty::Hard
    } else if MEDIUM_QUESTIONS.contains(&question) {
        Difficulty::Medium
    } else {
        Difficulty::Easy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::CandidateId;
    use crate::session::QuestionRecord;

    fn question_request(difficulty: Difficulty, history: Vec<QuestionRecord>) -> NextQuestionRequest {
        NextQuestionRequest {
            candidate_id: CandidateId::new_trial(),
            role: "Full Stack Developer".into(),
            difficulty,
            history,
        }
    }

    fn grade_request(question: &str, answer: &str) -> GradeRequest {
        GradeRequest {
            candidate_id: CandidateId::new_trial(),
            question: question.into(),
            answer: answer.into(),
        }
    }

    #[tokio::test]
    async fn same_seed_reproduces_the_session() {
        let a = TrialInterviewClient::new(Some(42));
        let b = TrialInterviewClient::new(Some(42));

        for difficulty in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
            let qa = a
                .next_question(question_request(difficulty, vec![]))
                .await
                .unwrap();
            let qb = b
                .next_question(question_request(difficulty, vec![]))
                .await
                .unwrap();
            assert_eq!(qa, qb);

            let ga = a.grade_answer(grade_request(&qa, "a reasonably detailed answer about indexes"))
                .await
                .unwrap();
            let gb = b.grade_answer(grade_request(&qb, "a reasonably detailed answer about indexes"))
                .await
                .unwrap();
            assert_eq!(ga, gb);
        }
    }

    #[tokio::test]
    async fn avoids_repeating_questions_within_a_session() {
        let client = TrialInterviewClient::new(Some(7));
        let mut history = Vec::new();

        // Drain the whole easy bank; every draw must be fresh.
        for _ in 0..EASY_QUESTIONS.len() {
            let q = client
                .next_question(question_request(Difficulty::Easy, history.clone()))
                .await
                .unwrap();
            assert!(!history.iter().any(|r: &QuestionRecord| r.question == q));
            let mut record = QuestionRecord::asked(&q);
            record.answer = Some("done".into());
            history.push(record);
        }

        // Bank exhausted: falls back to a repeat rather than failing.
        let q = client
            .next_question(question_request(Difficulty::Easy, history.clone()))
            .await
            .unwrap();
        assert!(EASY_QUESTIONS.contains(&q.as_str()));
    }

    #[tokio::test]
    async fn expired_answers_score_at_the_floor() {
        let client = TrialInterviewClient::new(Some(1));
        let graded = client
            .grade_answer(grade_request(EASY_QUESTIONS[0], FALLBACK_ANSWER))
            .await
            .unwrap();
        assert_eq!(graded.score, 2.0);
        assert_eq!(graded.feedback, TrialInterviewClient::feedback_for(2.0));

        let graded = client
            .grade_answer(grade_request(EASY_QUESTIONS[0], "   "))
            .await
            .unwrap();
        assert_eq!(graded.score, 2.0);
    }

    #[tokio::test]
    async fn substantial_answers_score_in_the_upper_band() {
        let client = TrialInterviewClient::new(Some(2));
        let graded = client
            .grade_answer(grade_request(
                MEDIUM_QUESTIONS[0],
                "Parameterized queries keep user input out of the SQL text entirely.",
            ))
            .await
            .unwrap();
        assert!((6.0..=9.0).contains(&graded.score));
        assert_eq!(graded.skill_tags.len(), 2);
        for tag in &graded.skill_tags {
            assert!(MEDIUM_TAGS.contains(&tag.as_str()));
        }
    }

    #[tokio::test]
    async fn finalize_derives_verdict_from_the_mean() {
        let client = TrialInterviewClient::new(Some(3));
        let history: Vec<QuestionRecord> = [8.0, 7.0, 9.0, 6.0, 8.0, 7.0]
            .iter()
            .map(|score| {
                let mut r = QuestionRecord::asked("q");
                r.answer = Some("a".into());
                r.score = Some(*score);
                r
            })
            .collect();

        let summary = client
            .finalize(FinalizeRequest {
                candidate_id: CandidateId::new_trial(),
                history,
            })
            .await
            .unwrap();
        assert_eq!(summary.final_score, 7.5);
        assert_eq!(summary.recommendation.verdict, Verdict::Hire);
        assert_eq!(summary.summary, TRIAL_SUMMARY);
        assert!(summary.insights.strengths.is_empty());
    }
}
