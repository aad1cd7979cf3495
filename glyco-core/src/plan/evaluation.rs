//! Scores a planner's primary recommendation against a ground-truth table.
//!
//! The first action of each plan is compared to the expected action for the
//! same state; an empty plan predicts [`NO_ACTION`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::info;

use super::catalog::ActionSource;
use super::heuristic::Heuristic;
use super::planner::Planner;
use super::state::{Glucose, PatientState, Risk};
use super::transition::TransitionModel;

pub const NO_ACTION: &str = "none";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroundTruthCase {
    pub state: PatientState,
    pub expected: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroundTruth {
    pub cases: Vec<GroundTruthCase>,
}

impl GroundTruth {
    pub fn new(cases: Vec<GroundTruthCase>) -> Self {
        Self { cases }
    }

    /// Clinician-authored expectations for all nine states.
    pub fn reference() -> Self {
        use Glucose as G;
        use Risk as R;
        let table = [
            (G::High, R::High, "avoid_sugar"),
            (G::High, R::Medium, "walk_30_minutes"),
            (G::High, R::Low, "walk_30_minutes"),
            (G::Low, R::High, "eat_healthy_meal"),
            (G::Low, R::Medium, "eat_healthy_meal"),
            (G::Low, R::Low, "monitor_glucose"),
            (G::Normal, R::High, "monitor_glucose"),
            (G::Normal, R::Medium, "monitor_glucose"),
            (G::Normal, R::Low, "monitor_glucose"),
        ];
        Self::new(
            table
                .into_iter()
                .map(|(glucose, risk, expected)| GroundTruthCase {
                    state: PatientState::new(glucose, risk),
                    expected: expected.to_string(),
                })
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CaseResult {
    pub state: PatientState,
    pub expected: String,
    pub predicted: String,
    pub correct: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LabelScore {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EvaluationReport {
    pub total: usize,
    pub correct: usize,
    pub accuracy: f64,
    pub weighted_f1: f64,
    pub labels: Vec<LabelScore>,
    pub cases: Vec<CaseResult>,
}

pub fn evaluate<C, T, H>(planner: &Planner<C, T, H>, truth: &GroundTruth) -> EvaluationReport
where
    C: ActionSource,
    T: TransitionModel,
    H: Heuristic,
{
    let cases: Vec<CaseResult> = truth
        .cases
        .iter()
        .map(|case| {
            let predicted = planner
                .plan(case.state)
                .into_iter()
                .next()
                .unwrap_or_else(|| NO_ACTION.to_string());
            CaseResult {
                state: case.state,
                correct: predicted == case.expected,
                expected: case.expected.clone(),
                predicted,
            }
        })
        .collect();

    let total = cases.len();
    let correct = cases.iter().filter(|case| case.correct).count();
    let accuracy = ratio(correct, total);
    let labels = label_scores(&cases);
    let weighted_f1 = if total == 0 {
        0.0
    } else {
        labels
            .iter()
            .map(|score| score.f1 * score.support as f64)
            .sum::<f64>()
            / total as f64
    };

    info!(
        target: "planner.evaluation",
        total,
        correct,
        accuracy,
        weighted_f1,
        "evaluation complete"
    );

    EvaluationReport {
        total,
        correct,
        accuracy,
        weighted_f1,
        labels,
        cases,
    }
}

fn label_scores(cases: &[CaseResult]) -> Vec<LabelScore> {
    let labels: BTreeSet<&str> = cases
        .iter()
        .flat_map(|case| [case.expected.as_str(), case.predicted.as_str()])
        .collect();

    // (true positives, predicted count, support)
    let mut counts: BTreeMap<&str, (usize, usize, usize)> =
        labels.iter().map(|label| (*label, (0, 0, 0))).collect();
    for case in cases {
        if let Some(entry) = counts.get_mut(case.predicted.as_str()) {
            entry.1 += 1;
            if case.correct {
                entry.0 += 1;
            }
        }
        if let Some(entry) = counts.get_mut(case.expected.as_str()) {
            entry.2 += 1;
        }
    }

    counts
        .into_iter()
        .map(|(label, (hits, predicted, support))| {
            let precision = ratio(hits, predicted);
            let recall = ratio(hits, support);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            LabelScore {
                label: label.to_string(),
                precision,
                recall,
                f1,
                support,
            }
        })
        .collect()
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
