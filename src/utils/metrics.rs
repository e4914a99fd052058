use crate::models::{
    BatchAnalytics, FeedbackAction, GeneratorKind, GeneratorPerformance, ScoredCandidate,
};
use crate::utils::{clamp_unit, mean};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct OutcomeCounters {
    pub shown: u64,
    pub clicked: u64,
    pub liked: u64,
    pub disliked: u64,
    pub positive: u64,
    pub negative: u64,
}

impl OutcomeCounters {
    pub fn record_shown(&mut self) {
        self.shown += 1;
    }

    pub fn record_action(&mut self, action: FeedbackAction) {
        match action {
            FeedbackAction::Click => self.clicked += 1,
            FeedbackAction::Like => self.liked += 1,
            FeedbackAction::Dislike => self.disliked += 1,
            _ => {}
        }
        if action.is_positive() {
            self.positive += 1;
        } else {
            self.negative += 1;
        }
    }

    // Laplace-smoothed so a generator with no feedback sits at 0.5.
    pub fn trust(&self) -> f64 {
        (self.positive + 1) as f64 / (self.positive + self.negative + 2) as f64
    }

    pub fn performance(&self, generator: GeneratorKind) -> GeneratorPerformance {
        let ctr = if self.shown > 0 {
            self.clicked as f64 / self.shown as f64
        } else {
            0.0
        };
        let rated = self.liked + self.disliked;
        let satisfaction = if rated > 0 {
            self.liked as f64 / rated as f64
        } else {
            0.0
        };

        GeneratorPerformance {
            generator,
            shown: self.shown,
            clicked: self.clicked,
            liked: self.liked,
            disliked: self.disliked,
            ctr,
            satisfaction,
            trust: self.trust(),
        }
    }
}

pub fn pool_analytics(pool: &[ScoredCandidate], data_score: f64) -> BatchAnalytics {
    let total = pool.len();
    if total == 0 {
        return BatchAnalytics {
            total_recommendations: 0,
            average_score: 0.0,
            average_confidence: 0.0,
            algorithm_breakdown: HashMap::new(),
            diversity_score: 0.0,
            freshness_score: 0.0,
        };
    }

    let scores: Vec<f64> = pool.iter().map(|c| c.final_score).collect();
    let average_score = mean(&scores);
    let average_confidence = clamp_unit(0.6 * data_score + 0.4 * average_score);
    let diversity_score = mean(&pool.iter().map(|c| c.diversity).collect::<Vec<f64>>());
    let freshness_score = mean(&pool.iter().map(|c| c.freshness).collect::<Vec<f64>>());

    let mut algorithm_breakdown: HashMap<String, usize> = HashMap::new();
    for scored in pool {
        *algorithm_breakdown
            .entry(scored.candidate.source.as_str().to_string())
            .or_insert(0) += 1;
    }

    BatchAnalytics {
        total_recommendations: total,
        average_score,
        average_confidence,
        algorithm_breakdown,
        diversity_score,
        freshness_score,
    }
}
