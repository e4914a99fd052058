use crate::config::EngineConfig;
use crate::models::*;
use chrono::Utc;
use serde::Deserialize;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecommendationParams {
    pub user_id: Option<String>,
    #[serde(rename = "type")]
    pub rec_type: Option<String>,
    pub context: Option<String>,
    pub filters: Option<String>,
    pub algorithm: Option<String>,
    pub diversity_factor: Option<f64>,
    pub freshness_factor: Option<f64>,
    pub personality_factor: Option<f64>,
    pub explainability: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub bypass_cache: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFeedbackBody {
    pub recommendation_id: Option<String>,
    pub user_id: Option<String>,
    pub item_id: Option<String>,
    pub action: Option<String>,
    pub rating: Option<i64>,
    pub feedback: Option<String>,
    pub context: Option<serde_json::Value>,
}

pub fn parse_recommendation_query(
    params: RawRecommendationParams,
    config: &EngineConfig,
) -> Result<RecommendationQuery, HashMap<String, String>> {
    let mut errors: HashMap<String, String> = HashMap::new();

    let user_id = match params.user_id.as_deref() {
        None | Some("") => None,
        Some(raw) => match Uuid::parse_str(raw) {
            Ok(id) => Some(id),
            Err(_) => {
                errors.insert("user_id".to_string(), "must be a valid UUID".to_string());
                None
            }
        },
    };

    let rec_type = match params.rec_type.as_deref() {
        None | Some("") => RecommendationType::Articles,
        Some(raw) => match parse_rec_type(raw) {
            Some(t) => t,
            None => {
                errors.insert("type".to_string(), format!("unknown type: {}", raw));
                RecommendationType::Articles
            }
        },
    };

    let context = match params.context.as_deref() {
        None | Some("") => RequestContext::default(),
        Some(raw) => match serde_json::from_str::<RequestContext>(raw) {
            Ok(ctx) => ctx,
            Err(e) => {
                errors.insert("context".to_string(), format!("invalid JSON: {}", e));
                RequestContext::default()
            }
        },
    };

    let filters = match params.filters.as_deref() {
        None | Some("") => CandidateFilters::default(),
        Some(raw) => match serde_json::from_str::<CandidateFilters>(raw) {
            Ok(f) => f,
            Err(e) => {
                errors.insert("filters".to_string(), format!("invalid JSON: {}", e));
                CandidateFilters::default()
            }
        },
    };

    if let (Some(after), Some(before)) = (filters.published_after, filters.published_before) {
        if after > before {
            errors.insert(
                "filters.published_after".to_string(),
                "must not be later than published_before".to_string(),
            );
        }
    }

    if let (Some(min), Some(max)) = (filters.min_reading_time, filters.max_reading_time) {
        if min > max {
            errors.insert(
                "filters.min_reading_time".to_string(),
                "must not exceed max_reading_time".to_string(),
            );
        }
    }

    let algorithm = match params.algorithm.as_deref() {
        None | Some("") => Algorithm::HybridEnsemble,
        Some(raw) => match parse_algorithm(raw) {
            Some(a) => a,
            None => {
                errors.insert("algorithm".to_string(), format!("unknown algorithm: {}", raw));
                Algorithm::HybridEnsemble
            }
        },
    };

    let diversity_factor =
        unit_factor(params.diversity_factor, config.default_diversity_factor, "diversity_factor", &mut errors);
    let freshness_factor =
        unit_factor(params.freshness_factor, config.default_freshness_factor, "freshness_factor", &mut errors);
    let personality_factor = unit_factor(
        params.personality_factor,
        config.default_personality_factor,
        "personality_factor",
        &mut errors,
    );

    let limit = match params.limit {
        None => config.default_limit,
        Some(raw) if raw >= 1 && raw <= config.max_limit as i64 => raw as usize,
        Some(_) => {
            errors.insert(
                "limit".to_string(),
                format!("must be between 1 and {}", config.max_limit),
            );
            config.default_limit
        }
    };

    let offset = match params.offset {
        None => 0,
        Some(raw) if raw >= 0 => raw as usize,
        Some(_) => {
            errors.insert("offset".to_string(), "must not be negative".to_string());
            0
        }
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(RecommendationQuery {
        user_id,
        rec_type,
        context,
        filters,
        algorithm,
        diversity_factor,
        freshness_factor,
        personality_factor,
        explainability: params.explainability.unwrap_or(false),
        limit,
        offset,
        bypass_cache: params.bypass_cache.unwrap_or(false),
    })
}

pub fn parse_feedback(body: RawFeedbackBody) -> Result<Feedback, HashMap<String, String>> {
    let mut errors: HashMap<String, String> = HashMap::new();

    let recommendation_id = required_uuid(body.recommendation_id.as_deref(), "recommendation_id", &mut errors);
    let user_id = required_uuid(body.user_id.as_deref(), "user_id", &mut errors);
    let item_id = required_uuid(body.item_id.as_deref(), "item_id", &mut errors);

    let action = match body.action.as_deref() {
        None | Some("") => {
            errors.insert("action".to_string(), "is required".to_string());
            FeedbackAction::Click
        }
        Some(raw) => match parse_action(raw) {
            Some(a) => a,
            None => {
                errors.insert("action".to_string(), format!("unknown action: {}", raw));
                FeedbackAction::Click
            }
        },
    };

    let rating = match body.rating {
        None => None,
        Some(raw) if (1..=5).contains(&raw) => Some(raw as u8),
        Some(_) => {
            errors.insert("rating".to_string(), "must be between 1 and 5".to_string());
            None
        }
    };

    if let Some(comment) = body.feedback.as_deref() {
        if comment.len() > 500 {
            errors.insert("feedback".to_string(), "must be at most 500 characters".to_string());
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(Feedback {
        user_id,
        recommendation_id,
        item_id,
        action,
        rating,
        comment: body.feedback,
        context: body.context,
        created_at: Utc::now(),
    })
}

fn unit_factor(
    raw: Option<f64>,
    default: f64,
    field: &str,
    errors: &mut HashMap<String, String>,
) -> f64 {
    match raw {
        None => default,
        Some(v) if (0.0..=1.0).contains(&v) => v,
        Some(_) => {
            errors.insert(field.to_string(), "must be between 0 and 1".to_string());
            default
        }
    }
}

fn required_uuid(raw: Option<&str>, field: &str, errors: &mut HashMap<String, String>) -> Uuid {
    match raw {
        None | Some("") => {
            errors.insert(field.to_string(), "is required".to_string());
            Uuid::nil()
        }
        Some(value) => match Uuid::parse_str(value) {
            Ok(id) => id,
            Err(_) => {
                errors.insert(field.to_string(), "must be a valid UUID".to_string());
                Uuid::nil()
            }
        },
    }
}

fn parse_rec_type(raw: &str) -> Option<RecommendationType> {
    match raw {
        "articles" => Some(RecommendationType::Articles),
        "sections" => Some(RecommendationType::Sections),
        "tags" => Some(RecommendationType::Tags),
        "authors" => Some(RecommendationType::Authors),
        "related_content" => Some(RecommendationType::RelatedContent),
        "trending" => Some(RecommendationType::Trending),
        "personalized" => Some(RecommendationType::Personalized),
        "collaborative" => Some(RecommendationType::Collaborative),
        "hybrid" => Some(RecommendationType::Hybrid),
        _ => None,
    }
}

fn parse_algorithm(raw: &str) -> Option<Algorithm> {
    match raw {
        "content_similarity" => Some(Algorithm::ContentSimilarity),
        "collaborative_filtering" => Some(Algorithm::CollaborativeFiltering),
        "trending_analysis" => Some(Algorithm::TrendingAnalysis),
        "hybrid_ensemble" => Some(Algorithm::HybridEnsemble),
        _ => None,
    }
}

fn parse_action(raw: &str) -> Option<FeedbackAction> {
    match raw {
        "click" => Some(FeedbackAction::Click),
        "like" => Some(FeedbackAction::Like),
        "share" => Some(FeedbackAction::Share),
        "save" => Some(FeedbackAction::Save),
        "ignore" => Some(FeedbackAction::Ignore),
        "dislike" => Some(FeedbackAction::Dislike),
        "report" => Some(FeedbackAction::Report),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_config() -> EngineConfig {
        crate::config::Config::default().engine
    }

    #[test]
    fn test_defaults_applied() {
        let query =
            parse_recommendation_query(RawRecommendationParams::default(), &engine_config()).unwrap();

        assert!(query.user_id.is_none());
        assert_eq!(query.rec_type, RecommendationType::Articles);
        assert_eq!(query.algorithm, Algorithm::HybridEnsemble);
        assert_eq!(query.diversity_factor, 0.3);
        assert_eq!(query.freshness_factor, 0.2);
        assert_eq!(query.personality_factor, 0.5);
        assert_eq!(query.limit, 10);
        assert_eq!(query.offset, 0);
        assert!(!query.explainability);
    }

    #[test]
    fn test_invalid_fields_collected() {
        let params = RawRecommendationParams {
            user_id: Some("not-a-uuid".to_string()),
            diversity_factor: Some(1.5),
            limit: Some(500),
            ..Default::default()
        };

        let errors = parse_recommendation_query(params, &engine_config()).unwrap_err();
        assert!(errors.contains_key("user_id"));
        assert!(errors.contains_key("diversity_factor"));
        assert!(errors.contains_key("limit"));
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_filters_json_parsed() {
        let params = RawRecommendationParams {
            filters: Some(r#"{"sections":["sports"],"only_featured":true}"#.to_string()),
            ..Default::default()
        };

        let query = parse_recommendation_query(params, &engine_config()).unwrap();
        assert_eq!(query.filters.sections, vec!["sports".to_string()]);
        assert!(query.filters.only_featured);
        assert!(!query.filters.exclude_read);
    }

    #[test]
    fn test_reading_time_range_check() {
        let params = RawRecommendationParams {
            filters: Some(r#"{"min_reading_time":10,"max_reading_time":2}"#.to_string()),
            ..Default::default()
        };

        let errors = parse_recommendation_query(params, &engine_config()).unwrap_err();
        assert!(errors.contains_key("filters.min_reading_time"));
    }

    #[test]
    fn test_parse_feedback() {
        let body = RawFeedbackBody {
            recommendation_id: Some(Uuid::new_v4().to_string()),
            user_id: Some(Uuid::new_v4().to_string()),
            item_id: Some(Uuid::new_v4().to_string()),
            action: Some("dislike".to_string()),
            rating: Some(2),
            feedback: None,
            context: None,
        };

        let feedback = parse_feedback(body).unwrap();
        assert_eq!(feedback.action, FeedbackAction::Dislike);
        assert_eq!(feedback.rating, Some(2));
    }

    #[test]
    fn test_parse_feedback_missing_fields() {
        let errors = parse_feedback(RawFeedbackBody::default()).unwrap_err();
        assert!(errors.contains_key("recommendation_id"));
        assert!(errors.contains_key("user_id"));
        assert!(errors.contains_key("item_id"));
        assert!(errors.contains_key("action"));
    }

    #[test]
    fn test_rating_bounds() {
        let body = RawFeedbackBody {
            recommendation_id: Some(Uuid::new_v4().to_string()),
            user_id: Some(Uuid::new_v4().to_string()),
            item_id: Some(Uuid::new_v4().to_string()),
            action: Some("like".to_string()),
            rating: Some(9),
            feedback: None,
            context: None,
        };

        let errors = parse_feedback(body).unwrap_err();
        assert!(errors.contains_key("rating"));
    }
}
