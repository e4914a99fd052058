use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Article,
    Section,
    Tag,
    Author,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PageView,
    Read,
    Like,
    Share,
    Save,
    Comment,
    Search,
}

impl EventType {
    pub fn weight(&self) -> f64 {
        match self {
            EventType::Like => 1.0,
            EventType::Comment => 0.9,
            EventType::Share => 0.8,
            EventType::Save => 0.7,
            EventType::Read => 0.6,
            EventType::PageView => 0.2,
            EventType::Search => 0.1,
        }
    }

    pub fn is_positive(&self) -> bool {
        matches!(
            self,
            EventType::Like
                | EventType::Comment
                | EventType::Share
                | EventType::Save
                | EventType::Read
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::PageView => "page_view",
            EventType::Read => "read",
            EventType::Like => "like",
            EventType::Share => "share",
            EventType::Save => "save",
            EventType::Comment => "comment",
            EventType::Search => "search",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub user_id: Uuid,
    pub item_id: Uuid,
    pub event_type: EventType,
    pub session_duration_secs: Option<u32>,
    pub created_at: DateTime<Utc>,
}

impl InteractionEvent {
    pub fn new(user_id: Uuid, item_id: Uuid, event_type: EventType) -> Self {
        Self {
            user_id,
            item_id,
            event_type,
            session_duration_secs: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_duration(mut self, seconds: u32) -> Self {
        self.session_duration_secs = Some(seconds);
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.created_at = timestamp;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: Uuid,
    pub item_type: ItemType,
    pub title: String,
    pub section: String,
    pub tags: Vec<String>,
    pub author_id: Uuid,
    pub published_at: DateTime<Utc>,
    pub reading_time: u32,
    pub view_count: u64,
    pub like_count: u64,
    pub featured: bool,
    pub language: String,
}

impl ContentItem {
    pub fn new(id: Uuid, title: impl Into<String>, section: impl Into<String>) -> Self {
        Self {
            id,
            item_type: ItemType::Article,
            title: title.into(),
            section: section.into(),
            tags: Vec::new(),
            author_id: Uuid::nil(),
            published_at: Utc::now(),
            reading_time: 5,
            view_count: 0,
            like_count: 0,
            featured: false,
            language: "ar".to_string(),
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_author(mut self, author_id: Uuid) -> Self {
        self.author_id = author_id;
        self
    }

    pub fn with_counts(mut self, views: u64, likes: u64) -> Self {
        self.view_count = views;
        self.like_count = likes;
        self
    }

    pub fn with_reading_time(mut self, minutes: u32) -> Self {
        self.reading_time = minutes;
        self
    }

    pub fn published(mut self, at: DateTime<Utc>) -> Self {
        self.published_at = at;
        self
    }

    pub fn featured(mut self, featured: bool) -> Self {
        self.featured = featured;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterestKind {
    Category,
    Keyword,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInterest {
    pub user_id: Uuid,
    pub kind: InterestKind,
    pub value: String,
    pub weight: f64,
}

impl UserInterest {
    pub fn new(user_id: Uuid, kind: InterestKind, value: impl Into<String>, weight: f64) -> Self {
        Self {
            user_id,
            kind,
            value: value.into(),
            weight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayPart {
    Morning,
    Afternoon,
    Evening,
    Night,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserBehaviorSummary {
    pub user_id: Uuid,
    pub total_interactions: u64,
    pub counts_by_event: HashMap<String, u64>,
    pub avg_session_duration: f64,
    pub preferred_categories: Vec<String>,
    pub activity_pattern: Option<DayPart>,
    pub preferred_reading_time: Option<(u32, u32)>,
    pub window_days: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorKind {
    ContentSimilarity,
    CollaborativeFiltering,
    TrendingAnalysis,
    Popular,
}

impl GeneratorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeneratorKind::ContentSimilarity => "content_similarity",
            GeneratorKind::CollaborativeFiltering => "collaborative_filtering",
            GeneratorKind::TrendingAnalysis => "trending_analysis",
            GeneratorKind::Popular => "popular",
        }
    }

    pub fn rank(&self) -> u8 {
        match self {
            GeneratorKind::ContentSimilarity => 0,
            GeneratorKind::CollaborativeFiltering => 1,
            GeneratorKind::TrendingAnalysis => 2,
            GeneratorKind::Popular => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReasonData {
    ContentSimilarity {
        matched_categories: Vec<String>,
        matched_keywords: Vec<String>,
    },
    Collaborative {
        similar_user_count: usize,
        common_interactions: u64,
    },
    Trending {
        views: u64,
        interactions: u64,
        category: String,
    },
    Popular {
        views: u64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub item: ContentItem,
    pub score: f64,
    pub source: GeneratorKind,
    pub reasons: Vec<ReasonData>,
    pub factors: Vec<String>,
}

impl Candidate {
    pub fn new(item: ContentItem, score: f64, source: GeneratorKind, reason: ReasonData) -> Self {
        Self {
            item,
            score,
            source,
            reasons: vec![reason],
            factors: Vec::new(),
        }
    }

    pub fn with_factors(mut self, factors: Vec<String>) -> Self {
        self.factors = factors;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub final_score: f64,
    pub diversity: f64,
    pub freshness: f64,
    pub personalization: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub item_id: Uuid,
    pub item_type: ItemType,
    pub score: f64,
    pub confidence: f64,
    pub reason_type: GeneratorKind,
    pub reason_data: Vec<ReasonData>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationReasoning {
    pub recommendation_id: Uuid,
    pub kind: GeneratorKind,
    pub explanation: String,
    pub confidence: f64,
    pub factors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackAction {
    Click,
    Like,
    Share,
    Save,
    Ignore,
    Dislike,
    Report,
}

impl FeedbackAction {
    pub fn is_positive(&self) -> bool {
        matches!(
            self,
            FeedbackAction::Click
                | FeedbackAction::Like
                | FeedbackAction::Share
                | FeedbackAction::Save
        )
    }

    pub fn weight_delta(&self) -> f64 {
        match self {
            FeedbackAction::Like => 0.05,
            FeedbackAction::Share => 0.06,
            FeedbackAction::Save => 0.04,
            FeedbackAction::Click => 0.02,
            FeedbackAction::Ignore => -0.01,
            FeedbackAction::Dislike => -0.05,
            FeedbackAction::Report => -0.08,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub user_id: Uuid,
    pub recommendation_id: Uuid,
    pub item_id: Uuid,
    pub action: FeedbackAction,
    pub rating: Option<u8>,
    pub comment: Option<String>,
    pub context: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationType {
    Articles,
    Sections,
    Tags,
    Authors,
    RelatedContent,
    Trending,
    Personalized,
    Collaborative,
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    ContentSimilarity,
    CollaborativeFiltering,
    TrendingAnalysis,
    HybridEnsemble,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::ContentSimilarity => "content_similarity",
            Algorithm::CollaborativeFiltering => "collaborative_filtering",
            Algorithm::TrendingAnalysis => "trending_analysis",
            Algorithm::HybridEnsemble => "hybrid_ensemble",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    Desktop,
    Mobile,
    Tablet,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestContext {
    pub current_item_id: Option<Uuid>,
    pub user_interests: Vec<String>,
    pub reading_history: Vec<Uuid>,
    pub time_of_day: Option<DayPart>,
    pub device: Option<Device>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateFilters {
    pub sections: Vec<String>,
    pub tags: Vec<String>,
    pub authors: Vec<Uuid>,
    pub published_after: Option<DateTime<Utc>>,
    pub published_before: Option<DateTime<Utc>>,
    pub min_reading_time: Option<u32>,
    pub max_reading_time: Option<u32>,
    pub language: Option<String>,
    pub exclude_read: bool,
    pub only_featured: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationQuery {
    pub user_id: Option<Uuid>,
    pub rec_type: RecommendationType,
    pub context: RequestContext,
    pub filters: CandidateFilters,
    pub algorithm: Algorithm,
    pub diversity_factor: f64,
    pub freshness_factor: f64,
    pub personality_factor: f64,
    pub explainability: bool,
    pub limit: usize,
    pub offset: usize,
    pub bypass_cache: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedRecommendation {
    pub id: Uuid,
    pub item: ContentItem,
    pub score: f64,
    pub confidence: f64,
    pub reasoning: Vec<String>,
    pub algorithm: GeneratorKind,
    pub freshness: f64,
    pub diversity: f64,
    pub personalization: f64,
    pub metadata: Vec<ReasonData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pagination {
    pub offset: usize,
    pub limit: usize,
    pub total: usize,
    pub has_next: bool,
    pub has_previous: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchMetadata {
    pub user_id: Option<Uuid>,
    pub rec_type: RecommendationType,
    pub algorithm: Algorithm,
    pub generated_at: DateTime<Utc>,
    pub processing_time_ms: u64,
    pub cache_hit: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanations {
    pub why: Vec<String>,
    pub how: Vec<String>,
    pub alternatives: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchAnalytics {
    pub total_recommendations: usize,
    pub average_score: f64,
    pub average_confidence: f64,
    pub algorithm_breakdown: HashMap<String, usize>,
    pub diversity_score: f64,
    pub freshness_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationBatch {
    pub recommendations: Vec<RankedRecommendation>,
    pub pagination: Pagination,
    pub metadata: BatchMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_profile: Option<UserBehaviorSummary>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasoning: Vec<RecommendationReasoning>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanations: Option<Explanations>,
    pub analytics: BatchAnalytics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorPerformance {
    pub generator: GeneratorKind,
    pub shown: u64,
    pub clicked: u64,
    pub liked: u64,
    pub disliked: u64,
    pub ctr: f64,
    pub satisfaction: f64,
    pub trust: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationStats {
    pub total_recommendations: u64,
    pub total_feedback: u64,
    pub average_score: f64,
    pub reason_breakdown: HashMap<String, u64>,
    pub generator_performance: Vec<GeneratorPerformance>,
    pub generated_at: DateTime<Utc>,
}
