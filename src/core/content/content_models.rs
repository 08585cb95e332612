// Content domain models - mission projects and community posts.
//
// Field names serialize in camelCase because the stored records are shared
// with the web client that reads the same collections.

use crate::core::identity::Role;
use crate::core::workflow::{ContentRecord, RecordStatus};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

pub const UNTITLED_PROJECT: &str = "Untitled Project";
pub const DEFAULT_AVATAR_COLOR: &str = "bg-blue-900";

/// Which collection a record lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Project,
    CommunityPost,
}

impl ContentKind {
    /// Top-level store path of the collection.
    pub fn collection(self) -> &'static str {
        match self {
            ContentKind::Project => "projects",
            ContentKind::CommunityPost => "communityPosts",
        }
    }

    pub fn record_path(self, id: &str) -> String {
        format!("{}/{}", self.collection(), id)
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentKind::Project => write!(f, "project"),
            ContentKind::CommunityPost => write!(f, "community post"),
        }
    }
}

/// A record type that can be decoded from its collection snapshot.
pub trait StoredRecord: ContentRecord + Serialize + DeserializeOwned + Clone + Send + Sync {
    const KIND: ContentKind;

    /// The store key is the source of truth for the id.
    fn set_id(&mut self, id: String);
}

// ============================================================================
// PROJECTS
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[default]
    IoT,
    Robotics,
    AI,
    Electronics,
    #[serde(rename = "3D Printing")]
    ThreeDPrinting,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Theme {
    #[default]
    General,
    #[serde(rename = "Health & food science")]
    HealthAndFoodScience,
    #[serde(rename = "Sustainable Living")]
    SustainableLiving,
    #[serde(rename = "Future of Transportation")]
    FutureOfTransportation,
    #[serde(rename = "Aesthetics (Visual and Wearable)")]
    Aesthetics,
    #[serde(rename = "Emerging Technologies")]
    EmergingTechnologies,
    Entrepreneurship,
    #[serde(rename = "City and Urban Landscape")]
    CityAndUrbanLandscape,
    #[serde(rename = "Language (Media and Communication)")]
    Language,
    /// Reference missions published by instructors
    Sample,
}

/// Instructors always publish `Sample` missions; students cannot pick it.
pub fn resolve_theme(author_role: Role, requested: Theme) -> Theme {
    match (author_role, requested) {
        (Role::Administrator, _) => Theme::Sample,
        (Role::Standard, Theme::Sample) => Theme::General,
        (Role::Standard, theme) => theme,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hardware {
    pub name: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Software {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonStep {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<Media>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub makecode_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub author: String,
    pub text: String,
    /// Display text as written by the client ("Just now", an ISO date, ...)
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub avatar_color: String,
    #[serde(default)]
    pub likes: u64,
}

/// Comments are normally keyed by child key. A client that saves the whole
/// project back writes them as an array instead; array entries get a
/// zero-padded index key so they keep their order, and holes are skipped.
fn deserialize_comments<'de, D>(deserializer: D) -> Result<BTreeMap<String, Comment>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StoredComments {
        Keyed(BTreeMap<String, Comment>),
        Listed(Vec<Option<Comment>>),
    }

    let entries: Vec<(String, Comment)> = match Option::<StoredComments>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(StoredComments::Keyed(map)) => map.into_iter().collect(),
        Some(StoredComments::Listed(list)) => list
            .into_iter()
            .enumerate()
            .filter_map(|(index, comment)| comment.map(|c| (format!("{:06}", index), c)))
            .collect(),
    };

    Ok(entries
        .into_iter()
        .map(|(key, mut comment)| {
            if comment.id.is_empty() {
                comment.id = key.clone();
            }
            (key, comment)
        })
        .collect())
}

/// A mission write-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub author: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub hardware: Vec<Hardware>,
    #[serde(default)]
    pub software: Vec<Software>,
    #[serde(default)]
    pub steps: Vec<LessonStep>,
    /// Keyed by generated child key, so iteration follows posting order
    #[serde(default, deserialize_with = "deserialize_comments")]
    pub comments: BTreeMap<String, Comment>,
    pub published_at: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub makecode_url: Option<String>,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(default)]
    pub is_flagged: bool,
}

/// The author-editable part of a project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectDraft {
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub category: Category,
    pub theme: Theme,
    pub thumbnail: String,
    pub duration: String,
    pub hardware: Vec<Hardware>,
    pub software: Vec<Software>,
    pub steps: Vec<LessonStep>,
    pub makecode_url: Option<String>,
}

impl Project {
    /// Build a fresh project from a draft. Status and flag are stamped by the
    /// workflow afterwards.
    pub fn from_draft(
        id: String,
        author: String,
        author_role: Role,
        draft: ProjectDraft,
        published_at: NaiveDate,
    ) -> Self {
        let mut project = Self {
            id,
            title: String::new(),
            description: String::new(),
            author,
            difficulty: Difficulty::default(),
            category: Category::default(),
            theme: Theme::default(),
            thumbnail: String::new(),
            views: 0,
            likes: 0,
            duration: String::new(),
            hardware: Vec::new(),
            software: Vec::new(),
            steps: Vec::new(),
            comments: BTreeMap::new(),
            published_at,
            makecode_url: None,
            status: RecordStatus::Pending,
            is_flagged: false,
        };
        project.apply_draft(author_role, draft);
        project
    }

    /// Replace the editable content. Id, author, counters, comments and the
    /// publish date are kept.
    pub fn apply_draft(&mut self, author_role: Role, draft: ProjectDraft) {
        let title = draft.title.trim();
        self.title = if title.is_empty() {
            UNTITLED_PROJECT.to_string()
        } else {
            title.to_string()
        };
        self.description = draft.description;
        self.difficulty = draft.difficulty;
        self.category = draft.category;
        self.theme = resolve_theme(author_role, draft.theme);
        self.thumbnail = draft.thumbnail;
        self.duration = draft.duration;
        self.hardware = draft.hardware;
        self.software = draft.software;
        self.steps = draft.steps;
        self.makecode_url = draft.makecode_url;
    }
}

impl ContentRecord for Project {
    fn id(&self) -> &str {
        &self.id
    }

    fn author(&self) -> &str {
        &self.author
    }

    fn status(&self) -> RecordStatus {
        self.status
    }

    fn set_status(&mut self, status: RecordStatus) {
        self.status = status;
    }

    fn is_flagged(&self) -> bool {
        self.is_flagged
    }

    fn set_flagged(&mut self, flagged: bool) {
        self.is_flagged = flagged;
    }

    fn text_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.title.as_str(), self.description.as_str()];
        for step in &self.steps {
            fields.push(&step.title);
            fields.push(&step.content);
        }
        fields
    }

    fn url_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.thumbnail.as_str()];
        fields.extend(self.makecode_url.as_deref());
        for item in &self.hardware {
            fields.push(&item.link);
            fields.push(&item.image);
        }
        for step in &self.steps {
            fields.extend(step.image.as_deref());
            fields.extend(step.youtube_url.as_deref());
            fields.extend(step.makecode_url.as_deref());
            fields.extend(step.media.iter().map(|m| m.url.as_str()));
        }
        fields
    }
}

impl StoredRecord for Project {
    const KIND: ContentKind = ContentKind::Project;

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

// ============================================================================
// COMMUNITY POSTS
// ============================================================================

/// A showcase post on the community board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityPost {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub author: String,
    /// Locale date string written by the web client; kept as-is
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub comments_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_avatar: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(default)]
    pub is_flagged: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostDraft {
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub category: String,
}

impl CommunityPost {
    pub fn apply_draft(&mut self, draft: PostDraft) {
        self.title = draft.title.trim().to_string();
        self.description = draft.description;
        self.image_url = draft.image_url.filter(|url| !url.trim().is_empty());
        self.category = draft.category;
    }
}

impl ContentRecord for CommunityPost {
    fn id(&self) -> &str {
        &self.id
    }

    fn author(&self) -> &str {
        &self.author
    }

    fn status(&self) -> RecordStatus {
        self.status
    }

    fn set_status(&mut self, status: RecordStatus) {
        self.status = status;
    }

    fn is_flagged(&self) -> bool {
        self.is_flagged
    }

    fn set_flagged(&mut self, flagged: bool) {
        self.is_flagged = flagged;
    }

    fn text_fields(&self) -> Vec<&str> {
        vec![&self.title[..], &self.description[..], &self.category[..]]
    }

    fn url_fields(&self) -> Vec<&str> {
        self.image_url.as_deref().into_iter().collect()
    }
}

impl StoredRecord for CommunityPost {
    const KIND: ContentKind = ContentKind::CommunityPost;

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}
