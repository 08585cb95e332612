// Catalog browsing - search, filters, sorting and the submission queue.
//
// Everything here works on an already-fetched snapshot, so the same rules
// apply whether the records came from a live feed or a one-off read.

use crate::core::content::{Category, CommunityPost, Difficulty, Project};
use crate::core::identity::Viewer;
use crate::core::workflow::{is_visible, ContentRecord, RecordStatus};
use std::str::FromStr;

/// How the mission grid is ordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Most viewed first
    #[default]
    Trending,
    /// Most recently published first
    Newest,
    MostLiked,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trending" => Ok(SortOrder::Trending),
            "newest" => Ok(SortOrder::Newest),
            "most liked" | "most_liked" | "mostliked" => Ok(SortOrder::MostLiked),
            other => Err(format!("unknown sort order '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogQuery {
    /// Case-insensitive match against title or description
    pub search: String,
    /// `None` means all categories
    pub category: Option<Category>,
    /// `None` means all difficulties
    pub difficulty: Option<Difficulty>,
    pub sort: SortOrder,
}

impl CatalogQuery {
    pub fn matches(&self, project: &Project) -> bool {
        let query = self.search.trim().to_lowercase();
        let matches_search = query.is_empty()
            || project.title.to_lowercase().contains(&query)
            || project.description.to_lowercase().contains(&query);
        let matches_category = self.category.map_or(true, |c| project.category == c);
        let matches_difficulty = self.difficulty.map_or(true, |d| project.difficulty == d);

        matches_search && matches_category && matches_difficulty
    }
}

/// Projects the viewer may see that match the query, in the requested order.
pub fn browse(projects: &[Project], query: &CatalogQuery, viewer: &Viewer) -> Vec<Project> {
    let mut result: Vec<Project> = projects
        .iter()
        .filter(|p| is_visible(*p, viewer) && query.matches(p))
        .cloned()
        .collect();

    // sort_by is stable, so ties keep snapshot order
    match query.sort {
        SortOrder::Trending => result.sort_by(|a, b| b.views.cmp(&a.views)),
        SortOrder::Newest => result.sort_by(|a, b| b.published_at.cmp(&a.published_at)),
        SortOrder::MostLiked => result.sort_by(|a, b| b.likes.cmp(&a.likes)),
    }
    result
}

/// Pending work as seen by one viewer.
#[derive(Debug, Clone, Default)]
pub struct SubmissionQueue {
    pub projects: Vec<Project>,
    pub posts: Vec<CommunityPost>,
}

impl SubmissionQueue {
    /// Administrators get every pending record; everyone else gets their own.
    pub fn build(projects: &[Project], posts: &[CommunityPost], viewer: &Viewer) -> Self {
        Self {
            projects: pending_for(projects, viewer),
            posts: pending_for(posts, viewer),
        }
    }

    pub fn len(&self) -> usize {
        self.projects.len() + self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn flagged_count(&self) -> usize {
        self.projects.iter().filter(|p| p.is_flagged).count()
            + self.posts.iter().filter(|p| p.is_flagged).count()
    }
}

fn pending_for<R: ContentRecord + Clone>(records: &[R], viewer: &Viewer) -> Vec<R> {
    records
        .iter()
        .filter(|r| r.status() == RecordStatus::Pending)
        .filter(|r| viewer.is_admin() || r.author() == viewer.user_id)
        .cloned()
        .collect()
}
