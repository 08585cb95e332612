// Reference missions published into an empty catalog.

use super::content_models::{Category, Difficulty, Hardware, Project, ProjectDraft, Theme};
use super::content_service::{ContentError, ContentService};
use super::content_store::RecordStore;
use crate::core::identity::Viewer;

pub fn sample_drafts() -> Vec<ProjectDraft> {
    vec![
        ProjectDraft {
            title: "Smart Garden Monitoring".to_string(),
            description: "A reference mission for students to understand IoT integration."
                .to_string(),
            difficulty: Difficulty::Intermediate,
            category: Category::IoT,
            theme: Theme::Sample,
            thumbnail: "https://images.unsplash.com/photo-1585314062340-f1a5a7c9328d?auto=format&fit=crop&q=80&w=800".to_string(),
            duration: "4 Hours".to_string(),
            hardware: vec![Hardware {
                name: "ESP32".to_string(),
                link: String::new(),
                image: "https://picsum.photos/id/1/100/100".to_string(),
            }],
            ..Default::default()
        },
        ProjectDraft {
            title: "Solar Tracker v2".to_string(),
            description: "Maximum efficiency solar panel positioning system.".to_string(),
            difficulty: Difficulty::Advanced,
            category: Category::Electronics,
            theme: Theme::Sample,
            thumbnail: "https://images.unsplash.com/photo-1509391366360-fe5bb58583bb?auto=format&fit=crop&q=80&w=800".to_string(),
            duration: "8 Hours".to_string(),
            ..Default::default()
        },
    ]
}

/// Publish the sample missions when the catalog has no projects yet.
/// Returns the projects that were created (empty if the catalog was not empty).
pub async fn seed_if_empty<S: RecordStore>(
    service: &ContentService<S>,
    publisher: &Viewer,
) -> Result<Vec<Project>, ContentError> {
    let existing: Vec<Project> = service.snapshot().await?;
    if !existing.is_empty() {
        tracing::debug!(count = existing.len(), "Catalog not empty, skipping sample missions");
        return Ok(Vec::new());
    }

    let mut created = Vec::new();
    for draft in sample_drafts() {
        created.push(service.submit_project(publisher, draft).await?);
    }
    tracing::info!(count = created.len(), publisher = %publisher.user_id, "Seeded sample missions");
    Ok(created)
}
