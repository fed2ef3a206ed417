//! Domain entities for migration audit projects.
//!
//! The `Project` aggregate owns its progress and results records; stage
//! results are embedded by value. Only the pipeline controller mutates
//! status, progress and results; everything else is fixed at creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::compare::{MobileReport, PerformanceReport, SeoValidationReport};
use crate::matching::{CorrespondenceReport, PatternRename};
use crate::probe::{BrokenLink, RedirectAnalysis, StatusCheckReport};

// ====== Enums ======

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Pending => "pending",
            ProjectStatus::Processing => "processing",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Failed => "failed",
        }
    }
}

/// One atomic step of the pipeline: exactly one progress tag and
/// percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Pending,
    ParsingSitemaps,
    ParsingAnalytics,
    ParsingRedirects,
    ComparingUrls,
    CheckingOldUrls,
    CheckingNewUrls,
    ValidatingSeo,
    Finalizing,
    TestingPerformance,
    TestingMobile,
    Completed,
    Failed,
}

impl Stage {
    pub fn tag(&self) -> &'static str {
        match self {
            Stage::Pending => "pending",
            Stage::ParsingSitemaps => "parsing_sitemaps",
            Stage::ParsingAnalytics => "parsing_analytics",
            Stage::ParsingRedirects => "parsing_redirects",
            Stage::ComparingUrls => "comparing_urls",
            Stage::CheckingOldUrls => "checking_old_urls",
            Stage::CheckingNewUrls => "checking_new_urls",
            Stage::ValidatingSeo => "validating_seo",
            Stage::Finalizing => "finalizing",
            Stage::TestingPerformance => "testing_performance",
            Stage::TestingMobile => "testing_mobile",
            Stage::Completed => "completed",
            Stage::Failed => "failed",
        }
    }

    /// Progress percentage reached when this stage begins.
    pub fn percent(&self) -> u8 {
        match self {
            Stage::Pending => 0,
            Stage::ParsingSitemaps => 10,
            Stage::ParsingAnalytics => 25,
            Stage::ParsingRedirects => 35,
            Stage::ComparingUrls => 50,
            Stage::CheckingOldUrls => 60,
            Stage::CheckingNewUrls => 75,
            Stage::ValidatingSeo => 85,
            Stage::Finalizing => 90,
            Stage::TestingPerformance => 92,
            Stage::TestingMobile => 96,
            Stage::Completed => 100,
            Stage::Failed => 0,
        }
    }
}

// ====== Records ======

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageProgress {
    pub stage: Stage,
    pub percentage: u8,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Optional input uploads; each is a local path or URL.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputFiles {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_sitemap: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_sitemap: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytics_export: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_map: Option<String>,
}

/// Aggregate of every stage's results; each field is filled when its stage
/// completes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditResults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correspondence: Option<CorrespondenceReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern_analysis: Option<Vec<PatternRename>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_status_check: Option<StatusCheckReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_status_check: Option<StatusCheckReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seo_validation: Option<SeoValidationReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broken_links: Option<Vec<BrokenLink>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_analysis: Option<RedirectAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerformanceReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<MobileReport>,
}

// ====== Rich Entity: Project ======

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub old_base_url: String,
    pub new_base_url: String,
    pub inputs: InputFiles,
    pub status: ProjectStatus,
    pub progress: StageProgress,
    pub results: AuditResults,
    pub created_at: DateTime<Utc>,
}

impl Project {
    pub fn new(old_base_url: &str, new_base_url: &str, inputs: InputFiles) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            old_base_url: old_base_url.to_string(),
            new_base_url: new_base_url.to_string(),
            inputs,
            status: ProjectStatus::Pending,
            progress: StageProgress {
                stage: Stage::Pending,
                percentage: 0,
                started_at: now,
                completed_at: None,
                error: None,
            },
            results: AuditResults::default(),
            created_at: now,
        }
    }

    /// Enter a pipeline stage: flips the project to processing and stamps
    /// the stage's progress percentage.
    pub fn enter_stage(&mut self, stage: Stage) {
        self.status = ProjectStatus::Processing;
        self.progress.stage = stage;
        self.progress.percentage = stage.percent();
    }

    /// Stamp successful completion. Upholds the invariant that a completed
    /// project is always at stage `completed` / 100%.
    pub fn complete(&mut self) {
        self.status = ProjectStatus::Completed;
        self.progress.stage = Stage::Completed;
        self.progress.percentage = 100;
        self.progress.completed_at = Some(Utc::now());
    }

    /// Record a stage failure. The last reached percentage is preserved.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = ProjectStatus::Failed;
        self.progress.stage = Stage::Failed;
        self.progress.error = Some(message.into());
    }

    pub fn is_completed(&self) -> bool {
        self.status == ProjectStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_project_starts_pending_at_zero() {
        let project = Project::new("https://old.site", "https://new.site", InputFiles::default());
        assert_eq!(project.status, ProjectStatus::Pending);
        assert_eq!(project.progress.stage, Stage::Pending);
        assert_eq!(project.progress.percentage, 0);
        assert!(project.results.correspondence.is_none());
    }

    #[test]
    fn stage_percentages_are_monotonic() {
        let stages = [
            Stage::ParsingSitemaps,
            Stage::ParsingAnalytics,
            Stage::ParsingRedirects,
            Stage::ComparingUrls,
            Stage::CheckingOldUrls,
            Stage::CheckingNewUrls,
            Stage::ValidatingSeo,
            Stage::Finalizing,
            Stage::TestingPerformance,
            Stage::TestingMobile,
            Stage::Completed,
        ];
        for window in stages.windows(2) {
            assert!(window[0].percent() < window[1].percent());
        }
    }

    #[test]
    fn completion_upholds_the_status_invariant() {
        let mut project =
            Project::new("https://old.site", "https://new.site", InputFiles::default());
        project.enter_stage(Stage::ParsingSitemaps);
        assert_eq!(project.status, ProjectStatus::Processing);

        project.complete();
        assert!(project.is_completed());
        assert_eq!(project.progress.stage, Stage::Completed);
        assert_eq!(project.progress.percentage, 100);
        assert!(project.progress.completed_at.is_some());
    }

    #[test]
    fn failure_preserves_last_percentage() {
        let mut project =
            Project::new("https://old.site", "https://new.site", InputFiles::default());
        project.enter_stage(Stage::ComparingUrls);
        project.fail("sitemap unreadable");

        assert_eq!(project.status, ProjectStatus::Failed);
        assert_eq!(project.progress.stage, Stage::Failed);
        assert_eq!(project.progress.percentage, Stage::ComparingUrls.percent());
        assert_eq!(project.progress.error.as_deref(), Some("sitemap unreadable"));
    }

    #[test]
    fn stage_tags_serialize_as_snake_case() {
        let json = serde_json::to_string(&Stage::ParsingSitemaps).unwrap();
        assert_eq!(json, "\"parsing_sitemaps\"");
        assert_eq!(Stage::ValidatingSeo.tag(), "validating_seo");
    }

    #[test]
    fn project_round_trips_through_json() {
        let mut project =
            Project::new("https://old.site", "https://new.site", InputFiles::default());
        project.enter_stage(Stage::CheckingOldUrls);

        let json = serde_json::to_string(&project).unwrap();
        let back: Project = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, project.id);
        assert_eq!(back.progress.stage, Stage::CheckingOldUrls);
        assert_eq!(back.progress.percentage, 60);
    }
}
