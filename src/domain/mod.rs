pub mod models;

pub use models::{
    AuditResults, InputFiles, Project, ProjectStatus, Stage, StageProgress,
};
