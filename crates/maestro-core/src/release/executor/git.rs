//! Branch, tag and pull-request naming shared by the executor tasks.

use crate::release::state::ProjectState;

pub fn release_tag_name(project: &ProjectState) -> String {
    format!("v{}", project.to_version)
}

pub fn release_branch_name(project: &ProjectState) -> String {
    format!("release/{}", release_tag_name(project))
}

pub fn pull_request_title(project: &ProjectState) -> String {
    format!("Release {} v{}", project.project, project.to_version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::model::Language;
    use crate::config::manifest::ProjectHandle;
    use crate::edit::Span;
    use crate::release::state::ReleaseStage;
    use semver::Version;

    fn project() -> ProjectState {
        ProjectState {
            project: ProjectHandle::parse("platform:apps/web").unwrap(),
            from_version: Version::parse("1.0.0").unwrap(),
            to_version: Version::parse("1.1.0").unwrap(),
            version_span: Span::ZERO,
            language: Language::Elixir,
            publish: true,
            dependency_updates: vec![],
            stage: ReleaseStage::Clean,
        }
    }

    #[test]
    fn test_naming() {
        let project = project();
        assert_eq!(release_tag_name(&project), "v1.1.0");
        assert_eq!(release_branch_name(&project), "release/v1.1.0");
        assert_eq!(
            pull_request_title(&project),
            "Release platform:apps/web v1.1.0"
        );
    }
}
