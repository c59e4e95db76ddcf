use std::path::{Path, PathBuf};

/// Name of the metadata directory kept inside the workspace root.
pub const METADATA_DIRECTORY_NAME: &str = ".maestro";

/// Process-wide runtime context.
///
/// Built once from CLI flags and the environment, then passed by reference.
/// Nothing in the core reads configuration from hidden globals.
#[derive(Debug, Clone)]
pub struct Context {
    /// Directory containing the managed repository clones and `.maestro/`.
    pub workspace_path: PathBuf,

    /// Name of the active profile (`all` unless overridden).
    pub profile_name: String,

    /// Degree of parallelism for the analysis fan-out.
    pub jobs: usize,

    /// GitHub access token, if configured.
    pub github_token: Option<String>,

    /// Answer `yes` to every confirmation prompt.
    pub assume_yes: bool,
}

impl Context {
    pub fn new(
        workspace_path: PathBuf,
        profile_name: String,
        jobs: Option<usize>,
        github_token: Option<String>,
        assume_yes: bool,
    ) -> Self {
        Self {
            workspace_path,
            profile_name,
            jobs: jobs.unwrap_or_else(default_jobs),
            github_token,
            assume_yes,
        }
    }

    /// Location of the metadata directory (`<workspace>/.maestro`).
    pub fn meta_path(&self) -> PathBuf {
        self.workspace_path.join(METADATA_DIRECTORY_NAME)
    }

    /// Location of a repository clone inside the workspace.
    pub fn repo_path(&self, repo_name: &str) -> PathBuf {
        self.workspace_path.join(repo_name)
    }
}

/// Default worker count for analysis jobs. The analyses are subprocess-bound,
/// so the pool is sized well past the core count.
fn default_jobs() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cpus + 4).max(32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> Context {
        Context::new(
            PathBuf::from("/workspace"),
            "all".to_string(),
            Some(4),
            None,
            false,
        )
    }

    #[test]
    fn test_meta_path() {
        assert_eq!(ctx().meta_path(), Path::new("/workspace/.maestro"));
    }

    #[test]
    fn test_repo_path() {
        assert_eq!(ctx().repo_path("core"), Path::new("/workspace/core"));
    }

    #[test]
    fn test_default_jobs_at_least_32() {
        assert!(default_jobs() >= 32);
    }

    #[test]
    fn test_explicit_jobs_respected() {
        assert_eq!(ctx().jobs, 4);
    }
}
