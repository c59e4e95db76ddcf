use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error kinds surfaced by the core library.
///
/// Recoverable executor conditions are not errors: they travel through task
/// results as breakpoints. Everything here aborts the current command.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to parse version \"{0}\"")]
    VersionParse(String),

    #[error("failed to parse version spec \"{0}\"")]
    SpecParse(String),

    #[error("invalid project handle \"{0}\"")]
    HandleParse(String),

    #[error("analysis of {project} failed: {reason}")]
    Analysis { project: String, reason: String },

    #[error("package \"{package}\" is defined by both {existing} and {duplicate}")]
    DuplicatePackage {
        package: String,
        existing: String,
        duplicate: String,
    },

    #[error("cycle in dependency graph detected: {0}")]
    GraphCycle(String),

    #[error("unknown repository \"{0}\"")]
    UnknownRepository(String),

    #[error("project {0} is not covered by the current analysis")]
    UnknownProject(String),

    #[error("package \"{0}\" is not managed by any analyzed project")]
    UnknownPackage(String),

    #[error("unable to derive a version bump for {0}")]
    UnsolvableBump(String),

    #[error("{project} is at {current}, refusing to release {target}: backports are not implemented")]
    BackportNotImplemented {
        project: String,
        current: String,
        target: String,
    },

    #[error("release \"{0}\" is already in progress, finish it before creating a new one")]
    StateConflict(String),

    #[error("working tree of {0} has uncommitted changes")]
    VcsNotClean(String),

    #[error("push of {0} was rejected by the remote")]
    VcsPushRejected(String),

    #[error("remote ref {0} does not exist")]
    VcsRefNotFound(String),

    #[error("failed to publish {0}")]
    PublishFailure(String),

    #[error("job \"{desc}\" failed: {source}")]
    Job {
        desc: String,
        #[source]
        source: Box<Error>,
    },

    #[error("command `{command}` exited with {status}{stderr}")]
    Subprocess {
        command: String,
        status: String,
        stderr: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] yaml_serde::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
