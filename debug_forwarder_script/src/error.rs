/// Failures while replaying a script.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("line {line}: invalid step: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown session '{0}'")]
    UnknownSession(String),

    #[error("failed to read script: {0}")]
    Io(#[from] std::io::Error),

    #[error("host state lock poisoned")]
    Poisoned,
}
