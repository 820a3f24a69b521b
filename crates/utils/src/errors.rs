use thiserror::Error;

/// Error raised when the input is not syntactically valid JavaScript.
///
/// Positions are 1-based and refer to the original source text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse error at {line}:{column}: {message}")]
pub struct ParseError {
    /// Human-readable description of what the parser expected.
    pub message: String,
    /// 1-based line of the offending token.
    pub line: usize,
    /// 1-based column of the offending token.
    pub column: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }
}

/// Error raised when the input is valid JavaScript but uses a construct the
/// transform passes cannot rewrite without risking a change in behavior.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported syntax at {line}:{column}: {construct}")]
pub struct UnsupportedSyntaxError {
    /// Name of the construct, e.g. "class declaration".
    pub construct: String,
    /// 1-based line where the construct starts.
    pub line: usize,
    /// 1-based column where the construct starts.
    pub column: usize,
}

impl UnsupportedSyntaxError {
    pub fn new(construct: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            construct: construct.into(),
            line,
            column,
        }
    }
}

/// Any failure of the lexer or parser.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Unsupported(#[from] UnsupportedSyntaxError),
}

/// Error type for transform operations.
#[derive(Debug, Error)]
pub enum TransformError {
    /// The input could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The input uses a construct the engine refuses to transform.
    #[error(transparent)]
    Unsupported(#[from] UnsupportedSyntaxError),
    /// A runtime template emitted by a pass failed to parse.
    #[error("internal template '{name}' is invalid: {source}")]
    Template {
        name: &'static str,
        #[source]
        source: SyntaxError,
    },
    /// The printed output did not parse back; the pipeline produced broken code.
    #[error("printer produced invalid output: {0}")]
    InvalidOutput(String),
    /// The async worker running the transform was cancelled or panicked.
    #[error("transform worker failed: {0}")]
    Worker(String),
    #[error("generic error: {0}")]
    Generic(String),
}

impl From<SyntaxError> for TransformError {
    fn from(err: SyntaxError) -> Self {
        match err {
            SyntaxError::Parse(e) => Self::Parse(e),
            SyntaxError::Unsupported(e) => Self::Unsupported(e),
        }
    }
}

/// Errors raised while loading a transform configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The options document is not valid JSON for `TransformOptions`.
    #[error("invalid options document: {0}")]
    Json(#[from] serde_json::Error),
    /// Unknown transform mode name.
    #[error("unknown mode '{0}', expected 'obfuscate' or 'deobfuscate'")]
    UnknownMode(String),
    /// Unknown identifier name generator.
    #[error("unknown identifier names generator '{0}'")]
    UnknownNamesGenerator(String),
    /// Unknown string array encoding.
    #[error("unknown string array encoding '{0}'")]
    UnknownEncoding(String),
}

/// Errors that can occur in the host surfaces (CLI, API) around a transform.
#[derive(Debug, Error)]
pub enum ObfuscateError {
    /// File read/write error.
    #[error("could not access '{path}': {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// Standard stream error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Transform application failed.
    #[error("transform error: {0}")]
    Transform(#[from] TransformError),
    /// Options could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// JSON serialization error.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
