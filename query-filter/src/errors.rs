/// Errors raised while splitting the query string into tokens
#[derive(Debug, Clone, PartialEq)]
pub enum LexError {
    UnterminatedQuote { position: usize, quote: char },
    UnterminatedRegex { position: usize },
    UnmatchedBracket { position: usize },
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LexError::UnterminatedQuote { position, quote } => {
                write!(f, "Unterminated {} quote starting at position {}", quote, position)
            }
            LexError::UnterminatedRegex { position } => {
                write!(f, "Unterminated regex literal starting at position {}", position)
            }
            LexError::UnmatchedBracket { position } => {
                write!(f, "Unmatched bracket at position {}", position)
            }
        }
    }
}

impl std::error::Error for LexError {}

/// Grammar violations found while building the AST
#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxError {
    UnexpectedToken { position: usize, found: String },
    UnmatchedParen { position: usize },
    EmptyExpression { position: usize },
    TrailingOperator { position: usize, operator: String },
    DanglingColon { position: usize },
    NestingTooDeep { position: usize, limit: usize },
}

impl std::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyntaxError::UnexpectedToken { position, found } => {
                write!(f, "Unexpected token '{}' at position {}", found, position)
            }
            SyntaxError::UnmatchedParen { position } => {
                write!(f, "Unmatched parenthesis at position {}", position)
            }
            SyntaxError::EmptyExpression { position } => {
                write!(f, "Empty expression in group at position {}", position)
            }
            SyntaxError::TrailingOperator { position, operator } => write!(
                f,
                "Operator '{}' at position {} has no right operand",
                operator, position
            ),
            SyntaxError::DanglingColon { position } => write!(
                f,
                "Colon at position {} must join a field name and a value (field:value)",
                position
            ),
            SyntaxError::NestingTooDeep { position, limit } => write!(
                f,
                "Nesting at position {} exceeds the limit of {} groups or NOT prefixes",
                position, limit
            ),
        }
    }
}

impl std::error::Error for SyntaxError {}

/// Free-text terms that the parser configuration cannot resolve
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    NoDefaultFields { term: String },
    TextSearchDisabled { term: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NoDefaultFields { term } => write!(
                f,
                "Free-text term '{}' needs a field: no default fields are configured",
                term
            ),
            ConfigError::TextSearchDisabled { term } => write!(
                f,
                "Free-text term '{}' is not allowed: text search is disabled for this parser",
                term
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    FieldCollision { key: String },
    UnsupportedValue(String),
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::FieldCollision { key } => {
                write!(f, "Field collision: key '{}' would be overwritten", key)
            }
            CompileError::UnsupportedValue(what) => write!(f, "Unsupported value: {}", what),
        }
    }
}

impl std::error::Error for CompileError {}

/// Any failure of the query pipeline; each stage reports the first error it hits
#[derive(Debug, Clone, PartialEq)]
pub enum QueryError {
    Lex(LexError),
    Syntax(SyntaxError),
    Config(ConfigError),
    Compile(CompileError),
}

impl From<LexError> for QueryError {
    fn from(err: LexError) -> Self {
        QueryError::Lex(err)
    }
}

impl From<SyntaxError> for QueryError {
    fn from(err: SyntaxError) -> Self {
        QueryError::Syntax(err)
    }
}

impl From<ConfigError> for QueryError {
    fn from(err: ConfigError) -> Self {
        QueryError::Config(err)
    }
}

impl From<CompileError> for QueryError {
    fn from(err: CompileError) -> Self {
        QueryError::Compile(err)
    }
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryError::Lex(err) => write!(f, "Lex error: {}", err),
            QueryError::Syntax(err) => write!(f, "Syntax error: {}", err),
            QueryError::Config(err) => write!(f, "Config error: {}", err),
            QueryError::Compile(err) => write!(f, "Compile error: {}", err),
        }
    }
}

impl std::error::Error for QueryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            QueryError::Lex(err) => Some(err),
            QueryError::Syntax(err) => Some(err),
            QueryError::Config(err) => Some(err),
            QueryError::Compile(err) => Some(err),
        }
    }
}
