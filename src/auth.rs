use std::fmt;

/// Jenkins API token. Kept out of `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

/// Username and API token sent as HTTP basic auth on every request.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub token: Token,
}

impl Credentials {
    pub fn new(username: impl Into<String>, token: impl Into<Token>) -> Self {
        Self {
            username: username.into(),
            token: token.into(),
        }
    }
}
