//! Session context and token storage.

use std::fmt;
use std::sync::RwLock;

/// Environment variable read by [`EnvTokenStore`].
pub const TOKEN_ENV: &str = "TUITTER_TOKEN";

/// An access token. Debug output never shows the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

/// Who is using the client. Passed explicitly to the screen manager and
/// every fetch; there is no global session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub token: Option<Token>,
    pub handle: Option<String>,
}

impl SessionContext {
    pub fn new(token: Option<Token>, handle: Option<String>) -> Self {
        Self { token, handle }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    /// The core never validates tokens; having one is enough.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn handle_or_default(&self) -> &str {
        self.handle.as_deref().unwrap_or("guest")
    }
}

/// Where the access token lives.
pub trait TokenStore: Send + Sync {
    fn get_token(&self) -> Option<Token>;
    fn set_token(&self, token: Token);
}

/// Token held in memory only.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<Token>>,
}

impl MemoryTokenStore {
    pub fn new(token: Option<Token>) -> Self {
        Self {
            token: RwLock::new(token),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get_token(&self) -> Option<Token> {
        self.token.read().ok().and_then(|t| t.clone())
    }

    fn set_token(&self, token: Token) {
        if let Ok(mut slot) = self.token.write() {
            *slot = Some(token);
        }
    }
}

/// Reads the token from `TUITTER_TOKEN`. A token set at runtime takes
/// precedence and is kept in memory; the environment is never modified.
#[derive(Debug, Default)]
pub struct EnvTokenStore {
    var: String,
    runtime: MemoryTokenStore,
}

impl EnvTokenStore {
    pub fn new() -> Self {
        Self::with_var(TOKEN_ENV)
    }

    pub fn with_var(var: impl Into<String>) -> Self {
        Self {
            var: var.into(),
            runtime: MemoryTokenStore::default(),
        }
    }
}

impl TokenStore for EnvTokenStore {
    fn get_token(&self) -> Option<Token> {
        self.runtime.get_token().or_else(|| {
            std::env::var(&self.var)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(Token::new)
        })
    }

    fn set_token(&self, token: Token) {
        self.runtime.set_token(token);
    }
}
