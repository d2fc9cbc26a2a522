use secrecy::SecretString;

/// Interactive connection credentials for a host without an alias entry.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
    pub port: u16,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>, port: u16) -> Self {
        Self {
            username: username.into(),
            password: SecretString::new(password.into().into_boxed_str()),
            port,
        }
    }
}

// Manual Debug impl so the password can never leak through logging.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}
