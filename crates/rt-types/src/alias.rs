use std::path::PathBuf;

/// Connection parameters resolved for a host alias.
///
/// All fields are optional because an OpenSSH-style config block may supply
/// any subset; a block without a `User` routes the caller to interactive
/// credential entry instead.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HostAlias {
    /// Real host to connect to; defaults to the alias itself when absent.
    pub host_name: Option<String>,
    /// Port to connect to; defaults to 22 when absent.
    pub port: Option<u16>,
    /// Remote username.
    pub user: Option<String>,
    /// Private key to authenticate with.
    pub identity_file: Option<PathBuf>,
}

impl HostAlias {
    /// Returns true when no block contributed any value.
    pub fn is_empty(&self) -> bool {
        self.host_name.is_none() && self.port.is_none() && self.user.is_none() && self.identity_file.is_none()
    }

    /// Target address for the given alias, applying the defaults.
    pub fn target(&self, hostname: &str) -> (String, u16) {
        let host = self.host_name.clone().unwrap_or_else(|| hostname.to_string());
        (host, self.port.unwrap_or(22))
    }
}
