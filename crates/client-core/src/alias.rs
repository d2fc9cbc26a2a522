use std::{
    fs,
    path::{Path, PathBuf},
};

use rt_types::{HostAlias, validation};
use tracing::debug;
use tunnel_core::TunnelError;

// Internal Result type alias for convenience
type Result<T> = tunnel_core::TunnelResult<T>;

/// Default location of the host alias configuration.
pub fn default_alias_path() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".ssh/config")
}

/// Parsed OpenSSH-style host alias configuration.
///
/// Supported keywords: `Host`, `HostName`, `Port`, `User`, `IdentityFile`,
/// case-insensitive, `Key value` or `Key=value` form. `Host` patterns may use
/// `*` and `?` wildcards. For each setting the first value obtained across
/// all matching blocks wins, matching OpenSSH precedence. Unsupported
/// keywords are skipped.
#[derive(Clone, Debug, Default)]
pub struct HostAliasConfig {
    blocks: Vec<HostBlock>,
}

#[derive(Clone, Debug)]
struct HostBlock {
    patterns: Vec<String>,
    alias: HostAlias,
}

impl HostAliasConfig {
    /// Load from a file; a missing file is an empty configuration.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no host alias configuration file");
                Ok(Self::default())
            }
            Err(err) => Err(TunnelError::config(format!("failed to read {}: {err}", path.display()))),
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut blocks = Vec::new();
        let mut current: Option<HostBlock> = None;

        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line_number = index + 1;
            let (keyword, value) = split_keyword(line)
                .ok_or_else(|| TunnelError::config(format!("line {line_number}: expected 'keyword value'")))?;

            if keyword.eq_ignore_ascii_case("host") {
                blocks.extend(current.take());
                current = Some(HostBlock {
                    patterns: value.split_whitespace().map(str::to_string).collect(),
                    alias: HostAlias::default(),
                });
            } else {
                let block = current
                    .as_mut()
                    .ok_or_else(|| TunnelError::config(format!("line {line_number}: '{keyword}' outside a Host block")))?;
                apply_setting(&mut block.alias, keyword, value)
                    .map_err(|message| TunnelError::config(format!("line {line_number}: {message}")))?;
            }
        }
        blocks.extend(current);
        Ok(Self { blocks })
    }

    /// Resolve a hostname against every matching block. Returns `None` when
    /// no block matched at all.
    pub fn lookup(&self, hostname: &str) -> Option<HostAlias> {
        let mut merged = HostAlias::default();
        let mut matched = false;
        for block in &self.blocks {
            if block.patterns.iter().any(|pattern| pattern_matches(pattern, hostname)) {
                matched = true;
                merge_first_wins(&mut merged, &block.alias);
            }
        }
        matched.then_some(merged)
    }
}

fn split_keyword(line: &str) -> Option<(&str, &str)> {
    let (keyword, rest) = line.split_once([' ', '\t', '='])?;
    let value = rest.trim_start_matches(['=', ' ', '\t']).trim();
    if keyword.is_empty() || value.is_empty() {
        None
    } else {
        Some((keyword, value))
    }
}

fn apply_setting(alias: &mut HostAlias, keyword: &str, value: &str) -> std::result::Result<(), String> {
    match keyword.to_ascii_lowercase().as_str() {
        "hostname" => {
            if alias.host_name.is_none() {
                alias.host_name = Some(value.to_string());
            }
        }
        "port" => {
            let port = validation::parse_port(value).map_err(|err| err.to_string())?;
            if alias.port.is_none() {
                alias.port = Some(port);
            }
        }
        "user" => {
            if alias.user.is_none() {
                alias.user = Some(value.to_string());
            }
        }
        "identityfile" => {
            if alias.identity_file.is_none() {
                alias.identity_file = Some(expand_tilde(value));
            }
        }
        _ => {}
    }
    Ok(())
}

fn merge_first_wins(into: &mut HostAlias, from: &HostAlias) {
    if into.host_name.is_none() {
        into.host_name = from.host_name.clone();
    }
    if into.port.is_none() {
        into.port = from.port;
    }
    if into.user.is_none() {
        into.user = from.user.clone();
    }
    if into.identity_file.is_none() {
        into.identity_file = from.identity_file.clone();
    }
}

fn expand_tilde(value: &str) -> PathBuf {
    if let Some(rest) = value.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(value)
}

/// Case-insensitive glob match supporting `*` and `?`.
fn pattern_matches(pattern: &str, hostname: &str) -> bool {
    fn matches(pattern: &[u8], host: &[u8]) -> bool {
        match (pattern.first(), host.first()) {
            (None, None) => true,
            (Some(b'*'), _) => matches(&pattern[1..], host) || (!host.is_empty() && matches(pattern, &host[1..])),
            (Some(b'?'), Some(_)) => matches(&pattern[1..], &host[1..]),
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b) && matches(&pattern[1..], &host[1..]),
            _ => false,
        }
    }
    matches(pattern.as_bytes(), hostname.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "
# jump hosts
Host jump
    HostName jump.internal.example
    Port 2222
    User deploy
    IdentityFile ~/.ssh/id_jump

Host *.staging
    User qa

Host anon
    HostName anon.example
";

    #[test]
    fn lookup_resolves_full_entry() {
        let config = HostAliasConfig::parse(SAMPLE).unwrap();
        let alias = config.lookup("jump").expect("entry for jump");
        assert_eq!(alias.host_name.as_deref(), Some("jump.internal.example"));
        assert_eq!(alias.port, Some(2222));
        assert_eq!(alias.user.as_deref(), Some("deploy"));
        assert!(alias.identity_file.is_some());
        assert_eq!(alias.target("jump"), ("jump.internal.example".to_string(), 2222));
    }

    #[test]
    fn lookup_misses_unknown_hosts() {
        let config = HostAliasConfig::parse(SAMPLE).unwrap();
        assert!(config.lookup("prod.example").is_none());
    }

    #[test]
    fn wildcard_patterns_match_case_insensitively() {
        let config = HostAliasConfig::parse(SAMPLE).unwrap();
        let alias = config.lookup("Web1.Staging").expect("wildcard entry");
        assert_eq!(alias.user.as_deref(), Some("qa"));
        // Defaults apply where the entry is silent.
        assert_eq!(alias.target("web1.staging"), ("web1.staging".to_string(), 22));
    }

    #[test]
    fn entry_without_user_still_resolves() {
        let config = HostAliasConfig::parse(SAMPLE).unwrap();
        let alias = config.lookup("anon").expect("entry for anon");
        assert!(alias.user.is_none(), "caller must fall back to credential prompt");
        assert_eq!(alias.host_name.as_deref(), Some("anon.example"));
    }

    #[test]
    fn first_matching_block_wins_per_setting() {
        let text = "
Host db
    User first
Host db *
    User second
    Port 2200
";
        let config = HostAliasConfig::parse(text).unwrap();
        let alias = config.lookup("db").unwrap();
        assert_eq!(alias.user.as_deref(), Some("first"));
        assert_eq!(alias.port, Some(2200));
    }

    #[test]
    fn equals_form_is_accepted() {
        let config = HostAliasConfig::parse("Host gw\nHostName=gw.example\nPort=22").unwrap();
        let alias = config.lookup("gw").unwrap();
        assert_eq!(alias.host_name.as_deref(), Some("gw.example"));
    }

    #[test]
    fn malformed_port_is_a_config_error() {
        let err = HostAliasConfig::parse("Host db\nPort zero").unwrap_err();
        assert!(matches!(err, TunnelError::Config(_)), "unexpected error: {err:?}");
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn setting_outside_host_block_is_rejected() {
        let err = HostAliasConfig::parse("User nobody").unwrap_err();
        assert!(matches!(err, TunnelError::Config(_)));
    }

    #[test]
    fn unknown_keywords_are_skipped() {
        let config = HostAliasConfig::parse("Host gw\nStrictHostKeyChecking no\nUser ops").unwrap();
        assert_eq!(config.lookup("gw").unwrap().user.as_deref(), Some("ops"));
    }

    #[test]
    fn missing_file_is_empty_config() {
        let config = HostAliasConfig::load(Path::new("/nonexistent/rustytunnel-config")).unwrap();
        assert!(config.lookup("anything").is_none());
    }
}
