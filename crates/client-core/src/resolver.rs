use std::io::{self, BufRead, Write};

use async_trait::async_trait;
use rt_types::{Credentials, validation};
use tokio::task;
use tunnel_core::{CredentialResolver, TunnelError};

// Internal Result type alias for convenience
type Result<T> = tunnel_core::TunnelResult<T>;

/// Interactive credential prompts on the controlling terminal.
///
/// Closing stdin (EOF) at any prompt cancels the whole entry, which callers
/// must treat as terminal rather than retrying.
pub struct PromptResolver;

#[async_trait]
impl CredentialResolver for PromptResolver {
    async fn resolve(&self, hostname: &str) -> Result<Credentials> {
        let hostname = hostname.to_string();
        task::spawn_blocking(move || prompt_credentials(&hostname))
            .await
            .map_err(|err| TunnelError::config(format!("prompt task join error: {err}")))?
    }
}

fn prompt_credentials(hostname: &str) -> Result<Credentials> {
    println!("SSH credentials for {hostname}");

    let username = match read_line("username [root]: ")? {
        Some(value) if !value.is_empty() => value,
        Some(_) => "root".to_string(),
        None => return Err(TunnelError::Cancelled),
    };

    let password = rpassword::prompt_password("password: ").map_err(|_| TunnelError::Cancelled)?;

    let port = loop {
        match read_line("port [22]: ")? {
            None => return Err(TunnelError::Cancelled),
            Some(value) if value.is_empty() => break 22,
            Some(value) => match validation::parse_port(&value) {
                Ok(port) => break port,
                Err(err) => eprintln!("{err}"),
            },
        }
    };

    Ok(Credentials::new(username, password, port))
}

/// Prompt and read one trimmed line; `None` means the operator closed stdin.
fn read_line(prompt: &str) -> Result<Option<String>> {
    print!("{prompt}");
    io::stdout().flush().map_err(|_| TunnelError::Cancelled)?;
    let mut input = String::new();
    let read = io::stdin().lock().read_line(&mut input).map_err(|_| TunnelError::Cancelled)?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim().to_string()))
}
