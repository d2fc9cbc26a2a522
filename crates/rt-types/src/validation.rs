use std::fmt;

/// Validation errors for operator-supplied tunnel parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyHostname,
    InvalidPort(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyHostname => write!(f, "hostname must not be empty"),
            ValidationError::InvalidPort(value) => {
                write!(f, "port must be a number between 1-65535: {value}")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Parse a port string, rejecting 0 and anything outside u16 range.
pub fn parse_port(value: &str) -> Result<u16, ValidationError> {
    match value.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(ValidationError::InvalidPort(value.trim().to_string())),
        Ok(port) => Ok(port),
    }
}

/// Reject empty or whitespace-only hostnames.
pub fn validate_hostname(hostname: &str) -> Result<(), ValidationError> {
    if hostname.trim().is_empty() {
        Err(ValidationError::EmptyHostname)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_port_accepts_full_range() {
        assert_eq!(parse_port("22"), Ok(22));
        assert_eq!(parse_port("65535"), Ok(65535));
        assert_eq!(parse_port(" 8080 "), Ok(8080));
    }

    #[test]
    fn parse_port_rejects_zero_and_garbage() {
        for input in ["0", "65536", "-1", "ssh", ""] {
            assert!(parse_port(input).is_err(), "{input:?} should be rejected");
        }
    }

    #[test]
    fn hostname_must_be_non_empty() {
        assert!(validate_hostname("jump.example").is_ok());
        assert!(validate_hostname("").is_err());
        assert!(validate_hostname("   ").is_err());
    }
}
