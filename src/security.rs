// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//
//! Client IP resolution for the rate limiter (§6, §7 RateLimited) and the
//! audit trail. The teacher's `security.rs` also carried a shell-command
//! validator for its terminal sessions (`validate_input`, `BLOCKED_COMMANDS`,
//! `sanitize_container_name`, ...); Fleet's sessions are browser containers
//! with no shell access surface to validate against, so that apparatus is
//! dropped and only the IP-resolution helper survives.

/// Extract client IP from request headers (supports proxies).
pub fn extract_client_ip(
    forwarded_for: Option<&str>,
    real_ip: Option<&str>,
    remote_addr: Option<&str>,
) -> Option<String> {
    if let Some(xff) = forwarded_for {
        if let Some(first_ip) = xff.split(',').next() {
            let ip = first_ip.trim();
            if !ip.is_empty() {
                return Some(ip.to_string());
            }
        }
    }

    if let Some(real) = real_ip {
        if !real.is_empty() {
            return Some(real.to_string());
        }
    }

    remote_addr.map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_client_ip_prefers_forwarded_for() {
        assert_eq!(extract_client_ip(Some("1.2.3.4, 5.6.7.8"), None, None), Some("1.2.3.4".to_string()));
    }

    #[test]
    fn test_extract_client_ip_falls_back_to_real_ip() {
        assert_eq!(extract_client_ip(None, Some("1.2.3.4"), None), Some("1.2.3.4".to_string()));
    }

    #[test]
    fn test_extract_client_ip_falls_back_to_remote_addr() {
        assert_eq!(extract_client_ip(None, None, Some("1.2.3.4:12345")), Some("1.2.3.4:12345".to_string()));
    }
}
