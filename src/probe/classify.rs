/// A response that matches one of these is treated as the remote side refusing us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRule {
    pub status: u16,
    /// Substring the body must contain for the rule to apply
    pub body_marker: Option<&'static str>,
}

impl BlockRule {
    pub const fn status(status: u16) -> Self {
        Self {
            status,
            body_marker: None,
        }
    }

    pub const fn status_with_marker(status: u16, marker: &'static str) -> Self {
        Self {
            status,
            body_marker: Some(marker),
        }
    }

    pub fn matches(&self, status: u16, body: &str) -> bool {
        self.status == status && self.body_marker.map_or(true, |marker| body.contains(marker))
    }
}

pub const BLOCK_RULES: [BlockRule; 3] = [
    // Too Many Requests
    BlockRule::status(429),
    // Forbidden
    BlockRule::status(403),
    // Service Unavailable, only when the body says so
    BlockRule::status_with_marker(503, "blocked"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// 2xx response
    Success,
    /// Non-2xx response not matching any block rule
    Failed,
    /// Response matched a block rule
    Blocked,
    /// No response at all (timeout, DNS, refused connection)
    Unreachable,
}

impl Verdict {
    pub fn is_success(&self) -> bool {
        matches!(self, Verdict::Success)
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Verdict::Blocked)
    }
}

pub fn is_blocked(status: u16, body: &str) -> bool {
    BLOCK_RULES.iter().any(|rule| rule.matches(status, body))
}

/// Classify an HTTP exchange. `None` means no response was received.
pub fn classify(response: Option<(u16, &str)>) -> Verdict {
    match response {
        None => Verdict::Unreachable,
        Some((status, _)) if (200..300).contains(&status) => Verdict::Success,
        Some((status, body)) if is_blocked(status, body) => Verdict::Blocked,
        Some(_) => Verdict::Failed,
    }
}
