//! User identities: login names, security identifiers (SIDs), and the
//! resolved pair the reset procedure works with.
//!
//! A reset always targets a SID. The login name is only used by the
//! remote naming heuristics and may be absent when reverse lookup fails.

use std::fmt;

use serde::Serialize;

/// Characters that can never appear in a Windows account name.
const FORBIDDEN_NAME_CHARS: &[char] = &[
    '"', '/', '[', ']', ':', ';', '|', '=', ',', '+', '*', '?', '<', '>',
];

/// Maximum accepted length of a login name, domain prefix included.
const MAX_NAME_LEN: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("Invalid SID: {0:?}")]
    InvalidSid(String),

    #[error("Invalid login name: {0:?}")]
    InvalidName(String),

    #[error("Either a login name or a SID is required")]
    Missing,
}

/// A syntactically valid security identifier, e.g. `S-1-5-21-1004336348-1177238915-682003330-512`.
///
/// The leading `S` is normalised to upper case; everything else is kept as given.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Sid(String);

impl Sid {
    /// Parse a SID string.
    ///
    /// Requires the `S` prefix followed by at least a revision and an
    /// identifier authority, all decimal.
    pub fn parse(raw: &str) -> Result<Self, IdentityError> {
        let trimmed = raw.trim();
        let mut parts = trimmed.split('-');

        let has_prefix = parts.next().is_some_and(|p| p.eq_ignore_ascii_case("S"));
        let components: Vec<&str> = parts.collect();

        let valid = has_prefix
            && components.len() >= 2
            && components
                .iter()
                .all(|c| !c.is_empty() && c.bytes().all(|b| b.is_ascii_digit()));

        if !valid {
            return Err(IdentityError::InvalidSid(raw.to_string()));
        }

        Ok(Self(format!("S-{}", components.join("-"))))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A login name, optionally qualified as `DOMAIN\account`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LoginName(String);

impl LoginName {
    pub fn parse(raw: &str) -> Result<Self, IdentityError> {
        let trimmed = raw.trim();
        let invalid = || IdentityError::InvalidName(raw.to_string());

        if trimmed.is_empty() || trimmed.len() > MAX_NAME_LEN {
            return Err(invalid());
        }
        if trimmed
            .chars()
            .any(|c| c.is_control() || FORBIDDEN_NAME_CHARS.contains(&c))
        {
            return Err(invalid());
        }

        let account = match trimmed.split_once('\\') {
            Some((domain, account)) => {
                if domain.is_empty() || account.is_empty() || account.contains('\\') {
                    return Err(invalid());
                }
                account
            }
            None => trimmed,
        };
        // Account names cannot consist solely of periods.
        if is_dots_only(account) {
            return Err(invalid());
        }

        Ok(Self(trimmed.to_string()))
    }

    /// The full name as supplied, domain prefix included.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The account part, without any `DOMAIN\` prefix.
    pub fn account(&self) -> &str {
        self.0
            .rsplit_once('\\')
            .map_or(self.0.as_str(), |(_, account)| account)
    }
}

#[cfg(test)]
impl LoginName {
    /// Bypass validation to model names returned by a misbehaving lookup.
    pub(crate) fn new_unchecked(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl fmt::Display for LoginName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `.`, `..` and other period-only strings, which name directories
/// relative to their parent rather than an entry within it.
pub fn is_dots_only(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c == '.')
}

/// The identity supplied by the operator. Exactly one form is given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Name(LoginName),
    Sid(Sid),
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Name(name) => write!(f, "user {name}"),
            Identity::Sid(sid) => write!(f, "SID {sid}"),
        }
    }
}

/// Identity after normalisation: a SID plus a best-effort display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedIdentity {
    pub sid: Sid,
    pub name: Option<LoginName>,
}

impl ResolvedIdentity {
    /// Account name used by the naming heuristics, if one is known.
    pub fn account_name(&self) -> Option<&str> {
        self.name.as_ref().map(LoginName::account)
    }
}
