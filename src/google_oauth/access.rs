use std::collections::HashSet;

use crate::error::TrackerError;
use crate::google_oauth::endpoints::GoogleUserInfo;

/// Decides which signed-in Google identities may use the app.
pub trait AccessPolicy: Send + Sync {
    fn is_allowed(&self, email: &str) -> bool;
}

/// Simple policy built from a statically configured allow-list.
/// Addresses compare trimmed and case-insensitively.
pub struct AllowList {
    emails: HashSet<String>,
}

impl AllowList {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            emails: emails
                .into_iter()
                .map(|e| normalize(e.as_ref()))
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}

impl AccessPolicy for AllowList {
    fn is_allowed(&self, email: &str) -> bool {
        self.emails.contains(&normalize(email))
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Identity admitted through the gate.
#[derive(Debug, Clone, PartialEq)]
pub struct Admitted {
    pub email: String,
    pub name: String,
}

/// Apply the gate to a fetched profile. A valid token alone never admits.
pub fn admit(
    policy: &dyn AccessPolicy,
    profile: &GoogleUserInfo,
    fallback_email: Option<String>,
) -> Result<Admitted, TrackerError> {
    let email = profile
        .email
        .clone()
        .or(fallback_email)
        .ok_or(TrackerError::MissingEmailInUserinfo)?;

    if profile.email_verified == Some(false) || !policy.is_allowed(&email) {
        return Err(TrackerError::AccessDenied(email));
    }

    let name = profile
        .name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| email.clone());
    Ok(Admitted { email, name })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(email: &str) -> GoogleUserInfo {
        GoogleUserInfo {
            sub: Some("42".into()),
            email: Some(email.into()),
            email_verified: Some(true),
            name: Some("Site Owner".into()),
        }
    }

    #[test]
    fn allow_list_ignores_case_and_whitespace() {
        let list = AllowList::new([" Owner@Example.com ", ""]);
        assert_eq!(list.len(), 1);
        assert!(list.is_allowed("owner@example.com"));
        assert!(list.is_allowed("OWNER@EXAMPLE.COM "));
        assert!(!list.is_allowed("owner@example.org"));
    }

    #[test]
    fn unlisted_email_is_denied_even_with_valid_profile() {
        let list = AllowList::new(["owner@example.com"]);
        let err = admit(&list, &profile("intruder@example.com"), None).unwrap_err();
        assert!(matches!(err, TrackerError::AccessDenied(e) if e == "intruder@example.com"));
    }

    #[test]
    fn empty_allow_list_denies_everyone() {
        let list = AllowList::new(Vec::<String>::new());
        assert!(admit(&list, &profile("owner@example.com"), None).is_err());
    }

    #[test]
    fn unverified_email_is_denied() {
        let list = AllowList::new(["owner@example.com"]);
        let mut p = profile("owner@example.com");
        p.email_verified = Some(false);
        assert!(matches!(
            admit(&list, &p, None),
            Err(TrackerError::AccessDenied(_))
        ));
    }

    #[test]
    fn listed_email_is_admitted_with_name() {
        let list = AllowList::new(["owner@example.com"]);
        let who = admit(&list, &profile("owner@example.com"), None).unwrap();
        assert_eq!(who.name, "Site Owner");
    }

    #[test]
    fn id_token_email_is_used_when_userinfo_has_none() {
        let list = AllowList::new(["owner@example.com"]);
        let p = GoogleUserInfo::default();
        let who = admit(&list, &p, Some("owner@example.com".into())).unwrap();
        assert_eq!(who.name, "owner@example.com");
        assert!(matches!(
            admit(&list, &p, None),
            Err(TrackerError::MissingEmailInUserinfo)
        ));
    }
}
