//! Names for throwaway "lab" corpora.
//!
//! Lab corpora get a username prefix so that repeated demo runs by different
//! people do not collide, and so one person's labs can be found with a single
//! substring filter:
//!
//! ```text
//! name "filter-attributes", key "101-filter-attr", user "david@vectara.com"
//!   → name "david - filter-attributes", key "david_101-filter-attr"
//! ```

use std::sync::Arc;

use tracing::info;

use crate::corpus::CorpusManager;
use crate::error::{Error, Result};
use crate::models::{Corpus, CreateCorpusRequest};

pub const MAX_CORPUS_KEY: usize = 50;
pub const MAX_USERNAME_LENGTH: usize = 20;

/// Environment variable the username is read from when not given.
pub const USERNAME_ENV: &str = "USERNAME";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabCorpusName {
    pub name: String,
    pub key: String,
}

/// Replace every run of characters outside `[0-9a-zA-Z]` with one `_`.
fn collapse_non_alnum(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_run = false;
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }
    out
}

/// `what_a-very` → `whatAVery`.
///
/// Words are split on `_` and `-`. Within a word a letter is uppercased when
/// the character before it is not a letter and lowercased otherwise, so
/// `user2name` becomes `user2Name`.
fn camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_is_letter = false;
    for c in s.chars() {
        if c == '_' || c == '-' {
            prev_is_letter = false;
            continue;
        }
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }

    let mut chars = out.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => out,
    }
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Read the username from [`USERNAME_ENV`].
pub fn discover_user() -> Result<String> {
    std::env::var(USERNAME_ENV)
        .ok()
        .filter(|u| !u.is_empty())
        .ok_or_else(|| {
            Error::InvalidArgument(format!(
                "no username given and {} is not set",
                USERNAME_ENV
            ))
        })
}

/// Turn a raw username (often an email address) into the prefix component.
pub fn username_prefix(username: &str) -> Result<String> {
    let local = username.split('@').next().unwrap_or_default();
    let mut collapsed = collapse_non_alnum(local);
    if collapsed.ends_with('_') {
        collapsed = truncate(&collapsed, MAX_USERNAME_LENGTH - 1);
    }
    let prefix = truncate(&camel_case(&collapsed), MAX_USERNAME_LENGTH);
    if prefix.is_empty() {
        return Err(Error::InvalidArgument(format!(
            "username [{}] has no usable characters",
            username
        )));
    }
    Ok(prefix)
}

/// Derive the lab corpus name and key.
///
/// When `key` is absent it is derived from `name`. With `user_prefix` the
/// username comes from `username` or, failing that, the environment.
pub fn lab_names(
    name: &str,
    key: Option<&str>,
    user_prefix: bool,
    username: Option<&str>,
) -> Result<LabCorpusName> {
    if name.is_empty() {
        return Err(Error::InvalidArgument(
            "a lab corpus needs a name".to_string(),
        ));
    }
    let key = match key.filter(|k| !k.is_empty()) {
        Some(k) => k.to_string(),
        None => collapse_non_alnum(name).to_lowercase(),
    };

    if !user_prefix {
        return Ok(LabCorpusName {
            name: name.to_string(),
            key,
        });
    }

    let username = match username {
        Some(u) => u.to_string(),
        None => discover_user()?,
    };
    let prefix = username_prefix(&username)?;
    info!("lab username [{}] -> [{}]", username, prefix);

    Ok(LabCorpusName {
        name: format!("{} - {}", prefix, name),
        key: format!("{}_{}", prefix, truncate(&key, MAX_CORPUS_KEY)),
    })
}

/// Creates lab corpora, replacing any earlier one with the same name.
pub struct LabHelper {
    corpus_manager: Arc<CorpusManager>,
}

impl LabHelper {
    pub fn new(corpus_manager: Arc<CorpusManager>) -> Self {
        Self { corpus_manager }
    }

    pub async fn create_lab_corpus(
        &self,
        request: &CreateCorpusRequest,
        user_prefix: bool,
        username: Option<&str>,
    ) -> Result<Corpus> {
        let name = request.name.as_deref().unwrap_or_default();
        let names = lab_names(name, request.key.as_deref(), user_prefix, username)?;
        info!("lab corpus name [{}], key [{}]", names.name, names.key);

        let mut lab = request.clone();
        lab.name = Some(names.name);
        lab.key = Some(names.key);
        self.corpus_manager.create_corpus(&lab, true, true).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::tests::FakeCorpusStore;

    #[test]
    fn test_lab_names_with_email() {
        let names = lab_names(
            "filter-attributes",
            Some("101-filter-attr"),
            true,
            Some("david@vectara.com"),
        )
        .unwrap();
        assert_eq!(names.name, "david - filter-attributes");
        assert_eq!(names.key, "david_101-filter-attr");
    }

    #[test]
    fn test_username_with_dot() {
        let names = lab_names(
            "filter-attributes",
            Some("101-filter-attr"),
            true,
            Some("howward.smith@vectara.com"),
        )
        .unwrap();
        assert_eq!(names.name, "howwardSmith - filter-attributes");
        assert_eq!(names.key, "howwardSmith_101-filter-attr");
    }

    #[test]
    fn test_long_username_truncated() {
        let prefix =
            username_prefix("what.a.very.long.username.too.long.some.would.say@vectara.com").unwrap();
        assert_eq!(prefix, "whatAVeryLongUsernam");
    }

    #[test]
    fn test_trailing_separator_username() {
        assert_eq!(username_prefix("jo-@vectara.com").unwrap(), "jo");
    }

    #[test]
    fn test_camel_case_digits() {
        assert_eq!(camel_case("user2name"), "user2Name");
        assert_eq!(camel_case("ALICE_bob"), "aliceBob");
    }

    #[test]
    fn test_key_derived_from_name() {
        let names = lab_names("My Lab: Test", None, false, None).unwrap();
        assert_eq!(names.name, "My Lab: Test");
        assert_eq!(names.key, "my_lab_test");
    }

    #[test]
    fn test_key_truncated_to_bound() {
        let long_key = "k".repeat(80);
        let names = lab_names("n", Some(&long_key), true, Some("david")).unwrap();
        assert_eq!(names.key, format!("david_{}", "k".repeat(MAX_CORPUS_KEY)));
    }

    #[test]
    fn test_no_prefix_passthrough() {
        let names = lab_names("filter-attributes", Some("101-filter-attr"), false, None).unwrap();
        assert_eq!(
            names,
            LabCorpusName {
                name: "filter-attributes".into(),
                key: "101-filter-attr".into()
            }
        );
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(matches!(
            lab_names("", None, false, None),
            Err(Error::InvalidArgument(_))
        ));
        assert!(username_prefix("@vectara.com").is_err());
    }

    #[tokio::test]
    async fn test_create_lab_corpus_replaces_existing() {
        let store = Arc::new(FakeCorpusStore::with(&[(
            "david - filter-attributes",
            "david_old",
        )]));
        let helper = LabHelper::new(Arc::new(CorpusManager::new(store.clone())));

        let request = CreateCorpusRequest::new("filter-attributes", "101-filter-attr");
        let created = helper
            .create_lab_corpus(&request, true, Some("david@vectara.com"))
            .await
            .unwrap();

        assert_eq!(created.key, "david_101-filter-attr");
        assert_eq!(created.name.as_deref(), Some("david - filter-attributes"));
        assert_eq!(*store.deleted.lock().unwrap(), vec!["david_old".to_string()]);
    }
}
