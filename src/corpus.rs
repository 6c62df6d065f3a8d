//! Corpus lifecycle helpers.
//!
//! The list endpoint's filter matches on "contains", so a filter of `docs`
//! also returns `my docs (old)`. Everything here narrows the listing to
//! corpora whose name matches exactly before acting on it.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::models::{Corpus, CreateCorpusRequest};
use crate::traits::CorpusStore;

pub struct CorpusManager {
    store: Arc<dyn CorpusStore>,
}

impl CorpusManager {
    pub fn new(store: Arc<dyn CorpusStore>) -> Self {
        Self { store }
    }

    /// All corpora named exactly `name`. Zero, one, or several.
    pub async fn find_corpora_by_name(&self, name: &str) -> Result<Vec<Corpus>> {
        let candidates = self.store.list(name).await?;
        Ok(candidates
            .into_iter()
            .filter(|c| c.name.as_deref() == Some(name))
            .collect())
    }

    /// The single corpus named `name`.
    ///
    /// Several matches is always an error. No match is an error when
    /// `fail_if_not_exist` is set, otherwise `Ok(None)`.
    pub async fn find_corpus_by_name(
        &self,
        name: &str,
        fail_if_not_exist: bool,
    ) -> Result<Option<Corpus>> {
        let mut found = self.find_corpora_by_name(name).await?;
        if found.len() > 1 {
            return Err(Error::InvariantViolation(format!(
                "found {} corpora named [{}]",
                found.len(),
                name
            )));
        }
        match found.pop() {
            Some(corpus) => {
                info!("corpus [{}] has key [{}]", name, corpus.key);
                Ok(Some(corpus))
            }
            None if fail_if_not_exist => {
                Err(Error::NotFound(format!("no corpus named [{}]", name)))
            }
            None => {
                info!("no corpus named [{}]", name);
                Ok(None)
            }
        }
    }

    /// Delete every corpus named exactly `name`. Returns whether any was.
    pub async fn delete_corpus_by_name(&self, name: &str) -> Result<bool> {
        let matches = self.find_corpora_by_name(name).await?;
        info!("deleting {} corpora named [{}]", matches.len(), name);
        for corpus in &matches {
            if corpus.key.is_empty() {
                return Err(Error::InvariantViolation(format!(
                    "corpus named [{}] was listed without a key",
                    name
                )));
            }
            self.store.delete(&corpus.key).await?;
            info!("deleted corpus [{}]", corpus.key);
        }
        Ok(!matches.is_empty())
    }

    /// Create a corpus after checking for existing ones with the same name.
    ///
    /// With `delete_existing`, same-named corpora are removed first. Otherwise
    /// `unique` turns a name clash into [`Error::AlreadyExists`]; without it
    /// the duplicate is created with a warning.
    pub async fn create_corpus(
        &self,
        request: &CreateCorpusRequest,
        delete_existing: bool,
        unique: bool,
    ) -> Result<Corpus> {
        let name = request
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| Error::InvalidArgument("a corpus name is required".to_string()))?;

        let existing = self.find_corpora_by_name(name).await?;
        if !existing.is_empty() {
            if delete_existing {
                self.delete_corpus_by_name(name).await?;
            } else if unique {
                return Err(Error::AlreadyExists(format!(
                    "corpus named [{}]; set delete_existing to replace it",
                    name
                )));
            } else {
                warn!("creating a second corpus named [{}]", name);
            }
        }

        info!("creating corpus [{}]", name);
        self.store.create(request).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Corpus store whose list filter is a substring match, like the API.
    #[derive(Default)]
    pub(crate) struct FakeCorpusStore {
        pub corpora: Mutex<Vec<Corpus>>,
        pub deleted: Mutex<Vec<String>>,
    }

    impl FakeCorpusStore {
        pub(crate) fn with(names: &[(&str, &str)]) -> Self {
            let store = Self::default();
            for (name, key) in names {
                store.corpora.lock().unwrap().push(corpus(name, key));
            }
            store
        }
    }

    fn corpus(name: &str, key: &str) -> Corpus {
        Corpus {
            key: key.into(),
            name: Some(name.into()),
            ..Default::default()
        }
    }

    #[async_trait]
    impl CorpusStore for FakeCorpusStore {
        async fn list(&self, filter: &str) -> Result<Vec<Corpus>> {
            Ok(self
                .corpora
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.name.as_deref().unwrap_or("").contains(filter) || c.key.contains(filter))
                .cloned()
                .collect())
        }

        async fn get(&self, corpus_key: &str) -> Result<Corpus> {
            self.corpora
                .lock()
                .unwrap()
                .iter()
                .find(|c| c.key == corpus_key)
                .cloned()
                .ok_or_else(|| Error::NotFound(corpus_key.into()))
        }

        async fn create(&self, request: &CreateCorpusRequest) -> Result<Corpus> {
            let created = corpus(
                request.name.as_deref().unwrap_or_default(),
                request.key.as_deref().unwrap_or_default(),
            );
            self.corpora.lock().unwrap().push(created.clone());
            Ok(created)
        }

        async fn delete(&self, corpus_key: &str) -> Result<()> {
            self.corpora.lock().unwrap().retain(|c| c.key != corpus_key);
            self.deleted.lock().unwrap().push(corpus_key.into());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_find_by_name_is_exact() {
        let store = Arc::new(FakeCorpusStore::with(&[
            ("docs", "docs_1"),
            ("docs (old)", "docs_0"),
            ("my docs", "docs_2"),
        ]));
        let manager = CorpusManager::new(store);

        let found = manager.find_corpora_by_name("docs").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].key, "docs_1");

        let single = manager.find_corpus_by_name("docs", true).await.unwrap().unwrap();
        assert_eq!(single.key, "docs_1");
    }

    #[tokio::test]
    async fn test_find_single_missing_and_duplicate() {
        let store = Arc::new(FakeCorpusStore::with(&[("dup", "a"), ("dup", "b")]));
        let manager = CorpusManager::new(store);

        assert!(manager.find_corpus_by_name("none", false).await.unwrap().is_none());
        assert!(matches!(
            manager.find_corpus_by_name("none", true).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            manager.find_corpus_by_name("dup", false).await,
            Err(Error::InvariantViolation(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_by_name_only_exact_matches() {
        let store = Arc::new(FakeCorpusStore::with(&[
            ("verified-corpus", "v1"),
            ("verified-corpus-2", "v2"),
        ]));
        let manager = CorpusManager::new(store.clone());

        assert!(manager.delete_corpus_by_name("verified-corpus").await.unwrap());
        assert_eq!(*store.deleted.lock().unwrap(), vec!["v1".to_string()]);
        assert!(!manager.delete_corpus_by_name("verified-corpus").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_unique_rejects_existing() {
        let store = Arc::new(FakeCorpusStore::with(&[("docs", "docs_1")]));
        let manager = CorpusManager::new(store.clone());

        let request = CreateCorpusRequest::new("docs", "docs_2");
        let err = manager.create_corpus(&request, false, true).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));

        manager.create_corpus(&request, false, false).await.unwrap();
        assert_eq!(store.corpora.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_create_delete_existing_replaces() {
        let store = Arc::new(FakeCorpusStore::with(&[("docs", "docs_1")]));
        let manager = CorpusManager::new(store.clone());

        let created = manager
            .create_corpus(&CreateCorpusRequest::new("docs", "docs_2"), true, true)
            .await
            .unwrap();
        assert_eq!(created.key, "docs_2");
        let keys: Vec<String> = store.corpora.lock().unwrap().iter().map(|c| c.key.clone()).collect();
        assert_eq!(keys, vec!["docs_2".to_string()]);
    }

    #[tokio::test]
    async fn test_create_requires_name() {
        let manager = CorpusManager::new(Arc::new(FakeCorpusStore::default()));
        let err = manager
            .create_corpus(&CreateCorpusRequest::default(), false, true)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
