//! One query run: validate, chain history, persist, generate.

use crate::config::Config;
use crate::error::{Result, Severity, TaiError};
use crate::history::{self, HistoryStore};
use crate::llm::TextGenerator;
use tracing::{debug, warn};

/// A query as given on the command line.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub text: String,
    /// Prepend the previous query to this one.
    pub chain_history: bool,
}

impl QueryRequest {
    /// Reject an empty query.
    pub fn validate(&self) -> Result<()> {
        if self.text.is_empty() {
            return Err(TaiError::EmptyQuery);
        }
        Ok(())
    }
}

pub struct QueryRunner<G> {
    history: HistoryStore,
    generator: G,
}

impl<G: TextGenerator> QueryRunner<G> {
    pub fn new(history: HistoryStore, generator: G) -> Self {
        Self { history, generator }
    }

    /// Run one query and return the response fragments.
    ///
    /// The final prompt is stored as the last query before the generator is
    /// called; if it cannot be stored nothing is sent.
    pub async fn run(&self, request: &QueryRequest, config: &Config) -> Result<Vec<String>> {
        request.validate()?;

        let prompt = if request.chain_history {
            match self.previous_query() {
                Some(previous) => history::chain(&previous, &request.text),
                None => request.text.clone(),
            }
        } else {
            request.text.clone()
        };

        self.history.save_last_query(&prompt)?;

        if config.key.is_empty() {
            warn!("No API key configured; the request will likely be rejected");
        }
        debug!(
            "Querying {} with a {} byte prompt",
            self.generator.model(),
            prompt.len()
        );

        self.generator
            .generate(&config.key, &prompt)
            .await
            .map_err(TaiError::Generation)
    }

    /// The stored previous query. Read failures count as "no history".
    fn previous_query(&self) -> Option<String> {
        match self.history.last_query() {
            Ok(previous) => previous,
            Err(e) => {
                debug_assert_eq!(e.severity(), Severity::BestEffort);
                warn!("{}; continuing without history", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoragePath;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records every call; answers with a fixed reply or error.
    #[derive(Default)]
    struct StubGenerator {
        calls: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    impl StubGenerator {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn prompts(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(_, prompt)| prompt.clone())
                .collect()
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TextGenerator for StubGenerator {
        fn model(&self) -> &str {
            "stub"
        }

        async fn generate(&self, api_key: &str, prompt: &str) -> anyhow::Result<Vec<String>> {
            self.calls
                .lock()
                .unwrap()
                .push((api_key.to_string(), prompt.to_string()));
            if self.fail {
                anyhow::bail!("401 Unauthorized");
            }
            Ok(vec!["answer".to_string(), "more".to_string()])
        }
    }

    fn config() -> Config {
        Config {
            username: "alice".to_string(),
            key: "XYZ".to_string(),
        }
    }

    fn request(text: &str, chain_history: bool) -> QueryRequest {
        QueryRequest {
            text: text.to_string(),
            chain_history,
        }
    }

    fn runner(tmp: &TempDir, stub: StubGenerator) -> QueryRunner<StubGenerator> {
        QueryRunner::new(HistoryStore::new(StoragePath::new(tmp.path())), stub)
    }

    fn last_query(tmp: &TempDir) -> String {
        std::fs::read_to_string(tmp.path().join("lastquery.txt")).unwrap()
    }

    #[tokio::test]
    async fn test_returns_fragments_and_stores_query() {
        let tmp = TempDir::new().unwrap();
        let runner = runner(&tmp, StubGenerator::default());

        let fragments = runner
            .run(&request("what is a lifetime?", false), &config())
            .await
            .unwrap();

        assert_eq!(fragments, vec!["answer", "more"]);
        assert_eq!(last_query(&tmp), "what is a lifetime?");
        assert_eq!(
            runner.generator.calls.lock().unwrap()[0],
            ("XYZ".to_string(), "what is a lifetime?".to_string())
        );
    }

    #[tokio::test]
    async fn test_empty_query_never_calls_generator() {
        let tmp = TempDir::new().unwrap();
        let runner = runner(&tmp, StubGenerator::default());

        let err = runner.run(&request("", true), &config()).await.unwrap_err();

        assert!(matches!(err, TaiError::EmptyQuery));
        assert_eq!(runner.generator.call_count(), 0);
        assert!(!tmp.path().join("lastquery.txt").exists());
    }

    #[tokio::test]
    async fn test_whitespace_query_is_sent_as_is() {
        let tmp = TempDir::new().unwrap();
        let runner = runner(&tmp, StubGenerator::default());

        runner.run(&request("   \n", false), &config()).await.unwrap();

        assert_eq!(runner.generator.prompts(), vec!["   \n"]);
        assert_eq!(last_query(&tmp), "   \n");
    }

    #[tokio::test]
    async fn test_chaining_prepends_previous_query() {
        let tmp = TempDir::new().unwrap();
        let runner = runner(&tmp, StubGenerator::default());

        runner.run(&request("q1", false), &config()).await.unwrap();
        runner.run(&request("q2", true), &config()).await.unwrap();

        assert_eq!(runner.generator.prompts(), vec!["q1", "q1\nq2"]);
        assert_eq!(last_query(&tmp), "q1\nq2");
    }

    #[tokio::test]
    async fn test_chaining_on_first_run_sends_query_unchanged() {
        let tmp = TempDir::new().unwrap();
        let runner = runner(&tmp, StubGenerator::default());

        runner
            .run(&request("hello", true), &config())
            .await
            .unwrap();

        assert_eq!(runner.generator.prompts(), vec!["hello"]);
    }

    #[tokio::test]
    async fn test_without_chaining_history_is_overwritten() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("lastquery.txt"), "old").unwrap();
        let runner = runner(&tmp, StubGenerator::default());

        runner
            .run(&request("new", false), &config())
            .await
            .unwrap();

        assert_eq!(runner.generator.prompts(), vec!["new"]);
        assert_eq!(last_query(&tmp), "new");
    }

    #[test]
    fn test_unreadable_history_counts_as_none() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("lastquery.txt")).unwrap();
        let runner = runner(&tmp, StubGenerator::default());

        assert_eq!(runner.previous_query(), None);
    }

    #[tokio::test]
    async fn test_history_write_failure_aborts_before_generation() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("lastquery.txt")).unwrap();
        std::fs::write(tmp.path().join("lastquery.txt").join("x"), "").unwrap();
        let runner = runner(&tmp, StubGenerator::default());

        let err = runner
            .run(&request("hello", false), &config())
            .await
            .unwrap_err();

        assert!(matches!(err, TaiError::HistoryWrite { .. }));
        assert_eq!(runner.generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_generation_failure_is_fatal_but_query_is_kept() {
        let tmp = TempDir::new().unwrap();
        let runner = runner(&tmp, StubGenerator::failing());

        let err = runner
            .run(&request("hello", false), &config())
            .await
            .unwrap_err();

        assert_eq!(err.severity(), Severity::Fatal);
        assert_eq!(runner.generator.call_count(), 1);
        assert_eq!(last_query(&tmp), "hello");
    }
}
