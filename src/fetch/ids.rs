// src/fetch/ids.rs

use anyhow::Result;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{info, instrument, warn};

use super::client::TableStore;
use crate::process::utils::clean_str;

/// Document ids already stored remotely, taken once at the start of a run.
#[derive(Clone, Debug, Default)]
pub struct ExistingIds {
    pub ids: HashSet<String>,
    pub pages: usize,
    /// False when paging stopped early on a failed page.
    pub complete: bool,
}

/// The very first id page failed, so there is no snapshot at all.
#[derive(Debug, thiserror::Error)]
#[error("could not fetch any existing document ids: {0:#}")]
pub struct IdentifierFetchError(pub anyhow::Error);

/// Pull an id out of a stored cell: either a plain scalar or a list of
/// text runs, of which the first run's `text` is used.
pub fn extract_id(value: &Value) -> Option<String> {
    let inner = match value {
        Value::Array(runs) => runs.first()?,
        other => other,
    };
    let raw = match inner {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Object(obj) => obj.get("text")?.as_str()?.to_string(),
        _ => return None,
    };
    let id = clean_str(&raw);
    (!id.is_empty()).then_some(id)
}

/// Page through every stored document id.
///
/// A failed page after the first ends paging and keeps what was collected;
/// the result is then flagged incomplete. Records missing from a partial
/// snapshot will be treated as new and may be inserted twice.
#[instrument(level = "info", skip(store))]
pub async fn fetch_existing_ids<S: TableStore>(store: &S, page_size: usize) -> Result<ExistingIds> {
    let mut out = ExistingIds::default();
    let mut page_token: Option<String> = None;

    loop {
        let page = match store.search_ids_page(page_token.as_deref(), page_size).await {
            Ok(page) => page,
            Err(e) if out.pages == 0 => return Err(IdentifierFetchError(e).into()),
            Err(e) => {
                warn!(
                    pages = out.pages,
                    collected = out.ids.len(),
                    error = %format!("{:#}", e),
                    "id page failed, continuing with a partial snapshot"
                );
                return Ok(out);
            }
        };
        out.pages += 1;
        out.ids.extend(page.ids);

        if !page.has_more {
            out.complete = true;
            break;
        }
        match page.page_token {
            Some(next) if page_token.as_deref() != Some(next.as_str()) => page_token = Some(next),
            _ => {
                warn!(pages = out.pages, "has_more without a new page token, stopping");
                return Ok(out);
            }
        }
    }

    info!(count = out.ids.len(), pages = out.pages, "existing ids fetched");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::client::IdPage;
    use crate::process::NormalizedRecord;
    use anyhow::anyhow;
    use serde_json::json;
    use std::sync::Mutex;

    /// Serves scripted pages and records the tokens it was asked for.
    struct ScriptedPages {
        pages: Mutex<Vec<Result<IdPage>>>,
        seen_tokens: Mutex<Vec<Option<String>>>,
    }

    impl ScriptedPages {
        fn new(pages: Vec<Result<IdPage>>) -> Self {
            Self {
                pages: Mutex::new(pages.into_iter().rev().collect()),
                seen_tokens: Mutex::new(Vec::new()),
            }
        }
    }

    impl TableStore for ScriptedPages {
        async fn search_ids_page(&self, page_token: Option<&str>, _: usize) -> Result<IdPage> {
            self.seen_tokens
                .lock()
                .unwrap()
                .push(page_token.map(str::to_string));
            self.pages
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(anyhow!("script exhausted")))
        }

        async fn batch_create(&self, _: &[NormalizedRecord]) -> Result<usize> {
            unreachable!()
        }
    }

    fn page(prefix: &str, n: usize, next: Option<&str>) -> Result<IdPage> {
        Ok(IdPage {
            ids: (0..n).map(|i| format!("{}{}", prefix, i)).collect(),
            has_more: next.is_some(),
            page_token: next.map(str::to_string),
        })
    }

    #[test]
    fn extracts_from_runs_and_scalars() {
        assert_eq!(extract_id(&json!([{"text": " \"A1\"", "type": "text"}])), Some("A1".into()));
        assert_eq!(extract_id(&json!("  B2 ")), Some("B2".into()));
        assert_eq!(extract_id(&json!(12345)), Some("12345".into()));
        assert_eq!(extract_id(&json!({"text": "C3"})), Some("C3".into()));
        assert_eq!(extract_id(&json!([])), None);
        assert_eq!(extract_id(&json!([{"text": "\"\""}])), None);
        assert_eq!(extract_id(&Value::Null), None);
    }

    #[tokio::test]
    async fn follows_page_tokens_to_the_end() -> Result<()> {
        let store = ScriptedPages::new(vec![
            page("a", 500, Some("t1")),
            page("b", 500, Some("t2")),
            page("c", 20, None),
        ]);
        let got = fetch_existing_ids(&store, 500).await?;

        assert_eq!(got.ids.len(), 1020);
        assert_eq!(got.pages, 3);
        assert!(got.complete);
        assert_eq!(
            *store.seen_tokens.lock().unwrap(),
            vec![None, Some("t1".to_string()), Some("t2".to_string())]
        );
        Ok(())
    }

    #[tokio::test]
    async fn later_page_failure_keeps_partial_snapshot() -> Result<()> {
        let store = ScriptedPages::new(vec![
            page("a", 500, Some("t1")),
            Err(anyhow!("operation timed out")),
        ]);
        let got = fetch_existing_ids(&store, 500).await?;

        assert_eq!(got.ids.len(), 500);
        assert!(got.ids.contains("a499"));
        assert!(!got.complete);
        Ok(())
    }

    #[tokio::test]
    async fn first_page_failure_aborts() {
        let store = ScriptedPages::new(vec![Err(anyhow!("connection refused"))]);
        let err = fetch_existing_ids(&store, 500).await.unwrap_err();
        assert!(err.downcast_ref::<IdentifierFetchError>().is_some());
    }

    #[tokio::test]
    async fn repeated_token_stops_paging() -> Result<()> {
        let store = ScriptedPages::new(vec![page("a", 3, Some("t1")), page("b", 3, Some("t1"))]);
        let got = fetch_existing_ids(&store, 500).await?;
        assert_eq!(got.pages, 2);
        assert_eq!(got.ids.len(), 6);
        assert!(!got.complete);
        Ok(())
    }
}
