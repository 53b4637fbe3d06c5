//! Lazy iteration over paged list endpoints
//!
//! A [`Paginator`] turns one list request into a stream of records. Pages are
//! fetched on demand, one retried executor call per page, and iteration stops
//! when the server reports no further pages or returns an empty one.

use std::sync::Arc;

use courier_domain::constants::MAX_PAGE_SIZE;
use courier_domain::{PageCursor, PagePosition, PaginationSettings, RequestSpec};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::auth::AccessTokenProvider;
use super::errors::ApiError;
use super::executor::RequestExecutor;
use super::retry::{execute_with_options, RetryOptions};

/// Records of one page plus what the server said about the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<Value>,
    pub total: Option<u64>,
    pub next_cursor: Option<String>,
}

impl Page {
    /// Pull the page out of a response body.
    ///
    /// A bare JSON array is accepted as a page without total or cursor.
    ///
    /// # Errors
    /// [`ApiError::Decode`] when the items field is missing or not an array.
    pub fn from_body(body: Value, settings: &PaginationSettings) -> Result<Self, ApiError> {
        let mut body = match body {
            Value::Array(items) => return Ok(Self { items, total: None, next_cursor: None }),
            Value::Object(map) => map,
            other => {
                return Err(ApiError::Decode(format!("expected a page object, got {other}")));
            }
        };

        let items = match body.remove(&settings.items_field) {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => {
                return Err(ApiError::Decode(format!(
                    "page is missing the '{}' array",
                    settings.items_field
                )));
            }
            Some(other) => {
                return Err(ApiError::Decode(format!(
                    "'{}' is not an array: {other}",
                    settings.items_field
                )));
            }
        };
        let total = body.get(&settings.total_field).and_then(Value::as_u64);
        let next_cursor =
            body.get(&settings.next_cursor_field).and_then(Value::as_str).map(str::to_string);

        Ok(Self { items, total, next_cursor })
    }
}

/// Streams records from list endpoints.
#[derive(Clone)]
pub struct Paginator {
    executor: Arc<RequestExecutor>,
    provider: Arc<dyn AccessTokenProvider>,
    settings: PaginationSettings,
    retry: RetryOptions,
}

struct PageState {
    cursor: PageCursor,
    base_spec: RequestSpec,
    failed: bool,
}

/// Decode a page's items in order, stopping after the first record that
/// does not fit `T`. The flag is set when a decode error was included.
fn decode_records<T: DeserializeOwned>(items: Vec<Value>) -> (Vec<Result<T, ApiError>>, bool) {
    let mut records = Vec::with_capacity(items.len());
    for item in items {
        match serde_json::from_value::<T>(item) {
            Ok(record) => records.push(Ok(record)),
            Err(e) => {
                records.push(Err(ApiError::Decode(format!("record does not match type: {e}"))));
                return (records, true);
            }
        }
    }
    (records, false)
}

impl Paginator {
    pub fn new(
        executor: Arc<RequestExecutor>,
        provider: Arc<dyn AccessTokenProvider>,
        settings: PaginationSettings,
        retry: RetryOptions,
    ) -> Self {
        Self { executor, provider, settings, retry }
    }

    pub fn settings(&self) -> &PaginationSettings {
        &self.settings
    }

    /// Lazily yield every record behind `base_spec`.
    ///
    /// The stream is finite and not restartable. The first error is yielded
    /// and ends the stream; records already yielded stay yielded.
    pub fn iterate<T>(
        &self,
        base_spec: RequestSpec,
        page_size: u32,
    ) -> BoxStream<'static, Result<T, ApiError>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            let err = ApiError::Config(format!("page_size must be between 1 and {MAX_PAGE_SIZE}"));
            return stream::once(async move { Err(err) }).boxed();
        }

        let paginator = self.clone();
        let state = PageState {
            cursor: PageCursor::start(self.settings.style, page_size),
            base_spec,
            failed: false,
        };

        stream::try_unfold(state, move |mut state| {
            let paginator = paginator.clone();
            async move {
                if state.failed || state.cursor.is_exhausted() {
                    return Ok::<_, ApiError>(None);
                }
                let page = paginator.fetch_page(&state).await?;
                let item_count = page.items.len();
                let (records, failed) = decode_records::<T>(page.items);
                state.failed = failed;

                state.cursor.advance(item_count, page.total, page.next_cursor);
                debug!(
                    page = state.cursor.pages_fetched,
                    records = item_count,
                    total_seen = state.cursor.total_seen,
                    total = ?page.total,
                    exhausted = state.cursor.is_exhausted(),
                    "Fetched page"
                );
                Ok(Some((records, state)))
            }
        })
        .map_ok(stream::iter)
        .try_flatten()
        .boxed()
    }

    async fn fetch_page(&self, state: &PageState) -> Result<Page, ApiError> {
        let spec = self.page_spec(&state.base_spec, &state.cursor);
        let response =
            execute_with_options(&self.executor, &spec, self.provider.as_ref(), &self.retry)
                .await?;
        Page::from_body(response.body, &self.settings)
    }

    fn page_spec(&self, base: &RequestSpec, cursor: &PageCursor) -> RequestSpec {
        let spec = base
            .clone()
            .with_query_param(&self.settings.limit_param, cursor.page_size.to_string());
        match &cursor.position {
            PagePosition::Offset(offset) => {
                spec.with_query_param(&self.settings.offset_param, offset.to_string())
            }
            PagePosition::Cursor(Some(token)) => {
                spec.with_query_param(&self.settings.cursor_param, token.clone())
            }
            PagePosition::Cursor(None) => spec,
        }
    }
}

#[cfg(test)]
mod tests {
    use courier_domain::{Credential, PaginationStyle};
    use serde_json::json;

    use super::*;
    use crate::api::auth::StaticCredentialProvider;
    use crate::http::HttpClient;

    fn paginator(style: PaginationStyle) -> Paginator {
        let executor =
            Arc::new(RequestExecutor::new(HttpClient::new().unwrap(), "https://api.test"));
        let provider = Arc::new(StaticCredentialProvider::new(Credential::with_lifetime("t", 60)));
        let settings = PaginationSettings { style, ..PaginationSettings::default() };
        Paginator::new(executor, provider, settings, RetryOptions::new(1, Default::default()))
    }

    #[test]
    fn page_from_body_reads_configured_fields() {
        let settings = PaginationSettings::default();
        let page = Page::from_body(
            json!({"items": [1, 2], "total": 25, "next_cursor": "abc"}),
            &settings,
        )
        .unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, Some(25));
        assert_eq!(page.next_cursor.as_deref(), Some("abc"));
    }

    #[test]
    fn page_from_body_accepts_bare_arrays() {
        let page = Page::from_body(json!([{"id": 1}]), &PaginationSettings::default()).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total, None);
    }

    #[test]
    fn page_from_body_rejects_missing_items() {
        let err = Page::from_body(json!({"data": []}), &PaginationSettings::default());
        assert!(matches!(err, Err(ApiError::Decode(_))));
        let err = Page::from_body(json!({"items": 3}), &PaginationSettings::default());
        assert!(matches!(err, Err(ApiError::Decode(_))));
    }

    #[test]
    fn page_spec_sets_offset_and_limit() {
        let paginator = paginator(PaginationStyle::Offset);
        let mut cursor = PageCursor::start(PaginationStyle::Offset, 10);
        cursor.advance(10, Some(25), None);

        let spec = paginator.page_spec(&RequestSpec::get("/items").query("q", "x"), &cursor);
        assert_eq!(
            spec.query,
            vec![
                ("q".to_string(), "x".to_string()),
                ("limit".to_string(), "10".to_string()),
                ("offset".to_string(), "10".to_string()),
            ]
        );
    }

    #[test]
    fn page_spec_omits_cursor_on_first_page() {
        let paginator = paginator(PaginationStyle::Cursor);
        let cursor = PageCursor::start(PaginationStyle::Cursor, 5);
        let spec = paginator.page_spec(&RequestSpec::get("/items"), &cursor);
        assert_eq!(spec.query, vec![("limit".to_string(), "5".to_string())]);
    }

    #[derive(Debug, serde::Deserialize, PartialEq)]
    struct Record {
        id: u64,
    }

    /// Validates records before a bad one survive its decode error.
    ///
    /// Assertions:
    /// - Confirms the two valid records come first, in order.
    /// - Confirms the bad record is a `Decode` error and ends the page.
    #[test]
    fn decode_records_keeps_records_before_first_failure() {
        let items =
            vec![json!({"id": 1}), json!({"id": 2}), json!({"name": "x"}), json!({"id": 4})];

        let (records, failed) = decode_records::<Record>(items);

        assert!(failed);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].as_ref().ok(), Some(&Record { id: 1 }));
        assert_eq!(records[1].as_ref().ok(), Some(&Record { id: 2 }));
        assert!(matches!(records[2], Err(ApiError::Decode(_))));
    }

    #[tokio::test]
    async fn zero_page_size_yields_single_config_error() {
        let paginator = paginator(PaginationStyle::Offset);
        let results: Vec<Result<Value, ApiError>> =
            paginator.iterate(RequestSpec::get("/items"), 0).collect().await;
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(ApiError::Config(_))));
    }
}
