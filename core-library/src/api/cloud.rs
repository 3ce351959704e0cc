//! Cloud API client: topics and stream resources.

use bridge_traits::http::{HttpClient, HttpRequest};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::client::{TopicClient, TopicPages};
use crate::error::{LibraryError, Result};
use crate::models::{json_array, json_opt_string, Topic};
use crate::resource::{self, Resource};

/// One page of the topics listing.
struct TopicPage {
    topics: Vec<Topic>,
    continuation: Option<String>,
}

/// Client for the cloud API.
///
/// Topics are paged with a `continuation` token: a response that is a bare
/// array, or an object without `continuation`, is the last page.
#[derive(Clone)]
pub struct CloudApiClient {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    access_token: Option<String>,
}

impl CloudApiClient {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        base_url: impl Into<String>,
        access_token: Option<String>,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token,
        }
    }

    fn request(&self, path: &str) -> HttpRequest {
        let request = HttpRequest::get(format!("{}{}", self.base_url, path));
        match &self.access_token {
            Some(token) => request.bearer_token(token.clone()),
            None => request,
        }
    }

    async fn fetch_topic_page(&self, continuation: Option<String>) -> Result<TopicPage> {
        let mut request = self.request("/v3/topics");
        if let Some(token) = continuation {
            request = request.query("continuation", token);
        }

        let json = super::get_json(self.http_client.as_ref(), request).await?;
        let page = match &json {
            Value::Array(items) => TopicPage {
                topics: items.iter().map(Topic::from_json).collect(),
                continuation: None,
            },
            _ => TopicPage {
                topics: json_array(&json, "items").iter().map(Topic::from_json).collect(),
                continuation: json_opt_string(&json, "continuation"),
            },
        };
        debug!(
            count = page.topics.len(),
            has_more = page.continuation.is_some(),
            "Fetched topic page"
        );
        Ok(page)
    }

    /// Resources attached to a stream, decoded leniently.
    #[instrument(skip(self), fields(stream_id = %stream_id))]
    pub async fn fetch_resources(&self, stream_id: &str) -> Result<Vec<Resource>> {
        if stream_id.is_empty() {
            return Err(LibraryError::InvalidInput {
                field: "stream_id".to_string(),
                message: "Stream id cannot be empty".to_string(),
            });
        }
        let path = format!("/v3/resources/{}", urlencoding::encode(stream_id));
        let json = super::get_json(self.http_client.as_ref(), self.request(&path)).await?;
        let resources = resource::decode_all(&json);
        info!("Fetched {} resources", resources.len());
        Ok(resources)
    }
}

impl TopicClient for CloudApiClient {
    fn fetch_topics(&self) -> TopicPages {
        let client = self.clone();
        // State: `Some(continuation)` while another page is due.
        stream::try_unfold(Some(None), move |state: Option<Option<String>>| {
            let client = client.clone();
            async move {
                let Some(continuation) = state else {
                    return Ok(None);
                };
                let page = client.fetch_topic_page(continuation).await?;
                Ok::<_, LibraryError>(Some((page.topics, page.continuation.map(Some))))
            }
        })
        .boxed()
    }
}

impl fmt::Debug for CloudApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudApiClient")
            .field("base_url", &self.base_url)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceType;
    use async_trait::async_trait;
    use bridge_traits::error::BridgeError;
    use bridge_traits::http::HttpResponse;
    use bytes::Bytes;
    use futures::TryStreamExt;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> bridge_traits::error::Result<HttpResponse>;
        }
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn client(mock_http: MockHttpClient) -> CloudApiClient {
        CloudApiClient::new(Arc::new(mock_http), "https://cloud.example.com/", Some("secret".to_string()))
    }

    #[tokio::test]
    async fn test_fetch_topics_single_page() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .withf(|request| {
                request.url == "https://cloud.example.com/v3/topics"
                    && request.headers.get("Authorization").map(String::as_str) == Some("Bearer secret")
            })
            .times(1)
            .returning(|_| Ok(response(200, r#"[{"id":"topic/rock","label":"Rock"},{"id":"topic/jazz","label":"Jazz"}]"#)));

        let pages: Vec<Vec<Topic>> = client(mock_http).fetch_topics().try_collect().await.unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0][1].label, "Jazz");
    }

    #[tokio::test]
    async fn test_fetch_topics_follows_continuation() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(2)
            .returning(|request| {
                if request.query.is_empty() {
                    Ok(response(200, r#"{"items":[{"id":"t1","label":"One"}],"continuation":"c1"}"#))
                } else {
                    assert_eq!(request.query, vec![("continuation".to_string(), "c1".to_string())]);
                    Ok(response(200, r#"{"items":[{"id":"t2","label":"Two"}]}"#))
                }
            });

        let pages: Vec<Vec<Topic>> = client(mock_http).fetch_topics().try_collect().await.unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0][0].id, "t1");
        assert_eq!(pages[1][0].id, "t2");
    }

    #[tokio::test]
    async fn test_fetch_topics_error_ends_stream() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(response(503, "unavailable")));

        let mut pages = client(mock_http).fetch_topics();
        let first = pages.next().await.unwrap();
        assert!(matches!(
            first,
            Err(LibraryError::Bridge(BridgeError::HttpStatus { status: 503, .. }))
        ));
        assert!(pages.next().await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_topics_is_lazy() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(0);
        let _pages = client(mock_http).fetch_topics();
    }

    #[tokio::test]
    async fn test_fetch_topics_invalid_json() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .returning(|_| Ok(response(200, "<html>")));

        let result: Result<Vec<Vec<Topic>>> = client(mock_http).fetch_topics().try_collect().await;
        assert!(matches!(result, Err(LibraryError::Decode(_))));
    }

    #[tokio::test]
    async fn test_fetch_resources_encodes_stream_id() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .withf(|request| {
                request.url == "https://cloud.example.com/v3/resources/topic%2Frock"
            })
            .times(1)
            .returning(|_| {
                Ok(response(
                    200,
                    r#"[
                        {"resource_id":"r1","resource_type":"mix","item_type":"topic","item":{"id":"topic/rock","label":"Rock"}},
                        {"resource_id":"r2","resource_type":"banner"}
                    ]"#,
                ))
            });

        let resources = client(mock_http).fetch_resources("topic/rock").await.unwrap();
        assert_eq!(resources.len(), 2);
        assert_eq!(resources[0].resource_type, ResourceType::Mix);
        assert!(resources[0].item.is_some());
        assert_eq!(resources[1].resource_type, ResourceType::Custom);
    }

    #[tokio::test]
    async fn test_fetch_resources_rejects_empty_stream_id() {
        let result = client(MockHttpClient::new()).fetch_resources("").await;
        assert!(matches!(result, Err(LibraryError::InvalidInput { .. })));
    }

    #[test]
    fn test_debug_redacts_token() {
        let rendered = format!("{:?}", client(MockHttpClient::new()));
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("https://cloud.example.com"));
    }
}
