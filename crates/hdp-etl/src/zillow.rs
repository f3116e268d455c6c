//! Paginated listings fetcher
//!
//! Drives the retrying fetcher across sequential result pages of the
//! polygon-bounded listings API. Pagination ends at the first empty page
//! (end of data, not an error) or at the page cap. A page that still fails
//! after retries ends the loop early and whatever was accumulated is
//! returned; partial results are acceptable.

use std::time::Duration;

use hdp_common::{HdpError, Result};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::config::{ListingFilters, Polygon};
use crate::records::Listing;
use crate::retry::{with_retry, RetryPolicy};

/// Listing status category understood by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusType {
    ForSale,
    ForRent,
}

impl StatusType {
    /// Value of the `status_type` query parameter.
    pub fn as_api_value(&self) -> &'static str {
        match self {
            StatusType::ForSale => "ForSale",
            StatusType::ForRent => "ForRent",
        }
    }
}

impl std::fmt::Display for StatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_api_value())
    }
}

/// One page of the listings API response; records live under `props`.
#[derive(Debug, Deserialize)]
struct PageResponse {
    #[serde(default)]
    props: Vec<Listing>,
}

/// Client for the polygon-bounded listings API.
///
/// Constructed once by the orchestrator and passed by reference; there is no
/// process-wide client.
pub struct ZillowClient {
    http: reqwest::Client,
    api_key: String,
    host: String,
    base_url: String,
}

impl ZillowClient {
    pub fn new(api_key: impl Into<String>, host: impl Into<String>, timeout: Duration) -> Result<Self> {
        let host = host.into();
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("hdp-etl/0.1")
            .build()?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: format!("https://{host}"),
            host,
        })
    }

    /// Point the client at a different base URL. Test hook for mock servers.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetch a single result page.
    async fn fetch_page(
        &self,
        status: StatusType,
        polygon: &str,
        filters: &ListingFilters,
        page: u32,
    ) -> Result<Vec<Listing>> {
        let url = format!("{}/propertyByPolygon", self.base_url);

        let mut query: Vec<(&str, String)> = vec![
            ("polygon", polygon.to_string()),
            ("status_type", status.as_api_value().to_string()),
            ("page", page.to_string()),
        ];
        query.extend(filters.to_query_params());

        let response = self
            .http
            .get(&url)
            .header("x-rapidapi-key", &self.api_key)
            .header("x-rapidapi-host", &self.host)
            .query(&query)
            .send()
            .await?
            .error_for_status()?;

        // Decode failures are malformed responses, never retried
        let page_data: PageResponse = response
            .json()
            .await
            .map_err(|e| HdpError::Decode(e.to_string()))?;

        Ok(page_data.props)
    }

    /// Fetch all pages for one status category.
    ///
    /// Never fails: total failure from page 1 yields an empty batch.
    pub async fn fetch_listings(
        &self,
        status: StatusType,
        polygon: &Polygon,
        filters: &ListingFilters,
        policy: &RetryPolicy,
    ) -> Vec<Listing> {
        let polygon = polygon.to_query_string();
        let mut batch: Vec<Listing> = Vec::new();

        for page in 1..=filters.max_pages {
            info!(%status, page, max_pages = filters.max_pages, "Fetching listings page");

            let result = with_retry(policy, || {
                self.fetch_page(status, &polygon, filters, page)
            })
            .await;

            match result {
                Ok(props) if props.is_empty() => {
                    info!(%status, page, "No more listings, stopping pagination");
                    break;
                },
                Ok(props) => {
                    debug!(%status, page, count = props.len(), "Page retrieved");
                    batch.extend(props);
                    if page < filters.max_pages {
                        tokio::time::sleep(filters.page_delay).await;
                    }
                },
                Err(e) => {
                    error!(%status, page, error = %e, "Page fetch failed, keeping partial batch");
                    break;
                },
            }
        }

        if batch.is_empty() {
            warn!(%status, "No listings retrieved");
        } else {
            info!(%status, total = batch.len(), "Listings retrieved");
        }

        batch
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::NASHVILLE_POLYGON;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn props_page(count: usize, start: u64) -> serde_json::Value {
        let props: Vec<_> = (0..count)
            .map(|i| json!({"zpid": start + i as u64, "price": 250_000 + i}))
            .collect();
        json!({ "props": props, "totalResultCount": count })
    }

    fn test_filters(max_pages: u32) -> ListingFilters {
        ListingFilters {
            max_pages,
            page_delay: Duration::from_millis(0),
            ..ListingFilters::for_sale_defaults()
        }
    }

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            multiplier: 2.0,
        }
    }

    async fn client_for(server: &MockServer) -> ZillowClient {
        ZillowClient::new("test-key", "listings.test", Duration::from_secs(5))
            .unwrap()
            .with_base_url(server.uri())
    }

    #[tokio::test]
    async fn test_pagination_stops_at_first_empty_page() {
        let server = MockServer::start().await;

        for (page, count) in [(1u32, 20usize), (2, 20), (3, 0)] {
            Mock::given(method("GET"))
                .and(path("/propertyByPolygon"))
                .and(query_param("page", page.to_string()))
                .respond_with(ResponseTemplate::new(200).set_body_json(props_page(count, page as u64 * 1000)))
                .expect(1)
                .mount(&server)
                .await;
        }

        let client = client_for(&server).await;
        let batch = client
            .fetch_listings(
                StatusType::ForSale,
                &NASHVILLE_POLYGON,
                &test_filters(20),
                &fast_policy(0),
            )
            .await;

        // 20 + 20 records over exactly 3 requests; no page 4 request is
        // issued (wiremock verifies expectations on drop)
        assert_eq!(batch.len(), 40);
    }

    #[tokio::test]
    async fn test_pagination_stops_at_page_cap() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/propertyByPolygon"))
            .respond_with(ResponseTemplate::new(200).set_body_json(props_page(5, 1)))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let batch = client
            .fetch_listings(
                StatusType::ForRent,
                &NASHVILLE_POLYGON,
                &test_filters(2),
                &fast_policy(0),
            )
            .await;

        assert_eq!(batch.len(), 10);
    }

    #[tokio::test]
    async fn test_failed_page_keeps_partial_batch() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/propertyByPolygon"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(props_page(20, 1)))
            .expect(1)
            .mount(&server)
            .await;

        // Page 2 always 500s; with max_retries = 1 it is attempted twice
        Mock::given(method("GET"))
            .and(path("/propertyByPolygon"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let batch = client
            .fetch_listings(
                StatusType::ForSale,
                &NASHVILLE_POLYGON,
                &test_filters(20),
                &fast_policy(1),
            )
            .await;

        assert_eq!(batch.len(), 20);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/propertyByPolygon"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let batch = client
            .fetch_listings(
                StatusType::ForSale,
                &NASHVILLE_POLYGON,
                &test_filters(20),
                &fast_policy(5),
            )
            .await;

        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_is_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/propertyByPolygon"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let batch = client
            .fetch_listings(
                StatusType::ForSale,
                &NASHVILLE_POLYGON,
                &test_filters(20),
                &fast_policy(5),
            )
            .await;

        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn test_missing_props_field_ends_pagination() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/propertyByPolygon"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"totalResultCount": 0})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let batch = client
            .fetch_listings(
                StatusType::ForSale,
                &NASHVILLE_POLYGON,
                &test_filters(20),
                &fast_policy(0),
            )
            .await;

        assert!(batch.is_empty());
    }
}
