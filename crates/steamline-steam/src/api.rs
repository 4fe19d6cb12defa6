//! Steam storefront endpoints and wire formats

use anyhow::Context;
use indicatif::ProgressBar;
use serde::{Deserialize, Deserializer};
use steamline_core::{Attempt, HttpResponse, RetryPolicy, Sleeper, Transport, retry_with_backoff};

use crate::error::FetchError;
use crate::record::{Fields, Record};

/// Review feed; the app id is appended as the last path segment
pub const DEFAULT_REVIEWS_URL: &str = "https://store.steampowered.com/appreviews/";

/// Full application catalog (`applist.apps[{appid, name}]`)
pub const DEFAULT_APP_LIST_URL: &str = "https://api.steampowered.com/ISteamApps/GetAppList/v2/";

/// Review filters sent with every page. Policy, not tunable per call.
pub const REVIEW_FILTERS: [(&str, &str); 2] = [("filter", "all"), ("day_range", "365")];

/// Python-style truthiness: Steam sends `"success": 1`
fn truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    use serde_json::Value;
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => false,
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|x| x != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    })
}

/// One page of `appreviews/{appid}?json=1`
#[derive(Debug, Deserialize)]
pub struct ReviewPage {
    #[serde(default, deserialize_with = "truthy")]
    pub success: bool,
    #[serde(default)]
    pub reviews: Vec<Fields>,
    #[serde(default)]
    pub cursor: Option<String>,
}

/// Parse a review page body. A `success` flag that is false or missing is
/// an error, not an empty page.
pub fn parse_review_page(body: &str) -> Result<ReviewPage, FetchError> {
    let page: ReviewPage = serde_json::from_str(body).map_err(FetchError::Malformed)?;
    if !page.success {
        return Err(FetchError::NotSuccessful);
    }
    Ok(page)
}

#[derive(Debug, Deserialize)]
struct AppListResponse {
    applist: AppList,
}

#[derive(Debug, Deserialize)]
struct AppList {
    #[serde(default)]
    apps: Vec<Fields>,
}

/// Issue one GET and sort the response into success or a classified attempt.
pub fn send_checked(
    transport: &impl Transport,
    url: &str,
    query: &[(&str, String)],
) -> Result<HttpResponse, Attempt<FetchError>> {
    let resp = transport
        .get(url, query)
        .map_err(|e| FetchError::Transport(e).into_attempt())?;
    if resp.is_rate_limited() {
        return Err(FetchError::RateLimited {
            retry_after: resp.retry_after,
        }
        .into_attempt());
    }
    if !resp.is_success() {
        return Err(FetchError::status(resp.status, &resp.body).into_attempt());
    }
    Ok(resp)
}

/// Fetch the full application catalog as flat records.
pub fn fetch_app_list(
    transport: &impl Transport,
    url: &str,
    policy: &RetryPolicy,
    sleeper: &impl Sleeper,
    pb: &ProgressBar,
) -> anyhow::Result<Vec<Record>> {
    log::info!("Fetching application catalog...");
    pb.set_message("downloading app list...");

    let apps = retry_with_backoff("app list", policy, sleeper, pb, || {
        let resp = send_checked(transport, url, &[])?;
        let parsed: AppListResponse = serde_json::from_str(&resp.body)
            .map_err(|e| Attempt::Fatal(FetchError::Malformed(e)))?;
        Ok(parsed.applist.apps)
    })
    .context("Failed to fetch Steam application catalog")?;

    log::info!("Catalog contains {} apps", apps.len());
    Ok(apps.into_iter().map(Record::new).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_accepts_integer_flag() {
        let page = parse_review_page(r#"{"success": 1, "reviews": [], "cursor": "AoJ"}"#).unwrap();
        assert!(page.success);
        assert_eq!(page.cursor.as_deref(), Some("AoJ"));
    }

    #[test]
    fn success_zero_is_rejected() {
        let err = parse_review_page(r#"{"success": 0}"#).unwrap_err();
        assert!(matches!(err, FetchError::NotSuccessful));
    }

    #[test]
    fn missing_success_is_rejected() {
        let err = parse_review_page(r#"{"reviews": []}"#).unwrap_err();
        assert!(matches!(err, FetchError::NotSuccessful));
    }

    #[test]
    fn non_json_body_is_malformed() {
        let err = parse_review_page("<html>busy</html>").unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[test]
    fn reviews_must_be_objects() {
        let err = parse_review_page(r#"{"success": true, "reviews": [1, 2]}"#).unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[test]
    fn missing_reviews_is_empty_page() {
        let page = parse_review_page(r#"{"success": true}"#).unwrap();
        assert!(page.reviews.is_empty());
        assert!(page.cursor.is_none());
    }

    struct Fixed(HttpResponse);

    impl Transport for Fixed {
        fn get(
            &self,
            _url: &str,
            query: &[(&str, String)],
        ) -> Result<HttpResponse, steamline_core::TransportError> {
            assert!(query.is_empty());
            Ok(self.0.clone())
        }
    }

    fn fetch(resp: HttpResponse) -> anyhow::Result<Vec<Record>> {
        fetch_app_list(
            &Fixed(resp),
            DEFAULT_APP_LIST_URL,
            &RetryPolicy::default(),
            &steamline_core::ThreadSleeper,
            &ProgressBar::hidden(),
        )
    }

    #[test]
    fn app_list_is_unwrapped() {
        let body = r#"{"applist": {"apps": [{"appid": 10, "name": "Counter-Strike"}, {"appid": 20, "name": "Team Fortress Classic"}]}}"#;
        let apps = fetch(HttpResponse {
            status: 200,
            retry_after: None,
            body: body.to_string(),
        })
        .unwrap();
        assert_eq!(apps.len(), 2);
        assert_eq!(apps[1].get("name"), Some(&serde_json::json!("Team Fortress Classic")));
    }

    #[test]
    fn app_list_error_status_fails() {
        let err = fetch(HttpResponse {
            status: 403,
            retry_after: None,
            body: String::new(),
        })
        .unwrap_err();
        assert!(format!("{err:#}").contains("HTTP 403"), "{err:#}");
    }

    #[test]
    fn filters_are_fixed() {
        assert_eq!(REVIEW_FILTERS, [("filter", "all"), ("day_range", "365")]);
    }
}
