//! Steam extraction configuration

use steamline_core::RetryPolicy;

use crate::api::{DEFAULT_APP_LIST_URL, DEFAULT_REVIEWS_URL};
use crate::pagination::Mode;

/// Default number of reviews requested per page
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Storefront endpoints and paging settings.
#[derive(Debug, Clone)]
pub struct Config {
    pub reviews_url: String,
    pub app_list_url: String,
    pub page_size: u32,
    pub mode: Mode,
    pub retry: RetryPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reviews_url: DEFAULT_REVIEWS_URL.to_string(),
            app_list_url: DEFAULT_APP_LIST_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            mode: Mode::Cursor,
            retry: RetryPolicy::default(),
        }
    }
}
