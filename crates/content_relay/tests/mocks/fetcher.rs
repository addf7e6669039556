use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use content_relay::{fetch::PageFetcher, Error};
use reqwest::Url;

#[derive(Clone)]
pub struct MockFetcher {
    pub html: String,
    pub calls: Arc<Mutex<Vec<String>>>,
    pub times_out: bool,
}

impl MockFetcher {
    pub fn new(html: &str) -> Self {
        Self {
            html: html.to_string(),
            calls: Arc::new(Mutex::new(Vec::new())),
            times_out: false,
        }
    }

    pub fn timing_out() -> Self {
        Self {
            times_out: true,
            ..Self::new("")
        }
    }
}

impl PageFetcher for MockFetcher {
    async fn fetch_page(&self, url: &Url) -> Result<String, Error> {
        self.calls.lock().unwrap().push(url.to_string());
        if self.times_out {
            return Err(Error::Timeout(Duration::from_secs(10)));
        }
        Ok(self.html.clone())
    }
}
