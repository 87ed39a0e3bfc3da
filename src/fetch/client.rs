use async_trait::async_trait;
use reqwest::{Method, Request, Response, Url};

/// Executes tracker requests. Wrappers such as
/// [`UrlParam`](crate::fetch::auth::UrlParam) decorate an inner client.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;

    /// GETs `url`. Both trackers report feed errors inside a 200 body, so any
    /// other status fails here.
    async fn get(&self, url: Url) -> reqwest::Result<Response> {
        self.execute(Request::new(Method::GET, url))
            .await?
            .error_for_status()
    }
}
