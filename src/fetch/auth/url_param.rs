use crate::fetch::client::HttpClient;
use async_trait::async_trait;
use reqwest::Url;

/// An [`HttpClient`] wrapper that appends an API key as a URL query parameter.
///
/// Both trackers authenticate this way, with `param_name` set to `"key"`.
pub struct UrlParam<C> {
    pub inner: C,
    pub param_name: String,
    pub key: String,
}

impl<C> UrlParam<C> {
    /// Wraps `inner` with the CTA `key=<key>` parameter.
    pub fn cta_key(inner: C, key: &str) -> Self {
        Self {
            inner,
            param_name: "key".to_string(),
            key: key.to_string(),
        }
    }

    fn sign(&self, url: &mut Url) {
        url.query_pairs_mut().append_pair(&self.param_name, &self.key);
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for UrlParam<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.sign(req.url_mut());
        self.inner.execute(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CtaConfig;
    use crate::fetch::BasicClient;
    use crate::requests::CtaRequest;

    #[test]
    fn test_key_appended_after_request_params() {
        let signer = UrlParam::cta_key(BasicClient::new(), "abc123");
        let mut url = CtaRequest::BusArrivals {
            route: "22".into(),
            stop_id: 14787,
        }
        .url(&CtaConfig::default())
        .unwrap();

        signer.sign(&mut url);
        assert_eq!(url.query(), Some("rt=22&stpid=14787&key=abc123"));
    }

    #[test]
    fn test_key_on_url_without_params() {
        let signer = UrlParam::cta_key(BasicClient::new(), "k");
        let mut url = CtaRequest::BusRoutes.url(&CtaConfig::default()).unwrap();

        signer.sign(&mut url);
        assert_eq!(url.query(), Some("key=k"));
    }
}
