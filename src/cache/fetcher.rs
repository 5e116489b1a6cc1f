//! Network access for the offline cache.

use core::future::Future;

use super::http::{Request, Response};
use crate::error::Result;

/// Performs network requests on behalf of the cache.
pub trait Fetcher: core::fmt::Debug + Send + Sync {
    /// Sends `request` and returns the full response.
    ///
    /// Non-success statuses are returned as responses, not errors.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ForexError::Network`] if no response was
    /// received.
    fn fetch(&self, request: &Request) -> impl Future<Output = Result<Response>> + Send;
}

#[cfg(feature = "async")]
pub use http_fetcher::HttpFetcher;

#[cfg(feature = "async")]
mod http_fetcher {
    //! reqwest-backed [`Fetcher`].

    use reqwest::header::ACCESS_CONTROL_ALLOW_ORIGIN;
    use url::Url;

    use super::Fetcher;
    use crate::cache::http::{Method, Request, Response, ResponseKind};
    use crate::error::{ForexError, Result};

    /// Fetcher backed by [`reqwest::Client`].
    ///
    /// Responses are classified relative to the app origin: same-origin
    /// responses are [`ResponseKind::Basic`], cross-origin responses that
    /// carry `Access-Control-Allow-Origin` are [`ResponseKind::Cors`], and
    /// everything else is [`ResponseKind::Opaque`].
    #[derive(Debug, Clone)]
    pub struct HttpFetcher {
        /// Underlying HTTP client.
        http: reqwest::Client,
        /// Origin the app is served from.
        origin: Url,
    }

    impl HttpFetcher {
        /// Creates a fetcher for an app served from `origin`.
        ///
        /// # Errors
        ///
        /// Returns [`ForexError::Network`] if the HTTP client fails to build.
        #[inline]
        #[tracing::instrument(skip_all, fields(origin = %origin))]
        pub fn new(origin: Url) -> Result<Self> {
            let http = reqwest::Client::builder()
                .build()
                .map_err(|err| ForexError::Network {
                    url: origin.to_string(),
                    source: Box::new(err),
                })?;
            tracing::debug!("building fetcher");
            Ok(Self { http, origin })
        }

        /// Origin responses are classified against.
        #[inline]
        #[must_use]
        pub const fn origin(&self) -> &Url {
            &self.origin
        }

        /// Determines the response type for a response to `url`.
        fn classify(&self, url: &Url, cors_header: bool) -> ResponseKind {
            if url.origin() == self.origin.origin() {
                ResponseKind::Basic
            } else if cors_header {
                ResponseKind::Cors
            } else {
                ResponseKind::Opaque
            }
        }
    }

    /// Maps a cache method onto a reqwest method.
    const fn to_reqwest(method: Method) -> reqwest::Method {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Head => reqwest::Method::HEAD,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
            Method::Options => reqwest::Method::OPTIONS,
        }
    }

    impl Fetcher for HttpFetcher {
        #[inline]
        #[tracing::instrument(skip_all, fields(method = %request.method(), url = %request.url()))]
        async fn fetch(&self, request: &Request) -> Result<Response> {
            let network_error = |err: reqwest::Error| ForexError::Network {
                url: request.url().to_string(),
                source: Box::new(err),
            };
            let response = self
                .http
                .request(to_reqwest(request.method()), request.url().clone())
                .send()
                .await
                .map_err(network_error)?;

            let status = response.status().as_u16();
            let cors = response.headers().contains_key(ACCESS_CONTROL_ALLOW_ORIGIN);
            let kind = self.classify(request.url(), cors);
            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|text| (name.as_str().to_owned(), text.to_owned()))
                })
                .collect();
            let body = response.bytes().await.map_err(network_error)?.to_vec();
            tracing::debug!(status, kind = ?kind, bytes = body.len(), "received response");
            Ok(Response {
                status,
                kind,
                headers,
                body,
            })
        }
    }

    #[cfg(test)]
    mod tests {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        use super::*;

        #[tokio::test]
        async fn same_origin_is_basic() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/index.css"))
                .respond_with(ResponseTemplate::new(200).set_body_string("body{}"))
                .mount(&server)
                .await;

            let origin = Url::parse(&server.uri()).unwrap();
            let fetcher = HttpFetcher::new(origin.clone()).unwrap();
            let request = Request::get(origin.join("/index.css").unwrap());
            let response = fetcher.fetch(&request).await.unwrap();
            assert_eq!(response.status, 200);
            assert_eq!(response.kind, ResponseKind::Basic);
            assert_eq!(response.body, b"body{}");
        }

        #[tokio::test]
        async fn cross_origin_with_allow_header_is_cors() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(
                    ResponseTemplate::new(200).insert_header("Access-Control-Allow-Origin", "*"),
                )
                .mount(&server)
                .await;

            let fetcher = HttpFetcher::new(Url::parse("http://app.invalid").unwrap()).unwrap();
            let request = Request::parse(Method::Get, &format!("{}/lib.js", server.uri())).unwrap();
            let response = fetcher.fetch(&request).await.unwrap();
            assert_eq!(response.kind, ResponseKind::Cors);
            assert_eq!(response.header("access-control-allow-origin"), Some("*"));
        }

        #[tokio::test]
        async fn cross_origin_without_header_is_opaque() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(200))
                .mount(&server)
                .await;

            let fetcher = HttpFetcher::new(Url::parse("http://app.invalid").unwrap()).unwrap();
            let request =
                Request::parse(Method::Get, &format!("{}/font.woff", server.uri())).unwrap();
            assert_eq!(fetcher.fetch(&request).await.unwrap().kind, ResponseKind::Opaque);
        }

        #[tokio::test]
        async fn error_status_is_a_response() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(404))
                .mount(&server)
                .await;

            let origin = Url::parse(&server.uri()).unwrap();
            let fetcher = HttpFetcher::new(origin.clone()).unwrap();
            let response = fetcher
                .fetch(&Request::get(origin.join("/missing").unwrap()))
                .await
                .unwrap();
            assert_eq!(response.status, 404);
        }

        #[tokio::test]
        async fn unreachable_host_is_network_error() {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            let addr = listener.local_addr().unwrap();
            drop(listener);
            let origin = Url::parse(&format!("http://{addr}")).unwrap();

            let fetcher = HttpFetcher::new(origin.clone()).unwrap();
            let err = fetcher.fetch(&Request::get(origin)).await.unwrap_err();
            assert!(matches!(err, ForexError::Network { .. }));
        }
    }
}
