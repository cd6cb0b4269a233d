use anyhow::{Context, Result, bail};
use reqwest::{Method, Url};
use reqwest::blocking::{Client, Response};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::models::{ApplicationDraft, ApplicationId, ApplicationRecord};

/// The only failure the controller distinguishes. Cause details are kept for logging.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{method} {path} failed: {reason}")]
    RequestFailed {
        method: Method,
        path: String,
        reason: String,
    },
}

impl ApiError {
    fn failed(method: &Method, path: &str, reason: impl ToString) -> Self {
        ApiError::RequestFailed {
            method: method.clone(),
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }
}

// --- Remote store contract ---

pub trait ApplicationApi {
    fn list(&self) -> Result<Vec<ApplicationRecord>, ApiError>;
    fn create(&self, draft: &ApplicationDraft) -> Result<(), ApiError>;
    fn update(&self, id: &ApplicationId, draft: &ApplicationDraft) -> Result<(), ApiError>;
    fn delete(&self, id: &ApplicationId) -> Result<(), ApiError>;
}

const APPLICATIONS: &str = "applications";

/// Human-readable path for logs and errors. Not used to build URLs.
fn display_path(id: Option<&ApplicationId>) -> String {
    match id {
        Some(id) => format!("/{}/{}", APPLICATIONS, id),
        None => format!("/{}", APPLICATIONS),
    }
}

// --- HTTP implementation ---

#[derive(Debug)]
pub struct HttpApi {
    base_url: Url,
    token: Option<String>,
    client: Client,
}

impl HttpApi {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid API base URL: {}", base_url))?;
        if base_url.cannot_be_a_base() {
            bail!("Invalid API base URL: {}", base_url);
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            base_url,
            token,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// `<base>/applications[/<id>]`, with the id percent-encoded as one path segment.
    fn endpoint(&self, id: Option<&ApplicationId>) -> Url {
        let mut url = self.base_url.clone();
        // Checked in `new`: the base URL always has path segments.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(APPLICATIONS);
            if let Some(id) = id {
                segments.push(id.as_str());
            }
        }
        url
    }

    fn send(
        &self,
        method: Method,
        id: Option<&ApplicationId>,
        body: Option<&ApplicationDraft>,
    ) -> Result<Response, ApiError> {
        let path = display_path(id);
        let path = path.as_str();
        debug!(%method, path, "sending request");

        let mut request = self
            .client
            .request(method.clone(), self.endpoint(id))
            .header("Accept", "application/json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .map_err(|e| ApiError::failed(&method, path, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            return Err(ApiError::failed(
                &method,
                path,
                format!("status {}: {}", status, error_text),
            ));
        }

        Ok(response)
    }
}

impl ApplicationApi for HttpApi {
    fn list(&self) -> Result<Vec<ApplicationRecord>, ApiError> {
        let response = self.send(Method::GET, None, None)?;
        response
            .json::<Vec<ApplicationRecord>>()
            .map_err(|e| ApiError::failed(&Method::GET, &display_path(None), e))
    }

    fn create(&self, draft: &ApplicationDraft) -> Result<(), ApiError> {
        // Response body (created record or ack) is not used; the caller re-fetches.
        self.send(Method::POST, None, Some(draft))?;
        Ok(())
    }

    fn update(&self, id: &ApplicationId, draft: &ApplicationDraft) -> Result<(), ApiError> {
        self.send(Method::PUT, Some(id), Some(draft))?;
        Ok(())
    }

    fn delete(&self, id: &ApplicationId) -> Result<(), ApiError> {
        self.send(Method::DELETE, Some(id), None)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serves exactly one HTTP response and hands back the raw request it received.
    fn one_shot_server(status_line: &str, body: &str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = stream.read(&mut buf).unwrap();
                received.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&received);
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let content_length = text[..head_end]
                        .lines()
                        .find_map(|l| {
                            let lower = l.to_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                        })
                        .unwrap_or(0);
                    if received.len() >= head_end + 4 + content_length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            stream.write_all(response.as_bytes()).unwrap();
            String::from_utf8_lossy(&received).to_string()
        });

        (format!("http://{}/api/", addr), handle)
    }

    fn api(base: &str, token: Option<&str>) -> HttpApi {
        HttpApi::new(base, token.map(String::from), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_endpoint_joins_base_and_path() {
        for base in ["http://localhost:5000/api/", "http://localhost:5000/api"] {
            let api = api(base, None);
            assert_eq!(
                api.endpoint(None).as_str(),
                "http://localhost:5000/api/applications"
            );
            assert_eq!(
                api.endpoint(Some(&ApplicationId::from("abc"))).as_str(),
                "http://localhost:5000/api/applications/abc"
            );
        }
        assert_eq!(
            api("http://localhost:5000", None).endpoint(None).as_str(),
            "http://localhost:5000/applications"
        );
    }

    #[test]
    fn test_endpoint_escapes_reserved_characters_in_id() {
        let api = api("http://h/api", None);
        let url = api.endpoint(Some(&ApplicationId::from("a#b")));
        assert_eq!(url.path(), "/api/applications/a%23b");
        assert_eq!(url.fragment(), None);

        let url = api.endpoint(Some(&ApplicationId::from("a/b?c")));
        assert_eq!(url.path(), "/api/applications/a%2Fb%3Fc");
        assert_eq!(url.query(), None);
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        assert!(HttpApi::new("not a url", None, Duration::from_secs(1)).is_err());
        assert!(HttpApi::new("mailto:ada@example.com", None, Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_update_puts_draft_to_record_path() {
        let (base, server) = one_shot_server("200 OK", r#"{"message":"updated"}"#);
        let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let draft = ApplicationDraft::new("Acme", "SRE", "rejected", date);

        api(&base, Some("secret")).update(&ApplicationId::from("a#1"), &draft).unwrap();
        let request = server.join().unwrap();

        assert!(request.starts_with("PUT /api/applications/a%231 HTTP/1.1"));
        assert!(request.to_lowercase().contains("content-type: application/json"));
        assert!(request.contains(r#""company":"Acme""#));
        assert!(request.contains(r#""status":"Rejected""#));
        assert!(request.contains(r#""appliedDate":"2025-01-02""#));
    }

    #[test]
    fn test_undecodable_list_body_is_request_failed() {
        let (base, server) = one_shot_server("200 OK", r#"{"applications": "nope"}"#);

        let err = api(&base, None).list().unwrap_err();
        server.join().unwrap();

        let ApiError::RequestFailed { method, path, .. } = err;
        assert_eq!(method, Method::GET);
        assert_eq!(path, "/applications");
    }

    #[test]
    fn test_list_decodes_records_and_sends_token() {
        let body = r#"[{"_id":"1","company":"Acme","position":"SRE","status":"Applied","appliedDate":"2025-03-14T00:00:00.000Z"}]"#;
        let (base, server) = one_shot_server("200 OK", body);

        let records = api(&base, Some("secret")).list().unwrap();
        let request = server.join().unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].company, "Acme");
        assert!(request.starts_with("GET /api/applications HTTP/1.1"));
        assert!(request.to_lowercase().contains("authorization: bearer secret"));
    }

    #[test]
    fn test_create_posts_draft() {
        let (base, server) = one_shot_server("201 Created", r#"{"message":"ok"}"#);
        let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let draft = ApplicationDraft::new("Acme", "SRE", "offer", date);

        api(&base, None).create(&draft).unwrap();
        let request = server.join().unwrap();

        assert!(request.starts_with("POST /api/applications HTTP/1.1"));
        assert!(request.contains(r#""status":"Offer""#));
        assert!(!request.to_lowercase().contains("authorization:"));
    }

    #[test]
    fn test_non_success_status_is_request_failed() {
        let (base, server) = one_shot_server("404 Not Found", r#"{"message":"missing"}"#);

        let err = api(&base, None).delete(&ApplicationId::from("42")).unwrap_err();
        let request = server.join().unwrap();

        assert!(request.starts_with("DELETE /api/applications/42 HTTP/1.1"));
        let ApiError::RequestFailed { method, path, reason } = err;
        assert_eq!(method, Method::DELETE);
        assert_eq!(path, "/applications/42");
        assert!(reason.contains("404"));
    }

    #[test]
    fn test_connection_error_is_request_failed() {
        // Bind then drop to get a port nobody is listening on.
        let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
        let result = api(&format!("http://127.0.0.1:{}", port), None).list();
        assert!(matches!(result, Err(ApiError::RequestFailed { .. })));
    }
}
