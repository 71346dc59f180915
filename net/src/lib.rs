//! Network seam for the parsing core.
//!
//! The core never speaks HTTP itself. It builds a [`Request`], hands it to a
//! [`NetworkEngine`], and blocks on the returned [`NetworkJob`] until the body
//! is available or the fetch failed. [`HttpEngine`] is the stock blocking
//! implementation; tests substitute scripted engines.

use std::path::PathBuf;

use bytes::Bytes;
use log::debug;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// A single fetch to run. `body` is sent urlencoded unless `files` is
/// non-empty, in which case the whole request goes out as multipart.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub referral_url: Option<String>,
    pub body: Vec<(String, String)>,
    pub files: Vec<(String, PathBuf)>,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Request {
            method: Method::Get,
            url: url.into(),
            referral_url: None,
            body: Vec::new(),
            files: Vec::new(),
        }
    }

    pub fn post(url: impl Into<String>) -> Self {
        Request {
            method: Method::Post,
            ..Request::get(url)
        }
    }

    pub fn set_files(&mut self, files: Vec<(String, PathBuf)>) {
        self.files = files;
    }
}

#[derive(Debug, Clone, Error)]
pub enum NetworkError {
    #[error("404 - not found")]
    NotFound,
    #[error("fetch cancelled")]
    Cancelled,
    #[error("network error: {0}")]
    Other(String),
}

/// A submitted fetch. Waiting is blocking; the engine decides how the work
/// actually happens.
pub trait NetworkJob {
    /// Exempts the job from any engine-side bandwidth rules. The stock
    /// engine has none.
    fn override_bandwidth(&mut self) {}

    fn wait_until_done(&mut self) -> Result<(), NetworkError>;

    /// The fetched body. Only meaningful after a successful wait.
    fn content(&self) -> Bytes;
}

pub trait NetworkEngine {
    fn add_job(&self, request: Request) -> Box<dyn NetworkJob>;
}

/// Blocking HTTP engine. One shared client, one request per job.
pub struct HttpEngine {
    client: reqwest::blocking::Client,
}

impl HttpEngine {
    #[must_use]
    pub fn new() -> Self {
        HttpEngine {
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl Default for HttpEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkEngine for HttpEngine {
    fn add_job(&self, request: Request) -> Box<dyn NetworkJob> {
        Box::new(HttpJob {
            client: self.client.clone(),
            request,
            content: Bytes::new(),
        })
    }
}

struct HttpJob {
    client: reqwest::blocking::Client,
    request: Request,
    content: Bytes,
}

impl NetworkJob for HttpJob {
    fn wait_until_done(&mut self) -> Result<(), NetworkError> {
        let mut builder = match self.request.method {
            Method::Get => self.client.get(&self.request.url),
            Method::Post => self.client.post(&self.request.url),
        };
        if let Some(referral) = &self.request.referral_url {
            builder = builder.header(reqwest::header::REFERER, referral);
        }
        if self.request.method == Method::Post {
            if self.request.files.is_empty() {
                builder = builder.form(&self.request.body);
            } else {
                let mut form = reqwest::blocking::multipart::Form::new();
                for (key, value) in &self.request.body {
                    form = form.text(key.clone(), value.clone());
                }
                for (key, path) in &self.request.files {
                    form = form
                        .file(key.clone(), path)
                        .map_err(|e| NetworkError::Other(e.to_string()))?;
                }
                builder = builder.multipart(form);
            }
        }
        debug!("{} {}", self.request.method.as_str(), self.request.url);
        let response = builder
            .send()
            .map_err(|e| NetworkError::Other(e.to_string()))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(NetworkError::NotFound);
        }
        let response = response
            .error_for_status()
            .map_err(|e| NetworkError::Other(e.to_string()))?;
        self.content = response
            .bytes()
            .map_err(|e| NetworkError::Other(e.to_string()))?;
        Ok(())
    }

    fn content(&self) -> Bytes {
        self.content.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builders() {
        let mut req = Request::get("https://example.com/q");
        assert_eq!(req.method, Method::Get);
        assert!(req.body.is_empty());
        req.set_files(vec![("file".to_owned(), PathBuf::from("/tmp/x"))]);
        assert_eq!(req.files.len(), 1);

        let req = Request::post("https://example.com/q");
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.url, "https://example.com/q");
    }
}
