//! Request headers carrying the application credentials.

use std::fmt;

pub const APPLICATION_ID_HEADER: &str = "X-Application-Id";
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Supplies the headers sent with every request.
pub trait HeaderProvider: Send + Sync {
    fn headers(&self) -> Vec<(String, String)>;
}

/// Static credentials plus any configured default headers.
#[derive(Clone)]
pub struct ApiKeyHeaders {
    app_id: String,
    api_key: String,
    extra: Vec<(String, String)>,
}

impl ApiKeyHeaders {
    pub fn new(app_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            api_key: api_key.into(),
            extra: Vec::new(),
        }
    }

    /// Adds headers sent after the credentials.
    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.extra
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }
}

impl HeaderProvider for ApiKeyHeaders {
    fn headers(&self) -> Vec<(String, String)> {
        let mut headers = Vec::with_capacity(2 + self.extra.len());
        headers.push((APPLICATION_ID_HEADER.to_string(), self.app_id.clone()));
        headers.push((API_KEY_HEADER.to_string(), self.api_key.clone()));
        headers.extend(self.extra.iter().cloned());
        headers
    }
}

// Keeps the key out of logs.
impl fmt::Debug for ApiKeyHeaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyHeaders")
            .field("app_id", &self.app_id)
            .field("api_key", &"*****")
            .field("extra", &self.extra)
            .finish()
    }
}
