//! Fetch backend contract.
//!
//! A backend is split in two halves so the job layer can sit between them:
//!
//! - **[`FetchBackend`]** turns raw responses into [`Item`]s. It never talks to
//!   the network directly; it asks its [`FetchContext`] for responses.
//! - **[`Transport`]** performs the actual requests against the data source.
//!
//! The context decides where a response comes from: the live transport, the
//! live transport with every response recorded into an archive, or a replay
//! of a previously recorded archive. Backends do not need to know which.
//!
//! Backend *types* implement [`Backend`], whose name, categories and
//! capabilities are compile-time constants.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use harvest_core::{BackendArgs, BackendError, FetchSummary, Item};

use crate::source::ResponseSource;

/// Static capabilities of a backend type.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Raw responses can be recorded and replayed through an archive.
    pub archiving: bool,
    /// A failed fetch can be resumed from the last reported watermark.
    pub resuming: bool,
}

impl Capabilities {
    pub const NONE: Self = Self {
        archiving: false,
        resuming: false,
    };

    pub const ALL: Self = Self {
        archiving: true,
        resuming: true,
    };
}

/// A request against a data source.
///
/// Requests double as archive keys, so two requests with the same URI and
/// parameters must be interchangeable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub uri: String,
    #[serde(default)]
    pub params: Map<String, JsonValue>,
}

impl Request {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            params: Map::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Canonical key used to index archived responses.
    pub fn archive_key(&self) -> String {
        if self.params.is_empty() {
            return self.uri.clone();
        }
        // Map keys are kept sorted, so the encoding is stable.
        let params = JsonValue::Object(self.params.clone()).to_string();
        format!("{}?{}", self.uri, params)
    }
}

/// Performs requests against the live data source.
pub trait Transport: Send {
    /// Execute a request and return the raw response body.
    fn fetch(&mut self, request: &Request) -> Result<String, BackendError>;
}

/// Produces items from raw responses.
pub trait FetchBackend: Send {
    /// Where the items come from (e.g. a repository URL).
    fn origin(&self) -> &str;

    /// Produce the next item, or `None` once the source is exhausted.
    fn next_item(&mut self, ctx: &mut FetchContext<'_>) -> Result<Option<Item>, BackendError>;
}

/// Everything a backend needs while producing items.
pub struct FetchContext<'a> {
    source: &'a mut ResponseSource,
    summary: &'a mut FetchSummary,
}

impl<'a> FetchContext<'a> {
    pub(crate) fn new(source: &'a mut ResponseSource, summary: &'a mut FetchSummary) -> Self {
        Self { source, summary }
    }

    /// Obtain the raw response for `request`.
    pub fn request(&mut self, request: &Request) -> Result<String, BackendError> {
        self.source.fetch(request)
    }

    /// Record that a source record was filtered out.
    pub fn skip(&mut self) {
        self.summary.skip();
    }

    /// Attach backend-specific data to the fetch summary.
    pub fn set_extras(&mut self, extras: JsonValue) {
        self.summary.set_extras(extras);
    }

    /// Whether responses are being replayed from an archive.
    pub fn is_replaying(&self) -> bool {
        self.source.is_replay()
    }
}

/// A backend ready to fetch: its item producer plus the transport it uses.
pub struct BackendInstance {
    pub fetcher: Box<dyn FetchBackend>,
    pub transport: Box<dyn Transport>,
}

impl BackendInstance {
    pub fn new(fetcher: impl FetchBackend + 'static, transport: impl Transport + 'static) -> Self {
        Self {
            fetcher: Box::new(fetcher),
            transport: Box::new(transport),
        }
    }
}

impl core::fmt::Debug for BackendInstance {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BackendInstance")
            .field("origin", &self.fetcher.origin())
            .finish_non_exhaustive()
    }
}

/// A backend type that can be registered by name.
pub trait Backend: 'static {
    /// Registry name.
    const NAME: &'static str;
    const VERSION: &'static str;
    /// Item categories this backend can produce.
    const CATEGORIES: &'static [&'static str];
    const CAPABILITIES: Capabilities;

    /// Build an instance for the given arguments.
    ///
    /// Must not perform I/O; requests go through the [`FetchContext`].
    fn build(args: &BackendArgs) -> Result<BackendInstance, BackendError>;
}
