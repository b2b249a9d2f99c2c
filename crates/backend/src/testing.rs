//! Scripted backends for tests.
//!
//! The scripted backend serves `items` records, one per page, through its
//! transport. Behaviour is controlled by backend arguments:
//!
//! - `origin` (string): item origin, defaults to [`DEFAULT_ORIGIN`]
//! - `items` (integer): number of records served
//! - `fail_after` (integer): fail instead of producing the next record once
//!   this many items were produced; skipped records still count as skipped
//! - `skip_odd` (bool): filter out records on odd pages
//! - `offline` (bool): every transport request fails
//! - `extras` (any): attached to the summary when the fetch ends

use serde_json::{Value as JsonValue, json};

use harvest_core::{BackendArgs, BackendError, Item};

use crate::backend::{
    Backend, BackendInstance, Capabilities, FetchBackend, FetchContext, Request, Transport,
};

pub const DEFAULT_ORIGIN: &str = "https://example.com/scripted";

/// Base timestamp of the first served record.
pub const BASE_UPDATED_ON: i64 = 1_600_000_000;

/// Arguments serving `items` records.
pub fn scripted_args(items: u64) -> BackendArgs {
    let mut args = BackendArgs::new();
    args.insert("items".into(), items.into());
    args
}

/// Scripted backend that supports archiving and resuming.
pub struct ArchivingBackend;

impl Backend for ArchivingBackend {
    const NAME: &'static str = "archiving";
    const VERSION: &'static str = "0.1.0";
    const CATEGORIES: &'static [&'static str] = &["item"];
    const CAPABILITIES: Capabilities = Capabilities::ALL;

    fn build(args: &BackendArgs) -> Result<BackendInstance, BackendError> {
        scripted(Self::NAME, Self::VERSION, args)
    }
}

/// Scripted backend without archiving or resuming.
pub struct PlainBackend;

impl Backend for PlainBackend {
    const NAME: &'static str = "plain";
    const VERSION: &'static str = "0.1.0";
    const CATEGORIES: &'static [&'static str] = &["item"];
    const CAPABILITIES: Capabilities = Capabilities::NONE;

    fn build(args: &BackendArgs) -> Result<BackendInstance, BackendError> {
        scripted(Self::NAME, Self::VERSION, args)
    }
}

fn scripted(
    name: &'static str,
    version: &'static str,
    args: &BackendArgs,
) -> Result<BackendInstance, BackendError> {
    let origin = match args.get("origin") {
        None => DEFAULT_ORIGIN.to_string(),
        Some(JsonValue::String(s)) => s.clone(),
        Some(other) => return Err(BackendError::fetch(format!("invalid origin: {other}"))),
    };
    let items = args.get("items").and_then(JsonValue::as_u64).unwrap_or(0);

    let fetcher = ScriptedFetcher {
        name,
        version,
        origin,
        page: 0,
        produced: 0,
        fail_after: args.get("fail_after").and_then(JsonValue::as_u64),
        skip_odd: args.get("skip_odd").and_then(JsonValue::as_bool).unwrap_or(false),
        extras: args.get("extras").cloned(),
    };
    let transport = ScriptedTransport {
        items,
        offline: args.get("offline").and_then(JsonValue::as_bool).unwrap_or(false),
    };
    Ok(BackendInstance::new(fetcher, transport))
}

struct ScriptedFetcher {
    name: &'static str,
    version: &'static str,
    origin: String,
    page: u64,
    produced: u64,
    fail_after: Option<u64>,
    skip_odd: bool,
    extras: Option<JsonValue>,
}

impl FetchBackend for ScriptedFetcher {
    fn origin(&self) -> &str {
        &self.origin
    }

    fn next_item(&mut self, ctx: &mut FetchContext<'_>) -> Result<Option<Item>, BackendError> {
        loop {
            let page = self.page;
            let body = ctx.request(&Request::new(self.origin.clone()).with_param("page", page))?;
            self.page += 1;

            let record: JsonValue = serde_json::from_str(&body)
                .map_err(|e| BackendError::fetch(format!("malformed page {page}: {e}")))?;
            if record.is_null() {
                if let Some(extras) = self.extras.take() {
                    ctx.set_extras(extras);
                }
                return Ok(None);
            }

            if self.skip_odd && page % 2 == 1 {
                ctx.skip();
                continue;
            }

            if self.fail_after == Some(self.produced) {
                return Err(BackendError::fetch(format!(
                    "scripted failure after {} items",
                    self.produced
                )));
            }

            let uuid = record["id"].as_str().unwrap_or_default().to_string();
            let updated_on = record["updated_on"].as_f64().unwrap_or_default();
            let offset = record["offset"].as_i64().unwrap_or_default();

            self.produced += 1;
            let item = Item::new(
                self.name,
                self.version,
                "item",
                self.origin.clone(),
                uuid,
                updated_on,
                record,
            )
            .with_offset(offset);
            return Ok(Some(item));
        }
    }
}

struct ScriptedTransport {
    items: u64,
    offline: bool,
}

impl Transport for ScriptedTransport {
    fn fetch(&mut self, request: &Request) -> Result<String, BackendError> {
        if self.offline {
            return Err(BackendError::transport(anyhow::anyhow!(
                "{} is unreachable",
                request.uri
            )));
        }

        let page = request
            .params
            .get("page")
            .and_then(JsonValue::as_u64)
            .ok_or_else(|| BackendError::fetch("missing page parameter"))?;
        if page >= self.items {
            return Ok("null".to_string());
        }

        let record = json!({
            "id": format!("item-{page}"),
            "updated_on": BASE_UPDATED_ON + page as i64 * 60,
            "offset": page,
        });
        Ok(record.to_string())
    }
}
