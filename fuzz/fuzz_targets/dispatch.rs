//! Fuzz target for request dispatch.
//!
//! Arbitrary methods, targets, headers and bodies go through a small
//! resource. Dispatch may fail, but never panics outside the operation.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use keystone_core::{
    Arguments, ContentPart, Dispatcher, Entity, Error, HttpRequest, Operation, Param,
    RequestContext, Resource,
};
use std::collections::BTreeMap;
use std::sync::OnceLock;

struct Echo;

impl Echo {
    fn show(&self, mut args: Arguments) -> Result<String, Error> {
        let id: u32 = args.take(0)?;
        let tag: Option<String> = args.optional(1)?;
        Ok(format!("{}:{}", id, tag.unwrap_or_default()))
    }

    fn store(&self, mut args: Arguments) -> Result<Entity<BTreeMap<String, String>>, Error> {
        let values: Option<BTreeMap<String, String>> = args.optional(0)?;
        Ok(Entity(values.unwrap_or_default()))
    }
}

impl Resource for Echo {
    fn path() -> Option<&'static str> {
        Some("/echo")
    }

    fn operations() -> Vec<Operation<Self>> {
        vec![
            Operation::get("/{id:[0-9]{1,6}}")
                .param(Param::path::<u32>("id"))
                .param(Param::query::<String>("tag"))
                .handler(Echo::show),
            Operation::post("/")
                .param(Param::body::<BTreeMap<String, String>>())
                .handler(Echo::store),
        ]
    }

    fn create(_ctx: &RequestContext) -> Result<Self, Error> {
        Ok(Echo)
    }
}

#[derive(Debug, Arbitrary)]
struct FuzzRequest {
    method: String,
    target: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

static DISPATCHER: OnceLock<Option<Dispatcher<Echo>>> = OnceLock::new();

fuzz_target!(|data: FuzzRequest| {
    let Some(dispatcher) = DISPATCHER
        .get_or_init(|| Dispatcher::builder().base_path("/api").build().ok())
        .as_ref()
    else {
        return;
    };

    let mut content = ContentPart::empty().with_body(data.body);
    for (name, value) in data.headers.into_iter().take(16) {
        content = content.with_header(name, value);
    }

    let request = HttpRequest::new(data.method, data.target).with_content(content);
    let _ = dispatcher.handle(request);
});
