use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use crate::client::{DEFAULT_PAGE_SIZE, ListQuery, Page, ThreadSource};
use crate::error::{Result, ThreadviewError};
use crate::model::{Message, RunStepList, ThreadAggregate};
use crate::thread_id::ThreadId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    pub page_size: u32,
    pub follow_pages: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            follow_pages: false,
        }
    }
}

pub fn fetch_thread<S>(
    source: &S,
    thread_id: &ThreadId,
    options: &FetchOptions,
) -> Result<ThreadAggregate>
where
    S: ThreadSource + ?Sized,
{
    let thread_id = thread_id.as_str();
    info!(thread_id, "fetching thread");

    let messages = collect_pages("messages", options, |query| {
        source.list_messages(thread_id, query)
    })?;

    let mut run_steps = BTreeMap::new();
    for run_id in referenced_run_ids(&messages) {
        debug!(thread_id, run_id, "fetching run steps");
        let steps = collect_pages("run steps", options, |query| {
            source.list_run_steps(thread_id, run_id, query)
        })?;
        run_steps.insert(run_id.to_string(), RunStepList { steps });
    }

    let mut assistants = BTreeMap::new();
    for assistant_id in referenced_assistant_ids(&messages) {
        debug!(assistant_id, "fetching assistant");
        let assistant = source.retrieve_assistant(assistant_id)?;
        assistants.insert(assistant_id.to_string(), assistant);
    }

    info!(
        thread_id,
        messages = messages.len(),
        runs = run_steps.len(),
        assistants = assistants.len(),
        "thread fetched"
    );

    Ok(ThreadAggregate {
        thread_id: thread_id.to_string(),
        messages,
        run_steps,
        assistants,
    })
}

pub fn referenced_run_ids(messages: &[Message]) -> BTreeSet<&str> {
    messages
        .iter()
        .filter_map(|message| message.run_id.as_deref())
        .collect()
}

pub fn referenced_assistant_ids(messages: &[Message]) -> BTreeSet<&str> {
    messages
        .iter()
        .filter_map(|message| message.assistant_id.as_deref())
        .collect()
}

pub fn aggregate_to_raw_json(aggregate: &ThreadAggregate) -> Result<String> {
    let mut json = serde_json::to_string_pretty(aggregate)
        .map_err(|err| ThreadviewError::Serialization(err.to_string()))?;
    json.push('\n');
    Ok(json)
}

fn collect_pages<T, F>(listing: &str, options: &FetchOptions, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(&ListQuery) -> Result<Page<T>>,
{
    let mut query = ListQuery::ascending(options.page_size);
    let mut items = Vec::new();

    loop {
        let page = fetch(&query)?;
        items.extend(page.data);

        if !page.has_more {
            break;
        }
        if !options.follow_pages {
            warn!(
                listing,
                fetched = items.len(),
                "listing has more results than one page; pass --all-pages to read them"
            );
            break;
        }
        let Some(cursor) = page.last_id else {
            warn!(listing, "server reported more results without a cursor");
            break;
        };
        if query.after.as_deref() == Some(cursor.as_str()) {
            warn!(listing, cursor = %cursor, "pagination cursor did not advance");
            break;
        }
        query = query.after(cursor);
    }

    Ok(items)
}
