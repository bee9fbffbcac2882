//! Lookup service answering which outputs are tracked.

use crate::errors::NodeError;
use crate::metrics::LOOKUP_COUNTER;
use crate::storage::OverlayStore;
use postboard_core::wire::LookupRequest;
use postboard_core::LookupOutput;
use tracing::debug;

/// Lists Postboard outputs for one provider name.
#[derive(Clone)]
pub struct LookupService {
    provider: String,
    topic: String,
    store: OverlayStore,
}

impl LookupService {
    /// Creates a lookup service answering for `provider` from `topic`'s outputs.
    pub fn new(provider: &str, topic: &str, store: OverlayStore) -> Self {
        Self {
            provider: provider.to_string(),
            topic: topic.to_string(),
            store,
        }
    }

    /// Answers a lookup. The query must be a JSON object; `{}` lists every
    /// tracked output, newest first.
    pub fn lookup(&self, request: &LookupRequest) -> Result<Vec<LookupOutput>, NodeError> {
        if request.provider != self.provider {
            return Err(NodeError::UnsupportedProvider(request.provider.clone()));
        }
        if !request.query.is_object() {
            return Err(NodeError::InvalidQuery(format!(
                "expected an object, got {}",
                request.query
            )));
        }

        LOOKUP_COUNTER.inc();
        let outputs = self.store.list_outputs(&self.topic)?;
        debug!("Lookup {} answered with {} outputs", self.provider, outputs.len());
        Ok(outputs)
    }
}
