use std::fmt;

use crate::action::{classify_queue, Action};
use crate::body::{decode_with_options, DecodeOptions, InboundRequest};
use crate::checksum::{validate_checksum, ChecksumDigest};
use crate::error::{RequestError, RequestResult};
use crate::value::Value;

/// A fully validated component update request.
///
/// The only way to obtain one is [`ComponentRequest::new`] (or
/// [`ComponentRequest::new_with_options`]), which runs every check up front:
/// body decoding, required members, the checksum over `data`, and action
/// classification. Nothing is re-validated afterwards.
#[derive(Clone)]
pub struct ComponentRequest<'r> {
    request: &'r InboundRequest,
    name: String,
    id: String,
    epoch: String,
    key: String,
    hash: String,
    data: Value,
    actions: Vec<Action>,
}

impl<'r> ComponentRequest<'r> {
    pub fn new(
        request: &'r InboundRequest,
        component_name: &str,
        digest: &dyn ChecksumDigest,
    ) -> RequestResult<Self> {
        Self::new_with_options(request, component_name, digest, &DecodeOptions::default())
    }

    /// Checks run in a fixed order and the first failure is reported: body,
    /// component name, `data`, `id`, `epoch`, checksum, then actions.
    pub fn new_with_options(
        request: &'r InboundRequest,
        component_name: &str,
        digest: &dyn ChecksumDigest,
        options: &DecodeOptions,
    ) -> RequestResult<Self> {
        let document = decode_with_options(request, options)?;

        if component_name.is_empty() {
            return Err(RequestError::Validation("Missing component name".into()));
        }
        let data = document
            .data
            .ok_or_else(|| RequestError::Validation("Missing data".into()))?;
        let id = document
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| RequestError::Validation("Missing component id".into()))?;
        let epoch = document
            .epoch
            .filter(|epoch| !epoch.is_empty())
            .ok_or_else(|| RequestError::Validation("Missing epoch".into()))?;

        validate_checksum(&data, document.checksum.as_deref(), digest)?;

        let actions = classify_queue(document.action_queue)?;

        tracing::debug!(
            component = component_name,
            id = %id,
            actions = actions.len(),
            "component request validated"
        );

        Ok(Self {
            request,
            name: component_name.to_string(),
            id,
            epoch,
            key: document.key,
            hash: document.hash,
            data,
            actions,
        })
    }

    /// The inbound request this was built from.
    pub fn request(&self) -> &'r InboundRequest {
        self.request
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn epoch(&self) -> &str {
        &self.epoch
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Checksum-verified component data.
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Classified actions in submission order.
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }
}

impl fmt::Debug for ComponentRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRequest")
            .field("path", &self.request.path)
            .field("name", &self.name)
            .field("id", &self.id)
            .field("key", &self.key)
            .field("epoch", &self.epoch)
            .field("hash", &self.hash)
            .field("data", &self.data)
            .field("actions", &self.actions)
            .finish()
    }
}
