use crate::action::RawAction;
use crate::error::{RequestError, RequestResult};
use crate::path::{PathTreeBuilder, DEFAULT_MAX_DEPTH, DEFAULT_MAX_INDEX, DEFAULT_PREFIX};
use crate::serde_support::from_json_slice;
use crate::value::{Mapping, UploadedFile, Value};

pub const ACTION_QUEUE_FIELD: &str = "actionQueue";
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// What the HTTP layer hands over: the declared content type, the raw body,
/// and for multipart requests the already split form fields and file parts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InboundRequest {
    pub content_type: Option<String>,
    pub path: String,
    pub body: Vec<u8>,
    pub form: Vec<(String, String)>,
    pub files: Vec<(String, Vec<UploadedFile>)>,
}

impl InboundRequest {
    pub fn json(path: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type: Some("application/json".to_string()),
            path: path.into(),
            body: body.into(),
            ..Default::default()
        }
    }

    pub fn multipart(
        path: impl Into<String>,
        form: Vec<(String, String)>,
        files: Vec<(String, Vec<UploadedFile>)>,
    ) -> Self {
        Self {
            content_type: Some(format!("{MULTIPART_FORM_DATA}; boundary=compreq")),
            path: path.into(),
            body: Vec::new(),
            form,
            files,
        }
    }

    pub fn is_multipart(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|content_type| content_type.contains(MULTIPART_FORM_DATA))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Highest sequence index a form key may address.
    pub max_index: usize,
    /// Deepest path a form key may describe below the data prefix.
    pub max_depth: usize,
    /// Largest raw JSON body accepted.
    pub max_body_bytes: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_index: DEFAULT_MAX_INDEX,
            max_depth: DEFAULT_MAX_DEPTH,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// A decoded request body, independent of the wire encoding it came in.
///
/// Required members are kept as `Option` here; rejecting their absence is
/// the job of [`crate::ComponentRequest`], so callers can tell a malformed
/// body from an incomplete one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogicalDocument {
    pub checksum: Option<String>,
    pub id: Option<String>,
    pub epoch: Option<String>,
    /// Defaults to `""`.
    pub key: String,
    /// Defaults to `""`.
    pub hash: String,
    /// `None` when absent or `null`.
    pub data: Option<Value>,
    pub action_queue: Vec<RawAction>,
}

impl LogicalDocument {
    pub fn from_body(mut body: Mapping) -> RequestResult<Self> {
        let action_queue = match body.remove(ACTION_QUEUE_FIELD) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Sequence(entries)) => entries
                .into_iter()
                .enumerate()
                .map(|(index, entry)| RawAction::from_value(index, entry))
                .collect::<RequestResult<Vec<_>>>()?,
            Some(other) => {
                return Err(RequestError::BodyParse(format!(
                    "{ACTION_QUEUE_FIELD} must be a list, found {}",
                    other.kind()
                )))
            }
        };

        Ok(Self {
            checksum: text_member(&body, "checksum"),
            id: required_member(&body, "id"),
            epoch: required_member(&body, "epoch"),
            key: text_member(&body, "key").unwrap_or_default(),
            hash: text_member(&body, "hash").unwrap_or_default(),
            data: body.remove("data").filter(|data| !data.is_null()),
            action_queue,
        })
    }
}

/// Decode the request body with default options.
pub fn decode(request: &InboundRequest) -> RequestResult<LogicalDocument> {
    decode_with_options(request, &DecodeOptions::default())
}

pub fn decode_with_options(
    request: &InboundRequest,
    options: &DecodeOptions,
) -> RequestResult<LogicalDocument> {
    let body = if request.is_multipart() {
        tracing::debug!(
            path = %request.path,
            fields = request.form.len(),
            files = request.files.len(),
            "decoding multipart component request"
        );
        decode_form(&request.form, &request.files, options)?
    } else {
        tracing::debug!(
            path = %request.path,
            bytes = request.body.len(),
            "decoding json component request"
        );
        decode_json(&request.body, options)?
    };
    LogicalDocument::from_body(body)
}

fn decode_json(raw: &[u8], options: &DecodeOptions) -> RequestResult<Mapping> {
    if raw.len() > options.max_body_bytes {
        return Err(RequestError::BodyParse(format!(
            "body is {} bytes, limit is {}",
            raw.len(),
            options.max_body_bytes
        )));
    }
    match from_json_slice(raw)? {
        value if value.is_falsy() => Err(RequestError::BodyParse("Invalid body".into())),
        Value::Mapping(body) => Ok(body),
        other => Err(RequestError::BodyParse(format!(
            "body must be a JSON object, found {}",
            other.kind()
        ))),
    }
}

/// Rebuild the body from form fields and file parts. The action queue always
/// travels as JSON text, so it is decoded here instead of being path-split.
fn decode_form(
    form: &[(String, String)],
    files: &[(String, Vec<UploadedFile>)],
    options: &DecodeOptions,
) -> RequestResult<Mapping> {
    let mut fields = Vec::with_capacity(form.len());
    for (key, value) in form {
        let value = if key == ACTION_QUEUE_FIELD {
            serde_json::from_str::<Value>(value).map_err(|err| {
                RequestError::BodyParse(format!("{ACTION_QUEUE_FIELD} is not valid JSON: {err}"))
            })?
        } else {
            Value::String(value.clone())
        };
        fields.push((key.clone(), value));
    }

    let body = PathTreeBuilder::new(DEFAULT_PREFIX)
        .with_max_index(options.max_index)
        .with_max_depth(options.max_depth)
        .build_with_files(&fields, files)?;
    if body.is_empty() {
        return Err(RequestError::BodyParse("Invalid body".into()));
    }
    Ok(body)
}

/// `id` and `epoch` count as absent when falsy, so `0` is as missing as `""`.
fn required_member(body: &Mapping, key: &str) -> Option<String> {
    match body.get(key) {
        Some(value) if !value.is_falsy() => text_member(body, key),
        _ => None,
    }
}

fn text_member(body: &Mapping, key: &str) -> Option<String> {
    match body.get(key)? {
        value @ (Value::String(_) | Value::Int(_) | Value::UInt(_) | Value::Float(_)) => {
            value.scalar_text()
        }
        _ => None,
    }
}
