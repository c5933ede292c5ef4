use crate::call_method::{parse_call_method_name, MethodCall};
use crate::error::{RequestError, RequestResult};
use crate::value::{Mapping, Value};

pub const SYNC_INPUT: &str = "syncInput";
pub const CALL_METHOD: &str = "callMethod";

pub const REFRESH_METHOD: &str = "$refresh";
pub const RESET_METHOD: &str = "$reset";
pub const TOGGLE_METHOD: &str = "$toggle";

/// One `actionQueue` entry as submitted, before classification.
///
/// `extra` keeps any members besides `type` and `payload` (clients send
/// partial-render hints there) so nothing in the entry is lost.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct RawAction {
    pub action_type: String,
    pub payload: Mapping,
    pub extra: Mapping,
}

impl RawAction {
    pub fn new(action_type: impl Into<String>, payload: Mapping) -> Self {
        Self {
            action_type: action_type.into(),
            payload,
            extra: Mapping::new(),
        }
    }

    /// Read one queue entry. `index` is only used for error messages.
    pub fn from_value(index: usize, value: Value) -> RequestResult<Self> {
        let mut entry = match value {
            Value::Mapping(entry) => entry,
            other => {
                return Err(RequestError::BodyParse(format!(
                    "actionQueue[{index}] must be an object, found {}",
                    other.kind()
                )))
            }
        };
        let action_type = match entry.remove("type") {
            Some(Value::String(action_type)) => action_type,
            _ => String::new(),
        };
        let payload = match entry.remove("payload") {
            None | Some(Value::Null) => Mapping::new(),
            Some(Value::Mapping(payload)) => payload,
            Some(other) => {
                return Err(RequestError::BodyParse(format!(
                    "actionQueue[{index}].payload must be an object, found {}",
                    other.kind()
                )))
            }
        };
        Ok(Self {
            action_type,
            payload,
            extra: entry,
        })
    }

    /// The method expression of a `callMethod` payload; empty when absent.
    pub fn method_expression(&self) -> &str {
        self.payload
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    SyncInput,
    CallMethod,
    Refresh,
    Reset,
    Toggle,
    Generic,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::SyncInput => "sync_input",
            ActionKind::CallMethod => "call_method",
            ActionKind::Refresh => "refresh",
            ActionKind::Reset => "reset",
            ActionKind::Toggle => "toggle",
            ActionKind::Generic => "generic",
        }
    }
}

/// A classified queue entry. Every variant keeps the submitted entry; the
/// method-call variants also keep the parsed call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    SyncInput(RawAction),
    CallMethod { raw: RawAction, call: MethodCall },
    Refresh { raw: RawAction, call: MethodCall },
    Reset { raw: RawAction, call: MethodCall },
    Toggle { raw: RawAction, call: MethodCall },
    Generic(RawAction),
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::SyncInput(_) => ActionKind::SyncInput,
            Action::CallMethod { .. } => ActionKind::CallMethod,
            Action::Refresh { .. } => ActionKind::Refresh,
            Action::Reset { .. } => ActionKind::Reset,
            Action::Toggle { .. } => ActionKind::Toggle,
            Action::Generic(_) => ActionKind::Generic,
        }
    }

    pub fn raw(&self) -> &RawAction {
        match self {
            Action::SyncInput(raw) | Action::Generic(raw) => raw,
            Action::CallMethod { raw, .. }
            | Action::Refresh { raw, .. }
            | Action::Reset { raw, .. }
            | Action::Toggle { raw, .. } => raw,
        }
    }

    pub fn payload(&self) -> &Mapping {
        &self.raw().payload
    }

    pub fn method_call(&self) -> Option<&MethodCall> {
        match self {
            Action::CallMethod { call, .. }
            | Action::Refresh { call, .. }
            | Action::Reset { call, .. }
            | Action::Toggle { call, .. } => Some(call),
            Action::SyncInput(_) | Action::Generic(_) => None,
        }
    }
}

/// Classify one entry. Only an unparseable `callMethod` name fails.
pub fn classify(index: usize, raw: RawAction) -> RequestResult<Action> {
    match raw.action_type.as_str() {
        SYNC_INPUT => Ok(Action::SyncInput(raw)),
        CALL_METHOD => {
            let call = parse_call_method_name(raw.method_expression()).map_err(|err| {
                RequestError::ActionClassification {
                    index,
                    name: raw.method_expression().to_string(),
                    reason: err.to_string(),
                }
            })?;
            Ok(match call.name.as_str() {
                REFRESH_METHOD => Action::Refresh { raw, call },
                RESET_METHOD => Action::Reset { raw, call },
                TOGGLE_METHOD => Action::Toggle { raw, call },
                _ => Action::CallMethod { raw, call },
            })
        }
        _ => Ok(Action::Generic(raw)),
    }
}

/// Classify a whole queue, preserving submission order.
pub fn classify_queue(queue: Vec<RawAction>) -> RequestResult<Vec<Action>> {
    queue
        .into_iter()
        .enumerate()
        .map(|(index, raw)| classify(index, raw))
        .collect()
}
