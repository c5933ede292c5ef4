//! Rebuilds nested request data from flat form keys.
//!
//! Form submissions cannot express nesting, so clients flatten the data tree
//! into keys such as `data.user.name` or `data.items[2].title`. The builder
//! reverses that, producing the same tree a JSON decoder would produce for the
//! equivalent nested document.
//!
//! Shape rules:
//! - keys under the prefix nest inside the top-level member named by the
//!   prefix (`data.a.b` lands at `data -> a -> b`); other keys become
//!   top-level members as-is;
//! - `name[i]` binds a sequence to `name` and addresses position `i`, padding
//!   earlier positions with `{}` when the path continues and with `null` when
//!   `i` is the final step;
//! - keys deeper than `max_depth` steps below the prefix are rejected before
//!   anything is built;
//! - a key that needs a mapping where a sequence or scalar already lives (or
//!   the other way round) is rejected. Padding placeholders never conflict.

use crate::error::{RequestError, RequestResult};
use crate::value::{Mapping, UploadedFile, Value};

pub const DEFAULT_PREFIX: &str = "data.";
pub const DEFAULT_MAX_INDEX: usize = 10_000;
pub const DEFAULT_MAX_DEPTH: usize = 32;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathTreeBuilder {
    prefix: String,
    limits: Limits,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Limits {
    max_index: usize,
    /// Steps a key may take below the prefix, names and indices alike.
    max_depth: usize,
}

impl Default for PathTreeBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl PathTreeBuilder {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            limits: Limits {
                max_index: DEFAULT_MAX_INDEX,
                max_depth: DEFAULT_MAX_DEPTH,
            },
        }
    }

    pub fn with_max_index(mut self, max_index: usize) -> Self {
        self.limits.max_index = max_index;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.limits.max_depth = max_depth;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Name of the top-level member that prefixed keys nest under. Empty when
    /// the prefix is empty, in which case paths start at the top level.
    pub fn root_key(&self) -> &str {
        self.prefix.trim_end_matches('.')
    }

    pub fn build(&self, fields: &[(String, Value)]) -> RequestResult<Mapping> {
        self.build_with_files(fields, &[])
    }

    /// Build one tree from scalar fields followed by file parts.
    ///
    /// A file key carrying exactly one file stores that file; more than one
    /// stores them as a sequence in upload order. Keys without files are
    /// skipped.
    pub fn build_with_files(
        &self,
        fields: &[(String, Value)],
        files: &[(String, Vec<UploadedFile>)],
    ) -> RequestResult<Mapping> {
        let mut root = Mapping::new();
        for (key, value) in fields {
            self.insert(&mut root, key, value.clone())?;
        }
        for (key, parts) in files {
            let value = match parts.as_slice() {
                [] => continue,
                [single] => Value::File(single.clone()),
                many => Value::Sequence(many.iter().cloned().map(Value::File).collect()),
            };
            self.insert(&mut root, key, value)?;
        }
        Ok(root)
    }

    fn insert(&self, root: &mut Mapping, key: &str, value: Value) -> RequestResult<()> {
        let steps = match key.strip_prefix(self.prefix.as_str()) {
            Some(path) if !self.prefix.is_empty() => {
                let mut steps = vec![Step::Key(self.root_key())];
                steps.extend(parse_steps(path, key, self.limits)?);
                steps
            }
            Some(path) => parse_steps(path, key, self.limits)?,
            None => vec![Step::Key(key)],
        };
        insert_steps(root, &steps, value, key)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step<'a> {
    Key(&'a str),
    Index(usize),
}

fn parse_steps<'a>(path: &'a str, key: &str, limits: Limits) -> RequestResult<Vec<Step<'a>>> {
    if path.is_empty() {
        return Err(RequestError::path(key, "empty path after prefix"));
    }
    let mut steps = Vec::new();
    for segment in path.split('.') {
        parse_segment(segment, key, limits, &mut steps)?;
    }
    Ok(steps)
}

fn parse_segment<'a>(
    segment: &'a str,
    key: &str,
    limits: Limits,
    steps: &mut Vec<Step<'a>>,
) -> RequestResult<()> {
    let (name, mut rest) = match segment.find('[') {
        Some(open) => segment.split_at(open),
        None => (segment, ""),
    };
    if name.is_empty() {
        return Err(RequestError::path(key, "empty path segment"));
    }
    if name.contains(']') {
        return Err(RequestError::path(
            key,
            format!("unexpected ']' in segment {segment:?}"),
        ));
    }
    push_step(steps, Step::Key(name), key, limits)?;

    while !rest.is_empty() {
        let Some(body) = rest.strip_prefix('[') else {
            return Err(RequestError::path(
                key,
                format!("unexpected text after index in segment {segment:?}"),
            ));
        };
        let Some(close) = body.find(']') else {
            return Err(RequestError::path(
                key,
                format!("unterminated index in segment {segment:?}"),
            ));
        };
        let digits = &body[..close];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(RequestError::path(
                key,
                format!("index {digits:?} is not a non-negative integer"),
            ));
        }
        let index: usize = digits
            .parse()
            .map_err(|_| RequestError::path(key, format!("index {digits} is out of range")))?;
        if index > limits.max_index {
            return Err(RequestError::path(
                key,
                format!("index {index} exceeds the limit of {}", limits.max_index),
            ));
        }
        push_step(steps, Step::Index(index), key, limits)?;
        rest = &body[close + 1..];
    }
    Ok(())
}

fn push_step<'a>(
    steps: &mut Vec<Step<'a>>,
    step: Step<'a>,
    key: &str,
    limits: Limits,
) -> RequestResult<()> {
    if steps.len() >= limits.max_depth {
        return Err(RequestError::path(key, "path nested too deeply"));
    }
    steps.push(step);
    Ok(())
}

fn insert_steps(root: &mut Mapping, steps: &[Step<'_>], value: Value, key: &str) -> RequestResult<()> {
    let Some((Step::Key(name), rest)) = steps.split_first() else {
        return Err(RequestError::path(key, "path must start with a name"));
    };
    let slot = root.entry_or_insert_with(name, || Value::Null);
    set_path(slot, rest, value, key)
}

fn set_path(slot: &mut Value, steps: &[Step<'_>], value: Value, key: &str) -> RequestResult<()> {
    let Some((step, rest)) = steps.split_first() else {
        return assign_leaf(slot, value, key);
    };
    let next = match step {
        Step::Key(name) => ensure_mapping(slot, key)?.entry_or_insert_with(name, || Value::Null),
        Step::Index(index) => {
            let items = ensure_sequence(slot, key)?;
            let filler = if rest.is_empty() {
                Value::Null
            } else {
                Value::empty_mapping()
            };
            if items.len() <= *index {
                items.resize(*index + 1, filler);
            }
            &mut items[*index]
        }
    };
    set_path(next, rest, value, key)
}

fn ensure_mapping<'v>(slot: &'v mut Value, key: &str) -> RequestResult<&'v mut Mapping> {
    if slot.is_null() {
        *slot = Value::empty_mapping();
    }
    match slot {
        Value::Mapping(entries) => Ok(entries),
        other => Err(shape_conflict(key, "mapping", other)),
    }
}

fn ensure_sequence<'v>(slot: &'v mut Value, key: &str) -> RequestResult<&'v mut Vec<Value>> {
    let is_placeholder = match slot {
        Value::Null => true,
        Value::Mapping(entries) => entries.is_empty(),
        _ => false,
    };
    if is_placeholder {
        *slot = Value::Sequence(Vec::new());
    }
    match slot {
        Value::Sequence(items) => Ok(items),
        other => Err(shape_conflict(key, "sequence", other)),
    }
}

fn assign_leaf(slot: &mut Value, value: Value, key: &str) -> RequestResult<()> {
    let occupied = match slot {
        Value::Mapping(entries) => !entries.is_empty(),
        Value::Sequence(items) => !items.is_empty(),
        _ => false,
    };
    if occupied {
        return Err(shape_conflict(key, value.kind(), slot));
    }
    *slot = value;
    Ok(())
}

fn shape_conflict(key: &str, expected: &str, found: &Value) -> RequestError {
    RequestError::path(
        key,
        format!(
            "expected {expected} at this path but an earlier key put a {} there",
            found.kind()
        ),
    )
}
