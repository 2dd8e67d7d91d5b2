use std::fmt;

/// One AMI message: an ordered list of headers. Header names are matched
/// case-insensitively, as the switch does.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AmiMessage {
    headers: Vec<(String, String)>,
}

impl AmiMessage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an outbound action block (`Action: <name>`).
    pub fn action(name: &str) -> Self {
        Self::new().with("Action", name)
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: &str, value: &str) {
        self.headers.push((key.to_string(), value.to_string()));
    }

    /// First value for `key`, trimmed.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.trim())
    }

    /// Like [`get`](Self::get), but treats an empty value as absent.
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Messages with an `Event` header are asynchronous notifications;
    /// everything else is a response to an action.
    pub fn into_event(self) -> Option<AmiEvent> {
        let tag = self.get_non_empty("Event")?.to_string();
        Some(AmiEvent { tag, fields: self })
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AmiMessage {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            headers: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// Renders as a compact `{Key: Value, ...}` so warnings can carry the whole
// offending event on one line.
impl fmt::Debug for AmiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.headers.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}

/// A tagged notification from the control channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmiEvent {
    pub tag: String,
    pub fields: AmiMessage,
}

impl AmiEvent {
    /// Build an event from bare fields; the `Event` header is added first.
    pub fn new<K, V, I>(tag: &str, fields: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut message = AmiMessage::new().with("Event", tag);
        for (k, v) in fields {
            let (k, v): (String, String) = (k.into(), v.into());
            message.push(&k, &v);
        }
        Self {
            tag: tag.to_string(),
            fields: message,
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name)
    }
}
