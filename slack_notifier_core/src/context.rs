/**
 * Context captured alongside an error.
 *
 * - `RequestSnapshot`: the HTTP request being served when the error happened.
 * - `CommandSnapshot`: the CLI command being run.
 * - `ExecutionContext`: variables in scope where a runtime error was raised.
 *
 * Key→value bags are `BTreeMap`s, so iteration is always in ascending key
 * order; this is the order in which they are rendered.
 */
use std::collections::BTreeMap;

pub type ParameterBag = BTreeMap<String, String>;

// ---------------------------------------------------------------------------
// RequestSnapshot
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestSnapshot {
    pub host: String,
    /// Full request URI, scheme and query included.
    pub uri: String,
    pub client_ip: String,
    pub user_agent: Option<String>,

    pub query: ParameterBag,
    pub post: ParameterBag,
    pub attributes: ParameterBag,
    pub cookies: ParameterBag,
    pub headers: ParameterBag,
    pub server: ParameterBag,
    pub session: ParameterBag,
}

impl RequestSnapshot {
    pub fn new(host: impl Into<String>, uri: impl Into<String>, client_ip: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            uri: uri.into(),
            client_ip: client_ip.into(),
            ..Default::default()
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

// ---------------------------------------------------------------------------
// CommandSnapshot
// ---------------------------------------------------------------------------

/**
 * A CLI command and the input it was started with.
 *
 * Options and arguments keep the order the command declared them in.
 */
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandSnapshot {
    pub name: String,
    pub options: Vec<(String, String)>,
    pub arguments: Vec<(String, String)>,
}

impl CommandSnapshot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push((name.into(), value.into()));
        self
    }

    pub fn argument(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.arguments.push((name.into(), value.into()));
        self
    }
}

// ---------------------------------------------------------------------------
// ExecutionContext
// ---------------------------------------------------------------------------

/// Variable name → display value, as seen where a runtime error was raised.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionContext {
    variables: Vec<(String, String)>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.variables.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.variables.push((name, value)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.variables.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}
