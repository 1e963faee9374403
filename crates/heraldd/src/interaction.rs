//! Inbound interaction events and their typed options.
//!
//! An [`Interaction`] is what the platform client hands to the router: a
//! command name, the invoking actor, an optional realm, and a tree of typed
//! options. Group commands receive their subcommand as a nested option.

use herald_perms::{RealmId, UserId};
use serde::{Deserialize, Serialize};

/// Whether the event asks for execution or for option suggestions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    /// Execute the named command.
    #[default]
    Command,
    /// Suggest values for the focused option.
    Autocomplete,
}

/// One inbound event from the platform client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    /// Platform-assigned interaction id, echoed on every outbound message.
    pub id: String,
    /// Event classification.
    #[serde(default)]
    pub kind: InteractionKind,
    /// Top-level command name.
    pub name: String,
    /// Options supplied with the command.
    #[serde(default)]
    pub options: Vec<CommandOption>,
    /// Invoking user.
    pub actor: UserId,
    /// Realm the command was used in; absent for direct messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realm: Option<RealmId>,
}

impl Interaction {
    /// Builds a command interaction without options.
    pub fn command(id: impl Into<String>, name: impl Into<String>, actor: UserId) -> Self {
        Self {
            id: id.into(),
            kind: InteractionKind::Command,
            name: name.into(),
            options: Vec::new(),
            actor,
            realm: None,
        }
    }

    /// Builds an autocomplete interaction without options.
    pub fn autocomplete(id: impl Into<String>, name: impl Into<String>, actor: UserId) -> Self {
        Self {
            kind: InteractionKind::Autocomplete,
            ..Self::command(id, name, actor)
        }
    }

    /// Sets the realm.
    #[must_use]
    pub fn in_realm(mut self, realm: RealmId) -> Self {
        self.realm = Some(realm);
        self
    }

    /// Appends an option.
    #[must_use]
    pub fn with_option(mut self, option: CommandOption) -> Self {
        self.options.push(option);
        self
    }

    /// Realm id, treating an empty id as absent.
    #[must_use]
    pub fn realm(&self) -> Option<&RealmId> {
        self.realm
            .as_ref()
            .filter(|realm| !realm.as_str().trim().is_empty())
    }
}

/// A named option value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOption {
    /// Option name as declared by the command.
    pub name: String,
    /// Typed value.
    pub value: OptionValue,
    /// Set on the option being typed during autocomplete.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub focused: bool,
}

impl CommandOption {
    /// Builds an option.
    pub fn new(name: impl Into<String>, value: OptionValue) -> Self {
        Self {
            name: name.into(),
            value,
            focused: false,
        }
    }

    /// Builds a string option.
    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, OptionValue::String(value.into()))
    }

    /// Builds a boolean option.
    pub fn boolean(name: impl Into<String>, value: bool) -> Self {
        Self::new(name, OptionValue::Bool(value))
    }

    /// Builds a subcommand option carrying nested options.
    pub fn subcommand(name: impl Into<String>, options: Vec<CommandOption>) -> Self {
        Self::new(name, OptionValue::Subcommand(options))
    }

    /// Marks the option as focused.
    #[must_use]
    pub fn focused(mut self) -> Self {
        self.focused = true;
        self
    }
}

/// Typed option payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionValue {
    /// Free text.
    String(String),
    /// Boolean flag.
    Bool(bool),
    /// Whole number.
    Integer(i64),
    /// Floating point number.
    Number(f64),
    /// User mention.
    User(UserId),
    /// Channel mention.
    Channel(String),
    /// Nested subcommand and its options.
    Subcommand(Vec<CommandOption>),
}

impl OptionValue {
    /// Declared kind matching this value, `None` for subcommands.
    #[must_use]
    pub const fn kind(&self) -> Option<OptionKind> {
        match self {
            Self::String(_) => Some(OptionKind::String),
            Self::Bool(_) => Some(OptionKind::Bool),
            Self::Integer(_) => Some(OptionKind::Integer),
            Self::Number(_) => Some(OptionKind::Number),
            Self::User(_) => Some(OptionKind::User),
            Self::Channel(_) => Some(OptionKind::Channel),
            Self::Subcommand(_) => None,
        }
    }
}

/// Kinds an option may be declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// Free text.
    String,
    /// Boolean flag.
    Bool,
    /// Whole number.
    Integer,
    /// Floating point number; integers are accepted too.
    Number,
    /// User mention.
    User,
    /// Channel mention.
    Channel,
}

impl OptionKind {
    /// Returns whether `value` satisfies this declared kind.
    #[must_use]
    pub const fn accepts(self, value: &OptionValue) -> bool {
        matches!(
            (self, value),
            (Self::String, OptionValue::String(_))
                | (Self::Bool, OptionValue::Bool(_))
                | (Self::Integer, OptionValue::Integer(_))
                | (Self::Number, OptionValue::Number(_) | OptionValue::Integer(_))
                | (Self::User, OptionValue::User(_))
                | (Self::Channel, OptionValue::Channel(_))
        )
    }
}

/// Read-only view over the options of one command level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionSet {
    options: Vec<CommandOption>,
}

impl OptionSet {
    /// Wraps raw options.
    pub fn new(options: Vec<CommandOption>) -> Self {
        Self { options }
    }

    /// Raw options.
    #[must_use]
    pub fn as_slice(&self) -> &[CommandOption] {
        &self.options
    }

    /// Value of the option called `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.options
            .iter()
            .find(|option| option.name == name)
            .map(|option| &option.value)
    }

    /// String value of `name`, trimmed; blank strings count as absent.
    #[must_use]
    pub fn string(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(OptionValue::String(value)) => Some(value.trim()).filter(|value| !value.is_empty()),
            _ => None,
        }
    }

    /// Boolean value of `name`.
    #[must_use]
    pub fn boolean(&self, name: &str) -> Option<bool> {
        match self.get(name) {
            Some(OptionValue::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    /// Integer value of `name`.
    #[must_use]
    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            Some(OptionValue::Integer(value)) => Some(*value),
            _ => None,
        }
    }

    /// User value of `name`.
    #[must_use]
    pub fn user(&self, name: &str) -> Option<&UserId> {
        match self.get(name) {
            Some(OptionValue::User(value)) => Some(value),
            _ => None,
        }
    }

    /// First subcommand option and its nested options.
    #[must_use]
    pub fn subcommand(&self) -> Option<(&str, &[CommandOption])> {
        self.options.iter().find_map(|option| match &option.value {
            OptionValue::Subcommand(nested) => Some((option.name.as_str(), nested.as_slice())),
            _ => None,
        })
    }

    /// Focused option at this level or inside the first subcommand.
    #[must_use]
    pub fn focused(&self) -> Option<&CommandOption> {
        self.options.iter().find(|option| option.focused).or_else(|| {
            self.options.iter().find_map(|option| match &option.value {
                OptionValue::Subcommand(nested) => nested.iter().find(|inner| inner.focused),
                _ => None,
            })
        })
    }
}
