use crate::decode::TraceDecoder;
use crate::{Error, Result};
use rand::Rng;
use sheep_grid::Action;
use std::fmt;

/// Characters session identifiers are drawn from.
const SESSION_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Length of generated session identifiers.
pub const SESSION_ID_LEN: usize = 10;

/// Tag that separates one instrumented run's marker lines from everything
/// else the program prints.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a random identifier.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let id = (0..SESSION_ID_LEN)
            .map(|_| SESSION_ALPHABET[rng.gen_range(0..SESSION_ALPHABET.len())] as char)
            .collect();
        Self(id)
    }

    /// Use a fixed identifier.
    ///
    /// Only ASCII letters and digits are accepted; an underscore would make
    /// marker lines ambiguous.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(Error::InvalidSession(id));
        }
        Ok(Self(id))
    }

    /// The identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefix of action markers and call-count trailers: `__<session>__`.
    pub fn action_prefix(&self) -> String {
        format!("__{}__", self.0)
    }

    /// Prefix of the code-size marker: `__<session>_codesize__`.
    pub fn codesize_prefix(&self) -> String {
        format!("__{}_codesize__", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Wraps player source with action functions that report what they do.
///
/// Each action `v` becomes a goose function `v(n = 1)` that bumps a per-session
/// call counter once and prints `__<session>__v__` once per repetition. The
/// program opens with a code-size marker and ends with one call-count trailer
/// per action.
#[derive(Debug, Clone)]
pub struct Instrumentor {
    session: SessionId,
}

impl Default for Instrumentor {
    fn default() -> Self {
        Self::new()
    }
}

impl Instrumentor {
    /// Create an instrumentor with a fresh random session.
    pub fn new() -> Self {
        Self::with_session(SessionId::generate())
    }

    /// Create an instrumentor bound to `session`.
    pub fn with_session(session: SessionId) -> Self {
        Self { session }
    }

    /// The session tag of every marker this instrumentor emits.
    pub fn session(&self) -> &SessionId {
        &self.session
    }

    /// A decoder for output produced by programs from this instrumentor.
    pub fn decoder(&self) -> TraceDecoder {
        TraceDecoder::new(&self.session)
    }

    /// Build the self-contained program for `source`.
    pub fn instrument(&self, source: &str) -> String {
        let mut program = String::with_capacity(source.len() + 1024);

        program.push_str(&format!(
            "print(\"{}{}__\")\n",
            self.session.codesize_prefix(),
            source.chars().count()
        ));
        for action in Action::ALL {
            program.push_str(&self.wrapper(action));
        }

        program.push('\n');
        program.push_str(source);
        if !source.ends_with('\n') {
            program.push('\n');
        }
        program.push('\n');

        for action in Action::ALL {
            program.push_str(&self.trailer(action));
        }

        tracing::debug!(
            session = %self.session,
            source_chars = source.chars().count(),
            program_bytes = program.len(),
            "instrumented source"
        );
        program
    }

    /// Signature and description of every action function, in documentation order.
    pub fn documentation() -> Vec<(&'static str, &'static str)> {
        Action::ALL
            .into_iter()
            .map(|action| (action.signature(), action.description()))
            .collect()
    }

    fn counter(&self, action: Action) -> String {
        format!("{}{}__calls__", self.session.action_prefix(), action.name())
    }

    fn wrapper(&self, action: Action) -> String {
        let counter = self.counter(action);
        let name = action.name();
        let marker = format!("{}{}__", self.session.action_prefix(), name);
        format!(
            "let {counter} = 0\n\
             fn {name}(n = 1)\n\
             {counter}++\n\
             repeat n times print(\"{marker}\") end\n\
             end\n"
        )
    }

    fn trailer(&self, action: Action) -> String {
        let counter = self.counter(action);
        format!("print(\"{counter}${{{counter}}}__\")\n")
    }
}
