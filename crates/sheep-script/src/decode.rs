use crate::instrument::SessionId;
use crate::{Error, Result};
use sheep_grid::{Action, ExecutionTrace};

/// Parses the stdout of an instrumented run back into an [`ExecutionTrace`].
///
/// Only lines carrying this decoder's session prefix are interpreted; every
/// other line is ordinary program output. A tagged line of unknown shape
/// aborts the whole decode.
#[derive(Debug, Clone)]
pub struct TraceDecoder {
    action_prefix: String,
    codesize_prefix: String,
}

impl TraceDecoder {
    /// Create a decoder for markers tagged with `session`.
    pub fn new(session: &SessionId) -> Self {
        Self {
            action_prefix: session.action_prefix(),
            codesize_prefix: session.codesize_prefix(),
        }
    }

    /// Decode `output`.
    ///
    /// Output of a run that stopped early decodes to a shorter trace; only a
    /// malformed tagged line is an error.
    pub fn decode(&self, output: &str) -> Result<ExecutionTrace> {
        let mut trace = ExecutionTrace::new();

        for line in lines(output) {
            if let Some(body) = line.strip_prefix(&self.action_prefix) {
                self.decode_action(line, body, &mut trace)?;
            } else if let Some(body) = line.strip_prefix(&self.codesize_prefix) {
                let size = body
                    .strip_suffix("__")
                    .and_then(parse_decimal)
                    .ok_or_else(|| Error::protocol(line, "malformed code-size marker"))?;
                trace.set_size(size);
            }
        }

        tracing::debug!(
            actions = trace.actions().len(),
            calls = trace.call_count(),
            size = trace.size(),
            "decoded execution trace"
        );
        Ok(trace)
    }

    /// Lines of `output` that are not session markers.
    pub fn program_output<'a>(&self, output: &'a str) -> Vec<&'a str> {
        lines(output)
            .filter(|line| {
                !line.starts_with(&self.action_prefix) && !line.starts_with(&self.codesize_prefix)
            })
            .collect()
    }

    fn decode_action(&self, line: &str, body: &str, trace: &mut ExecutionTrace) -> Result<()> {
        let body = body
            .strip_suffix("__")
            .ok_or_else(|| Error::protocol(line, "unterminated action marker"))?;

        match body.split_once("__calls__") {
            Some((verb, count)) => {
                let action = parse_action(line, verb)?;
                let count = parse_decimal(count)
                    .ok_or_else(|| Error::protocol(line, "malformed call count"))?;
                if !trace.record_calls(action, count) {
                    return Err(Error::protocol(line, "duplicate call-count trailer"));
                }
            }
            None => trace.push_action(parse_action(line, body)?),
        }
        Ok(())
    }
}

fn lines(output: &str) -> impl Iterator<Item = &str> {
    output
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
}

fn parse_action(line: &str, verb: &str) -> Result<Action> {
    verb.parse()
        .map_err(|_| Error::protocol(line, format!("unknown action {verb:?}")))
}

/// Plain ASCII digits only; no sign, no whitespace.
fn parse_decimal(text: &str) -> Option<u32> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoder() -> TraceDecoder {
        TraceDecoder::new(&SessionId::new("s1").unwrap())
    }

    #[test]
    fn forward_three_is_one_call_three_actions() {
        let output = "__s1_codesize__10__\n\
                      __s1__forward__\n\
                      __s1__forward__\n\
                      __s1__forward__\n\
                      __s1__forward__calls__1__\n\
                      __s1__backward__calls__0__\n";
        let trace = decoder().decode(output).unwrap();

        assert_eq!(trace.actions(), &[Action::Forward; 3]);
        assert_eq!(trace.calls_of(Action::Forward), 1);
        assert_eq!(trace.calls_of(Action::Backward), 0);
        assert_eq!(trace.calls().len(), 2);
        assert_eq!(trace.call_count(), 1);
        assert_eq!(trace.size(), 10);
    }

    #[test]
    fn user_output_is_ignored() {
        let output = "hello\n__s1__left__\n__x__right__\n__s1 __forward__\n";
        let trace = decoder().decode(output).unwrap();
        assert_eq!(trace.actions(), &[Action::Left]);
        assert_eq!(
            decoder().program_output(output),
            vec!["hello", "__x__right__", "__s1 __forward__", ""]
        );
    }

    #[test]
    fn carriage_returns_are_stripped() {
        let trace = decoder()
            .decode("__s1__left__\r\n__s1__left__calls__1__\r\n")
            .unwrap();
        assert_eq!(trace.actions(), &[Action::Left]);
        assert_eq!(trace.calls_of(Action::Left), 1);
    }

    #[test]
    fn unknown_verb_is_a_protocol_error() {
        let err = decoder().decode("__s1__jump__\n").unwrap_err();
        assert!(matches!(err, Error::Protocol { ref line, .. } if line == "__s1__jump__"));
    }

    #[test]
    fn malformed_lines_abort_decode() {
        for line in [
            "__s1__forward",
            "__s1__forward__calls____",
            "__s1__forward__calls__-1__",
            "__s1__forward__calls__99999999999__",
            "__s1__forward__calls__3__x__",
            "__s1_codesize__abc__",
            "__s1_codesize__12",
        ] {
            let output = format!("__s1__left__\n{line}\n");
            assert!(decoder().decode(&output).is_err(), "{line} should fail");
        }
    }

    #[test]
    fn duplicate_trailer_is_rejected() {
        let output = "__s1__left__calls__1__\n__s1__left__calls__1__\n";
        let err = decoder().decode(output).unwrap_err();
        assert!(matches!(err, Error::Protocol { reason, .. } if reason.contains("duplicate")));
    }

    #[test]
    fn truncated_output_decodes_partially() {
        let output = "__s1_codesize__4__\n__s1__turnRight__\npanic: boom";
        let trace = decoder().decode(output).unwrap();
        assert_eq!(trace.actions(), &[Action::TurnRight]);
        assert_eq!(trace.call_count(), 0);
        assert!(trace.calls().is_empty());
    }
}
