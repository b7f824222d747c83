/// Winnow-based parser for the recorded history log.
///
/// Grammar (commas are whitespace, as in EDN):
/// ```text
/// history = "[" record* "]"
/// record  = "{" (keyword value)* "}"
/// value   = keyword | integer | "nil" | "[" value* "]"
/// keyword = ":" IDENT
/// ```
///
/// A record carries the fields the recorder writes:
/// `:type` (`:invoke`/`:ok`/`:fail`/`:info`), `:f` (operation name),
/// `:value` (list of `[verb key value-or-nil]` triples), `:process`,
/// `:commitTimestamp`, and optionally `:realTimestamp`.
use histcop_core::history::{Action, ActionVerb, Event, EventKind, Timestamp};
use winnow::ascii::dec_int;
use winnow::combinator::{alt, delimited, opt, preceded, repeat, terminated};
use winnow::prelude::*;
use winnow::token::{literal, take_while};
use winnow::ModalResult;

use crate::literal::Literal;

// ---------------------------------------------------------------------------
// Public error type
// ---------------------------------------------------------------------------

/// A parse error with human-readable location information.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl core::fmt::Display for ParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "parse error at line {}, column {}: {}",
            self.line, self.column, self.message
        )
    }
}

impl std::error::Error for ParseError {}

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Parse a recorded history log into the event sequence, in file order.
///
/// # Errors
///
/// Returns a [`ParseError`] with line/column information when the input
/// does not conform to the grammar or a record is missing required fields.
/// Nothing is returned for a partially parseable input: a corrupt history
/// must never be half-checked.
pub fn parse_history(input: &str) -> Result<Vec<Event>, ParseError> {
    let original = input;
    let mut stream: &str = input;

    if let Err(e) = opening(&mut stream) {
        return Err(locate(original, stream, e.to_string()));
    }

    let mut events = Vec::new();
    loop {
        match opt(closing).parse_next(&mut stream) {
            Ok(Some(())) => break,
            Ok(None) => {}
            Err(e) => return Err(locate(original, stream, e.to_string())),
        }
        match record(&mut stream) {
            Ok(fields) => {
                let event =
                    build_event(&fields).map_err(|message| locate(original, stream, message))?;
                events.push(event);
            }
            Err(e) => return Err(locate(original, stream, e.to_string())),
        }
    }

    if stream.is_empty() {
        Ok(events)
    } else {
        Err(locate(
            original,
            stream,
            "trailing input after history".to_string(),
        ))
    }
}

// ---------------------------------------------------------------------------
// Location helper
// ---------------------------------------------------------------------------

/// Attach the 1-based line/column of the first unconsumed byte to a message.
fn locate(original: &str, remaining: &str, message: String) -> ParseError {
    let consumed = original.len().saturating_sub(remaining.len());
    let prefix = &original[..consumed.min(original.len())];
    let line = prefix.bytes().filter(|&b| b == b'\n').count() + 1;
    let column = match prefix.rfind('\n') {
        Some(pos) => prefix.len() - pos,
        None => prefix.len() + 1,
    };
    ParseError {
        message,
        line,
        column,
    }
}

// ---------------------------------------------------------------------------
// Grammar
// ---------------------------------------------------------------------------

/// Whitespace, including commas -- EDN treats `,` as whitespace.
fn ws(input: &mut &str) -> ModalResult<()> {
    take_while(0.., |c: char| c.is_whitespace() || c == ',')
        .void()
        .parse_next(input)
}

fn opening(input: &mut &str) -> ModalResult<()> {
    (ws, literal("["), ws).void().parse_next(input)
}

fn closing(input: &mut &str) -> ModalResult<()> {
    (literal("]"), ws).void().parse_next(input)
}

/// `":" IDENT` -- returned without the leading colon.
fn keyword(input: &mut &str) -> ModalResult<String> {
    preceded(
        literal(":"),
        take_while(1.., |c: char| c.is_alphanumeric() || c == '_' || c == '-'),
    )
    .map(str::to_string)
    .parse_next(input)
}

fn list(input: &mut &str) -> ModalResult<Literal> {
    delimited(
        (literal("["), ws),
        repeat(0.., terminated(value, ws)),
        literal("]"),
    )
    .map(Literal::List)
    .parse_next(input)
}

fn value(input: &mut &str) -> ModalResult<Literal> {
    alt((
        literal("nil").value(Literal::Nil),
        keyword.map(Literal::Symbol),
        dec_int.map(Literal::Int),
        list,
    ))
    .parse_next(input)
}

/// `"{" (keyword value)* "}"` as a field list; a duplicate key keeps the
/// last occurrence, matching map semantics.
fn record(input: &mut &str) -> ModalResult<Vec<(String, Literal)>> {
    delimited(
        (literal("{"), ws),
        repeat(0.., terminated((terminated(keyword, ws), value), ws)),
        (literal("}"), ws),
    )
    .parse_next(input)
}

// ---------------------------------------------------------------------------
// Typed extraction
// ---------------------------------------------------------------------------

fn build_event(fields: &[(String, Literal)]) -> Result<Event, String> {
    let mut kind = None;
    let mut operation_name = None;
    let mut actions = None;
    let mut process_id = None;
    let mut commit_timestamp = None;
    let mut real_timestamp = None;

    for (field, raw) in fields {
        match field.as_str() {
            "type" => kind = Some(event_kind(raw)?),
            "f" => {
                operation_name = Some(
                    raw.as_symbol()
                        .ok_or_else(|| format!("expected a symbol for :f, got {raw:?}"))?
                        .to_string(),
                );
            }
            "value" => actions = Some(action_list(raw)?),
            "process" => {
                let id = raw
                    .as_int()
                    .ok_or_else(|| format!("expected an integer for :process, got {raw:?}"))?;
                process_id =
                    Some(u64::try_from(id).map_err(|_| format!("negative :process {id}"))?);
            }
            "commitTimestamp" => {
                commit_timestamp = Some(Timestamp(raw.as_int().ok_or_else(|| {
                    format!("expected an integer for :commitTimestamp, got {raw:?}")
                })?));
            }
            "realTimestamp" => {
                real_timestamp = Some(Timestamp(raw.as_int().ok_or_else(|| {
                    format!("expected an integer for :realTimestamp, got {raw:?}")
                })?));
            }
            other => return Err(format!("unknown record field :{other}")),
        }
    }

    Ok(Event {
        kind: kind.ok_or("record is missing :type")?,
        operation_name: operation_name.ok_or("record is missing :f")?,
        actions: actions.ok_or("record is missing :value")?,
        process_id: process_id.ok_or("record is missing :process")?,
        commit_timestamp: commit_timestamp.ok_or("record is missing :commitTimestamp")?,
        real_timestamp,
    })
}

fn event_kind(raw: &Literal) -> Result<EventKind, String> {
    match raw.as_symbol() {
        Some("invoke") => Ok(EventKind::Invoke),
        Some("ok") => Ok(EventKind::Ok),
        Some("fail") => Ok(EventKind::Fail),
        Some("info") => Ok(EventKind::Info),
        _ => Err(format!("unknown event type {raw:?}")),
    }
}

fn action_list(raw: &Literal) -> Result<Vec<Action>, String> {
    raw.as_list()
        .ok_or_else(|| format!("expected a list for :value, got {raw:?}"))?
        .iter()
        .map(action)
        .collect()
}

/// One `[verb key value-or-nil]` triple.
fn action(raw: &Literal) -> Result<Action, String> {
    let Some([verb, key, value]) = raw.as_list() else {
        return Err(format!("expected a [verb key value] triple, got {raw:?}"));
    };

    let verb = match verb.as_symbol() {
        Some("read") => ActionVerb::Read,
        Some("write") => ActionVerb::Write,
        _ => return Err(format!("unknown action verb {verb:?}")),
    };
    let key = key
        .as_symbol()
        .ok_or_else(|| format!("expected a key symbol, got {key:?}"))?
        .to_string();
    let value = if value.is_nil() {
        None
    } else {
        Some(
            value
                .as_int()
                .ok_or_else(|| format!("expected an integer or nil, got {value:?}"))?,
        )
    };

    Ok(Action { verb, key, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_basic_history() {
        let input = "[{:type :invoke, :f :txn, :value [[:read :x nil] [:read :y nil]], \
                      :process 0, :commitTimestamp 2, :realTimestamp 0}\
                      {:type :ok, :f :txn, :value [[:read :x 0] [:read :y 0]], :process 0,\
                      :commitTimestamp 2, :realTimestamp 3}]";
        let events = parse_history(input).expect("history should parse");
        assert_eq!(events.len(), 2);

        assert_eq!(events[0].kind, EventKind::Invoke);
        assert_eq!(events[0].operation_name, "txn");
        assert_eq!(events[0].process_id, 0);
        assert_eq!(events[0].commit_timestamp, Timestamp(2));
        assert_eq!(events[0].real_timestamp, Some(Timestamp(0)));
        assert_eq!(
            events[0].actions,
            vec![Action::read("x".to_string()), Action::read("y".to_string())]
        );

        assert_eq!(events[1].kind, EventKind::Ok);
        assert_eq!(
            events[1].actions,
            vec![
                Action::read_value("x".to_string(), 0),
                Action::read_value("y".to_string(), 0),
            ]
        );
    }

    #[test]
    fn parses_writes_and_negative_integers() {
        let input = "[{:type :ok, :f :txn, :value [[:write :x -3]], :process 1, \
                      :commitTimestamp -1}]";
        let events = parse_history(input).expect("history should parse");
        assert_eq!(events[0].actions, vec![Action::write("x".to_string(), -3)]);
        assert_eq!(events[0].commit_timestamp, Timestamp(-1));
        assert_eq!(events[0].real_timestamp, None);
    }

    #[test]
    fn empty_history_parses() {
        assert_eq!(parse_history("[]").expect("should parse"), Vec::new());
        assert_eq!(parse_history("  [ ]  ").expect("should parse"), Vec::new());
    }

    #[test]
    fn missing_commit_timestamp_is_an_error() {
        let input = "[{:type :ok, :f :txn, :value [], :process 0}]";
        let err = parse_history(input).expect_err("should fail");
        assert!(err.message.contains("commitTimestamp"), "{err}");
    }

    #[test]
    fn unknown_verb_is_an_error() {
        let input = "[{:type :ok, :f :txn, :value [[:delete :x 1]], :process 0, \
                      :commitTimestamp 1}]";
        let err = parse_history(input).expect_err("should fail");
        assert!(err.message.contains("verb"), "{err}");
    }

    #[test]
    fn error_location_points_at_the_bad_line() {
        let input =
            "[\n{:type :ok, :f :txn, :value [[:read :x 0]], :process 0,\n:commitTimestamp }\n]";
        let err = parse_history(input).expect_err("should fail");
        assert!(err.line >= 2, "line was {}", err.line);
        assert!(err.column >= 1);
    }

    #[test]
    fn fail_and_info_kinds_parse() {
        let input = "[{:type :fail, :f :txn, :value [], :process 0, :commitTimestamp 1}\
                      {:type :info, :f :txn, :value [], :process 0, :commitTimestamp 2}]";
        let events = parse_history(input).expect("should parse");
        assert_eq!(events[0].kind, EventKind::Fail);
        assert_eq!(events[1].kind, EventKind::Info);
    }

    #[test]
    fn trailing_garbage_is_an_error() {
        let err = parse_history("[] what").expect_err("should fail");
        assert!(err.message.contains("trailing"), "{err}");
    }
}
