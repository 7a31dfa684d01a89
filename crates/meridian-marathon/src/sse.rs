//! Incremental parser for the Marathon server-sent event stream.

use std::mem;

use crate::error::{MarathonError, MarathonResult};

/// One event from the `/v2/events` stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamEvent {
    /// The event id, if the server sent one.
    pub id: String,
    /// The event type, e.g. `deployment_success`.
    pub kind: String,
    /// The accumulated data payload.
    pub data: String,
}

/// Parses the `key: value` line framing of a server-sent event stream.
///
/// Feed one line at a time (without the trailing newline); a blank line
/// dispatches the accumulated event. Recognised keys are `id`, `event`, and
/// `data`; a duplicate `id` or `event` within one event is a protocol error,
/// while `data` lines accumulate. An event with every field empty is
/// skipped rather than dispatched.
#[derive(Debug, Default)]
pub struct EventParser {
    id: String,
    kind: String,
    data: String,
}

impl EventParser {
    /// A parser with no partial event.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one line, returning a completed event if this line finished
    /// one.
    pub fn feed_line(&mut self, line: &str) -> MarathonResult<Option<StreamEvent>> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let (key, value) = match line.split_once(':') {
            Some((key, value)) => (key.trim(), Some(value.trim())),
            None => (line.trim(), None),
        };
        if key.is_empty() {
            if value.is_some() {
                return Err(MarathonError::protocol(format!(
                    "received malformed value-only line {line:?}"
                )));
            }
            return Ok(self.finish());
        }
        let value = value.unwrap_or("");
        match key {
            "id" => {
                if !self.id.is_empty() {
                    return Err(MarathonError::protocol(format!(
                        "received duplicate id for event, {:?} vs {value:?}",
                        self.id
                    )));
                }
                self.id = value.to_owned();
            }
            "event" => {
                if !self.kind.is_empty() {
                    return Err(MarathonError::protocol(format!(
                        "received duplicate type for event, {:?} vs {value:?}",
                        self.kind
                    )));
                }
                self.kind = value.to_owned();
            }
            "data" => self.data.push_str(value),
            other => {
                return Err(MarathonError::protocol(format!(
                    "received unsupported event stream field {other:?}"
                )))
            }
        }
        Ok(None)
    }

    fn finish(&mut self) -> Option<StreamEvent> {
        if self.id.is_empty() && self.kind.is_empty() && self.data.is_empty() {
            return None;
        }
        Some(StreamEvent {
            id: mem::take(&mut self.id),
            kind: mem::take(&mut self.kind),
            data: mem::take(&mut self.data),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(parser: &mut EventParser, lines: &[&str]) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        for line in lines {
            if let Some(event) = parser.feed_line(line).unwrap() {
                events.push(event);
            }
        }
        events
    }

    #[test]
    fn single_event() {
        let mut parser = EventParser::new();
        let events = feed(
            &mut parser,
            &["id: 1", "event: deployment_success", r#"data: {"id":"d1"}"#, ""],
        );
        assert_eq!(
            events,
            vec![StreamEvent {
                id: "1".to_owned(),
                kind: "deployment_success".to_owned(),
                data: r#"{"id":"d1"}"#.to_owned(),
            }]
        );
    }

    #[test]
    fn data_lines_accumulate() {
        let mut parser = EventParser::new();
        let events = feed(&mut parser, &["data: {\"a\":", "data: 1}", ""]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "{\"a\":1}");
    }

    #[test]
    fn blank_line_without_fields_is_skipped() {
        let mut parser = EventParser::new();
        let events = feed(&mut parser, &["", "", "event: ping", ""]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, "ping");
    }

    #[test]
    fn consecutive_events_are_independent() {
        let mut parser = EventParser::new();
        let events = feed(
            &mut parser,
            &["id: 1", "data: one", "", "id: 2", "data: two", ""],
        );
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id, "1");
        assert_eq!(events[1].id, "2");
        assert_eq!(events[1].data, "two");
    }

    #[test]
    fn duplicate_id_is_a_protocol_error() {
        let mut parser = EventParser::new();
        parser.feed_line("id: 1").unwrap();
        assert!(matches!(
            parser.feed_line("id: 2"),
            Err(MarathonError::Protocol(_))
        ));
    }

    #[test]
    fn duplicate_event_type_is_a_protocol_error() {
        let mut parser = EventParser::new();
        parser.feed_line("event: a").unwrap();
        assert!(matches!(
            parser.feed_line("event: b"),
            Err(MarathonError::Protocol(_))
        ));
    }

    #[test]
    fn value_only_line_is_a_protocol_error() {
        let mut parser = EventParser::new();
        assert!(matches!(
            parser.feed_line(": comment"),
            Err(MarathonError::Protocol(_))
        ));
    }

    #[test]
    fn unknown_field_is_a_protocol_error() {
        let mut parser = EventParser::new();
        assert!(matches!(
            parser.feed_line("retry: 100"),
            Err(MarathonError::Protocol(_))
        ));
    }

    #[test]
    fn carriage_returns_are_stripped() {
        let mut parser = EventParser::new();
        let events = feed(&mut parser, &["event: ping\r", "\r"]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, "ping");
    }

    #[test]
    fn bare_key_line_has_empty_value() {
        let mut parser = EventParser::new();
        parser.feed_line("data").unwrap();
        let events = feed(&mut parser, &["data: x", ""]);
        assert_eq!(events[0].data, "x");
    }
}
