//! Marble diagram parsing.
//!
//! Grammar: `-` is one frame of silence, `|` completes, `#` errors, any
//! other character is a value looked up in the diagram's value table.
//! `( … )` emits everything inside at the group's opening frame while the
//! cursor still advances one frame per character. Whitespace is ignored.
//! Subscription marbles use `^` for subscribe and `!` for unsubscribe.

/// A materialized notification with errors normalized to display strings,
/// which keeps assertion output readable and comparable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TestNotification<T> {
  Next(T),
  Error(String),
  Complete,
}

/// One subscribe/unsubscribe window of a diagram-driven source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubscriptionWindow {
  pub subscribed: u64,
  /// `None` while (or if) the consumer never unsubscribed.
  pub unsubscribed: Option<u64>,
}

/// Walks a diagram, invoking `f` with the emission frame of every
/// non-silent character. Returns the frame just past the diagram's end.
fn each_marble(marbles: &str, mut f: impl FnMut(u64, char)) -> u64 {
  let mut frame = 0u64;
  let mut group_start = None;
  for ch in marbles.chars() {
    if ch.is_whitespace() {
      continue;
    }
    match ch {
      '(' => {
        assert!(group_start.is_none(), "nested marble groups are not supported");
        group_start = Some(frame);
      }
      ')' => {
        assert!(group_start.is_some(), "unmatched ')' in marble diagram");
        group_start = None;
      }
      '-' => {}
      other => f(group_start.unwrap_or(frame), other),
    }
    frame += 1;
  }
  assert!(group_start.is_none(), "unmatched '(' in marble diagram");
  frame
}

/// Parses an emission diagram into `(frame, notification)` tuples. `#`
/// becomes an error notification carrying `error_message`.
pub fn parse_marbles<T: Clone>(
  marbles: &str,
  values: &[(char, T)],
  error_message: &str,
) -> Vec<(u64, TestNotification<T>)> {
  // A `^` anchors frame zero for hot diagrams; events to its left are
  // treated as already in the past and collapse onto frame zero.
  let mut anchor = 0u64;
  each_marble(marbles, |frame, ch| {
    if ch == '^' {
      anchor = frame;
    }
  });

  let mut out = Vec::new();
  each_marble(marbles, |frame, ch| {
    let frame = frame.saturating_sub(anchor);
    match ch {
      '^' => {}
      '|' => out.push((frame, TestNotification::Complete)),
      '#' => out.push((frame, TestNotification::Error(error_message.to_string()))),
      value => {
        let bound = values
          .iter()
          .find(|(key, _)| *key == value)
          .unwrap_or_else(|| panic!("no value bound for marble {value:?} in {marbles:?}"));
        out.push((frame, TestNotification::Next(bound.1.clone())));
      }
    }
  });
  out
}

/// Parses a subscription diagram (`^` required, `!` optional).
pub fn parse_subscription(marbles: &str) -> SubscriptionWindow {
  let mut subscribed = None;
  let mut unsubscribed = None;
  each_marble(marbles, |frame, ch| match ch {
    '^' => subscribed = Some(frame),
    '!' => unsubscribed = Some(frame),
    other => panic!("unexpected {other:?} in subscription diagram {marbles:?}"),
  });
  SubscriptionWindow {
    subscribed: subscribed
      .unwrap_or_else(|| panic!("subscription diagram {marbles:?} is missing '^'")),
    unsubscribed,
  }
}

/// Frame of the `!` marker in an unsubscription diagram.
pub fn parse_unsubscribe_frame(marbles: &str) -> u64 {
  let mut at = None;
  each_marble(marbles, |frame, ch| {
    if ch == '!' {
      at = Some(frame);
    }
  });
  at.unwrap_or_else(|| panic!("unsubscription diagram {marbles:?} is missing '!'"))
}
