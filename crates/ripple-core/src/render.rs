//! Human-readable rendering of resolved actions and follows.
//!
//! Format:
//!
//! ```text
//! <actor> <verb> <time>
//! <actor> <verb> <target> <time>
//! <watcher> -> <subject>
//! ```

use chrono::{DateTime, Utc};

use crate::resolve::{ResolvedAction, ResolvedFollow};

/// Relative-age fragment for a timestamp: `"just now"` under a minute,
/// otherwise `"<n> <unit>(s) ago"` with the largest whole unit.
pub fn relative_age(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
  let secs = (now - then).num_seconds().max(0);
  if secs < 60 {
    return "just now".to_owned();
  }

  let (count, unit) = if secs < 3600 {
    (secs / 60, "minute")
  } else if secs < 86_400 {
    (secs / 3600, "hour")
  } else if secs < 7 * 86_400 {
    (secs / 86_400, "day")
  } else if secs < 365 * 86_400 {
    (secs / (7 * 86_400), "week")
  } else {
    (secs / (365 * 86_400), "year")
  };

  if count == 1 {
    format!("1 {unit} ago")
  } else {
    format!("{count} {unit}s ago")
  }
}

impl ResolvedAction {
  /// Render against an explicit clock — what [`Display`](std::fmt::Display)
  /// does with `Utc::now()`.
  pub fn render_at(&self, now: DateTime<Utc>) -> String {
    let age = relative_age(self.action.created_at, now);
    match &self.target {
      Some(target) => format!(
        "{} {} {} {}",
        self.actor.display, self.action.verb, target.display, age
      ),
      None => format!("{} {} {}", self.actor.display, self.action.verb, age),
    }
  }
}

impl std::fmt::Display for ResolvedAction {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.render_at(Utc::now()))
  }
}

impl std::fmt::Display for ResolvedFollow {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} -> {}", self.watcher.display, self.subject.display)
  }
}
