use std::fmt::Display;

use console::{style, StyledObject};

/// Completed action, e.g. a created or deleted job.
pub fn success(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().green()
}

/// Action that failed but did not abort the run.
pub fn failure(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().red()
}

/// Action deliberately skipped.
pub fn notice(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().yellow()
}

pub fn heading(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().underlined()
}

pub fn dim(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).dim()
}

pub fn title(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).magenta().bold()
}
