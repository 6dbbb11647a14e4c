//! Cron schedules for periodic jobs.
//!
//! Patterns are parsed by `croner` with an optional leading seconds field.
//! The `@every <duration>` form is not a cron pattern and is checked as a
//! duration instead.

use croner::parser::{CronParser, Seconds};

use super::duration::{DurationError, parse_duration};

#[derive(Debug, thiserror::Error)]
pub enum CronError {
    #[error(transparent)]
    Pattern(#[from] croner::errors::CronError),
    #[error("failed to parse duration {schedule}: {source}")]
    Every {
        schedule: String,
        source: DurationError,
    },
}

/// Checks that `schedule` is a valid cron expression.
pub fn parse_cron(schedule: &str) -> Result<(), CronError> {
    if let Some(every) = schedule.strip_prefix("@every ") {
        return parse_duration(every)
            .map(|_| ())
            .map_err(|source| CronError::Every {
                schedule: schedule.to_string(),
                source,
            });
    }

    // the scheduler treats @midnight as @daily
    let pattern = match schedule {
        "@midnight" => "@daily",
        other => other,
    };
    CronParser::builder()
        .seconds(Seconds::Optional)
        .build()
        .parse(pattern)?;
    Ok(())
}
