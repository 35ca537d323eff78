use super::CliError;

const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Seconds to microseconds, rejecting values that are not finite
pub(crate) fn seconds_to_micros(arg: &str, seconds: f64) -> Result<i64, CliError> {
    if !seconds.is_finite() {
        return Err(CliError::invalid(arg, "must be a finite number of seconds"));
    }

    #[allow(clippy::cast_possible_truncation)]
    Ok((seconds * MICROS_PER_SECOND).round() as i64)
}

/// Resolve a target position in microseconds.
///
/// Accepts seconds (`90`), `mm:ss` (`1:30`), a percentage of the track
/// (`50%`) or an offset from the current position (`+10`, `-10`).
pub(crate) fn parse_position(
    input: &str,
    current: i64,
    length: Option<i64>,
) -> Result<i64, CliError> {
    let input = input.trim();

    if let Some(percentage) = input.strip_suffix('%') {
        let percentage = percentage
            .parse::<f64>()
            .map_err(|_| CliError::invalid("position", "Invalid percentage format"))?;

        if !(0.0..=100.0).contains(&percentage) {
            return Err(CliError::invalid(
                "position",
                "Percentage must be between 0 and 100",
            ));
        }

        let length = length.ok_or_else(|| {
            CliError::invalid("position", "Cannot use percentage - track length unknown")
        })?;

        #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
        return Ok((length as f64 * percentage / 100.0) as i64);
    }

    if let Some(delta) = input.strip_prefix('+') {
        return Ok(current.saturating_add(relative(delta)?));
    }

    if let Some(delta) = input.strip_prefix('-') {
        return Ok(current.saturating_sub(relative(delta)?).max(0));
    }

    if let Some((minutes, seconds)) = input.split_once(':') {
        let minutes = minutes
            .parse::<u32>()
            .map_err(|_| CliError::invalid("position", "Invalid minutes value"))?;
        let seconds = seconds
            .parse::<u32>()
            .map_err(|_| CliError::invalid("position", "Invalid seconds value"))?;

        if seconds >= 60 {
            return Err(CliError::invalid("position", "Seconds must be less than 60"));
        }

        return seconds_to_micros("position", f64::from(minutes) * 60.0 + f64::from(seconds));
    }

    let seconds = input.parse::<f64>().map_err(|_| {
        CliError::invalid(
            "position",
            "Use seconds, mm:ss, percentage (50%), or relative (+10, -10)",
        )
    })?;

    if seconds < 0.0 {
        return Err(CliError::invalid("position", "Position cannot be negative"));
    }

    seconds_to_micros("position", seconds)
}

fn relative(delta: &str) -> Result<i64, CliError> {
    let seconds = delta
        .parse::<f64>()
        .map_err(|_| CliError::invalid("position", "Invalid relative seek format"))?;
    seconds_to_micros("position", seconds)
}
