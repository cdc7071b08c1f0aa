/// Build completion events and the adaptive duration shown in report lines.
///
/// Durations pick their unit by successive strict thresholds on the raw
/// millisecond count: above 60000 is minutes, above 1000 is seconds, anything
/// else (including NaN and negative values from malformed events) stays in
/// milliseconds. The value is divided, never rounded.
use std::fmt;

const MILLIS_PER_SECOND: f64 = 1_000.0;
const MILLIS_PER_MINUTE: f64 = 60_000.0;

/// Signal emitted by the host build pipeline once a rebuild finishes.
///
/// Timestamps share one clock and are expressed in milliseconds. They are only
/// used to report how long the build took.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildCompletionEvent {
    pub start_time: f64,
    pub end_time: f64,
}

impl BuildCompletionEvent {
    pub fn new(start_time: f64, end_time: f64) -> Self {
        Self {
            start_time,
            end_time,
        }
    }

    /// Raw build time in milliseconds. Not validated: a malformed event can
    /// yield NaN or a negative value.
    pub fn elapsed_millis(&self) -> f64 {
        self.end_time - self.start_time
    }

    pub fn elapsed(&self) -> Elapsed {
        Elapsed::from_millis(self.elapsed_millis())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Milliseconds,
    Seconds,
    Minutes,
}

impl Unit {
    pub fn suffix(self) -> &'static str {
        match self {
            Unit::Milliseconds => "ms",
            Unit::Seconds => "s",
            Unit::Minutes => "m",
        }
    }
}

/// A build duration scaled to its display unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Elapsed {
    value: f64,
    unit: Unit,
}

impl Elapsed {
    pub fn from_millis(millis: f64) -> Self {
        if millis > MILLIS_PER_MINUTE {
            Self {
                value: millis / MILLIS_PER_MINUTE,
                unit: Unit::Minutes,
            }
        } else if millis > MILLIS_PER_SECOND {
            Self {
                value: millis / MILLIS_PER_SECOND,
                unit: Unit::Seconds,
            }
        } else {
            Self {
                // -0.0 == 0.0, so this only drops the sign of negative zero
                value: if millis == 0.0 { 0.0 } else { millis },
                unit: Unit::Milliseconds,
            }
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    /// True when the build took a measurable, strictly positive time.
    pub fn is_positive(&self) -> bool {
        self.value > 0.0
    }
}

impl fmt::Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.suffix())
    }
}
