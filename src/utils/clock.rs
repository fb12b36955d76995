use chrono::{DateTime, FixedOffset, Local, Utc};

/// Trusted source of "now". Client clocks are never consulted.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Server clock pinned to the site's UTC offset; local time when none is configured.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: Option<FixedOffset>,
}

impl SystemClock {
    pub fn new(offset: Option<FixedOffset>) -> Self {
        Self { offset }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        match self.offset {
            Some(offset) => Utc::now().with_timezone(&offset),
            None => Local::now().fixed_offset(),
        }
    }
}

#[cfg(test)]
pub use fixed::FixedClock;


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_offset_is_applied() {
        let offset = FixedOffset::west_opt(5 * 3600).unwrap();
        let now = SystemClock::new(Some(offset)).now();
        assert_eq!(now.offset(), &offset);
    }
}
