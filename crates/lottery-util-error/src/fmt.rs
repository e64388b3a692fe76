use std::error::Error as StdError;
use std::fmt;

/// Renders an error and its full `source()` chain on a single line, each
/// link separated by `": "`, for compact log lines.
pub struct Compact<'a>(&'a (dyn StdError + 'static));

impl fmt::Display for Compact<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;
        let mut cause = self.0.source();
        while let Some(err) = cause {
            write!(f, ": {err}")?;
            cause = err.source();
        }
        Ok(())
    }
}

pub trait FmtCompact {
    fn fmt_compact(&self) -> Compact<'_>;
}

impl<E> FmtCompact for E
where
    E: StdError + 'static,
{
    fn fmt_compact(&self) -> Compact<'_> {
        Compact(self)
    }
}
