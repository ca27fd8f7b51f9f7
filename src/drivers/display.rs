//! Two-line character display.
//!
//! The panel itself sits behind [`LineDisplay`]; [`LogDisplay`] writes the
//! lines to the log and keeps the last frame for inspection.

use heapless::String;
use log::info;

use crate::error::ActuatorError;

pub const DISPLAY_COLUMNS: usize = 16;

pub type Line = String<DISPLAY_COLUMNS>;

/// Cut `text` to the panel width.
pub fn fit_line(text: &str) -> Line {
    crate::config::bounded(text)
}

pub trait LineDisplay {
    fn show(&mut self, top: &str, bottom: &str) -> Result<(), ActuatorError>;
}

#[derive(Debug, Default)]
pub struct LogDisplay {
    top: Line,
    bottom: Line,
}

impl LogDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> (&str, &str) {
        (&self.top, &self.bottom)
    }
}

impl LineDisplay for LogDisplay {
    fn show(&mut self, top: &str, bottom: &str) -> Result<(), ActuatorError> {
        self.top = fit_line(top);
        self.bottom = fit_line(bottom);
        info!("LCD: [{}] [{}]", self.top, self.bottom);
        Ok(())
    }
}
