/// Events emitted by long-running workflows so a front-end can render progress.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    PhaseStart { name: &'static str },
    PhaseFinish,

    TaskStart { total_steps: u64 },
    TaskIncrement,
    TaskFinish,

    /// Latest objective value of the latent optimizer.
    Objective { step: usize, value: f64 },
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }

    /// Runs `body` between a `PhaseStart` and `PhaseFinish` pair. The finish event is only
    /// sent when `body` succeeds.
    pub fn phase<T, E>(
        &self,
        name: &'static str,
        body: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E> {
        self.report(Progress::PhaseStart { name });
        let out = body()?;
        self.report(Progress::PhaseFinish);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn silent_reporter_ignores_events() {
        ProgressReporter::new().report(Progress::TaskIncrement);
    }

    #[test]
    fn phase_wraps_body_with_start_and_finish() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let reporter = ProgressReporter::with_callback(Box::new(move |e| {
            sink.lock().unwrap().push(e);
        }));

        let value: Result<u32, ()> = reporter.phase("Loading", || Ok(7));
        assert_eq!(value, Ok(7));
        let failed: Result<u32, &str> = reporter.phase("Broken", || Err("boom"));
        assert_eq!(failed, Err("boom"));

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                Progress::PhaseStart { name: "Loading" },
                Progress::PhaseFinish,
                Progress::PhaseStart { name: "Broken" },
            ]
        );
    }
}
