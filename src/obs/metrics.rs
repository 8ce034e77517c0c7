// self
use crate::obs::{EventOutcome, HandlerEvent};

/// Records a handler event via the global metrics recorder (when enabled).
pub fn record_handler_event(event: HandlerEvent, outcome: EventOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"token_sentry_event_total",
			"event" => event.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (event, outcome);
	}
}
