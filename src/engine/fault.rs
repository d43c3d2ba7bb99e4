use tokio::sync::mpsc;
use tracing::error;

/// An unexpected failure inside one scheduler firing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerFault {
    pub message: String,
    pub tick: u64,
}

impl SchedulerFault {
    pub fn from_panic(payload: &(dyn std::any::Any + Send), tick: u64) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "scheduler tick panicked with a non-string payload".to_string()
        };
        Self { message, tick }
    }
}

impl std::fmt::Display for SchedulerFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "scheduler fault on tick {}: {}", self.tick, self.message)
    }
}

/// Where scheduler faults go.
///
/// With a registered bounded channel, faults are queued for the owner to
/// observe. Without one, or when the channel is full or closed, the fault is
/// logged at error level so it is never silent.
#[derive(Debug, Clone, Default)]
pub struct FaultChannel {
    sender: Option<mpsc::Sender<SchedulerFault>>,
}

impl FaultChannel {
    pub fn new(sender: mpsc::Sender<SchedulerFault>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    /// Creates a channel and returns the receiving end for the owner.
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<SchedulerFault>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self::new(sender), receiver)
    }

    pub fn raise(&self, fault: SchedulerFault) {
        let Some(sender) = &self.sender else {
            error!(tick = fault.tick, "Scheduler fault: {}", fault.message);
            return;
        };

        if let Err(e) = sender.try_send(fault) {
            let fault = match e {
                mpsc::error::TrySendError::Full(fault) | mpsc::error::TrySendError::Closed(fault) => fault,
            };
            error!(
                tick = fault.tick,
                "Scheduler fault (fault channel unavailable): {}", fault.message
            );
        }
    }
}
