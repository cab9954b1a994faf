//! Broadcast channel for workflow events.
//!
//! Every subscriber sees every event published after it subscribed. A slow
//! subscriber that falls more than `capacity` events behind loses the oldest
//! ones and receives a lag notice instead.

use orderflow_types::WorkflowEvent;
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<WorkflowEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
		self.sender.subscribe()
	}

	/// Returns the number of subscribers that received the event. Fails only
	/// when nobody is subscribed.
	pub fn publish(
		&self,
		event: WorkflowEvent,
	) -> Result<usize, broadcast::error::SendError<WorkflowEvent>> {
		self.sender.send(event)
	}
}
