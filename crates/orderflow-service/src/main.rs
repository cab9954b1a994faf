//! Main entry point for the order workflow service.
//!
//! Loads the configuration, wires the configured storage, document, email
//! and credential backends into an order controller and serves the HTTP API
//! that drives orders from contract to warranty.

use clap::Parser;
use orderflow_config::Config;
use orderflow_core::OrderController;
use orderflow_types::{truncate_id, WorkflowEvent};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

mod apis;
mod factory_registry;
mod server;

/// Command-line arguments for the order workflow service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config/orderflow.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started orderflow");

	let config_path = args
		.config
		.to_str()
		.ok_or_else(|| format!("Config path is not valid UTF-8: {}", args.config.display()))?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.service.id);

	let controller = Arc::new(factory_registry::build_controller_from_config(
		config.clone(),
	)?);
	tokio::spawn(log_events(Arc::clone(&controller)));

	match config.api.filter(|api| api.enabled) {
		Some(api_config) => {
			tokio::select! {
				result = server::start_server(api_config, Arc::clone(&controller)) => {
					tracing::info!("API server finished");
					result?;
				}
				_ = tokio::signal::ctrl_c() => {
					tracing::info!("Shutdown requested");
				}
			}
		},
		None => {
			tracing::warn!("API disabled, nothing to serve until interrupted");
			tokio::signal::ctrl_c().await?;
		},
	}

	let pending = controller.pending_commits();
	if !pending.is_empty() {
		let ids: Vec<_> = pending.iter().map(|order| truncate_id(&order.id)).collect();
		tracing::warn!(
			orders = ?ids,
			"Stopping with emails sent but flags not saved, verify these orders"
		);
	}

	tracing::info!("Stopped orderflow");
	Ok(())
}

/// Logs every workflow event until the bus closes.
async fn log_events(controller: Arc<OrderController>) {
	let mut receiver = controller.event_bus().subscribe();
	loop {
		match receiver.recv().await {
			Ok(event) => log_event(&event),
			Err(RecvError::Lagged(skipped)) => {
				tracing::warn!(skipped = skipped, "Event log fell behind");
			},
			Err(RecvError::Closed) => break,
		}
	}
}

fn log_event(event: &WorkflowEvent) {
	let order_id = truncate_id(event.order_id());
	match event {
		WorkflowEvent::OrderCreated { .. } => tracing::info!(order_id = %order_id, "Order created"),
		WorkflowEvent::OrderDeleted { .. } => tracing::info!(order_id = %order_id, "Order deleted"),
		WorkflowEvent::DocumentGenerated { kind, filename, .. } => {
			tracing::debug!(order_id = %order_id, document = %kind, filename = %filename, "Document generated")
		},
		WorkflowEvent::EmailSent {
			kind, recipient, ..
		} => tracing::info!(order_id = %order_id, document = %kind, recipient = %recipient, "Email sent"),
		WorkflowEvent::FlagsCommitted { flags, .. } => {
			tracing::debug!(order_id = %order_id, flags = ?flags, "Flags committed")
		},
		WorkflowEvent::CommitPending { kind, error, .. } => tracing::error!(
			order_id = %order_id,
			document = %kind,
			error = %error,
			"Commit pending"
		),
		WorkflowEvent::StatusChanged { from, to, .. } => {
			tracing::info!(order_id = %order_id, from = %from, to = %to, "Status changed")
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_args_default_values() {
		let args = Args::parse_from(["orderflow"]);

		assert_eq!(args.config, PathBuf::from("config/orderflow.toml"));
		assert_eq!(args.log_level, "info");
	}

	#[test]
	fn test_args_custom_values() {
		let args = Args::parse_from(["orderflow", "--config", "custom.toml", "-l", "debug"]);

		assert_eq!(args.config, PathBuf::from("custom.toml"));
		assert_eq!(args.log_level, "debug");
	}
}
