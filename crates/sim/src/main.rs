//! Lumen sync simulator.
//!
//! Builds an in-memory address space with one rendering consumer, then
//! replays a script of writes, rebases, and visibility flips through a
//! [`SyncEngine`], printing each decision and every consumer callback.

mod console;
mod script;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use lumen_primitives::{Address, NodeId};
use lumen_sync::{AddressSpaceModel, ChangeDelta, Consumer, DeltaFlags, ElementRef, EngineParts, IgnoreStructural, MemoryBlock, SyncConfig, SyncEngine, VisibilitySet};
use lumen_worker::WorkerScheduler;
use tracing::info;

use crate::console::ConsoleConsumer;
use crate::script::Step;

/// Simulator command line arguments.
#[derive(Parser, Debug)]
#[command(name = "lumen-sim")]
#[command(about = "Replay address-space changes through a sync engine")]
struct Args {
	/// Replay script; the built-in script runs when omitted
	#[arg(value_name = "SCRIPT")]
	script: Option<PathBuf>,

	/// Engine configuration (TOML)
	#[arg(short, long, value_name = "PATH")]
	config: Option<PathBuf>,

	/// Initial base address of the block
	#[arg(short, long, default_value = "0x1000")]
	base: Address,

	/// Block size in bytes
	#[arg(long, default_value_t = 256)]
	size: usize,

	/// Verbose logging
	#[arg(short, long)]
	verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	setup_tracing(args.verbose);

	let config = match &args.config {
		Some(path) => SyncConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
		None => SyncConfig::default(),
	};
	let text = match &args.script {
		Some(path) => std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?,
		None => script::DEFAULT_SCRIPT.to_string(),
	};
	let steps = script::parse(&text)?;
	info!(steps = steps.len(), base = %args.base, "sim.start");

	let data = (0..args.size).map(|i| i as u8).collect();
	let block = Arc::new(MemoryBlock::new(args.base.clone(), data));
	let consumer = Arc::new(ConsoleConsumer::new(Arc::clone(&block), 16, 4)?);
	let visibility = Arc::new(VisibilitySet::new());
	visibility.show(consumer.id());
	let scheduler = Arc::new(WorkerScheduler::new(format!("sim-{}", consumer.id())));

	let consumer_dyn: Arc<dyn Consumer> = consumer.clone();
	let engine = SyncEngine::new(
		EngineParts {
			model: block.clone(),
			consumer: Arc::downgrade(&consumer_dyn),
			oracle: visibility.clone(),
			structural: Arc::new(IgnoreStructural),
			scheduler: scheduler.clone(),
		},
		config,
	)?;

	for (idx, step) in steps.iter().enumerate() {
		println!("step {idx}: {step:?}");
		let delta = match step {
			Step::Write { offset, bytes } => match block.write(*offset, bytes) {
				Ok(delta) => Some(delta),
				Err(err) => {
					println!("  rejected: {err}");
					None
				}
			},
			Step::Rebase(base) => Some(block.rebase(base.clone())),
			Step::Show => {
				visibility.show(consumer.id());
				None
			}
			Step::Hide => {
				visibility.hide(consumer.id());
				None
			}
			Step::Fail => {
				block.set_unavailable(true);
				None
			}
			Step::Recover => {
				block.set_unavailable(false);
				None
			}
			Step::Structure => Some(
				ChangeDelta::new(ElementRef::Model(block.id()), DeltaFlags::CHILDREN)
					.with_child(ChangeDelta::new(ElementRef::Node(NodeId::next()), DeltaFlags::ADDED)),
			),
		};
		let Some(delta) = delta else {
			continue;
		};

		let decision = engine.on_delta(&delta);
		println!("  decision: {}", decision.as_str());
		match engine.changed_ranges() {
			Ok(ranges) if !ranges.is_empty() => {
				let ranges: Vec<String> = ranges.iter().map(ToString::to_string).collect();
				println!("  changed: {}", ranges.join(" "));
			}
			Ok(_) => {}
			Err(err) => println!("  changed: unavailable ({err})"),
		}
		scheduler.flush().await;
	}

	println!("descriptor: {}", engine.descriptor());
	println!("top: {}", consumer.top());
	Ok(())
}

fn setup_tracing(verbose: bool) {
	let level = if verbose { tracing::Level::TRACE } else { tracing::Level::INFO };
	tracing_subscriber::fmt().with_max_level(level).with_writer(std::io::stderr).init();
}
