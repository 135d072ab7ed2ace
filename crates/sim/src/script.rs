//! Line-oriented replay scripts.
//!
//! ```text
//! # comment
//! write 0x10 de ad be ef
//! rebase 0x2000
//! hide
//! show
//! fail
//! recover
//! structure
//! ```

use anyhow::{Context, Result, bail};
use lumen_primitives::Address;

/// One scripted step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
	Write { offset: usize, bytes: Vec<u8> },
	Rebase(Address),
	Show,
	Hide,
	Fail,
	Recover,
	Structure,
}

pub const DEFAULT_SCRIPT: &str = "\
write 0x00 01 02 03 04
write 0x14 ff
hide
write 0x20 aa
rebase 0x2000
show
write 0x01 bb
rebase 0x3000
structure
fail
write 0x02 cc
recover
write 0x03 dd
";

pub fn parse(text: &str) -> Result<Vec<Step>> {
	text.lines()
		.enumerate()
		.filter_map(|(idx, line)| {
			let line = line.split('#').next().unwrap_or("").trim();
			(!line.is_empty()).then(|| parse_line(line).with_context(|| format!("line {}: {line:?}", idx + 1)))
		})
		.collect()
}

fn parse_line(line: &str) -> Result<Step> {
	let mut words = line.split_whitespace();
	let Some(cmd) = words.next() else {
		bail!("empty step");
	};
	let step = match cmd {
		"write" => {
			let offset = parse_usize(words.next().context("write needs an offset")?)?;
			let bytes = words
				.by_ref()
				.map(|w| u8::from_str_radix(w, 16).with_context(|| format!("invalid byte {w:?}")))
				.collect::<Result<Vec<_>>>()?;
			if bytes.is_empty() {
				bail!("write needs at least one byte");
			}
			Step::Write { offset, bytes }
		}
		"rebase" => Step::Rebase(words.next().context("rebase needs an address")?.parse()?),
		"show" => Step::Show,
		"hide" => Step::Hide,
		"fail" => Step::Fail,
		"recover" => Step::Recover,
		"structure" => Step::Structure,
		other => bail!("unknown step {other:?}"),
	};
	if let Some(extra) = words.next() {
		bail!("unexpected argument {extra:?}");
	}
	Ok(step)
}

fn parse_usize(text: &str) -> Result<usize> {
	let addr: Address = text.parse()?;
	addr.to_u64()
		.and_then(|v| usize::try_from(v).ok())
		.with_context(|| format!("offset {text} too large"))
}
