use std::{alloc::Layout, ptr};

use rarena::{Arena, ArenaConfig, ArenaError, Region};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Bump three small blocks out of a 10-byte buffer and watch the third one fail.
fn region_walkthrough() {
  let mut buf = [0u8; 10];
  let mut region = Region::new(buf.len(), buf.as_mut_ptr() as usize);
  info!(base = ?buf.as_ptr(), "[region] 10-byte region over a stack buffer");

  let first = region.allocate(3, 4);
  info!(addr = ?first, "[region] allocate(3, 4)");

  let second = region.allocate(3, 4);
  info!(addr = ?second, "[region] allocate(3, 4)");

  let third = region.allocate(3, 4);
  info!(addr = ?third, "[region] allocate(3, 4), out of space");
}

/// Regions only eight bytes larger than their header, so the second block spills.
fn arena_walkthrough() -> rarena::Result<()> {
  let mut arena = Arena::new(Region::HEADER_SIZE + 8)?;
  info!(header = Region::HEADER_SIZE, "[arena] region header size");

  let first = arena.allocate(5, 8)?;
  info!(addr = ?first, regions = arena.region_count(), "[arena] allocate(5, 8)");

  let second = arena.allocate(5, 8)?;
  info!(addr = ?second, regions = arena.region_count(), "[arena] allocate(5, 8), new region");

  match arena.allocate(9, 16) {
    Err(err @ ArenaError::RequestTooLarge { .. }) => {
      info!(%err, regions = arena.region_count(), "[arena] allocate(9, 16)")
    }
    other => info!(?other, "[arena] allocate(9, 16) unexpectedly succeeded"),
  }

  arena.release();
  info!(regions = arena.region_count(), "[arena] released");

  if let Err(err) = arena.allocate(2, 2) {
    info!(%err, "[arena] allocate(2, 2) after release");
  }

  Ok(())
}

/// Uses the configured region size for some real values.
fn typed_walkthrough() -> rarena::Result<()> {
  let config = ArenaConfig::from_env()?;
  let mut arena = Arena::with_config(&config)?;
  info!(region_size = arena.region_size(), "[typed] arena from environment");

  let word = arena.allocate_layout(Layout::new::<u64>())?.cast::<u64>();
  let bytes = arena.allocate_layout(Layout::new::<[u8; 12]>())?;
  let wide = arena.allocate_layout(Layout::new::<u128>())?.cast::<u128>();

  unsafe {
    word.as_ptr().write(0x1122334455667788);
    ptr::write_bytes(bytes.as_ptr(), 0xAB, 12);
    wide.as_ptr().write(u128::MAX);

    info!(addr = ?word, value = %format!("{:#x}", word.as_ptr().read()), "[typed] u64");
    info!(addr = ?bytes, first = bytes.as_ptr().read(), "[typed] [u8; 12]");
    info!(addr = ?wide, misalignment = wide.as_ptr() as usize % 16, "[typed] u128");
  }

  info!(
    used = arena.bytes_used(),
    regions = arena.region_count(),
    "[typed] done, dropping the arena unmaps every region"
  );

  Ok(())
}

fn main() -> rarena::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
    .init();

  region_walkthrough();
  arena_walkthrough()?;
  typed_walkthrough()?;

  Ok(())
}
