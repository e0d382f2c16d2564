use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArenaError {
  #[error("arena has been released")]
  ArenaClosed,

  #[error("request of {size} bytes (align {align}) can never fit a region, max payload is {max} bytes")]
  RequestTooLarge {
    size: usize,
    align: usize,
    max: usize,
  },

  #[error("alignment {0} is not a power of two")]
  InvalidAlignment(usize),

  #[error("region size {region_size} must exceed the {header}-byte region header")]
  RegionTooSmall { region_size: usize, header: usize },

  #[error("invalid configuration: {0}")]
  InvalidConfig(String),
}

/// Failures at the operating system boundary.
#[derive(Error, Debug)]
pub enum MapError {
  #[error("mmap of {len} bytes failed: {source}")]
  Map {
    len: usize,
    #[source]
    source: io::Error,
  },

  #[error("munmap of {len} bytes at {addr:#x} failed: {source}")]
  Unmap {
    addr: usize,
    len: usize,
    #[source]
    source: io::Error,
  },
}

pub type Result<T> = std::result::Result<T, ArenaError>;
