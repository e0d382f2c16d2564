use std::env;

use crate::{
  error::{ArenaError, Result},
  os,
  region::Region,
};

/// Environment variable overriding the region size, in bytes.
pub const REGION_SIZE_ENV: &str = "RARENA_REGION_SIZE";

/// Settings fixed at arena creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaConfig {
  /// Bytes mapped for every region, header included.
  pub region_size: usize,
}

impl Default for ArenaConfig {
  /// One page per region.
  fn default() -> Self {
    Self {
      region_size: os::page_size(),
    }
  }
}

impl ArenaConfig {
  pub fn new(region_size: usize) -> Self {
    Self { region_size }
  }

  pub fn with_region_size(
    mut self,
    region_size: usize,
  ) -> Self {
    self.region_size = region_size;
    self
  }

  /// Sizes every region to `pages` OS pages.
  pub fn with_pages(
    self,
    pages: usize,
  ) -> Self {
    self.with_region_size(pages.saturating_mul(os::page_size()))
  }

  /// Reads [`REGION_SIZE_ENV`], falling back to [`ArenaConfig::default`] when unset.
  pub fn from_env() -> Result<Self> {
    match env::var(REGION_SIZE_ENV) {
      Ok(raw) => Self::parse_region_size(&raw).map(Self::new),
      Err(env::VarError::NotPresent) => Ok(Self::default()),
      Err(err) => Err(ArenaError::InvalidConfig(format!("{REGION_SIZE_ENV}: {err}"))),
    }
  }

  fn parse_region_size(raw: &str) -> Result<usize> {
    raw
      .trim()
      .parse::<usize>()
      .map_err(|err| ArenaError::InvalidConfig(format!("{REGION_SIZE_ENV}={raw:?}: {err}")))
  }

  /// Largest request any region of this size can serve.
  pub fn max_payload(&self) -> usize {
    self.region_size.saturating_sub(Region::HEADER_SIZE)
  }

  pub fn validate(&self) -> Result<()> {
    if self.region_size <= Region::HEADER_SIZE {
      return Err(ArenaError::RegionTooSmall {
        region_size: self.region_size,
        header: Region::HEADER_SIZE,
      });
    }

    Ok(())
  }
}
