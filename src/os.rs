use std::{io, process, ptr::NonNull};

use libc::{MAP_ANONYMOUS, MAP_FAILED, MAP_PRIVATE, PROT_READ, PROT_WRITE, c_void};
use tracing::error;

use crate::error::MapError;

const FALLBACK_PAGE_SIZE: usize = 4096;

/// Size of a virtual memory page as reported by `sysconf(_SC_PAGESIZE)`.
pub fn page_size() -> usize {
  let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };

  if size <= 0 {
    FALLBACK_PAGE_SIZE
  } else {
    size as usize
  }
}

/// Maps `len` bytes of fresh, zeroed, private read/write memory.
///
/// The returned address is page aligned.
pub fn map(len: usize) -> Result<NonNull<u8>, MapError> {
  let addr = unsafe {
    libc::mmap(
      std::ptr::null_mut(),
      len,
      PROT_READ | PROT_WRITE,
      MAP_ANONYMOUS | MAP_PRIVATE,
      -1,
      0,
    )
  };

  if addr == MAP_FAILED {
    return Err(MapError::Map {
      len,
      source: io::Error::last_os_error(),
    });
  }

  NonNull::new(addr as *mut u8).ok_or_else(|| MapError::Map {
    len,
    source: io::Error::other("mmap returned a null mapping"),
  })
}

/// Like [`map`], but a failed mapping terminates the process.
pub fn map_or_abort(len: usize) -> NonNull<u8> {
  match map(len) {
    Ok(addr) => addr,
    Err(err) => {
      error!(%err, "could not map region memory, aborting");
      process::abort();
    }
  }
}

/// Returns a mapping obtained from [`map`] to the operating system.
///
/// # Safety
///
/// `addr` and `len` must describe a live mapping returned by [`map`], and
/// nothing may access that memory afterwards.
pub unsafe fn unmap(
  addr: NonNull<u8>,
  len: usize,
) -> Result<(), MapError> {
  let rc = unsafe { libc::munmap(addr.as_ptr() as *mut c_void, len) };

  if rc != 0 {
    return Err(MapError::Unmap {
      addr: addr.as_ptr() as usize,
      len,
      source: io::Error::last_os_error(),
    });
  }

  Ok(())
}
