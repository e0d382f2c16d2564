/// Returns `true` if `align` is a non-zero power of two.
#[inline]
pub const fn is_valid(align: usize) -> bool {
  align.is_power_of_two()
}

/// Rounds `addr` up to the next multiple of `align`.
///
/// `align` must be a power of two. Returns `None` if the rounded address
/// would overflow `usize`.
///
/// # Examples
///
/// ```rust
/// use rarena::align;
///
/// assert_eq!(align::align_up(13, 8), Some(16));
/// assert_eq!(align::align_up(16, 8), Some(16));
/// assert_eq!(align::align_up(usize::MAX, 2), None);
/// ```
#[inline]
pub const fn align_up(
  addr: usize,
  align: usize,
) -> Option<usize> {
  debug_assert!(is_valid(align));

  let mask = align - 1;
  match addr.checked_add(mask) {
    Some(bumped) => Some(bumped & !mask),
    None => None,
  }
}
