use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A requested page window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Page {
	pub offset: u32,
	pub size: u32,
}

/// A resolved page window; `from + size` never exceeds the max-hits ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
	pub from: u32,
	pub size: u32,
}

/// The strict pagination model: `size` is either zero (resolved to the
/// configured default) or at most `max_size`; `offset` must be an exact
/// multiple of the resolved size; windows past `max_hits` are rejected with
/// an explicit message, never silently clamped. Stateless beyond its
/// configured limits.
#[derive(Debug, Clone, Copy)]
pub struct PaginationPolicy {
	default_size: u32,
	max_size: u32,
	max_hits: u32,
}
impl PaginationPolicy {
	pub fn new(cfg: &larq_config::Pagination) -> Self {
		Self { default_size: cfg.default_size, max_size: cfg.max_size, max_hits: cfg.max_hits }
	}

	pub fn resolve(&self, page: Page) -> Result<PageWindow> {
		let size = if page.size == 0 { self.default_size } else { page.size };

		if size > self.max_size {
			return Err(Error::InvalidArgument {
				message: format!(
					"Page size [{size}] exceeds the maximum page size [{}].",
					self.max_size
				),
			});
		}
		if page.offset % size != 0 {
			return Err(Error::InvalidArgument {
				message: format!(
					"Page offset [{}] must be a multiple of the page size [{size}].",
					page.offset
				),
			});
		}
		if page.offset.saturating_add(size) > self.max_hits {
			return Err(Error::InvalidArgument {
				message: format!(
					"Page window [{} + {size}] exceeds the maximum of [{}] hits.",
					page.offset, self.max_hits
				),
			});
		}

		Ok(PageWindow { from: page.offset, size })
	}

	pub fn max_hits(&self) -> u32 {
		self.max_hits
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn policy() -> PaginationPolicy {
		PaginationPolicy { default_size: 25, max_size: 100, max_hits: 10_000 }
	}

	fn expect_invalid(result: Result<PageWindow>, needle: &str) {
		match result {
			Err(Error::InvalidArgument { message }) => {
				assert!(message.contains(needle), "unexpected message: {message}")
			},
			other => panic!("expected invalid-argument error, got {other:?}"),
		}
	}

	#[test]
	fn zero_size_resolves_to_default() {
		let window = policy().resolve(Page { offset: 0, size: 0 }).expect("resolve failed");

		assert_eq!(window, PageWindow { from: 0, size: 25 });
	}

	#[test]
	fn size_over_maximum_is_rejected() {
		expect_invalid(policy().resolve(Page { offset: 0, size: 101 }), "Page size [101]");
	}

	#[test]
	fn offset_must_be_a_multiple_of_size() {
		expect_invalid(policy().resolve(Page { offset: 15, size: 10 }), "multiple of");

		assert!(policy().resolve(Page { offset: 20, size: 10 }).is_ok());
	}

	#[test]
	fn window_never_exceeds_max_hits() {
		expect_invalid(policy().resolve(Page { offset: 9_950, size: 100 }), "maximum of [10000]");

		let window =
			policy().resolve(Page { offset: 9_900, size: 100 }).expect("resolve failed");

		assert_eq!(window.from + window.size, 10_000);
	}

	#[test]
	fn zero_offset_with_default_size_is_always_valid() {
		assert!(policy().resolve(Page::default()).is_ok());
	}
}
