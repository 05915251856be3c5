//! Free-text field extraction for the voterflow agent.
//!
//! Two layers: pure normalizers turning human date/gender strings into the
//! portal's canonical forms, and pattern scanners recovering registration
//! fields from arbitrary prose. Both are best-effort and never fail; a
//! string that matches nothing simply yields nothing.

mod extract;
mod normalize;

pub use extract::{extract_fields, fast_path, FastPath};
pub use normalize::{normalize_date, normalize_gender};
