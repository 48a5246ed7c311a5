//! Strongly-typed patch name.

use crate::newtype_string::define_newtype_string;

define_newtype_string! {
    /// A non-empty patch name, derived from the patch file stem.
    pub struct PatchName;
}
