//! The primitive surface a managed runtime offers to native code.
//!
//! Everything the cache layer needs from the host goes through
//! [`HostRuntime`]. Handles are opaque non-zero words; "null" is `None`.

use std::num::NonZeroU64;

pub mod memory;

macro_rules! opaque_handle {
    ($($(#[$meta:meta])* $name:ident;)*) => {
        $(
            $(#[$meta])*
            #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(NonZeroU64);

            impl $name {
                /// `None` for the null word.
                pub const fn from_raw(raw: u64) -> Option<Self> {
                    match NonZeroU64::new(raw) {
                        Some(raw) => Some(Self(raw)),
                        None => None,
                    }
                }

                pub const fn into_raw(self) -> u64 {
                    self.0.get()
                }
            }
        )*
    };
}

opaque_handle! {
    /// Reference to a host object: a class mirror, an instance or an array.
    Ref;
    /// Host field identifier, valid as long as its class stays loaded.
    FieldId;
    /// Host method identifier, valid as long as its class stays loaded.
    MethodId;
}

/// Raw primitives of the host runtime.
///
/// Lookups hand out transient references owned by the current call. A
/// reference only outlives the call after [`pin`](HostRuntime::pin).
/// Pending exceptions are tracked per calling thread.
pub trait HostRuntime: Send + Sync {
    fn find_class(&self, name: &str) -> Option<Ref>;

    fn find_field(&self, owner: Ref, name: &str, signature: &str, is_static: bool)
    -> Option<FieldId>;

    fn find_method(
        &self,
        owner: Ref,
        name: &str,
        signature: &str,
        is_static: bool,
    ) -> Option<MethodId>;

    /// Promotes `reference` to a long-lived reference. The result must be
    /// released with [`release_pinned`](HostRuntime::release_pinned).
    fn pin(&self, reference: Ref) -> Ref;

    fn release_pinned(&self, reference: Ref);

    fn release_transient(&self, reference: Ref);

    /// Null is an instance of every class.
    fn is_instance_of(&self, value: Option<Ref>, class: Ref) -> bool;

    fn is_same_object(&self, a: Option<Ref>, b: Option<Ref>) -> bool;

    fn throw_new(&self, class: Ref, message: &str);

    fn throw(&self, exception: Ref);

    fn exception_pending(&self) -> bool;

    /// Fetches and clears the pending exception.
    fn take_exception(&self) -> Option<Ref>;

    fn clear_exception(&self);

    fn get_static_object_field(&self, class: Ref, field: FieldId) -> Option<Ref>;

    fn set_object_array_element(&self, array: Ref, index: i32, value: Option<Ref>);

    fn set_int_array_region(&self, array: Ref, start: i32, values: &[i32]);
}
