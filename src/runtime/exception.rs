//! Raising guest exceptions from native code.
//!
//! Failures inside this crate are reported as return values; the exception
//! the guest sees is installed here, on the calling thread, as a separate
//! step.

use crate::host::{HostRuntime, Ref};

pub const CLASS_CAST_EXCEPTION: &str = "java/lang/ClassCastException";
pub const NULL_POINTER_EXCEPTION: &str = "java/lang/NullPointerException";
pub const ARITHMETIC_EXCEPTION: &str = "java/lang/ArithmeticException";
pub const NEGATIVE_ARRAY_SIZE_EXCEPTION: &str = "java/lang/NegativeArraySizeException";
pub const NO_CLASS_DEF_FOUND_ERROR: &str = "java/lang/NoClassDefFoundError";
pub const NO_SUCH_METHOD_ERROR: &str = "java/lang/NoSuchMethodError";
pub const NO_SUCH_FIELD_ERROR: &str = "java/lang/NoSuchFieldError";

/// Installs a new `class_name` exception carrying `message` as the pending
/// exception. The class is looked up uncached; if it cannot be found nothing
/// is raised.
pub fn raise(host: &dyn HostRuntime, class_name: &str, message: &str) {
    log::debug!("raise {class_name} {message}");
    let Some(class) = host.find_class(class_name) else {
        return;
    };
    host.throw_new(class, message);
    host.release_transient(class);
}

/// Returns `true` with a pending `ClassCastException` when `instance` is not
/// assignable to `target`. Null passes.
pub fn check_cast(
    host: &dyn HostRuntime,
    instance: Option<Ref>,
    target: Ref,
    target_name: &str,
) -> bool {
    if host.is_instance_of(instance, target) {
        false
    } else {
        raise(host, CLASS_CAST_EXCEPTION, target_name);
        true
    }
}

/// `instanceof`: null is not an instance of anything.
pub fn is_instance_of(host: &dyn HostRuntime, instance: Option<Ref>, class: Ref) -> bool {
    instance.is_some() && host.is_instance_of(instance, class)
}

/// `instanceof` against a class looked up by name, uncached. An unknown class
/// matches nothing.
pub fn is_instance_of_name(host: &dyn HostRuntime, instance: Option<Ref>, class_name: &str) -> bool {
    if instance.is_none() {
        return false;
    }
    let Some(class) = host.find_class(class_name) else {
        return false;
    };
    let result = host.is_instance_of(instance, class);
    host.release_transient(class);
    result
}

pub fn is_same_object(host: &dyn HostRuntime, a: Option<Ref>, b: Option<Ref>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b || host.is_same_object(Some(a), Some(b)),
        (None, None) => true,
        _ => false,
    }
}
