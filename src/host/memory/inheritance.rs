use std::sync::Arc;

use super::class::{ArrayElement, HostClass};

/// Whether a value of class `source` may be used where `target` is expected.
pub(crate) fn is_assignable_to(source: &Arc<HostClass>, target: &Arc<HostClass>) -> bool {
    if let Some(source_element) = source.array_element() {
        // source is array
        if let Some(target_element) = target.array_element() {
            // target is array
            match (source_element, target_element) {
                (ArrayElement::Primitive(s), ArrayElement::Primitive(t)) => s == t,
                (ArrayElement::Reference(s), ArrayElement::Reference(t)) => is_assignable_to(s, t),
                _ => false,
            }
        } else if target.is_interface() {
            target.class_name.as_ref() == "java/lang/Cloneable"
                || target.class_name.as_ref() == "java/io/Serializable"
        } else {
            // target is class, must be Object
            target.class_name.as_ref() == "java/lang/Object"
        }
    } else if target.is_interface() {
        is_same_class(source, target) || is_class_implements(source, target)
    } else {
        is_same_or_sub_class_of(source, target)
    }
}

pub(crate) fn is_class_implements(class: &Arc<HostClass>, interface: &Arc<HostClass>) -> bool {
    for class_intf in &class.interfaces {
        if is_same_class(class_intf, interface) || is_class_implements(class_intf, interface) {
            return true;
        }
    }
    if let Some(super_class) = &class.super_class {
        return is_class_implements(super_class, interface);
    }
    false
}

pub(crate) fn is_same_or_sub_class_of(source: &Arc<HostClass>, target: &Arc<HostClass>) -> bool {
    if is_same_class(source, target) {
        return true;
    }
    if let Some(super_class) = &source.super_class {
        return is_same_or_sub_class_of(super_class, target);
    }
    false
}

fn is_same_class(a: &Arc<HostClass>, b: &Arc<HostClass>) -> bool {
    a.id == b.id
}
