//! Filling a freshly allocated array from an initializer list.

use crate::{
    descriptor::is_reference_descriptor,
    host::{HostRuntime, Ref},
};

/// One initializer value: a reference or a 32-bit primitive word. Which one
/// it is depends on the element type the array is filled with.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ArrayWord(u64);

impl ArrayWord {
    pub fn to_ref(self) -> Option<Ref> {
        Ref::from_raw(self.0)
    }

    pub fn to_int(self) -> i32 {
        self.0 as u32 as i32
    }
}

impl From<i32> for ArrayWord {
    fn from(value: i32) -> Self {
        ArrayWord(value as u32 as u64)
    }
}

impl From<Ref> for ArrayWord {
    fn from(value: Ref) -> Self {
        ArrayWord(value.into_raw())
    }
}

impl From<Option<Ref>> for ArrayWord {
    fn from(value: Option<Ref>) -> Self {
        ArrayWord(value.map_or(0, Ref::into_raw))
    }
}

/// Writes `values` into `array` from index 0.
///
/// `element_type` is the element descriptor; `[` and `L` select reference
/// stores, anything else 32-bit word stores. The array must be at least
/// `values.len()` long. Values past the largest array index are ignored.
pub fn fill(host: &dyn HostRuntime, array: Ref, element_type: &str, values: &[ArrayWord]) {
    log::debug!("fill {element_type} array with {} values", values.len());
    if is_reference_descriptor(element_type) {
        for (index, value) in array_indices(values) {
            host.set_object_array_element(array, index, value.to_ref());
        }
    } else {
        for (index, value) in array_indices(values) {
            host.set_int_array_region(array, index, &[value.to_int()]);
        }
    }
}

// array lengths are non-negative i32s
fn array_indices<T>(values: impl IntoIterator<Item = T>) -> impl Iterator<Item = (i32, T)> {
    (0..i32::MAX).zip(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::MemoryHost;

    #[test]
    fn test_word_conversions() {
        assert_eq!(ArrayWord::from(-1).to_int(), -1);
        assert_eq!(ArrayWord::from(i32::MIN).to_int(), i32::MIN);
        assert_eq!(ArrayWord::from(None::<Ref>).to_ref(), None);
        let reference = Ref::from_raw(7).unwrap();
        assert_eq!(ArrayWord::from(reference).to_ref(), Some(reference));
    }

    #[test]
    fn test_indices_stop_at_largest_array_index() {
        let limit = i32::MAX as usize;
        assert_eq!(array_indices(0..usize::MAX).size_hint(), (limit, Some(limit)));
        assert_eq!(array_indices(0..3).size_hint(), (3, Some(3)));
        assert_eq!(
            array_indices(["a", "b"]).collect::<Vec<_>>(),
            vec![(0, "a"), (1, "b")]
        );
    }

    #[test]
    fn test_fill_ints() {
        let host = MemoryHost::new();
        let array = host.new_int_array(4);
        fill(&host, array, "I", &[1.into(), (-2).into(), 3.into()]);
        assert_eq!(host.int_array_elements(array), Some(vec![1, -2, 3, 0]));
        assert!(!host.exception_pending());
    }

    #[test]
    fn test_fill_references() {
        let host = MemoryHost::new();
        let object = host.find_class("java/lang/Object").unwrap();
        let string = host.find_class("java/lang/String").unwrap();
        let array = host.new_object_array(3, object).unwrap();
        let a = host.new_object(string).unwrap();
        let b = host.new_object(object).unwrap();

        fill(
            &host,
            array,
            "Ljava/lang/Object;",
            &[a.into(), None::<Ref>.into(), b.into()],
        );
        let elements = host.object_array_elements(array).unwrap();
        assert_eq!(elements.len(), 3);
        assert!(host.is_same_object(elements[0], Some(a)));
        assert_eq!(elements[1], None);
        assert!(host.is_same_object(elements[2], Some(b)));
        assert!(!host.exception_pending());
    }

    #[test]
    fn test_fill_nested_arrays() {
        let host = MemoryHost::new();
        let int_array_class = host.find_class("[I").unwrap();
        let outer = host.new_object_array(2, int_array_class).unwrap();
        let row = host.new_int_array(2);
        fill(&host, outer, "[I", &[row.into(), row.into()]);
        let elements = host.object_array_elements(outer).unwrap();
        assert!(host.is_same_object(elements[1], Some(row)));
    }
}
