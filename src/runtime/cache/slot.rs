use std::{
    marker::PhantomData,
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
};

use crate::host::{FieldId, MethodId, Ref};

/// A handle that fits in one machine word, zero meaning null.
pub trait RawHandle: Copy {
    fn into_word(self) -> u64;
    fn from_word(word: u64) -> Option<Self>;
}

macro_rules! raw_handle {
    ($($name:ty),*) => {
        $(
            impl RawHandle for $name {
                fn into_word(self) -> u64 {
                    self.into_raw()
                }

                fn from_word(word: u64) -> Option<Self> {
                    <$name>::from_raw(word)
                }
            }
        )*
    };
}

raw_handle!(Ref, FieldId, MethodId);

/// The per-call-site cached handle.
///
/// Read without locking. Publishing is idempotent: every writer stores a
/// handle equivalent to any earlier one, so a reader that misses a write
/// only repeats the slow path.
pub struct CallSiteSlot<T> {
    resolved: AtomicBool,
    word: AtomicU64,
    _marker: PhantomData<fn() -> T>,
}

impl<T: RawHandle> CallSiteSlot<T> {
    pub const fn new() -> Self {
        Self {
            resolved: AtomicBool::new(false),
            word: AtomicU64::new(0),
            _marker: PhantomData,
        }
    }

    pub fn get(&self) -> Option<T> {
        if !self.resolved.load(Ordering::Acquire) {
            return None;
        }
        T::from_word(self.word.load(Ordering::Relaxed))
    }

    pub(crate) fn publish(&self, handle: T) {
        self.word.store(handle.into_word(), Ordering::Relaxed);
        self.resolved.store(true, Ordering::Release);
    }
}

impl<T: RawHandle> Default for CallSiteSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub type ClassSlot = CallSiteSlot<Ref>;

/// Call-site state for a member access: the owner class and the member.
pub struct MemberSite<T> {
    pub class: ClassSlot,
    pub member: CallSiteSlot<T>,
}

impl<T: RawHandle> MemberSite<T> {
    pub const fn new() -> Self {
        Self {
            class: CallSiteSlot::new(),
            member: CallSiteSlot::new(),
        }
    }
}

impl<T: RawHandle> Default for MemberSite<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub type MethodSite = MemberSite<MethodId>;
pub type FieldSite = MemberSite<FieldId>;
