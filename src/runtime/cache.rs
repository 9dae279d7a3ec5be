//! Memoized, thread-safe symbol resolution.
//!
//! Three independent tables (classes, methods, fields) each sit behind their
//! own lock. A lock is only held across a table lookup or insert, never
//! across a call into the host, and no code path holds two of them.
//!
//! Class handles are the scarce kind: every cached class is pinned in the
//! host, so the class table is capped by a [`ReferenceBudget`]. Once the
//! budget is spent, new classes are handed out as transient handles that
//! the caller must release before its call returns. Member ids need no
//! pinning and are cached without limit.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use parking_lot::Mutex;

use crate::host::{FieldId, HostRuntime, MethodId, Ref};

pub use key::HandleKey;
pub use slot::{CallSiteSlot, ClassSlot, FieldSite, MemberSite, MethodSite, RawHandle};

use super::{error::ResolutionError, well_known::WellKnownSymbols};

mod key;
mod slot;

/// A resolved class.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ClassHandle {
    /// Owned by the cache and valid for the rest of the process.
    Pinned(Ref),
    /// Valid only during the current call, owned by the caller.
    Transient(Ref),
}

impl ClassHandle {
    pub fn get(self) -> Ref {
        match self {
            ClassHandle::Pinned(reference) | ClassHandle::Transient(reference) => reference,
        }
    }

    pub fn is_pinned(self) -> bool {
        matches!(self, ClassHandle::Pinned(_))
    }
}

/// Ceiling on the number of class handles pinned by the cache.
pub struct ReferenceBudget {
    ceiling: usize,
    pinned: AtomicUsize,
    exhausted: AtomicBool,
}

impl ReferenceBudget {
    pub fn new(ceiling: usize) -> Self {
        Self {
            ceiling,
            pinned: AtomicUsize::new(0),
            exhausted: AtomicBool::new(false),
        }
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    pub fn pinned(&self) -> usize {
        self.pinned.load(Ordering::Acquire)
    }

    /// Whether a class has been turned away for lack of budget.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted.load(Ordering::Relaxed)
    }

    fn is_disabled(&self) -> bool {
        self.ceiling == 0
    }

    // reservations are never returned, so a spent budget stays spent
    fn is_spent(&self) -> bool {
        self.pinned() >= self.ceiling
    }

    fn try_reserve(&self) -> bool {
        let reserved = self
            .pinned
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |pinned| {
                (pinned < self.ceiling).then_some(pinned + 1)
            })
            .is_ok();
        if !reserved {
            self.note_exhausted();
        }
        reserved
    }

    fn note_exhausted(&self) {
        if !self.exhausted.swap(true, Ordering::Relaxed) {
            log::warn!(
                "class reference budget of {} exhausted, further classes stay transient",
                self.ceiling
            );
        }
    }
}

enum Insert {
    Inserted,
    Existing(Ref),
    Full,
}

struct ClassTable {
    entries: Mutex<HashMap<HandleKey, Ref>>,
    budget: ReferenceBudget,
}

#[doc(hidden)]
pub struct MemberTable<V> {
    entries: Mutex<HashMap<HandleKey, V>>,
}

impl<V: Copy> MemberTable<V> {
    fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn get(&self, key: &HandleKey) -> Option<V> {
        self.entries.lock().get(key).copied()
    }

    fn insert(&self, key: HandleKey, value: V) {
        self.entries.lock().insert(key, value);
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

/// A kind of class member with its own cache table.
pub trait Member: RawHandle + Send + 'static {
    #[doc(hidden)]
    fn lookup(
        host: &dyn HostRuntime,
        owner: Ref,
        name: &str,
        signature: &str,
        is_static: bool,
    ) -> Option<Self>;

    #[doc(hidden)]
    fn table(cache: &SymbolCache) -> &MemberTable<Self>;

    #[doc(hidden)]
    fn not_found(owner: &str, name: &str, signature: &str) -> ResolutionError;
}

impl Member for MethodId {
    fn lookup(
        host: &dyn HostRuntime,
        owner: Ref,
        name: &str,
        signature: &str,
        is_static: bool,
    ) -> Option<Self> {
        host.find_method(owner, name, signature, is_static)
    }

    fn table(cache: &SymbolCache) -> &MemberTable<Self> {
        &cache.methods
    }

    fn not_found(owner: &str, name: &str, signature: &str) -> ResolutionError {
        ResolutionError::MethodNotFound {
            owner: owner.to_string(),
            name: name.to_string(),
            signature: signature.to_string(),
        }
    }
}

impl Member for FieldId {
    fn lookup(
        host: &dyn HostRuntime,
        owner: Ref,
        name: &str,
        signature: &str,
        is_static: bool,
    ) -> Option<Self> {
        host.find_field(owner, name, signature, is_static)
    }

    fn table(cache: &SymbolCache) -> &MemberTable<Self> {
        &cache.fields
    }

    fn not_found(owner: &str, name: &str, signature: &str) -> ResolutionError {
        ResolutionError::FieldNotFound {
            owner: owner.to_string(),
            name: name.to_string(),
            signature: signature.to_string(),
        }
    }
}

pub struct SymbolCache {
    // primitive aliases, fixed at construction and read without locking
    aliases: HashMap<&'static str, Ref>,
    classes: ClassTable,
    methods: MemberTable<MethodId>,
    fields: MemberTable<FieldId>,
}

impl SymbolCache {
    pub fn new(well_known: &WellKnownSymbols, reference_budget: usize) -> Self {
        Self {
            aliases: well_known.aliases().collect(),
            classes: ClassTable {
                entries: Mutex::new(HashMap::new()),
                budget: ReferenceBudget::new(reference_budget),
            },
            methods: MemberTable::new(),
            fields: MemberTable::new(),
        }
    }

    pub fn budget(&self) -> &ReferenceBudget {
        &self.classes.budget
    }

    /// Number of classes pinned in the class table.
    pub fn class_count(&self) -> usize {
        self.classes.entries.lock().len()
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Pinned handle cached for `name`, if any. Never calls the host.
    pub fn cached_class(&self, name: &str) -> Option<Ref> {
        if let Some(alias) = self.aliases.get(name) {
            return Some(*alias);
        }
        self.classes
            .entries
            .lock()
            .get(&HandleKey::class(name))
            .copied()
    }

    pub fn resolve_class(
        &self,
        host: &dyn HostRuntime,
        slot: &ClassSlot,
        name: &str,
    ) -> Result<ClassHandle, ResolutionError> {
        if let Some(alias) = self.aliases.get(name) {
            return Ok(ClassHandle::Pinned(*alias));
        }
        if let Some(cached) = slot.get() {
            return Ok(ClassHandle::Pinned(cached));
        }

        let budget = &self.classes.budget;
        let key = HandleKey::class(name);
        if !budget.is_disabled() {
            let cached = self.classes.entries.lock().get(&key).copied();
            if let Some(cached) = cached {
                log::trace!("class cache hit {name}");
                slot.publish(cached);
                return Ok(ClassHandle::Pinned(cached));
            }
        }

        let Some(transient) = host.find_class(name) else {
            return Err(ResolutionError::ClassNotFound(name.to_string()));
        };
        if budget.is_disabled() {
            log::debug!("resolved class {name} as transient");
            return Ok(ClassHandle::Transient(transient));
        }
        if budget.is_spent() {
            budget.note_exhausted();
            return Ok(ClassHandle::Transient(transient));
        }

        // pin outside the lock, decide inside it
        let pinned = host.pin(transient);
        let outcome = {
            let mut entries = self.classes.entries.lock();
            if let Some(existing) = entries.get(&key) {
                Insert::Existing(*existing)
            } else if budget.try_reserve() {
                entries.insert(key, pinned);
                log::debug!("resolved class {name} {}", entries.len());
                Insert::Inserted
            } else {
                Insert::Full
            }
        };
        match outcome {
            Insert::Inserted => {
                host.release_transient(transient);
                slot.publish(pinned);
                Ok(ClassHandle::Pinned(pinned))
            }
            Insert::Existing(winner) => {
                // another thread pinned the same class first
                host.release_pinned(pinned);
                host.release_transient(transient);
                slot.publish(winner);
                Ok(ClassHandle::Pinned(winner))
            }
            Insert::Full => {
                host.release_pinned(pinned);
                log::debug!("resolved class {name} as transient");
                Ok(ClassHandle::Transient(transient))
            }
        }
    }

    /// Resolves a method or field of `owner`. A transient owner handle is
    /// released once the member is looked up.
    pub fn resolve_member<M: Member>(
        &self,
        host: &dyn HostRuntime,
        site: &MemberSite<M>,
        owner: &str,
        name: &str,
        signature: &str,
        is_static: bool,
    ) -> Result<M, ResolutionError> {
        if let Some(cached) = site.member.get() {
            return Ok(cached);
        }

        let class = self.resolve_class(host, &site.class, owner)?;

        let table = M::table(self);
        let key = HandleKey::member(owner, name, signature);
        if let Some(cached) = table.get(&key) {
            log::trace!("member cache hit {key}");
            Self::release(host, class);
            site.member.publish(cached);
            return Ok(cached);
        }

        let found = M::lookup(host, class.get(), name, signature, is_static);
        Self::release(host, class);
        let Some(member) = found else {
            return Err(M::not_found(owner, name, signature));
        };

        log::debug!("resolved member {key}");
        table.insert(key, member);
        site.member.publish(member);
        Ok(member)
    }

    pub fn resolve_method(
        &self,
        host: &dyn HostRuntime,
        site: &MethodSite,
        owner: &str,
        name: &str,
        signature: &str,
        is_static: bool,
    ) -> Result<MethodId, ResolutionError> {
        self.resolve_member(host, site, owner, name, signature, is_static)
    }

    pub fn resolve_field(
        &self,
        host: &dyn HostRuntime,
        site: &FieldSite,
        owner: &str,
        name: &str,
        signature: &str,
        is_static: bool,
    ) -> Result<FieldId, ResolutionError> {
        self.resolve_member(host, site, owner, name, signature, is_static)
    }

    fn release(host: &dyn HostRuntime, class: ClassHandle) {
        if let ClassHandle::Transient(reference) = class {
            host.release_transient(reference);
        }
    }
}
