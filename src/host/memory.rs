//! An in-process host runtime.
//!
//! [`MemoryHost`] models the parts of a managed runtime that native code can
//! observe through [`HostRuntime`]: classes with single inheritance and
//! interfaces, members looked up along the super-class chain, objects and
//! arrays, local and global references and per-thread pending exceptions.
//! Every raw lookup is counted so callers can verify caching behaviour.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering::Relaxed},
    },
    thread::{self, ThreadId},
};

use dashmap::{DashMap, mapref::entry::Entry};
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};

use crate::descriptor::{FieldDescriptor, FieldType, parse_field_descriptor, parse_method_descriptor};
use crate::host::{FieldId, HostRuntime, MethodId, Ref};

pub use class::{ClassAccessFlag, ClassDef, HostClass, MemberAccessFlag};

use class::{ArrayElement, ClassKind, MemberKind, to_members};
use heap::{Heap, HostObject, ObjectData, ObjectId, RefTable};
use inheritance::is_assignable_to;

mod bootstrap;
mod class;
mod heap;
mod inheritance;

const GLOBAL_REF_FLAG: u64 = 1 << 31;

#[derive(Debug, thiserror::Error)]
pub enum DefineError {
    #[error("class {0} is already defined")]
    Duplicate(String),
    #[error("class {class} refers to undefined class {missing}")]
    Missing { class: String, missing: String },
    #[error("class {class} has no static field {field}")]
    NoSuchStatic { class: String, field: String },
}

/// Snapshot of an exception object, for inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrownException {
    pub class_name: Arc<str>,
    pub message: Option<String>,
}

#[derive(Default)]
struct LookupCounters {
    classes: AtomicUsize,
    fields: AtomicUsize,
    methods: AtomicUsize,
    by_class_name: DashMap<String, usize>,
}

pub struct MemoryHost {
    class_registry: DashMap<String, Arc<HostClass>>,
    classes: RwLock<Vec<Arc<HostClass>>>,
    heap: RwLock<Heap>,
    locals: Mutex<RefTable>,
    globals: Mutex<RefTable>,
    pending: DashMap<ThreadId, ObjectId>,
    lookups: LookupCounters,
    lookup_failures_throw: AtomicBool,
}

impl MemoryHost {
    /// A host with the bootstrap classes, the boxed primitives and their
    /// `TYPE` mirrors defined.
    pub fn new() -> Self {
        let host = Self {
            class_registry: DashMap::new(),
            classes: RwLock::new(vec![]),
            heap: RwLock::new(Heap::new()),
            locals: Mutex::new(RefTable::new()),
            globals: Mutex::new(RefTable::new()),
            pending: DashMap::new(),
            lookups: LookupCounters::default(),
            lookup_failures_throw: AtomicBool::new(true),
        };
        bootstrap::define_bootstrap_classes(&host).expect("bootstrap classes are well formed");
        host
    }

    /// Whether failed lookups leave a linkage error pending, as a JNI host
    /// does. Enabled by default.
    pub fn set_lookup_failures_throw(&self, throw: bool) {
        self.lookup_failures_throw.store(throw, Relaxed);
    }

    pub fn define_class(&self, def: ClassDef) -> Result<Arc<HostClass>, DefineError> {
        let missing = |missing: &str| DefineError::Missing {
            class: def.name.clone(),
            missing: missing.to_string(),
        };
        let super_class = match &def.super_class {
            Some(name) => Some(self.registered(name).ok_or_else(|| missing(name))?),
            None => None,
        };
        let interfaces = def
            .interfaces
            .iter()
            .map(|name| self.registered(name).ok_or_else(|| missing(name)))
            .collect::<Result<Vec<_>, _>>()?;

        let entry = match self.class_registry.entry(def.name.clone()) {
            Entry::Occupied(_) => return Err(DefineError::Duplicate(def.name)),
            Entry::Vacant(entry) => entry,
        };
        let class = self.push_class(|id| HostClass {
            id,
            class_name: Arc::from(def.name.as_str()),
            access_flags: def.access_flags,
            kind: ClassKind::Ordinary,
            super_class,
            interfaces,
            fields: to_members(&def.fields),
            methods: to_members(&def.methods),
            static_values: RwLock::new(HashMap::new()),
            mirror: OnceCell::new(),
        });
        entry.insert(Arc::clone(&class));
        Ok(class)
    }

    pub fn class(&self, name: &str) -> Option<Arc<HostClass>> {
        self.registered(name)
    }

    /// Allocates an instance of the class `class` is a mirror of.
    pub fn new_object(&self, class: Ref) -> Option<Ref> {
        let class = self.mirrored_class(class)?;
        let id = self
            .heap
            .write()
            .allocate(class, ObjectData::Instance { message: None });
        Some(self.new_local(id))
    }

    pub fn new_int_array(&self, length: usize) -> Ref {
        let class = self.array_class(ArrayElement::Primitive(FieldType::Int));
        let id = self
            .heap
            .write()
            .allocate(class, ObjectData::IntArray(Mutex::new(vec![0; length])));
        self.new_local(id)
    }

    pub fn new_object_array(&self, length: usize, element_class: Ref) -> Option<Ref> {
        let element = self.mirrored_class(element_class)?;
        let element = match &element.kind {
            ClassKind::Primitive(field_type) => ArrayElement::Primitive(field_type.clone()),
            _ => ArrayElement::Reference(element),
        };
        let class = self.array_class(element);
        let id = self
            .heap
            .write()
            .allocate(class, ObjectData::RefArray(Mutex::new(vec![None; length])));
        Some(self.new_local(id))
    }

    pub fn int_array_elements(&self, array: Ref) -> Option<Vec<i32>> {
        match &self.object(array)?.data {
            ObjectData::IntArray(values) => Some(values.lock().clone()),
            _ => None,
        }
    }

    /// Elements of a reference array, each as a fresh transient reference.
    pub fn object_array_elements(&self, array: Ref) -> Option<Vec<Option<Ref>>> {
        let ids = match &self.object(array)?.data {
            ObjectData::RefArray(values) => values.lock().clone(),
            _ => return None,
        };
        Some(
            ids.into_iter()
                .map(|id| id.map(|id| self.new_local(id)))
                .collect(),
        )
    }

    /// Name of the class of the object behind `reference`.
    pub fn class_name_of(&self, reference: Ref) -> Option<Arc<str>> {
        Some(Arc::clone(&self.object(reference)?.class.class_name))
    }

    /// Name of the class `mirror` stands for.
    pub fn mirror_name(&self, mirror: Ref) -> Option<Arc<str>> {
        Some(Arc::clone(&self.mirrored_class(mirror)?.class_name))
    }

    pub fn describe_exception(&self, exception: Ref) -> Option<ThrownException> {
        let object = self.object(exception)?;
        Some(Self::describe(&object))
    }

    /// The calling thread's pending exception, left pending.
    pub fn pending_exception(&self) -> Option<ThrownException> {
        let id = *self.pending.get(&thread::current().id())?;
        let object = self.heap.read().get(id)?;
        Some(Self::describe(&object))
    }

    pub fn class_lookup_count(&self) -> usize {
        self.lookups.classes.load(Relaxed)
    }

    pub fn class_lookup_count_for(&self, name: &str) -> usize {
        self.lookups
            .by_class_name
            .get(name)
            .map(|count| *count)
            .unwrap_or(0)
    }

    pub fn field_lookup_count(&self) -> usize {
        self.lookups.fields.load(Relaxed)
    }

    pub fn method_lookup_count(&self) -> usize {
        self.lookups.methods.load(Relaxed)
    }

    pub fn pinned_count(&self) -> usize {
        self.globals.lock().live()
    }

    pub fn transient_count(&self) -> usize {
        self.locals.lock().live()
    }

    pub fn is_pinned(&self, reference: Ref) -> bool {
        reference.into_raw() & GLOBAL_REF_FLAG != 0 && self.object_id(reference).is_some()
    }

    fn describe(object: &HostObject) -> ThrownException {
        let message = match &object.data {
            ObjectData::Instance { message } => message.clone(),
            _ => None,
        };
        ThrownException {
            class_name: Arc::clone(&object.class.class_name),
            message,
        }
    }

    fn registered(&self, name: &str) -> Option<Arc<HostClass>> {
        self.class_registry
            .get(name)
            .map(|class| Arc::clone(class.value()))
    }

    fn push_class(&self, build: impl FnOnce(u32) -> HostClass) -> Arc<HostClass> {
        let mut classes = self.classes.write();
        let class = Arc::new(build(classes.len() as u32 + 1));
        classes.push(Arc::clone(&class));
        class
    }

    fn class_by_id(&self, id: u32) -> Option<Arc<HostClass>> {
        let index = (id as usize).checked_sub(1)?;
        self.classes.read().get(index).map(Arc::clone)
    }

    pub(crate) fn define_primitive(&self, name: &str, field_type: FieldType) -> Arc<HostClass> {
        self.push_class(|id| HostClass {
            id,
            class_name: Arc::from(name),
            access_flags: ClassAccessFlag::PUBLIC | ClassAccessFlag::FINAL | ClassAccessFlag::ABSTRACT,
            kind: ClassKind::Primitive(field_type),
            super_class: None,
            interfaces: vec![],
            fields: vec![],
            methods: vec![],
            static_values: RwLock::new(HashMap::new()),
            mirror: OnceCell::new(),
        })
    }

    pub(crate) fn set_static_mirror(
        &self,
        class_name: &str,
        field: &str,
        value: &Arc<HostClass>,
    ) -> Result<(), DefineError> {
        let no_such_static = || DefineError::NoSuchStatic {
            class: class_name.to_string(),
            field: field.to_string(),
        };
        let class = self.registered(class_name).ok_or_else(no_such_static)?;
        let index = class
            .fields
            .iter()
            .position(|f| f.name.as_ref() == field && f.is_static())
            .ok_or_else(no_such_static)?;
        let mirror = self.mirror_of(value);
        class.static_values.write().insert(index, mirror);
        Ok(())
    }

    fn array_class(&self, element: ArrayElement) -> Arc<HostClass> {
        let name = match &element {
            ArrayElement::Primitive(field_type) => format!("[{}", field_type.to_descriptor()),
            ArrayElement::Reference(class) if class.array_element().is_some() => {
                format!("[{}", class.class_name)
            }
            ArrayElement::Reference(class) => format!("[L{};", class.class_name),
        };
        if let Some(class) = self.registered(&name) {
            return class;
        }
        let object = self.registered("java/lang/Object");
        let interfaces = ["java/lang/Cloneable", "java/io/Serializable"]
            .iter()
            .filter_map(|name| self.registered(name))
            .collect();
        match self.class_registry.entry(name.clone()) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                let class = self.push_class(|id| HostClass {
                    id,
                    class_name: Arc::from(name.as_str()),
                    access_flags: ClassAccessFlag::PUBLIC | ClassAccessFlag::FINAL,
                    kind: ClassKind::Array(element),
                    super_class: object,
                    interfaces,
                    fields: vec![],
                    methods: vec![],
                    static_values: RwLock::new(HashMap::new()),
                    mirror: OnceCell::new(),
                });
                entry.insert(Arc::clone(&class));
                class
            }
        }
    }

    fn array_class_for(&self, field_type: FieldType) -> Option<Arc<HostClass>> {
        let FieldType::Array(element) = field_type else {
            return None;
        };
        let element = match *element {
            FieldType::Object(class_name) => ArrayElement::Reference(self.registered(&class_name)?),
            nested @ FieldType::Array(_) => ArrayElement::Reference(self.array_class_for(nested)?),
            primitive => ArrayElement::Primitive(primitive),
        };
        Some(self.array_class(element))
    }

    fn mirror_of(&self, class: &Arc<HostClass>) -> ObjectId {
        let class_class = self.registered("java/lang/Class").unwrap_or_else(|| Arc::clone(class));
        *class.mirror.get_or_init(|| {
            self.heap
                .write()
                .allocate(class_class, ObjectData::Mirror(Arc::clone(class)))
        })
    }

    fn new_local(&self, object: ObjectId) -> Ref {
        let id = self.locals.lock().add(object);
        Self::make_ref(id as u64)
    }

    fn new_global(&self, object: ObjectId) -> Ref {
        let id = self.globals.lock().add(object);
        assert!((id as u64) < GLOBAL_REF_FLAG, "global reference table overflow");
        Self::make_ref(id as u64 | GLOBAL_REF_FLAG)
    }

    fn make_ref(raw: u64) -> Ref {
        Ref::from_raw(raw).expect("reference table ids start at 1")
    }

    fn object_id(&self, reference: Ref) -> Option<ObjectId> {
        let raw = reference.into_raw();
        let id = (raw & !GLOBAL_REF_FLAG) as u32;
        if raw & GLOBAL_REF_FLAG != 0 {
            self.globals.lock().get(id)
        } else {
            self.locals.lock().get(id)
        }
    }

    fn object(&self, reference: Ref) -> Option<Arc<HostObject>> {
        let object = self
            .object_id(reference)
            .and_then(|id| self.heap.read().get(id));
        if object.is_none() {
            log::warn!("invalid reference {reference:?}");
        }
        object
    }

    fn mirrored_class(&self, mirror: Ref) -> Option<Arc<HostClass>> {
        match &self.object(mirror)?.data {
            ObjectData::Mirror(class) => Some(Arc::clone(class)),
            _ => None,
        }
    }

    fn set_pending(&self, exception: ObjectId) {
        self.pending.insert(thread::current().id(), exception);
    }

    fn throw_by_name(&self, class_name: &str, message: &str) {
        let Some(class) = self.registered(class_name) else {
            return;
        };
        let id = self.heap.write().allocate(
            class,
            ObjectData::Instance {
                message: Some(message.to_string()),
            },
        );
        self.set_pending(id);
    }

    fn lookup_failed(&self, class_name: &str, message: &str) {
        if self.lookup_failures_throw.load(Relaxed) {
            self.throw_by_name(class_name, message);
        }
    }

    fn encode_member(class: &HostClass, index: usize) -> u64 {
        ((class.id as u64) << 32) | (index as u64 + 1)
    }

    fn decode_member(raw: u64) -> Option<(u32, usize)> {
        let index = ((raw & 0xFFFF_FFFF) as usize).checked_sub(1)?;
        Some(((raw >> 32) as u32, index))
    }

    /// Walks `class`, its super classes and, for instance members, its
    /// interfaces.
    fn find_member(
        class: &Arc<HostClass>,
        kind: MemberKind,
        name: &str,
        signature: &str,
        is_static: bool,
    ) -> Option<u64> {
        let mut current = Some(class);
        while let Some(class) = current {
            let found = class.members(kind).iter().position(|m| {
                m.name.as_ref() == name
                    && m.descriptor.as_ref() == signature
                    && m.is_static() == is_static
            });
            if let Some(index) = found {
                return Some(Self::encode_member(class, index));
            }
            current = class.super_class.as_ref();
        }
        if is_static {
            return None;
        }
        let mut current = Some(class);
        while let Some(class) = current {
            for interface in &class.interfaces {
                if let Some(found) = Self::find_member(interface, kind, name, signature, false)
                {
                    return Some(found);
                }
            }
            current = class.super_class.as_ref();
        }
        None
    }

    fn array_bounds_error(&self, index: i64, length: usize) {
        self.throw_by_name(
            "java/lang/ArrayIndexOutOfBoundsException",
            &format!("Index {index} out of bounds for length {length}"),
        );
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostRuntime for MemoryHost {
    fn find_class(&self, name: &str) -> Option<Ref> {
        self.lookups.classes.fetch_add(1, Relaxed);
        *self
            .lookups
            .by_class_name
            .entry(name.to_string())
            .or_default() += 1;

        let class = if name.starts_with('[') {
            parse_field_descriptor(name)
                .ok()
                .and_then(|(_, FieldDescriptor(field_type))| self.array_class_for(field_type))
        } else {
            self.registered(name)
        };
        let Some(class) = class else {
            self.lookup_failed("java/lang/NoClassDefFoundError", name);
            return None;
        };
        let mirror = self.mirror_of(&class);
        Some(self.new_local(mirror))
    }

    fn find_field(
        &self,
        owner: Ref,
        name: &str,
        signature: &str,
        is_static: bool,
    ) -> Option<FieldId> {
        self.lookups.fields.fetch_add(1, Relaxed);
        let found = self.mirrored_class(owner).and_then(|class| {
            parse_field_descriptor(signature).ok()?;
            Self::find_member(&class, MemberKind::Field, name, signature, is_static)
        });
        let field = found.and_then(FieldId::from_raw);
        if field.is_none() {
            self.lookup_failed("java/lang/NoSuchFieldError", name);
        }
        field
    }

    fn find_method(
        &self,
        owner: Ref,
        name: &str,
        signature: &str,
        is_static: bool,
    ) -> Option<MethodId> {
        self.lookups.methods.fetch_add(1, Relaxed);
        let found = self.mirrored_class(owner).and_then(|class| {
            parse_method_descriptor(signature).ok()?;
            Self::find_member(&class, MemberKind::Method, name, signature, is_static)
        });
        let method = found.and_then(MethodId::from_raw);
        if method.is_none() {
            self.lookup_failed("java/lang/NoSuchMethodError", name);
        }
        method
    }

    fn pin(&self, reference: Ref) -> Ref {
        match self.object_id(reference) {
            Some(object) => self.new_global(object),
            None => {
                log::warn!("pinning invalid reference {reference:?}");
                reference
            }
        }
    }

    fn release_pinned(&self, reference: Ref) {
        let raw = reference.into_raw();
        if raw & GLOBAL_REF_FLAG == 0 || !self.globals.lock().remove((raw & !GLOBAL_REF_FLAG) as u32) {
            log::warn!("releasing unknown pinned reference {reference:?}");
        }
    }

    fn release_transient(&self, reference: Ref) {
        let raw = reference.into_raw();
        if raw & GLOBAL_REF_FLAG != 0 || !self.locals.lock().remove(raw as u32) {
            log::warn!("releasing unknown transient reference {reference:?}");
        }
    }

    fn is_instance_of(&self, value: Option<Ref>, class: Ref) -> bool {
        let Some(value) = value else {
            return true;
        };
        let (Some(object), Some(target)) = (self.object(value), self.mirrored_class(class)) else {
            return false;
        };
        is_assignable_to(&object.class, &target)
    }

    fn is_same_object(&self, a: Option<Ref>, b: Option<Ref>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => {
                let a = self.object_id(a);
                a.is_some() && a == self.object_id(b)
            }
            _ => false,
        }
    }

    fn throw_new(&self, class: Ref, message: &str) {
        let Some(class) = self.mirrored_class(class) else {
            return;
        };
        let id = self.heap.write().allocate(
            class,
            ObjectData::Instance {
                message: Some(message.to_string()),
            },
        );
        self.set_pending(id);
    }

    fn throw(&self, exception: Ref) {
        if let Some(id) = self.object_id(exception) {
            self.set_pending(id);
        }
    }

    fn exception_pending(&self) -> bool {
        self.pending.contains_key(&thread::current().id())
    }

    fn take_exception(&self) -> Option<Ref> {
        let (_, id) = self.pending.remove(&thread::current().id())?;
        Some(self.new_local(id))
    }

    fn clear_exception(&self) {
        self.pending.remove(&thread::current().id());
    }

    fn get_static_object_field(&self, class: Ref, field: FieldId) -> Option<Ref> {
        self.mirrored_class(class)?;
        let (class_id, index) = Self::decode_member(field.into_raw())?;
        let declaring = self.class_by_id(class_id)?;
        let value = declaring.static_values.read().get(&index).copied()?;
        Some(self.new_local(value))
    }

    fn set_object_array_element(&self, array: Ref, index: i32, value: Option<Ref>) {
        let Some(object) = self.object(array) else {
            return;
        };
        let ObjectData::RefArray(elements) = &object.data else {
            self.throw_by_name("java/lang/ArrayStoreException", &object.class.class_name);
            return;
        };
        let value = match value {
            Some(value) => match self.object(value) {
                Some(value_object) => {
                    let storable = match object.class.array_element() {
                        Some(ArrayElement::Reference(element)) => {
                            is_assignable_to(&value_object.class, element)
                        }
                        _ => false,
                    };
                    if !storable {
                        self.throw_by_name(
                            "java/lang/ArrayStoreException",
                            &value_object.class.class_name,
                        );
                        return;
                    }
                    self.object_id(value)
                }
                None => return,
            },
            None => None,
        };
        let mut elements = elements.lock();
        let length = elements.len();
        match usize::try_from(index).ok().and_then(|i| elements.get_mut(i)) {
            Some(slot) => *slot = value,
            None => {
                drop(elements);
                self.array_bounds_error(index as i64, length);
            }
        }
    }

    fn set_int_array_region(&self, array: Ref, start: i32, values: &[i32]) {
        let Some(object) = self.object(array) else {
            return;
        };
        let ObjectData::IntArray(elements) = &object.data else {
            self.throw_by_name("java/lang/ArrayStoreException", &object.class.class_name);
            return;
        };
        let mut elements = elements.lock();
        let length = elements.len();
        let range = usize::try_from(start)
            .ok()
            .and_then(|start| Some(start..start.checked_add(values.len())?))
            .filter(|range| range.end <= length);
        match range {
            Some(range) => elements[range].copy_from_slice(values),
            None => {
                drop(elements);
                self.array_bounds_error(start as i64 + values.len() as i64 - 1, length);
            }
        }
    }
}
