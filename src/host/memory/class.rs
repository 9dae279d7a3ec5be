use std::{collections::HashMap, sync::Arc};

use once_cell::sync::OnceCell;
use parking_lot::RwLock;

use crate::descriptor::FieldType;

use super::heap::ObjectId;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClassAccessFlag: u16 {
        const PUBLIC = 0x0001;
        const FINAL = 0x0010;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MemberAccessFlag: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
    }
}

#[derive(Debug, Clone)]
pub enum ArrayElement {
    Primitive(FieldType),
    Reference(Arc<HostClass>),
}

#[derive(Debug, Clone)]
pub enum ClassKind {
    Ordinary,
    Array(ArrayElement),
    Primitive(FieldType),
}

#[derive(Debug, Clone)]
pub struct MemberInfo {
    pub(crate) access_flags: MemberAccessFlag,
    pub(crate) name: Arc<str>,
    pub(crate) descriptor: Arc<str>,
}

impl MemberInfo {
    pub(crate) fn is_static(&self) -> bool {
        self.access_flags.contains(MemberAccessFlag::STATIC)
    }
}

#[derive(Debug)]
pub struct HostClass {
    pub(crate) id: u32,
    pub(crate) class_name: Arc<str>,
    pub(crate) access_flags: ClassAccessFlag,
    pub(crate) kind: ClassKind,
    pub(crate) super_class: Option<Arc<HostClass>>,
    pub(crate) interfaces: Vec<Arc<HostClass>>,
    pub(crate) fields: Vec<MemberInfo>,
    pub(crate) methods: Vec<MemberInfo>,
    // field index -> value of a static reference field
    pub(crate) static_values: RwLock<HashMap<usize, ObjectId>>,
    pub(crate) mirror: OnceCell<ObjectId>,
}

impl HostClass {
    pub fn name(&self) -> &str {
        &self.class_name
    }

    pub(crate) fn is_interface(&self) -> bool {
        self.access_flags.contains(ClassAccessFlag::INTERFACE)
    }

    pub(crate) fn array_element(&self) -> Option<&ArrayElement> {
        match &self.kind {
            ClassKind::Array(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn members(&self, kind: MemberKind) -> &[MemberInfo] {
        match kind {
            MemberKind::Field => &self.fields,
            MemberKind::Method => &self.methods,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MemberKind {
    Field,
    Method,
}

/// Declaration of a class to be defined in a [`MemoryHost`](super::MemoryHost).
#[derive(Debug, Clone)]
pub struct ClassDef {
    pub(crate) name: String,
    pub(crate) access_flags: ClassAccessFlag,
    pub(crate) super_class: Option<String>,
    pub(crate) interfaces: Vec<String>,
    pub(crate) fields: Vec<(String, String, MemberAccessFlag)>,
    pub(crate) methods: Vec<(String, String, MemberAccessFlag)>,
}

impl ClassDef {
    /// A public class extending `java/lang/Object`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let super_class = (name != "java/lang/Object").then(|| "java/lang/Object".to_string());
        Self {
            name,
            access_flags: ClassAccessFlag::PUBLIC,
            super_class,
            interfaces: vec![],
            fields: vec![],
            methods: vec![],
        }
    }

    pub fn interface(name: impl Into<String>) -> Self {
        let mut def = Self::new(name);
        def.access_flags |= ClassAccessFlag::INTERFACE | ClassAccessFlag::ABSTRACT;
        def
    }

    pub fn extends(mut self, super_class: impl Into<String>) -> Self {
        self.super_class = Some(super_class.into());
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn field(self, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        self.field_with(name, descriptor, MemberAccessFlag::PUBLIC)
    }

    pub fn static_field(self, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        self.field_with(
            name,
            descriptor,
            MemberAccessFlag::PUBLIC | MemberAccessFlag::STATIC,
        )
    }

    pub fn method(self, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        self.method_with(name, descriptor, MemberAccessFlag::PUBLIC)
    }

    pub fn static_method(self, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        self.method_with(
            name,
            descriptor,
            MemberAccessFlag::PUBLIC | MemberAccessFlag::STATIC,
        )
    }

    pub fn field_with(
        mut self,
        name: impl Into<String>,
        descriptor: impl Into<String>,
        access_flags: MemberAccessFlag,
    ) -> Self {
        self.fields
            .push((name.into(), descriptor.into(), access_flags));
        self
    }

    pub fn method_with(
        mut self,
        name: impl Into<String>,
        descriptor: impl Into<String>,
        access_flags: MemberAccessFlag,
    ) -> Self {
        self.methods
            .push((name.into(), descriptor.into(), access_flags));
        self
    }
}

pub(crate) fn to_members(members: &[(String, String, MemberAccessFlag)]) -> Vec<MemberInfo> {
    members
        .iter()
        .map(|(name, descriptor, access_flags)| MemberInfo {
            access_flags: *access_flags,
            name: Arc::from(name.as_str()),
            descriptor: Arc::from(descriptor.as_str()),
        })
        .collect()
}
