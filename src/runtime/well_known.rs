//! Boxed primitive classes and their `TYPE` mirrors, looked up once at load
//! time, before any generated method is registered.

use crate::host::{HostRuntime, Ref};

use super::error::InitError;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Primitive {
    Double,
    Float,
    Long,
    Int,
    Short,
    Char,
    Byte,
    Boolean,
}

impl Primitive {
    pub const ALL: [Primitive; 8] = [
        Primitive::Double,
        Primitive::Float,
        Primitive::Long,
        Primitive::Int,
        Primitive::Short,
        Primitive::Char,
        Primitive::Byte,
        Primitive::Boolean,
    ];

    /// Short name generated code uses for the primitive's class.
    pub fn alias(self) -> &'static str {
        match self {
            Primitive::Double => "Double",
            Primitive::Float => "Float",
            Primitive::Long => "Long",
            Primitive::Int => "Int",
            Primitive::Short => "Short",
            Primitive::Char => "Char",
            Primitive::Byte => "Byte",
            Primitive::Boolean => "Boolean",
        }
    }

    pub fn box_class(self) -> &'static str {
        match self {
            Primitive::Double => "java/lang/Double",
            Primitive::Float => "java/lang/Float",
            Primitive::Long => "java/lang/Long",
            Primitive::Int => "java/lang/Integer",
            Primitive::Short => "java/lang/Short",
            Primitive::Char => "java/lang/Character",
            Primitive::Byte => "java/lang/Byte",
            Primitive::Boolean => "java/lang/Boolean",
        }
    }

    pub fn from_alias(alias: &str) -> Option<Primitive> {
        Primitive::ALL.into_iter().find(|p| p.alias() == alias)
    }

    fn index(self) -> usize {
        self as usize
    }
}

const TYPE_FIELD: &str = "TYPE";
const TYPE_SIGNATURE: &str = "Ljava/lang/Class;";

/// Pinned handles of the eight box classes and the eight primitive classes.
#[derive(Debug)]
pub struct WellKnownSymbols {
    // indexed by `Primitive`
    boxes: Vec<Ref>,
    primitives: Vec<Ref>,
}

impl WellKnownSymbols {
    pub fn init(host: &dyn HostRuntime) -> Result<Self, InitError> {
        let mut boxes = Vec::with_capacity(Primitive::ALL.len());
        let mut primitives = Vec::with_capacity(Primitive::ALL.len());
        for primitive in Primitive::ALL {
            let box_class = cache_class(host, primitive.box_class())?;
            boxes.push(box_class);
            primitives.push(cache_static_singleton(
                host,
                box_class,
                primitive.box_class(),
            )?);
        }
        log::debug!("cached {} well-known classes", boxes.len() + primitives.len());
        Ok(Self { boxes, primitives })
    }

    pub fn box_class(&self, primitive: Primitive) -> Ref {
        self.boxes[primitive.index()]
    }

    pub fn primitive_class(&self, primitive: Primitive) -> Ref {
        self.primitives[primitive.index()]
    }

    pub fn alias(&self, name: &str) -> Option<Ref> {
        Primitive::from_alias(name).map(|p| self.primitive_class(p))
    }

    /// `(alias, primitive class)` pairs.
    pub fn aliases(&self) -> impl Iterator<Item = (&'static str, Ref)> + '_ {
        Primitive::ALL
            .into_iter()
            .map(|p| (p.alias(), self.primitive_class(p)))
    }
}

fn cache_class(host: &dyn HostRuntime, name: &'static str) -> Result<Ref, InitError> {
    let transient = host
        .find_class(name)
        .ok_or(InitError::MissingClass(name))?;
    let pinned = host.pin(transient);
    host.release_transient(transient);
    Ok(pinned)
}

fn cache_static_singleton(
    host: &dyn HostRuntime,
    class: Ref,
    owner: &'static str,
) -> Result<Ref, InitError> {
    let missing = || InitError::MissingSingleton {
        owner,
        field: TYPE_FIELD,
    };
    let field = host
        .find_field(class, TYPE_FIELD, TYPE_SIGNATURE, true)
        .ok_or_else(missing)?;
    let transient = host
        .get_static_object_field(class, field)
        .ok_or_else(missing)?;
    let pinned = host.pin(transient);
    host.release_transient(transient);
    Ok(pinned)
}
