use crate::descriptor::FieldType;

use super::{ClassDef, DefineError, MemoryHost};

const THROWABLES: &[(&str, &str)] = &[
    ("java/lang/Throwable", "java/lang/Object"),
    ("java/lang/Exception", "java/lang/Throwable"),
    ("java/lang/Error", "java/lang/Throwable"),
    ("java/lang/RuntimeException", "java/lang/Exception"),
    ("java/lang/LinkageError", "java/lang/Error"),
    ("java/lang/NoClassDefFoundError", "java/lang/LinkageError"),
    ("java/lang/IncompatibleClassChangeError", "java/lang/LinkageError"),
    ("java/lang/NoSuchFieldError", "java/lang/IncompatibleClassChangeError"),
    ("java/lang/NoSuchMethodError", "java/lang/IncompatibleClassChangeError"),
    ("java/lang/ClassCastException", "java/lang/RuntimeException"),
    ("java/lang/NullPointerException", "java/lang/RuntimeException"),
    ("java/lang/ArithmeticException", "java/lang/RuntimeException"),
    ("java/lang/NegativeArraySizeException", "java/lang/RuntimeException"),
    ("java/lang/ArrayStoreException", "java/lang/RuntimeException"),
    ("java/lang/IndexOutOfBoundsException", "java/lang/RuntimeException"),
    (
        "java/lang/ArrayIndexOutOfBoundsException",
        "java/lang/IndexOutOfBoundsException",
    ),
];

// box class, super class, primitive name, primitive type
const BOXES: &[(&str, &str, &str, FieldType)] = &[
    ("java/lang/Double", "java/lang/Number", "double", FieldType::Double),
    ("java/lang/Float", "java/lang/Number", "float", FieldType::Float),
    ("java/lang/Long", "java/lang/Number", "long", FieldType::Long),
    ("java/lang/Integer", "java/lang/Number", "int", FieldType::Int),
    ("java/lang/Short", "java/lang/Number", "short", FieldType::Short),
    ("java/lang/Character", "java/lang/Object", "char", FieldType::Char),
    ("java/lang/Byte", "java/lang/Number", "byte", FieldType::Byte),
    ("java/lang/Boolean", "java/lang/Object", "boolean", FieldType::Boolean),
];

pub(super) fn define_bootstrap_classes(host: &MemoryHost) -> Result<(), DefineError> {
    host.define_class(ClassDef::new("java/lang/Object").method("hashCode", "()I"))?;
    host.define_class(ClassDef::interface("java/lang/Cloneable"))?;
    host.define_class(ClassDef::interface("java/io/Serializable"))?;
    host.define_class(ClassDef::interface("java/lang/Comparable"))?;
    host.define_class(ClassDef::new("java/lang/Class").method("getName", "()Ljava/lang/String;"))?;
    host.define_class(
        ClassDef::new("java/lang/String")
            .implements("java/io/Serializable")
            .implements("java/lang/Comparable")
            .method("length", "()I"),
    )?;

    for (name, super_class) in THROWABLES {
        host.define_class(
            ClassDef::new(*name)
                .extends(*super_class)
                .method("getMessage", "()Ljava/lang/String;"),
        )?;
    }

    host.define_class(
        ClassDef::new("java/lang/Number")
            .implements("java/io/Serializable")
            .method("intValue", "()I"),
    )?;
    for (name, super_class, primitive_name, primitive) in BOXES {
        let descriptor = primitive.to_descriptor();
        host.define_class(
            ClassDef::new(*name)
                .extends(*super_class)
                .implements("java/lang/Comparable")
                .static_field("TYPE", "Ljava/lang/Class;")
                .field("value", descriptor.as_str())
                .static_method("valueOf", format!("({descriptor})L{name};")),
        )?;
        let primitive_class = host.define_primitive(primitive_name, primitive.clone());
        host.set_static_mirror(name, "TYPE", &primitive_class)?;
    }
    Ok(())
}
