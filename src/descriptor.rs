use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::take_until,
    character::complete::{char, one_of},
    combinator::{all_consuming, map},
    multi::many0,
    sequence::delimited,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldDescriptor(pub FieldType);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub parameters: Vec<FieldType>,
    pub return_type: ReturnType,
}

pub type ReturnType = Option<FieldType>;

#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub enum FieldType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Object(String),
    Short,
    Boolean,
    Array(Box<FieldType>),
}

impl FieldType {
    pub fn is_primitive(&self) -> bool {
        !matches!(self, FieldType::Object(_) | FieldType::Array(_))
    }

    pub fn to_descriptor(&self) -> String {
        match self {
            FieldType::Byte => "B".to_string(),
            FieldType::Char => "C".to_string(),
            FieldType::Double => "D".to_string(),
            FieldType::Float => "F".to_string(),
            FieldType::Int => "I".to_string(),
            FieldType::Long => "J".to_string(),
            FieldType::Short => "S".to_string(),
            FieldType::Boolean => "Z".to_string(),
            FieldType::Object(class_name) => format!("L{class_name};"),
            FieldType::Array(element) => format!("[{}", element.to_descriptor()),
        }
    }
}

/// Whether values described by `descriptor` are object references.
///
/// Only the first character is inspected, an empty descriptor is primitive.
pub fn is_reference_descriptor(descriptor: &str) -> bool {
    matches!(descriptor.as_bytes().first(), Some(b'[' | b'L'))
}

pub fn parse_field_descriptor(input: &str) -> IResult<&str, FieldDescriptor> {
    map(all_consuming(parse_field_type), FieldDescriptor).parse(input)
}

pub fn parse_method_descriptor(input: &str) -> IResult<&str, MethodDescriptor> {
    let (input, parameters) =
        delimited(char('('), many0(parse_field_type), char(')')).parse(input)?;

    let (input, return_type) = all_consuming(parse_return_type_descriptor).parse(input)?;

    Ok((
        input,
        MethodDescriptor {
            parameters,
            return_type,
        },
    ))
}

pub fn parse_return_type_descriptor(input: &str) -> IResult<&str, ReturnType> {
    alt((map(parse_field_type, Some), parse_void_type)).parse(input)
}

fn parse_field_type(input: &str) -> IResult<&str, FieldType> {
    alt((parse_base_type, parse_object_type, parse_array_type)).parse(input)
}

fn parse_base_type(input: &str) -> IResult<&str, FieldType> {
    map(one_of("BCDFIJSZ"), |ch| match ch {
        'B' => FieldType::Byte,
        'C' => FieldType::Char,
        'D' => FieldType::Double,
        'F' => FieldType::Float,
        'I' => FieldType::Int,
        'J' => FieldType::Long,
        'S' => FieldType::Short,
        _ => FieldType::Boolean,
    })
    .parse(input)
}

fn parse_object_type(input: &str) -> IResult<&str, FieldType> {
    map(delimited(char('L'), take_until(";"), char(';')), |class_name: &str| {
        FieldType::Object(class_name.to_string())
    })
    .parse(input)
}

fn parse_array_type(input: &str) -> IResult<&str, FieldType> {
    let (input, _) = char('[').parse(input)?;

    let (input, field_type) = parse_field_type(input)?;

    Ok((input, FieldType::Array(Box::new(field_type))))
}

fn parse_void_type(input: &str) -> IResult<&str, Option<FieldType>> {
    map(char('V'), |_| None).parse(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_descriptor() {
        let (_, FieldDescriptor(field_type)) =
            parse_field_descriptor("[Ljava/lang/String;").unwrap();
        assert_eq!(
            field_type,
            FieldType::Array(Box::new(FieldType::Object("java/lang/String".to_string())))
        );
        assert_eq!(field_type.to_descriptor(), "[Ljava/lang/String;");
        assert!(parse_field_descriptor("II").is_err());
        assert!(parse_field_descriptor("Ljava/lang/String").is_err());
    }

    #[test]
    fn test_method_descriptor() {
        let (_, descriptor) = parse_method_descriptor("(I[JLjava/lang/Object;)V").unwrap();
        assert_eq!(
            descriptor.parameters,
            vec![
                FieldType::Int,
                FieldType::Array(Box::new(FieldType::Long)),
                FieldType::Object("java/lang/Object".to_string()),
            ]
        );
        assert_eq!(descriptor.return_type, None);

        let (_, descriptor) = parse_method_descriptor("()Ljava/lang/String;").unwrap();
        assert!(descriptor.parameters.is_empty());
        assert_eq!(
            descriptor.return_type,
            Some(FieldType::Object("java/lang/String".to_string()))
        );

        assert!(parse_method_descriptor("(I").is_err());
        assert!(parse_method_descriptor("()").is_err());
        assert!(parse_method_descriptor("()VV").is_err());
    }

    #[test]
    fn test_reference_descriptor() {
        assert!(is_reference_descriptor("[I"));
        assert!(is_reference_descriptor("Ljava/lang/Object;"));
        assert!(!is_reference_descriptor("I"));
        assert!(!is_reference_descriptor(""));
    }
}
