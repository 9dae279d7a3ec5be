use std::fmt;

/// Identity of a cached symbol. Class keys leave `member` and `signature`
/// empty. Ordering is field by field, lexicographic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandleKey {
    pub owner: String,
    pub member: String,
    pub signature: String,
}

impl HandleKey {
    pub fn class(owner: &str) -> Self {
        Self::member(owner, "", "")
    }

    pub fn member(owner: &str, member: &str, signature: &str) -> Self {
        Self {
            owner: owner.to_string(),
            member: member.to_string(),
            signature: signature.to_string(),
        }
    }

    pub fn is_class(&self) -> bool {
        self.member.is_empty() && self.signature.is_empty()
    }
}

impl fmt::Display for HandleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_class() {
            write!(f, "{}", self.owner)
        } else {
            write!(f, "{}.{}{}", self.owner, self.member, self.signature)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_is_field_by_field() {
        let mut keys = vec![
            HandleKey::member("b/B", "a", "()V"),
            HandleKey::member("a/A", "m", "(I)V"),
            HandleKey::class("a/A"),
            HandleKey::member("a/A", "m", "()V"),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                HandleKey::class("a/A"),
                HandleKey::member("a/A", "m", "()V"),
                HandleKey::member("a/A", "m", "(I)V"),
                HandleKey::member("b/B", "a", "()V"),
            ]
        );
    }

    #[test]
    fn test_class_key() {
        assert!(HandleKey::class("java/lang/String").is_class());
        assert!(!HandleKey::member("java/lang/String", "length", "()I").is_class());
        assert_ne!(
            HandleKey::class("java/lang/String"),
            HandleKey::member("java/lang/String", "length", "")
        );
        assert_eq!(
            HandleKey::member("java/lang/String", "length", "()I").to_string(),
            "java/lang/String.length()I"
        );
    }
}
