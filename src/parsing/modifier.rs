use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// Keywords placed in front of a type or member declaration
    #[derive(Default, Clone, Copy, Eq, PartialEq, Hash)]
    pub struct Modifier: u8 {
        const CLASS   = 0b0001;
        const PUBLIC  = 0b0010;
        const STATIC  = 0b0100;
        const PRIVATE = 0b1000;
    }
}

impl Modifier {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "class" => Some(Self::CLASS),
            "public" => Some(Self::PUBLIC),
            "static" => Some(Self::STATIC),
            "private" => Some(Self::PRIVATE),
            _ => None,
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            Self::CLASS => "class",
            Self::PUBLIC => "public",
            Self::STATIC => "static",
            Self::PRIVATE => "private",
            _ => "?",
        }
    }
}

/// Formats the set as its keywords separated by spaces, e.g. `public static`
impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for flag in self.iter() {
            if !first {
                f.write_str(" ")?;
            }
            f.write_str(flag.keyword())?;
            first = false;
        }
        Ok(())
    }
}

impl fmt::Debug for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "NONE");
        }
        write!(f, "{self}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords() {
        assert_eq!(Modifier::from_keyword("static"), Some(Modifier::STATIC));
        assert_eq!(Modifier::from_keyword("Static"), None);

        let set = Modifier::PUBLIC | Modifier::STATIC;
        assert_eq!(set.to_string(), "public static");
        assert_eq!(format!("{:?}", Modifier::empty()), "NONE");
    }
}
