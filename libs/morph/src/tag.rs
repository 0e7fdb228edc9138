//! Field tag mini-grammar: `key[,modifier...]`.

pub const TAG_OMIT_EMPTY: &str = "omitempty";
pub const TAG_OMIT_NESTED: &str = "omitnested";

/// Parsed field tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagSpec<'a> {
    pub key: &'a str,
    pub omit_empty: bool,
    pub omit_nested: bool,
}

/// Parse a raw tag. `None` means the field is excluded under this namespace.
pub fn parse(raw: &str) -> Option<TagSpec<'_>> {
    let mut parts = raw.split(',');
    let key = parts.next()?;
    if key.is_empty() || key == "-" {
        return None;
    }

    let mut spec = TagSpec { key, omit_empty: false, omit_nested: false };
    for modifier in parts {
        let modifier = modifier.trim();
        if modifier.eq_ignore_ascii_case(TAG_OMIT_EMPTY) {
            spec.omit_empty = true;
        } else if modifier.eq_ignore_ascii_case(TAG_OMIT_NESTED) {
            spec.omit_nested = true;
        }
    }
    Some(spec)
}
