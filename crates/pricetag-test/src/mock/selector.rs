//! Minimal CSS selector support for the in-memory document.
//!
//! Supported: type, `*`, `#id`, `.class`, `[attr]`, `[attr="value"]`,
//! descendant and `>` child combinators, and `,` selector lists.

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SelectorList(Vec<Complex>);

#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    /// Compounds left to right, each with the combinator linking it to the previous one.
    parts: Vec<(Combinator, Compound)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, Option<String>)>,
}

/// What the matcher needs to know about an element.
pub(crate) trait SelectorTarget {
    fn tag(&self) -> &str;
    fn id(&self) -> Option<&str>;
    fn has_class(&self, class: &str) -> bool;
    fn attribute(&self, name: &str) -> Option<&str>;
}

impl SelectorList {
    /// Parses a selector list, returning `None` for unsupported syntax.
    pub(crate) fn parse(input: &str) -> Option<Self> {
        let complexes = input
            .split(',')
            .map(|part| Complex::parse(part.trim()))
            .collect::<Option<Vec<_>>>()?;

        if complexes.is_empty() {
            None
        } else {
            Some(Self(complexes))
        }
    }

    /// Returns whether the element matches, given its ancestors nearest first.
    pub(crate) fn matches<T: SelectorTarget>(&self, element: &T, ancestors: &[&T]) -> bool {
        self.0.iter().any(|complex| complex.matches(element, ancestors))
    }
}

impl Complex {
    fn parse(input: &str) -> Option<Self> {
        if input.is_empty() {
            return None;
        }

        let mut parts = Vec::new();
        let mut pending = Combinator::Descendant;
        let spaced = input.replace('>', " > ");

        for token in spaced.split_whitespace() {
            if token == ">" {
                if parts.is_empty() {
                    return None;
                }
                pending = Combinator::Child;
                continue;
            }
            parts.push((pending, Compound::parse(token)?));
            pending = Combinator::Descendant;
        }

        if parts.is_empty() || pending == Combinator::Child {
            None
        } else {
            Some(Self { parts })
        }
    }

    fn matches<T: SelectorTarget>(&self, element: &T, ancestors: &[&T]) -> bool {
        let Some(((combinator, last), rest)) = self.parts.split_last() else {
            return false;
        };

        last.matches(element) && Self::match_rest(rest, *combinator, ancestors)
    }

    /// Matches the remaining compounds right to left against the ancestor chain.
    fn match_rest<T: SelectorTarget>(
        rest: &[(Combinator, Compound)],
        link: Combinator,
        ancestors: &[&T],
    ) -> bool {
        let Some(((next_link, compound), remaining)) = rest.split_last() else {
            return true;
        };

        match link {
            Combinator::Child => ancestors.first().is_some_and(|parent| {
                compound.matches(*parent)
                    && Self::match_rest(remaining, *next_link, &ancestors[1..])
            }),
            Combinator::Descendant => (0..ancestors.len()).any(|index| {
                compound.matches(ancestors[index])
                    && Self::match_rest(remaining, *next_link, &ancestors[index + 1..])
            }),
        }
    }
}

impl Compound {
    fn parse(token: &str) -> Option<Self> {
        let mut compound = Compound::default();
        let mut chars = token.char_indices().peekable();
        let name_end = |s: &str, from: usize| {
            s[from..]
                .find(['#', '.', '['])
                .map_or(s.len(), |offset| from + offset)
        };

        while let Some((index, c)) = chars.next() {
            match c {
                '#' | '.' => {
                    let end = name_end(token, index + 1);
                    let name = &token[index + 1..end];
                    if name.is_empty() {
                        return None;
                    }
                    if c == '#' {
                        compound.id = Some(name.to_owned());
                    } else {
                        compound.classes.push(name.to_owned());
                    }
                    while chars.peek().is_some_and(|(i, _)| *i < end) {
                        chars.next();
                    }
                }
                '[' => {
                    let close = token[index..].find(']')? + index;
                    let inner = &token[index + 1..close];
                    let attribute = match inner.split_once('=') {
                        Some((name, value)) => {
                            let value = value.trim_matches(|q| q == '"' || q == '\'');
                            (name.trim().to_owned(), Some(value.to_owned()))
                        }
                        None => (inner.trim().to_owned(), None),
                    };
                    compound.attributes.push(attribute);
                    while chars.peek().is_some_and(|(i, _)| *i <= close) {
                        chars.next();
                    }
                }
                _ if index == 0 => {
                    let end = name_end(token, 0);
                    let tag = &token[..end];
                    if tag != "*" {
                        compound.tag = Some(tag.to_ascii_lowercase());
                    }
                    while chars.peek().is_some_and(|(i, _)| *i < end) {
                        chars.next();
                    }
                }
                _ => return None,
            }
        }

        Some(compound)
    }

    fn matches<T: SelectorTarget>(&self, element: &T) -> bool {
        self.tag
            .as_deref()
            .is_none_or(|tag| element.tag().eq_ignore_ascii_case(tag))
            && self
                .id
                .as_deref()
                .is_none_or(|id| element.id() == Some(id))
            && self.classes.iter().all(|class| element.has_class(class))
            && self
                .attributes
                .iter()
                .all(|(name, expected)| match (element.attribute(name), expected) {
                    (Some(actual), Some(expected)) => actual == expected,
                    (Some(_), None) => true,
                    (None, _) => false,
                })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct El {
        tag: &'static str,
        id: Option<&'static str>,
        classes: Vec<&'static str>,
        attributes: Vec<(&'static str, &'static str)>,
    }

    impl El {
        fn new(tag: &'static str) -> Self {
            Self {
                tag,
                id: None,
                classes: Vec::new(),
                attributes: Vec::new(),
            }
        }
    }

    impl SelectorTarget for El {
        fn tag(&self) -> &str {
            self.tag
        }

        fn id(&self) -> Option<&str> {
            self.id
        }

        fn has_class(&self, class: &str) -> bool {
            self.classes.contains(&class)
        }

        fn attribute(&self, name: &str) -> Option<&str> {
            self.attributes
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| *value)
        }
    }

    #[test]
    fn test_compound_selector() {
        let mut el = El::new("div");
        el.id = Some("wrap");
        el.classes = vec!["a", "b"];

        assert!(SelectorList::parse("div#wrap.a.b").unwrap().matches(&el, &[]));
        assert!(SelectorList::parse(".b").unwrap().matches(&el, &[]));
        assert!(!SelectorList::parse("span.a").unwrap().matches(&el, &[]));
    }

    #[test]
    fn test_child_and_descendant_combinators() {
        let mut wrapper = El::new("div");
        wrapper.id = Some("viabill-product-pricetag-wrapper");
        let mut marker = El::new("div");
        marker.classes = vec!["viabill-pricetag"];
        let frame = El::new("iframe");
        let body = El::new("body");

        let child = SelectorList::parse(
            "#viabill-product-pricetag-wrapper > .viabill-pricetag > iframe",
        )
        .unwrap();
        assert!(child.matches(&frame, &[&marker, &wrapper, &body]));
        assert!(!child.matches(&frame, &[&wrapper, &marker, &body]));

        let descendant = SelectorList::parse("body iframe").unwrap();
        assert!(descendant.matches(&frame, &[&marker, &wrapper, &body]));
    }

    #[test]
    fn test_attribute_selector() {
        let mut script = El::new("script");
        script.attributes = vec![("src", "https://pricetag.viabill.com/script/abc")];

        let list =
            SelectorList::parse(r#"script[src="https://pricetag.viabill.com/script/abc"]"#);
        assert!(list.unwrap().matches(&script, &[]));
        assert!(!SelectorList::parse("script[async]").unwrap().matches(&script, &[]));
    }

    #[test]
    fn test_selector_list_and_invalid_input() {
        let el = El::new("span");
        assert!(SelectorList::parse("p, span").unwrap().matches(&el, &[]));
        assert!(SelectorList::parse("").is_none());
        assert!(SelectorList::parse("> p").is_none());
        assert!(SelectorList::parse("div >").is_none());
    }
}
