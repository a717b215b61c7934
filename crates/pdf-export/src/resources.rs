//! Per-page resource dictionary

use crate::ledger::ObjectNumber;

/// Resource categories a page can use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceCategory {
    Font,
    XObject,
    Shading,
}

impl ResourceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceCategory::Font => "Font",
            ResourceCategory::XObject => "XObject",
            ResourceCategory::Shading => "Shading",
        }
    }

    const ALL: [ResourceCategory; 3] = [
        ResourceCategory::Font,
        ResourceCategory::XObject,
        ResourceCategory::Shading,
    ];
}

/// Local names used by a content stream, mapped to their objects
#[derive(Debug, Default, Clone)]
pub struct ResourceDictionary {
    entries: Vec<(ResourceCategory, String, ObjectNumber)>,
}

impl ResourceDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name`. Adding a name twice keeps the first entry.
    pub fn add(&mut self, category: ResourceCategory, name: &str, number: ObjectNumber) {
        if self.get(category, name).is_none() {
            self.entries.push((category, name.to_string(), number));
        }
    }

    pub fn get(&self, category: ResourceCategory, name: &str) -> Option<ObjectNumber> {
        self.entries
            .iter()
            .find(|(c, n, _)| *c == category && n == name)
            .map(|(_, _, number)| *number)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Dictionary text for a page's `/Resources`
    pub fn to_pdf(&self) -> String {
        let mut out = String::from("<< /ProcSet [/PDF /Text /ImageB /ImageC]");
        for category in ResourceCategory::ALL {
            let mut names = self
                .entries
                .iter()
                .filter(|(c, _, _)| *c == category)
                .peekable();
            if names.peek().is_none() {
                continue;
            }
            out.push_str(&format!(" /{} <<", category.as_str()));
            for (_, name, number) in names {
                out.push_str(&format!(" /{} {}", name, number));
            }
            out.push_str(" >>");
        }
        out.push_str(" >>");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_resources() {
        let res = ResourceDictionary::new();
        assert!(res.is_empty());
        assert_eq!(res.to_pdf(), "<< /ProcSet [/PDF /Text /ImageB /ImageC] >>");
    }

    #[test]
    fn test_categories_and_dedup() {
        let mut res = ResourceDictionary::new();
        res.add(ResourceCategory::Shading, "gradient3", ObjectNumber(4));
        res.add(ResourceCategory::XObject, "image9", ObjectNumber(7));
        res.add(ResourceCategory::XObject, "image9", ObjectNumber(8));
        res.add(ResourceCategory::Font, "font2", ObjectNumber(2));
        assert_eq!(res.len(), 3);
        assert_eq!(
            res.get(ResourceCategory::XObject, "image9"),
            Some(ObjectNumber(7))
        );
        assert_eq!(
            res.to_pdf(),
            "<< /ProcSet [/PDF /Text /ImageB /ImageC] /Font << /font2 2 0 R >> \
             /XObject << /image9 7 0 R >> /Shading << /gradient3 4 0 R >> >>"
        );
    }
}
