use indexmap::IndexSet;

/// Items to buy, deduplicated, in the order they were first added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShoppingList {
    items: IndexSet<String>,
}

impl ShoppingList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many of `items` were new.
    pub fn add_items<I, S>(&mut self, items: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = 0;
        for item in items {
            let trimmed = item.as_ref().trim();
            if trimmed.is_empty() {
                continue;
            }
            if self.items.insert(trimmed.to_string()) {
                added += 1;
            }
        }
        added
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn items(&self) -> impl Iterator<Item = &str> + '_ {
        self.items.iter().map(String::as_str)
    }

    pub fn contains(&self, item: &str) -> bool {
        self.items.contains(item.trim())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
