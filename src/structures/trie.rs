//! Prefix Trie Module
//!
//! Character trie mapping string keys (typically paths) to values, with prefix
//! enumeration for autocomplete.

use std::collections::BTreeMap;

#[derive(Debug)]
struct TrieNode<V> {
    children: BTreeMap<char, TrieNode<V>>,
    value: Option<V>,
}

impl<V> Default for TrieNode<V> {
    fn default() -> Self {
        Self {
            children: BTreeMap::new(),
            value: None,
        }
    }
}

impl<V> TrieNode<V> {
    fn is_dead(&self) -> bool {
        self.value.is_none() && self.children.is_empty()
    }

    /// Removes the value stored at `chars` below this node, pruning branches
    /// that no longer lead to any value.
    fn remove(&mut self, chars: &[char]) -> Option<V> {
        match chars.split_first() {
            None => self.value.take(),
            Some((head, rest)) => {
                let child = self.children.get_mut(head)?;
                let removed = child.remove(rest);
                if removed.is_some() && child.is_dead() {
                    self.children.remove(head);
                }
                removed
            }
        }
    }

    fn collect_keys(&self, prefix: &mut String, out: &mut Vec<String>) {
        if self.value.is_some() {
            out.push(prefix.clone());
        }
        for (ch, child) in &self.children {
            prefix.push(*ch);
            child.collect_keys(prefix, out);
            prefix.pop();
        }
    }
}

// == Trie ==
/// String-keyed prefix tree.
///
/// Children are kept in a `BTreeMap`, so enumeration is lexicographic by
/// `char`. Removing a key prunes every node left without a value or children.
#[derive(Debug)]
pub struct Trie<V> {
    root: TrieNode<V>,
    len: usize,
}

impl<V> Default for Trie<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Trie<V> {
    pub fn new() -> Self {
        Self {
            root: TrieNode::default(),
            len: 0,
        }
    }

    // == Insert ==
    /// Stores `value` under `key`, returning the previous value if any.
    pub fn insert(&mut self, key: &str, value: V) -> Option<V> {
        let node = key
            .chars()
            .fold(&mut self.root, |node, ch| node.children.entry(ch).or_default());
        let previous = node.value.replace(value);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    // == Search ==
    /// Exact lookup.
    pub fn search(&self, key: &str) -> Option<&V> {
        self.find_node(key)?.value.as_ref()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.search(key).is_some()
    }

    // == Remove ==
    /// Removes `key`. Returns true iff the key was stored.
    pub fn remove(&mut self, key: &str) -> bool {
        let chars: Vec<char> = key.chars().collect();
        let removed = self.root.remove(&chars).is_some();
        if removed {
            self.len -= 1;
        }
        removed
    }

    // == Autocomplete ==
    /// Returns every stored key starting with `prefix`, in lexicographic order.
    ///
    /// An empty prefix lists all keys.
    pub fn autocomplete_suggestions(&self, prefix: &str) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(node) = self.find_node(prefix) {
            let mut buffer = prefix.to_string();
            node.collect_keys(&mut buffer, &mut out);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.root = TrieNode::default();
        self.len = 0;
    }

    #[cfg(test)]
    fn node_count(&self) -> usize {
        fn count<V>(node: &TrieNode<V>) -> usize {
            node.children.values().map(|c| 1 + count(c)).sum()
        }
        count(&self.root)
    }

    fn find_node(&self, key: &str) -> Option<&TrieNode<V>> {
        key.chars()
            .try_fold(&self.root, |node, ch| node.children.get(&ch))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn path_trie() -> Trie<u32> {
        let mut trie = Trie::new();
        trie.insert("/home/docs/report.pdf", 1);
        trie.insert("/home/docs/receipt.png", 2);
        trie.insert("/home/music/song.mp3", 3);
        trie.insert("/tmp/scratch", 4);
        trie
    }

    #[test]
    fn test_trie_insert_and_search() {
        let trie = path_trie();
        assert_eq!(trie.len(), 4);
        assert_eq!(trie.search("/home/docs/report.pdf"), Some(&1));
        assert_eq!(trie.search("/home/docs"), None);
        assert_eq!(trie.search("/nowhere"), None);
        assert!(trie.contains("/tmp/scratch"));
        assert!(!trie.contains("/tmp"));
    }

    #[test]
    fn test_trie_insert_overwrites() {
        let mut trie = path_trie();
        assert_eq!(trie.insert("/tmp/scratch", 40), Some(4));
        assert_eq!(trie.len(), 4);
        assert_eq!(trie.search("/tmp/scratch"), Some(&40));
    }

    #[test]
    fn test_trie_autocomplete() {
        let trie = path_trie();
        assert_eq!(
            trie.autocomplete_suggestions("/home/docs/re"),
            vec!["/home/docs/receipt.png", "/home/docs/report.pdf"]
        );
        assert_eq!(trie.autocomplete_suggestions("/home").len(), 3);
        assert_eq!(trie.autocomplete_suggestions("").len(), 4);
        assert!(trie.autocomplete_suggestions("/var").is_empty());
    }

    #[test]
    fn test_trie_autocomplete_includes_exact_prefix_key() {
        let mut trie = Trie::new();
        trie.insert("car", ());
        trie.insert("card", ());
        trie.insert("care", ());
        assert_eq!(
            trie.autocomplete_suggestions("car"),
            vec!["car", "card", "care"]
        );
    }

    #[test]
    fn test_trie_remove() {
        let mut trie = path_trie();
        assert!(trie.remove("/home/docs/report.pdf"));
        assert!(!trie.remove("/home/docs/report.pdf"));
        assert!(!trie.remove("/home"));

        assert_eq!(trie.search("/home/docs/report.pdf"), None);
        assert_eq!(trie.search("/home/docs/receipt.png"), Some(&2));
        assert_eq!(trie.len(), 3);
    }

    #[test]
    fn test_trie_remove_prunes_branches() {
        let mut trie = Trie::new();
        trie.insert("ab", 1);
        let baseline = trie.node_count();

        for i in 0..100 {
            let key = format!("ab/churn/{i}");
            trie.insert(&key, i);
            assert!(trie.remove(&key));
        }

        assert_eq!(trie.node_count(), baseline);
        assert_eq!(trie.search("ab"), Some(&1));
    }

    #[test]
    fn test_trie_remove_keeps_prefix_key() {
        let mut trie = Trie::new();
        trie.insert("car", 1);
        trie.insert("card", 2);

        assert!(trie.remove("card"));
        assert_eq!(trie.search("car"), Some(&1));
        assert_eq!(trie.node_count(), 3);
    }

    #[test]
    fn test_trie_unicode_keys() {
        let mut trie = Trie::new();
        trie.insert("café/menü", 1);
        trie.insert("café/über", 2);
        assert_eq!(trie.autocomplete_suggestions("café/").len(), 2);
        assert!(trie.remove("café/menü"));
        assert_eq!(trie.autocomplete_suggestions("café/"), vec!["café/über"]);
    }

    #[test]
    fn test_trie_clear() {
        let mut trie = path_trie();
        trie.clear();
        assert!(trie.is_empty());
        assert_eq!(trie.node_count(), 0);
    }
}
