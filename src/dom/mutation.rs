//! Mutation flags - what a binding actually wrote to a node.
//!
//! Each node accumulates the categories of rendered state that changed since
//! the flags were last taken. Writes that leave the node as it was (same
//! value, same text) record nothing.

bitflags::bitflags! {
    /// Categories of node state written since the last `take_mutations`.
    ///
    /// Combine with bitwise OR: `Mutation::VALUE | Mutation::TEXT`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Mutation: u8 {
        const NONE = 0;
        /// Form value (`v-model` target).
        const VALUE = 1 << 0;
        /// Text content (text nodes, `v-text`).
        const TEXT = 1 << 1;
        /// Markup re-parsed into children (`v-html`).
        const INNER_HTML = 1 << 2;
        /// Children inserted, moved or removed.
        const CHILDREN = 1 << 3;
        /// An attribute added or changed.
        const ATTRIBUTES = 1 << 4;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_and_query() {
        let flags = Mutation::VALUE | Mutation::CHILDREN;
        assert!(flags.contains(Mutation::VALUE));
        assert!(!flags.contains(Mutation::TEXT));
        assert_eq!(Mutation::default(), Mutation::NONE);
    }
}
