use std::collections::BTreeSet;

/// The set of characters a tree accepts.
///
/// Built from an alphabet tag: the empty tag admits everything, any other tag
/// admits exactly the characters it contains.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Alphabet {
    #[default]
    Unrestricted,
    Symbols(BTreeSet<char>),
}

impl Alphabet {
    pub fn from_tag(tag: &str) -> Self {
        if tag.is_empty() {
            Alphabet::Unrestricted
        } else {
            Alphabet::Symbols(tag.chars().collect())
        }
    }

    /// Nucleotides plus the usual `$` terminator.
    pub fn dna() -> Self {
        Self::from_tag("ACGT$")
    }

    pub fn tag(&self) -> String {
        match self {
            Alphabet::Unrestricted => String::new(),
            Alphabet::Symbols(symbols) => symbols.iter().collect(),
        }
    }

    pub fn admits(&self, ch: char) -> bool {
        match self {
            Alphabet::Unrestricted => true,
            Alphabet::Symbols(symbols) => symbols.contains(&ch),
        }
    }

    /// Position and value of the first character not admitted.
    pub fn first_violation(&self, text: &[char]) -> Option<(usize, char)> {
        if let Alphabet::Unrestricted = self {
            return None;
        }
        text.iter()
            .enumerate()
            .find(|(_, &ch)| !self.admits(ch))
            .map(|(position, &ch)| (position, ch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tag_is_unrestricted() {
        let alphabet = Alphabet::from_tag("");
        assert_eq!(alphabet, Alphabet::Unrestricted);
        assert!(alphabet.admits('\u{1F600}'));
        assert_eq!(alphabet.first_violation(&['a', 'b']), None);
    }

    #[test]
    fn symbols_reject_foreign_characters() {
        let alphabet = Alphabet::dna();
        assert_eq!(alphabet.tag(), "$ACGT");
        let text: Vec<char> = "ACGNT$".chars().collect();
        assert_eq!(alphabet.first_violation(&text), Some((3, 'N')));
    }
}
