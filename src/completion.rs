use crate::alias::AliasTable;
use crate::builtin::Builtin;
use crate::config::Policy;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::ops::Bound;
use std::path::Path;

/// Where a completion word comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provenance {
    Builtin,
    External,
    Aliased(String),
    File,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Builtin => write!(f, "builtin"),
            Provenance::External => write!(f, "external"),
            Provenance::Aliased(expansion) => write!(f, "aliased '{}'", expansion),
            Provenance::File => write!(f, "file"),
        }
    }
}

/// Words offered at a prompt, each tagged with every source it came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    words: BTreeMap<String, Vec<Provenance>>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every command name a session can run: builtins (plus `exit`),
    /// allow-listed programs and aliases.
    pub fn commands(policy: &Policy, aliases: &AliasTable) -> Self {
        let mut vocab = Self::new();
        vocab.add("exit", Provenance::Builtin);
        for builtin in Builtin::ALL {
            vocab.add(builtin.name(), Provenance::Builtin);
        }
        for (name, _) in Builtin::SYNONYMS {
            vocab.add(name, Provenance::Builtin);
        }
        for name in policy.allowed_external() {
            vocab.add(name, Provenance::External);
        }
        for (name, expansion) in aliases.iter() {
            vocab.add(name, Provenance::Aliased(expansion.to_string()));
        }
        vocab
    }

    /// Add every entry of `dir`. Unreadable directories add nothing.
    pub fn add_dir_entries(&mut self, dir: &Path) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!("tsh: cannot list `{}': {}", dir.display(), e);
                return;
            }
        };
        for entry in entries.flatten() {
            if let Some(name) = entry.file_name().to_str() {
                self.add(name, Provenance::File);
            }
        }
    }

    pub fn add(&mut self, word: impl Into<String>, provenance: Provenance) {
        let tags = self.words.entry(word.into()).or_default();
        if !tags.contains(&provenance) {
            tags.push(provenance);
        }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains_key(word)
    }

    pub fn provenance(&self, word: &str) -> Option<&[Provenance]> {
        self.words.get(word).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Words and their provenance joined with `, `, in name order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, String)> {
        self.words.iter().map(|(word, tags)| {
            let described: Vec<String> = tags.iter().map(ToString::to_string).collect();
            (word.as_str(), described.join(", "))
        })
    }

    /// Words starting with `prefix`, in name order.
    pub fn candidates<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> {
        self.words
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .map(|(word, _)| word.as_str())
            .take_while(move |word| word.starts_with(prefix))
    }
}

/// Line-editor helper completing the word under the cursor from the current
/// [`Vocabulary`].
#[derive(Debug, Default)]
pub struct VocabularyHelper {
    vocab: Vocabulary,
}

impl VocabularyHelper {
    pub fn set_vocabulary(&mut self, vocab: Vocabulary) {
        self.vocab = vocab;
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    fn complete_at(&self, line: &str, pos: usize) -> (usize, Vec<Pair>) {
        let head = &line[..pos];
        let start = head
            .rfind(char::is_whitespace)
            .map(|i| i + head[i..].chars().next().map_or(1, char::len_utf8))
            .unwrap_or(0);
        let prefix = &head[start..];
        let pairs = self
            .vocab
            .candidates(prefix)
            .map(|word| Pair {
                display: word.to_string(),
                replacement: word.to_string(),
            })
            .collect();
        (start, pairs)
    }
}

impl Completer for VocabularyHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        Ok(self.complete_at(line, pos))
    }
}

impl Hinter for VocabularyHelper {
    type Hint = String;
}

impl Highlighter for VocabularyHelper {}

impl Validator for VocabularyHelper {}

impl Helper for VocabularyHelper {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_vocabulary_merges_all_sources() {
        let policy = Policy::new(["ls", "cd"], false);
        let mut aliases = AliasTable::new();
        aliases.insert("ll", "ls -l");
        aliases.insert("pwd", "pwd");

        let vocab = Vocabulary::commands(&policy, &aliases);
        assert_eq!(vocab.provenance("exit"), Some(&[Provenance::Builtin][..]));
        assert_eq!(vocab.provenance("ud"), Some(&[Provenance::Builtin][..]));
        assert_eq!(vocab.provenance("ls"), Some(&[Provenance::External][..]));
        assert_eq!(
            vocab.provenance("cd"),
            Some(&[Provenance::Builtin, Provenance::External][..])
        );
        assert_eq!(
            vocab.provenance("ll"),
            Some(&[Provenance::Aliased("ls -l".into())][..])
        );
        let described: Vec<_> = vocab.entries().filter(|(w, _)| *w == "pwd").collect();
        assert_eq!(
            described,
            vec![("pwd", "builtin, aliased 'pwd'".to_string())]
        );
    }

    #[test]
    fn candidates_are_prefix_matches_in_order() {
        let mut vocab = Vocabulary::new();
        for word in ["cat", "cd", "commands", "pwd", "c"] {
            vocab.add(word, Provenance::Builtin);
        }
        let found: Vec<_> = vocab.candidates("c").collect();
        assert_eq!(found, vec!["c", "cat", "cd", "commands"]);
        let found: Vec<_> = vocab.candidates("co").collect();
        assert_eq!(found, vec!["commands"]);
        assert_eq!(vocab.candidates("x").count(), 0);
        assert_eq!(vocab.candidates("").count(), 5);
    }

    #[test]
    fn directory_entries_are_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        let mut vocab = Vocabulary::new();
        vocab.add_dir_entries(dir.path());
        assert_eq!(vocab.len(), 2);
        assert_eq!(vocab.provenance("notes.txt"), Some(&[Provenance::File][..]));
        assert!(vocab.contains("sub"));

        vocab.add_dir_entries(&dir.path().join("missing"));
        assert_eq!(vocab.len(), 2);
    }

    #[test]
    fn helper_completes_word_under_cursor() {
        let mut helper = VocabularyHelper::default();
        let mut vocab = Vocabulary::new();
        vocab.add("notes.txt", Provenance::File);
        vocab.add("cd", Provenance::Builtin);
        helper.set_vocabulary(vocab);

        let (start, pairs) = helper.complete_at("c", 1);
        assert_eq!(start, 0);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].replacement, "cd");

        let line = "cat  no";
        let (start, pairs) = helper.complete_at(line, line.len());
        assert_eq!(start, 5);
        assert_eq!(pairs[0].replacement, "notes.txt");
    }
}
